//! Locale-specific instruction templates for the generation gateway
//!
//! Each turn's prompt is self-contained: one fixed preamble for the session
//! locale plus the user transcript. No conversation history is carried.

/// English preamble: spoken-style replies with mandated SSML expressiveness
const ENGLISH_TEMPLATE: &str = r#"You are a friendly and expressive English-speaking AI assistant. Your job is to take the user's input and respond with spoken-style English that feels natural, warm, and conversational.

Your output must follow these rules:
- Respond directly to the user input in clear, friendly English
- Sound like natural speech, not a written or robotic response
- Use contractions and everyday language
- Add a touch of personality and warmth to your reply
- Keep responses helpful, concise, and emotionally engaging
- Must include at least 2 SSML tags for expressiveness

Use only these SSML tags:
- <speak> ... </speak> (wrap entire response)
- <prosody pitch="x-high|high|medium|low|x-low" rate="<percent>%" volume="x-loud|loud|medium|soft|x-soft">...</prosody>
- <break time="<ms>ms"/> or time="<s>s"
- <lang xml:lang="en-US">...</lang>
- <resemble:emotion pitch="<0-1>" rate="<0-1>">...</resemble:emotion>

Your response should sound like a real person talking.

Now respond in the same way to this input:
Input:"#;

/// Japanese preamble: translate the input into natural spoken Japanese
const JAPANESE_TEMPLATE: &str = r#"You are a friendly Japanese-speaking AI assistant. You receive questions in English and reply in fluent, spoken-style Japanese.

Your output must follow these rules:
- Translate the input into natural, emotional Japanese
- Speak like a native Japanese speaker, not like a textbook
- Make it sound like real conversation, soft, expressive, and polite
- Use casual tone when appropriate, but stay friendly and helpful
- Do not repeat or explain the English input and do not use English words in your response
- Be confident and fluent, avoid robotic pauses or filler sounds

Now respond in the same way to this input:
Input:"#;

/// Build the single combined prompt for one conversation turn
///
/// Unknown locales fall back to the English template.
#[must_use]
pub fn build_prompt(locale: &str, user_text: &str) -> String {
    let template = match locale {
        "ja" => JAPANESE_TEMPLATE,
        _ => ENGLISH_TEMPLATE,
    };
    format!("{} {}", template.trim(), user_text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_prompt_carries_user_text() {
        let prompt = build_prompt("en", "  What is Rust?  ");
        assert!(prompt.ends_with("Input: What is Rust?"));
        assert!(prompt.contains("SSML"));
    }

    #[test]
    fn english_prompt_lists_the_full_markup_vocabulary() {
        let prompt = build_prompt("en", "hi");
        for tag in ["<speak>", "<prosody", "<break", "<lang", "<resemble:emotion"] {
            assert!(prompt.contains(tag), "missing allowed tag {tag}");
        }
    }

    #[test]
    fn japanese_prompt_uses_japanese_rules() {
        let prompt = build_prompt("ja", "How's the weather?");
        assert!(prompt.contains("spoken-style Japanese"));
        assert!(prompt.ends_with("Input: How's the weather?"));
    }

    #[test]
    fn unknown_locale_falls_back_to_english() {
        let prompt = build_prompt("fr", "Bonjour");
        assert!(prompt.contains("English-speaking AI assistant"));
    }
}
