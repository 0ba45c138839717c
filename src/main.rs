use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use parley_gateway::server::AppState;
use parley_gateway::{
    Config, GatewayServer, Gateways, OpenRouterClient, ResembleClient, WhisperClient,
};

/// Parley - streaming voice conversation gateway
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PARLEY_PORT", default_value = "8000")]
    port: u16,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parley_gateway=info",
        1 => "info,parley_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!(port = cli.port, "starting parley gateway");

    // Load configuration: missing required entries abort startup here,
    // never per-session
    let config = Config::load()?;

    let gateways = Gateways {
        stt: Arc::new(WhisperClient::new(&config.stt)?),
        llm: Arc::new(OpenRouterClient::new(&config.llm)?),
        tts: Arc::new(ResembleClient::new(&config.tts)?),
    };

    let state = AppState {
        gateways,
        voices: config.voices.clone(),
        limits: config.limits,
    };

    tracing::info!("parley gateway ready");
    GatewayServer::new(state, cli.port).run().await?;

    Ok(())
}
