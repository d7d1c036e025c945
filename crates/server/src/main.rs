use clap::Parser;
use tracing_subscriber::EnvFilter;

use herald_server::app;
use herald_server::config::HeraldConfig;

/// Herald notification service.
#[derive(Parser, Debug)]
#[command(name = "herald-server", version, about = "Multi-tenant notification delivery service")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "HERALD_CONFIG", default_value = "herald.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = HeraldConfig::load(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    app::run(config).await
}
