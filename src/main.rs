use anyhow::Result;
use clap::Parser;
use decision_relay::config::Config;
use decision_relay::http::{AppState, start_http_server};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "decision-relay", about = "Decision and storyboard analysis relay")]
struct Args {
    /// Path to the TOML config file (overrides RELAY_CONFIG)
    #[arg(long)]
    config: Option<String>,

    /// Bind address (overrides config and RELAY_HTTP_BIND)
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config comes first so its log_level can seed the filter; missing
    // credentials are fatal and nothing is served without them
    let mut config = Config::load_with(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.http_bind = bind;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    info!(
        "Starting decision-relay (concurrency={}, timeout_ms={})",
        config.server.outcome_concurrency, config.models.request_timeout_ms
    );

    let state = AppState::from_config(config)?;
    start_http_server(state).await
}
