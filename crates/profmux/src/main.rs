use std::{net::SocketAddr, time::Duration};

use anyhow::Result;
use clap::Parser;
use profmux::{FetchEngine, FetchEngineConfig, ProfMuxConfig, ProfMuxServer};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Serve profile visualization sessions for remote targets")]
struct Args {
    /// Address to listen on, e.g. 0.0.0.0:8080
    bind: SocketAddr,
    /// Path prefix the session routes are mounted under
    #[arg(long, default_value = profmux::server::DEFAULT_PREFIX)]
    prefix: String,
    /// Seconds to wait for a target to deliver its profile, 0 to wait forever
    #[arg(long, default_value_t = 60)]
    fetch_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();
    let engine = FetchEngine::new(FetchEngineConfig {
        timeout: (args.fetch_timeout > 0).then(|| Duration::from_secs(args.fetch_timeout)),
        ..Default::default()
    })?;

    let mut config = ProfMuxConfig::new(args.bind);
    config.prefix = args.prefix;
    let server = ProfMuxServer::serve_with_config(config, engine).await?;
    tracing::info!(bind = %server.config.bind, prefix = %server.config.prefix, "listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    server.cancel();
    Ok(())
}
