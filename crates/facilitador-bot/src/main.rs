#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use facilitador_bot::{config::Config, run_server, telemetry};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "facilitador-bot", version, about = "Judicial facilitation Q&A service")]
struct Cli {
    /// Extra env file, loaded before config/config.env and .env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Override API_HOST
    #[arg(long)]
    host: Option<String>,

    /// Override API_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing();

    if let Some(path) = &cli.env_file {
        Config::load_env_file(path);
    }
    let mut cfg = Config::from_env()?;
    if let Some(host) = cli.host {
        cfg.api_host = host;
    }
    if let Some(port) = cli.port {
        cfg.api_port = port;
    }

    // NUM_THREADS sizes the pool that runs blocking store queries
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(cfg.threads.max(1))
        .build()?;

    runtime.block_on(run_server(cfg))
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
