use async_std::task;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use habraproxy::config::ProxyConfig;
use habraproxy::net::server::Server;

/// HTTP proxy relaying one upstream site with its HTML rewritten.
#[derive(Parser)]
#[command(name = "habraproxy", version, about)]
struct Cli {
    /// Local port for the proxy server
    #[arg(long)]
    port: Option<u16>,

    /// Target host for the proxy server
    #[arg(long)]
    host: Option<String>,

    /// Target port for the proxy server
    #[arg(long)]
    target_port: Option<u16>,

    /// TOML configuration file, overridden by the flags above
    #[arg(long)]
    config: Option<String>,
}

fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "habraproxy=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ProxyConfig::from_file(path),
        None => ProxyConfig::default(),
    };
    if let Some(port) = cli.port {
        config.local_port = port;
    }
    if let Some(host) = cli.host {
        config.target_host = host;
    }
    if let Some(target_port) = cli.target_port {
        config.target_port = target_port;
    }

    let server = Server::new(config);
    task::block_on(server.run())
}
