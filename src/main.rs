//! TapProxy - Main entry point
//!
//! A transparent HTTP forwarding proxy for request/response inspection

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tapproxy::{ProxyConfig, ProxyServer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// TapProxy - A transparent HTTP forwarding proxy
#[derive(Parser, Debug)]
#[command(name = "tapproxy")]
#[command(author = "TapProxy Contributors")]
#[command(version = "1.0.0")]
#[command(about = "A transparent HTTP forwarding proxy for request/response inspection")]
struct Args {
    /// Base URL of the backing service all requests are forwarded to
    #[arg(long, env = "BACKING_SERVICE_BASE_URL")]
    backing_url: String,

    /// HTTP verb used for every outbound call
    #[arg(long, env = "PROXY_VERB")]
    verb: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Production mode: hide error details from clients
    #[arg(long, env = "PRODUCTION", default_value = "false")]
    production: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is honored before args so env-backed flags pick it up
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    // Missing or invalid configuration refuses startup; nothing is served.
    let config = ProxyConfig::new(&args.backing_url, &args.verb, args.port, args.production)?;

    info!(
        "{} (v{}), listening on port {}, proxying to: {}, with verb: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        config.port,
        config.backing_base_url,
        config.proxy_verb
    );

    let server = Arc::new(ProxyServer::new(config));

    server.run().await?;

    Ok(())
}
