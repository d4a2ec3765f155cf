//! skywrite - Bluesky MCP server
//!
//! Exposes social-account operations (posting, engagement, feeds, profile
//! and list management) as MCP tools over stdio. Authenticates once at
//! startup from environment variables; per-call failures never take the
//! serve loop down.

mod bsky;
mod config;
mod error;
mod http;
mod mcp;
mod registry;
mod tools;

use bsky::{BskyAdapter, Session};
use config::Config;
use registry::Dispatcher;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, so all logging goes to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let client = http::client_with_timeout(HTTP_TIMEOUT);

    let session = match Session::login(&client, &config).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    info!("Authenticated as @{} ({})", session.handle, session.did);

    let adapter = BskyAdapter::new(client, session);
    let dispatcher = Dispatcher::new(registry::build_registry(), Arc::new(adapter));

    mcp::handle_stdio(dispatcher).await
}
