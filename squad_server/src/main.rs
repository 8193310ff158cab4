//! Standalone relay binary.
//!
//! Usage:
//!   cargo run -p squad_server -- [--addr 127.0.0.1:40200]
//!
//! The relay hosts one room. Participants connect, exchange replicated
//! calls, and late joiners receive the buffered log before live traffic.

use std::env;
use std::net::SocketAddr;

use anyhow::Context;
use squad_server::RelayServer;
use squad_shared::config::GameConfig;
use tracing::info;

fn parse_args() -> GameConfig {
    let mut cfg = GameConfig::default();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" if i + 1 < args.len() => {
                cfg.server_addr = args[i + 1].clone();
                i += 2;
            }
            _ => i += 1,
        }
    }
    cfg
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args();
    let addr: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;

    let relay = RelayServer::bind(addr).await.context("bind relay")?;
    info!(local = %relay.local_addr()?, "relay listening");

    relay.run().await
}
