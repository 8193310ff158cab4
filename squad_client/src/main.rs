//! Demo participant binary.
//!
//! Usage:
//!   cargo run -p squad_client -- [--addr 127.0.0.1:40200] [--name Ray]
//!
//! Connects to a relay, runs the local loop at the configured tick rate,
//! and logs whatever the UI layer would render. Fires a burst every few
//! seconds so two instances pointed at the same relay exercise the full
//! damage/downed/revive flow.

use std::env;

use squad_client::intent::{self, Intent};
use squad_client::SessionClient;
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
            "--name" if i + 1 < args.len() => {
                cfg.nickname = args[i + 1].clone();
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
    let mut client = SessionClient::connect(&cfg).await?;
    info!(actor = %client.session.actor(), entity = client.session.entity().0, "joined room");

    let dt = 1.0 / cfg.tick_hz as f32;
    let mut interval = tokio::time::interval(std::time::Duration::from_secs_f32(dt));
    let mut tick: u64 = 0;

    loop {
        interval.tick().await;
        tick += 1;

        // A short burst once a second keeps ammo and reload traffic moving.
        if tick % cfg.tick_hz as u64 == 0 {
            intent::apply(&mut client.session, Intent::Fire);
        }

        client.tick(dt).await?;

        for event in client.session.drain_ui() {
            info!(?event, "ui");
        }
    }
}
