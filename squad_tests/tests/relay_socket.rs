//! Full socket-based integration tests for client ↔ relay communication.

use std::time::Duration;

use squad_client::SessionClient;
use squad_server::RelayServer;
use squad_shared::config::GameConfig;
use squad_shared::lifecycle::LifecycleState;
use squad_shared::net::{decode_from_bytes, encode_to_bytes, NetMsg, PROTOCOL_VERSION};

/// Unit-style test: protocol messages roundtrip correctly.
#[test]
fn protocol_messages_roundtrip() -> anyhow::Result<()> {
    let hello = NetMsg::Hello {
        protocol: PROTOCOL_VERSION,
        nickname: "Ray".to_string(),
    };
    assert_eq!(decode_from_bytes(&encode_to_bytes(&hello)?)?, hello);

    let bye = NetMsg::Disconnect {
        reason: "quit".to_string(),
    };
    assert_eq!(decode_from_bytes(&encode_to_bytes(&bye)?)?, bye);

    Ok(())
}

fn cfg_for(addr: &std::net::SocketAddr, nickname: &str) -> GameConfig {
    GameConfig {
        server_addr: addr.to_string(),
        nickname: nickname.to_string(),
        ..GameConfig::default()
    }
}

/// Ticks every connected client until `done` holds or the deadline passes.
async fn settle(
    clients: &mut [&mut SessionClient],
    mut done: impl FnMut(&[&mut SessionClient]) -> bool,
) -> anyhow::Result<()> {
    for _ in 0..200 {
        for client in clients.iter_mut() {
            client.tick(0.0).await?;
        }
        if done(clients) {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    anyhow::bail!("clients did not settle in time")
}

/// Full integration: spawn the relay, connect two sessions, exchange a hit,
/// and check both replicas converge; then a late joiner catches up from the
/// buffered log.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hit_converges_across_the_relay() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();

    let (relay, addr) = RelayServer::bind_ephemeral().await?;
    tokio::spawn(relay.run());

    let mut ray = SessionClient::connect(&cfg_for(&addr, "Ray")).await?;
    let mut kai = SessionClient::connect(&cfg_for(&addr, "Kai")).await?;

    settle(&mut [&mut ray, &mut kai], |clients| {
        clients.iter().all(|c| c.session.participant_count() == 2)
    })
    .await?;
    assert!(ray.session.is_coordinator());
    assert!(!kai.session.is_coordinator());

    // Kai shoots Ray; both replicas must land on the same health.
    let target = ray.session.entity();
    kai.session.report_hit(target, 40.0);
    settle(&mut [&mut ray, &mut kai], |clients| {
        clients
            .iter()
            .all(|c| c.session.health_of(target) == Some(60.0))
    })
    .await?;

    // A third session joins after the fact and converges from the replay.
    let mut nia = SessionClient::connect(&cfg_for(&addr, "Nia")).await?;
    settle(&mut [&mut ray, &mut kai, &mut nia], |clients| {
        clients[2].session.participant_count() == 3
            && clients[2].session.health_of(target) == Some(60.0)
    })
    .await?;
    assert_eq!(
        nia.session.lifecycle_of(target),
        Some(LifecycleState::Alive)
    );

    nia.disconnect("test done").await?;
    settle(&mut [&mut ray, &mut kai], |clients| {
        clients.iter().all(|c| c.session.participant_count() == 2)
    })
    .await?;

    Ok(())
}

/// Smoke test: the relay accepts a connection and answers the handshake.
#[tokio::test]
async fn relay_answers_the_handshake() -> anyhow::Result<()> {
    let (relay, addr) = RelayServer::bind_ephemeral().await?;
    tokio::spawn(relay.run());

    let client = SessionClient::connect(&cfg_for(&addr, "Smoke")).await?;
    assert_eq!(client.session.participant_count(), 1);
    assert!(client.session.is_coordinator());
    client.disconnect("smoke").await?;
    Ok(())
}
