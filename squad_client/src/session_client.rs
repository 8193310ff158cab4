//! Relay-backed participant session.
//!
//! Wraps the transport-agnostic [`Session`] with a TCP connection to the
//! relay. A background task reads frames into an mpsc queue; [`tick`]
//! moves queued calls into the session's inbox (the defined drain point),
//! steps the simulation, and flushes outgoing calls.
//!
//! [`tick`]: SessionClient::tick

use std::net::SocketAddr;

use anyhow::Context;
use squad_shared::config::GameConfig;
use squad_shared::net::{NetMsg, RoomConn, RoomWriter, PROTOCOL_VERSION};
use squad_shared::session::Session;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A connected participant.
pub struct SessionClient {
    pub session: Session,
    writer: RoomWriter,
    incoming: mpsc::Receiver<NetMsg>,
}

impl SessionClient {
    /// Connects, performs the Hello/Welcome handshake, and builds the local
    /// session from the join replay.
    pub async fn connect(cfg: &GameConfig) -> anyhow::Result<Self> {
        let addr: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;
        info!(relay = %addr, nickname = %cfg.nickname, "connecting to relay");

        let mut conn = RoomConn::connect(addr).await?;
        conn.send(&NetMsg::Hello {
            protocol: PROTOCOL_VERSION,
            nickname: cfg.nickname.clone(),
        })
        .await?;

        let welcome = conn.recv().await?;
        let ack = match welcome {
            NetMsg::Welcome(ack) => ack,
            other => anyhow::bail!("expected Welcome, got {other:?}"),
        };
        let session = Session::new(cfg.clone(), ack);

        let (reader, writer) = conn.into_split();
        let (tx, incoming) = mpsc::channel(256);
        tokio::spawn(async move {
            let mut reader = reader;
            loop {
                match reader.recv().await {
                    Ok(msg) => {
                        if tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "relay read ended");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            session,
            writer,
            incoming,
        })
    }

    /// One local loop step: take delivery of queued frames, simulate,
    /// flush outgoing calls.
    pub async fn tick(&mut self, dt: f32) -> anyhow::Result<()> {
        while let Ok(msg) = self.incoming.try_recv() {
            match msg {
                NetMsg::Call(call) => self.session.enqueue_incoming(call),
                NetMsg::Disconnect { reason } => {
                    warn!(reason, "relay closed the connection");
                    anyhow::bail!("disconnected by relay: {reason}");
                }
                other => debug!(?other, "unexpected frame ignored"),
            }
        }

        self.session.tick(dt);

        for call in self.session.take_outgoing() {
            self.writer.send(&NetMsg::Call(call)).await?;
        }
        Ok(())
    }

    /// Graceful teardown.
    pub async fn disconnect(mut self, reason: &str) -> anyhow::Result<()> {
        self.writer
            .send(&NetMsg::Disconnect {
                reason: reason.to_string(),
            })
            .await?;
        Ok(())
    }
}
