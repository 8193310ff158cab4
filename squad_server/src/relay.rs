//! Room relay implementation.
//!
//! The relay is a thin deliverer: it admits participants, routes replicated
//! calls by target mode, and keeps the buffered log plus property snapshots
//! for late joiners. It never interprets gameplay calls; all combat and
//! lifecycle authority lives in the participants' sessions.
//!
//! Task layout: one task per connection (reads frames, forwards queued
//! outgoing frames) and one router owning the [`Room`]. Connection tasks
//! talk to the router over an mpsc channel; per-participant outgoing frames
//! go back over a channel registered at join.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Context;
use squad_shared::call::ReplicatedCall;
use squad_shared::net::{check_hello, NetMsg, RoomConn, RoomListener, RoomReader, RoomWriter};
use squad_shared::participant::ActorNumber;
use squad_shared::room::{JoinAck, Room};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Events from connection tasks to the router.
enum ClientEvent {
    Join {
        nickname: String,
        out: mpsc::Sender<NetMsg>,
        ack: oneshot::Sender<JoinAck>,
    },
    Call {
        actor: ActorNumber,
        call: ReplicatedCall,
    },
    Closed {
        actor: ActorNumber,
    },
}

/// The relay: listener plus the router state.
pub struct RelayServer {
    listener: RoomListener,
    room: Room,
    writers: HashMap<ActorNumber, mpsc::Sender<NetMsg>>,
    events_tx: mpsc::Sender<ClientEvent>,
    events_rx: mpsc::Receiver<ClientEvent>,
}

impl RelayServer {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = RoomListener::bind(addr).await?;
        let (events_tx, events_rx) = mpsc::channel(256);
        Ok(Self {
            listener,
            room: Room::new(),
            writers: HashMap::new(),
            events_tx,
            events_rx,
        })
    }

    /// Binds to an OS-assigned port; used by tests.
    pub async fn bind_ephemeral() -> anyhow::Result<(Self, SocketAddr)> {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let relay = Self::bind(addr).await?;
        let local = relay.local_addr()?;
        Ok((relay, local))
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept/route loop. Runs until the process is stopped.
    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (conn, addr) = accepted?;
                    debug!(%addr, "incoming connection");
                    tokio::spawn(handle_connection(conn, addr, self.events_tx.clone()));
                }
                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event);
                    self.flush();
                }
            }
        }
    }

    fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Join { nickname, out, ack } => {
                let join = self.room.join(&nickname);
                self.writers.insert(join.actor, out);
                if ack.send(join).is_err() {
                    // Connection died between Hello and Welcome.
                    debug!("join acknowledgement dropped");
                }
            }
            ClientEvent::Call { actor, call } => {
                debug!(%actor, seq = call.seq, "routing call");
                self.room.send(call);
            }
            ClientEvent::Closed { actor } => {
                self.writers.remove(&actor);
                self.room.leave(actor);
            }
        }
    }

    /// Drains every participant's inbox into its connection. A backed-up
    /// connection is dropped from the room rather than losing frames
    /// silently; buffered calls a dropped frame would have carried are
    /// replayed if the participant reconnects.
    fn flush(&mut self) {
        let members: Vec<ActorNumber> = self.room.members().collect();
        let mut stalled = Vec::new();
        for actor in members {
            for call in self.room.drain(actor) {
                let Some(out) = self.writers.get(&actor) else { break };
                if out.try_send(NetMsg::Call(call)).is_err() {
                    warn!(%actor, "outgoing queue full, dropping connection");
                    stalled.push(actor);
                    break;
                }
            }
        }
        for actor in stalled {
            self.writers.remove(&actor);
            self.room.leave(actor);
        }
    }
}

async fn handle_connection(
    conn: RoomConn,
    addr: SocketAddr,
    events: mpsc::Sender<ClientEvent>,
) {
    if let Err(e) = serve_connection(conn, events).await {
        debug!(%addr, error = %e, "connection closed");
    }
}

async fn serve_connection(
    conn: RoomConn,
    events: mpsc::Sender<ClientEvent>,
) -> anyhow::Result<()> {
    let (mut rd, mut wr) = conn.into_split();

    let hello = rd.recv().await.context("read hello")?;
    let nickname = check_hello(&hello)?;

    let (out_tx, out_rx) = mpsc::channel(256);
    let (ack_tx, ack_rx) = oneshot::channel();
    events
        .send(ClientEvent::Join {
            nickname: nickname.clone(),
            out: out_tx,
            ack: ack_tx,
        })
        .await
        .context("router gone")?;
    let ack = ack_rx.await.context("router dropped join ack")?;
    let actor = ack.actor;
    info!(%actor, nickname, "participant connected");

    wr.send(&NetMsg::Welcome(ack)).await?;

    let result = pump_connection(actor, &mut rd, &mut wr, out_rx, &events).await;
    let _ = events.send(ClientEvent::Closed { actor }).await;
    result
}

async fn pump_connection(
    actor: ActorNumber,
    rd: &mut RoomReader,
    wr: &mut RoomWriter,
    mut out_rx: mpsc::Receiver<NetMsg>,
    events: &mpsc::Sender<ClientEvent>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            incoming = rd.recv() => match incoming {
                Ok(NetMsg::Call(call)) => {
                    if call.sender != actor {
                        warn!(%actor, claimed = %call.sender, "sender mismatch, call dropped");
                        continue;
                    }
                    events
                        .send(ClientEvent::Call { actor, call })
                        .await
                        .context("router gone")?;
                }
                Ok(NetMsg::Disconnect { reason }) => {
                    info!(%actor, reason, "participant disconnected");
                    return Ok(());
                }
                Ok(other) => debug!(%actor, ?other, "unexpected frame ignored"),
                // Peer vanished; treated like a disconnect.
                Err(_) => return Ok(()),
            },
            outgoing = out_rx.recv() => match outgoing {
                Some(msg) => wr.send(&msg).await?,
                None => return Ok(()),
            },
        }
    }
}
