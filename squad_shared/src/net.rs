//! Wire protocol between participants and the room relay.
//!
//! A single reliable TCP channel with length-prefixed JSON frames. Every
//! replicated call rides this channel: the room model needs per-sender
//! FIFO and at-least-once delivery, which TCP gives for free; there is no
//! unreliable plane.

use anyhow::Context;
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpListener, TcpStream,
    },
};

use crate::call::ReplicatedCall;
use crate::room::JoinAck;

/// Protocol version for compatibility checks.
pub const PROTOCOL_VERSION: u32 = 1;

/// Frames exchanged with the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NetMsg {
    // Handshake
    /// First frame from a connecting participant.
    Hello { protocol: u32, nickname: String },
    /// Relay response: assigned ids plus the late-join replay.
    Welcome(JoinAck),

    // Live traffic
    /// A replicated call, either direction.
    Call(ReplicatedCall),

    // Teardown
    Disconnect { reason: String },
}

/// Reliable connection with length-prefixed frames.
#[derive(Debug)]
pub struct RoomConn {
    stream: TcpStream,
}

impl RoomConn {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await.context("tcp connect")?;
        Ok(Self::new(stream))
    }

    pub async fn send(&mut self, msg: &NetMsg) -> anyhow::Result<()> {
        write_frame(&mut self.stream, msg).await
    }

    pub async fn recv(&mut self) -> anyhow::Result<NetMsg> {
        read_frame(&mut self.stream).await
    }

    /// Splits into halves so reading and writing can run on separate tasks.
    pub fn into_split(self) -> (RoomReader, RoomWriter) {
        let (rd, wr) = self.stream.into_split();
        (RoomReader { rd }, RoomWriter { wr })
    }

    pub fn peer_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }
}

/// Read half of a split connection.
#[derive(Debug)]
pub struct RoomReader {
    rd: OwnedReadHalf,
}

impl RoomReader {
    pub async fn recv(&mut self) -> anyhow::Result<NetMsg> {
        read_frame(&mut self.rd).await
    }
}

/// Write half of a split connection.
#[derive(Debug)]
pub struct RoomWriter {
    wr: OwnedWriteHalf,
}

impl RoomWriter {
    pub async fn send(&mut self, msg: &NetMsg) -> anyhow::Result<()> {
        write_frame(&mut self.wr, msg).await
    }
}

async fn write_frame<W>(w: &mut W, msg: &NetMsg) -> anyhow::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let payload = serde_json::to_vec(msg).context("serialize msg")?;
    let mut buf = BytesMut::with_capacity(4 + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.extend_from_slice(&payload);
    w.write_all(&buf).await.context("tcp write")?;
    Ok(())
}

async fn read_frame<R>(r: &mut R) -> anyhow::Result<NetMsg>
where
    R: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf).await.context("tcp read len")?;
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload).await.context("tcp read payload")?;
    let msg = serde_json::from_slice(&payload).context("deserialize msg")?;
    Ok(msg)
}

/// TCP listener for the relay.
pub struct RoomListener {
    listener: TcpListener,
}

impl RoomListener {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await.context("tcp bind")?;
        Ok(Self { listener })
    }

    pub async fn accept(&self) -> anyhow::Result<(RoomConn, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await.context("tcp accept")?;
        Ok((RoomConn::new(stream), addr))
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

/// Convenience codec helpers.
pub fn encode_to_bytes(msg: &NetMsg) -> anyhow::Result<Vec<u8>> {
    serde_json::to_vec(msg).context("serialize")
}

pub fn decode_from_bytes(b: &[u8]) -> anyhow::Result<NetMsg> {
    serde_json::from_slice(b).context("deserialize")
}

/// Validates a Hello frame, returning the nickname.
pub fn check_hello(msg: &NetMsg) -> anyhow::Result<String> {
    match msg {
        NetMsg::Hello { protocol, nickname } if *protocol == PROTOCOL_VERSION => {
            Ok(nickname.clone())
        }
        NetMsg::Hello { protocol, .. } => anyhow::bail!(
            "protocol mismatch: peer {} vs local {}",
            protocol,
            PROTOCOL_VERSION
        ),
        other => anyhow::bail!("expected Hello, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{CallScope, CallTarget, GameCall};
    use crate::participant::ActorNumber;

    #[test]
    fn netmsg_roundtrip_bytes() {
        let msg = NetMsg::Call(ReplicatedCall {
            sender: ActorNumber(1),
            seq: 1,
            scope: CallScope::Room,
            target: CallTarget::All,
            call: GameCall::PlayerLeft {
                actor: ActorNumber(2),
            },
        });
        let bytes = encode_to_bytes(&msg).unwrap();
        let back = decode_from_bytes(&bytes).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn hello_is_version_checked() {
        let good = NetMsg::Hello {
            protocol: PROTOCOL_VERSION,
            nickname: "Ray".into(),
        };
        assert_eq!(check_hello(&good).unwrap(), "Ray");

        let bad = NetMsg::Hello {
            protocol: PROTOCOL_VERSION + 1,
            nickname: "Ray".into(),
        };
        assert!(check_hello(&bad).is_err());
    }
}
