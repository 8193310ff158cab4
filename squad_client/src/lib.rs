//! `squad_client`
//!
//! Participant-side systems:
//! - Relay connection (handshake, frame pump)
//! - Local simulation loop driving the shared [`Session`]
//! - Input intent mapping
//!
//! [`Session`]: squad_shared::session::Session

pub mod intent;
pub mod session_client;

pub use session_client::SessionClient;
