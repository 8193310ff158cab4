//! `squad_server`
//!
//! The room relay:
//! - Admits participants and assigns actor numbers in join order
//! - Routes replicated calls by target mode (All / AllBuffered / Others)
//! - Stores the buffered log and property snapshots for late joiners
//!
//! Gameplay authority stays with the participants; the relay only delivers.

pub mod relay;

pub use relay::RelayServer;
