//! `squad_shared`
//!
//! Replication core shared by the relay and participant crates: per-player
//! combat state (health, ammo, lifecycle, timed effects) kept consistent
//! across participants where each participant owns exactly one entity and
//! one globally-chosen coordinator owns room-wide decisions.
//!
//! Design goals:
//! - Single-threaded state mutation per participant; calls drain at a
//!   defined loop point, so entity state needs no locks.
//! - Owner-only mutation, absolute-value resync, idempotent handlers.
//! - Traits and enums over name-based lookups; no `unsafe`.

pub mod call;
pub mod combat;
pub mod config;
pub mod effects;
pub mod lifecycle;
pub mod math;
pub mod net;
pub mod notify;
pub mod participant;
pub mod registry;
pub mod room;
pub mod session;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::call::*;
    pub use crate::config::*;
    pub use crate::math::*;
    pub use crate::net::*;
    pub use crate::participant::*;
    pub use crate::registry::*;
    pub use crate::room::*;
    pub use crate::session::*;
}
