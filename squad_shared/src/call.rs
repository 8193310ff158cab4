//! Replicated call types.
//!
//! The single messaging primitive every component uses. A call names a
//! scope (an entity or the room), a delivery target mode, and the method
//! payload. Buffering is a first-class property of the target mode, not a
//! side effect of any particular method.
//!
//! Delivery guarantees (provided by the room router): at-least-once per
//! connected recipient, per-sender FIFO, no ordering across senders.
//! Handlers are therefore written to be idempotent: state sync methods
//! carry the resulting value ("set health to X"), never a delta.

use serde::{Deserialize, Serialize};

use crate::effects::EffectKind;
use crate::math::Vec3;
use crate::participant::{ActorNumber, PropertyKey, PropertyValue};
use crate::registry::EntityId;

/// Delivery target mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallTarget {
    /// Every currently-connected participant, sender included. Not stored.
    All,
    /// Every currently-connected participant, and stored so late joiners
    /// replay it once, in original send order, before live traffic.
    AllBuffered,
    /// Everyone except the sender.
    Others,
}

impl CallTarget {
    pub fn is_buffered(&self) -> bool {
        matches!(self, CallTarget::AllBuffered)
    }
}

/// What a call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallScope {
    Entity(EntityId),
    Room,
}

/// Replicated method payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameCall {
    // Entity scope
    /// Damage request; only the target's owner applies it.
    TakeDamage { amount: f32, attacker: ActorNumber },
    /// Owner re-broadcast of the authoritative health value.
    SyncHealth { value: f32 },
    /// Owner broadcast of a lifecycle change.
    SetDowned { downed: bool },
    /// Revive request from a nearby participant; owner-honored only.
    Revive,
    /// Owner broadcast of one weapon slot's ammo count.
    SyncAmmo { slot: usize, value: u32 },
    /// Replicated effect on/off edge (invulnerability, cloak).
    EffectState { kind: EffectKind, active: bool },
    /// Owner broadcast of a position reset.
    Teleport { position: Vec3 },

    // Room scope
    /// Last-write-wins participant property update.
    SetParticipantProperty {
        actor: ActorNumber,
        key: PropertyKey,
        value: PropertyValue,
    },
    /// Last-write-wins room property update (coordinator writes GameOver).
    SetRoomProperty { key: PropertyKey, value: PropertyValue },
    /// Room-originated: a participant joined and its entity was spawned.
    PlayerJoined {
        actor: ActorNumber,
        nickname: String,
        entity: EntityId,
    },
    /// Room-originated: a participant left; its entities are destroyed.
    PlayerLeft { actor: ActorNumber },
}

/// A call in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicatedCall {
    pub sender: ActorNumber,
    /// Per-sender sequence number; recipients see each sender's calls in
    /// increasing order.
    pub seq: u64,
    pub scope: CallScope,
    pub target: CallTarget,
    pub call: GameCall,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_roundtrips_through_json() {
        let call = ReplicatedCall {
            sender: ActorNumber(2),
            seq: 7,
            scope: CallScope::Entity(EntityId(3)),
            target: CallTarget::AllBuffered,
            call: GameCall::SyncHealth { value: 40.0 },
        };
        let json = serde_json::to_string(&call).unwrap();
        let back: ReplicatedCall = serde_json::from_str(&json).unwrap();
        assert_eq!(call, back);
    }

    #[test]
    fn only_all_buffered_is_stored() {
        assert!(CallTarget::AllBuffered.is_buffered());
        assert!(!CallTarget::All.is_buffered());
        assert!(!CallTarget::Others.is_buffered());
    }
}
