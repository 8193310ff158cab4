//! Session participants and their replicated custom properties.
//!
//! A participant is a connected room member. Actor numbers are assigned
//! monotonically from 1 in join order and stay stable for the session.
//! Actor 0 is reserved for calls originated by the room itself.
//!
//! Properties are a small typed key/value map with last-write-wins
//! semantics; late joiners receive the current values as a snapshot, not
//! the write history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Monotonically assigned participant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorNumber(pub u32);

impl ActorNumber {
    /// Sender id used for room-originated calls (join/leave notices).
    pub const ROOM: ActorNumber = ActorNumber(0);

    pub fn is_room(&self) -> bool {
        *self == Self::ROOM
    }
}

impl std::fmt::Display for ActorNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Replicated property keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PropertyKey {
    /// Participant: false while its player entity is downed.
    IsAlive,
    /// Participant: active weapon slot.
    WeaponIndex,
    /// Room: terminal flag, written only by the coordinator.
    GameOver,
}

/// Replicated property values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            PropertyValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            PropertyValue::Bool(_) => None,
        }
    }
}

/// Last-write-wins property map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyMap {
    entries: BTreeMap<PropertyKey, PropertyValue>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property, returning true when the stored value changed.
    pub fn set(&mut self, key: PropertyKey, value: PropertyValue) -> bool {
        self.entries.insert(key, value) != Some(value)
    }

    pub fn get(&self, key: PropertyKey) -> Option<PropertyValue> {
        self.entries.get(&key).copied()
    }

    pub fn get_bool(&self, key: PropertyKey) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_int(&self, key: PropertyKey) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int())
    }

    /// Current-value snapshot in stable key order.
    pub fn snapshot(&self) -> Vec<(PropertyKey, PropertyValue)> {
        self.entries.iter().map(|(k, v)| (*k, *v)).collect()
    }
}

/// A connected room member as seen by a participant.
#[derive(Debug, Clone)]
pub struct Participant {
    pub actor: ActorNumber,
    pub nickname: String,
    /// Exactly one participant holds this for the lifetime of the room.
    pub is_coordinator: bool,
    pub properties: PropertyMap,
}

impl Participant {
    pub fn new(actor: ActorNumber, nickname: &str, is_coordinator: bool) -> Self {
        Participant {
            actor,
            nickname: nickname.to_string(),
            is_coordinator,
            properties: PropertyMap::new(),
        }
    }

    /// Liveness as used by the coordinator's aggregate check. A participant
    /// that never published the property counts as alive.
    pub fn is_alive(&self) -> bool {
        self.properties.get_bool(PropertyKey::IsAlive).unwrap_or(true)
    }
}
