//! Entity registry and ownership model.
//!
//! Every networked entity has a view id that is stable for its lifetime and
//! exactly one owning participant. Ownership never migrates during a
//! session. Non-owners never mutate entity state directly; mutation
//! requests travel through the call channel and only the owner acts on
//! them.
//!
//! Resolving an unknown id is not an error condition worth surfacing to the
//! user: it means the entity was already destroyed and the message should
//! be discarded.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::Vec3;
use crate::participant::ActorNumber;

/// Opaque, session-stable entity view identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Registry lookup errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// The entity was destroyed (or never existed here). Callers discard
    /// the triggering message.
    EntityNotFound(EntityId),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::EntityNotFound(id) => write!(f, "entity {} not found", id.0),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Maps entity ids to their owning participant.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    next_id: u64,
    owners: BTreeMap<EntityId, ActorNumber>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        EntityRegistry {
            next_id: 1,
            owners: BTreeMap::new(),
        }
    }

    /// Allocates a fresh entity owned by `owner`. Used by the room, which
    /// is the single id allocator; participants mirror with [`insert`].
    ///
    /// [`insert`]: EntityRegistry::insert
    pub fn register(&mut self, owner: ActorNumber) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.owners.insert(id, owner);
        id
    }

    /// Records an entity allocated elsewhere (join replay, spawn notice).
    pub fn insert(&mut self, entity: EntityId, owner: ActorNumber) {
        self.owners.insert(entity, owner);
        self.next_id = self.next_id.max(entity.0 + 1);
    }

    pub fn owner_of(&self, entity: EntityId) -> Result<ActorNumber, RegistryError> {
        self.owners
            .get(&entity)
            .copied()
            .ok_or(RegistryError::EntityNotFound(entity))
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.owners.contains_key(&entity)
    }

    /// Whether `local` is authoritative for `entity`. Unknown entities are
    /// nobody's to mutate.
    pub fn is_local_owner(&self, entity: EntityId, local: ActorNumber) -> bool {
        self.owners.get(&entity) == Some(&local)
    }

    pub fn unregister(&mut self, entity: EntityId) -> bool {
        self.owners.remove(&entity).is_some()
    }

    /// Removes every entity owned by a departed participant, returning the
    /// removed ids in stable order.
    pub fn unregister_owned_by(&mut self, actor: ActorNumber) -> Vec<EntityId> {
        let removed: Vec<EntityId> = self
            .owners
            .iter()
            .filter(|(_, owner)| **owner == actor)
            .map(|(id, _)| *id)
            .collect();
        for id in &removed {
            self.owners.remove(id);
        }
        removed
    }

    /// Entities and owners in stable id order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, ActorNumber)> + '_ {
        self.owners.iter().map(|(id, owner)| (*id, *owner))
    }
}

/// Deterministic spawn position for a joining participant: slot `actor - 1`
/// into the configured ring, clamped to the last slot when the room is
/// fuller than the slot list.
pub fn spawn_slot(slots: &[Vec3], actor: ActorNumber) -> Vec3 {
    if slots.is_empty() {
        return Vec3::ZERO;
    }
    let index = (actor.0.max(1) as usize - 1).min(slots.len() - 1);
    slots[index]
}
