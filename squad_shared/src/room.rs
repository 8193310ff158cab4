//! Room router: delivery, buffering, and late-join snapshots.
//!
//! The room owns the authoritative membership list, the ordered
//! `AllBuffered` log, and the current-value property snapshots. It never
//! interprets gameplay calls beyond the two property methods it snapshots;
//! everything else is routed opaquely into per-participant inbox queues
//! that each local loop drains at its own defined point.
//!
//! The relay binary embeds this struct unchanged; in-process tests drive it
//! directly.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::call::{CallScope, CallTarget, GameCall, ReplicatedCall};
use crate::participant::{ActorNumber, PropertyKey, PropertyMap, PropertyValue};
use crate::registry::{EntityId, EntityRegistry};

/// Room-side record of one member.
#[derive(Debug, Clone)]
struct Member {
    nickname: String,
    entity: EntityId,
    properties: PropertyMap,
}

/// Current-value membership snapshot handed to a late joiner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    pub actor: ActorNumber,
    pub nickname: String,
    pub entity: EntityId,
    pub properties: Vec<(PropertyKey, PropertyValue)>,
}

/// Everything a joiner needs before live traffic: membership (self
/// included), the coordinator, room properties as current values, and the
/// buffered log in original send order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinReplay {
    pub coordinator: Option<ActorNumber>,
    pub participants: Vec<ParticipantSnapshot>,
    pub room_properties: Vec<(PropertyKey, PropertyValue)>,
    pub buffered: Vec<ReplicatedCall>,
}

/// Result of a join: the assigned ids plus the replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinAck {
    pub actor: ActorNumber,
    pub entity: EntityId,
    pub replay: JoinReplay,
}

/// The room-scoped aggregate-state holder and call router.
#[derive(Debug)]
pub struct Room {
    next_actor: u32,
    registry: EntityRegistry,
    members: BTreeMap<ActorNumber, Member>,
    coordinator: Option<ActorNumber>,
    room_properties: PropertyMap,
    inboxes: HashMap<ActorNumber, VecDeque<ReplicatedCall>>,
    buffer: Vec<ReplicatedCall>,
    /// Sequence counter for room-originated calls.
    room_seq: u64,
}

impl Default for Room {
    fn default() -> Self {
        Self::new()
    }
}

impl Room {
    pub fn new() -> Self {
        Room {
            next_actor: 1,
            registry: EntityRegistry::new(),
            members: BTreeMap::new(),
            coordinator: None,
            room_properties: PropertyMap::new(),
            inboxes: HashMap::new(),
            buffer: Vec::new(),
            room_seq: 0,
        }
    }

    /// Admits a participant: assigns the next actor number, spawns its
    /// player entity, notifies existing members, and returns the replay.
    ///
    /// The first joiner becomes coordinator for the lifetime of the room.
    pub fn join(&mut self, nickname: &str) -> JoinAck {
        let actor = ActorNumber(self.next_actor);
        self.next_actor += 1;
        let entity = self.registry.register(actor);

        let mut properties = PropertyMap::new();
        properties.set(PropertyKey::IsAlive, PropertyValue::Bool(true));
        properties.set(PropertyKey::WeaponIndex, PropertyValue::Int(0));

        if self.coordinator.is_none() {
            self.coordinator = Some(actor);
        }

        // Announce to the members that were already here; the joiner learns
        // of itself through the replay.
        self.send_from_room(GameCall::PlayerJoined {
            actor,
            nickname: nickname.to_string(),
            entity,
        });

        self.members.insert(
            actor,
            Member {
                nickname: nickname.to_string(),
                entity,
                properties,
            },
        );
        self.inboxes.insert(actor, VecDeque::new());

        info!(%actor, nickname, entity = entity.0, buffered = self.buffer.len(), "participant joined room");

        JoinAck {
            actor,
            entity,
            replay: self.replay_for_joiner(),
        }
    }

    fn replay_for_joiner(&self) -> JoinReplay {
        JoinReplay {
            coordinator: self.coordinator,
            participants: self
                .members
                .iter()
                .map(|(actor, m)| ParticipantSnapshot {
                    actor: *actor,
                    nickname: m.nickname.clone(),
                    entity: m.entity,
                    properties: m.properties.snapshot(),
                })
                .collect(),
            room_properties: self.room_properties.snapshot(),
            buffered: self.buffer.clone(),
        }
    }

    /// Removes a participant. Its entities are unregistered and everyone
    /// left in the room is told. Buffered calls it sent stay in the log;
    /// replaying readers discard the stale entity references.
    pub fn leave(&mut self, actor: ActorNumber) {
        if self.members.remove(&actor).is_none() {
            debug!(%actor, "leave for unknown participant ignored");
            return;
        }
        self.inboxes.remove(&actor);
        let removed = self.registry.unregister_owned_by(actor);
        info!(%actor, entities = removed.len(), "participant left room");

        if self.coordinator == Some(actor) {
            // No re-election in this design; the room keeps running without
            // a coordinator and can no longer declare GameOver.
            warn!(%actor, "coordinator left; room continues without one");
        }

        self.send_from_room(GameCall::PlayerLeft { actor });
    }

    /// Routes a call per its target mode. Unknown senders are dropped;
    /// they already left.
    pub fn send(&mut self, call: ReplicatedCall) {
        if !call.sender.is_room() && !self.members.contains_key(&call.sender) {
            debug!(sender = %call.sender, "dropping call from departed participant");
            return;
        }

        self.apply_property_snapshot(&call.call);

        if call.target.is_buffered() {
            self.buffer.push(call.clone());
        }

        for (actor, inbox) in self.inboxes.iter_mut() {
            if call.target == CallTarget::Others && *actor == call.sender {
                continue;
            }
            inbox.push_back(call.clone());
        }
    }

    /// Keeps the late-join snapshots current. Property methods are the only
    /// calls the room looks inside.
    fn apply_property_snapshot(&mut self, call: &GameCall) {
        match call {
            GameCall::SetParticipantProperty { actor, key, value } => {
                match self.members.get_mut(actor) {
                    Some(member) => {
                        member.properties.set(*key, *value);
                    }
                    None => debug!(%actor, "property update for departed participant dropped"),
                }
            }
            GameCall::SetRoomProperty { key, value } => {
                self.room_properties.set(*key, *value);
            }
            _ => {}
        }
    }

    fn send_from_room(&mut self, call: GameCall) {
        self.room_seq += 1;
        let call = ReplicatedCall {
            sender: ActorNumber::ROOM,
            seq: self.room_seq,
            scope: CallScope::Room,
            target: CallTarget::All,
            call,
        };
        self.send(call);
    }

    /// Drains a participant's inbox: the defined point where its local loop
    /// takes delivery.
    pub fn drain(&mut self, actor: ActorNumber) -> Vec<ReplicatedCall> {
        match self.inboxes.get_mut(&actor) {
            Some(inbox) => inbox.drain(..).collect(),
            None => Vec::new(),
        }
    }

    pub fn coordinator(&self) -> Option<ActorNumber> {
        self.coordinator
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> impl Iterator<Item = ActorNumber> + '_ {
        self.members.keys().copied()
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn room_property(&self, key: PropertyKey) -> Option<PropertyValue> {
        self.room_properties.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(sender: u32, seq: u64, target: CallTarget, payload: GameCall) -> ReplicatedCall {
        ReplicatedCall {
            sender: ActorNumber(sender),
            seq,
            scope: CallScope::Room,
            target,
            call: payload,
        }
    }

    #[test]
    fn first_joiner_is_coordinator() {
        let mut room = Room::new();
        let a = room.join("Ray");
        let b = room.join("Kai");
        assert_eq!(room.coordinator(), Some(a.actor));
        assert_eq!(b.replay.coordinator, Some(a.actor));
        assert_eq!(b.actor, ActorNumber(2));
    }

    #[test]
    fn others_excludes_the_sender() {
        let mut room = Room::new();
        let a = room.join("Ray");
        let b = room.join("Kai");
        room.drain(a.actor);
        room.drain(b.actor);

        room.send(call(
            a.actor.0,
            1,
            CallTarget::Others,
            GameCall::PlayerLeft {
                actor: ActorNumber(9),
            },
        ));
        assert!(room.drain(a.actor).is_empty());
        assert_eq!(room.drain(b.actor).len(), 1);
    }

    #[test]
    fn buffered_calls_replay_in_send_order() {
        let mut room = Room::new();
        let a = room.join("Ray");
        for seq in 1..=3 {
            room.send(call(
                a.actor.0,
                seq,
                CallTarget::AllBuffered,
                GameCall::SetRoomProperty {
                    key: PropertyKey::GameOver,
                    value: PropertyValue::Bool(false),
                },
            ));
        }
        let late = room.join("Kai");
        let seqs: Vec<u64> = late.replay.buffered.iter().map(|c| c.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn property_snapshot_is_current_value_not_history() {
        let mut room = Room::new();
        let a = room.join("Ray");
        for downed in [false, true, false] {
            room.send(call(
                a.actor.0,
                1,
                CallTarget::All,
                GameCall::SetParticipantProperty {
                    actor: a.actor,
                    key: PropertyKey::IsAlive,
                    value: PropertyValue::Bool(!downed),
                },
            ));
        }
        let late = room.join("Kai");
        let snap = &late.replay.participants[0];
        assert!(snap
            .properties
            .contains(&(PropertyKey::IsAlive, PropertyValue::Bool(true))));
        // None of the property writes were buffered as events.
        assert_eq!(late.replay.buffered.len(), 0);
    }

    #[test]
    fn departed_sender_calls_are_dropped() {
        let mut room = Room::new();
        let a = room.join("Ray");
        let b = room.join("Kai");
        room.leave(a.actor);
        room.drain(b.actor);
        room.send(call(
            a.actor.0,
            5,
            CallTarget::All,
            GameCall::Revive,
        ));
        assert!(room.drain(b.actor).is_empty());
    }

    #[test]
    fn leave_announces_and_unregisters() {
        let mut room = Room::new();
        let a = room.join("Ray");
        let b = room.join("Kai");
        room.drain(b.actor);
        room.leave(a.actor);
        let msgs = room.drain(b.actor);
        assert!(msgs
            .iter()
            .any(|c| matches!(c.call, GameCall::PlayerLeft { actor } if actor == a.actor)));
        assert_eq!(room.member_count(), 1);
    }
}
