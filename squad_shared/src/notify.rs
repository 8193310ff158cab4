//! Outbound notifications for the rendering/UI collaborator.
//!
//! Fire-and-forget: the core pushes, the UI drains whenever it likes, no
//! acknowledgement. The queue is bounded; when nobody drains it the oldest
//! entries fall off rather than growing without limit.

use std::collections::VecDeque;

use crate::effects::EffectKind;
use crate::lifecycle::LifecycleState;
use crate::participant::ActorNumber;
use crate::registry::EntityId;

/// Events the UI layer consumes to update bars, text and panels.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    HealthChanged {
        entity: EntityId,
        current: f32,
        max: f32,
    },
    AmmoChanged {
        entity: EntityId,
        slot: usize,
        current: u32,
        max: u32,
    },
    LifecycleChanged {
        entity: EntityId,
        state: LifecycleState,
    },
    WeaponChanged {
        entity: EntityId,
        slot: usize,
    },
    EffectStarted {
        entity: EntityId,
        kind: EffectKind,
        duration: f32,
    },
    EffectEnded {
        entity: EntityId,
        kind: EffectKind,
    },
    CooldownStarted {
        kind: EffectKind,
        duration: f32,
    },
    /// Whole-second countdown while the local player is downed.
    RespawnCountdown {
        entity: EntityId,
        seconds_left: u32,
    },
    GameOver,
    ParticipantJoined {
        actor: ActorNumber,
        nickname: String,
    },
    ParticipantLeft {
        actor: ActorNumber,
    },
}

/// Bounded push queue.
#[derive(Debug)]
pub struct Notifications {
    events: VecDeque<UiEvent>,
    cap: usize,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Notifications {
    pub fn new(cap: usize) -> Self {
        Notifications {
            events: VecDeque::with_capacity(cap.min(64)),
            cap,
        }
    }

    pub fn push(&mut self, event: UiEvent) {
        if self.events.len() == self.cap {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Takes everything queued since the last drain, oldest first.
    pub fn drain(&mut self) -> Vec<UiEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
