//! Per-entity lifecycle state machine.
//!
//! Alive → Downed when health reaches zero (owner-driven), Downed → Alive
//! via Revive. `Reviving` is the transient state held while the owner
//! processes an accepted revive; a second request arriving in the same
//! drain sees it and is ignored.
//!
//! Once the room's GameOver flag is set every machine freezes: no further
//! transition is honored and Downed becomes terminal for the session.

use serde::{Deserialize, Serialize};

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Alive,
    Downed,
    Reviving,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Alive => "alive",
            LifecycleState::Downed => "downed",
            LifecycleState::Reviving => "reviving",
        };
        f.write_str(name)
    }
}

/// Guarded state holder. All mutators return whether the transition was
/// honored; refused transitions are silent no-ops for the caller to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    state: LifecycleState,
    frozen: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Lifecycle {
            state: LifecycleState::Alive,
            frozen: false,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.state == LifecycleState::Alive
    }

    pub fn is_downed(&self) -> bool {
        self.state == LifecycleState::Downed
    }

    /// Alive → Downed.
    pub fn down(&mut self) -> bool {
        if self.frozen || self.state != LifecycleState::Alive {
            return false;
        }
        self.state = LifecycleState::Downed;
        true
    }

    /// Downed → Reviving, claimed by the owner when it accepts a request.
    pub fn begin_revive(&mut self) -> bool {
        if self.frozen || self.state != LifecycleState::Downed {
            return false;
        }
        self.state = LifecycleState::Reviving;
        true
    }

    /// Reviving → Alive.
    pub fn complete_revive(&mut self) -> bool {
        if self.frozen || self.state != LifecycleState::Reviving {
            return false;
        }
        self.state = LifecycleState::Alive;
        true
    }

    /// Non-owner replicas jump straight to the broadcast state; the same
    /// guards apply so a frozen replica stays put.
    pub fn apply_broadcast(&mut self, downed: bool) -> bool {
        if self.frozen {
            return false;
        }
        let next = if downed {
            LifecycleState::Downed
        } else {
            LifecycleState::Alive
        };
        if self.state == next {
            return false;
        }
        self.state = next;
        true
    }

    /// GameOver reaction: the current state becomes terminal.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}
