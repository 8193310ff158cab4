//! Combat sub-states: health, per-slot ammo, fire gating.
//!
//! These are plain owner-held values; replication happens above this layer
//! by broadcasting the resulting numbers (never deltas), so applying the
//! same sync twice is harmless.

use serde::{Deserialize, Serialize};

use crate::config::WeaponConfig;

/// Current/max health, clamped to `[0, max]`. Max is fixed per session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthPool {
    current: f32,
    max: f32,
}

impl HealthPool {
    pub fn new(max: f32) -> Self {
        HealthPool { current: max, max }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    /// Applies damage clamped to `[0, max]`; returns the new value.
    /// A negative amount heals but can never overshoot the pool.
    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        self.current = (self.current - amount).clamp(0.0, self.max);
        self.current
    }

    /// Absolute set, used by resync handlers.
    pub fn set(&mut self, value: f32) -> f32 {
        self.current = value.clamp(0.0, self.max);
        self.current
    }

    /// Back to full, used on revive.
    pub fn reset(&mut self) {
        self.current = self.max;
    }
}

/// One weapon slot's magazine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmmoSlot {
    pub current: u32,
    pub max: u32,
}

/// Per-slot ammo, tracked independently so switching weapons never loses
/// rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmmoState {
    slots: Vec<AmmoSlot>,
}

impl AmmoState {
    /// Full magazines for every configured weapon.
    pub fn from_loadout(weapons: &[WeaponConfig]) -> Self {
        AmmoState {
            slots: weapons
                .iter()
                .map(|w| AmmoSlot {
                    current: w.max_ammo,
                    max: w.max_ammo,
                })
                .collect(),
        }
    }

    pub fn slot(&self, index: usize) -> Option<AmmoSlot> {
        self.slots.get(index).copied()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Consumes one round; false when the magazine is empty or the slot is
    /// unknown.
    pub fn consume(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.current > 0 => {
                slot.current -= 1;
                true
            }
            _ => false,
        }
    }

    /// Absolute set, used by resync handlers; clamps to the slot max.
    pub fn set(&mut self, index: usize, value: u32) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.current = value.min(slot.max);
        }
    }

    /// Refills one slot to its max; returns the new count.
    pub fn refill(&mut self, index: usize) -> u32 {
        match self.slots.get_mut(index) {
            Some(slot) => {
                slot.current = slot.max;
                slot.current
            }
            None => 0,
        }
    }
}

/// Fire-rate gate for the local trigger.
#[derive(Debug, Clone, Copy, Default)]
pub struct FireControl {
    since_last_shot: f32,
}

impl FireControl {
    pub fn new() -> Self {
        // Ready immediately on spawn.
        FireControl {
            since_last_shot: f32::MAX,
        }
    }

    pub fn tick(&mut self, dt: f32) {
        self.since_last_shot = (self.since_last_shot + dt).min(f32::MAX / 2.0);
    }

    /// Consumes the gate when the interval has elapsed.
    pub fn try_fire(&mut self, interval: f32) -> bool {
        if self.since_last_shot >= interval {
            self.since_last_shot = 0.0;
            true
        } else {
            false
        }
    }
}
