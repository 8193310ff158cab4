//! Timed effect scheduler.
//!
//! Effects are cooperative, cancellable timers ticked from the local loop's
//! clock; they never block the loop and any number run concurrently on one
//! entity. Activating a kind that is already running cancels the prior
//! instance and restarts the duration (last writer wins per kind).
//!
//! Kinds that change how *other* participants see the entity are replicated
//! as two discrete on/off broadcasts at activation and expiry; everything
//! else ticks silently.

use serde::{Deserialize, Serialize};

/// Every timed modifier the core knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Damage requests are no-ops while active.
    Invulnerable,
    /// Entity hidden from other participants.
    Cloak,
    /// Movement ability; owner-local.
    HighJump,
    /// Movement ability; owner-local, cancellable by the key that started it.
    SlowFall,
    /// Magazine refill in progress for the active slot.
    Reload,
    /// Weapon switch lockout.
    WeaponSwitch,
    /// Downed countdown shown to the owner.
    RespawnCountdown,
}

impl EffectKind {
    /// Whether activation/expiry must be broadcast to other participants.
    pub fn is_replicated(&self) -> bool {
        matches!(self, EffectKind::Invulnerable | EffectKind::Cloak)
    }

    /// Kinds a participant may trigger with an ability key.
    pub fn is_ability(&self) -> bool {
        matches!(
            self,
            EffectKind::Invulnerable
                | EffectKind::Cloak
                | EffectKind::HighJump
                | EffectKind::SlowFall
        )
    }
}

impl std::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EffectKind::Invulnerable => "invulnerable",
            EffectKind::Cloak => "cloak",
            EffectKind::HighJump => "high-jump",
            EffectKind::SlowFall => "slow-fall",
            EffectKind::Reload => "reload",
            EffectKind::WeaponSwitch => "weapon-switch",
            EffectKind::RespawnCountdown => "respawn-countdown",
        };
        f.write_str(name)
    }
}

/// One running timer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveEffect {
    pub kind: EffectKind,
    pub remaining: f32,
    pub total: f32,
}

/// Per-entity set of running effect timers.
///
/// Vec-backed for stable tick/expiry order (activation order).
#[derive(Debug, Clone, Default)]
pub struct EffectScheduler {
    active: Vec<ActiveEffect>,
}

impl EffectScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) an effect. Returns true when a prior instance
    /// of the same kind was replaced.
    pub fn activate(&mut self, kind: EffectKind, duration: f32) -> bool {
        let effect = ActiveEffect {
            kind,
            remaining: duration,
            total: duration,
        };
        if let Some(slot) = self.active.iter_mut().find(|e| e.kind == kind) {
            *slot = effect;
            true
        } else {
            self.active.push(effect);
            false
        }
    }

    /// Stops an effect before expiry. Safe to call when none is running.
    pub fn cancel(&mut self, kind: EffectKind) -> bool {
        let before = self.active.len();
        self.active.retain(|e| e.kind != kind);
        self.active.len() != before
    }

    pub fn is_active(&self, kind: EffectKind) -> bool {
        self.active.iter().any(|e| e.kind == kind)
    }

    pub fn remaining(&self, kind: EffectKind) -> Option<f32> {
        self.active.iter().find(|e| e.kind == kind).map(|e| e.remaining)
    }

    /// Advances all timers, returning the kinds that expired this tick in
    /// activation order.
    pub fn tick(&mut self, dt: f32) -> Vec<EffectKind> {
        let mut expired = Vec::new();
        for effect in &mut self.active {
            effect.remaining -= dt;
            if effect.remaining <= 0.0 {
                expired.push(effect.kind);
            }
        }
        self.active.retain(|e| e.remaining > 0.0);
        expired
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveEffect> {
        self.active.iter()
    }
}

/// Ability cooldown tracker; activation while a kind is cooling is refused
/// by the caller.
#[derive(Debug, Clone, Default)]
pub struct CooldownSet {
    cooling: Vec<(EffectKind, f32)>,
}

impl CooldownSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, kind: EffectKind, seconds: f32) {
        if let Some(slot) = self.cooling.iter_mut().find(|(k, _)| *k == kind) {
            slot.1 = seconds;
        } else {
            self.cooling.push((kind, seconds));
        }
    }

    pub fn ready(&self, kind: EffectKind) -> bool {
        !self.cooling.iter().any(|(k, _)| *k == kind)
    }

    pub fn remaining(&self, kind: EffectKind) -> Option<f32> {
        self.cooling.iter().find(|(k, _)| *k == kind).map(|(_, r)| *r)
    }

    pub fn tick(&mut self, dt: f32) {
        for slot in &mut self.cooling {
            slot.1 -= dt;
        }
        self.cooling.retain(|(_, r)| *r > 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effects_expire_in_activation_order() {
        let mut fx = EffectScheduler::new();
        fx.activate(EffectKind::Cloak, 1.0);
        fx.activate(EffectKind::Invulnerable, 1.0);
        assert!(fx.tick(0.5).is_empty());
        let expired = fx.tick(0.6);
        assert_eq!(expired, vec![EffectKind::Cloak, EffectKind::Invulnerable]);
        assert!(!fx.is_active(EffectKind::Cloak));
    }

    #[test]
    fn reactivation_restarts_the_duration() {
        let mut fx = EffectScheduler::new();
        fx.activate(EffectKind::Invulnerable, 2.0);
        fx.tick(1.5);
        assert!(fx.activate(EffectKind::Invulnerable, 2.0));
        assert!(fx.tick(1.0).is_empty());
        assert_eq!(fx.tick(1.1), vec![EffectKind::Invulnerable]);
    }

    #[test]
    fn cancel_without_active_effect_is_a_noop() {
        let mut fx = EffectScheduler::new();
        assert!(!fx.cancel(EffectKind::SlowFall));
        fx.activate(EffectKind::SlowFall, 5.0);
        assert!(fx.cancel(EffectKind::SlowFall));
        assert!(fx.tick(10.0).is_empty());
    }

    #[test]
    fn concurrent_effects_tick_independently() {
        let mut fx = EffectScheduler::new();
        fx.activate(EffectKind::Invulnerable, 1.0);
        fx.activate(EffectKind::Cloak, 3.0);
        assert_eq!(fx.tick(1.5), vec![EffectKind::Invulnerable]);
        assert!(fx.is_active(EffectKind::Cloak));
        assert_eq!(fx.remaining(EffectKind::Cloak), Some(1.5));
    }

    #[test]
    fn cooldown_gates_until_elapsed() {
        let mut cd = CooldownSet::new();
        assert!(cd.ready(EffectKind::Cloak));
        cd.start(EffectKind::Cloak, 2.0);
        assert!(!cd.ready(EffectKind::Cloak));
        cd.tick(1.0);
        assert!(!cd.ready(EffectKind::Cloak));
        cd.tick(1.1);
        assert!(cd.ready(EffectKind::Cloak));
    }
}
