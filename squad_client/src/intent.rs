//! Local input intents.
//!
//! The input/physics collaborator reduces key presses and raycast results
//! to these intents; applying one drives the corresponding session entry
//! point. Nothing here touches the network directly.

use squad_shared::effects::EffectKind;
use squad_shared::registry::EntityId;
use squad_shared::session::Session;

/// One frame's worth of player input, already resolved by the collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    /// Trigger pull; the collaborator raycasts only when the shot spends.
    Fire,
    /// Raycast outcome for a spent shot.
    HitDetected { target: EntityId, distance: f32 },
    /// Ability key for one of the timed skills.
    Ability(EffectKind),
    /// Revive key near a downed player.
    Revive { target: EntityId },
    /// Weapon slot selection (keys 1..3 / mouse wheel).
    SwitchWeapon { slot: usize },
    /// Manual reload key.
    Reload,
}

/// Feeds one intent into the session.
pub fn apply(session: &mut Session, intent: Intent) {
    match intent {
        Intent::Fire => {
            session.local_fire_pressed();
        }
        Intent::HitDetected { target, distance } => session.local_hit_detected(target, distance),
        Intent::Ability(kind) => session.local_ability_pressed(kind),
        Intent::Revive { target } => session.local_revive_pressed(target),
        Intent::SwitchWeapon { slot } => session.local_switch_weapon(slot),
        Intent::Reload => session.local_reload_pressed(),
    }
}
