//! Configuration system.
//!
//! Loads game configuration from JSON strings/files (file IO left to app).
//! Every participant in a room is expected to run with the same combat
//! values; the relay address and nickname are per-participant.

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Per-weapon-slot tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeaponConfig {
    /// Display name, e.g. "rifle".
    pub name: String,
    /// Damage per hit.
    pub damage: f32,
    /// Minimum seconds between shots.
    pub fire_interval: f32,
    /// Magazine size for this slot.
    pub max_ammo: u32,
    /// Reload duration in seconds.
    pub reload_seconds: f32,
}

/// Root configuration shared by relay and participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Relay listen/connect address, e.g. `127.0.0.1:40200`.
    pub server_addr: String,
    /// Local simulation tick rate.
    pub tick_hz: u32,
    /// Participant nickname (client only).
    #[serde(default = "default_nickname")]
    pub nickname: String,

    /// Health pool maximum, fixed for the session.
    #[serde(default = "default_max_health")]
    pub max_health: f32,
    /// Maximum distance at which a reported hit is accepted.
    #[serde(default = "default_hit_range")]
    pub hit_range: f32,
    /// Downed countdown shown to the owner, in seconds.
    #[serde(default = "default_respawn_seconds")]
    pub respawn_seconds: f32,
    /// Duration of timed ability effects.
    #[serde(default = "default_ability_seconds")]
    pub ability_seconds: f32,
    /// Cooldown between ability activations.
    #[serde(default = "default_ability_cooldown")]
    pub ability_cooldown: f32,
    /// Weapon switch animation lockout.
    #[serde(default = "default_switch_seconds")]
    pub weapon_switch_seconds: f32,
    /// Half-width of the random respawn scatter square.
    #[serde(default = "default_scatter")]
    pub respawn_scatter: f32,

    /// Spawn slots; a joining participant takes slot `actor - 1`, clamped.
    #[serde(default = "default_spawn_slots")]
    pub spawn_slots: Vec<Vec3>,
    /// Weapon loadout, one entry per slot.
    #[serde(default = "default_weapons")]
    pub weapons: Vec<WeaponConfig>,
}

fn default_nickname() -> String {
    "Player".to_string()
}

fn default_max_health() -> f32 {
    100.0
}

fn default_hit_range() -> f32 {
    100.0
}

fn default_respawn_seconds() -> f32 {
    8.0
}

fn default_ability_seconds() -> f32 {
    15.0
}

fn default_ability_cooldown() -> f32 {
    10.0
}

fn default_switch_seconds() -> f32 {
    0.5
}

fn default_scatter() -> f32 {
    20.0
}

fn default_spawn_slots() -> Vec<Vec3> {
    // Eight slots on a ring around the map origin.
    (0..8)
        .map(|i| {
            let angle = std::f32::consts::TAU * (i as f32) / 8.0;
            Vec3::new(12.0 * angle.cos(), 0.0, 12.0 * angle.sin())
        })
        .collect()
}

fn default_weapons() -> Vec<WeaponConfig> {
    vec![
        WeaponConfig {
            name: "rifle".to_string(),
            damage: 10.0,
            fire_interval: 0.2,
            max_ammo: 30,
            reload_seconds: 2.0,
        },
        WeaponConfig {
            name: "shotgun".to_string(),
            damage: 25.0,
            fire_interval: 0.8,
            max_ammo: 8,
            reload_seconds: 2.5,
        },
        WeaponConfig {
            name: "smg".to_string(),
            damage: 6.0,
            fire_interval: 0.08,
            max_ammo: 40,
            reload_seconds: 1.5,
        },
    ]
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:40200".to_string(),
            tick_hz: 64,
            nickname: default_nickname(),
            max_health: default_max_health(),
            hit_range: default_hit_range(),
            respawn_seconds: default_respawn_seconds(),
            ability_seconds: default_ability_seconds(),
            ability_cooldown: default_ability_cooldown(),
            weapon_switch_seconds: default_switch_seconds(),
            respawn_scatter: default_scatter(),
            spawn_slots: default_spawn_slots(),
            weapons: default_weapons(),
        }
    }
}

impl GameConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg =
            GameConfig::from_json_str(r#"{"server_addr":"127.0.0.1:1234","tick_hz":32}"#).unwrap();
        assert_eq!(cfg.tick_hz, 32);
        assert_eq!(cfg.max_health, 100.0);
        assert_eq!(cfg.weapons.len(), 3);
        assert_eq!(cfg.spawn_slots.len(), 8);
    }
}
