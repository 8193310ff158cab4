//! Per-participant simulation loop.
//!
//! One session runs one logical thread of game-state mutation. Incoming
//! replicated calls are queued by the transport and drained at the top of
//! [`Session::tick`], never concurrently with local mutation; entity state
//! therefore needs no locks.
//!
//! Authority model: the session applies mutations only to the entity it
//! owns. Requests against that entity from anyone (damage, revive) arrive
//! as calls; requests against other entities leave as calls. The resulting
//! authoritative values are re-broadcast as absolute "set" methods so every
//! replica, late joiners included, converges.

use std::collections::{BTreeMap, VecDeque};

use rand::Rng;
use tracing::{debug, info, warn};

use crate::call::{CallScope, CallTarget, GameCall, ReplicatedCall};
use crate::combat::{AmmoSlot, AmmoState, FireControl, HealthPool};
use crate::config::GameConfig;
use crate::effects::{CooldownSet, EffectKind, EffectScheduler};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::math::Vec3;
use crate::notify::{Notifications, UiEvent};
use crate::participant::{ActorNumber, Participant, PropertyKey, PropertyMap, PropertyValue};
use crate::registry::{spawn_slot, EntityId, EntityRegistry};
use crate::room::JoinAck;

/// Replicated view of one player entity.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub owner: ActorNumber,
    pub health: HealthPool,
    pub ammo: AmmoState,
    pub lifecycle: Lifecycle,
    pub position: Vec3,
    pub active_weapon: usize,
    /// Owner-side input gate; mirrors the Downed controls lockout.
    pub controls_enabled: bool,
    /// Replicated effect on/off flags (invulnerability, cloak).
    flags: Vec<EffectKind>,
}

impl PlayerState {
    fn new(owner: ActorNumber, cfg: &GameConfig, position: Vec3) -> Self {
        PlayerState {
            owner,
            health: HealthPool::new(cfg.max_health),
            ammo: AmmoState::from_loadout(&cfg.weapons),
            lifecycle: Lifecycle::new(),
            position,
            active_weapon: 0,
            controls_enabled: true,
            flags: Vec::new(),
        }
    }

    pub fn has_flag(&self, kind: EffectKind) -> bool {
        self.flags.contains(&kind)
    }

    /// Returns true when the stored flag actually changed.
    fn set_flag(&mut self, kind: EffectKind, active: bool) -> bool {
        let present = self.flags.contains(&kind);
        match (present, active) {
            (false, true) => {
                self.flags.push(kind);
                true
            }
            (true, false) => {
                self.flags.retain(|k| *k != kind);
                true
            }
            _ => false,
        }
    }
}

/// A participant's local simulation of the shared combat state.
pub struct Session {
    cfg: GameConfig,
    local_actor: ActorNumber,
    local_entity: EntityId,
    coordinator: Option<ActorNumber>,

    registry: EntityRegistry,
    participants: BTreeMap<ActorNumber, Participant>,
    room_properties: PropertyMap,
    players: BTreeMap<EntityId, PlayerState>,

    /// Owner-authoritative timers for the local entity.
    effects: EffectScheduler,
    cooldowns: CooldownSet,
    fire: FireControl,

    inbox: VecDeque<ReplicatedCall>,
    outgoing: Vec<ReplicatedCall>,
    seq: u64,
    notify: Notifications,

    /// Coordinator latch: GameOver is written at most once.
    game_over_declared: bool,
    /// Local terminal reaction latch.
    game_over_seen: bool,
    /// Owned entities whose revive was accepted this drain; completed after
    /// the whole batch so a second rescuer in the same drain is ignored.
    pending_revives: Vec<EntityId>,
    respawn_last_whole: u32,
}

impl Session {
    /// Builds a session from a join acknowledgement: membership and
    /// property snapshots first, then the buffered log queued for replay on
    /// the first tick, before any live traffic the transport appends.
    pub fn new(cfg: GameConfig, ack: JoinAck) -> Self {
        let mut session = Session {
            local_actor: ack.actor,
            local_entity: ack.entity,
            coordinator: ack.replay.coordinator,
            registry: EntityRegistry::new(),
            participants: BTreeMap::new(),
            room_properties: PropertyMap::new(),
            players: BTreeMap::new(),
            effects: EffectScheduler::new(),
            cooldowns: CooldownSet::new(),
            fire: FireControl::new(),
            inbox: VecDeque::new(),
            outgoing: Vec::new(),
            seq: 0,
            notify: Notifications::default(),
            game_over_declared: false,
            game_over_seen: false,
            pending_revives: Vec::new(),
            respawn_last_whole: 0,
            cfg,
        };

        for snap in &ack.replay.participants {
            session.registry.insert(snap.entity, snap.actor);
            let mut participant = Participant::new(
                snap.actor,
                &snap.nickname,
                ack.replay.coordinator == Some(snap.actor),
            );
            let mut player = PlayerState::new(
                snap.actor,
                &session.cfg,
                spawn_slot(&session.cfg.spawn_slots, snap.actor),
            );
            for (key, value) in &snap.properties {
                participant.properties.set(*key, *value);
            }
            if let Some(slot) = participant.properties.get_int(PropertyKey::WeaponIndex) {
                player.active_weapon = clamp_slot(&session.cfg, slot);
            }
            if !participant.is_alive() {
                player.lifecycle.apply_broadcast(true);
                player.controls_enabled = false;
            }
            session.participants.insert(snap.actor, participant);
            session.players.insert(snap.entity, player);
        }

        for (key, value) in &ack.replay.room_properties {
            session.room_properties.set(*key, *value);
        }
        if session.room_properties.get_bool(PropertyKey::GameOver) == Some(true) {
            session.react_to_game_over();
        }

        info!(
            actor = %ack.actor,
            entity = ack.entity.0,
            replayed = ack.replay.buffered.len(),
            coordinator = session.is_coordinator(),
            "session joined room"
        );

        // Buffered replay, in original send order, ahead of live traffic.
        session.inbox.extend(ack.replay.buffered);
        session
    }

    // Transport surface

    pub fn enqueue_incoming(&mut self, call: ReplicatedCall) {
        self.inbox.push_back(call);
    }

    pub fn take_outgoing(&mut self) -> Vec<ReplicatedCall> {
        std::mem::take(&mut self.outgoing)
    }

    /// Drains queued UI notifications for the rendering collaborator.
    pub fn drain_ui(&mut self) -> Vec<UiEvent> {
        self.notify.drain()
    }

    /// One step of the local loop: take delivery of queued calls, settle
    /// accepted revives, then advance the local timers.
    pub fn tick(&mut self, dt: f32) {
        let calls: Vec<ReplicatedCall> = self.inbox.drain(..).collect();
        for call in calls {
            self.handle_call(call);
        }
        self.finish_pending_revives();

        self.fire.tick(dt);
        self.cooldowns.tick(dt);
        if !self.game_over_seen {
            self.tick_effects(dt);
        }
    }

    // Local intents (from the input/physics collaborator)

    /// Trigger pull. Returns true when a shot was spent, in which case the
    /// collaborator runs its raycast and reports any hit back via
    /// [`Session::local_hit_detected`].
    pub fn local_fire_pressed(&mut self) -> bool {
        if !self.local_can_act() {
            return false;
        }
        if self.effects.is_active(EffectKind::Reload)
            || self.effects.is_active(EffectKind::WeaponSwitch)
        {
            return false;
        }
        let slot = match self.players.get(&self.local_entity) {
            Some(p) => p.active_weapon,
            None => return false,
        };
        // An empty loadout means there is nothing to fire.
        let interval = match self.cfg.weapons.get(slot) {
            Some(weapon) => weapon.fire_interval,
            None => return false,
        };
        if !self.fire.try_fire(interval) {
            return false;
        }

        let (fired, value, max) = {
            let Some(p) = self.players.get_mut(&self.local_entity) else {
                return false;
            };
            let fired = p.ammo.consume(slot);
            let ammo = p.ammo.slot(slot).unwrap_or(AmmoSlot { current: 0, max: 0 });
            (fired, ammo.current, ammo.max)
        };
        if !fired {
            // Dry click on an empty magazine starts the reload.
            self.start_reload();
            return false;
        }

        self.notify.push(UiEvent::AmmoChanged {
            entity: self.local_entity,
            slot,
            current: value,
            max,
        });
        self.push_call(
            CallScope::Entity(self.local_entity),
            CallTarget::All,
            GameCall::SyncAmmo { slot, value },
        );
        true
    }

    /// Result of the collaborator's local raycast. Distance beyond the
    /// configured range, self-hits, and stale targets are discarded.
    pub fn local_hit_detected(&mut self, target: EntityId, distance: f32) {
        if !self.local_can_act() || target == self.local_entity {
            return;
        }
        if distance > self.cfg.hit_range {
            debug!(target = target.0, distance, "hit beyond range discarded");
            return;
        }
        let slot = match self.players.get(&self.local_entity) {
            Some(p) => p.active_weapon,
            None => return,
        };
        let amount = match self.cfg.weapons.get(slot) {
            Some(weapon) => weapon.damage,
            None => return,
        };
        self.report_hit(target, amount);
    }

    /// Requests damage against `target`. Any participant may request; only
    /// the target's owner applies it, exactly once, from its own state.
    pub fn report_hit(&mut self, target: EntityId, amount: f32) {
        if !self.registry.contains(target) {
            debug!(target = target.0, "hit report for destroyed entity discarded");
            return;
        }
        self.push_call(
            CallScope::Entity(target),
            CallTarget::All,
            GameCall::TakeDamage {
                amount,
                attacker: self.local_actor,
            },
        );
    }

    /// Ability key. Starts the timed effect unless it is cooling down; a
    /// second press while SlowFall runs cancels it early, matching the
    /// toggle that ability always had. The cooldown keeps running.
    pub fn local_ability_pressed(&mut self, kind: EffectKind) {
        if !kind.is_ability() {
            warn!(%kind, "key bound to a non-ability effect ignored");
            return;
        }
        if !self.local_can_act() {
            return;
        }
        if kind == EffectKind::SlowFall && self.effects.is_active(kind) {
            self.effects.cancel(kind);
            self.notify.push(UiEvent::EffectEnded {
                entity: self.local_entity,
                kind,
            });
            return;
        }
        if !self.cooldowns.ready(kind) {
            debug!(%kind, remaining = self.cooldowns.remaining(kind), "ability on cooldown");
            return;
        }

        let duration = self.cfg.ability_seconds;
        self.effects.activate(kind, duration);
        if kind.is_replicated() {
            self.set_local_flag(kind, true);
        }
        self.notify.push(UiEvent::EffectStarted {
            entity: self.local_entity,
            kind,
            duration,
        });
        self.cooldowns.start(kind, self.cfg.ability_cooldown);
        self.notify.push(UiEvent::CooldownStarted {
            kind,
            duration: self.cfg.ability_cooldown,
        });
    }

    /// Revive key, pressed near a downed player (proximity detection is the
    /// collaborator's job). Sends the request to the target's owner.
    pub fn local_revive_pressed(&mut self, target: EntityId) {
        if self.game_over_seen {
            return;
        }
        if !self.registry.contains(target) {
            debug!(target = target.0, "revive for destroyed entity discarded");
            return;
        }
        if self.registry.is_local_owner(target, self.local_actor) {
            return;
        }
        let downed = self
            .players
            .get(&target)
            .map(|p| p.lifecycle.is_downed())
            .unwrap_or(false);
        if !downed {
            debug!(target = target.0, "revive target is not downed");
            return;
        }
        self.push_call(CallScope::Entity(target), CallTarget::All, GameCall::Revive);
    }

    /// Weapon switch. Per-slot ammo is untouched; a running reload is
    /// cancelled and a short lockout blocks fire and further switches.
    pub fn local_switch_weapon(&mut self, slot: usize) {
        if !self.local_can_act() || slot >= self.cfg.weapons.len() {
            return;
        }
        if self.effects.is_active(EffectKind::WeaponSwitch) {
            debug!("already changing weapons");
            return;
        }
        {
            let Some(p) = self.players.get_mut(&self.local_entity) else {
                return;
            };
            if p.active_weapon == slot {
                return;
            }
            p.active_weapon = slot;
        }
        if self.effects.cancel(EffectKind::Reload) {
            self.notify.push(UiEvent::EffectEnded {
                entity: self.local_entity,
                kind: EffectKind::Reload,
            });
        }
        self.effects
            .activate(EffectKind::WeaponSwitch, self.cfg.weapon_switch_seconds);
        self.notify.push(UiEvent::WeaponChanged {
            entity: self.local_entity,
            slot,
        });
        self.set_participant_property(PropertyKey::WeaponIndex, PropertyValue::Int(slot as i64));
    }

    /// Reload key.
    pub fn local_reload_pressed(&mut self) {
        if !self.local_can_act() {
            return;
        }
        let wants_reload = {
            let Some(p) = self.players.get(&self.local_entity) else {
                return;
            };
            match p.ammo.slot(p.active_weapon) {
                Some(slot) => slot.current < slot.max,
                None => false,
            }
        };
        if wants_reload {
            self.start_reload();
        }
    }

    // Accessors

    pub fn actor(&self) -> ActorNumber {
        self.local_actor
    }

    pub fn entity(&self) -> EntityId {
        self.local_entity
    }

    pub fn is_coordinator(&self) -> bool {
        self.coordinator == Some(self.local_actor)
    }

    pub fn game_over(&self) -> bool {
        self.game_over_seen
    }

    pub fn player(&self, entity: EntityId) -> Option<&PlayerState> {
        self.players.get(&entity)
    }

    pub fn health_of(&self, entity: EntityId) -> Option<f32> {
        self.players.get(&entity).map(|p| p.health.current())
    }

    pub fn lifecycle_of(&self, entity: EntityId) -> Option<LifecycleState> {
        self.players.get(&entity).map(|p| p.lifecycle.state())
    }

    pub fn ammo_of(&self, entity: EntityId, slot: usize) -> Option<AmmoSlot> {
        self.players.get(&entity).and_then(|p| p.ammo.slot(slot))
    }

    pub fn effect_remaining(&self, kind: EffectKind) -> Option<f32> {
        self.effects.remaining(kind)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn entity_of(&self, actor: ActorNumber) -> Option<EntityId> {
        self.registry
            .iter()
            .find(|(_, owner)| *owner == actor)
            .map(|(entity, _)| entity)
    }

    // Call handling

    fn handle_call(&mut self, call: ReplicatedCall) {
        match call.scope {
            CallScope::Entity(entity) => {
                if !self.registry.contains(entity) {
                    // Entity already destroyed; the message is stale.
                    debug!(entity = entity.0, sender = %call.sender, "call for unknown entity discarded");
                    return;
                }
                self.handle_entity_call(entity, call.sender, call.call);
            }
            CallScope::Room => self.handle_room_call(call.call),
        }
    }

    fn handle_entity_call(&mut self, entity: EntityId, sender: ActorNumber, call: GameCall) {
        match call {
            GameCall::TakeDamage { amount, attacker } => {
                self.apply_damage_as_owner(entity, amount, attacker);
            }
            GameCall::SyncHealth { value } => {
                let changed = {
                    let Some(p) = self.players.get_mut(&entity) else {
                        return;
                    };
                    let before = p.health.current();
                    p.health.set(value) != before
                };
                if changed {
                    let p = &self.players[&entity];
                    self.notify.push(UiEvent::HealthChanged {
                        entity,
                        current: p.health.current(),
                        max: p.health.max(),
                    });
                }
            }
            GameCall::SetDowned { downed } => {
                let changed = {
                    let Some(p) = self.players.get_mut(&entity) else {
                        return;
                    };
                    let changed = p.lifecycle.apply_broadcast(downed);
                    if changed {
                        p.controls_enabled = !downed;
                    }
                    changed
                };
                if changed {
                    let state = self.players[&entity].lifecycle.state();
                    self.notify.push(UiEvent::LifecycleChanged { entity, state });
                }
            }
            GameCall::Revive => self.accept_revive_as_owner(entity, sender),
            GameCall::SyncAmmo { slot, value } => {
                let update = {
                    let Some(p) = self.players.get_mut(&entity) else {
                        return;
                    };
                    let before = p.ammo.slot(slot).map(|s| s.current);
                    p.ammo.set(slot, value);
                    let after = p.ammo.slot(slot);
                    (before != after.map(|s| s.current)).then_some(after).flatten()
                };
                if let Some(ammo) = update {
                    self.notify.push(UiEvent::AmmoChanged {
                        entity,
                        slot,
                        current: ammo.current,
                        max: ammo.max,
                    });
                }
            }
            GameCall::EffectState { kind, active } => {
                let changed = match self.players.get_mut(&entity) {
                    Some(p) => p.set_flag(kind, active),
                    None => return,
                };
                if changed {
                    let event = if active {
                        UiEvent::EffectStarted {
                            entity,
                            kind,
                            duration: self.cfg.ability_seconds,
                        }
                    } else {
                        UiEvent::EffectEnded { entity, kind }
                    };
                    self.notify.push(event);
                }
            }
            GameCall::Teleport { position } => {
                if let Some(p) = self.players.get_mut(&entity) {
                    p.position = position;
                }
            }
            other => {
                debug!(entity = entity.0, ?other, "room-scope call addressed to an entity ignored");
            }
        }
    }

    fn handle_room_call(&mut self, call: GameCall) {
        match call {
            GameCall::SetParticipantProperty { actor, key, value } => {
                let changed = match self.participants.get_mut(&actor) {
                    Some(p) => p.properties.set(key, value),
                    None => {
                        debug!(%actor, "property update for unknown participant discarded");
                        return;
                    }
                };
                if !changed {
                    return;
                }
                match key {
                    PropertyKey::IsAlive => {
                        if self.is_coordinator() {
                            self.evaluate_game_over();
                        }
                    }
                    PropertyKey::WeaponIndex => {
                        if let Some(entity) = self.entity_of(actor) {
                            let slot = clamp_slot(&self.cfg, value.as_int().unwrap_or(0));
                            if let Some(p) = self.players.get_mut(&entity) {
                                p.active_weapon = slot;
                            }
                            self.notify.push(UiEvent::WeaponChanged { entity, slot });
                        }
                    }
                    PropertyKey::GameOver => {
                        warn!(%actor, "GameOver is a room property; participant write ignored");
                    }
                }
            }
            GameCall::SetRoomProperty { key, value } => {
                if !self.room_properties.set(key, value) {
                    // Idempotent rewrite; observable no-op.
                    return;
                }
                if key == PropertyKey::GameOver && value == PropertyValue::Bool(true) {
                    self.react_to_game_over();
                }
            }
            GameCall::PlayerJoined {
                actor,
                nickname,
                entity,
            } => {
                self.registry.insert(entity, actor);
                let mut participant = Participant::new(actor, &nickname, false);
                participant
                    .properties
                    .set(PropertyKey::IsAlive, PropertyValue::Bool(true));
                participant
                    .properties
                    .set(PropertyKey::WeaponIndex, PropertyValue::Int(0));
                self.participants.insert(actor, participant);
                self.players.insert(
                    entity,
                    PlayerState::new(actor, &self.cfg, spawn_slot(&self.cfg.spawn_slots, actor)),
                );
                self.notify.push(UiEvent::ParticipantJoined { actor, nickname });
            }
            GameCall::PlayerLeft { actor } => {
                if self.participants.remove(&actor).is_none() {
                    return;
                }
                for entity in self.registry.unregister_owned_by(actor) {
                    self.players.remove(&entity);
                }
                self.notify.push(UiEvent::ParticipantLeft { actor });
                // The departed participant no longer counts toward the
                // liveness aggregate.
                if self.is_coordinator() {
                    self.evaluate_game_over();
                }
            }
            other => {
                debug!(?other, "entity-scope call addressed to the room ignored");
            }
        }
    }

    // Owner-side combat & lifecycle

    fn apply_damage_as_owner(&mut self, entity: EntityId, amount: f32, attacker: ActorNumber) {
        if !self.registry.is_local_owner(entity, self.local_actor) {
            // Request is for the owner; non-owners only observe the
            // SyncHealth re-broadcast.
            return;
        }
        if self.game_over_seen {
            return;
        }
        let (value, max, depleted) = {
            let Some(p) = self.players.get_mut(&entity) else {
                return;
            };
            if !p.lifecycle.is_alive() {
                debug!(entity = entity.0, "damage against a downed entity ignored");
                return;
            }
            if p.has_flag(EffectKind::Invulnerable) {
                debug!(entity = entity.0, "damage request no-op: invulnerable");
                return;
            }
            let value = p.health.apply_damage(amount);
            (value, p.health.max(), p.health.is_depleted())
        };

        self.notify.push(UiEvent::HealthChanged {
            entity,
            current: value,
            max,
        });
        // Authoritative value, buffered so late joiners converge.
        self.push_call(
            CallScope::Entity(entity),
            CallTarget::AllBuffered,
            GameCall::SyncHealth { value },
        );
        if depleted {
            let killer = self
                .participants
                .get(&attacker)
                .map(|p| p.nickname.clone())
                .unwrap_or_else(|| attacker.to_string());
            info!(entity = entity.0, killer, "player downed");
            self.down_local_entity(entity);
        }
    }

    fn down_local_entity(&mut self, entity: EntityId) {
        let spawn = spawn_slot(&self.cfg.spawn_slots, self.local_actor);
        {
            let Some(p) = self.players.get_mut(&entity) else {
                return;
            };
            if !p.lifecycle.down() {
                return;
            }
            p.controls_enabled = false;
            p.position = spawn;
        }
        self.notify.push(UiEvent::LifecycleChanged {
            entity,
            state: LifecycleState::Downed,
        });
        self.push_call(
            CallScope::Entity(entity),
            CallTarget::All,
            GameCall::Teleport { position: spawn },
        );
        self.push_call(
            CallScope::Entity(entity),
            CallTarget::AllBuffered,
            GameCall::SetDowned { downed: true },
        );
        self.set_participant_property(PropertyKey::IsAlive, PropertyValue::Bool(false));

        self.effects
            .activate(EffectKind::RespawnCountdown, self.cfg.respawn_seconds);
        self.respawn_last_whole = self.cfg.respawn_seconds.ceil() as u32;
        self.notify.push(UiEvent::RespawnCountdown {
            entity,
            seconds_left: self.respawn_last_whole,
        });
    }

    fn accept_revive_as_owner(&mut self, entity: EntityId, rescuer: ActorNumber) {
        if !self.registry.is_local_owner(entity, self.local_actor) {
            return;
        }
        if self.game_over_seen {
            debug!(entity = entity.0, "revive after game over ignored");
            return;
        }
        let accepted = match self.players.get_mut(&entity) {
            Some(p) => p.lifecycle.begin_revive(),
            None => return,
        };
        if !accepted {
            debug!(entity = entity.0, %rescuer, "revive refused: target not downed");
            return;
        }
        self.notify.push(UiEvent::LifecycleChanged {
            entity,
            state: LifecycleState::Reviving,
        });
        self.pending_revives.push(entity);
    }

    fn finish_pending_revives(&mut self) {
        for entity in std::mem::take(&mut self.pending_revives) {
            let value = {
                let Some(p) = self.players.get_mut(&entity) else {
                    continue;
                };
                if !p.lifecycle.complete_revive() {
                    continue;
                }
                p.health.reset();
                p.controls_enabled = true;
                p.health.current()
            };
            let max = self.players[&entity].health.max();
            info!(entity = entity.0, "player revived");
            self.notify.push(UiEvent::HealthChanged {
                entity,
                current: value,
                max,
            });
            self.notify.push(UiEvent::LifecycleChanged {
                entity,
                state: LifecycleState::Alive,
            });
            self.push_call(
                CallScope::Entity(entity),
                CallTarget::AllBuffered,
                GameCall::SyncHealth { value },
            );
            self.push_call(
                CallScope::Entity(entity),
                CallTarget::AllBuffered,
                GameCall::SetDowned { downed: false },
            );
            self.set_participant_property(PropertyKey::IsAlive, PropertyValue::Bool(true));

            if self.effects.cancel(EffectKind::RespawnCountdown) {
                self.notify.push(UiEvent::EffectEnded {
                    entity,
                    kind: EffectKind::RespawnCountdown,
                });
            }
        }
    }

    // Timed effects

    fn tick_effects(&mut self, dt: f32) {
        for kind in self.effects.tick(dt) {
            self.on_effect_expired(kind);
        }
        if let Some(remaining) = self.effects.remaining(EffectKind::RespawnCountdown) {
            let whole = remaining.ceil() as u32;
            if whole != self.respawn_last_whole {
                self.respawn_last_whole = whole;
                self.notify.push(UiEvent::RespawnCountdown {
                    entity: self.local_entity,
                    seconds_left: whole,
                });
            }
        }
    }

    fn on_effect_expired(&mut self, kind: EffectKind) {
        match kind {
            EffectKind::Invulnerable | EffectKind::Cloak => {
                self.set_local_flag(kind, false);
                self.notify.push(UiEvent::EffectEnded {
                    entity: self.local_entity,
                    kind,
                });
            }
            EffectKind::HighJump | EffectKind::SlowFall => {
                self.notify.push(UiEvent::EffectEnded {
                    entity: self.local_entity,
                    kind,
                });
            }
            EffectKind::Reload => {
                let (slot, value, max) = {
                    let Some(p) = self.players.get_mut(&self.local_entity) else {
                        return;
                    };
                    let slot = p.active_weapon;
                    let value = p.ammo.refill(slot);
                    let max = p.ammo.slot(slot).map(|s| s.max).unwrap_or(0);
                    (slot, value, max)
                };
                self.notify.push(UiEvent::AmmoChanged {
                    entity: self.local_entity,
                    slot,
                    current: value,
                    max,
                });
                self.push_call(
                    CallScope::Entity(self.local_entity),
                    CallTarget::All,
                    GameCall::SyncAmmo { slot, value },
                );
            }
            EffectKind::WeaponSwitch => {}
            EffectKind::RespawnCountdown => {
                // Countdown elapsed while still downed: scatter the body to
                // a fresh spawn point; standing up still requires a revive.
                let position = self.scatter_point();
                self.notify.push(UiEvent::RespawnCountdown {
                    entity: self.local_entity,
                    seconds_left: 0,
                });
                self.push_call(
                    CallScope::Entity(self.local_entity),
                    CallTarget::All,
                    GameCall::Teleport { position },
                );
            }
        }
    }

    fn start_reload(&mut self) {
        if self.effects.is_active(EffectKind::Reload) {
            return;
        }
        let slot = match self.players.get(&self.local_entity) {
            Some(p) => p.active_weapon,
            None => return,
        };
        let duration = match self.cfg.weapons.get(slot) {
            Some(weapon) => weapon.reload_seconds,
            None => return,
        };
        self.effects.activate(EffectKind::Reload, duration);
        self.notify.push(UiEvent::EffectStarted {
            entity: self.local_entity,
            kind: EffectKind::Reload,
            duration,
        });
    }

    // Coordinator arbitration

    fn evaluate_game_over(&mut self) {
        if self.game_over_declared || self.game_over_seen {
            return;
        }
        let all_down =
            !self.participants.is_empty() && self.participants.values().all(|p| !p.is_alive());
        if !all_down {
            return;
        }
        self.game_over_declared = true;
        info!("all participants down; declaring game over");
        self.push_call(
            CallScope::Room,
            CallTarget::All,
            GameCall::SetRoomProperty {
                key: PropertyKey::GameOver,
                value: PropertyValue::Bool(true),
            },
        );
    }

    fn react_to_game_over(&mut self) {
        if self.game_over_seen {
            return;
        }
        self.game_over_seen = true;
        for p in self.players.values_mut() {
            p.lifecycle.freeze();
        }
        self.notify.push(UiEvent::GameOver);
    }

    // Plumbing

    fn local_can_act(&self) -> bool {
        if self.game_over_seen {
            return false;
        }
        self.players
            .get(&self.local_entity)
            .map(|p| p.controls_enabled && p.lifecycle.is_alive())
            .unwrap_or(false)
    }

    fn set_local_flag(&mut self, kind: EffectKind, active: bool) {
        let changed = match self.players.get_mut(&self.local_entity) {
            Some(p) => p.set_flag(kind, active),
            None => false,
        };
        if changed {
            self.push_call(
                CallScope::Entity(self.local_entity),
                CallTarget::All,
                GameCall::EffectState { kind, active },
            );
        }
    }

    fn set_participant_property(&mut self, key: PropertyKey, value: PropertyValue) {
        let changed = match self.participants.get_mut(&self.local_actor) {
            Some(p) => p.properties.set(key, value),
            None => false,
        };
        self.push_call(
            CallScope::Room,
            CallTarget::All,
            GameCall::SetParticipantProperty {
                actor: self.local_actor,
                key,
                value,
            },
        );
        if changed && key == PropertyKey::IsAlive && self.is_coordinator() {
            self.evaluate_game_over();
        }
    }

    fn push_call(&mut self, scope: CallScope, target: CallTarget, call: GameCall) {
        self.seq += 1;
        self.outgoing.push(ReplicatedCall {
            sender: self.local_actor,
            seq: self.seq,
            scope,
            target,
            call,
        });
    }

    fn scatter_point(&self) -> Vec3 {
        let s = self.cfg.respawn_scatter;
        let mut rng = rand::thread_rng();
        Vec3::new(rng.gen_range(-s..=s), 0.0, rng.gen_range(-s..=s))
    }
}

/// Clamps a replicated weapon index into the configured loadout.
fn clamp_slot(cfg: &GameConfig, slot: i64) -> usize {
    if cfg.weapons.is_empty() {
        return 0;
    }
    (slot.max(0) as usize).min(cfg.weapons.len() - 1)
}
