//! Scripted scenario runner.
//!
//! Drives a full in-process firefight through the room router and prints a
//! pass/fail summary per scenario. Useful for eyeballing replication order
//! with RUST_LOG=debug without booting the relay.

use squad_shared::config::GameConfig;
use squad_shared::effects::EffectKind;
use squad_shared::lifecycle::LifecycleState;
use squad_shared::room::Room;
use squad_shared::session::Session;

struct Mesh {
    room: Room,
    sessions: Vec<Session>,
}

impl Mesh {
    fn new(names: &[&str]) -> Self {
        let cfg = GameConfig::default();
        let mut mesh = Mesh {
            room: Room::new(),
            sessions: Vec::new(),
        };
        for name in names {
            let ack = mesh.room.join(name);
            mesh.sessions.push(Session::new(cfg.clone(), ack));
        }
        mesh.settle(0.0);
        mesh
    }

    fn settle(&mut self, dt: f32) {
        let mut first = true;
        loop {
            let mut moved = false;
            for session in &mut self.sessions {
                for call in session.take_outgoing() {
                    self.room.send(call);
                    moved = true;
                }
            }
            for session in &mut self.sessions {
                for call in self.room.drain(session.actor()) {
                    session.enqueue_incoming(call);
                    moved = true;
                }
                session.tick(if first { dt } else { 0.0 });
            }
            if first {
                first = false;
            } else if !moved {
                return;
            }
        }
    }
}

struct Tally {
    passed: u32,
    failed: u32,
}

impl Tally {
    fn check(&mut self, name: &str, ok: bool) {
        if ok {
            self.passed += 1;
            println!("  ✓ {name}");
        } else {
            self.failed += 1;
            println!("  ✗ {name}");
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut tally = Tally { passed: 0, failed: 0 };

    println!("Scenario: three-way firefight");
    let mut mesh = Mesh::new(&["Ray", "Kai", "Nia"]);
    let ray = mesh.sessions[0].entity();
    let kai = mesh.sessions[1].entity();

    mesh.sessions[1].report_hit(ray, 40.0);
    mesh.settle(0.0);
    tally.check(
        "first hit lands on every replica",
        mesh.sessions
            .iter()
            .all(|s| s.health_of(ray) == Some(60.0)),
    );

    mesh.sessions[2].report_hit(ray, 70.0);
    mesh.settle(0.0);
    tally.check(
        "lethal hit clamps to zero and downs",
        mesh.sessions.iter().all(|s| {
            s.health_of(ray) == Some(0.0) && s.lifecycle_of(ray) == Some(LifecycleState::Downed)
        }),
    );

    mesh.sessions[1].local_revive_pressed(ray);
    mesh.settle(0.0);
    tally.check(
        "revive restores full health",
        mesh.sessions.iter().all(|s| {
            s.health_of(ray) == Some(100.0) && s.lifecycle_of(ray) == Some(LifecycleState::Alive)
        }),
    );

    println!("Scenario: shielded target");
    mesh.sessions[1].local_ability_pressed(EffectKind::Invulnerable);
    mesh.settle(0.0);
    mesh.sessions[0].report_hit(kai, 55.0);
    mesh.settle(0.0);
    tally.check(
        "shield absorbs the hit",
        mesh.sessions
            .iter()
            .all(|s| s.health_of(kai) == Some(100.0)),
    );
    mesh.settle(GameConfig::default().ability_seconds + 0.1);
    mesh.sessions[0].report_hit(kai, 55.0);
    mesh.settle(0.0);
    tally.check(
        "expired shield lets damage through",
        mesh.sessions
            .iter()
            .all(|s| s.health_of(kai) == Some(45.0)),
    );

    println!("Scenario: total squad wipe");
    let entities: Vec<_> = mesh.sessions.iter().map(|s| s.entity()).collect();
    for entity in &entities {
        mesh.sessions[0].report_hit(*entity, 500.0);
    }
    mesh.settle(0.0);
    tally.check(
        "coordinator declares game over",
        mesh.sessions.iter().all(|s| s.game_over()),
    );

    println!();
    println!("passed: {}  failed: {}", tally.passed, tally.failed);
    if tally.failed > 0 {
        std::process::exit(1);
    }
}
