/// The step function: advances a playing level by one tick.
///
/// Processing order:
///   1. Gather prop interactions (box overlap, pixel test for killers)
///   2. Actor consumes them (support, conveyors, ladders, damage)
///   3. Props advance (motion, animation, timed state changes)
///   4. Actor advances (physics, animation, state timers)
///   5. A dead actor is counted and respawned
///
/// Input is not read here; the front end calls `Level::on_input` first.

use tracing::{debug, info};

use super::event::GameEvent;
use super::level::{Level, Phase};
use crate::domain::actor::{Actor, ActorState};
use crate::domain::interaction;
use crate::domain::random::RandomSource;
use crate::domain::sprite::Collision;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(level: &mut Level, dt: f32, collision: &dyn Collision, rng: &mut dyn RandomSource) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    if level.phase() != Phase::Playing {
        return events;
    }

    let dead = {
        let (props, actor) = level.parts_mut();
        let Some(actor) = actor else { return events };
        let mut tracker = Tracker::new(actor);

        let hits = interaction::gather(actor, props, collision);
        debug!(count = hits.len(), "prop interactions");
        actor.on_prop_interactions(&hits, &mut events);
        tracker.note(actor, &mut events);

        for (index, prop) in props.iter_mut().enumerate() {
            if let Some(state) = prop.update(dt, rng, &mut events) {
                events.push(GameEvent::PropStateChanged { prop: index, state });
            }
        }

        actor.update(dt, rng, &mut events);
        tracker.note(actor, &mut events);
        actor.is_dead()
    };

    if dead {
        level.respawn_actor(&mut events);
        info!(deaths = level.deaths(), "actor respawned");
        events.push(GameEvent::ActorRespawned);
    }

    events
}

// ══════════════════════════════════════════════════════════════
// Helpers: actor change tracking
// ══════════════════════════════════════════════════════════════

/// Turns before/after snapshots of the actor into events.
struct Tracker {
    state: ActorState,
    health: i32,
}

impl Tracker {
    fn new(actor: &Actor) -> Self {
        Tracker { state: actor.state(), health: actor.health() }
    }

    fn note(&mut self, actor: &Actor, events: &mut Vec<GameEvent>) {
        let health = actor.health();
        if health < self.health {
            events.push(GameEvent::ActorDamaged { amount: self.health - health, health });
        }
        self.health = health;

        let state = actor.state();
        if state != self.state {
            events.push(GameEvent::ActorStateChanged { from: self.state, to: state });
            if state == ActorState::Dead {
                events.push(GameEvent::ActorDied);
            }
        }
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::control::ControlScheme;
    use crate::domain::fixtures::{RecordingSound, StubCollision};
    use crate::domain::random::ScriptedRandom;
    use crate::sim::assets::Assets;
    use crate::sim::level::LevelFile;

    const LEVEL: &str = r#"
        name = "Step"
        [actor]
        spawn = [2, 1]
        [[props]]
        name = "girder"
        position = [0, 0]
        [[props]]
        name = "girder"
        position = [8, 0]
    "#;

    fn playing(text: &str) -> (Level, Assets) {
        let assets = Assets::embedded().unwrap();
        let mut level = Level::new(ControlScheme::default());
        let file = LevelFile::parse("step", text).unwrap();
        level.load(&file, &assets, &mut RecordingSound::default()).unwrap();
        (level, assets)
    }

    fn run(level: &mut Level, collision: &dyn Collision, ticks: usize) -> Vec<GameEvent> {
        let mut rng = ScriptedRandom::new(&[0]);
        (0..ticks).flat_map(|_| step(level, 1.0 / 60.0, collision, &mut rng)).collect()
    }

    #[test]
    fn unloaded_level_does_nothing() {
        let mut level = Level::new(ControlScheme::default());
        assert!(run(&mut level, &StubCollision { pixels: true }, 10).is_empty());
    }

    #[test]
    fn actor_spawns_and_stands_on_girder() {
        let (mut level, assets) = playing(LEVEL);
        let events = run(&mut level, &assets.atlas, 120);
        let actor = level.actor().unwrap();
        assert_eq!(actor.state(), ActorState::Idle);
        assert_eq!(actor.position().y, 1.0);
        assert!(events.contains(&GameEvent::ActorStateChanged { from: ActorState::Spawning, to: ActorState::Idle }));
    }

    #[test]
    fn floating_actor_falls_to_death_and_respawns() {
        let text = LEVEL.replace("spawn = [2, 1]", "spawn = [2, 40]");
        let (mut level, assets) = playing(&text);
        let events = run(&mut level, &assets.atlas, 60 * 8);
        assert!(events.contains(&GameEvent::ActorDied));
        assert!(events.contains(&GameEvent::ActorRespawned));
        assert!(level.deaths() >= 1);
    }

    #[test]
    fn killer_contact_reports_damage() {
        let text = format!("{LEVEL}\n[[props]]\nname = \"oil_fire\"\nposition = [2, 1]\n");
        let (mut level, _) = playing(&text);
        // Pixel test always confirms; the fire's burning state does the damage.
        let events = run(&mut level, &StubCollision { pixels: true }, 60 * 5);
        assert!(events.iter().any(|e| matches!(e, GameEvent::ActorDamaged { .. })));
        assert!(events.iter().any(|e| matches!(e, GameEvent::PropStateChanged { .. })));
    }
}
