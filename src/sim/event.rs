/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and logging.

use crate::domain::actor::ActorState;
use crate::domain::sound::Sound;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    SoundPlayed { id: String, looped: bool },
    SoundStopped { id: String },
    ActorStateChanged { from: ActorState, to: ActorState },
    ActorDamaged { amount: i32, health: i32 },
    ActorDied,
    ActorRespawned,
    PropStateChanged { prop: usize, state: usize },
}

/// Sound requests made by the state machines are queued as events and
/// played by the front end after the step.
impl Sound for Vec<GameEvent> {
    fn play(&mut self, id: &str, looped: bool) {
        self.push(GameEvent::SoundPlayed { id: id.to_string(), looped });
    }

    fn stop(&mut self, id: &str) {
        self.push(GameEvent::SoundStopped { id: id.to_string() });
    }
}

/// Replay queued sound events on a real sound sink.
pub fn forward_sounds(events: &[GameEvent], sound: &mut dyn Sound) {
    for event in events {
        match event {
            GameEvent::SoundPlayed { id, looped } => sound.play(id, *looped),
            GameEvent::SoundStopped { id } => sound.stop(id),
            _ => {}
        }
    }
}
