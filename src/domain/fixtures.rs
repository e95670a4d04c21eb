/// Small definitions and recording collaborators for tests.

use std::collections::HashSet;
use std::sync::Arc;

use glam::Vec2;

use super::actor::{ActorDef, ActorParams, ActorState, ActorStateDef};
use super::animation::{AnimationDef, AnimationMode};
use super::control::{Input, Key};
use super::geometry::{Aabb, Rect};
use super::prop::{Prop, PropDef, PropEffects, PropStateDef, StateTransitionMode};
use super::sound::{Sound, StateSound};
use super::sprite::{Collision, SpriteSubject};
use super::transition::TransitionDef;

pub fn anim(name: &str) -> Arc<AnimationDef> {
    Arc::new(AnimationDef::new(name, AnimationMode::Static, "test", vec![0], 1.0).unwrap())
}

/// A motionless state with an 8x2 box.
pub fn state(duration: f32, effects: PropEffects, sounds: &[&str]) -> PropStateDef {
    PropStateDef::new(
        Arc::new(TransitionDef::fixed(Vec2::ZERO)),
        anim("prop"),
        Rect::new(0.0, 0.0, 8.0, 2.0).unwrap(),
        duration,
        sounds.iter().map(|s| s.to_string()).collect(),
        effects,
    )
    .unwrap()
}

pub fn prop(name: &str, at: Vec2, interaction_box: Rect, effects: PropEffects) -> Prop {
    let mut s = state(1.0, effects, &[]);
    s.interaction_box = interaction_box;
    let def = PropDef::new(name, StateTransitionMode::Forward, vec![s], 0).unwrap();
    Prop::new(Arc::new(def), at)
}

/// Girder whose surface is one unit above `at`.
pub fn support(at: Vec2, width: f32) -> Prop {
    let effects = PropEffects { support: Some(1.0), ..PropEffects::default() };
    prop("girder", at, Rect::new(0.0, 0.0, width, 1.0).unwrap(), effects)
}

pub fn ladder(at: Vec2, height: f32) -> Prop {
    let effects = PropEffects { ladder: Some(height), ..PropEffects::default() };
    prop("ladder", at, Rect::new(0.0, 0.0, 2.0, height).unwrap(), effects)
}

pub fn conveyor(at: Vec2, velocity: Vec2) -> Prop {
    let effects = PropEffects { conveyor: Some(velocity), ..PropEffects::default() };
    prop("conveyor", at, Rect::new(0.0, 0.0, 20.0, 1.0).unwrap(), effects)
}

pub fn killer(at: Vec2, damage: i32) -> Prop {
    let effects = PropEffects { killer: Some(damage), ..PropEffects::default() };
    prop("barrel", at, Rect::new(0.0, 0.0, 2.0, 2.0).unwrap(), effects)
}

pub fn actor_params() -> ActorParams {
    ActorParams {
        interaction_box: Rect::new(0.0, 0.0, 2.0, 3.0).unwrap(),
        run_speed: 20.0,
        climb_speed: 10.0,
        jump_impulse: 400.0,
        jump_duration: 0.5,
        gravity: -800.0,
        max_fall: 50.0,
        spawn_health: 3,
        spawn_duration: 1.0,
        dying_duration: 1.0,
        climb_duration: 0.2,
    }
}

pub fn actor_def() -> Arc<ActorDef> {
    let states = ActorState::ALL
        .iter()
        .map(|&s| ActorStateDef {
            animation: anim(s.name()),
            sound: match s {
                ActorState::Running => Some(StateSound { id: "walk".into(), looped: true }),
                ActorState::Jumping => Some(StateSound { id: "jump".into(), looped: false }),
                ActorState::Dying => Some(StateSound { id: "die".into(), looped: false }),
                _ => None,
            },
        })
        .collect();
    Arc::new(ActorDef::new(states, actor_params()).unwrap())
}

#[derive(Default, Debug)]
pub struct RecordingSound {
    pub played: Vec<(String, bool)>,
    pub stopped: Vec<String>,
}

impl Sound for RecordingSound {
    fn play(&mut self, id: &str, looped: bool) {
        self.played.push((id.to_string(), looped));
    }

    fn stop(&mut self, id: &str) {
        self.stopped.push(id.to_string());
    }
}

#[derive(Default, Debug)]
pub struct RecordingInput {
    down: HashSet<Key>,
    pressed: HashSet<Key>,
}

impl RecordingInput {
    pub fn hold(&mut self, key: Key) {
        self.down.insert(key);
    }

    /// Pressed this frame, and held.
    pub fn press(&mut self, key: Key) {
        self.down.insert(key);
        self.pressed.insert(key);
    }

    pub fn clear(&mut self) {
        self.down.clear();
        self.pressed.clear();
    }
}

impl Input for RecordingInput {
    fn is_key_down(&self, key: Key) -> bool {
        self.down.contains(&key)
    }

    fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }
}

/// Real box test; pixel test answers a fixed value.
pub struct StubCollision {
    pub pixels: bool,
}

impl Collision for StubCollision {
    fn boxes_overlap(&self, a: &Aabb, b: &Aabb) -> bool {
        a.overlaps(b)
    }

    fn pixels_overlap(&self, _: &SpriteSubject, _: &SpriteSubject) -> bool {
        self.pixels
    }
}
