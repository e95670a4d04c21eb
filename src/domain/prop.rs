/// Data-driven prop state machine.
///
/// A prop cycles through the states of its shared `PropDef`. Each state
/// bundles a motion path, an animation, an interaction box, a duration,
/// entry sounds and gameplay effects. A prop with a single state never
/// transitions.
///
/// All world-space queries (position, box, support surface, ladder range)
/// are taken at `anchor + transition offset`.

use std::sync::Arc;

use glam::Vec2;
use serde::Deserialize;
use tracing::debug;

use super::animation::{Animation, AnimationDef};
use super::geometry::{Aabb, Rect};
use super::random::RandomSource;
use super::sound::Sound;
use super::sprite::{SpriteSubject, Surface};
use super::transition::{PathTransition, TransitionDef};
use crate::error::DefinitionError;

/// How the next state is chosen when the current one expires.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateTransitionMode {
    /// `(current + 1) mod N`
    #[default]
    Forward,
    /// Uniform over all states; may reselect the current one.
    Random,
}

/// Gameplay effects of a prop state. `None` means the effect is off.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct PropEffects {
    /// Standing surface height above the prop's position.
    pub support: Option<f32>,
    /// Climbable height above the prop's position.
    pub ladder: Option<f32>,
    pub conveyor: Option<Vec2>,
    /// Damage per overlapping tick; negative heals.
    pub killer: Option<i32>,
}

#[derive(Clone, Debug)]
pub struct PropStateDef {
    pub transition: Arc<TransitionDef>,
    pub animation: Arc<AnimationDef>,
    pub interaction_box: Rect,
    pub duration: f32,
    pub sounds: Vec<String>,
    pub effects: PropEffects,
}

impl PropStateDef {
    pub fn new(
        transition: Arc<TransitionDef>,
        animation: Arc<AnimationDef>,
        interaction_box: Rect,
        duration: f32,
        sounds: Vec<String>,
        effects: PropEffects,
    ) -> Result<Self, DefinitionError> {
        if duration <= 0.0 || duration.is_nan() {
            return Err(DefinitionError::NonPositive { what: "prop state duration", value: duration });
        }
        // Re-check in case the Rect was built by struct literal.
        Rect::new(interaction_box.x, interaction_box.y, interaction_box.w, interaction_box.h)?;
        Ok(PropStateDef { transition, animation, interaction_box, duration, sounds, effects })
    }
}

#[derive(Clone, Debug)]
pub struct PropDef {
    name: String,
    mode: StateTransitionMode,
    states: Vec<PropStateDef>,
    draw_layer: i32,
}

impl PropDef {
    pub fn new(
        name: impl Into<String>,
        mode: StateTransitionMode,
        states: Vec<PropStateDef>,
        draw_layer: i32,
    ) -> Result<Self, DefinitionError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DefinitionError::EmptyName { kind: "prop" });
        }
        if states.is_empty() {
            return Err(DefinitionError::NoStates { prop: name });
        }
        Ok(PropDef { name, mode, states, draw_layer })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn mode(&self) -> StateTransitionMode { self.mode }
    pub fn states(&self) -> &[PropStateDef] { &self.states }
    pub fn draw_layer(&self) -> i32 { self.draw_layer }
}

#[derive(Clone, Debug)]
pub struct Prop {
    def: Arc<PropDef>,
    anchor: Vec2,
    state: usize,
    clock: f32,
    transition: PathTransition,
    animation: Animation,
    changes_state: bool,
}

impl Prop {
    /// Starts in state 0 without firing its entry sounds.
    pub fn new(def: Arc<PropDef>, anchor: Vec2) -> Self {
        let first = &def.states[0];
        let transition = PathTransition::new(Arc::clone(&first.transition));
        let animation = Animation::new(Arc::clone(&first.animation));
        let changes_state = def.states.len() != 1;
        Prop { def, anchor, state: 0, clock: 0.0, transition, animation, changes_state }
    }

    /// Advance one tick. Returns the new state index if the state changed.
    pub fn update(&mut self, dt: f32, rng: &mut dyn RandomSource, sound: &mut dyn Sound) -> Option<usize> {
        self.animation.update(dt, rng);
        self.transition.advance(dt);

        if !self.changes_state {
            return None;
        }
        self.clock += dt;
        if self.clock < self.current().duration {
            return None;
        }

        let n = self.def.states.len();
        let next = match self.def.mode {
            StateTransitionMode::Forward => (self.state + 1) % n,
            StateTransitionMode::Random => rng.uniform_int(0, n as i32 - 1).clamp(0, n as i32 - 1) as usize,
        };
        self.transition_to_state(next, sound);
        Some(next)
    }

    pub fn transition_to_state(&mut self, next: usize, sound: &mut dyn Sound) {
        debug!(prop = %self.def.name, from = self.state, to = next, "prop state change");
        self.clock = 0.0;
        self.state = next;
        let state = &self.def.states[next];
        self.animation = Animation::new(Arc::clone(&state.animation));
        self.transition.reset(Arc::clone(&state.transition));
        for id in &state.sounds {
            sound.play(id, false);
        }
    }

    /// Back to state 0, entry sounds included.
    pub fn reset(&mut self, sound: &mut dyn Sound) {
        self.transition_to_state(0, sound);
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        self.animation.draw(self.position(), surface);
    }

    // ── Accessors (current state) ──

    pub fn current(&self) -> &PropStateDef { &self.def.states[self.state] }
    pub fn effects(&self) -> &PropEffects { &self.current().effects }

    pub fn position(&self) -> Vec2 { self.anchor + self.transition.position() }

    pub fn interaction_box(&self) -> Aabb {
        self.current().interaction_box.at(self.position())
    }

    pub fn is_support(&self) -> bool { self.effects().support.is_some() }
    pub fn is_ladder(&self) -> bool { self.effects().ladder.is_some() }
    pub fn is_conveyor(&self) -> bool { self.effects().conveyor.is_some() }
    pub fn is_killer(&self) -> bool { self.effects().killer.is_some() }

    /// World y of the standing surface.
    pub fn support_y(&self) -> Option<f32> {
        self.effects().support.map(|h| self.position().y + h)
    }

    /// World `(bottom, top)` of the climbable range.
    pub fn ladder_range(&self) -> Option<(f32, f32)> {
        let y = self.position().y;
        self.effects().ladder.map(|h| (y, y + h))
    }

    pub fn conveyor_velocity(&self) -> Option<Vec2> { self.effects().conveyor }
    pub fn killer_damage(&self) -> Option<i32> { self.effects().killer }

    pub fn subject(&self) -> SpriteSubject<'_> { self.animation.subject(self.position()) }

    pub fn name(&self) -> &str { &self.def.name }
    pub fn def(&self) -> &Arc<PropDef> { &self.def }
    pub fn anchor(&self) -> Vec2 { self.anchor }
    pub fn draw_layer(&self) -> i32 { self.def.draw_layer }
    pub fn state_index(&self) -> usize { self.state }
    pub fn state_clock(&self) -> f32 { self.clock }
    pub fn animation(&self) -> &Animation { &self.animation }
    pub fn transition(&self) -> &PathTransition { &self.transition }
}
