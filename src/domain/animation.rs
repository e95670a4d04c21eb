/// Timed frame cycling over a spritesheet.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
use serde::Deserialize;

use super::random::RandomSource;
use super::sprite::{SpriteId, SpriteSubject, Surface};
use crate::error::{DefinitionError, LoadError};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationMode {
    /// Always the first frame.
    Static,
    Forward,
    Backward,
    Random,
}

#[derive(Clone, PartialEq, Debug)]
pub struct AnimationDef {
    name: String,
    mode: AnimationMode,
    spritesheet: String,
    frames: Vec<SpriteId>,
    frequency: f32,
    period: f32,
}

impl AnimationDef {
    /// `frequency` is in frames per second.
    pub fn new(
        name: impl Into<String>,
        mode: AnimationMode,
        spritesheet: impl Into<String>,
        frames: Vec<SpriteId>,
        frequency: f32,
    ) -> Result<Self, DefinitionError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DefinitionError::EmptyName { kind: "animation" });
        }
        if frames.is_empty() {
            return Err(DefinitionError::NoFrames { animation: name });
        }
        if frequency <= 0.0 || !frequency.is_finite() {
            return Err(DefinitionError::NonPositive { what: "animation frequency", value: frequency });
        }
        Ok(AnimationDef { name, mode, spritesheet: spritesheet.into(), frames, frequency, period: 1.0 / frequency })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn mode(&self) -> AnimationMode { self.mode }
    pub fn spritesheet(&self) -> &str { &self.spritesheet }
    pub fn frames(&self) -> &[SpriteId] { &self.frames }
    pub fn frequency(&self) -> f32 { self.frequency }
    pub fn period(&self) -> f32 { self.period }
}

#[derive(Clone, Debug)]
pub struct Animation {
    def: Arc<AnimationDef>,
    index: usize,
    clock: f32,
    mirrored: bool,
}

impl Animation {
    pub fn new(def: Arc<AnimationDef>) -> Self {
        Animation { def, index: 0, clock: 0.0, mirrored: false }
    }

    pub fn mirrored(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    pub fn update(&mut self, dt: f32, rng: &mut dyn RandomSource) {
        if self.def.mode == AnimationMode::Static {
            return;
        }
        self.clock += dt;
        if self.clock < self.def.period {
            return;
        }
        self.clock = 0.0;

        let n = self.def.frames.len();
        self.index = match self.def.mode {
            AnimationMode::Static => self.index,
            AnimationMode::Forward => (self.index + 1) % n,
            AnimationMode::Backward => if self.index == 0 { n - 1 } else { self.index - 1 },
            AnimationMode::Random => rng.uniform_int(0, n as i32 - 1).max(0) as usize,
        };
    }

    pub fn draw(&self, position: Vec2, surface: &mut dyn Surface) {
        surface.draw_sprite(&self.subject(position));
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.clock = 0.0;
    }

    /// The displayed sprite at `position`, for drawing and pixel collision.
    pub fn subject(&self, position: Vec2) -> SpriteSubject<'_> {
        SpriteSubject {
            position,
            sheet: &self.def.spritesheet,
            sprite: self.sprite_id(),
            mirrored: self.mirrored,
        }
    }

    pub fn spritesheet_key(&self) -> &str { &self.def.spritesheet }
    pub fn sprite_id(&self) -> SpriteId { self.def.frames[self.index] }
    pub fn frame_index(&self) -> usize { self.index }
    pub fn is_mirrored(&self) -> bool { self.mirrored }
    pub fn name(&self) -> &str { &self.def.name }
}

/// Name → shared definition lookup, built once at startup.
#[derive(Clone, Debug, Default)]
pub struct AnimationFactory {
    defs: HashMap<String, Arc<AnimationDef>>,
}

impl AnimationFactory {
    pub fn new() -> Self {
        AnimationFactory::default()
    }

    pub fn insert(&mut self, def: AnimationDef) -> Arc<AnimationDef> {
        let def = Arc::new(def);
        self.defs.insert(def.name.clone(), Arc::clone(&def));
        def
    }

    pub fn get(&self, name: &str) -> Result<Arc<AnimationDef>, LoadError> {
        self.defs
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::UnknownAnimation(name.to_string()))
    }

    pub fn make(&self, name: &str) -> Result<Animation, LoadError> {
        self.get(name).map(Animation::new)
    }

    pub fn len(&self) -> usize { self.defs.len() }
    pub fn is_empty(&self) -> bool { self.defs.is_empty() }
}
