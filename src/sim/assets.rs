/// Definition factories, parsed once from declarative TOML files.
///
/// ## Files (all in one directory):
///   `sprites.toml`   : `[[sheet]]` name + ASCII-mask sprites
///   `animations.toml`: `[[animation]]` name, mode, sheet, frames, frequency
///   `props.toml`     : `[[prop]]` name, mode, draw_layer, `[[prop.state]]`
///   `actor.toml`     : tuning values + `[states.<name>]` animation/sound
///
/// Files are resolved in that order, so a name may only refer to something
/// declared in an earlier file. Any unknown name or invalid value is a
/// `LoadError`; nothing is partially built.
///
/// ## Prop state keys
///   `animation`, `duration`, `box = [x, y, w, h]`, `sounds = [..]`,
///   `positions = [[x, y], ..]` (default `[[0, 0]]`),
///   `speeds = [[value, duration], ..]` (default `[[0, 1]]`),
///   optional effects `support`, `ladder` (heights), `conveyor = [vx, vy]`,
///   `killer` (damage per tick).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use glam::Vec2;
use serde::Deserialize;
use tracing::info;

use crate::domain::actor::{Actor, ActorDef, ActorParams, ActorState, ActorStateDef};
use crate::domain::animation::{AnimationDef, AnimationFactory, AnimationMode};
use crate::domain::control::ControlScheme;
use crate::domain::geometry::Rect;
use crate::domain::prop::{Prop, PropDef, PropEffects, PropStateDef, StateTransitionMode};
use crate::domain::sound::StateSound;
use crate::domain::sprite::{Sprite, SpriteAtlas, Spritesheet};
use crate::domain::transition::{SpeedPoint, TransitionDef};
use crate::error::{DefinitionError, LoadError};

const SPRITES_FILE: &str = "sprites.toml";
const ANIMATIONS_FILE: &str = "animations.toml";
const PROPS_FILE: &str = "props.toml";
const ACTOR_FILE: &str = "actor.toml";

// ── TOML Schema ──

#[derive(Deserialize, Debug)]
struct SpritesToml {
    #[serde(default)]
    sheet: Vec<SheetToml>,
}

#[derive(Deserialize, Debug)]
struct SheetToml {
    name: String,
    sprites: Vec<Vec<String>>,
}

#[derive(Deserialize, Debug)]
struct AnimationsToml {
    #[serde(default)]
    animation: Vec<AnimationToml>,
}

#[derive(Deserialize, Debug)]
struct AnimationToml {
    name: String,
    #[serde(default = "default_mode")]
    mode: AnimationMode,
    sheet: String,
    frames: Vec<usize>,
    #[serde(default = "default_frequency")]
    frequency: f32,
}

#[derive(Deserialize, Debug)]
struct PropsToml {
    #[serde(default)]
    prop: Vec<PropToml>,
}

#[derive(Deserialize, Debug)]
struct PropToml {
    name: String,
    #[serde(default)]
    mode: StateTransitionMode,
    #[serde(default)]
    draw_layer: i32,
    #[serde(default)]
    state: Vec<PropStateToml>,
}

#[derive(Deserialize, Debug)]
struct PropStateToml {
    animation: String,
    #[serde(default = "default_duration")]
    duration: f32,
    #[serde(rename = "box")]
    interaction_box: [f32; 4],
    #[serde(default)]
    sounds: Vec<String>,
    #[serde(default = "default_positions")]
    positions: Vec<[f32; 2]>,
    #[serde(default = "default_speeds")]
    speeds: Vec<[f32; 2]>,
    support: Option<f32>,
    ladder: Option<f32>,
    conveyor: Option<[f32; 2]>,
    killer: Option<i32>,
}

#[derive(Deserialize, Debug)]
struct ActorToml {
    #[serde(rename = "box")]
    interaction_box: [f32; 4],
    run_speed: f32,
    climb_speed: f32,
    jump_impulse: f32,
    jump_duration: f32,
    gravity: f32,
    max_fall: f32,
    spawn_health: i32,
    spawn_duration: f32,
    dying_duration: f32,
    climb_duration: f32,
    states: HashMap<String, ActorStateToml>,
}

#[derive(Deserialize, Debug)]
struct ActorStateToml {
    animation: String,
    sound: Option<String>,
    #[serde(default, rename = "loop")]
    looped: bool,
}

// ── Defaults ──

fn default_mode() -> AnimationMode { AnimationMode::Forward }
fn default_frequency() -> f32 { 1.0 }
fn default_duration() -> f32 { 1.0 }
fn default_positions() -> Vec<[f32; 2]> { vec![[0.0, 0.0]] }
fn default_speeds() -> Vec<[f32; 2]> { vec![[0.0, 1.0]] }

// ══════════════════════════════════════════════════════════════
// Factories
// ══════════════════════════════════════════════════════════════

/// Stable index of a prop definition in the factory arena.
pub type PropDefId = usize;

#[derive(Clone, Debug, Default)]
pub struct PropFactory {
    defs: Vec<Arc<PropDef>>,
    by_name: HashMap<String, PropDefId>,
}

impl PropFactory {
    pub fn new() -> Self {
        PropFactory::default()
    }

    /// A later definition with the same name replaces the lookup entry.
    pub fn insert(&mut self, def: PropDef) -> PropDefId {
        let id = self.defs.len();
        self.by_name.insert(def.name().to_string(), id);
        self.defs.push(Arc::new(def));
        id
    }

    pub fn id(&self, name: &str) -> Result<PropDefId, LoadError> {
        self.by_name.get(name).copied().ok_or_else(|| LoadError::UnknownProp(name.to_string()))
    }

    pub fn get(&self, id: PropDefId) -> Option<&Arc<PropDef>> {
        self.defs.get(id)
    }

    pub fn make_prop(&self, position: Vec2, type_name: &str) -> Result<Prop, LoadError> {
        let def = &self.defs[self.id(type_name)?];
        Ok(Prop::new(Arc::clone(def), position))
    }

    pub fn len(&self) -> usize { self.defs.len() }
    pub fn is_empty(&self) -> bool { self.defs.is_empty() }
}

#[derive(Clone, Debug)]
pub struct ActorFactory {
    def: Arc<ActorDef>,
}

impl ActorFactory {
    pub fn new(def: ActorDef) -> Self {
        ActorFactory { def: Arc::new(def) }
    }

    /// The actor starts dead; the level respawns it.
    pub fn make_actor(&self, spawn: Vec2, controls: ControlScheme) -> Actor {
        Actor::new(Arc::clone(&self.def), spawn, controls)
    }

    pub fn def(&self) -> &Arc<ActorDef> { &self.def }
}

/// Everything a level needs to build its instances.
#[derive(Clone, Debug)]
pub struct Assets {
    pub atlas: SpriteAtlas,
    pub animations: AnimationFactory,
    pub props: PropFactory,
    pub actor: ActorFactory,
}

impl Assets {
    /// Read the four definition files from `dir`.
    pub fn load(dir: &Path) -> Result<Self, LoadError> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path)
                .map(|text| (path.display().to_string(), text))
                .map_err(|source| LoadError::Io { path, source })
        };
        let sprites = read(SPRITES_FILE)?;
        let animations = read(ANIMATIONS_FILE)?;
        let props = read(PROPS_FILE)?;
        let actor = read(ACTOR_FILE)?;
        info!(dir = %dir.display(), "loading assets");
        Assets::from_sources(
            (&sprites.0, &sprites.1),
            (&animations.0, &animations.1),
            (&props.0, &props.1),
            (&actor.0, &actor.1),
        )
    }

    /// The definitions compiled into the binary.
    pub fn embedded() -> Result<Self, LoadError> {
        Assets::from_sources(
            (SPRITES_FILE, include_str!("../../assets/sprites.toml")),
            (ANIMATIONS_FILE, include_str!("../../assets/animations.toml")),
            (PROPS_FILE, include_str!("../../assets/props.toml")),
            (ACTOR_FILE, include_str!("../../assets/actor.toml")),
        )
    }

    /// Each source is `(origin, text)`; origin names the file in errors.
    pub fn from_sources(
        sprites: (&str, &str),
        animations: (&str, &str),
        props: (&str, &str),
        actor: (&str, &str),
    ) -> Result<Self, LoadError> {
        let atlas = build_atlas(parse(sprites)?)?;
        let animations = build_animations(parse(animations)?, &atlas)?;
        let props = build_props(parse(props)?, &animations)?;
        let actor = ActorFactory::new(build_actor(parse(actor)?, &animations)?);
        info!(
            animations = animations.len(),
            props = props.len(),
            "definitions loaded"
        );
        Ok(Assets { atlas, animations, props, actor })
    }
}

fn parse<T: for<'de> Deserialize<'de>>((origin, text): (&str, &str)) -> Result<T, LoadError> {
    toml::from_str(text).map_err(|e| LoadError::parse(origin, e))
}

fn rect([x, y, w, h]: [f32; 4]) -> Result<Rect, DefinitionError> {
    Rect::new(x, y, w, h)
}

// ── Builders ──

fn build_atlas(file: SpritesToml) -> Result<SpriteAtlas, LoadError> {
    let mut atlas = SpriteAtlas::new();
    for sheet in file.sheet {
        let mut sprites = Vec::with_capacity(sheet.sprites.len());
        for (index, rows) in sheet.sprites.iter().enumerate() {
            let sprite = Sprite::from_rows(rows.as_slice())
                .ok_or_else(|| DefinitionError::EmptySprite { sheet: sheet.name.clone(), index })?;
            sprites.push(sprite);
        }
        atlas.insert(Spritesheet::new(sheet.name, sprites)?);
    }
    Ok(atlas)
}

fn build_animations(file: AnimationsToml, atlas: &SpriteAtlas) -> Result<AnimationFactory, LoadError> {
    let mut factory = AnimationFactory::new();
    for a in file.animation {
        let sheet = atlas.sheet(&a.sheet).ok_or_else(|| LoadError::UnknownSpritesheet(a.sheet.clone()))?;
        if let Some(&frame) = a.frames.iter().find(|&&f| f >= sheet.len()) {
            return Err(DefinitionError::FrameOutOfRange { animation: a.name, sheet: a.sheet, frame }.into());
        }
        factory.insert(AnimationDef::new(a.name, a.mode, a.sheet, a.frames, a.frequency)?);
    }
    Ok(factory)
}

fn build_props(file: PropsToml, animations: &AnimationFactory) -> Result<PropFactory, LoadError> {
    let mut factory = PropFactory::new();
    for p in file.prop {
        let mut states = Vec::with_capacity(p.state.len());
        for s in p.state {
            if s.animation.is_empty() {
                return Err(DefinitionError::EmptyAnimationName.into());
            }
            let transition = TransitionDef::new(
                s.positions.iter().map(|&[x, y]| Vec2::new(x, y)).collect(),
                s.speeds.iter().map(|&[value, duration]| SpeedPoint { value, duration }).collect(),
            )?;
            let effects = PropEffects {
                support: s.support,
                ladder: s.ladder,
                conveyor: s.conveyor.map(Vec2::from),
                killer: s.killer,
            };
            states.push(PropStateDef::new(
                Arc::new(transition),
                animations.get(&s.animation)?,
                rect(s.interaction_box)?,
                s.duration,
                s.sounds,
                effects,
            )?);
        }
        factory.insert(PropDef::new(p.name, p.mode, states, p.draw_layer)?);
    }
    Ok(factory)
}

fn build_actor(mut file: ActorToml, animations: &AnimationFactory) -> Result<ActorDef, LoadError> {
    let mut states = Vec::with_capacity(ActorState::COUNT);
    for state in ActorState::ALL {
        let s = file
            .states
            .remove(state.name())
            .ok_or_else(|| LoadError::MissingActorState(state.name().to_string()))?;
        if s.animation.is_empty() {
            return Err(DefinitionError::EmptyAnimationName.into());
        }
        states.push(ActorStateDef {
            animation: animations.get(&s.animation)?,
            sound: s.sound.map(|id| StateSound { id, looped: s.looped }),
        });
    }
    let params = ActorParams {
        interaction_box: rect(file.interaction_box)?,
        run_speed: file.run_speed,
        climb_speed: file.climb_speed,
        jump_impulse: file.jump_impulse,
        jump_duration: file.jump_duration,
        gravity: file.gravity,
        max_fall: file.max_fall,
        spawn_health: file.spawn_health,
        spawn_duration: file.spawn_duration,
        dying_duration: file.dying_duration,
        climb_duration: file.climb_duration,
    };
    Ok(ActorDef::new(states, params)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPRITES: &str = r##"
        [[sheet]]
        name = "s"
        sprites = [["#"], ["=="]]
    "##;

    const ANIMATIONS: &str = r#"
        [[animation]]
        name = "a"
        sheet = "s"
        frames = [0, 1]
        frequency = 4.0
    "#;

    const PROPS: &str = r#"
        [[prop]]
        name = "girder"
        draw_layer = 2
        [[prop.state]]
        animation = "a"
        box = [0, 0, 2, 1]
        support = 1.0

        [[prop]]
        name = "lamp"
        mode = "random"
        [[prop.state]]
        animation = "a"
        box = [0, 0, 1, 1]
        duration = 0.5
        sounds = ["click"]
        [[prop.state]]
        animation = "a"
        box = [0, 0, 1, 1]
        killer = 5
        positions = [[0, 0], [3, 0]]
        speeds = [[1, 1], [2, 1]]
    "#;

    fn actor_toml() -> String {
        let mut s = String::from(
            r#"
            box = [0, 0, 1, 2]
            run_speed = 8.0
            climb_speed = 4.0
            jump_impulse = 10.0
            jump_duration = 0.5
            gravity = -20.0
            max_fall = 6.0
            spawn_health = 100
            spawn_duration = 1.0
            dying_duration = 1.0
            climb_duration = 0.2
            "#,
        );
        for state in ActorState::ALL {
            s.push_str(&format!("[states.{}]\nanimation = \"a\"\n", state.name()));
            if state == ActorState::Running {
                s.push_str("sound = \"walk\"\nloop = true\n");
            }
        }
        s
    }

    fn load(props: &str, actor: &str) -> Result<Assets, LoadError> {
        Assets::from_sources(("sprites", SPRITES), ("animations", ANIMATIONS), ("props", props), ("actor", actor))
    }

    #[test]
    fn loads_all_definitions() {
        let assets = load(PROPS, &actor_toml()).unwrap();
        assert_eq!(assets.props.len(), 2);
        assert_eq!(assets.animations.len(), 1);

        let lamp = assets.props.make_prop(Vec2::new(1.0, 2.0), "lamp").unwrap();
        assert_eq!(lamp.def().mode(), StateTransitionMode::Random);
        assert_eq!(lamp.def().states()[0].sounds, vec!["click".to_string()]);
        assert_eq!(lamp.def().states()[1].effects.killer, Some(5));
        assert_eq!(lamp.def().states()[1].transition.positions().len(), 2);

        let id = assets.props.id("girder").unwrap();
        assert_eq!(assets.props.get(id).map(|d| d.name()), Some("girder"));
        assert!(assets.props.get(assets.props.len()).is_none());

        let girder = assets.props.make_prop(Vec2::ZERO, "girder").unwrap();
        assert_eq!(girder.draw_layer(), 2);
        assert_eq!(girder.support_y(), Some(1.0));

        let actor = assets.actor.make_actor(Vec2::new(4.0, 5.0), ControlScheme::default());
        assert!(actor.is_dead());
        let running = assets.actor.def().state(ActorState::Running);
        assert_eq!(running.sound, Some(StateSound { id: "walk".into(), looped: true }));
    }

    #[test]
    fn unknown_prop_type() {
        let assets = load(PROPS, &actor_toml()).unwrap();
        assert!(matches!(assets.props.make_prop(Vec2::ZERO, "crane"), Err(LoadError::UnknownProp(n)) if n == "crane"));
    }

    #[test]
    fn unknown_animation_is_fatal() {
        let props = PROPS.replacen("animation = \"a\"", "animation = \"nope\"", 1);
        assert!(matches!(load(&props, &actor_toml()), Err(LoadError::UnknownAnimation(_))));
    }

    #[test]
    fn empty_animation_name_is_fatal() {
        let props = PROPS.replacen("animation = \"a\"", "animation = \"\"", 1);
        assert!(matches!(
            load(&props, &actor_toml()),
            Err(LoadError::Definition(DefinitionError::EmptyAnimationName))
        ));
    }

    #[test]
    fn non_positive_duration_is_fatal() {
        let props = PROPS.replace("duration = 0.5", "duration = 0.0");
        assert!(matches!(
            load(&props, &actor_toml()),
            Err(LoadError::Definition(DefinitionError::NonPositive { .. }))
        ));
    }

    #[test]
    fn prop_without_states_is_fatal() {
        let props = "[[prop]]\nname = \"ghost\"\n";
        assert!(matches!(
            load(props, &actor_toml()),
            Err(LoadError::Definition(DefinitionError::NoStates { .. }))
        ));
    }

    #[test]
    fn missing_actor_state_is_fatal() {
        let actor = actor_toml().replace("[states.dying]", "[states.unused]");
        assert!(matches!(load(PROPS, &actor), Err(LoadError::MissingActorState(s)) if s == "dying"));
    }

    #[test]
    fn frame_outside_sheet_is_fatal() {
        let animations = ANIMATIONS.replace("[0, 1]", "[0, 7]");
        let result = Assets::from_sources(("s", SPRITES), ("a", &animations), ("p", PROPS), ("c", &actor_toml()));
        assert!(matches!(
            result,
            Err(LoadError::Definition(DefinitionError::FrameOutOfRange { frame: 7, .. }))
        ));
    }

    #[test]
    fn malformed_toml_names_its_origin() {
        let err = load("[[prop]\n", &actor_toml()).unwrap_err();
        assert!(matches!(&err, LoadError::Parse { origin, .. } if origin == "props"));
    }

    #[test]
    fn embedded_assets_load() {
        let assets = Assets::embedded().unwrap();
        assert!(assets.props.id("girder").is_ok());
        assert!(assets.props.id("ladder").is_ok());
        assert!(assets.props.id("barrel").is_ok());
    }
}
