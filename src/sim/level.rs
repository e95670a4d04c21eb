/// Level files and the level that owns all live instances.
///
/// ## Level format (TOML):
///   ```toml
///   name = "Girders"
///
///   [actor]
///   spawn = [4, 1]
///
///   [[props]]
///   name = "girder"
///   position = [0, 0]
///   ```
///
/// Props are drawn back to front by draw layer; placement order breaks ties.
/// A level is either Unloaded (no instances) or Playing.

use std::path::Path;

use glam::Vec2;
use serde::Deserialize;
use tracing::info;

use super::assets::Assets;
use crate::domain::actor::Actor;
use crate::domain::control::{ControlScheme, Input};
use crate::domain::prop::Prop;
use crate::domain::sound::Sound;
use crate::domain::sprite::Surface;
use crate::error::LoadError;

// ── TOML Schema ──

#[derive(Deserialize, Debug)]
struct LevelToml {
    name: String,
    actor: ActorToml,
    #[serde(default)]
    props: Vec<PlacementToml>,
}

#[derive(Deserialize, Debug)]
struct ActorToml {
    spawn: [f32; 2],
}

#[derive(Deserialize, Debug)]
struct PlacementToml {
    name: String,
    position: [f32; 2],
}

/// Parsed level description; instances are built by `Level::load`.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelFile {
    pub name: String,
    pub spawn: Vec2,
    pub props: Vec<(String, Vec2)>,
}

impl LevelFile {
    pub fn parse(origin: &str, text: &str) -> Result<Self, LoadError> {
        let raw: LevelToml = toml::from_str(text).map_err(|e| LoadError::parse(origin, e))?;
        Ok(LevelFile {
            name: raw.name,
            spawn: Vec2::from(raw.actor.spawn),
            props: raw.props.into_iter().map(|p| (p.name, Vec2::from(p.position))).collect(),
        })
    }

    pub fn read(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
        LevelFile::parse(&path.display().to_string(), &text)
    }

    /// The level compiled into the binary.
    pub fn embedded() -> Result<Self, LoadError> {
        LevelFile::parse("girders.toml", include_str!("../../assets/levels/girders.toml"))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Unloaded,
    Playing,
}

pub struct Level {
    phase: Phase,
    name: String,
    controls: ControlScheme,
    props: Vec<Prop>,
    actor: Option<Actor>,
    deaths: u32,
}

impl Level {
    pub fn new(controls: ControlScheme) -> Self {
        Level {
            phase: Phase::Unloaded,
            name: String::new(),
            controls,
            props: Vec::new(),
            actor: None,
            deaths: 0,
        }
    }

    /// Replace whatever is loaded with a fresh instance set.
    /// On error the level is left unloaded.
    pub fn load(&mut self, file: &LevelFile, assets: &Assets, sound: &mut dyn Sound) -> Result<(), LoadError> {
        self.unload(sound);

        let mut props = file
            .props
            .iter()
            .map(|(name, position)| assets.props.make_prop(*position, name))
            .collect::<Result<Vec<_>, _>>()?;
        props.sort_by_key(|p| p.draw_layer());

        let mut actor = assets.actor.make_actor(file.spawn, self.controls.clone());
        actor.respawn(sound);

        info!(level = %file.name, props = props.len(), "level loaded");
        self.name = file.name.clone();
        self.props = props;
        self.actor = Some(actor);
        self.deaths = 0;
        self.phase = Phase::Playing;
        Ok(())
    }

    /// Drop every instance. Safe to call when already unloaded.
    pub fn unload(&mut self, sound: &mut dyn Sound) {
        if let Some(actor) = self.actor.take() {
            actor.stop_sounds(sound);
        }
        if self.phase == Phase::Playing {
            info!(level = %self.name, "level unloaded");
        }
        self.props.clear();
        self.phase = Phase::Unloaded;
    }

    /// Props back to their first state, actor respawned.
    pub fn reset(&mut self, sound: &mut dyn Sound) {
        if self.phase != Phase::Playing {
            return;
        }
        for prop in &mut self.props {
            prop.reset(sound);
        }
        if let Some(actor) = &mut self.actor {
            actor.respawn(sound);
        }
    }

    pub fn set_spawn_position(&mut self, spawn: Vec2) {
        if let Some(actor) = &mut self.actor {
            actor.set_spawn_position(spawn);
        }
    }

    pub fn on_input(&mut self, input: &dyn Input, sound: &mut dyn Sound) {
        if self.phase != Phase::Playing {
            return;
        }
        if let Some(actor) = &mut self.actor {
            actor.on_input(input, sound);
        }
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        for prop in &self.props {
            prop.draw(surface);
        }
        if let Some(actor) = &self.actor {
            actor.draw(surface);
        }
    }

    /// Count a loss and bring the actor back at its spawn point.
    pub fn respawn_actor(&mut self, sound: &mut dyn Sound) {
        if let Some(actor) = &mut self.actor {
            self.deaths += 1;
            actor.respawn(sound);
        }
    }

    pub fn phase(&self) -> Phase { self.phase }
    pub fn name(&self) -> &str { &self.name }
    pub fn props(&self) -> &[Prop] { &self.props }
    pub fn actor(&self) -> Option<&Actor> { self.actor.as_ref() }
    pub fn deaths(&self) -> u32 { self.deaths }

    /// Disjoint borrows for the step pipeline.
    pub(crate) fn parts_mut(&mut self) -> (&mut [Prop], Option<&mut Actor>) {
        (&mut self.props, self.actor.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::ActorState;
    use crate::domain::control::Key;
    use crate::domain::fixtures::{RecordingInput, RecordingSound};
    use crate::domain::random::ScriptedRandom;

    fn assets() -> Assets {
        Assets::embedded().unwrap()
    }

    fn file() -> LevelFile {
        LevelFile::parse(
            "test",
            r#"
            name = "Test"
            [actor]
            spawn = [2, 1]
            [[props]]
            name = "ladder"
            position = [6, 1]
            [[props]]
            name = "girder"
            position = [0, 0]
            [[props]]
            name = "barrel"
            position = [30, 6]
            "#,
        )
        .unwrap()
    }

    fn snapshot(level: &Level) -> (Vec<(String, Vec2)>, Option<Vec2>) {
        let props = level.props().iter().map(|p| (p.name().to_string(), p.anchor())).collect();
        (props, level.actor().map(|a| a.spawn_position()))
    }

    #[test]
    fn level_file_parses() {
        let f = file();
        assert_eq!(f.name, "Test");
        assert_eq!(f.spawn, Vec2::new(2.0, 1.0));
        assert_eq!(f.props[2], ("barrel".to_string(), Vec2::new(30.0, 6.0)));
    }

    #[test]
    fn embedded_level_loads() {
        let mut sound = RecordingSound::default();
        let mut level = Level::new(ControlScheme::default());
        level.load(&LevelFile::embedded().unwrap(), &assets(), &mut sound).unwrap();
        assert_eq!(level.phase(), Phase::Playing);
        assert!(!level.props().is_empty());
    }

    #[test]
    fn props_sorted_by_draw_layer() {
        let mut sound = RecordingSound::default();
        let mut level = Level::new(ControlScheme::default());
        level.load(&file(), &assets(), &mut sound).unwrap();
        let layers: Vec<i32> = level.props().iter().map(|p| p.draw_layer()).collect();
        let mut sorted = layers.clone();
        sorted.sort();
        assert_eq!(layers, sorted);
        assert_eq!(level.actor().map(|a| a.state()), Some(ActorState::Spawning));
    }

    #[test]
    fn unknown_prop_leaves_level_unloaded() {
        let mut sound = RecordingSound::default();
        let mut level = Level::new(ControlScheme::default());
        let mut bad = file();
        bad.props.push(("crane".into(), Vec2::ZERO));
        assert!(matches!(level.load(&bad, &assets(), &mut sound), Err(LoadError::UnknownProp(_))));
        assert_eq!(level.phase(), Phase::Unloaded);
        assert!(level.props().is_empty());
        assert!(level.actor().is_none());
    }

    #[test]
    fn unload_then_load_matches_fresh_load() {
        let assets = assets();
        let mut sound = RecordingSound::default();
        let mut rng = ScriptedRandom::new(&[1, 0, 2]);

        let mut used = Level::new(ControlScheme::default());
        used.load(&file(), &assets, &mut sound).unwrap();
        for _ in 0..50 {
            crate::sim::step::step(&mut used, 0.1, &assets.atlas, &mut rng);
        }
        used.unload(&mut sound);
        used.unload(&mut sound);
        assert_eq!(used.phase(), Phase::Unloaded);
        used.load(&file(), &assets, &mut sound).unwrap();

        let mut fresh = Level::new(ControlScheme::default());
        fresh.load(&file(), &assets, &mut sound).unwrap();

        assert_eq!(snapshot(&used), snapshot(&fresh));
        for (a, b) in used.props().iter().zip(fresh.props()) {
            assert_eq!(a.state_index(), b.state_index());
            assert_eq!(a.position(), b.position());
        }
        let (ua, fa) = (used.actor().unwrap(), fresh.actor().unwrap());
        assert_eq!(ua.state(), fa.state());
        assert_eq!(ua.position(), fa.position());
        assert_eq!(ua.health(), fa.health());
        assert_eq!(used.deaths(), 0);
    }

    #[test]
    fn unload_stops_looping_actor_sound() {
        let assets = assets();
        let mut sound = RecordingSound::default();
        let mut rng = ScriptedRandom::new(&[0]);
        let mut level = Level::new(ControlScheme::default());
        level.load(&LevelFile::embedded().unwrap(), &assets, &mut sound).unwrap();
        for _ in 0..90 {
            crate::sim::step::step(&mut level, 1.0 / 60.0, &assets.atlas, &mut rng);
        }

        let mut input = RecordingInput::default();
        input.hold(Key::Right);
        level.on_input(&input, &mut sound);
        assert_eq!(level.actor().map(|a| a.state()), Some(ActorState::Running));
        assert_eq!(sound.played.last(), Some(&("walk".to_string(), true)));

        level.unload(&mut sound);
        assert_eq!(sound.stopped.last(), Some(&"walk".to_string()));
        assert!(level.actor().is_none());
    }

    #[test]
    fn reset_respawns_actor() {
        let assets = assets();
        let mut sound = RecordingSound::default();
        let mut level = Level::new(ControlScheme::default());
        level.load(&file(), &assets, &mut sound).unwrap();
        level.set_spawn_position(Vec2::new(10.0, 1.0));
        level.reset(&mut sound);
        let actor = level.actor().unwrap();
        assert_eq!(actor.state(), ActorState::Spawning);
        assert_eq!(actor.position(), Vec2::new(10.0, 1.0));
        assert!(level.props().iter().all(|p| p.state_index() == 0));
    }
}
