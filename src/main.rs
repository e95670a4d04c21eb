/// Entry point and frame loop.

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::{execute, terminal};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use girder::config::{GameConfig, LogConfig};
use girder::domain::control::Key;
use girder::domain::random::StdRandom;
use girder::error::LoadError;
use girder::sim::assets::Assets;
use girder::sim::event::{forward_sounds, GameEvent};
use girder::sim::level::{Level, LevelFile};
use girder::sim::step;
use girder::ui::gamepad::GamepadState;
use girder::ui::input::{FrameInput, InputState};
use girder::ui::renderer::Renderer;
use girder::ui::sound::SoundEngine;

fn main() {
    let config = GameConfig::load();
    init_logging(&config.log);

    // Everything that can fail fatally happens before the terminal goes raw.
    let (assets, level_file) = match load_content(&config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut level = Level::new(config.controls.clone());
    let mut queued: Vec<GameEvent> = Vec::new();
    if let Err(e) = level.load(&level_file, &assets, &mut queued) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }
    let honor_release = enable_key_release();

    let mut sound = SoundEngine::new();
    if let Some(engine) = sound.as_mut() {
        forward_sounds(&queued, engine);
    }

    let result = game_loop(&mut level, &assets, &mut renderer, sound.as_mut(), &config, honor_release);

    let mut stops: Vec<GameEvent> = Vec::new();
    level.unload(&mut stops);
    if let Some(engine) = sound.as_mut() {
        forward_sounds(&stops, engine);
        engine.stop_all();
    }

    if honor_release {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Girder!  Deaths: {}", level.deaths());
}

fn load_content(config: &GameConfig) -> Result<(Assets, LevelFile), LoadError> {
    let assets = match &config.assets_dir {
        Some(dir) => Assets::load(dir)?,
        None => {
            info!("no assets directory found, using embedded definitions");
            Assets::embedded()?
        }
    };
    let level = match &config.level {
        Some(path) => LevelFile::read(path)?,
        None => LevelFile::embedded()?,
    };
    Ok((assets, level))
}

/// Log to a file: the terminal owns stdout. `RUST_LOG` overrides the
/// configured level.
fn init_logging(log: &LogConfig) {
    let file = match OpenOptions::new().create(true).append(true).open(&log.file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: could not open log file {}: {e}", log.file.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    if let Err(e) = installed {
        eprintln!("Warning: logging disabled: {e}");
    }
}

/// Ask the terminal for key release events. Returns whether it agreed.
fn enable_key_release() -> bool {
    if !terminal::supports_keyboard_enhancement().unwrap_or(false) {
        return false;
    }
    execute!(io::stdout(), PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)).is_ok()
}

fn game_loop(
    level: &mut Level,
    assets: &Assets,
    renderer: &mut Renderer,
    mut sound: Option<&mut SoundEngine>,
    config: &GameConfig,
    honor_release: bool,
) -> io::Result<()> {
    let mut kb = InputState::new();
    kb.honor_release = honor_release;
    let mut gp = GamepadState::new(&config.gamepad);
    let mut rng = match config.sim.seed {
        Some(seed) => StdRandom::seeded(seed),
        None => StdRandom::from_entropy(),
    };
    let frame_sleep = Duration::from_millis(config.sim.frame_sleep_ms);
    let mut last_tick = Instant::now();

    info!(level = level.name(), "game loop started");

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() || quit_pressed(&kb) || gp.quit_pressed() {
            info!("quit requested");
            break;
        }

        let mut events: Vec<GameEvent> = Vec::new();

        if kb.was_pressed(Key::Char('r')) || gp.restart_pressed() {
            info!("level restarted");
            level.reset(&mut events);
        }

        let input = FrameInput { keys: &kb, pad: &gp, controls: &config.controls };
        level.on_input(&input, &mut events);

        let now = Instant::now();
        let elapsed = now.duration_since(last_tick).as_secs_f32();
        last_tick = now;
        if elapsed > config.sim.max_dt {
            debug!(elapsed, max_dt = config.sim.max_dt, "frame time clamped");
        }
        let dt = elapsed.min(config.sim.max_dt);

        events.extend(step::step(level, dt, &assets.atlas, &mut rng));

        if let Some(engine) = sound.as_deref_mut() {
            forward_sounds(&events, engine);
        }

        renderer.render(level, &assets.atlas)?;
        std::thread::sleep(frame_sleep);
    }

    Ok(())
}

fn quit_pressed(kb: &InputState) -> bool {
    kb.was_pressed(Key::Esc) || kb.was_pressed(Key::Char('q'))
}
