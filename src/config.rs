/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::control::{ControlScheme, Key};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub sim: SimConfig,
    pub controls: ControlScheme,
    pub gamepad: GamepadConfig,
    /// Directory holding the definition files; `None` means use the
    /// embedded copies.
    pub assets_dir: Option<PathBuf>,
    /// Level file; `None` means the embedded level.
    pub level: Option<PathBuf>,
    pub log: LogConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub max_dt: f32,
    pub frame_sleep_ms: u64,
    /// Fixed seed for the random source; entropy when absent.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub restart: Vec<String>,
    pub quit: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogConfig {
    pub level: String,
    pub file: PathBuf,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    sim: TomlSim,
    #[serde(default)]
    controls: TomlControls,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    log: TomlLog,
}

#[derive(Deserialize, Debug)]
struct TomlSim {
    #[serde(default = "default_max_dt")]
    max_dt: f32,
    #[serde(default = "default_frame_sleep")]
    frame_sleep_ms: u64,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TomlControls {
    #[serde(default = "default_move_left")]
    move_left: String,
    #[serde(default = "default_move_right")]
    move_right: String,
    #[serde(default = "default_climb_up")]
    climb_up: String,
    #[serde(default = "default_climb_down")]
    climb_down: String,
    #[serde(default = "default_jump_key")]
    jump: String,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_jump")]
    jump: Vec<String>,
    #[serde(default = "default_pad_restart")]
    restart: Vec<String>,
    #[serde(default = "default_pad_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_assets_dir")]
    assets_dir: String,
    #[serde(default)]
    level: String,
}

#[derive(Deserialize, Debug)]
struct TomlLog {
    #[serde(default = "default_log_level")]
    level: String,
    #[serde(default = "default_log_file")]
    file: String,
}

// ── Defaults ──

fn default_max_dt() -> f32 { 0.05 }
fn default_frame_sleep() -> u64 { 16 }

fn default_move_left() -> String { "Left".into() }
fn default_move_right() -> String { "Right".into() }
fn default_climb_up() -> String { "Up".into() }
fn default_climb_down() -> String { "Down".into() }
fn default_jump_key() -> String { "Space".into() }

fn default_pad_jump() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_pad_restart() -> Vec<String> { vec!["Start".into()] }
fn default_pad_quit() -> Vec<String> { vec!["Select".into()] }

fn default_assets_dir() -> String { "assets".into() }
fn default_log_level() -> String { "info".into() }
fn default_log_file() -> String { "girder.log".into() }

impl Default for TomlSim {
    fn default() -> Self {
        TomlSim { max_dt: default_max_dt(), frame_sleep_ms: default_frame_sleep(), seed: None }
    }
}

impl Default for TomlControls {
    fn default() -> Self {
        TomlControls {
            move_left: default_move_left(),
            move_right: default_move_right(),
            climb_up: default_climb_up(),
            climb_down: default_climb_down(),
            jump: default_jump_key(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad { jump: default_pad_jump(), restart: default_pad_restart(), quit: default_pad_quit() }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { assets_dir: default_assets_dir(), level: String::new() }
    }
}

impl Default for TomlLog {
    fn default() -> Self {
        TomlLog { level: default_log_level(), file: default_log_file() }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) ~/.local/share/girder, (4) /usr/share/girder.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::resolve(toml_cfg, &search_dirs)
    }

    /// Parse config text directly; paths resolve against `base`.
    pub fn from_toml_str(text: &str, base: &Path) -> Result<Self, toml::de::Error> {
        let toml_cfg: TomlConfig = toml::from_str(text)?;
        Ok(GameConfig::resolve(toml_cfg, &[base.to_path_buf()]))
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let c = &toml_cfg.controls;
        let defaults = ControlScheme::default();
        let controls = ControlScheme {
            move_left: parse_key(&c.move_left, defaults.move_left),
            move_right: parse_key(&c.move_right, defaults.move_right),
            climb_up: parse_key(&c.climb_up, defaults.climb_up),
            climb_down: parse_key(&c.climb_down, defaults.climb_down),
            jump: parse_key(&c.jump, defaults.jump),
        };

        let max_dt = if toml_cfg.sim.max_dt > 0.0 {
            toml_cfg.sim.max_dt
        } else {
            eprintln!("Warning: sim.max_dt must be positive, using {}", default_max_dt());
            default_max_dt()
        };

        let assets_dir = find_in(search_dirs, &toml_cfg.general.assets_dir, Path::is_dir);
        let level = if toml_cfg.general.level.is_empty() {
            None
        } else {
            // A level name that doesn't exist anywhere is still passed on,
            // so the load error names the path the user asked for.
            find_in(search_dirs, &toml_cfg.general.level, Path::is_file)
                .or_else(|| Some(PathBuf::from(&toml_cfg.general.level)))
        };

        GameConfig {
            sim: SimConfig { max_dt, frame_sleep_ms: toml_cfg.sim.frame_sleep_ms, seed: toml_cfg.sim.seed },
            controls,
            gamepad: GamepadConfig {
                jump: toml_cfg.gamepad.jump,
                restart: toml_cfg.gamepad.restart,
                quit: toml_cfg.gamepad.quit,
            },
            assets_dir,
            level,
            log: LogConfig { level: toml_cfg.log.level, file: PathBuf::from(toml_cfg.log.file) },
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::resolve(TomlConfig::default(), &[])
    }
}

/// Unknown key names keep the action's default key.
fn parse_key(name: &str, fallback: Key) -> Key {
    Key::from_name(name).unwrap_or_else(|| {
        eprintln!("Warning: unknown key name {name:?}, using {fallback:?}");
        fallback
    })
}

/// Absolute paths are taken as-is; relative ones are searched in order.
fn find_in(search_dirs: &[PathBuf], name: &str, exists: fn(&Path) -> bool) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_absolute() {
        return exists(&path).then_some(path);
    }
    search_dirs.iter().map(|d| d.join(name)).find(|p| exists(p))
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so an installed link still finds data
        // relative to the real binary.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/girder)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/girder");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/girder)
    let sys = PathBuf::from("/usr/share/girder");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    // 5. Fallback
    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
