/// Load-time error types.
///
/// `DefinitionError` is a contract violation in definition data: a value
/// of any definition type only exists if its constructor accepted it.
/// `LoadError` adds the I/O and lookup failures of the factories.
/// Both are fatal: the simulation never starts from partial data.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DefinitionError {
    #[error("{kind} definition has an empty name")]
    EmptyName { kind: &'static str },

    #[error("prop '{prop}' has no states")]
    NoStates { prop: String },

    #[error("{what} must be positive (got {value})")]
    NonPositive { what: &'static str, value: f32 },

    #[error("interaction box has negative area ({w} x {h})")]
    NegativeBox { w: f32, h: f32 },

    #[error("state has an empty animation name")]
    EmptyAnimationName,

    #[error("transition needs at least one position point")]
    NoPositionPoints,

    #[error("transition needs at least one speed point")]
    NoSpeedPoints,

    #[error("speed point value must not be negative (got {0})")]
    NegativeSpeed(f32),

    #[error("animation '{animation}' has no frames")]
    NoFrames { animation: String },

    #[error("animation '{animation}' frame {frame} is outside spritesheet '{sheet}'")]
    FrameOutOfRange { animation: String, sheet: String, frame: usize },

    #[error("actor definition has {got} state entries, expected {expected}")]
    ActorStateCount { got: usize, expected: usize },

    #[error("sprite {index} of sheet '{sheet}' is empty")]
    EmptySprite { sheet: String, index: usize },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown animation '{0}'")]
    UnknownAnimation(String),

    #[error("unknown prop type '{0}'")]
    UnknownProp(String),

    #[error("unknown spritesheet '{0}'")]
    UnknownSpritesheet(String),

    #[error("actor state '{0}' is not defined")]
    MissingActorState(String),

    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

impl LoadError {
    pub fn parse(origin: impl Into<String>, source: toml::de::Error) -> Self {
        LoadError::Parse { origin: origin.into(), source }
    }
}
