/// Girder: arcade platformer simulation core.
///
/// `domain` is the pure simulation (props, actor, interactions), `sim`
/// owns levels and the per-tick pipeline, `ui` holds the terminal
/// collaborators used by the binary.

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;
pub mod ui;
