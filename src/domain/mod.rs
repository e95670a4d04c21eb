pub mod actor;
pub mod animation;
pub mod control;
pub mod geometry;
pub mod interaction;
pub mod prop;
pub mod random;
pub mod sound;
pub mod sprite;
pub mod transition;

#[cfg(test)]
pub(crate) mod fixtures;
