/// Sound capability consumed by the state machines.
///
/// Props fire their entry sounds once (never looped). The actor may loop
/// a per-state sound, which it stops again on leaving the state.
pub trait Sound {
    fn play(&mut self, id: &str, looped: bool);
    fn stop(&mut self, id: &str);
}

/// A sound bound to an actor state.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSound {
    pub id: String,
    pub looped: bool,
}
