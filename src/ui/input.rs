/// Keyboard state tracker and the frame's combined `Input`.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous running/climbing while a key is held
///   - Edge-triggered jump (only fires on initial press)
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::gamepad::GamepadState;
use crate::domain::control::{ControlScheme, Input, Key};

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Terminal key to simulation key. Unmapped keys are ignored.
pub fn key_from_code(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Esc),
        KeyCode::Char(' ') => Some(Key::Space),
        KeyCode::Char(c) => Some(Key::Char(c.to_ascii_lowercase())),
        _ => None,
    }
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<Key, Instant>,

    /// Keys that went from "not held" to "held" during the most recent
    /// drain_events() call.
    fresh_presses: Vec<Key>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl Default for InputState {
    fn default() -> Self {
        InputState::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.raw_events.push(key);
                self.apply(key, Instant::now());
            }
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn apply(&mut self, event: KeyEvent, now: Instant) {
        let Some(key) = key_from_code(event.code) else { return };
        match event.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key);
            }
            // Without confirmed enhancement, rely on timeout-based expiry.
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held(key);
                self.last_active.insert(key, now);
                if !was_held {
                    self.fresh_presses.push(key);
                }
            }
        }
    }

    /// Is this key currently held down?
    pub fn is_held(&self, key: Key) -> bool {
        self.last_active
            .get(&key)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, key: Key) -> bool {
        self.fresh_presses.contains(&key)
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

/// Keyboard plus gamepad as one `Input`. A gamepad action counts as its
/// bound key from the control scheme.
pub struct FrameInput<'a> {
    pub keys: &'a InputState,
    pub pad: &'a GamepadState,
    pub controls: &'a ControlScheme,
}

impl Input for FrameInput<'_> {
    fn is_key_down(&self, key: Key) -> bool {
        self.keys.is_held(key)
            || self.controls.action_for(key).is_some_and(|a| self.pad.action_held(a))
    }

    fn is_key_pressed(&self, key: Key) -> bool {
        self.keys.was_pressed(key)
            || self.controls.action_for(key).is_some_and(|a| self.pad.action_pressed(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn event(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::NONE, kind, state: KeyEventState::NONE }
    }

    #[test]
    fn key_codes_map() {
        assert_eq!(key_from_code(KeyCode::Char(' ')), Some(Key::Space));
        assert_eq!(key_from_code(KeyCode::Char('R')), Some(Key::Char('r')));
        assert_eq!(key_from_code(KeyCode::F(1)), None);
    }

    #[test]
    fn first_press_is_fresh_repeat_is_not() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.apply(event(KeyCode::Char(' '), KeyEventKind::Press), now);
        assert!(input.is_held(Key::Space));
        assert!(input.was_pressed(Key::Space));

        input.fresh_presses.clear();
        input.apply(event(KeyCode::Char(' '), KeyEventKind::Repeat), now);
        assert!(!input.was_pressed(Key::Space));
    }

    #[test]
    fn release_honored_only_when_enabled() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.apply(event(KeyCode::Left, KeyEventKind::Press), now);
        input.apply(event(KeyCode::Left, KeyEventKind::Release), now);
        assert!(input.is_held(Key::Left));

        input.honor_release = true;
        input.apply(event(KeyCode::Left, KeyEventKind::Release), now);
        assert!(!input.is_held(Key::Left));
    }
}
