/// Keys, actions and the input capability.
///
/// The simulation never polls a device. It asks an `Input` whether a
/// key is held (level-triggered) or was freshly pressed this frame
/// (edge-triggered). A `ControlScheme` maps actor actions to keys.

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    Enter,
    Esc,
    Char(char),
}

impl Key {
    /// Parse a key name from config (`"Left"`, `"Space"`, `"w"`, ...).
    pub fn from_name(s: &str) -> Option<Key> {
        let trimmed = s.trim();
        match trimmed.to_uppercase().as_str() {
            "LEFT" => Some(Key::Left),
            "RIGHT" => Some(Key::Right),
            "UP" => Some(Key::Up),
            "DOWN" => Some(Key::Down),
            "SPACE" => Some(Key::Space),
            "ENTER" | "RETURN" => Some(Key::Enter),
            "ESC" | "ESCAPE" => Some(Key::Esc),
            _ => {
                let mut chars = trimmed.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Key::Char(c.to_ascii_lowercase())),
                    _ => None,
                }
            }
        }
    }
}

/// What the actor can be asked to do.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Action {
    MoveLeft,
    MoveRight,
    ClimbUp,
    ClimbDown,
    Jump,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControlScheme {
    pub move_left: Key,
    pub move_right: Key,
    pub climb_up: Key,
    pub climb_down: Key,
    pub jump: Key,
}

impl Default for ControlScheme {
    fn default() -> Self {
        ControlScheme {
            move_left: Key::Left,
            move_right: Key::Right,
            climb_up: Key::Up,
            climb_down: Key::Down,
            jump: Key::Space,
        }
    }
}

impl ControlScheme {
    pub fn key(&self, action: Action) -> Key {
        match action {
            Action::MoveLeft => self.move_left,
            Action::MoveRight => self.move_right,
            Action::ClimbUp => self.climb_up,
            Action::ClimbDown => self.climb_down,
            Action::Jump => self.jump,
        }
    }

    /// Reverse lookup, used to let a gamepad stand in for the keyboard.
    pub fn action_for(&self, key: Key) -> Option<Action> {
        [Action::MoveLeft, Action::MoveRight, Action::ClimbUp, Action::ClimbDown, Action::Jump]
            .into_iter()
            .find(|&a| self.key(a) == key)
    }
}

pub trait Input {
    /// Is the key currently held? (level-triggered)
    fn is_key_down(&self, key: Key) -> bool;

    /// Was the key pressed this frame? (edge-triggered)
    fn is_key_pressed(&self, key: Key) -> bool;
}
