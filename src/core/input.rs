//! Input state tracking
//!
//! The windowing layer is external, so keys are described by a small
//! engine-owned [`Key`] enum and fed in through [`InputState::press`] and
//! [`InputState::release`].

use std::collections::HashSet;

/// Keys the first-person controller reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Key {
    W,
    A,
    S,
    D,
    C,
    Space,
    ShiftLeft,
    ShiftRight,
    Escape,
}

impl Key {
    /// Parse a key name as used by the debug protocol and scripted input
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "w" => Some(Key::W),
            "a" => Some(Key::A),
            "s" => Some(Key::S),
            "d" => Some(Key::D),
            "c" => Some(Key::C),
            "space" | " " => Some(Key::Space),
            "shift" | "shiftleft" => Some(Key::ShiftLeft),
            "shiftright" => Some(Key::ShiftRight),
            "escape" | "esc" => Some(Key::Escape),
            _ => None,
        }
    }
}

/// Tracks keyboard and mouse input state
#[derive(Debug, Default, Clone)]
pub struct InputState {
    /// Currently pressed keys
    keys_pressed: HashSet<Key>,
    /// Keys pressed this frame
    keys_just_pressed: HashSet<Key>,
    /// Keys released this frame
    keys_just_released: HashSet<Key>,
    /// Mouse movement accumulated since last frame
    mouse_delta: (f32, f32),
    /// Whether mouse look is enabled
    mouse_captured: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key press; repeats while held do not count as a new press
    pub fn press(&mut self, key: Key) {
        if self.keys_pressed.insert(key) {
            self.keys_just_pressed.insert(key);
        }
    }

    pub fn release(&mut self, key: Key) {
        if self.keys_pressed.remove(&key) {
            self.keys_just_released.insert(key);
        }
    }

    /// Accumulate raw mouse motion
    pub fn add_mouse_motion(&mut self, dx: f32, dy: f32) {
        self.mouse_delta.0 += dx;
        self.mouse_delta.1 += dy;
    }

    pub fn set_mouse_captured(&mut self, captured: bool) {
        self.mouse_captured = captured;
    }

    pub fn is_mouse_captured(&self) -> bool {
        self.mouse_captured
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_key_just_pressed(&self, key: Key) -> bool {
        self.keys_just_pressed.contains(&key)
    }

    pub fn is_key_just_released(&self, key: Key) -> bool {
        self.keys_just_released.contains(&key)
    }

    /// Either shift key
    pub fn is_shift_pressed(&self) -> bool {
        self.is_key_pressed(Key::ShiftLeft) || self.is_key_pressed(Key::ShiftRight)
    }

    pub fn mouse_delta(&self) -> (f32, f32) {
        self.mouse_delta
    }

    /// Clear per-frame state; call after the frame consumed the input
    pub fn end_frame(&mut self) {
        self.keys_just_pressed.clear();
        self.keys_just_released.clear();
        self.mouse_delta = (0.0, 0.0);
    }

    /// Release everything, e.g. when focus is lost
    pub fn clear(&mut self) {
        self.keys_pressed.clear();
        self.end_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_is_edge_triggered() {
        let mut input = InputState::new();
        input.press(Key::Space);
        assert!(input.is_key_just_pressed(Key::Space));
        input.end_frame();
        input.press(Key::Space);
        assert!(input.is_key_pressed(Key::Space));
        assert!(!input.is_key_just_pressed(Key::Space));
    }

    #[test]
    fn test_release_and_mouse_reset() {
        let mut input = InputState::new();
        input.press(Key::W);
        input.add_mouse_motion(3.0, -2.0);
        input.add_mouse_motion(1.0, 1.0);
        assert_eq!(input.mouse_delta(), (4.0, -1.0));
        input.release(Key::W);
        assert!(input.is_key_just_released(Key::W));
        input.end_frame();
        assert_eq!(input.mouse_delta(), (0.0, 0.0));
        assert!(!input.is_key_pressed(Key::W));
    }

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name("W"), Some(Key::W));
        assert_eq!(Key::from_name("space"), Some(Key::Space));
        assert_eq!(Key::from_name("f13"), None);
    }
}
