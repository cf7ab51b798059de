//! Keyboard state tracking.

use hashbrown::HashSet;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keys held down, plus the edges seen since the last [`end_frame`](Self::end_frame).
#[derive(Debug, Default)]
pub struct KeyboardState {
    held: HashSet<KeyCode>,
    pressed: HashSet<KeyCode>,
    released: HashSet<KeyCode>,
}

impl KeyboardState {
    /// Create a new keyboard state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a key event. Keys without a physical code are ignored.
    pub fn process_key_event(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(key) = event.physical_key else {
            return;
        };
        self.set_key(key, event.state);
    }

    /// Record a key transition. Auto-repeat presses do not count as new presses.
    pub fn set_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.held.insert(key) {
                    self.pressed.insert(key);
                }
            }
            ElementState::Released => {
                if self.held.remove(&key) {
                    self.released.insert(key);
                }
            }
        }
    }

    /// Returns `true` while the key is held.
    #[must_use]
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Returns `true` if the key went down this frame.
    #[must_use]
    pub fn is_just_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    /// Returns `true` if the key went up this frame.
    #[must_use]
    pub fn is_just_released(&self, key: KeyCode) -> bool {
        self.released.contains(&key)
    }

    /// Forget this frame's edges.
    pub fn end_frame(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
        self.end_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_hold_release() {
        let mut keyboard = KeyboardState::new();
        assert!(!keyboard.is_pressed(KeyCode::KeyW));

        keyboard.set_key(KeyCode::KeyW, ElementState::Pressed);
        assert!(keyboard.is_pressed(KeyCode::KeyW));
        assert!(keyboard.is_just_pressed(KeyCode::KeyW));

        keyboard.end_frame();
        assert!(keyboard.is_pressed(KeyCode::KeyW));
        assert!(!keyboard.is_just_pressed(KeyCode::KeyW));

        keyboard.set_key(KeyCode::KeyW, ElementState::Released);
        assert!(!keyboard.is_pressed(KeyCode::KeyW));
        assert!(keyboard.is_just_released(KeyCode::KeyW));

        keyboard.end_frame();
        assert!(!keyboard.is_just_released(KeyCode::KeyW));
    }

    #[test]
    fn repeat_is_not_a_new_press() {
        let mut keyboard = KeyboardState::new();
        keyboard.set_key(KeyCode::Space, ElementState::Pressed);
        keyboard.end_frame();
        keyboard.set_key(KeyCode::Space, ElementState::Pressed);
        assert!(!keyboard.is_just_pressed(KeyCode::Space));
    }

    #[test]
    fn stray_release_ignored() {
        let mut keyboard = KeyboardState::new();
        keyboard.set_key(KeyCode::Tab, ElementState::Released);
        assert!(!keyboard.is_just_released(KeyCode::Tab));
    }

    #[test]
    fn clear_releases_held_keys() {
        let mut keyboard = KeyboardState::new();
        keyboard.set_key(KeyCode::KeyA, ElementState::Pressed);
        keyboard.clear();
        assert!(!keyboard.is_pressed(KeyCode::KeyA));
        assert!(!keyboard.is_just_pressed(KeyCode::KeyA));
    }
}
