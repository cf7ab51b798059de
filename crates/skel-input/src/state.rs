//! Combined keyboard and mouse state.

use glam::Vec2;
use winit::event::{DeviceEvent, WindowEvent};
use winit::keyboard::KeyCode;

use crate::cursor::CursorMode;
use crate::keyboard::KeyboardState;
use crate::mouse::MouseState;

/// Keyboard and mouse state for one window.
#[derive(Debug, Default)]
pub struct InputState {
    keyboard: KeyboardState,
    mouse: MouseState,
    cursor_mode: CursorMode,
}

impl InputState {
    /// Create a new input state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a reference to the keyboard state.
    #[must_use]
    pub const fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// Get a reference to the mouse state.
    #[must_use]
    pub const fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    /// Process a window event.
    ///
    /// Returns `true` if the event was consumed.
    pub fn process_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                self.keyboard.process_key_event(event);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse.set_position(position.x, position.y);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.mouse.cursor_left();
                true
            }
            WindowEvent::Focused(false) => {
                // Releases are not delivered to an unfocused window.
                self.keyboard.clear();
                false
            }
            _ => false,
        }
    }

    /// Process a device event (raw mouse motion).
    pub fn process_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.mouse.add_raw_motion(delta.0, delta.1);
        }
    }

    /// Reset edges and deltas. Call once per frame after `update`.
    pub fn end_frame(&mut self) {
        self.keyboard.end_frame();
        self.mouse.end_frame();
    }

    /// Returns `true` while the key is held.
    #[must_use]
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keyboard.is_pressed(key)
    }

    /// Returns `true` if the key went down this frame.
    #[must_use]
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.keyboard.is_just_pressed(key)
    }

    /// Returns `true` if the key went up this frame.
    #[must_use]
    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.keyboard.is_just_released(key)
    }

    /// `1.0` when only `positive` is held, `-1.0` when only `negative` is held.
    #[must_use]
    pub fn axis(&self, positive: KeyCode, negative: KeyCode) -> f32 {
        f32::from(u8::from(self.is_key_pressed(positive)))
            - f32::from(u8::from(self.is_key_pressed(negative)))
    }

    /// Cursor position in window coordinates.
    #[must_use]
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse.position()
    }

    /// Cursor movement this frame.
    #[must_use]
    pub const fn mouse_delta(&self) -> Vec2 {
        self.mouse.delta()
    }

    /// Device motion this frame.
    #[must_use]
    pub const fn mouse_raw_delta(&self) -> Vec2 {
        self.mouse.raw_delta()
    }

    /// The cursor mode last recorded with [`set_cursor_mode`](Self::set_cursor_mode).
    #[must_use]
    pub const fn cursor_mode(&self) -> CursorMode {
        self.cursor_mode
    }

    /// Record the cursor mode. Applying it to the window is up to the caller,
    /// see [`apply_cursor_mode`](crate::apply_cursor_mode).
    pub fn set_cursor_mode(&mut self, mode: CursorMode) {
        self.cursor_mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::ElementState;

    #[test]
    fn starts_empty() {
        let input = InputState::new();
        assert!(!input.is_key_pressed(KeyCode::KeyW));
        assert_eq!(input.mouse_position(), Vec2::ZERO);
        assert_eq!(input.cursor_mode(), CursorMode::Normal);
    }

    #[test]
    fn raw_motion_from_device_events() {
        let mut input = InputState::new();
        input.process_device_event(&DeviceEvent::MouseMotion { delta: (3.0, -2.0) });
        assert_eq!(input.mouse_raw_delta(), Vec2::new(3.0, -2.0));
        input.end_frame();
        assert_eq!(input.mouse_raw_delta(), Vec2::ZERO);
    }

    #[test]
    fn axis_cancels_out() {
        let mut input = InputState::new();
        assert_eq!(input.axis(KeyCode::KeyW, KeyCode::KeyS), 0.0);

        input.keyboard.set_key(KeyCode::KeyW, ElementState::Pressed);
        assert_eq!(input.axis(KeyCode::KeyW, KeyCode::KeyS), 1.0);
        assert_eq!(input.axis(KeyCode::KeyS, KeyCode::KeyW), -1.0);

        input.keyboard.set_key(KeyCode::KeyS, ElementState::Pressed);
        assert_eq!(input.axis(KeyCode::KeyW, KeyCode::KeyS), 0.0);
    }

    #[test]
    fn focus_loss_releases_keys() {
        let mut input = InputState::new();
        input.keyboard.set_key(KeyCode::ShiftLeft, ElementState::Pressed);
        assert!(!input.process_window_event(&WindowEvent::Focused(false)));
        assert!(!input.is_key_pressed(KeyCode::ShiftLeft));
    }
}
