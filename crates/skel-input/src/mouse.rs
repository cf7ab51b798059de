//! Mouse state tracking.

use glam::Vec2;

/// Cursor position and motion.
#[derive(Debug, Default)]
pub struct MouseState {
    /// `None` until the first cursor event, so the first move has no delta.
    position: Option<Vec2>,
    delta: Vec2,
    raw_delta: Vec2,
}

impl MouseState {
    /// Create a new mouse state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a cursor position update in window coordinates.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_position(&mut self, x: f64, y: f64) {
        let new_pos = Vec2::new(x as f32, y as f32);
        if let Some(old) = self.position {
            self.delta += new_pos - old;
        }
        self.position = Some(new_pos);
    }

    /// Accumulate raw device motion.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_raw_motion(&mut self, dx: f64, dy: f64) {
        self.raw_delta += Vec2::new(dx as f32, dy as f32);
    }

    /// Last cursor position, or zero before the cursor entered the window.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position.unwrap_or(Vec2::ZERO)
    }

    /// Cursor movement this frame.
    #[must_use]
    pub const fn delta(&self) -> Vec2 {
        self.delta
    }

    /// Device motion this frame.
    #[must_use]
    pub const fn raw_delta(&self) -> Vec2 {
        self.raw_delta
    }

    /// Reset per-frame deltas.
    pub fn end_frame(&mut self) {
        self.delta = Vec2::ZERO;
        self.raw_delta = Vec2::ZERO;
    }

    /// Forget the position, so the next move after re-entry does not jump.
    pub fn cursor_left(&mut self) {
        self.position = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_move_has_no_delta() {
        let mut mouse = MouseState::new();
        mouse.set_position(100.0, 200.0);
        assert_eq!(mouse.position(), Vec2::new(100.0, 200.0));
        assert_eq!(mouse.delta(), Vec2::ZERO);

        mouse.set_position(150.0, 220.0);
        assert_eq!(mouse.delta(), Vec2::new(50.0, 20.0));
    }

    #[test]
    fn deltas_accumulate_until_end_frame() {
        let mut mouse = MouseState::new();
        mouse.set_position(0.0, 0.0);
        mouse.set_position(1.0, 1.0);
        mouse.set_position(3.0, 0.0);
        assert_eq!(mouse.delta(), Vec2::new(3.0, 0.0));

        mouse.add_raw_motion(10.0, 20.0);
        mouse.add_raw_motion(5.0, 5.0);
        assert_eq!(mouse.raw_delta(), Vec2::new(15.0, 25.0));

        mouse.end_frame();
        assert_eq!(mouse.delta(), Vec2::ZERO);
        assert_eq!(mouse.raw_delta(), Vec2::ZERO);
        assert_eq!(mouse.position(), Vec2::new(3.0, 0.0));
    }

    #[test]
    fn leaving_resets_tracking() {
        let mut mouse = MouseState::new();
        mouse.set_position(10.0, 10.0);
        mouse.cursor_left();
        mouse.set_position(500.0, 500.0);
        assert_eq!(mouse.delta(), Vec2::ZERO);
    }
}
