//! Cursor grab and visibility.

use winit::error::ExternalError;
use winit::window::{CursorGrabMode, Window};

/// How the cursor behaves over the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorMode {
    /// Visible and free.
    #[default]
    Normal,
    /// Hidden and held in place, for mouse look.
    Locked,
}

impl CursorMode {
    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Normal => Self::Locked,
            Self::Locked => Self::Normal,
        }
    }
}

/// Apply `mode` to `window`.
///
/// Platforms without cursor locking (X11, Windows) get a confined cursor
/// instead, which still works for raw-motion mouse look.
pub fn apply_cursor_mode(window: &Window, mode: CursorMode) -> Result<(), ExternalError> {
    match mode {
        CursorMode::Normal => {
            window.set_cursor_grab(CursorGrabMode::None)?;
            window.set_cursor_visible(true);
        }
        CursorMode::Locked => {
            if let Err(e) = window.set_cursor_grab(CursorGrabMode::Locked) {
                tracing::debug!("Cursor lock unavailable ({e}), confining instead");
                window.set_cursor_grab(CursorGrabMode::Confined)?;
            }
            window.set_cursor_visible(false);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_round_trips() {
        assert_eq!(CursorMode::default(), CursorMode::Normal);
        assert_eq!(CursorMode::Normal.toggled(), CursorMode::Locked);
        assert_eq!(CursorMode::Locked.toggled(), CursorMode::Normal);
    }
}
