//! Input handling for the Skel demos.
//!
//! [`InputState`] is fed winit window and device events by the app runner
//! and queried by apps during `update`. Edge states (just pressed, just
//! released) and mouse deltas last until [`InputState::end_frame`].
//!
//! For fly-camera controls, lock the cursor and read
//! [`InputState::mouse_raw_delta`], which keeps reporting motion when the
//! cursor position no longer changes.

mod cursor;
mod keyboard;
mod mouse;
mod state;

pub use cursor::{apply_cursor_mode, CursorMode};
pub use keyboard::KeyboardState;
pub use mouse::MouseState;
pub use state::InputState;

// Re-export winit types commonly used with input
pub use winit::event::{DeviceEvent, WindowEvent};
pub use winit::keyboard::KeyCode;
