//! Application framework for the Skel demos.
//!
//! This crate owns the boilerplate every demo shares:
//! - Window creation and the winit event loop
//! - GPU context, surface and swapchain (recreated on resize)
//! - A render pass with optional depth, plus one framebuffer per image
//! - Frames in flight, each with its own command buffer, semaphore and fence
//!
//! # Example
//!
//! ```no_run
//! use skel_app::{run_app, AppConfig, AppContext, FrameContext, SkelApp};
//!
//! struct Blank;
//!
//! impl SkelApp for Blank {
//!     fn init(_ctx: &mut AppContext) -> anyhow::Result<Self> {
//!         Ok(Self)
//!     }
//!
//!     fn update(&mut self, _ctx: &mut AppContext, _dt: f32) {}
//!
//!     fn render(&mut self, _ctx: &AppContext, _frame: &mut FrameContext) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app::<Blank>(AppConfig::new("blank"))
//! }
//! ```

mod app;
mod config;
mod context;
mod frame;
mod runner;

pub use app::SkelApp;
pub use config::AppConfig;
pub use context::AppContext;
pub use frame::FrameContext;
pub use runner::{init_logging, run_app};

// Re-export commonly used types for convenience
pub use skel_gpu::{GpuContext, GpuContextBuilder};
pub use skel_input::{CursorMode, InputState, KeyCode};
pub use winit::event::{DeviceEvent, DeviceId, WindowEvent};
