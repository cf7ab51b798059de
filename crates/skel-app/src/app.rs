//! `SkelApp` trait definition.

use crate::context::AppContext;
use crate::frame::FrameContext;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};

/// A demo driven by [`run_app`](crate::run_app).
///
/// The runner creates the window and GPU resources, then calls `update`
/// and `render` once per frame. `render` is called with the frame's
/// render pass already begun and the viewport and scissor set, so an app
/// that only clears the screen has nothing to record.
pub trait SkelApp: Sized {
    /// Initialize the application.
    ///
    /// Called once, after the window, swapchain and render pass exist.
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self>;

    /// Update application state. `dt` is in seconds.
    ///
    /// Input edges in `ctx.input` are valid until the frame ends.
    fn update(&mut self, ctx: &mut AppContext, dt: f32);

    /// Record draw commands into `frame.command_buffer`.
    fn render(&mut self, ctx: &AppContext, frame: &mut FrameContext) -> anyhow::Result<()>;

    /// Handle window resize.
    ///
    /// The swapchain, depth buffer and framebuffers have already been
    /// recreated when this is called.
    #[allow(unused_variables)]
    fn on_resize(&mut self, ctx: &mut AppContext, width: u32, height: u32) -> anyhow::Result<()> {
        Ok(())
    }

    /// Handle a window event before the runner does.
    ///
    /// Return `true` to stop the runner from processing it further.
    #[allow(unused_variables)]
    fn on_event(&mut self, event: &WindowEvent) -> bool {
        false
    }

    /// Handle a device event (raw input).
    #[allow(unused_variables)]
    fn on_device_event(&mut self, device_id: DeviceId, event: &DeviceEvent) {}

    /// Destroy GPU resources the app created.
    ///
    /// The device is idle when this is called.
    #[allow(unused_variables)]
    fn cleanup(&mut self, ctx: &mut AppContext) {}
}
