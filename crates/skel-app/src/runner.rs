//! Application runner and event loop.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ash::vk;
use skel_core::timer::{FrameStats, Timer};
use skel_gpu::command::{
    begin_command_buffer, end_command_buffer, reset_command_buffer, submit_command_buffers,
    WaitSemaphoreInfo,
};
use skel_gpu::pipeline::set_viewport_and_scissor;
use skel_gpu::render_pass::clear_values;
use skel_gpu::sync::{FrameSync, FRAME_FENCE_TIMEOUT_NS};
use skel_gpu::GpuError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::app::SkelApp;
use crate::config::{pacing_delay, AppConfig};
use crate::context::AppContext;
use crate::frame::FrameContext;

/// Install the `tracing` subscriber used by the demos.
///
/// `RUST_LOG` overrides the default `info` filter. Calling this twice is harmless.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

/// Run a [`SkelApp`] with the given configuration.
///
/// Initializes logging, creates the window and GPU context, and runs the
/// event loop until the window closes. A failure during startup is
/// returned once the event loop has exited.
pub fn run_app<A: SkelApp + 'static>(config: AppConfig) -> anyhow::Result<()> {
    init_logging();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner::<A> {
        config,
        state: None,
        init_error: None,
    };

    event_loop.run_app(&mut runner)?;

    match runner.init_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Internal application runner that implements winit's `ApplicationHandler`.
struct AppRunner<A: SkelApp> {
    config: AppConfig,
    state: Option<AppState<A>>,
    init_error: Option<anyhow::Error>,
}

/// Internal application state.
struct AppState<A: SkelApp> {
    // Fields drop in order: `app` must go before the device in `ctx`.
    app: A,
    ctx: AppContext,
    target_frame_time: Option<Duration>,
    frame_timer: Timer,
    stats: FrameStats,
    /// Set while the window has zero area.
    paused: bool,
}

impl<A: SkelApp + 'static> ApplicationHandler for AppRunner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        info!("Creating application state...");

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready!");
            }
            Err(e) => {
                error!("Failed to initialize application: {e:#}");
                self.init_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };

        // Let the app handle the event first
        if state.app.on_event(&event) {
            return;
        }
        state.ctx.input.process_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                self.shutdown(event_loop);
            }
            WindowEvent::KeyboardInput { event, .. } if is_escape_press(&event) => {
                info!("Escape pressed");
                self.shutdown(event_loop);
            }
            WindowEvent::RedrawRequested => {
                if let Err(failure) = state.render_frame() {
                    error!("Render error: {:#}", failure.error);
                    if failure.policy() == FailurePolicy::Exit {
                        error!("Frame loop cannot continue, shutting down");
                        self.shutdown(event_loop);
                        return;
                    }
                }
                state.ctx.input.end_frame();
            }
            WindowEvent::Resized(size) => {
                if let Err(e) = state.handle_resize(size.width, size.height) {
                    error!("Resize error: {e:#}");
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(state) = &mut self.state {
            state.ctx.input.process_device_event(&event);
            state.app.on_device_event(device_id, &event);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.ctx.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Reached without CloseRequested when the platform ends the loop.
        if let Some(mut state) = self.state.take() {
            state.cleanup();
        }
    }
}

impl<A: SkelApp + 'static> AppRunner<A> {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState<A>> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let mut ctx = AppContext::new(window, &self.config)?;

        let app = A::init(&mut ctx)?;

        Ok(AppState {
            ctx,
            app,
            target_frame_time: self.config.target_frame_time(),
            frame_timer: Timer::new(),
            stats: FrameStats::new(),
            paused: false,
        })
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut state) = self.state.take() {
            state.cleanup();
        }
        event_loop.exit();
    }
}

fn is_escape_press(event: &KeyEvent) -> bool {
    event.state == ElementState::Pressed
        && !event.repeat
        && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
}

/// What the runner does after a frame fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailurePolicy {
    /// Log and render the next frame.
    Continue,
    /// Clean up and leave the event loop.
    Exit,
}

/// A failed frame.
struct FrameFailure {
    error: anyhow::Error,
    /// Whether the frame slot's fence will still signal. A slot whose fence
    /// was reset but never submitted would time out on every later visit.
    slot_recovered: bool,
}

impl FrameFailure {
    fn policy(&self) -> FailurePolicy {
        failure_policy(&self.error, self.slot_recovered)
    }
}

impl From<anyhow::Error> for FrameFailure {
    fn from(error: anyhow::Error) -> Self {
        Self {
            error,
            slot_recovered: true,
        }
    }
}

impl From<GpuError> for FrameFailure {
    fn from(error: GpuError) -> Self {
        Self::from(anyhow::Error::from(error))
    }
}

/// Decide whether the frame loop can go on after `error`.
fn failure_policy(error: &anyhow::Error, slot_recovered: bool) -> FailurePolicy {
    if !slot_recovered {
        return FailurePolicy::Exit;
    }

    match error.downcast_ref::<GpuError>() {
        Some(
            GpuError::Vulkan(vk::Result::ERROR_DEVICE_LOST | vk::Result::ERROR_SURFACE_LOST_KHR)
            | GpuError::SwapchainCreation(_),
        ) => FailurePolicy::Exit,
        _ => FailurePolicy::Continue,
    }
}

impl<A: SkelApp> AppState<A> {
    fn render_frame(&mut self) -> Result<(), FrameFailure> {
        if self.paused {
            return Ok(());
        }

        let frame_start = Instant::now();
        let dt = self.frame_timer.lap().as_secs_f32();
        self.stats.record(dt);

        self.app.update(&mut self.ctx, dt);

        let frame_index = self.ctx.ring.current();
        let sync = self.ctx.frames[frame_index].sync;

        // Wait until this slot's previous submission has finished.
        let ready = unsafe { sync.wait(self.ctx.gpu.device(), FRAME_FENCE_TIMEOUT_NS)? };
        if !ready {
            warn!("Timed out waiting for frame slot {frame_index}, skipping frame");
            return Ok(());
        }

        let acquired = unsafe {
            self.ctx.targets.swapchain.acquire_next_image(
                &self.ctx.surface.swapchain_loader,
                sync.image_available,
                u64::MAX,
            )
        };
        let image_index = match acquired {
            Ok((index, _suboptimal)) => index,
            Err(e) if e.is_out_of_date() => {
                self.recreate_swapchain()?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        // Only reset once an image is guaranteed to be submitted, or the
        // next wait on this fence would never return.
        unsafe { sync.reset(self.ctx.gpu.device())? };

        let rendered = match unsafe { self.record_and_submit(frame_index, image_index, dt) } {
            Ok(rendered) => rendered,
            Err(error) => return Err(self.release_slot(frame_index, sync, error)),
        };

        let render_finished = self.ctx.targets.render_finished[image_index as usize];
        let needs_recreate = unsafe {
            self.ctx.targets.swapchain.present(
                &self.ctx.surface.swapchain_loader,
                self.ctx.gpu.graphics_queue(),
                image_index,
                &[render_finished],
            )?
        };

        if needs_recreate {
            self.recreate_swapchain()?;
        }

        self.ctx.ring.advance();
        self.ctx.frame_count += 1;

        if let Some(delay) = pacing_delay(self.target_frame_time, frame_start.elapsed()) {
            thread::sleep(delay);
        }

        rendered.map_err(FrameFailure::from)
    }

    /// Record the frame's render pass and submit it.
    ///
    /// The outer error means nothing was submitted. The inner result is the
    /// app's `render`, whose frame is submitted even when it failed so the
    /// fence signals.
    ///
    /// # Safety
    /// The slot's fence must have been reset and `image_index` acquired with
    /// the slot's image-available semaphore.
    unsafe fn record_and_submit(
        &mut self,
        frame_index: usize,
        image_index: u32,
        dt: f32,
    ) -> anyhow::Result<anyhow::Result<()>> {
        let device = self.ctx.gpu.device();
        let frame = &self.ctx.frames[frame_index];
        let (cmd, sync) = (frame.command_buffer, frame.sync);

        let image = image_index as usize;
        let framebuffer = self.ctx.targets.framebuffers[image];
        let render_finished = self.ctx.targets.render_finished[image];
        let extent = self.ctx.extent();

        let rendered = unsafe {
            reset_command_buffer(device, cmd, false)?;
            begin_command_buffer(device, cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, None)?;

            let clears = clear_values(self.ctx.clear_color, self.ctx.depth_format.is_some());
            let begin_info = vk::RenderPassBeginInfo::default()
                .render_pass(self.ctx.render_pass)
                .framebuffer(framebuffer)
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                })
                .clear_values(&clears);
            device.cmd_begin_render_pass(cmd, &begin_info, vk::SubpassContents::INLINE);
            set_viewport_and_scissor(device, cmd, extent);

            let mut frame_ctx = FrameContext::new(
                cmd,
                image_index,
                framebuffer,
                extent,
                frame_index,
                self.ctx.frame_count,
                dt,
            );

            let rendered = self.app.render(&self.ctx, &mut frame_ctx);

            device.cmd_end_render_pass(cmd);
            end_command_buffer(device, cmd)?;

            submit_command_buffers(
                device,
                self.ctx.gpu.graphics_queue(),
                &[WaitSemaphoreInfo::new(
                    sync.image_available,
                    vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                )],
                &[cmd],
                &[render_finished],
                sync.in_flight,
            )?;

            rendered
        };

        Ok(rendered)
    }

    /// Put a slot whose frame was never submitted back into a waitable state.
    ///
    /// An empty submit consumes the image-available semaphore and signals the
    /// fence. The acquired image is never presented, so the swapchain is
    /// recreated to get it back.
    fn release_slot(
        &mut self,
        frame_index: usize,
        sync: FrameSync,
        error: anyhow::Error,
    ) -> FrameFailure {
        let released = unsafe {
            submit_command_buffers(
                self.ctx.gpu.device(),
                self.ctx.gpu.graphics_queue(),
                &[WaitSemaphoreInfo::new(
                    sync.image_available,
                    vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                )],
                &[],
                &[],
                sync.in_flight,
            )
        };

        if let Err(e) = released {
            error!("Failed to release frame slot {frame_index}: {e}");
            return FrameFailure {
                error,
                slot_recovered: false,
            };
        }

        if let Err(e) = self.recreate_swapchain() {
            error!("Failed to recreate swapchain after a dropped frame: {e:#}");
        }

        FrameFailure::from(error)
    }

    /// Recreate for the window's current size, pausing if it has no area.
    fn recreate_swapchain(&mut self) -> anyhow::Result<()> {
        let size = self.ctx.window.inner_size();
        self.handle_resize(size.width, size.height)
    }

    fn handle_resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        if width == 0 || height == 0 {
            self.paused = true;
            return Ok(());
        }
        self.paused = false;

        self.ctx.gpu.wait_idle()?;
        unsafe {
            self.ctx.recreate_swapchain(width, height)?;
        }

        self.app.on_resize(&mut self.ctx, width, height)?;

        info!("Resized to {}x{}", width, height);
        Ok(())
    }

    fn cleanup(&mut self) {
        if let (Some(min), Some(max), Some(avg)) =
            (self.stats.min_fps(), self.stats.max_fps(), self.stats.avg_fps())
        {
            info!("FPS Statistics:");
            info!("  Min: {:.1}", min);
            info!("  Max: {:.1}", max);
            info!("  Avg: {:.1}", avg);
            info!("  Total frames: {}", self.ctx.frame_count);
        }

        info!("Starting cleanup...");
        if let Err(e) = self.ctx.gpu.wait_idle() {
            error!("Failed to wait idle: {e}");
        }

        // The app's resources go first; the context's go when it drops.
        self.app.cleanup(&mut self.ctx);

        info!("Cleanup complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }

    #[test]
    fn unreleased_slot_exits() {
        let error = anyhow::Error::from(GpuError::from(vk::Result::ERROR_OUT_OF_HOST_MEMORY));
        assert_eq!(failure_policy(&error, false), FailurePolicy::Exit);
    }

    #[test]
    fn released_slot_continues() {
        let error = anyhow::Error::from(GpuError::from(vk::Result::ERROR_OUT_OF_HOST_MEMORY));
        assert_eq!(failure_policy(&error, true), FailurePolicy::Continue);

        let app_error = anyhow::anyhow!("missing texture");
        assert_eq!(failure_policy(&app_error, true), FailurePolicy::Continue);
    }

    #[test]
    fn lost_device_or_surface_exits() {
        for result in [vk::Result::ERROR_DEVICE_LOST, vk::Result::ERROR_SURFACE_LOST_KHR] {
            let error = anyhow::Error::from(GpuError::from(result));
            assert_eq!(failure_policy(&error, true), FailurePolicy::Exit);
        }
    }

    #[test]
    fn failed_swapchain_recreation_exits() {
        let error = anyhow::Error::from(GpuError::SwapchainCreation("format changed".into()));
        assert_eq!(failure_policy(&error, true), FailurePolicy::Exit);
    }

    #[test]
    fn conversions_assume_recovered_slot() {
        let failure = FrameFailure::from(GpuError::from(vk::Result::ERROR_DEVICE_LOST));
        assert!(failure.slot_recovered);
        assert_eq!(failure.policy(), FailurePolicy::Exit);

        let failure = FrameFailure::from(anyhow::anyhow!("render failed"));
        assert_eq!(failure.policy(), FailurePolicy::Continue);
    }
}
