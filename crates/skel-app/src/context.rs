//! Application context.

use std::sync::Arc;

use ash::vk;
use skel_gpu::command::CommandPool;
use skel_gpu::render_pass::{
    create_framebuffers, create_render_pass, destroy_framebuffers, DepthBuffer,
    DEFAULT_DEPTH_FORMAT,
};
use skel_gpu::swapchain::{ensure_same_format, Swapchain};
use skel_gpu::sync::{create_semaphore, FrameRing, FrameSync};
use skel_gpu::{GpuBuffer, GpuContext, GpuContextBuilder, SurfaceContext};
use skel_input::InputState;
use winit::window::Window;

use crate::config::AppConfig;

/// Everything the runner owns, handed to every [`SkelApp`](crate::SkelApp) method.
///
/// Vulkan objects are destroyed when the context drops, surface last, before
/// the GPU context itself goes.
pub struct AppContext {
    /// The window handle.
    pub window: Arc<Window>,
    /// GPU context with device and queue.
    pub gpu: GpuContext,
    /// Surface context for windowed rendering.
    pub surface: SurfaceContext,
    /// Keyboard and mouse state, fed by the runner.
    pub input: InputState,
    /// Total frames rendered.
    pub frame_count: u64,
    /// Colour the render pass clears to.
    pub clear_color: [f32; 4],
    pub(crate) targets: RenderTargets,
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) depth_format: Option<vk::Format>,
    pub(crate) frames: Vec<FrameData>,
    pub(crate) ring: FrameRing,
    upload_pool: Option<CommandPool>,
    vsync: bool,
}

/// Per-frame-in-flight resources.
pub(crate) struct FrameData {
    pub command_pool: CommandPool,
    pub command_buffer: vk::CommandBuffer,
    pub sync: FrameSync,
}

impl FrameData {
    unsafe fn new(device: &ash::Device, queue_family: u32) -> skel_gpu::Result<Self> {
        let command_pool = CommandPool::new(
            device,
            queue_family,
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        )?;
        let command_buffer =
            match command_pool.allocate_command_buffer(device, vk::CommandBufferLevel::PRIMARY) {
                Ok(cmd) => cmd,
                Err(e) => {
                    command_pool.destroy(device);
                    return Err(e);
                }
            };
        let sync = match FrameSync::new(device) {
            Ok(sync) => sync,
            Err(e) => {
                command_pool.destroy(device);
                return Err(e);
            }
        };

        Ok(Self {
            command_pool,
            command_buffer,
            sync,
        })
    }

    unsafe fn destroy(&self, device: &ash::Device) {
        self.sync.destroy(device);
        // Frees the command buffer with it.
        self.command_pool.destroy(device);
    }
}

/// Everything sized or counted by the swapchain.
pub(crate) struct RenderTargets {
    pub swapchain: Swapchain,
    pub depth: Option<DepthBuffer>,
    pub framebuffers: Vec<vk::Framebuffer>,
    /// One per swapchain image; presentation may still hold one after the
    /// frame slot that signalled it comes around again.
    pub render_finished: Vec<vk::Semaphore>,
}

impl RenderTargets {
    const fn bare(swapchain: Swapchain) -> Self {
        Self {
            swapchain,
            depth: None,
            framebuffers: Vec::new(),
            render_finished: Vec::new(),
        }
    }

    /// Create the depth buffer, framebuffers and semaphores for `self.swapchain`.
    unsafe fn populate(
        &mut self,
        gpu: &GpuContext,
        render_pass: vk::RenderPass,
        depth_format: Option<vk::Format>,
    ) -> skel_gpu::Result<()> {
        let device = gpu.device();
        let extent = self.swapchain.extent;

        if let Some(format) = depth_format {
            let mut allocator = gpu.allocator().lock();
            self.depth = Some(DepthBuffer::new(&mut allocator, device, extent, format)?);
        }

        self.framebuffers = create_framebuffers(
            device,
            render_pass,
            &self.swapchain.image_views,
            self.depth.as_ref().map(|depth| depth.view),
            extent,
        )?;

        for _ in 0..self.swapchain.image_count() {
            self.render_finished.push(create_semaphore(device)?);
        }

        Ok(())
    }

    unsafe fn destroy(&mut self, gpu: &GpuContext, surface: &SurfaceContext) {
        let device = gpu.device();

        for semaphore in self.render_finished.drain(..) {
            device.destroy_semaphore(semaphore, None);
        }
        destroy_framebuffers(device, &self.framebuffers);
        self.framebuffers.clear();

        if let Some(mut depth) = self.depth.take() {
            if let Err(e) = depth.destroy(&mut gpu.allocator().lock(), device) {
                tracing::error!("Failed to free depth buffer: {e}");
            }
        }

        self.swapchain.destroy(device, &surface.swapchain_loader);
    }
}

impl AppContext {
    /// Create the GPU context, surface, swapchain, render pass and frames in flight.
    pub(crate) fn new(window: Arc<Window>, config: &AppConfig) -> anyhow::Result<Self> {
        let ring = FrameRing::new(config.frames_in_flight)?;

        let (gpu, surface) = GpuContextBuilder::new()
            .app_name(&config.title)
            .validation(config.validation)
            .verbose_validation(config.verbose_validation)
            .build_for_window(window.as_ref())?;

        let size = window.inner_size();
        let swapchain = match unsafe {
            surface.create_swapchain(&gpu, size.width.max(1), size.height.max(1), config.vsync, None)
        } {
            Ok(swapchain) => swapchain,
            Err(e) => {
                unsafe { surface.destroy() };
                return Err(e.into());
            }
        };

        let depth_format = config.depth.then_some(DEFAULT_DEPTH_FORMAT);

        // From here on, Drop cleans up whatever was created. Destroying null
        // handles is a no-op.
        let mut ctx = Self {
            window,
            gpu,
            surface,
            input: InputState::new(),
            frame_count: 0,
            clear_color: config.clear_color,
            targets: RenderTargets::bare(swapchain),
            render_pass: vk::RenderPass::null(),
            depth_format,
            frames: Vec::with_capacity(ring.len()),
            ring,
            upload_pool: None,
            vsync: config.vsync,
        };

        unsafe {
            let device = ctx.gpu.device();
            let queue_family = ctx.gpu.graphics_queue_family();

            ctx.render_pass = create_render_pass(device, ctx.targets.swapchain.format, depth_format)?;
            ctx.targets.populate(&ctx.gpu, ctx.render_pass, depth_format)?;

            for _ in 0..ctx.ring.len() {
                let frame = FrameData::new(device, queue_family)?;
                ctx.frames.push(frame);
            }

            ctx.upload_pool = Some(CommandPool::new(
                device,
                queue_family,
                vk::CommandPoolCreateFlags::TRANSIENT,
            )?);
        }

        tracing::info!(
            "Swapchain created: {}x{} ({} images, {} frames in flight)",
            ctx.width(),
            ctx.height(),
            ctx.targets.swapchain.image_count(),
            ctx.frames.len()
        );

        Ok(ctx)
    }

    /// Get the current swapchain.
    pub fn swapchain(&self) -> &Swapchain {
        &self.targets.swapchain
    }

    /// Get the current swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.targets.swapchain.extent
    }

    /// Get the swapchain width.
    pub fn width(&self) -> u32 {
        self.targets.swapchain.extent.width
    }

    /// Get the swapchain height.
    pub fn height(&self) -> u32 {
        self.targets.swapchain.extent.height
    }

    /// Get the aspect ratio (width / height).
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(&self) -> f32 {
        self.width() as f32 / self.height().max(1) as f32
    }

    /// The render pass frames are recorded in. Pipelines target subpass 0.
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Depth attachment format, if the render pass has one.
    pub fn depth_format(&self) -> Option<vk::Format> {
        self.depth_format
    }

    /// Get the number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    /// Whether vsync was requested.
    pub fn vsync(&self) -> bool {
        self.vsync
    }

    /// Upload `data` into a new device-local buffer, blocking until done.
    pub fn upload_buffer(
        &self,
        data: &[u8],
        usage: vk::BufferUsageFlags,
        name: &str,
    ) -> anyhow::Result<GpuBuffer> {
        let pool = self
            .upload_pool
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("upload pool not created"))?;
        let buffer = self.gpu.allocator().lock().upload_buffer(
            pool,
            self.gpu.graphics_queue(),
            data,
            usage,
            name,
        )?;
        Ok(buffer)
    }

    /// Recreate the swapchain and everything sized by it.
    ///
    /// # Safety
    /// The GPU must be idle.
    pub(crate) unsafe fn recreate_swapchain(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        let swapchain = self.surface.create_swapchain(
            &self.gpu,
            width,
            height,
            self.vsync,
            Some(self.targets.swapchain.swapchain),
        )?;

        // The render pass and every pipeline built on it are tied to the format.
        if let Err(e) = ensure_same_format(self.targets.swapchain.format, swapchain.format) {
            unsafe { swapchain.destroy(self.gpu.device(), &self.surface.swapchain_loader) };
            return Err(e.into());
        }

        let mut old = std::mem::replace(&mut self.targets, RenderTargets::bare(swapchain));
        old.destroy(&self.gpu, &self.surface);

        self.targets
            .populate(&self.gpu, self.render_pass, self.depth_format)?;

        tracing::info!("Swapchain recreated: {}x{}", self.width(), self.height());

        Ok(())
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        if let Err(e) = self.gpu.wait_idle() {
            tracing::error!("Failed to wait idle: {e}");
        }

        unsafe {
            let device = self.gpu.device();

            for frame in self.frames.drain(..) {
                frame.destroy(device);
            }
            if let Some(pool) = self.upload_pool.take() {
                pool.destroy(device);
            }

            self.targets.destroy(&self.gpu, &self.surface);
            device.destroy_render_pass(self.render_pass, None);
            self.surface.destroy();
        }
    }
}
