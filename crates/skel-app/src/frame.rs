//! Per-frame context for rendering.

use ash::vk;

/// The frame being recorded.
pub struct FrameContext {
    /// Command buffer, inside the frame's render pass.
    pub command_buffer: vk::CommandBuffer,
    /// Index of the acquired swapchain image.
    pub image_index: u32,
    /// Framebuffer for the acquired image.
    pub framebuffer: vk::Framebuffer,
    /// Render area.
    pub extent: vk::Extent2D,
    /// Frame-in-flight slot. Use it to pick per-frame buffers and descriptor sets.
    pub frame_index: usize,
    /// Frames rendered before this one.
    pub frame_number: u64,
    /// Seconds since the previous frame.
    pub dt: f32,
}

impl FrameContext {
    pub(crate) const fn new(
        command_buffer: vk::CommandBuffer,
        image_index: u32,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        frame_index: usize,
        frame_number: u64,
        dt: f32,
    ) -> Self {
        Self {
            command_buffer,
            image_index,
            framebuffer,
            extent,
            frame_index,
            frame_number,
            dt,
        }
    }
}
