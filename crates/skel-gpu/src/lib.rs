//! Thin Vulkan helpers shared by the Skel demos.
//!
//! This crate provides:
//! - Instance, debug messenger and device creation
//! - GPU capability detection
//! - Memory allocation via gpu-allocator, with staged uploads
//! - Command pool, submission and synchronization helpers
//! - Surface, swapchain, render pass and graphics pipeline setup

pub mod barrier;
pub mod capabilities;
pub mod command;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod instance;
pub mod memory;
pub mod pipeline;
pub mod render_pass;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use barrier::{read_access_for_usage, set_buffer_memory_barrier, BufferTransition};
pub use capabilities::{GpuCapabilities, GpuVendor};
pub use command::{
    begin_command_buffer, end_command_buffer, execute_single_time_commands, reset_command_buffer,
    submit_command_buffers, synchronize_two_command_buffers, CommandPool, WaitSemaphoreInfo,
};
pub use context::{GpuContext, GpuContextBuilder};
pub use descriptors::{write_uniform_buffer, DescriptorPool, DescriptorSetLayoutBuilder};
pub use error::{GpuError, Result};
pub use memory::{GpuAllocator, GpuBuffer, GpuImage};
pub use pipeline::{
    create_shader_module, set_viewport_and_scissor, vertex_input_description, GraphicsPipeline,
    GraphicsPipelineConfig,
};
pub use render_pass::{
    clear_values, create_framebuffers, create_render_pass, destroy_framebuffers, DepthBuffer,
    DEFAULT_DEPTH_FORMAT,
};
pub use surface::{SurfaceCapabilities, SurfaceContext};
pub use swapchain::Swapchain;
pub use sync::{
    create_fence, create_semaphore, FrameRing, FrameSync, FRAME_FENCE_TIMEOUT_NS,
};

pub use gpu_allocator::MemoryLocation;
