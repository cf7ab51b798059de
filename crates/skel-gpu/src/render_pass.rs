//! Render pass, depth buffer and framebuffers for presenting to a swapchain.

use crate::error::Result;
use crate::memory::{GpuAllocator, GpuImage};
use ash::vk;
use gpu_allocator::MemoryLocation;

/// Depth format used by the demos.
pub const DEFAULT_DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Create a single-subpass render pass that clears the colour attachment and
/// leaves it ready to present.
///
/// With a `depth_format` a second attachment is cleared and discarded after
/// the pass.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_render_pass(
    device: &ash::Device,
    color_format: vk::Format,
    depth_format: Option<vk::Format>,
) -> Result<vk::RenderPass> {
    let mut attachments = vec![vk::AttachmentDescription::default()
        .format(color_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)];

    let color_ref = [vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
    let depth_ref = vk::AttachmentReference::default()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_ref);

    let mut src_stage = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
    let mut dst_stage = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
    let mut dst_access = vk::AccessFlags::COLOR_ATTACHMENT_WRITE;

    if let Some(depth_format) = depth_format {
        attachments.push(
            vk::AttachmentDescription::default()
                .format(depth_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        );
        subpass = subpass.depth_stencil_attachment(&depth_ref);

        // The depth image is shared by all frames in flight.
        src_stage |= vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
        dst_stage |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
        dst_access |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    }

    let dependencies = [vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(src_stage)
        .dst_stage_mask(dst_stage)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_access_mask(dst_access)];

    let subpasses = [subpass];
    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    let render_pass = device.create_render_pass(&create_info, None)?;
    Ok(render_pass)
}

/// A depth attachment sized to the swapchain.
pub struct DepthBuffer {
    pub image: GpuImage,
    pub view: vk::ImageView,
}

impl DepthBuffer {
    /// Allocate a depth image and its view.
    ///
    /// # Safety
    /// The device must be the one the allocator was created with.
    pub unsafe fn new(
        allocator: &mut GpuAllocator,
        device: &ash::Device,
        extent: vk::Extent2D,
        format: vk::Format,
    ) -> Result<Self> {
        let create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let mut image = allocator.create_image(&create_info, MemoryLocation::GpuOnly, "depth")?;

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::DEPTH)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let view = match device.create_image_view(&view_info, None) {
            Ok(view) => view,
            Err(e) => {
                allocator.free_image(&mut image)?;
                return Err(e.into());
            }
        };

        Ok(Self { image, view })
    }

    /// Destroy the view and free the image.
    ///
    /// # Safety
    /// The depth buffer must not be in use.
    pub unsafe fn destroy(&mut self, allocator: &mut GpuAllocator, device: &ash::Device) -> Result<()> {
        device.destroy_image_view(self.view, None);
        self.view = vk::ImageView::null();
        allocator.free_image(&mut self.image)
    }
}

/// Create one framebuffer per swapchain image view, each sharing `depth_view`
/// when given.
///
/// # Safety
/// The device, render pass and views must be valid.
pub unsafe fn create_framebuffers(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    color_views: &[vk::ImageView],
    depth_view: Option<vk::ImageView>,
    extent: vk::Extent2D,
) -> Result<Vec<vk::Framebuffer>> {
    let mut framebuffers = Vec::with_capacity(color_views.len());

    for &color_view in color_views {
        let attachments = framebuffer_attachments(color_view, depth_view);
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        match device.create_framebuffer(&create_info, None) {
            Ok(framebuffer) => framebuffers.push(framebuffer),
            Err(e) => {
                destroy_framebuffers(device, &framebuffers);
                return Err(e.into());
            }
        }
    }

    Ok(framebuffers)
}

/// Destroy framebuffers.
///
/// # Safety
/// The framebuffers must not be in use.
pub unsafe fn destroy_framebuffers(device: &ash::Device, framebuffers: &[vk::Framebuffer]) {
    for &framebuffer in framebuffers {
        device.destroy_framebuffer(framebuffer, None);
    }
}

fn framebuffer_attachments(
    color_view: vk::ImageView,
    depth_view: Option<vk::ImageView>,
) -> Vec<vk::ImageView> {
    std::iter::once(color_view).chain(depth_view).collect()
}

/// Clear values matching the attachments of [`create_render_pass`].
pub fn clear_values(color: [f32; 4], with_depth: bool) -> Vec<vk::ClearValue> {
    let mut values = vec![vk::ClearValue {
        color: vk::ClearColorValue { float32: color },
    }];
    if with_depth {
        values.push(vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        });
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn attachments_order_color_then_depth() {
        let color = vk::ImageView::from_raw(1);
        let depth = vk::ImageView::from_raw(2);
        assert_eq!(framebuffer_attachments(color, Some(depth)), vec![color, depth]);
        assert_eq!(framebuffer_attachments(color, None), vec![color]);
    }

    #[test]
    fn clear_values_match_attachments() {
        let values = clear_values([0.0, 0.2, 1.0, 1.0], true);
        assert_eq!(values.len(), 2);
        unsafe {
            assert_eq!(values[0].color.float32, [0.0, 0.2, 1.0, 1.0]);
            assert_eq!(values[1].depth_stencil.depth, 1.0);
        }
        assert_eq!(clear_values([0.0; 4], false).len(), 1);
    }
}
