//! Graphics pipeline creation.

use crate::error::{GpuError, Result};
use ash::vk;
use skel_core::mesh::Vertex;

/// Create a shader module from SPIR-V words.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_shader_module(device: &ash::Device, code: &[u32]) -> Result<vk::ShaderModule> {
    if code.is_empty() {
        return Err(GpuError::ShaderModule("empty SPIR-V".to_string()));
    }
    let info = vk::ShaderModuleCreateInfo::default().code(code);
    device
        .create_shader_module(&info, None)
        .map_err(|e| GpuError::ShaderModule(e.to_string()))
}

/// Vertex input layout for [`Vertex`]: one per-vertex binding at slot 0.
pub fn vertex_input_description() -> (
    Vec<vk::VertexInputBindingDescription>,
    Vec<vk::VertexInputAttributeDescription>,
) {
    let bindings = vec![vk::VertexInputBindingDescription::default()
        .binding(0)
        .stride(Vertex::STRIDE)
        .input_rate(vk::VertexInputRate::VERTEX)];

    let attributes = Vertex::ATTRIBUTES
        .iter()
        .map(|attribute| {
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(attribute.location)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(attribute.offset)
        })
        .collect();

    (bindings, attributes)
}

/// Graphics pipeline configuration.
#[derive(Clone)]
pub struct GraphicsPipelineConfig {
    pub vertex_shader: Vec<u32>,
    pub fragment_shader: Vec<u32>,
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub topology: vk::PrimitiveTopology,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare_op: vk::CompareOp,
}

impl Default for GraphicsPipelineConfig {
    fn default() -> Self {
        Self {
            vertex_shader: Vec::new(),
            fragment_shader: Vec::new(),
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::NONE,
            front_face: vk::FrontFace::CLOCKWISE,
            depth_test: true,
            depth_write: true,
            depth_compare_op: vk::CompareOp::LESS_OR_EQUAL,
        }
    }
}

impl GraphicsPipelineConfig {
    /// Configuration for shaders that fetch [`Vertex`] data from binding 0.
    pub fn with_mesh_vertices(mut self) -> Self {
        let (bindings, attributes) = vertex_input_description();
        self.vertex_bindings = bindings;
        self.vertex_attributes = attributes;
        self
    }

    /// Disable depth testing and writes, for passes without a depth attachment.
    pub fn without_depth(mut self) -> Self {
        self.depth_test = false;
        self.depth_write = false;
        self
    }
}

/// Graphics pipeline wrapper.
pub struct GraphicsPipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Create a graphics pipeline for subpass 0 of `render_pass`.
    ///
    /// Viewport and scissor are dynamic state.
    ///
    /// # Safety
    /// The device and render pass must be valid.
    pub unsafe fn new(
        device: &ash::Device,
        config: &GraphicsPipelineConfig,
        render_pass: vk::RenderPass,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
    ) -> Result<Self> {
        let vert_module = create_shader_module(device, &config.vertex_shader)
            .map_err(|e| GpuError::ShaderModule(format!("Vertex: {e}")))?;
        let frag_module = match create_shader_module(device, &config.fragment_shader) {
            Ok(module) => module,
            Err(e) => {
                device.destroy_shader_module(vert_module, None);
                return Err(GpuError::ShaderModule(format!("Fragment: {e}")));
            }
        };

        let result = build_pipeline(
            device,
            config,
            render_pass,
            vert_module,
            frag_module,
            descriptor_set_layouts,
            push_constant_ranges,
        );

        // Modules are only needed during pipeline creation.
        device.destroy_shader_module(vert_module, None);
        device.destroy_shader_module(frag_module, None);

        result
    }

    /// Destroy the pipeline.
    ///
    /// # Safety
    /// The device must be valid and the pipeline must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_pipeline(self.pipeline, None);
        device.destroy_pipeline_layout(self.layout, None);
    }
}

#[allow(clippy::too_many_arguments)]
unsafe fn build_pipeline(
    device: &ash::Device,
    config: &GraphicsPipelineConfig,
    render_pass: vk::RenderPass,
    vert_module: vk::ShaderModule,
    frag_module: vk::ShaderModule,
    descriptor_set_layouts: &[vk::DescriptorSetLayout],
    push_constant_ranges: &[vk::PushConstantRange],
) -> Result<GraphicsPipeline> {
    let shader_stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vert_module)
            .name(c"main"),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(frag_module)
            .name(c"main"),
    ];

    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&config.vertex_bindings)
        .vertex_attribute_descriptions(&config.vertex_attributes);

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(config.topology)
        .primitive_restart_enable(false);

    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);

    let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(config.polygon_mode)
        .cull_mode(config.cull_mode)
        .front_face(config.front_face)
        .depth_bias_enable(false)
        .line_width(1.0);

    let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1)
        .sample_shading_enable(false)
        .min_sample_shading(1.0);

    let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(config.depth_test)
        .depth_write_enable(config.depth_write)
        .depth_compare_op(if config.depth_test {
            config.depth_compare_op
        } else {
            vk::CompareOp::ALWAYS
        })
        .depth_bounds_test_enable(false)
        .min_depth_bounds(0.0)
        .max_depth_bounds(1.0)
        .stencil_test_enable(false);

    let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(false)
        .color_write_mask(vk::ColorComponentFlags::RGBA)];

    let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .logic_op(vk::LogicOp::COPY)
        .attachments(&color_blend_attachments);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state =
        vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let layout_info = vk::PipelineLayoutCreateInfo::default()
        .set_layouts(descriptor_set_layouts)
        .push_constant_ranges(push_constant_ranges);

    let layout = device
        .create_pipeline_layout(&layout_info, None)
        .map_err(|e| GpuError::PipelineCreation(e.to_string()))?;

    let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization)
        .multisample_state(&multisampling)
        .depth_stencil_state(&depth_stencil)
        .color_blend_state(&color_blending)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    let pipelines = match device.create_graphics_pipelines(
        vk::PipelineCache::null(),
        &[pipeline_info],
        None,
    ) {
        Ok(pipelines) => pipelines,
        Err((_, e)) => {
            device.destroy_pipeline_layout(layout, None);
            return Err(GpuError::PipelineCreation(e.to_string()));
        }
    };

    let pipeline = pipelines.first().copied().ok_or_else(|| {
        device.destroy_pipeline_layout(layout, None);
        GpuError::PipelineCreation("driver returned no pipeline".to_string())
    })?;

    Ok(GraphicsPipeline { pipeline, layout })
}

/// Record the full-extent viewport and scissor used with the dynamic state above.
///
/// # Safety
/// `cmd` must be in the recording state.
pub unsafe fn set_viewport_and_scissor(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    extent: vk::Extent2D,
) {
    let (viewport, scissor) = full_viewport(extent);
    device.cmd_set_viewport(cmd, 0, &[viewport]);
    device.cmd_set_scissor(cmd, 0, &[scissor]);
}

fn full_viewport(extent: vk::Extent2D) -> (vk::Viewport, vk::Rect2D) {
    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };
    let scissor = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    };
    (viewport, scissor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_description_matches_layout() {
        let (bindings, attributes) = vertex_input_description();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].stride, 36);
        assert_eq!(bindings[0].input_rate, vk::VertexInputRate::VERTEX);

        let offsets: Vec<_> = attributes.iter().map(|a| (a.location, a.offset)).collect();
        assert_eq!(offsets, vec![(0, 0), (1, 12), (2, 24)]);
        assert!(attributes
            .iter()
            .all(|a| a.format == vk::Format::R32G32B32_SFLOAT));
    }

    #[test]
    fn default_config_draws_both_faces() {
        let config = GraphicsPipelineConfig::default();
        assert_eq!(config.cull_mode, vk::CullModeFlags::NONE);
        assert_eq!(config.front_face, vk::FrontFace::CLOCKWISE);
        assert_eq!(config.depth_compare_op, vk::CompareOp::LESS_OR_EQUAL);
        assert!(config.vertex_bindings.is_empty());
    }

    #[test]
    fn config_helpers() {
        let config = GraphicsPipelineConfig::default()
            .with_mesh_vertices()
            .without_depth();
        assert_eq!(config.vertex_attributes.len(), 3);
        assert!(!config.depth_test && !config.depth_write);
    }

    #[test]
    fn viewport_covers_extent() {
        let (viewport, scissor) = full_viewport(vk::Extent2D {
            width: 1600,
            height: 900,
        });
        assert_eq!((viewport.width, viewport.height), (1600.0, 900.0));
        assert_eq!(viewport.max_depth, 1.0);
        assert_eq!(scissor.extent.width, 1600);
        assert_eq!(scissor.offset.x, 0);
    }
}
