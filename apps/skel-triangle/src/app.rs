//! Triangle application implementation.

use ash::vk;
use tracing::info;

use skel_app::{AppContext, FrameContext, SkelApp};
use skel_gpu::{GraphicsPipeline, GraphicsPipelineConfig};

/// Draws the shader's built-in triangle.
pub struct Triangle {
    pipeline: Option<GraphicsPipeline>,
}

impl SkelApp for Triangle {
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self> {
        let config = GraphicsPipelineConfig {
            vertex_shader: skel_shaders::triangle_vertex_shader().to_vec(),
            fragment_shader: skel_shaders::triangle_fragment_shader().to_vec(),
            ..Default::default()
        }
        .without_depth();

        let pipeline =
            unsafe { GraphicsPipeline::new(ctx.gpu.device(), &config, ctx.render_pass(), &[], &[])? };

        info!("Triangle pipeline created");

        Ok(Self {
            pipeline: Some(pipeline),
        })
    }

    fn update(&mut self, _ctx: &mut AppContext, _dt: f32) {}

    fn render(&mut self, ctx: &AppContext, frame: &mut FrameContext) -> anyhow::Result<()> {
        let Some(pipeline) = &self.pipeline else {
            return Ok(());
        };

        let device = ctx.gpu.device();
        unsafe {
            device.cmd_bind_pipeline(
                frame.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.pipeline,
            );
            device.cmd_draw(frame.command_buffer, 3, 1, 0, 0);
        }

        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut AppContext) {
        if let Some(pipeline) = self.pipeline.take() {
            unsafe { pipeline.destroy(ctx.gpu.device()) };
        }
    }
}
