//! Mesh viewer application implementation.

use std::mem::size_of;

use ash::vk;
use tracing::{info, warn};

use skel_app::{AppContext, CursorMode, FrameContext, KeyCode, SkelApp};
use skel_core::{
    spin_model_matrix, CameraUniforms, FlyCamera, MeshData, MeshPushConstants, MoveInput,
};
use skel_gpu::{
    write_uniform_buffer, DescriptorPool, DescriptorSetLayoutBuilder, GpuBuffer,
    GraphicsPipeline, GraphicsPipelineConfig, MemoryLocation,
};
use skel_input::apply_cursor_mode;

use crate::params::{MeshParams, MeshShape};

/// Half the edge length of the fallback cube.
const CUBE_HALF_EXTENT: f32 = 1.0;

#[allow(clippy::cast_possible_truncation)]
const PUSH_CONSTANTS_SIZE: u32 = size_of::<MeshPushConstants>() as u32;

const CAMERA_UNIFORMS_SIZE: u64 = size_of::<CameraUniforms>() as u64;

/// Camera buffer and the descriptor set pointing at it, one per frame in flight.
struct FrameResources {
    camera_buffer: GpuBuffer,
    descriptor_set: vk::DescriptorSet,
}

/// Vertex and index buffers for the uploaded mesh.
struct GpuMesh {
    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,
    index_count: u32,
}

/// Mesh viewer state.
pub struct MeshViewer {
    mesh: Option<GpuMesh>,
    pipeline: Option<GraphicsPipeline>,
    set_layout: vk::DescriptorSetLayout,
    descriptor_pool: Option<DescriptorPool>,
    frames: Vec<FrameResources>,
    camera: FlyCamera,
}

/// Build the mesh named by `params`, falling back to a cube if the OBJ can't be read.
fn load_mesh(params: &MeshParams) -> MeshData {
    match params.shape {
        MeshShape::Triangle => MeshData::triangle(),
        MeshShape::Cube => MeshData::cube(CUBE_HALF_EXTENT),
        MeshShape::Obj => MeshData::load_obj(&params.model).unwrap_or_else(|e| {
            warn!(
                "Failed to load {}: {e}; falling back to cube",
                params.model.display()
            );
            MeshData::cube(CUBE_HALF_EXTENT)
        }),
    }
}

impl GpuMesh {
    fn upload(ctx: &AppContext, mesh: &MeshData) -> anyhow::Result<Self> {
        let index_count = u32::try_from(mesh.indices.len())?;

        let vertex_buffer = ctx.upload_buffer(
            mesh.vertex_bytes(),
            vk::BufferUsageFlags::VERTEX_BUFFER,
            "mesh vertices",
        )?;
        let index_buffer = match ctx.upload_buffer(
            mesh.index_bytes(),
            vk::BufferUsageFlags::INDEX_BUFFER,
            "mesh indices",
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                let mut vertex_buffer = vertex_buffer;
                ctx.gpu.allocator().lock().free_buffer(&mut vertex_buffer)?;
                return Err(e);
            }
        };

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count,
        })
    }
}

impl SkelApp for MeshViewer {
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self> {
        let params = MeshParams::from_args();
        let data = load_mesh(&params);
        info!(
            "Mesh: {} vertices, {} triangles",
            data.vertices.len(),
            data.triangle_count()
        );

        let mut camera = FlyCamera::default();
        camera.camera.set_aspect(ctx.aspect_ratio());

        // Everything below lands in `viewer` as soon as it exists, so an
        // error part way through is cleaned up by `cleanup`.
        let mut viewer = Self {
            mesh: None,
            pipeline: None,
            set_layout: vk::DescriptorSetLayout::null(),
            descriptor_pool: None,
            frames: Vec::new(),
            camera,
        };

        if let Err(e) = viewer.create_resources(ctx, &data) {
            viewer.cleanup(ctx);
            return Err(e);
        }

        info!("Mesh viewer initialized");

        Ok(viewer)
    }

    fn update(&mut self, ctx: &mut AppContext, dt: f32) {
        if ctx.input.is_key_just_pressed(KeyCode::Tab) {
            let mode = ctx.input.cursor_mode().toggled();
            match apply_cursor_mode(&ctx.window, mode) {
                Ok(()) => ctx.input.set_cursor_mode(mode),
                Err(e) => warn!("Failed to set cursor mode {mode:?}: {e}"),
            }
        }

        if ctx.input.cursor_mode() == CursorMode::Locked {
            let delta = ctx.input.mouse_raw_delta();
            self.camera.rotate(delta.x, delta.y);
        }

        let movement = MoveInput {
            forward: ctx.input.axis(KeyCode::KeyW, KeyCode::KeyS),
            right: ctx.input.axis(KeyCode::KeyD, KeyCode::KeyA),
            up: ctx.input.axis(KeyCode::Space, KeyCode::ShiftLeft),
        };
        self.camera.translate(movement, dt);
    }

    fn render(&mut self, ctx: &AppContext, frame: &mut FrameContext) -> anyhow::Result<()> {
        let (Some(mesh), Some(pipeline)) = (&self.mesh, &self.pipeline) else {
            return Ok(());
        };
        let resources = &self.frames[frame.frame_index];

        // The slot's fence has signalled, so the GPU is done reading this buffer.
        resources
            .camera_buffer
            .write(&[self.camera.camera.uniforms()])?;

        let push = MeshPushConstants::new(spin_model_matrix(frame.frame_number));
        let device = ctx.gpu.device();
        let cmd = frame.command_buffer;

        unsafe {
            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);
            device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout,
                0,
                &[resources.descriptor_set],
                &[],
            );
            device.cmd_bind_vertex_buffers(cmd, 0, &[mesh.vertex_buffer.buffer], &[0]);
            device.cmd_bind_index_buffer(cmd, mesh.index_buffer.buffer, 0, vk::IndexType::UINT32);
            device.cmd_push_constants(
                cmd,
                pipeline.layout,
                vk::ShaderStageFlags::VERTEX,
                0,
                bytemuck::bytes_of(&push),
            );
            device.cmd_draw_indexed(cmd, mesh.index_count, 1, 0, 0, 0);
        }

        Ok(())
    }

    fn on_resize(&mut self, ctx: &mut AppContext, _width: u32, _height: u32) -> anyhow::Result<()> {
        self.camera.camera.set_aspect(ctx.aspect_ratio());
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut AppContext) {
        let device = ctx.gpu.device();
        let mut allocator = ctx.gpu.allocator().lock();

        unsafe {
            if let Some(pipeline) = self.pipeline.take() {
                pipeline.destroy(device);
            }
            // Frees the descriptor sets too.
            if let Some(pool) = self.descriptor_pool.take() {
                pool.destroy(device);
            }
            device.destroy_descriptor_set_layout(self.set_layout, None);
            self.set_layout = vk::DescriptorSetLayout::null();
        }

        let mut buffers: Vec<GpuBuffer> = self
            .frames
            .drain(..)
            .map(|frame| frame.camera_buffer)
            .collect();
        if let Some(mesh) = self.mesh.take() {
            buffers.push(mesh.vertex_buffer);
            buffers.push(mesh.index_buffer);
        }
        for mut buffer in buffers {
            if let Err(e) = allocator.free_buffer(&mut buffer) {
                warn!("Failed to free buffer: {e}");
            }
        }

        info!("Mesh viewer cleaned up");
    }
}

impl MeshViewer {
    fn create_resources(&mut self, ctx: &AppContext, data: &MeshData) -> anyhow::Result<()> {
        self.mesh = Some(GpuMesh::upload(ctx, data)?);

        let device = ctx.gpu.device();
        let frame_count = ctx.frames_in_flight();

        unsafe {
            self.set_layout = DescriptorSetLayoutBuilder::new()
                .uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
                .build(device)?;

            let pool = DescriptorPool::for_uniform_buffers(device, u32::try_from(frame_count)?)?;
            let layouts = vec![self.set_layout; frame_count];
            let sets = pool.allocate(device, &layouts);
            self.descriptor_pool = Some(pool);
            let sets = sets?;

            for (i, descriptor_set) in sets.into_iter().enumerate() {
                let camera_buffer = ctx.gpu.allocator().lock().create_buffer(
                    CAMERA_UNIFORMS_SIZE,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    MemoryLocation::CpuToGpu,
                    &format!("camera uniforms {i}"),
                )?;
                write_uniform_buffer(
                    device,
                    descriptor_set,
                    0,
                    camera_buffer.buffer,
                    0,
                    CAMERA_UNIFORMS_SIZE,
                );
                self.frames.push(FrameResources {
                    camera_buffer,
                    descriptor_set,
                });
            }

            let config = GraphicsPipelineConfig {
                vertex_shader: skel_shaders::mesh_vertex_shader().to_vec(),
                fragment_shader: skel_shaders::mesh_fragment_shader().to_vec(),
                ..Default::default()
            }
            .with_mesh_vertices();

            let push_range = vk::PushConstantRange::default()
                .stage_flags(vk::ShaderStageFlags::VERTEX)
                .offset(0)
                .size(PUSH_CONSTANTS_SIZE);

            self.pipeline = Some(GraphicsPipeline::new(
                device,
                &config,
                ctx.render_pass(),
                &[self.set_layout],
                &[push_range],
            )?);
        }

        info!("Mesh pipeline created with {frame_count} camera buffers");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn builtin_shapes() {
        let params = MeshParams {
            shape: MeshShape::Triangle,
            ..MeshParams::default()
        };
        assert_eq!(load_mesh(&params).triangle_count(), 1);

        let params = MeshParams {
            shape: MeshShape::Cube,
            ..MeshParams::default()
        };
        assert_eq!(load_mesh(&params).triangle_count(), 12);
    }

    #[test]
    fn missing_obj_falls_back_to_cube() {
        let params = MeshParams {
            shape: MeshShape::Obj,
            model: PathBuf::from("does/not/exist.obj"),
            vsync: false,
        };
        let mesh = load_mesh(&params);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
    }

    #[test]
    fn push_constants_fit_minimum_limit() {
        // vec4 + mat4; Vulkan guarantees at least 128 bytes of push constants.
        assert_eq!(PUSH_CONSTANTS_SIZE, 80);
        assert_eq!(CAMERA_UNIFORMS_SIZE, 3 * 64);
    }
}
