//! Core types shared by the Skel GPU layer and demos.
//!
//! Nothing in here touches Vulkan:
//! - Mesh data (vertex layout, built-in shapes, OBJ loading)
//! - Cameras and the uniform/push-constant blocks fed to shaders
//! - Frame timing
//! - File and SPIR-V loading

pub mod camera;
pub mod error;
pub mod fs;
pub mod mesh;
pub mod timer;

pub use camera::{
    spin_model_matrix, Camera, CameraUniforms, FlyCamera, MeshPushConstants, MoveInput,
};
pub use error::{Error, Result};
pub use mesh::{MeshData, Vertex, VertexAttribute};
pub use timer::{FrameStats, Timer};
