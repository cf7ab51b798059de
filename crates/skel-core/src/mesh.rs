//! CPU-side mesh data.

use std::mem::{offset_of, size_of};
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::error::{Error, Result};

/// Interleaved vertex consumed by the mesh pipeline.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub color: Vec3,
}

/// A single vertex attribute: shader location and byte offset within [`Vertex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub offset: u32,
}

impl Vertex {
    /// Byte stride of one vertex.
    #[allow(clippy::cast_possible_truncation)]
    pub const STRIDE: u32 = size_of::<Self>() as u32;

    /// Attribute layout for binding 0. Every attribute is three 32-bit floats.
    #[allow(clippy::cast_possible_truncation)]
    pub const ATTRIBUTES: [VertexAttribute; 3] = [
        VertexAttribute {
            location: 0,
            offset: offset_of!(Self, position) as u32,
        },
        VertexAttribute {
            location: 1,
            offset: offset_of!(Self, normal) as u32,
        },
        VertexAttribute {
            location: 2,
            offset: offset_of!(Self, color) as u32,
        },
    ];

    #[must_use]
    pub const fn new(position: Vec3, normal: Vec3, color: Vec3) -> Self {
        Self {
            position,
            normal,
            color,
        }
    }
}

/// Vertices plus a triangle-list index buffer.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// The classic RGB triangle, facing +Z.
    #[must_use]
    pub fn triangle() -> Self {
        let normal = Vec3::Z;
        Self {
            vertices: vec![
                Vertex::new(Vec3::new(0.5, 0.5, 0.0), normal, Vec3::X),
                Vertex::new(Vec3::new(-0.5, 0.5, 0.0), normal, Vec3::Y),
                Vertex::new(Vec3::new(0.0, -0.5, 0.0), normal, Vec3::Z),
            ],
            indices: vec![0, 1, 2],
        }
    }

    /// An axis-aligned cube centred on the origin with flat per-face normals.
    #[must_use]
    pub fn cube(half_extent: f32) -> Self {
        // (normal, u, v) with u x v == normal so every face winds counter-clockwise
        // when seen from outside.
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in faces {
            #[allow(clippy::cast_possible_truncation)]
            let base = vertices.len() as u32;
            let color = normal * 0.5 + Vec3::splat(0.5);
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let position = (normal + u * su + v * sv) * half_extent;
                vertices.push(Vertex::new(position, normal, color));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { vertices, indices }
    }

    /// Load every model in an OBJ file into one mesh.
    ///
    /// Vertex colours are set to the normal. Models without normals get +Y.
    pub fn load_obj(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }

        let (models, _materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)?;
        let mesh = Self::from_models(&models)?;

        tracing::debug!(
            "Loaded {} ({} models, {} vertices, {} triangles)",
            path.display(),
            models.len(),
            mesh.vertices.len(),
            mesh.triangle_count()
        );

        Ok(mesh)
    }

    /// Merge already-parsed OBJ models.
    pub fn from_models(models: &[tobj::Model]) -> Result<Self> {
        let mut mesh = Self::default();

        for model in models {
            let source = &model.mesh;
            if source.positions.len() % 3 != 0 {
                return Err(Error::InvalidData(format!(
                    "model '{}' has a truncated position array",
                    model.name
                )));
            }

            let vertex_count = source.positions.len() / 3;
            let has_normals = source.normals.len() == source.positions.len();
            let base = u32::try_from(mesh.vertices.len())
                .map_err(|_| Error::InvalidData("mesh exceeds u32 index range".to_string()))?;

            mesh.vertices.extend((0..vertex_count).map(|i| {
                let position = Vec3::from_slice(&source.positions[i * 3..i * 3 + 3]);
                let normal = if has_normals {
                    Vec3::from_slice(&source.normals[i * 3..i * 3 + 3])
                } else {
                    Vec3::Y
                };
                Vertex::new(position, normal, normal)
            }));

            for &index in &source.indices {
                if index as usize >= vertex_count {
                    return Err(Error::InvalidData(format!(
                        "model '{}' index {index} out of range",
                        model.name
                    )));
                }
                mesh.indices.push(base + index);
            }
        }

        if mesh.vertices.is_empty() {
            return Err(Error::InvalidData("OBJ contains no geometry".to_string()));
        }

        Ok(mesh)
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn vertex_layout() {
        assert_eq!(Vertex::STRIDE, 36);
        let offsets: Vec<u32> = Vertex::ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
        let locations: Vec<u32> = Vertex::ATTRIBUTES.iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![0, 1, 2]);
    }

    #[test]
    fn triangle_colors() {
        let mesh = MeshData::triangle();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[0].color, Vec3::X);
        assert_eq!(mesh.vertices[1].color, Vec3::Y);
        assert_eq!(mesh.vertices[2].color, Vec3::Z);
        assert_eq!(mesh.vertex_bytes().len(), 3 * 36);
    }

    #[test]
    fn cube_counts_and_winding() {
        let mesh = MeshData::cube(1.0);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert_eq!(mesh.index_bytes().len(), 36 * 4);

        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize]);
            let geometric = (b.position - a.position).cross(c.position - a.position);
            assert!(geometric.dot(a.normal) > 0.0, "face wound clockwise");
        }

        for v in &mesh.vertices {
            assert_relative_eq!(v.position.abs().max_element(), 1.0);
        }
    }

    #[test]
    fn cube_scales_with_half_extent() {
        let mesh = MeshData::cube(0.25);
        for v in &mesh.vertices {
            assert_relative_eq!(v.position.abs().max_element(), 0.25);
        }
    }

    #[test]
    fn obj_colors_follow_normals() {
        let obj = "\
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1 4//1
o tri
v 0 0 1
v 1 0 1
v 0 1 1
f 5 6 7
";
        let path = std::env::temp_dir().join(format!("skel-core-mesh-{}.obj", std::process::id()));
        std::fs::write(&path, obj).unwrap();
        let mesh = MeshData::load_obj(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        // Quad triangulates to two triangles, plus one from the second model.
        assert_eq!(mesh.triangle_count(), 3);
        assert_eq!(mesh.vertices.len(), 7);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));

        assert_eq!(mesh.vertices[0].normal, Vec3::Z);
        assert_eq!(mesh.vertices[0].color, Vec3::Z);
        assert_eq!(mesh.vertices[6].normal, Vec3::Y);
        // Second model indices are rebased past the first model's vertices.
        assert!(mesh.indices[6..].iter().all(|&i| i >= 4));
    }

    #[test]
    fn missing_obj_is_not_found() {
        let err = MeshData::load_obj("no/such/model.obj").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn empty_models_rejected() {
        assert!(matches!(
            MeshData::from_models(&[]),
            Err(Error::InvalidData(_))
        ));
    }
}
