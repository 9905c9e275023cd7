use crate::error::{Error, Result};
use crate::math::*;
use crate::mesh::*;

/// Deduplicated, GPU-ready geometry. Immutable once built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Checks that every index is in range and that indices form whole triangles.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(Error::MalformedGeometry {
                line: 0,
                reason: format!("index count {} is not a multiple of 3", indices.len()),
            });
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(Error::MalformedGeometry {
                line: 0,
                reason: format!("index {} out of range for {} vertices", bad, vertices.len()),
            });
        }
        Ok(Self { vertices, indices })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex buffer contents, `VERTEX_STRIDE` bytes per vertex.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Element buffer contents, one native-endian u32 per triangle corner.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// The flat float array, 8 floats per vertex.
    pub fn interleaved(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn aabb(&self) -> AABB {
        AABB::from_points(self.vertices.iter().map(|v| v.position))
    }
}
