use crate::math::*;
use bytemuck::{Pod, Zeroable};

/// Size of one interleaved vertex, in bytes.
pub const VERTEX_STRIDE: usize = std::mem::size_of::<Vertex>();
/// Number of floats per interleaved vertex.
pub const VERTEX_FLOATS: usize = VERTEX_STRIDE / std::mem::size_of::<f32>();
pub const POSITION_OFFSET: usize = std::mem::offset_of!(Vertex, position);
pub const TEX_COORD_OFFSET: usize = std::mem::offset_of!(Vertex, tex_coord);
pub const NORMAL_OFFSET: usize = std::mem::offset_of!(Vertex, normal);

/// Interleaved `[pos.xyz, uv, norm.xyz]`, the layout the mesh shaders declare.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub tex_coord: Vec2,
    pub normal: Vec3,
}

impl Vertex {
    pub const fn new(position: Vec3, tex_coord: Vec2, normal: Vec3) -> Self {
        Self { position, tex_coord, normal }
    }

    pub fn to_array(self) -> [f32; VERTEX_FLOATS] {
        bytemuck::cast(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(VERTEX_STRIDE, 32);
        assert_eq!(VERTEX_FLOATS, 8);
        assert_eq!(POSITION_OFFSET, 0);
        assert_eq!(TEX_COORD_OFFSET, 12);
        assert_eq!(NORMAL_OFFSET, 20);
    }

    #[test]
    fn test_to_array() {
        let v = Vertex::new(Vec3::new(1.0, 2.0, 3.0), Vec2::new(0.25, 0.75), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(v.to_array(), [1.0, 2.0, 3.0, 0.25, 0.75, 0.0, 0.0, 1.0]);
    }
}
