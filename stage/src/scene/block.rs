use crate::math::*;
use bytemuck::{Pod, Zeroable};

/// Size of the `perModel` uniform block, in bytes.
pub const PER_MODEL_BLOCK_SIZE: usize = std::mem::size_of::<PerModelBlock>();

/// Per-object uniform data: model matrix, its inverse transpose for normals, and a tint.
///
/// Matrices are stored column-major as GLSL `std140` expects.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PerModelBlock {
    pub model: [f32; 16],
    pub inv_trans_model: [f32; 16],
    pub color: Vec4,
}

impl PerModelBlock {
    pub fn new(world: &Mat44, color: Vec4) -> Self {
        Self {
            model: world.to_cols_array(),
            inv_trans_model: world.inverse().transposed().to_cols_array(),
            color,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for PerModelBlock {
    fn default() -> Self {
        Self::new(&Mat44::identity(), Vec4::new(1.0, 1.0, 1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_size() {
        assert_eq!(PER_MODEL_BLOCK_SIZE, 144);
        assert_eq!(PerModelBlock::default().as_bytes().len(), 144);
    }

    #[test]
    fn test_model_is_column_major() {
        let block = PerModelBlock::new(&Mat44::translate(Vec3::new(1.0, 2.0, 3.0)), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(&block.model[12..16], &[1.0, 2.0, 3.0, 1.0]);
        let bytes = block.as_bytes();
        assert_eq!(&bytes[48..52], &1.0f32.to_ne_bytes());
        assert_eq!(&bytes[128..132], &1.0f32.to_ne_bytes());
    }

    #[test]
    fn test_inverse_transpose_of_scale() {
        let block = PerModelBlock::new(&Mat44::scale_non_uniform(Vec3::new(2.0, 4.0, 1.0)), Vec4::default());
        assert_eq!(block.inv_trans_model[0], 0.5);
        assert_eq!(block.inv_trans_model[5], 0.25);
        assert_eq!(block.inv_trans_model[10], 1.0);
    }
}
