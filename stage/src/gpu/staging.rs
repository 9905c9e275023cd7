use bytemuck::{Pod, Zeroable};

/// CPU-side mirror of a GPU buffer region.
///
/// The contents are only ever replaced wholesale, there is no partial update path.
pub struct StagingBuffer<T> {
    /// The mirrored elements
    pub elems: Vec<T>,
}

impl<T: Copy + Zeroable + Pod> StagingBuffer<T> {
    pub fn new(len: usize) -> Self {
        Self { elems: vec![T::zeroed(); len] }
    }

    pub fn from_slice(src: &[T]) -> Self {
        Self { elems: src.to_vec() }
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn size_in_bytes(&self) -> usize {
        std::mem::size_of_val(self.elems.as_slice())
    }

    /// Full overwrite, `src` must have exactly `len()` elements.
    pub fn copy_from(&mut self, src: &[T]) {
        assert_eq!(src.len(), self.elems.len(), "staging buffer length mismatch: {} != {}", src.len(), self.elems.len());
        self.elems.copy_from_slice(src);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.elems
    }

    pub fn as_u8_slice(&self) -> &[u8] {
        bytemuck::cast_slice(&self.elems)
    }
}
