pub mod block;
pub mod hierarchy;
pub mod particles;
pub mod transform;

pub use block::*;
pub use hierarchy::*;
pub use particles::*;
pub use transform::*;
