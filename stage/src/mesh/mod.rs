pub mod data;
pub mod obj;
pub mod vertex;

pub use data::*;
pub use vertex::*;
