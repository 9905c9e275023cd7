pub mod aabb;
pub mod dot;
pub mod mat44;
pub mod quat;
pub mod vec2;
pub mod vec3;
pub mod vec4;

pub use aabb::*;
pub use dot::*;
pub use mat44::*;
pub use quat::*;
pub use vec2::*;
pub use vec3::*;
pub use vec4::*;
