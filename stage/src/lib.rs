//! Scene pipeline: OBJ-style mesh import with vertex deduplication,
//! hierarchical transform composition and ring-buffer particle emitters.
//!
//! Everything here is single-threaded and frame-stepped. The caller owns
//! the frame loop: update the [`scene::Hierarchy`] first, then the
//! [`scene::ParticleSet`], then hand the byte views to the GPU.

pub mod error;
pub mod gpu;
pub mod math;
pub mod mesh;
pub mod scene;

pub use error::{Error, Result};
