use thiserror::Error;

use crate::scene::TransformId;

/// Everything that can go wrong in the scene pipeline. All failures are
/// deterministic, retrying the same call fails the same way.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Unparseable face, bad reference or out-of-range attribute index
    #[error("malformed geometry at line {line}: {reason}")]
    MalformedGeometry { line: usize, reason: String },

    /// Self-parenting, a parent cycle or removal of a node that still has children
    #[error("invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// The handle refers to a transform that has been removed
    #[error("stale transform handle {0:?}")]
    StaleHandle(TransformId),

    /// A particle system needs at least one slot
    #[error("particle system capacity must be non-zero")]
    InvalidCapacity,
}

pub type Result<T> = std::result::Result<T, Error>;
