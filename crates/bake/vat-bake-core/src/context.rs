//! Geometry evaluation seam.
//!
//! Hosts implement [`MeshSource`] for anything that can produce deformed
//! geometry over time. Each object gets its own [`EvaluationContext`], so
//! stepping one object's frames never disturbs another's pose state; the
//! context is destroyed by dropping it.

use thiserror::Error;

use crate::mesh::Mesh;

/// Failure reported by a host evaluation context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ContextError(pub String);

impl ContextError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Per-object pose state. Frames are set strictly in sampling order.
pub trait EvaluationContext {
    /// Advance the pose state to `frame`.
    fn set_time(&mut self, frame: i32) -> Result<(), ContextError>;

    /// World-space geometry at the current time.
    fn read_mesh(&mut self) -> Result<Mesh, ContextError>;
}

/// Anything that can create isolated evaluation contexts.
pub trait MeshSource {
    fn create_context(&self) -> Box<dyn EvaluationContext + '_>;
}
