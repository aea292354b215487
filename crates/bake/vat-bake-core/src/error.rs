//! Error types for the VAT bake engine

use serde::{Deserialize, Serialize};

/// Every fatal condition a bake can hit. Any of these aborts the whole bake;
/// partially filled buffers are discarded.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum BakeError {
    /// Frame resolution produced fewer than two frames
    #[error("{count} frames detected: too few frames to bake or no animation data found from NLA track(s)")]
    TooFewFrames { count: usize },

    /// Frame step must be strictly positive
    #[error("Invalid frame step: {step}")]
    InvalidFrameStep { step: i32 },

    /// Any other rejected configuration value
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Empty selection or no vertices to bake
    #[error("Nothing to bake: {reason}")]
    NothingToBake { reason: String },

    /// Two source objects retargeted onto the same mesh
    #[error("Remapping multiple source objects to the same target is unsupported: {object} retargeted to {target} which is already targeted")]
    DuplicateTarget { object: String, target: String },

    /// Mesh sequence members disagree on vertex count
    #[error("{mesh} has {found} vertices whereas {expected} were last counted. Mesh sequence must have same vertex count & order")]
    SequenceVertexCount {
        mesh: String,
        found: usize,
        expected: usize,
    },

    /// Data does not fit in the configured maximum texture size
    #[error("Cannot fit data: texture {axis} {size} exceeds maximum of {max}")]
    LayoutOverflow {
        axis: String,
        size: usize,
        max: usize,
    },

    /// The evaluated mesh changed topology during the animation
    #[error("Vertex count mismatch in frame {frame} for object {object}: {found} vertices, {expected} expected. It likely has a modifier that changes its topology during animation")]
    VertexCountMismatch {
        object: String,
        frame: i32,
        found: usize,
        expected: usize,
    },

    /// A retargeting source changed its face count during the animation
    #[error("Face count mismatch in frame {frame} for object {object}: {found} faces, {expected} expected")]
    FaceCountMismatch {
        object: String,
        frame: i32,
        found: usize,
        expected: usize,
    },

    /// A face references a vertex the mesh does not have
    #[error("Face {face} references vertex {vertex} but mesh only has {vertex_count} vertices")]
    InvalidFace {
        face: usize,
        vertex: u32,
        vertex_count: usize,
    },

    /// The host evaluation context failed to produce geometry
    #[error("Evaluation failed for object {object} at frame {frame}: {reason}")]
    Evaluation {
        object: String,
        frame: i32,
        reason: String,
    },

    /// JSON import/export error
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl BakeError {
    /// Shorthand for [`BakeError::InvalidConfig`].
    pub fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Error category for logging and reports
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::TooFewFrames { .. }
            | Self::InvalidFrameStep { .. }
            | Self::InvalidConfig { .. }
            | Self::NothingToBake { .. }
            | Self::DuplicateTarget { .. }
            | Self::SequenceVertexCount { .. }
            | Self::LayoutOverflow { .. } => "configuration",
            Self::VertexCountMismatch { .. } | Self::FaceCountMismatch { .. } => "topology",
            Self::InvalidFace { .. } => "geometry",
            Self::Evaluation { .. } => "evaluation",
            Self::Serialization { .. } => "serialization",
        }
    }

    /// Configuration errors are detected before any sampling work starts.
    #[inline]
    pub fn is_configuration(&self) -> bool {
        self.category() == "configuration"
    }
}

/// Result alias used across the bake engine
pub type Result<T> = core::result::Result<T, BakeError>;

impl From<serde_json::Error> for BakeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
