//! VAT Bake Core (engine-agnostic)
//!
//! Bakes per-vertex mesh deformation over a run of animation frames into two
//! flat RGBA float buffers (offsets and normals) plus the layout, bounds, UVs
//! and report a runtime decoder needs to play them back.
//!
//! Pipeline: [`frames`] → [`layout`] → [`correspondence`] (once per
//! retargeted object) → [`sampler`] → [`encoder`]. [`bake::bake`] runs it end
//! to end.

pub mod bake;
pub mod bounds;
pub mod bvh;
pub mod config;
pub mod context;
pub mod correspondence;
pub mod encoder;
pub mod error;
pub mod frames;
pub mod layout;
pub mod mesh;
pub mod report;
pub mod sampler;
pub mod scene;
pub mod uv;

/// World-space vector used throughout the crate.
pub type Vec3 = nalgebra::Vector3<f32>;

// Re-exports for consumers (adapters)
pub use bake::{bake, BakeOutput, BakeStatus};
pub use bounds::Bounds;
pub use bvh::{Nearest, TriangleBvh};
pub use config::{
    BakeConfig, BakeMode, EncodeConfig, FrameConfig, FrameRange, LayoutConfig, PaddingMode,
    TransformConfig,
};
pub use context::{ContextError, EvaluationContext, MeshSource};
pub use correspondence::{CorrespondenceTable, VertexCorrespondence};
pub use error::{BakeError, Result};
pub use frames::{AnimationSegment, FrameSchedule, ScheduledSegment};
pub use layout::{PackingMode, SamplingMode, TextureLayout};
pub use mesh::{Mesh, Vertex};
pub use report::{export_report_json, BakeReport};
pub use sampler::SampledBuffers;
pub use scene::{
    BakeInput, BakeObject, KeyedMeshSource, MeshKey, NamedMesh, ObjectDescription,
    SceneDescription, SequenceMesh,
};
