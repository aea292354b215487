//! End-to-end bake: selection checks, scheduling, layout, sampling, encoding
//! and reporting.

use std::collections::HashSet;

use log::info;
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::config::{BakeConfig, BakeMode};
use crate::encoder;
use crate::error::{BakeError, Result};
use crate::frames::{self, FrameSchedule, ObjectSegments};
use crate::layout::{self, TextureLayout};
use crate::report::BakeReport;
use crate::sampler::{self, SampledBuffers};
use crate::scene::{BakeInput, BakeObject, SequenceMesh};
use crate::uv;

/// Everything a bake produces.
#[derive(Clone, Debug, PartialEq)]
pub struct BakeOutput {
    pub schedule: FrameSchedule,
    pub layout: TextureLayout,
    pub offsets: Vec<f32>,
    pub normals: Vec<f32>,
    pub bounds: Bounds,
    /// Per object, one UV per baked vertex.
    pub uvs: Vec<Vec<[f32; 2]>>,
    pub report: BakeReport,
}

/// `(success, message)` summary of a bake for hosts that only show status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BakeStatus {
    pub success: bool,
    pub message: String,
}

impl BakeStatus {
    pub fn from_result(result: &Result<BakeOutput>) -> Self {
        match result {
            Ok(out) => Self {
                success: true,
                message: format!(
                    "Baked {} vertices over {} frames into {}x{}",
                    out.layout.vertex_count,
                    out.schedule.len(),
                    out.layout.width,
                    out.layout.height
                ),
            },
            Err(err) => Self {
                success: false,
                message: err.to_string(),
            },
        }
    }
}

/// Vertices each animated object contributes per frame, checking the
/// selection on the way.
fn animation_vertex_counts(objects: &[BakeObject], reference_frame: i32) -> Result<Vec<usize>> {
    let mut targets = HashSet::new();
    let mut counts = Vec::with_capacity(objects.len());
    for object in objects {
        let count = match &object.target {
            Some(target) => {
                if !targets.insert(target.name.as_str()) {
                    return Err(BakeError::DuplicateTarget {
                        object: object.name.clone(),
                        target: target.name.clone(),
                    });
                }
                target.mesh.vertex_count()
            }
            None => {
                let mut ctx = object.source.create_context();
                ctx.set_time(reference_frame)
                    .and_then(|_| ctx.read_mesh())
                    .map_err(|e| BakeError::Evaluation {
                        object: object.name.clone(),
                        frame: reference_frame,
                        reason: e.to_string(),
                    })?
                    .vertex_count()
            }
        };
        counts.push(count);
    }
    Ok(counts)
}

/// Sequence members in frame order (sorted by name), all sharing one vertex
/// count.
fn ordered_sequence(meshes: &[SequenceMesh]) -> Result<Vec<&SequenceMesh>> {
    let mut ordered: Vec<&SequenceMesh> = meshes.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));
    let Some(first) = ordered.first() else {
        return Err(BakeError::NothingToBake {
            reason: "mesh sequence is empty".to_string(),
        });
    };
    let expected = first.mesh.vertex_count();
    if let Some(bad) = ordered.iter().find(|m| m.mesh.vertex_count() != expected) {
        return Err(BakeError::SequenceVertexCount {
            mesh: bad.name.clone(),
            found: bad.mesh.vertex_count(),
            expected,
        });
    }
    Ok(ordered)
}

fn check_mode(cfg: &BakeConfig, input: &BakeInput) -> Result<()> {
    let input_mode = match input {
        BakeInput::Animation(_) => BakeMode::Animation,
        BakeInput::MeshSequence(_) => BakeMode::MeshSequence,
    };
    if input_mode != cfg.mode {
        return Err(BakeError::config(format!(
            "configured for {:?} but given {:?} input",
            cfg.mode, input_mode
        )));
    }
    Ok(())
}

fn plan_layout(
    cfg: &BakeConfig,
    vertex_counts: &[usize],
    schedule: &FrameSchedule,
) -> Result<TextureLayout> {
    let vertex_count: usize = vertex_counts.iter().sum();
    let layout = layout::plan(vertex_count, schedule.len(), &cfg.layout)?;
    info!(
        "baking {} ({:?}): {} vertices x {} frames into {}x{} ({:?})",
        if cfg.name.is_empty() { "<unnamed>" } else { cfg.name.as_str() },
        cfg.mode,
        vertex_count,
        schedule.len(),
        layout.width,
        layout.height,
        layout.sampling
    );
    Ok(layout)
}

fn finish(
    cfg: &BakeConfig,
    schedule: FrameSchedule,
    layout: TextureLayout,
    vertex_counts: &[usize],
    mut buffers: SampledBuffers,
) -> BakeOutput {
    encoder::encode(&mut buffers, &layout, &cfg.encode);
    let uvs = uv::assign_uvs(vertex_counts, &layout, cfg.encode.invert_v);
    let report = BakeReport::new(cfg, &schedule, &layout, &buffers.bounds);
    info!(
        "bake {} done: {} clips, offset remap {:?}",
        report.id,
        report.animations.len(),
        buffers.bounds.remap
    );
    BakeOutput {
        schedule,
        layout,
        offsets: buffers.offsets,
        normals: buffers.normals,
        bounds: buffers.bounds,
        uvs,
        report,
    }
}

/// Run a complete bake. Any error aborts the bake and discards partial
/// buffers; the same input always produces the same buffers.
pub fn bake(input: &BakeInput, cfg: &BakeConfig) -> Result<BakeOutput> {
    cfg.validate()?;
    check_mode(cfg, input)?;

    match input {
        BakeInput::Animation(objects) => {
            if objects.is_empty() {
                return Err(BakeError::NothingToBake {
                    reason: "no objects selected".to_string(),
                });
            }
            let segments: Vec<ObjectSegments<'_>> = objects
                .iter()
                .map(|o| ObjectSegments {
                    object: &o.name,
                    segments: &o.nla_strips,
                })
                .collect();
            let schedule = frames::schedule_animation(&cfg.frames, &segments)?;
            let counts = animation_vertex_counts(objects, schedule.reference_frame())?;
            let layout = plan_layout(cfg, &counts, &schedule)?;
            let buffers = sampler::sample_animation(objects, &schedule, &layout, &cfg.transform)?;
            Ok(finish(cfg, schedule, layout, &counts, buffers))
        }
        BakeInput::MeshSequence(meshes) => {
            let ordered = ordered_sequence(meshes)?;
            let schedule = frames::schedule_sequence(ordered.len())?;
            let counts = vec![ordered[0].mesh.vertex_count()];
            let layout = plan_layout(cfg, &counts, &schedule)?;
            let buffers = sampler::sample_sequence(&ordered, &schedule, &layout, &cfg.transform)?;
            Ok(finish(cfg, schedule, layout, &counts, buffers))
        }
    }
}
