//! Bake report: the metadata a runtime decoder needs next to the textures.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bounds::Bounds;
use crate::config::{BakeConfig, PaddingMode};
use crate::frames::FrameSchedule;
use crate::layout::{SamplingMode, TextureLayout};
use crate::Vec3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    pub scale: f32,
    pub invert_x: bool,
    pub invert_y: bool,
    pub invert_z: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FramesReport {
    pub sampling: SamplingMode,
    /// Frames before padding.
    pub count: usize,
    /// Rows in the texture, padding included.
    pub padded_count: usize,
    pub padded: bool,
    pub padding: usize,
    pub padding_mode: PaddingMode,
    pub rate: f32,
    /// Texture rows per frame.
    pub height: f32,
    /// Vertices per row, as a fraction of the texture width.
    pub width: f32,
    pub start_frame: i32,
    pub end_frame: i32,
    pub step: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UvReport {
    pub invert_v: bool,
}

/// Absolute offset extents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundsReport {
    pub min_offset: Vec3,
    pub max_offset: Vec3,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TexturesReport {
    pub width: usize,
    pub height: usize,
    pub remap_offsets: bool,
    /// Multiply decoded `[-1,1]` offsets by this to get scene units.
    pub offset_multiplier: Option<Vec3>,
    pub remap_normals: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationReport {
    pub name: String,
    pub objects: Vec<String>,
    pub start_row: usize,
    pub end_row: usize,
    pub frames: usize,
    pub start_time: f32,
    pub end_time: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BakeReport {
    pub id: Uuid,
    pub name: String,
    pub unit: UnitReport,
    pub frames: FramesReport,
    pub uv: UvReport,
    pub bounds: BoundsReport,
    pub textures: TexturesReport,
    pub animations: Vec<AnimationReport>,
}

impl BakeReport {
    pub fn new(
        cfg: &BakeConfig,
        schedule: &FrameSchedule,
        layout: &TextureLayout,
        bounds: &Bounds,
    ) -> Self {
        let animations = schedule
            .segments
            .iter()
            .map(|seg| AnimationReport {
                name: seg.name.clone(),
                objects: seg.objects.clone(),
                start_row: seg.first_row,
                end_row: seg.last_row,
                frames: seg.last_row + 1 - seg.first_row,
                start_time: seg.start_time,
                end_time: seg.end_time,
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            name: cfg.name.clone(),
            unit: UnitReport {
                scale: cfg.transform.scale,
                invert_x: cfg.transform.invert_x,
                invert_y: cfg.transform.invert_y,
                invert_z: cfg.transform.invert_z,
            },
            frames: FramesReport {
                sampling: layout.sampling,
                count: schedule.frame_count,
                padded_count: schedule.len(),
                padded: schedule.padded,
                padding: schedule.padding,
                padding_mode: schedule.padding_mode,
                rate: cfg.frames.frame_rate,
                height: layout.frame_height,
                width: layout.frame_width,
                start_frame: schedule.start_frame,
                end_frame: schedule.end_frame,
                step: schedule.step,
            },
            uv: UvReport {
                invert_v: cfg.encode.invert_v,
            },
            bounds: BoundsReport {
                min_offset: bounds.min_offset.abs(),
                max_offset: bounds.max_offset.abs(),
            },
            textures: TexturesReport {
                width: layout.width,
                height: layout.height,
                remap_offsets: bounds.remap.is_some(),
                offset_multiplier: bounds.remap,
                remap_normals: cfg.encode.remap_normals,
            },
            animations,
        }
    }
}

/// Export a report as JSON.
pub fn export_report_json(report: &BakeReport) -> serde_json::Value {
    serde_json::to_value(report).unwrap_or(serde_json::Value::Null)
}
