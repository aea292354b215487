//! Frame scheduling: which frames to sample, in which order, with optional
//! loop padding around each animation clip.
//!
//! Three range strategies:
//! - `Scene`/`Custom`: an inclusive stepped range.
//! - `Nla`: the union of every clip's stepped range. Clips with the same
//!   `(name, start, end)` on several objects (a shared rig) count once.
//!
//! Padding duplicates a clip's boundary frames next to it so texture
//! filtering at playback never blends a looping clip into its neighbour:
//! `Suffix` appends the clip's first frame after its last, `Prefix` inserts
//! its last frame before its first. It is only applied when every object
//! shares the same clip boundaries; otherwise it is disabled with a warning.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::{FrameConfig, FrameRange, PaddingMode};
use crate::error::{BakeError, Result};

/// One contiguous playable clip (an NLA strip), inclusive on both ends.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimationSegment {
    pub name: String,
    pub start: i32,
    pub end: i32,
}

impl AnimationSegment {
    pub fn new(name: impl Into<String>, start: i32, end: i32) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }
}

/// Clip data contributed by one object.
#[derive(Clone, Copy, Debug)]
pub struct ObjectSegments<'a> {
    pub object: &'a str,
    pub segments: &'a [AnimationSegment],
}

/// A clip after coalescing, with every object that plays it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub segment: AnimationSegment,
    pub objects: Vec<String>,
}

/// Where a clip landed in the final frame list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSegment {
    pub name: String,
    pub objects: Vec<String>,
    /// Clip range clamped to the baked range.
    pub start_frame: i32,
    pub end_frame: i32,
    /// Rows (indices into [`FrameSchedule::frames`]) of the clip's first and
    /// last sampled frames, padding rows excluded.
    pub first_row: usize,
    pub last_row: usize,
    /// `first_row / rows` and `(last_row + 1) / rows`.
    pub start_time: f32,
    pub end_time: f32,
}

/// Ordered frames to sample. Duplicates appear only as padding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameSchedule {
    pub frames: Vec<i32>,
    pub start_frame: i32,
    pub end_frame: i32,
    /// Frame count before padding.
    pub frame_count: usize,
    pub step: i32,
    pub padded: bool,
    /// Padding frames per clip edge actually applied (0 when not padded).
    pub padding: usize,
    pub padding_mode: PaddingMode,
    pub segments: Vec<ScheduledSegment>,
}

impl FrameSchedule {
    /// Rows the texture stores, padding included.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Reference frame: every offset is measured against the pose here.
    #[inline]
    pub fn reference_frame(&self) -> i32 {
        self.start_frame
    }
}

/// Merge clips sharing `(name, start, end)` across objects, in first-seen order.
pub fn coalesce_clips(objects: &[ObjectSegments<'_>]) -> Vec<Clip> {
    let mut clips: IndexMap<&AnimationSegment, Vec<String>> = IndexMap::new();
    for obj in objects {
        for segment in obj.segments {
            let players = clips.entry(segment).or_default();
            if !players.iter().any(|p| p == obj.object) {
                players.push(obj.object.to_string());
            }
        }
    }
    clips
        .into_iter()
        .map(|(segment, objects)| Clip {
            segment: segment.clone(),
            objects,
        })
        .collect()
}

/// True when every object has the same clip boundaries, in the same order.
/// Names are not compared.
pub fn padding_allowed(objects: &[ObjectSegments<'_>]) -> bool {
    objects.windows(2).all(|pair| {
        pair[0].segments.len() == pair[1].segments.len()
            && pair[0]
                .segments
                .iter()
                .zip(pair[1].segments.iter())
                .all(|(a, b)| a.start == b.start && a.end == b.end)
    })
}

fn stepped(start: i32, end: i32, step: i32) -> impl Iterator<Item = i32> {
    (start..=end).step_by(step.max(1) as usize)
}

/// Resolve the frames of an animation bake.
pub fn schedule_animation(
    cfg: &FrameConfig,
    objects: &[ObjectSegments<'_>],
) -> Result<FrameSchedule> {
    let clips = coalesce_clips(objects);
    let (frames, step) = match cfg.range {
        FrameRange::Scene { start, end, step } => {
            if step < 1 {
                return Err(BakeError::InvalidFrameStep { step });
            }
            (stepped(start, end, step).collect::<Vec<_>>(), step)
        }
        FrameRange::Custom { start, end } => {
            if cfg.step < 1 {
                return Err(BakeError::InvalidFrameStep { step: cfg.step });
            }
            (stepped(start, end, cfg.step).collect(), cfg.step)
        }
        FrameRange::Nla => {
            if cfg.step < 1 {
                return Err(BakeError::InvalidFrameStep { step: cfg.step });
            }
            let union: BTreeSet<i32> = clips
                .iter()
                .flat_map(|clip| stepped(clip.segment.start, clip.segment.end, cfg.step))
                .collect();
            (union.into_iter().collect(), cfg.step)
        }
    };
    if frames.len() < 2 {
        return Err(BakeError::TooFewFrames {
            count: frames.len(),
        });
    }

    let mut apply_padding = false;
    if cfg.padding > 0 && cfg.range == FrameRange::Nla {
        apply_padding = padding_allowed(objects);
        if !apply_padding {
            warn!(
                "padding of {} frame(s) requested but selected objects do not share clip boundaries; baking without padding",
                cfg.padding
            );
        }
    }
    let padding = if apply_padding { cfg.padding } else { 0 };

    let schedule = pad_and_locate(frames, step, &clips, padding, cfg.padding_mode);
    debug!(
        "scheduled {} frames ({} before padding) in [{}, {}]",
        schedule.len(),
        schedule.frame_count,
        schedule.start_frame,
        schedule.end_frame
    );
    Ok(schedule)
}

/// Frames of a mesh-sequence bake: one per mesh.
pub fn schedule_sequence(len: usize) -> Result<FrameSchedule> {
    if len < 2 {
        return Err(BakeError::TooFewFrames { count: len });
    }
    let frames: Vec<i32> = (0..len as i32).collect();
    Ok(pad_and_locate(frames, 1, &[], 0, PaddingMode::Suffix))
}

/// Locate clips in the sorted base `frames`, insert padding around each
/// distinct clip span and compute each clip's rows in the padded list.
/// Clips sharing the same span (one rig, several names) are padded once.
fn pad_and_locate(
    frames: Vec<i32>,
    step: i32,
    clips: &[Clip],
    padding: usize,
    padding_mode: PaddingMode,
) -> FrameSchedule {
    let start_frame = frames.iter().copied().min().unwrap_or_default();
    let end_frame = frames.iter().copied().max().unwrap_or_default();

    // (clip, first base index, last base index, clamped start, clamped end)
    let mut spans = Vec::new();
    for clip in clips {
        let seg = &clip.segment;
        if !frames.contains(&seg.start) && !frames.contains(&seg.end) {
            continue;
        }
        let lo = start_frame.max(seg.start);
        let hi = end_frame.min(seg.end);
        let first = frames.iter().position(|&f| f >= lo && f <= hi);
        let last = frames.iter().rposition(|&f| f >= lo && f <= hi);
        if let (Some(first), Some(last)) = (first, last) {
            spans.push((clip, first, last, lo, hi));
        }
    }

    let mut before: Vec<Vec<i32>> = vec![Vec::new(); frames.len()];
    let mut after: Vec<Vec<i32>> = vec![Vec::new(); frames.len()];
    if padding > 0 {
        let mut padded_spans = HashSet::new();
        for &(_, first, last, _, _) in &spans {
            if !padded_spans.insert((first, last)) {
                continue;
            }
            if padding_mode.has_prefix() {
                before[first].extend(std::iter::repeat(frames[last]).take(padding));
            }
            if padding_mode.has_suffix() {
                after[last].extend(std::iter::repeat(frames[first]).take(padding));
            }
        }
    }

    let mut padded = Vec::with_capacity(frames.len() + spans.len() * padding * 2);
    let mut rows = Vec::with_capacity(frames.len());
    for (i, &frame) in frames.iter().enumerate() {
        padded.extend_from_slice(&before[i]);
        rows.push(padded.len());
        padded.push(frame);
        padded.extend_from_slice(&after[i]);
    }

    let total = padded.len() as f32;
    let segments = spans
        .into_iter()
        .map(|(clip, first, last, lo, hi)| ScheduledSegment {
            name: clip.segment.name.clone(),
            objects: clip.objects.clone(),
            start_frame: lo,
            end_frame: hi,
            first_row: rows[first],
            last_row: rows[last],
            start_time: rows[first] as f32 / total,
            end_time: (rows[last] + 1) as f32 / total,
        })
        .collect();

    FrameSchedule {
        frame_count: frames.len(),
        frames: padded,
        start_frame,
        end_frame,
        step,
        padded: padding > 0,
        padding,
        padding_mode,
        segments,
    }
}
