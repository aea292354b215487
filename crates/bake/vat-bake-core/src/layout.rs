//! Texture layout planning: resolution and packing for `vertex_count` texels
//! per frame over `frame_count` frames.

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::error::{BakeError, Result};

/// Whether frames are row-aligned in the texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackingMode {
    /// Every frame starts on a new row; the tail of its last row is unused.
    #[default]
    Skip,
    /// Frames follow each other texel by texel.
    Continuous,
}

/// How the runtime decoder has to address vertex data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// One vertex per texel, one frame per row.
    StackSingle,
    /// Each frame spans whole rows.
    StackMultiple,
    /// Frames span partial rows.
    Continuous,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureLayout {
    pub width: usize,
    pub height: usize,
    /// Rows per frame. Whole under `Skip`, fractional under `Continuous`.
    pub frame_height: f32,
    /// `vertex_count / width` before any rounding.
    pub frame_width: f32,
    pub vertex_count: usize,
    pub frame_count: usize,
    pub packing: PackingMode,
    pub forced_power_of_two: bool,
    pub square: bool,
    /// Fewer vertices than texels in a row.
    pub underflow: bool,
    /// More vertices than texels in a row.
    pub overflow: bool,
    pub sampling: SamplingMode,
}

impl TextureLayout {
    #[inline]
    pub fn texel_count(&self) -> usize {
        self.width * self.height
    }

    /// Length of an RGBA float buffer for this layout.
    #[inline]
    pub fn buffer_len(&self) -> usize {
        self.texel_count() * 4
    }

    /// Texel index where the frame stored at `row` (its index in the frame
    /// list) begins.
    #[inline]
    pub fn frame_start(&self, row: usize) -> usize {
        match self.packing {
            PackingMode::Skip => self.width * self.frame_height as usize * row,
            PackingMode::Continuous => self.vertex_count * row,
        }
    }
}

fn next_power_of_two(n: usize, cap: usize) -> usize {
    let mut size = 2;
    while size < n && size < cap {
        size *= 2;
    }
    size
}

fn rows_per_frame(vertex_count: usize, width: usize, packing: PackingMode) -> f32 {
    let rows = vertex_count as f32 / width as f32;
    match packing {
        PackingMode::Skip => rows.ceil(),
        PackingMode::Continuous => rows,
    }
}

/// Compute the layout, or fail with [`BakeError::LayoutOverflow`] when the data
/// cannot fit inside the configured maxima.
pub fn plan(vertex_count: usize, frame_count: usize, cfg: &LayoutConfig) -> Result<TextureLayout> {
    if vertex_count == 0 {
        return Err(BakeError::NothingToBake {
            reason: "no vertices to bake".to_string(),
        });
    }
    if frame_count == 0 {
        return Err(BakeError::TooFewFrames { count: 0 });
    }

    let mut width = if cfg.force_power_of_two {
        next_power_of_two(vertex_count, cfg.max_width)
    } else {
        vertex_count.min(cfg.max_width)
    };
    let mut frame_height = rows_per_frame(vertex_count, width, cfg.packing);
    if frame_count as f32 * frame_height > cfg.max_height as f32 {
        width = cfg.max_width;
        frame_height = rows_per_frame(vertex_count, width, cfg.packing);
    }

    let rows = frame_count as f32 * frame_height;
    let mut height = if cfg.force_power_of_two {
        let mut size = 2;
        while (size as f32) < rows {
            size *= 2;
        }
        size
    } else {
        rows.ceil() as usize
    };

    if cfg.force_square {
        let side = width.max(height);
        width = side;
        height = side;
    }

    if width > cfg.max_width {
        return Err(BakeError::LayoutOverflow {
            axis: "width".to_string(),
            size: width,
            max: cfg.max_width,
        });
    }
    if height > cfg.max_height {
        return Err(BakeError::LayoutOverflow {
            axis: "height".to_string(),
            size: height,
            max: cfg.max_height,
        });
    }

    let underflow = vertex_count < width;
    let overflow = vertex_count > width;
    let sampling = match (underflow || overflow, cfg.packing) {
        (false, _) => SamplingMode::StackSingle,
        (true, PackingMode::Skip) => SamplingMode::StackMultiple,
        (true, PackingMode::Continuous) => SamplingMode::Continuous,
    };

    Ok(TextureLayout {
        width,
        height,
        frame_height,
        frame_width: vertex_count as f32 / width as f32,
        vertex_count,
        frame_count,
        packing: cfg.packing,
        forced_power_of_two: cfg.force_power_of_two,
        square: cfg.force_square,
        underflow,
        overflow,
        sampling,
    })
}
