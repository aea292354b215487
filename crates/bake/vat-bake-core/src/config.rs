//! Bake configuration.
//!
//! Defaults mirror the authoring tool's: 1 unit = 1 m baked as centimetres
//! (`scale = 100`), Y inverted, Y-down UVs, normals remapped to `[0,1]`.

use serde::{Deserialize, Serialize};

use crate::error::{BakeError, Result};
use crate::layout::PackingMode;
use crate::Vec3;

/// How the objects to bake produce their frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BakeMode {
    /// Objects are driven by time-varying pose evaluation.
    #[default]
    Animation,
    /// Each input mesh is one frame; no time stepping.
    MeshSequence,
}

/// Strategy used to derive the frames to sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameRange {
    /// Host scene range, inclusive. The scene carries its own step.
    Scene { start: i32, end: i32, step: i32 },
    /// Custom inclusive range, stepped by [`FrameConfig::step`].
    Custom { start: i32, end: i32 },
    /// Union of the objects' NLA strips, stepped per strip.
    #[default]
    Nla,
}

/// Where loop padding frames are inserted around each clip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingMode {
    /// Last frame inserted before the first frame.
    Prefix,
    /// First frame inserted after the last frame.
    #[default]
    Suffix,
    PrefixSuffix,
}

impl PaddingMode {
    #[inline]
    pub fn has_prefix(self) -> bool {
        matches!(self, Self::Prefix | Self::PrefixSuffix)
    }

    #[inline]
    pub fn has_suffix(self) -> bool {
        matches!(self, Self::Suffix | Self::PrefixSuffix)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub range: FrameRange,
    /// Step for `Custom` and `Nla` ranges. With `Nla` it applies per strip so
    /// every strip's first frame is sampled.
    pub step: i32,
    /// Padding frames per clip edge. Only honoured for `Nla` ranges.
    pub padding: usize,
    pub padding_mode: PaddingMode,
    /// Playback rate, reported for the runtime decoder.
    pub frame_rate: f32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            range: FrameRange::Nla,
            step: 1,
            padding: 0,
            padding_mode: PaddingMode::Suffix,
            frame_rate: 24.0,
        }
    }
}

/// Global transform applied to baked offsets and normals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Uniform scale applied to offsets (not normals).
    pub scale: f32,
    pub invert_x: bool,
    pub invert_y: bool,
    pub invert_z: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            scale: 100.0,
            invert_x: false,
            invert_y: true,
            invert_z: false,
        }
    }
}

impl TransformConfig {
    /// No scaling, no axis inversion.
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            invert_x: false,
            invert_y: false,
            invert_z: false,
        }
    }

    /// Per-axis sign (`-1` for inverted axes).
    pub fn signed_axis(&self) -> Vec3 {
        let sign = |invert: bool| if invert { -1.0 } else { 1.0 };
        Vec3::new(sign(self.invert_x), sign(self.invert_y), sign(self.invert_z))
    }

    /// Per-axis sign multiplied by the uniform scale.
    pub fn signed_scale(&self) -> Vec3 {
        self.signed_axis() * self.scale
    }
}

/// Texture size limits and packing flags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub max_width: usize,
    pub max_height: usize,
    pub force_power_of_two: bool,
    pub force_square: bool,
    pub packing: PackingMode,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_width: 4096,
            max_height: 4096,
            force_power_of_two: false,
            force_square: false,
            packing: PackingMode::Skip,
        }
    }
}

/// Post-processing applied to sampled buffers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Normalise offsets into `[0,1]`; the decode multiplier is reported.
    pub remap_offsets: bool,
    /// Map normal components from `[-1,1]` into `[0,1]`.
    pub remap_normals: bool,
    /// Flip rows and UV `v` (DirectX-style image origin).
    pub invert_v: bool,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            remap_offsets: false,
            remap_normals: true,
            invert_v: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Name given to the bake in its report.
    pub name: String,
    pub mode: BakeMode,
    pub frames: FrameConfig,
    pub transform: TransformConfig,
    pub layout: LayoutConfig,
    pub encode: EncodeConfig,
}

impl BakeConfig {
    /// Parse a (possibly partial) JSON config; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject values no bake can succeed with. Cheap; run before any sampling.
    pub fn validate(&self) -> Result<()> {
        if !self.transform.scale.is_finite() || self.transform.scale <= 0.0 {
            return Err(BakeError::config(format!(
                "scale must be finite and > 0, got {}",
                self.transform.scale
            )));
        }
        let step = match self.frames.range {
            FrameRange::Scene { step, .. } => step,
            FrameRange::Custom { .. } | FrameRange::Nla => self.frames.step,
        };
        if step < 1 {
            return Err(BakeError::InvalidFrameStep { step });
        }
        if self.layout.max_width == 0 || self.layout.max_height == 0 {
            return Err(BakeError::config(format!(
                "maximum texture size must be non-zero, got {}x{}",
                self.layout.max_width, self.layout.max_height
            )));
        }
        if !self.frames.frame_rate.is_finite() || self.frames.frame_rate <= 0.0 {
            return Err(BakeError::config(format!(
                "frame rate must be finite and > 0, got {}",
                self.frames.frame_rate
            )));
        }
        Ok(())
    }
}
