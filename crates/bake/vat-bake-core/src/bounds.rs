//! Reference and animated extents of a bake.

use serde::{Deserialize, Serialize};

use crate::Vec3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Extent of the reference pose.
    pub ref_min: Vec3,
    pub ref_max: Vec3,
    /// Extent over every sampled frame, reference included.
    pub min: Vec3,
    pub max: Vec3,
    /// `(min - ref_min)` and `(max - ref_max)`, with scale and axis signs applied.
    pub min_offset: Vec3,
    pub max_offset: Vec3,
    /// Largest absolute value written per offset channel.
    pub peak_offset: Vec3,
    /// Decode multiplier, set once offsets have been remapped to `[0,1]`.
    pub remap: Option<Vec3>,
}

impl Bounds {
    /// Per-axis offset magnitude used to normalise offsets. Zero axes map to
    /// `1.0` so static axes survive the division.
    pub fn offset_extent(&self) -> Vec3 {
        let extent = self
            .min_offset
            .abs()
            .sup(&self.max_offset.abs())
            .sup(&self.peak_offset);
        extent.map(|c| if c > 0.0 { c } else { 1.0 })
    }
}

/// Running extents while sampling.
#[derive(Clone, Debug)]
pub(crate) struct BoundsTracker {
    reference: Option<(Vec3, Vec3)>,
    animated: Option<(Vec3, Vec3)>,
    peak: Vec3,
}

impl Default for BoundsTracker {
    fn default() -> Self {
        Self {
            reference: None,
            animated: None,
            peak: Vec3::zeros(),
        }
    }
}

fn grow(slot: &mut Option<(Vec3, Vec3)>, p: &Vec3) {
    *slot = Some(match *slot {
        Some((lo, hi)) => (lo.inf(p), hi.sup(p)),
        None => (*p, *p),
    });
}

impl BoundsTracker {
    pub(crate) fn reference(&mut self, p: &Vec3) {
        grow(&mut self.reference, p);
    }

    pub(crate) fn sample(&mut self, p: &Vec3) {
        grow(&mut self.animated, p);
    }

    /// Record an offset as written to the buffer.
    pub(crate) fn offset(&mut self, o: &Vec3) {
        self.peak = self.peak.sup(&o.abs());
    }

    pub(crate) fn finish(self, signed_scale: &Vec3) -> Bounds {
        let (ref_min, ref_max) = self
            .reference
            .unwrap_or((Vec3::zeros(), Vec3::zeros()));
        let (min, max) = self.animated.unwrap_or((ref_min, ref_max));
        Bounds {
            ref_min,
            ref_max,
            min,
            max,
            min_offset: (min - ref_min).component_mul(signed_scale),
            max_offset: (max - ref_max).component_mul(signed_scale),
            peak_offset: self.peak,
            remap: None,
        }
    }
}
