//! Post-processing of sampled buffers before they become textures. Nothing
//! here can fail: the data has already been validated.

use crate::config::EncodeConfig;
use crate::layout::TextureLayout;
use crate::sampler::SampledBuffers;
use crate::Vec3;

/// Map normal channels from `[-1,1]` into `[0,1]`. Alpha is left alone.
pub fn remap_normals(buffer: &mut [f32]) {
    for texel in buffer.chunks_exact_mut(4) {
        for c in &mut texel[..3] {
            *c = (*c + 1.0) * 0.5;
        }
    }
}

/// Map offset channels into `[0,1]` with `(o / multiplier + 1) / 2`.
pub fn remap_offsets(buffer: &mut [f32], multiplier: &Vec3) {
    for texel in buffer.chunks_exact_mut(4) {
        for (c, m) in texel[..3].iter_mut().zip(multiplier.iter()) {
            *c = (*c / m + 1.0) * 0.5;
        }
    }
}

/// Inverse of [`remap_offsets`] for a single value.
#[inline]
pub fn decode_remapped(value: f32, multiplier: f32) -> f32 {
    (value * 2.0 - 1.0) * multiplier
}

/// Reverse the order of whole rows of `width` RGBA texels.
pub fn invert_rows(buffer: &mut [f32], width: usize) {
    let row = width * 4;
    if row == 0 {
        return;
    }
    let rows = buffer.len() / row;
    for r in 0..rows / 2 {
        let (head, tail) = buffer.split_at_mut((rows - 1 - r) * row);
        head[r * row..(r + 1) * row].swap_with_slice(&mut tail[..row]);
    }
}

/// Apply the configured post-processing in place. When offsets are remapped
/// the decode multiplier is stored in `bounds.remap`.
pub fn encode(buffers: &mut SampledBuffers, layout: &TextureLayout, cfg: &EncodeConfig) {
    if cfg.remap_offsets {
        let multiplier = buffers.bounds.offset_extent();
        remap_offsets(&mut buffers.offsets, &multiplier);
        buffers.bounds.remap = Some(multiplier);
    }
    if cfg.remap_normals {
        remap_normals(&mut buffers.normals);
    }
    if cfg.invert_v {
        invert_rows(&mut buffers.offsets, layout.width);
        invert_rows(&mut buffers.normals, layout.width);
    }
}
