//! Texel-centre UVs pointing each vertex at its column of the texture.

use crate::layout::TextureLayout;

/// UV of the texel holding vertex `index` in the first frame.
#[inline]
pub fn uv_for_index(index: usize, layout: &TextureLayout, invert_v: bool) -> [f32; 2] {
    let width = layout.width.max(1);
    let height = layout.height.max(1) as f32;
    let u = (0.5 + (index % width) as f32) / width as f32;
    let v = (0.5 + (index / width) as f32) / height;
    [u, if invert_v { 1.0 - v } else { v }]
}

/// UVs for several objects baked into one texture. The vertex index keeps
/// counting across objects in order.
pub fn assign_uvs(
    vertex_counts: &[usize],
    layout: &TextureLayout,
    invert_v: bool,
) -> Vec<Vec<[f32; 2]>> {
    let mut next = 0;
    vertex_counts
        .iter()
        .map(|&count| {
            let uvs = (next..next + count)
                .map(|i| uv_for_index(i, layout, invert_v))
                .collect();
            next += count;
            uvs
        })
        .collect()
}
