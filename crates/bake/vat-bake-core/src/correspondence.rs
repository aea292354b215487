//! Source → target vertex correspondence for retargeting.
//!
//! Each target vertex is bound once, in the reference pose, to the closest
//! point on the source surface: a face, barycentric weights on that face and a
//! signed distance along the interpolated surface normal. Every later frame
//! re-evaluates that same surface point on the deformed source, which keeps
//! the target stable under rotation where a raw positional delta would not be.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::bvh::TriangleBvh;
use crate::error::{BakeError, Result};
use crate::mesh::Mesh;
use crate::Vec3;

/// Where on the source surface one target vertex tracks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VertexCorrespondence {
    /// Signed distance from the surface point to the target vertex, along the
    /// interpolated surface normal.
    pub normal_offset: f32,
    /// Closest point on the reference-pose source surface.
    pub surface_point: Vec3,
    /// `surface_point + normal_offset * normal` in the reference pose; offsets
    /// are measured against it.
    pub reference_point: Vec3,
    pub face: usize,
    pub weights: [f32; 3],
}

/// A target vertex reconstructed against one frame of the source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedVertex {
    pub position: Vec3,
    pub normal: Vec3,
}

impl VertexCorrespondence {
    /// Reconstruct this vertex on `mesh`, which must share the reference
    /// topology.
    #[inline]
    pub fn track(&self, mesh: &Mesh) -> TrackedVertex {
        let (surface, normal) = interpolate(mesh, self.face, &self.weights);
        TrackedVertex {
            position: surface + normal * self.normal_offset,
            normal,
        }
    }

    /// Offset of the reconstructed vertex from its reference position.
    #[inline]
    pub fn offset(&self, tracked: &TrackedVertex) -> Vec3 {
        tracked.position - self.reference_point
    }
}

/// Surface point and unit normal at barycentric `weights` on `face`.
///
/// The normal is interpolated from the corner normals, then normalised; a
/// vanishing interpolation falls back to the flat face normal, and a zero-area
/// face to `+Z`.
pub fn interpolate(mesh: &Mesh, face: usize, weights: &[f32; 3]) -> (Vec3, Vec3) {
    let [a, b, c] = mesh.triangle(face);
    let [na, nb, nc] = mesh.triangle_normals(face);
    let position = a * weights[0] + b * weights[1] + c * weights[2];
    let blended = na * weights[0] + nb * weights[1] + nc * weights[2];
    let normal = blended
        .try_normalize(f32::EPSILON)
        .or_else(|| (b - a).cross(&(c - a)).try_normalize(f32::EPSILON))
        .unwrap_or_else(Vec3::z);
    (position, normal)
}

/// One correspondence per target vertex, indexed like the target's vertices.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrespondenceTable {
    entries: Vec<VertexCorrespondence>,
}

impl CorrespondenceTable {
    /// Bind every vertex of `target` to the surface of `source`. Both meshes
    /// are in their reference pose.
    pub fn resolve(source: &Mesh, target: &Mesh) -> Result<Self> {
        source.validate()?;
        if source.face_count() == 0 {
            return Err(BakeError::config(
                "retargeting source mesh has no faces to track",
            ));
        }
        let bvh = TriangleBvh::build(source);
        let mut entries = Vec::with_capacity(target.vertex_count());
        for position in &target.positions {
            let hit = bvh.nearest(position).ok_or_else(|| {
                BakeError::config("retargeting source mesh has no faces to track")
            })?;
            // surface point and normal come from the same interpolation the
            // sampler uses, so the reference frame reconstructs exactly
            let (surface_point, normal) = interpolate(source, hit.face, &hit.weights);
            let normal_offset = (position - surface_point).dot(&normal);
            entries.push(VertexCorrespondence {
                normal_offset,
                surface_point,
                reference_point: surface_point + normal * normal_offset,
                face: hit.face,
                weights: hit.weights,
            });
        }
        debug!(
            "resolved {} correspondences against {} source faces",
            entries.len(),
            source.face_count()
        );
        Ok(Self { entries })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&VertexCorrespondence> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VertexCorrespondence> {
        self.entries.iter()
    }
}
