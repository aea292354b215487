//! Mesh snapshots.
//!
//! A [`Mesh`] is the evaluated geometry of one object at one frame, in world
//! space. Snapshots are transient: the sampler reads one per frame and drops it.

use serde::{Deserialize, Serialize};

use crate::error::{BakeError, Result};
use crate::Vec3;

/// One vertex of a snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
}

/// Triangle mesh with per-vertex normals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    /// One normal per vertex. May be left empty in serialized form and
    /// rebuilt with [`Mesh::recompute_normals`].
    #[serde(default)]
    pub normals: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            positions,
            normals,
            faces,
        }
    }

    /// Build a mesh from polygons of any arity, fan-triangulating each one.
    /// Normals are computed from the resulting triangles.
    pub fn from_polygons(positions: Vec<Vec3>, polygons: &[Vec<u32>]) -> Self {
        let mut faces = Vec::with_capacity(polygons.len() * 2);
        for poly in polygons {
            if poly.len() < 3 {
                continue;
            }
            for i in 1..(poly.len() - 1) {
                faces.push([poly[0], poly[i], poly[i + 1]]);
            }
        }
        let mut mesh = Self::new(positions, Vec::new(), faces);
        mesh.recompute_normals();
        mesh
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn vertex(&self, index: usize) -> Vertex {
        Vertex {
            position: self.positions[index],
            normal: self.normals[index],
        }
    }

    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.positions
            .iter()
            .zip(self.normals.iter())
            .map(|(p, n)| Vertex {
                position: *p,
                normal: *n,
            })
    }

    /// Corner positions of a face.
    #[inline]
    pub fn triangle(&self, face: usize) -> [Vec3; 3] {
        let [a, b, c] = self.faces[face];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    /// Corner normals of a face.
    #[inline]
    pub fn triangle_normals(&self, face: usize) -> [Vec3; 3] {
        let [a, b, c] = self.faces[face];
        [
            self.normals[a as usize],
            self.normals[b as usize],
            self.normals[c as usize],
        ]
    }

    /// Check face indices and the normal count.
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertex_count();
        if self.normals.len() != vertex_count {
            return Err(BakeError::config(format!(
                "mesh has {} normals for {} vertices",
                self.normals.len(),
                vertex_count
            )));
        }
        for (face, indices) in self.faces.iter().enumerate() {
            for &vertex in indices {
                if vertex as usize >= vertex_count {
                    return Err(BakeError::InvalidFace {
                        face,
                        vertex,
                        vertex_count,
                    });
                }
            }
        }
        Ok(())
    }

    /// Rebuild vertex normals as the area-weighted average of adjacent face
    /// normals. Vertices without faces get `+Z`.
    pub fn recompute_normals(&mut self) {
        let mut normals = vec![Vec3::zeros(); self.positions.len()];
        for &[a, b, c] in &self.faces {
            let (a, b, c) = (a as usize, b as usize, c as usize);
            if a >= normals.len() || b >= normals.len() || c >= normals.len() {
                continue;
            }
            // cross product length is twice the area: weights come for free
            let n = (self.positions[b] - self.positions[a])
                .cross(&(self.positions[c] - self.positions[a]));
            normals[a] += n;
            normals[b] += n;
            normals[c] += n;
        }
        for n in normals.iter_mut() {
            *n = n.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z);
        }
        self.normals = normals;
    }

    /// Axis-aligned bounds `(min, max)`; `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(lo, hi), p| (lo.inf(p), hi.sup(p))),
        )
    }
}
