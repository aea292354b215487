//! Bounding-volume hierarchy over a mesh's triangles.
//!
//! Single query: [`TriangleBvh::nearest`], the closest surface point to a
//! position together with its face and barycentric weights.

use crate::mesh::Mesh;
use crate::Vec3;

const LEAF_SIZE: usize = 4;

/// Result of a nearest-surface query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Nearest {
    /// Closest point on the surface.
    pub point: Vec3,
    /// Index of the owning face in the source mesh.
    pub face: usize,
    pub distance: f32,
    /// Barycentric weights of `point` against the face's corners, in face order.
    pub weights: [f32; 3],
}

#[derive(Clone, Copy, Debug)]
struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    fn grow(&mut self, p: &Vec3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Squared distance from `p` to the box (0 inside).
    fn distance_squared(&self, p: &Vec3) -> f32 {
        let mut d = 0.0;
        for axis in 0..3 {
            let v = p[axis];
            if v < self.min[axis] {
                d += (self.min[axis] - v) * (self.min[axis] - v);
            } else if v > self.max[axis] {
                d += (v - self.max[axis]) * (v - self.max[axis]);
            }
        }
        d
    }

    fn longest_axis(&self) -> usize {
        let extent = self.max - self.min;
        if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum NodeKind {
    Leaf { start: usize, count: usize },
    Inner { left: usize, right: usize },
}

#[derive(Clone, Copy, Debug)]
struct Node {
    bounds: Aabb,
    kind: NodeKind,
}

/// Static BVH built once over a reference-pose mesh.
#[derive(Clone, Debug)]
pub struct TriangleBvh {
    triangles: Vec<[Vec3; 3]>,
    /// Face indices, reordered so every leaf owns a contiguous range.
    order: Vec<usize>,
    nodes: Vec<Node>,
}

impl TriangleBvh {
    /// Build over every face of `mesh`. Faces must reference valid vertices.
    pub fn build(mesh: &Mesh) -> Self {
        let triangles: Vec<[Vec3; 3]> = (0..mesh.face_count()).map(|f| mesh.triangle(f)).collect();
        let mut bvh = Self {
            order: (0..triangles.len()).collect(),
            triangles,
            nodes: Vec::new(),
        };
        if !bvh.triangles.is_empty() {
            let centroids: Vec<Vec3> = bvh
                .triangles
                .iter()
                .map(|[a, b, c]| (a + b + c) / 3.0)
                .collect();
            bvh.build_node(&centroids, 0, bvh.triangles.len());
        }
        bvh
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    fn triangle_bounds(&self, start: usize, end: usize) -> Aabb {
        let mut bounds = Aabb::empty();
        for &face in &self.order[start..end] {
            for corner in &self.triangles[face] {
                bounds.grow(corner);
            }
        }
        bounds
    }

    fn build_node(&mut self, centroids: &[Vec3], start: usize, end: usize) -> usize {
        let bounds = self.triangle_bounds(start, end);
        let index = self.nodes.len();
        self.nodes.push(Node {
            bounds,
            kind: NodeKind::Leaf {
                start,
                count: end - start,
            },
        });
        if end - start <= LEAF_SIZE {
            return index;
        }

        let mut centroid_bounds = Aabb::empty();
        for &face in &self.order[start..end] {
            centroid_bounds.grow(&centroids[face]);
        }
        let axis = centroid_bounds.longest_axis();
        if centroid_bounds.max[axis] - centroid_bounds.min[axis] <= f32::EPSILON {
            // all centroids coincide: no split can separate them
            return index;
        }
        self.order[start..end].sort_by(|&a, &b| {
            centroids[a][axis]
                .partial_cmp(&centroids[b][axis])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        let mid = start + (end - start) / 2;
        let left = self.build_node(centroids, start, mid);
        let right = self.build_node(centroids, mid, end);
        self.nodes[index] = Node {
            bounds: self.nodes[left].bounds.union(&self.nodes[right].bounds),
            kind: NodeKind::Inner { left, right },
        };
        index
    }

    /// Closest point on the surface to `point`. `None` when the mesh has no faces.
    ///
    /// Ties resolve to the lowest face index so results are reproducible.
    pub fn nearest(&self, point: &Vec3) -> Option<Nearest> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut best: Option<(f32, Nearest)> = None;
        let mut stack = vec![0usize];
        while let Some(node_index) = stack.pop() {
            let node = &self.nodes[node_index];
            let bound = node.bounds.distance_squared(point);
            if let Some((best_d2, _)) = best {
                if bound > best_d2 {
                    continue;
                }
            }
            match node.kind {
                NodeKind::Leaf { start, count } => {
                    for &face in &self.order[start..start + count] {
                        let [a, b, c] = self.triangles[face];
                        let (closest, weights) = closest_point_on_triangle(point, &a, &b, &c);
                        let d2 = (closest - point).norm_squared();
                        let better = match best {
                            None => true,
                            Some((best_d2, ref current)) => {
                                d2 < best_d2 || (d2 == best_d2 && face < current.face)
                            }
                        };
                        if better {
                            best = Some((
                                d2,
                                Nearest {
                                    point: closest,
                                    face,
                                    distance: d2.sqrt(),
                                    weights,
                                },
                            ));
                        }
                    }
                }
                NodeKind::Inner { left, right } => {
                    // push the farther child first so the nearer one is visited first
                    let dl = self.nodes[left].bounds.distance_squared(point);
                    let dr = self.nodes[right].bounds.distance_squared(point);
                    if dl <= dr {
                        stack.push(right);
                        stack.push(left);
                    } else {
                        stack.push(left);
                        stack.push(right);
                    }
                }
            }
        }
        best.map(|(_, nearest)| nearest)
    }
}

/// Closest point on triangle `abc` to `p` and its barycentric weights
/// `(wa, wb, wc)`. Weights are clamped to the triangle, so they are always
/// non-negative and sum to one, degenerate triangles included.
pub fn closest_point_on_triangle(p: &Vec3, a: &Vec3, b: &Vec3, c: &Vec3) -> (Vec3, [f32; 3]) {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (*a, [1.0, 0.0, 0.0]);
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (*b, [0.0, 1.0, 0.0]);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 && (d1 - d3) > 0.0 {
        let v = d1 / (d1 - d3);
        return (a + ab * v, [1.0 - v, v, 0.0]);
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (*c, [0.0, 0.0, 1.0]);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 && (d2 - d6) > 0.0 {
        let w = d2 / (d2 - d6);
        return (a + ac * w, [1.0 - w, 0.0, w]);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 && ((d4 - d3) + (d5 - d6)) > 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, [0.0, 1.0 - w, w]);
    }

    let sum = va + vb + vc;
    if sum.abs() <= f32::EPSILON {
        return closest_point_on_edges(p, a, b, c);
    }
    let v = vb / sum;
    let w = vc / sum;
    (a + ab * v + ac * w, [1.0 - v - w, v, w])
}

/// Fallback for zero-area triangles: best of the three edge projections.
fn closest_point_on_edges(p: &Vec3, a: &Vec3, b: &Vec3, c: &Vec3) -> (Vec3, [f32; 3]) {
    let project = |from: &Vec3, to: &Vec3| -> (Vec3, f32) {
        let edge = to - from;
        let len2 = edge.norm_squared();
        let t = if len2 > 0.0 {
            ((p - from).dot(&edge) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (from + edge * t, t)
    };
    let (pab, tab) = project(a, b);
    let (pbc, tbc) = project(b, c);
    let (pca, tca) = project(c, a);
    let candidates = [
        (pab, [1.0 - tab, tab, 0.0]),
        (pbc, [0.0, 1.0 - tbc, tbc]),
        (pca, [tca, 0.0, 1.0 - tca]),
    ];
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if (candidate.0 - p).norm_squared() < (best.0 - p).norm_squared() {
            best = *candidate;
        }
    }
    best
}
