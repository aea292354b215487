//! Buffer sampling.
//!
//! Walks every scheduled frame of every object and writes one RGBA texel per
//! vertex into the offset and normal buffers. Objects are laid out one after
//! another inside each frame, so several meshes share one texture.

use log::debug;

use crate::bounds::{Bounds, BoundsTracker};
use crate::config::TransformConfig;
use crate::context::ContextError;
use crate::correspondence::CorrespondenceTable;
use crate::error::{BakeError, Result};
use crate::frames::FrameSchedule;
use crate::layout::TextureLayout;
use crate::mesh::Mesh;
use crate::scene::{BakeObject, SequenceMesh};
use crate::Vec3;

/// Raw sampled buffers, `width * height * 4` floats each.
#[derive(Clone, Debug, PartialEq)]
pub struct SampledBuffers {
    pub offsets: Vec<f32>,
    pub normals: Vec<f32>,
    pub bounds: Bounds,
}

struct BufferWriter<'a> {
    layout: &'a TextureLayout,
    signed_scale: Vec3,
    signed_axis: Vec3,
    offsets: Vec<f32>,
    normals: Vec<f32>,
    bounds: BoundsTracker,
}

impl<'a> BufferWriter<'a> {
    fn new(layout: &'a TextureLayout, transform: &TransformConfig) -> Self {
        let len = layout.buffer_len();
        Self {
            layout,
            signed_scale: transform.signed_scale(),
            signed_axis: transform.signed_axis(),
            offsets: vec![0.0; len],
            normals: vec![0.0; len],
            bounds: BoundsTracker::default(),
        }
    }

    /// `vertex` is the texel index within a frame, across all objects.
    fn write(&mut self, row: usize, vertex: usize, offset: &Vec3, normal: &Vec3) {
        let base = (self.layout.frame_start(row) + vertex) * 4;
        let offset = offset.component_mul(&self.signed_scale);
        let normal = normal.component_mul(&self.signed_axis);
        self.offsets[base..base + 4].copy_from_slice(&[offset.x, offset.y, offset.z, 1.0]);
        self.normals[base..base + 4].copy_from_slice(&[normal.x, normal.y, normal.z, 1.0]);
        self.bounds.offset(&offset);
    }

    /// Reject objects that would write past a frame's texels.
    fn reserve(&self, first_vertex: usize, count: usize, object: &str) -> Result<()> {
        if first_vertex + count > self.layout.vertex_count {
            return Err(BakeError::config(format!(
                "object {object} needs vertices {first_vertex}..{} but the layout holds {}",
                first_vertex + count,
                self.layout.vertex_count
            )));
        }
        Ok(())
    }

    fn finish(self) -> SampledBuffers {
        SampledBuffers {
            bounds: self.bounds.finish(&self.signed_scale),
            offsets: self.offsets,
            normals: self.normals,
        }
    }
}

fn evaluation_error(object: &str, frame: i32, err: ContextError) -> BakeError {
    BakeError::Evaluation {
        object: object.to_string(),
        frame,
        reason: err.to_string(),
    }
}

/// Check a sampled frame against the reference topology.
fn check_topology(
    mesh: &Mesh,
    reference: &Mesh,
    object: &str,
    frame: i32,
    faces: bool,
) -> Result<()> {
    if mesh.vertex_count() != reference.vertex_count() {
        return Err(BakeError::VertexCountMismatch {
            object: object.to_string(),
            frame,
            found: mesh.vertex_count(),
            expected: reference.vertex_count(),
        });
    }
    if faces && mesh.face_count() != reference.face_count() {
        return Err(BakeError::FaceCountMismatch {
            object: object.to_string(),
            frame,
            found: mesh.face_count(),
            expected: reference.face_count(),
        });
    }
    mesh.validate()
}

/// Sample animated objects over `schedule`. Each object's reference pose is
/// evaluated at the schedule's start frame; its correspondence table, when
/// retargeted, is resolved once against that pose.
pub fn sample_animation(
    objects: &[BakeObject],
    schedule: &FrameSchedule,
    layout: &TextureLayout,
    transform: &TransformConfig,
) -> Result<SampledBuffers> {
    let mut writer = BufferWriter::new(layout, transform);
    let reference_frame = schedule.reference_frame();
    let mut first_vertex = 0;

    for object in objects {
        let name = object.name.as_str();
        let mut ctx = object.source.create_context();
        ctx.set_time(reference_frame)
            .map_err(|e| evaluation_error(name, reference_frame, e))?;
        let reference = ctx
            .read_mesh()
            .map_err(|e| evaluation_error(name, reference_frame, e))?;
        reference.validate()?;

        let table = match &object.target {
            Some(target) => Some(CorrespondenceTable::resolve(&reference, &target.mesh)?),
            None => None,
        };
        let count = table.as_ref().map_or(reference.vertex_count(), |t| t.len());
        writer.reserve(first_vertex, count, name)?;

        match &table {
            Some(table) => table
                .iter()
                .for_each(|c| writer.bounds.reference(&c.reference_point)),
            None => reference
                .positions
                .iter()
                .for_each(|p| writer.bounds.reference(p)),
        }
        debug!(
            "sampling {name}: {count} vertices over {} frames{}",
            schedule.len(),
            if table.is_some() { " (retargeted)" } else { "" }
        );

        for (row, &frame) in schedule.frames.iter().enumerate() {
            ctx.set_time(frame)
                .map_err(|e| evaluation_error(name, frame, e))?;
            let mesh = ctx
                .read_mesh()
                .map_err(|e| evaluation_error(name, frame, e))?;
            check_topology(&mesh, &reference, name, frame, table.is_some())?;

            match &table {
                Some(table) => {
                    for (i, correspondence) in table.iter().enumerate() {
                        let tracked = correspondence.track(&mesh);
                        writer.bounds.sample(&tracked.position);
                        let offset = correspondence.offset(&tracked);
                        writer.write(row, first_vertex + i, &offset, &tracked.normal);
                    }
                }
                None => {
                    for (i, vertex) in mesh.vertices().enumerate() {
                        writer.bounds.sample(&vertex.position);
                        let offset = vertex.position - reference.positions[i];
                        writer.write(row, first_vertex + i, &offset, &vertex.normal);
                    }
                }
            }
        }
        first_vertex += count;
    }

    Ok(writer.finish())
}

/// Sample a mesh sequence: `meshes[frame]` is the geometry of `frame`, and the
/// first mesh is the reference pose.
pub fn sample_sequence(
    meshes: &[&SequenceMesh],
    schedule: &FrameSchedule,
    layout: &TextureLayout,
    transform: &TransformConfig,
) -> Result<SampledBuffers> {
    let mut writer = BufferWriter::new(layout, transform);
    let Some(first) = meshes.first() else {
        return Err(BakeError::NothingToBake {
            reason: "mesh sequence is empty".to_string(),
        });
    };
    let reference = &first.mesh;
    reference.validate()?;
    writer.reserve(0, reference.vertex_count(), &first.name)?;
    reference
        .positions
        .iter()
        .for_each(|p| writer.bounds.reference(p));

    for (row, &frame) in schedule.frames.iter().enumerate() {
        let member = usize::try_from(frame)
            .ok()
            .and_then(|i| meshes.get(i))
            .ok_or_else(|| BakeError::Evaluation {
                object: first.name.clone(),
                frame,
                reason: format!("sequence has {} meshes", meshes.len()),
            })?;
        check_topology(&member.mesh, reference, &member.name, frame, false)?;
        for (i, vertex) in member.mesh.vertices().enumerate() {
            writer.bounds.sample(&vertex.position);
            let offset = vertex.position - reference.positions[i];
            writer.write(row, i, &offset, &vertex.normal);
        }
    }

    Ok(writer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::frames::schedule_sequence;
    use crate::layout::plan;
    use crate::scene::{KeyedMeshSource, NamedMesh};
    use approx::assert_relative_eq;

    fn tri(z: f32) -> Mesh {
        Mesh::from_polygons(
            vec![
                Vec3::new(0.0, 0.0, z),
                Vec3::new(1.0, 0.0, z),
                Vec3::new(0.0, 1.0, z),
            ],
            &[vec![0, 1, 2]],
        )
    }

    fn schedule(frames: Vec<i32>) -> FrameSchedule {
        let mut s = schedule_sequence(frames.len()).unwrap();
        s.start_frame = frames[0];
        s.end_frame = *frames.last().unwrap();
        s.frames = frames;
        s
    }

    #[test]
    fn offsets_are_measured_from_the_reference_frame() {
        let source = KeyedMeshSource::new().with_key(1, tri(0.0)).with_key(3, tri(2.0));
        let objects = vec![BakeObject::new("Tri", source)];
        let schedule = schedule(vec![1, 2, 3]);
        let layout = plan(3, 3, &LayoutConfig::default()).unwrap();
        let out = sample_animation(&objects, &schedule, &layout, &TransformConfig::identity())
            .unwrap();

        assert!(out.offsets[..12].chunks(4).all(|t| t == [0.0, 0.0, 0.0, 1.0]));
        assert_relative_eq!(out.offsets[12 + 2], 1.0, epsilon = 1e-6);
        assert_relative_eq!(out.offsets[24 + 2], 2.0, epsilon = 1e-6);
        assert_eq!(&out.normals[..4], &[0.0, 0.0, 1.0, 1.0]);
        assert_eq!(out.bounds.max.z, 2.0);
    }

    #[test]
    fn transform_scales_offsets_and_flips_normals() {
        let source = KeyedMeshSource::new().with_key(0, tri(0.0)).with_key(1, tri(0.5));
        let objects = vec![BakeObject::new("Tri", source)];
        let schedule = schedule(vec![0, 1]);
        let layout = plan(3, 2, &LayoutConfig::default()).unwrap();
        let transform = TransformConfig {
            invert_z: true,
            ..TransformConfig::default()
        };
        let out = sample_animation(&objects, &schedule, &layout, &transform).unwrap();
        assert_relative_eq!(out.offsets[12 + 2], -50.0, epsilon = 1e-4);
        assert_eq!(out.normals[2], -1.0);
        assert_relative_eq!(out.bounds.peak_offset.z, 50.0, epsilon = 1e-4);
    }

    #[test]
    fn topology_change_aborts_with_frame() {
        let quad = Mesh::from_polygons(
            vec![Vec3::zeros(), Vec3::x(), Vec3::new(1.0, 1.0, 0.0), Vec3::y()],
            &[vec![0, 1, 2, 3]],
        );
        let source = KeyedMeshSource::new().with_key(0, tri(0.0)).with_key(5, quad);
        let objects = vec![BakeObject::new("Morph", source)];
        let schedule = schedule(vec![0, 5]);
        let layout = plan(3, 2, &LayoutConfig::default()).unwrap();
        let err = sample_animation(&objects, &schedule, &layout, &TransformConfig::identity())
            .unwrap_err();
        assert_eq!(
            err,
            BakeError::VertexCountMismatch {
                object: "Morph".into(),
                frame: 5,
                found: 4,
                expected: 3
            }
        );
    }

    #[test]
    fn sequence_indexes_meshes_by_frame() {
        let meshes = [NamedMesh::new("Seq.000", tri(0.0)), NamedMesh::new("Seq.001", tri(1.0))];
        let refs: Vec<&SequenceMesh> = meshes.iter().collect();
        let schedule = schedule_sequence(2).unwrap();
        let layout = plan(3, 2, &LayoutConfig::default()).unwrap();
        let out = sample_sequence(&refs, &schedule, &layout, &TransformConfig::identity()).unwrap();
        assert_eq!(out.offsets[2], 0.0);
        assert_eq!(out.offsets[12 + 2], 1.0);
        assert_eq!(out.bounds.ref_max.z, 0.0);
    }

    #[test]
    fn oversized_object_is_rejected() {
        let objects = vec![BakeObject::new("Tri", KeyedMeshSource::constant(tri(0.0)))];
        let schedule = schedule(vec![0, 1]);
        let layout = plan(2, 2, &LayoutConfig::default()).unwrap();
        assert!(matches!(
            sample_animation(&objects, &schedule, &layout, &TransformConfig::identity()),
            Err(BakeError::InvalidConfig { .. })
        ));
    }
}
