//! Bake inputs: objects driven by a [`MeshSource`], mesh sequences, and the
//! serde scene description used by JSON fixtures and the wasm adapter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::{ContextError, EvaluationContext, MeshSource};
use crate::error::{BakeError, Result};
use crate::frames::AnimationSegment;
use crate::mesh::Mesh;

/// Mesh keyed at integer frames.
///
/// Between two keys with identical topology positions are interpolated
/// linearly and normals re-normalised; otherwise the lower key is held.
/// Frames outside the keyed range clamp to the nearest key.
#[derive(Clone, Debug, Default)]
pub struct KeyedMeshSource {
    keys: BTreeMap<i32, Mesh>,
}

impl KeyedMeshSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source that never changes.
    pub fn constant(mesh: Mesh) -> Self {
        Self::new().with_key(0, mesh)
    }

    pub fn with_key(mut self, frame: i32, mesh: Mesh) -> Self {
        self.insert(frame, mesh);
        self
    }

    pub fn insert(&mut self, frame: i32, mesh: Mesh) {
        self.keys.insert(frame, mesh);
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Geometry at `frame`; `None` when there are no keys.
    pub fn evaluate(&self, frame: i32) -> Option<Mesh> {
        let lower = self.keys.range(..=frame).next_back();
        let upper = self.keys.range(frame..).next();
        match (lower, upper) {
            (Some((&f0, m0)), Some((&f1, m1))) if f0 != f1 => {
                if m0.positions.len() != m1.positions.len()
                    || m0.normals.len() != m1.normals.len()
                    || m0.faces != m1.faces
                {
                    return Some(m0.clone());
                }
                let span = i64::from(f1) - i64::from(f0);
                let t = ((i64::from(frame) - i64::from(f0)) as f64 / span as f64) as f32;
                let positions = m0
                    .positions
                    .iter()
                    .zip(&m1.positions)
                    .map(|(a, b)| a.lerp(b, t))
                    .collect();
                let normals = m0
                    .normals
                    .iter()
                    .zip(&m1.normals)
                    .map(|(a, b)| a.lerp(b, t).try_normalize(f32::EPSILON).unwrap_or(*a))
                    .collect();
                Some(Mesh::new(positions, normals, m0.faces.clone()))
            }
            (Some((_, mesh)), _) | (None, Some((_, mesh))) => Some(mesh.clone()),
            (None, None) => None,
        }
    }
}

struct KeyedContext<'a> {
    source: &'a KeyedMeshSource,
    frame: i32,
}

impl EvaluationContext for KeyedContext<'_> {
    fn set_time(&mut self, frame: i32) -> std::result::Result<(), ContextError> {
        self.frame = frame;
        Ok(())
    }

    fn read_mesh(&mut self) -> std::result::Result<Mesh, ContextError> {
        self.source
            .evaluate(self.frame)
            .ok_or_else(|| ContextError::new("mesh source has no keys"))
    }
}

impl MeshSource for KeyedMeshSource {
    fn create_context(&self) -> Box<dyn EvaluationContext + '_> {
        Box::new(KeyedContext {
            source: self,
            frame: 0,
        })
    }
}

/// Named mesh; used for retargeting targets and mesh-sequence members.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedMesh {
    pub name: String,
    pub mesh: Mesh,
}

impl NamedMesh {
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            mesh,
        }
    }
}

pub type SequenceMesh = NamedMesh;

/// One animated object. With a `target`, the target mesh's vertices are baked
/// by tracking the source surface instead of the source's own vertices.
pub struct BakeObject {
    pub name: String,
    pub source: Box<dyn MeshSource>,
    /// Reference-pose target mesh.
    pub target: Option<NamedMesh>,
    pub nla_strips: Vec<AnimationSegment>,
}

impl BakeObject {
    pub fn new(name: impl Into<String>, source: impl MeshSource + 'static) -> Self {
        Self {
            name: name.into(),
            source: Box::new(source),
            target: None,
            nla_strips: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: NamedMesh) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_strips(mut self, strips: Vec<AnimationSegment>) -> Self {
        self.nla_strips = strips;
        self
    }
}

impl std::fmt::Debug for BakeObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BakeObject")
            .field("name", &self.name)
            .field("target", &self.target.as_ref().map(|t| &t.name))
            .field("nla_strips", &self.nla_strips)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum BakeInput {
    Animation(Vec<BakeObject>),
    MeshSequence(Vec<SequenceMesh>),
}

/// A mesh key of a described object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshKey {
    pub frame: i32,
    pub mesh: Mesh,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescription {
    pub name: String,
    pub keys: Vec<MeshKey>,
    #[serde(default)]
    pub target: Option<NamedMesh>,
    #[serde(default)]
    pub nla_strips: Vec<AnimationSegment>,
}

/// Serializable form of a [`BakeInput`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneDescription {
    Animation { objects: Vec<ObjectDescription> },
    MeshSequence { meshes: Vec<SequenceMesh> },
}

fn with_normals(mut mesh: Mesh) -> Mesh {
    if mesh.normals.is_empty() && !mesh.positions.is_empty() {
        mesh.recompute_normals();
    }
    mesh
}

impl SceneDescription {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the bake input. Meshes without normals get recomputed ones.
    pub fn into_input(self) -> Result<BakeInput> {
        match self {
            SceneDescription::Animation { objects } => {
                let mut out = Vec::with_capacity(objects.len());
                for obj in objects {
                    if obj.keys.is_empty() {
                        return Err(BakeError::config(format!(
                            "object {} has no mesh keys",
                            obj.name
                        )));
                    }
                    let mut source = KeyedMeshSource::new();
                    for key in obj.keys {
                        source.insert(key.frame, with_normals(key.mesh));
                    }
                    let mut object =
                        BakeObject::new(obj.name, source).with_strips(obj.nla_strips);
                    if let Some(target) = obj.target {
                        let mesh = with_normals(target.mesh);
                        object = object.with_target(NamedMesh::new(target.name, mesh));
                    }
                    out.push(object);
                }
                Ok(BakeInput::Animation(out))
            }
            SceneDescription::MeshSequence { meshes } => Ok(BakeInput::MeshSequence(
                meshes
                    .into_iter()
                    .map(|m| NamedMesh::new(m.name, with_normals(m.mesh)))
                    .collect(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vec3;
    use approx::assert_relative_eq;

    fn tri(offset: f32) -> Mesh {
        Mesh::from_polygons(
            vec![
                Vec3::new(0.0, 0.0, offset),
                Vec3::new(1.0, 0.0, offset),
                Vec3::new(0.0, 1.0, offset),
            ],
            &[vec![0, 1, 2]],
        )
    }

    #[test]
    fn keys_interpolate_and_clamp() {
        let source = KeyedMeshSource::new().with_key(0, tri(0.0)).with_key(10, tri(2.0));
        assert_eq!(source.key_count(), 2);
        assert_relative_eq!(source.evaluate(5).unwrap().positions[0].z, 1.0, epsilon = 1e-6);
        assert_eq!(source.evaluate(-3).unwrap(), tri(0.0));
        assert_eq!(source.evaluate(10).unwrap(), tri(2.0));
        assert_eq!(source.evaluate(42).unwrap(), tri(2.0));
    }

    #[test]
    fn extreme_key_frames_interpolate_without_overflow() {
        let source = KeyedMeshSource::new()
            .with_key(i32::MIN, tri(0.0))
            .with_key(i32::MAX, tri(2.0));
        let mid = source.evaluate(0).unwrap();
        assert_relative_eq!(mid.positions[0].z, 1.0, epsilon = 1e-6);
        assert_eq!(source.evaluate(i32::MAX).unwrap(), tri(2.0));
    }

    #[test]
    fn topology_change_holds_lower_key() {
        let mut quad = Mesh::from_polygons(
            vec![Vec3::zeros(), Vec3::x(), Vec3::new(1.0, 1.0, 0.0), Vec3::y()],
            &[vec![0, 1, 2, 3]],
        );
        quad.positions[0].z = 5.0;
        let source = KeyedMeshSource::new().with_key(0, tri(0.0)).with_key(4, quad);
        assert_eq!(source.evaluate(2).unwrap(), tri(0.0));
    }

    #[test]
    fn context_reads_at_set_time() {
        let source = KeyedMeshSource::new().with_key(1, tri(0.0)).with_key(3, tri(4.0));
        let mut ctx = source.create_context();
        ctx.set_time(2).unwrap();
        assert_relative_eq!(ctx.read_mesh().unwrap().positions[1].z, 2.0, epsilon = 1e-6);
        assert!(KeyedMeshSource::new().create_context().read_mesh().is_err());
    }

    #[test]
    fn description_recomputes_missing_normals() {
        let json = r#"{
            "kind": "animation",
            "objects": [{
                "name": "Tri",
                "keys": [{ "frame": 1, "mesh": { "positions": [[0,0,0],[1,0,0],[0,1,0]], "faces": [[0,1,2]] } }],
                "nla_strips": [{ "name": "Idle", "start": 1, "end": 4 }]
            }]
        }"#;
        let input = SceneDescription::from_json(json).unwrap().into_input().unwrap();
        let BakeInput::Animation(objects) = input else {
            panic!("expected animation input");
        };
        assert_eq!(objects[0].nla_strips[0], AnimationSegment::new("Idle", 1, 4));
        let mesh = objects[0].source.create_context().read_mesh().unwrap();
        assert_relative_eq!(mesh.normals[0], Vec3::z(), epsilon = 1e-6);
    }

    #[test]
    fn object_without_keys_is_rejected() {
        let scene = SceneDescription::Animation {
            objects: vec![ObjectDescription {
                name: "Empty".into(),
                keys: Vec::new(),
                target: None,
                nla_strips: Vec::new(),
            }],
        };
        assert!(matches!(
            scene.into_input(),
            Err(BakeError::InvalidConfig { .. })
        ));
    }
}
