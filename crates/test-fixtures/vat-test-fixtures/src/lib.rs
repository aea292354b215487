//! Shared bake fixtures: JSON scenes (with optional bake configs) indexed by
//! `fixtures/manifest.json` at the workspace root, and procedural meshes.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static SCENE_INDEX: Lazy<SceneIndex> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../../../fixtures/manifest.json"))
        .expect("scene fixture manifest should parse")
});

/// `manifest.json`: scene name to its files, relative to `fixtures/`.
#[derive(Debug, Deserialize)]
struct SceneIndex {
    scenes: BTreeMap<String, SceneFiles>,
}

#[derive(Debug, Deserialize)]
struct SceneFiles {
    scene: String,
    #[serde(default)]
    config: Option<String>,
}

impl SceneIndex {
    fn files(&self, name: &str) -> Result<&SceneFiles> {
        self.scenes
            .get(name)
            .ok_or_else(|| anyhow!("no scene fixture named '{name}' in manifest.json"))
    }
}

impl SceneFiles {
    fn scene_text(&self) -> Result<String> {
        read_fixture(&self.scene)
    }

    fn config_text(&self) -> Result<Option<String>> {
        self.config.as_deref().map(read_fixture).transpose()
    }
}

fn fixture_path(file: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../../fixtures")
        .join(file)
}

fn read_fixture(file: &str) -> Result<String> {
    let path = fixture_path(file);
    fs::read_to_string(&path).with_context(|| format!("reading fixture {}", path.display()))
}

fn parse_fixture<T: DeserializeOwned>(file: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).with_context(|| format!("parsing fixture {file}"))
}

/// JSON scene descriptions with their optional bake configs.
pub mod scenes {
    use super::*;

    /// Scene names, sorted.
    pub fn keys() -> Vec<String> {
        SCENE_INDEX.scenes.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        SCENE_INDEX.files(name)?.scene_text()
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let files = SCENE_INDEX.files(name)?;
        parse_fixture(&files.scene, &files.scene_text()?)
    }

    pub fn config_json(name: &str) -> Result<Option<String>> {
        SCENE_INDEX.files(name)?.config_text()
    }

    pub fn config<T: DeserializeOwned>(name: &str) -> Result<Option<T>> {
        let files = SCENE_INDEX.files(name)?;
        match (&files.config, files.config_text()?) {
            (Some(file), Some(text)) => parse_fixture(file, &text).map(Some),
            _ => Ok(None),
        }
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(fixture_path(&SCENE_INDEX.files(name)?.scene))
    }
}

/// Procedural meshes shared by tests and benches.
pub mod meshes {
    use vat_bake_core::{KeyedMeshSource, Mesh, Vec3};

    /// Cube spanning `[-1, 1]^3` with 8 vertices; each corner normal points
    /// away from the centre.
    pub fn cube() -> Mesh {
        let mut positions = Vec::with_capacity(8);
        for &z in &[-1.0, 1.0] {
            for &(x, y) in &[(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push(Vec3::new(x, y, z));
            }
        }
        let quads = [
            vec![0, 3, 2, 1], // -Z
            vec![4, 5, 6, 7], // +Z
            vec![0, 1, 5, 4], // -Y
            vec![2, 3, 7, 6], // +Y
            vec![1, 2, 6, 5], // +X
            vec![3, 0, 4, 7], // -X
        ];
        let mut mesh = Mesh::from_polygons(positions, &quads);
        mesh.normals = mesh.positions.iter().map(|p| p.normalize()).collect();
        mesh
    }

    /// Four-vertex proxy ring hovering one unit outside the cube's side faces.
    pub fn proxy() -> Mesh {
        Mesh::from_polygons(
            vec![
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
                Vec3::new(-2.0, 0.0, 0.0),
                Vec3::new(0.0, -2.0, 0.0),
            ],
            &[vec![0, 1, 2, 3]],
        )
    }

    /// Flat `n x n` vertex grid in the XY plane, one unit between vertices.
    pub fn grid(n: usize) -> Mesh {
        let positions = (0..n * n)
            .map(|i| Vec3::new((i % n) as f32, (i / n) as f32, 0.0))
            .collect();
        let mut quads = Vec::with_capacity(n.saturating_sub(1).pow(2));
        for y in 0..n.saturating_sub(1) {
            for x in 0..n - 1 {
                let i = (y * n + x) as u32;
                let n = n as u32;
                quads.push(vec![i, i + 1, i + n + 1, i + n]);
            }
        }
        Mesh::from_polygons(positions, &quads)
    }

    /// Rotate positions and normals about +Z.
    pub fn rotate_z(mesh: &Mesh, radians: f32) -> Mesh {
        let (s, c) = radians.sin_cos();
        let rot = |v: &Vec3| Vec3::new(c * v.x - s * v.y, s * v.x + c * v.y, v.z);
        let mut out = mesh.clone();
        out.positions = mesh.positions.iter().map(rot).collect();
        out.normals = mesh.normals.iter().map(rot).collect();
        out
    }

    /// Translate every vertex by `delta`.
    pub fn translate(mesh: &Mesh, delta: Vec3) -> Mesh {
        let mut out = mesh.clone();
        out.positions.iter_mut().for_each(|p| *p += delta);
        out
    }

    /// Source keyed with `mesh` at `start` and a sine wave along Z at every
    /// later frame up to `end`.
    pub fn wave(mesh: &Mesh, start: i32, end: i32) -> KeyedMeshSource {
        let mut source = KeyedMeshSource::new().with_key(start, mesh.clone());
        for frame in (start + 1)..=end {
            let phase = (frame - start) as f32 * 0.25;
            let mut keyed = mesh.clone();
            keyed
                .positions
                .iter_mut()
                .for_each(|p| p.z = (p.x * 0.5 + phase).sin());
            keyed.recompute_normals();
            source.insert(frame, keyed);
        }
        source
    }
}
