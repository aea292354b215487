use std::f32::consts::FRAC_PI_4;

use vat_bake_core::{
    bake, AnimationSegment, BakeConfig, BakeError, BakeInput, BakeObject, BakeStatus,
    FrameRange, KeyedMeshSource, Mesh, NamedMesh, PackingMode, SamplingMode, TransformConfig,
    Vec3,
};
use vat_test_fixtures::meshes::{cube, grid, proxy, rotate_z, translate, wave};

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn approx_vec(texel: &[f32], expected: Vec3, eps: f32) {
    for axis in 0..3 {
        approx(texel[axis], expected[axis], eps);
    }
}

/// Plain config: unit scale, no inversion, no remapping.
fn raw_config(start: i32, end: i32) -> BakeConfig {
    let mut cfg = BakeConfig::default();
    cfg.frames.range = FrameRange::Scene {
        start,
        end,
        step: 1,
    };
    cfg.transform = TransformConfig::identity();
    cfg.encode.remap_normals = false;
    cfg.encode.invert_v = false;
    cfg
}

fn texel(buffer: &[f32], index: usize) -> &[f32] {
    &buffer[index * 4..index * 4 + 4]
}

#[test]
fn cube_offsets_are_zero_at_reference_and_scaled_after() {
    let rest = cube();
    let moved = translate(&rest, Vec3::new(0.5, -0.25, 1.0));
    let source = KeyedMeshSource::new().with_key(1, rest.clone()).with_key(2, moved);
    let input = BakeInput::Animation(vec![BakeObject::new("Cube", source)]);

    let mut cfg = raw_config(1, 2);
    cfg.transform.scale = 100.0;
    cfg.layout.max_width = 16;
    let out = bake(&input, &cfg).unwrap();

    assert_eq!((out.layout.width, out.layout.height), (8, 2));
    for v in 0..8 {
        assert_eq!(texel(&out.offsets, v), &[0.0, 0.0, 0.0, 1.0]);
        approx_vec(texel(&out.offsets, 8 + v), Vec3::new(50.0, -25.0, 100.0), 1e-4);
        assert_eq!(texel(&out.offsets, 8 + v)[3], 1.0);
        approx_vec(texel(&out.normals, v), rest.normals[v], 1e-6);
    }
}

#[test]
fn retargeted_proxy_follows_rotating_cube_surface() {
    let rest = cube();
    let rotated = rotate_z(&rest, FRAC_PI_4);
    let source = KeyedMeshSource::new().with_key(1, rest).with_key(2, rotated);
    let target = proxy();
    let input = BakeInput::Animation(vec![
        BakeObject::new("Cube", source).with_target(NamedMesh::new("Proxy", target.clone())),
    ]);

    let out = bake(&input, &raw_config(1, 2)).unwrap();
    assert_eq!(out.layout.vertex_count, 4);
    assert_eq!(out.uvs[0].len(), 4);

    let (s, c) = FRAC_PI_4.sin_cos();
    let rot = |v: Vec3| Vec3::new(c * v.x - s * v.y, s * v.x + c * v.y, v.z);
    for (i, v) in target.positions.iter().enumerate() {
        let n_ref = v.normalize();
        // reference frame: outward face normal, no offset
        approx_vec(texel(&out.normals, i), n_ref, 1e-5);
        approx_vec(texel(&out.offsets, i), Vec3::zeros(), 1e-5);

        // rotated frame: normal turns with the face, the vertex swings on an
        // arc around the cube rather than sliding with the surface point
        let row = out.layout.frame_start(1);
        approx_vec(texel(&out.normals, row + i), rot(n_ref), 1e-5);
        approx_vec(texel(&out.offsets, row + i), rot(*v) - v, 1e-5);
    }
}

#[test]
fn objects_share_frame_rows_without_overlap() {
    let tri = Mesh::from_polygons(
        vec![Vec3::zeros(), Vec3::x(), Vec3::y()],
        &[vec![0, 1, 2]],
    );
    let a = KeyedMeshSource::new()
        .with_key(0, tri.clone())
        .with_key(1, translate(&tri, Vec3::x()));
    let b = KeyedMeshSource::new()
        .with_key(0, cube())
        .with_key(1, translate(&cube(), Vec3::z() * 2.0));
    let input = BakeInput::Animation(vec![BakeObject::new("Tri", a), BakeObject::new("Cube", b)]);

    let out = bake(&input, &raw_config(0, 1)).unwrap();
    assert_eq!(out.layout.vertex_count, 11);
    let row = out.layout.frame_start(1);
    for v in 0..3 {
        approx_vec(texel(&out.offsets, row + v), Vec3::x(), 1e-6);
    }
    for v in 3..11 {
        approx_vec(texel(&out.offsets, row + v), Vec3::new(0.0, 0.0, 2.0), 1e-6);
    }
    assert_eq!(out.uvs.len(), 2);
    assert_eq!(out.uvs[1].len(), 8);
    approx(out.uvs[1][0][0], (0.5 + 3.0) / out.layout.width as f32, 1e-6);
}

#[test]
fn same_input_bakes_identically() {
    let mesh = grid(6);
    let input = BakeInput::Animation(vec![
        BakeObject::new("Grid", vat_test_fixtures::meshes::wave(&mesh, 0, 12))
            .with_strips(vec![AnimationSegment::new("Wave", 0, 12)]),
    ]);
    let mut cfg = BakeConfig::default();
    cfg.frames.padding = 2;
    cfg.encode.remap_offsets = true;

    let first = bake(&input, &cfg).unwrap();
    let second = bake(&input, &cfg).unwrap();
    assert_eq!(first.offsets, second.offsets);
    assert_eq!(first.normals, second.normals);
    assert_eq!(first.schedule, second.schedule);
    assert_eq!(first.schedule.len(), 13 + 2);
    assert_ne!(first.report.id, second.report.id);
}

#[test]
fn remapped_offsets_decode_to_raw_offsets() {
    let mesh = grid(5);
    let source = || vat_test_fixtures::meshes::wave(&mesh, 0, 8);
    let mut raw_cfg = raw_config(0, 8);
    raw_cfg.transform.scale = 100.0;
    raw_cfg.transform.invert_y = true;
    let mut remap_cfg = raw_cfg.clone();
    remap_cfg.encode.remap_offsets = true;
    remap_cfg.encode.remap_normals = true;

    let raw = bake(&BakeInput::Animation(vec![BakeObject::new("Grid", source())]), &raw_cfg).unwrap();
    let remapped =
        bake(&BakeInput::Animation(vec![BakeObject::new("Grid", source())]), &remap_cfg).unwrap();

    let multiplier = remapped.bounds.remap.expect("remap multiplier is reported");
    assert_eq!(remapped.report.textures.offset_multiplier, Some(multiplier));
    for (i, (&encoded, &original)) in remapped.offsets.iter().zip(&raw.offsets).enumerate() {
        let channel = i % 4;
        if channel == 3 {
            continue;
        }
        assert!((0.0..=1.0).contains(&encoded), "texel value {encoded} out of range");
        approx((encoded * 2.0 - 1.0) * multiplier[channel], original, 1e-3);
    }
    for (&encoded, &original) in remapped.normals.iter().zip(&raw.normals) {
        approx(encoded * 2.0 - 1.0, original, 1e-6);
    }
}

#[test]
fn inverted_rows_put_last_frame_first() {
    let rest = cube();
    let source = KeyedMeshSource::new()
        .with_key(1, rest.clone())
        .with_key(2, translate(&rest, Vec3::x()));
    let input = BakeInput::Animation(vec![BakeObject::new("Cube", source)]);
    let mut cfg = raw_config(1, 2);
    cfg.encode.invert_v = true;
    let out = bake(&input, &cfg).unwrap();
    approx_vec(texel(&out.offsets, 0), Vec3::x(), 1e-6);
    approx_vec(texel(&out.offsets, 8), Vec3::zeros(), 1e-6);
    approx(out.uvs[0][0][1], 0.75, 1e-6);
}

#[test]
fn topology_change_fails_the_whole_bake() {
    let source = KeyedMeshSource::new().with_key(0, cube()).with_key(3, proxy());
    let input = BakeInput::Animation(vec![BakeObject::new("Morph", source)]);
    let result = bake(&input, &raw_config(0, 3));
    let status = BakeStatus::from_result(&result);
    assert!(!status.success);
    assert!(status.message.contains("Vertex count mismatch"));
    match result.unwrap_err() {
        BakeError::VertexCountMismatch { object, frame, .. } => {
            assert_eq!(object, "Morph");
            assert_eq!(frame, 3);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn layout_overflow_is_a_configuration_error() {
    let input = BakeInput::Animation(vec![BakeObject::new(
        "Cube",
        KeyedMeshSource::constant(cube()),
    )]);
    let mut cfg = raw_config(0, 9);
    cfg.layout.max_width = 8;
    cfg.layout.max_height = 4;
    let err = bake(&input, &cfg).unwrap_err();
    assert!(matches!(err, BakeError::LayoutOverflow { .. }));
    assert!(err.is_configuration());
}

#[test]
fn divergent_clip_boundaries_bake_without_padding() {
    let mk = |strips: Vec<AnimationSegment>| {
        BakeObject::new("Obj", KeyedMeshSource::constant(cube())).with_strips(strips)
    };
    let input = BakeInput::Animation(vec![
        mk(vec![
            AnimationSegment::new("Walk", 1, 3),
            AnimationSegment::new("Run", 5, 7),
        ]),
        mk(vec![AnimationSegment::new("Walk", 1, 3)]),
    ]);
    let mut cfg = raw_config(0, 0);
    cfg.frames.range = FrameRange::Nla;
    cfg.frames.padding = 1;
    let out = bake(&input, &cfg).unwrap();
    assert!(!out.schedule.padded);
    assert!(!out.report.frames.padded);
    assert_eq!(out.schedule.frames, vec![1, 2, 3, 5, 6, 7]);
}

#[test]
fn retarget_source_losing_a_face_fails_with_frame() {
    let rest = cube();
    let mut broken = rest.clone();
    broken.faces.pop();
    assert_eq!((rest.face_count(), broken.face_count()), (12, 11));
    let source = KeyedMeshSource::new().with_key(1, rest).with_key(2, broken);
    let input = BakeInput::Animation(vec![
        BakeObject::new("Cube", source).with_target(NamedMesh::new("Proxy", proxy())),
    ]);

    let err = bake(&input, &raw_config(1, 2)).unwrap_err();
    assert_eq!(
        err,
        BakeError::FaceCountMismatch {
            object: "Cube".into(),
            frame: 2,
            found: 11,
            expected: 12,
        }
    );
    assert_eq!(err.category(), "topology");
}

#[test]
fn failing_evaluation_names_object_and_frame() {
    let input = BakeInput::Animation(vec![BakeObject::new("Empty", KeyedMeshSource::new())]);
    let result = bake(&input, &raw_config(0, 3));

    let status = BakeStatus::from_result(&result);
    assert!(!status.success);
    assert!(status.message.contains("object Empty at frame 0"));
    match result.unwrap_err() {
        BakeError::Evaluation { object, frame, reason } => {
            assert_eq!(object, "Empty");
            assert_eq!(frame, 0);
            assert!(reason.contains("no keys"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn continuous_packing_places_frames_back_to_back() {
    let mesh = grid(3);
    let mut cfg = raw_config(0, 2);
    cfg.layout.max_width = 4;
    cfg.layout.packing = PackingMode::Continuous;
    let input = BakeInput::Animation(vec![BakeObject::new("Grid", wave(&mesh, 0, 2))]);
    let out = bake(&input, &cfg).unwrap();

    // 9 vertices at width 4: 2.25 rows per frame, 6.75 rows for 3 frames
    assert_eq!((out.layout.width, out.layout.height), (4, 7));
    assert_eq!(out.layout.frame_height, 2.25);
    assert_eq!(out.layout.sampling, SamplingMode::Continuous);

    let keys = wave(&mesh, 0, 2);
    for frame in 0..3 {
        assert_eq!(out.layout.frame_start(frame), 9 * frame);
        let posed = keys.evaluate(frame as i32).unwrap();
        for v in 0..9 {
            let expected = posed.positions[v] - mesh.positions[v];
            let written = texel(&out.offsets, 9 * frame + v);
            approx_vec(written, expected, 1e-6);
            assert_eq!(written[3], 1.0);
        }
    }
    // the single texel after the last frame stays empty
    assert_eq!(texel(&out.offsets, 27), &[0.0, 0.0, 0.0, 0.0]);

    let uvs = &out.uvs[0];
    assert_eq!(uvs.len(), 9);
    approx(uvs[8][0], 0.5 / 4.0, 1e-6);
    approx(uvs[8][1], 2.5 / 7.0, 1e-6);
}

#[test]
fn power_of_two_square_layout_with_remap_and_inversion() {
    let mesh = grid(3);
    let mut cfg = raw_config(0, 2);
    cfg.layout.max_width = 64;
    cfg.layout.max_height = 64;
    cfg.layout.force_power_of_two = true;
    cfg.layout.force_square = true;
    cfg.encode.remap_offsets = true;
    cfg.encode.remap_normals = true;
    cfg.encode.invert_v = true;
    let input = BakeInput::Animation(vec![BakeObject::new("Grid", wave(&mesh, 0, 2))]);
    let out = bake(&input, &cfg).unwrap();

    assert_eq!((out.layout.width, out.layout.height), (16, 16));
    assert!(out.layout.forced_power_of_two && out.layout.square);
    assert!(out.layout.underflow);
    assert_eq!(out.layout.sampling, SamplingMode::StackMultiple);
    assert_eq!(out.offsets.len(), 16 * 16 * 4);
    assert!(out.offsets.iter().all(|v| (0.0..=1.0).contains(v)));
    assert!(out.normals.iter().all(|v| (0.0..=1.0).contains(v)));

    // rows are flipped: frame 0 ends up in the last row, frame 2 two above it
    let multiplier = out.bounds.remap.expect("remap multiplier is reported");
    let posed = wave(&mesh, 0, 2).evaluate(2).unwrap();
    for v in 0..9 {
        let rest = texel(&out.offsets, 15 * 16 + v);
        assert_eq!(rest, &[0.5, 0.5, 0.5, 1.0]);
        let last = texel(&out.offsets, 13 * 16 + v);
        let expected = posed.positions[v] - mesh.positions[v];
        approx((last[2] * 2.0 - 1.0) * multiplier.z, expected.z, 1e-5);
    }
    approx(out.uvs[0][0][1], 1.0 - 0.5 / 16.0, 1e-6);
}
