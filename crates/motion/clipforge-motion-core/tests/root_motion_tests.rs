use std::sync::Arc;

use clipforge_motion_core::bone::component_transform;
use clipforge_motion_core::root_motion::apply_root_motion_ratio;
use clipforge_motion_core::{
    convert_motion_to_root, convert_root_to_motion, extract_root_motion_range,
    sample_motion_curves, AxisWeights, Bone, BoneCurveSet, BoneTrack, Clip, MotionConvertConfig,
    MotionSampleConfig, Skeleton, Transform,
};
use glam::Vec3;

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn walk_clip() -> Clip {
    clipforge_test_fixtures::clips::load("walk-root-motion").expect("walk fixture")
}

/// Root static, pelvis drifting forward: the motion-capture shape.
fn capture_clip() -> Clip {
    let skeleton = Arc::new(
        Skeleton::new(vec![
            Bone::new("root", None, Transform::IDENTITY),
            Bone::new(
                "pelvis",
                Some(0),
                Transform::from_translation(Vec3::new(0.0, 0.0, 90.0)),
            ),
        ])
        .unwrap(),
    );
    let mut clip = Clip::new(skeleton, "capture", 1.0, 11);
    let mut root = BoneTrack::new();
    let mut pelvis = BoneTrack::new();
    for i in 0..11 {
        root.push(&Transform::IDENTITY);
        pelvis.push(&Transform::from_translation(Vec3::new(
            0.0,
            10.0 * i as f32,
            90.0,
        )));
    }
    clip.set_track("root", root);
    clip.set_track("pelvis", pelvis);
    clip
}

fn pelvis_component_poses(clip: &Clip) -> Vec<Transform> {
    (0..clip.num_frames())
        .map(|f| component_transform(clip, clip.time_at_frame(f), "pelvis", true))
        .collect()
}

/// it should report the root displacement over a clamped time range
#[test]
fn extract_range_reports_displacement() {
    let clip = walk_clip();
    let half = extract_root_motion_range(&clip, 0.0, 0.5);
    approx(half.translation.y, 50.0, 1e-3);
    // Out-of-range times clamp.
    let all = extract_root_motion_range(&clip, -5.0, 99.0);
    approx(all.translation.y, 100.0, 1e-3);
}

/// it should move the motion bone's drift onto the root while preserving the
/// component-space pose
#[test]
fn motion_to_root_preserves_pose() {
    let mut clip = capture_clip();
    let before = pelvis_component_poses(&clip);

    let cfg = MotionSampleConfig {
        motion_bone: "pelvis".into(),
        global_weight: 1.0,
        translation_weights: AxisWeights::horizontal(1.0),
        rotation_weights: AxisWeights::default(),
        resize_to_origin: false,
    };
    let curves = sample_motion_curves(&clip, &cfg);
    convert_motion_to_root(&mut clip, &cfg, &curves);

    // Root now carries the forward drift.
    let root = clip.bone_track("root").unwrap();
    approx(root.translation_keys[10].y, 100.0, 1e-3);
    // Pelvis local track has been rebased.
    let pelvis = clip.bone_track("pelvis").unwrap();
    approx(pelvis.translation_keys[10].y, 0.0, 1e-3);
    approx(pelvis.translation_keys[10].z, 90.0, 1e-3);

    let after = pelvis_component_poses(&clip);
    for (a, b) in before.iter().zip(&after) {
        assert!(a.approx_eq(b, 1e-3), "pose drifted: {a:?} vs {b:?}");
    }
    assert!(clip.is_modified());
}

/// it should move the root's motion onto the motion bone while preserving
/// the component-space pose
#[test]
fn root_to_motion_preserves_pose() {
    let mut clip = walk_clip();
    let before = pelvis_component_poses(&clip);

    let cfg = MotionSampleConfig {
        motion_bone: "pelvis".into(),
        global_weight: 1.0,
        translation_weights: AxisWeights::all(1.0),
        rotation_weights: AxisWeights::default(),
        resize_to_origin: false,
    };
    convert_root_to_motion(&mut clip, &cfg);

    // Root flattened, pelvis carries the travel.
    let root = clip.bone_track("root").unwrap();
    approx(root.translation_keys[30].y, 0.0, 1e-3);
    let pelvis = clip.bone_track("pelvis").unwrap();
    approx(pelvis.translation_keys[30].y, 100.0, 1e-3);

    let after = pelvis_component_poses(&clip);
    for (a, b) in before.iter().zip(&after) {
        assert!(a.approx_eq(b, 1e-3), "pose drifted: {a:?} vs {b:?}");
    }
}

/// it should split a channel between the bones for fractional weights
#[test]
fn root_to_motion_splits_fractional_weight() {
    let mut clip = walk_clip();
    let cfg = MotionSampleConfig {
        motion_bone: "pelvis".into(),
        global_weight: 1.0,
        translation_weights: AxisWeights {
            x: None,
            y: Some(0.25),
            z: None,
        },
        rotation_weights: AxisWeights::default(),
        resize_to_origin: false,
    };
    convert_root_to_motion(&mut clip, &cfg);

    let root = clip.bone_track("root").unwrap();
    approx(root.translation_keys[30].y, 75.0, 1e-3);
    let pelvis = clip.bone_track("pelvis").unwrap();
    approx(pelvis.translation_keys[30].y, 25.0, 1e-3);
}

/// it should scale root channels by the configured ratios and cancel the
/// motion bone's residual when asked
#[test]
fn ratio_scaling_with_relative_removal() {
    let mut clip = walk_clip();
    let sample_cfg = MotionSampleConfig {
        motion_bone: "pelvis".into(),
        ..Default::default()
    };
    let convert = MotionConvertConfig {
        translation_ratio: Vec3::new(1.0, 0.5, 1.0),
        remove_relative_motion: true,
        ..Default::default()
    };
    let mut curves = BoneCurveSet::new();
    apply_root_motion_ratio(&mut clip, &sample_cfg, &convert, &mut curves);

    let root = clip.bone_track("root").unwrap();
    approx(root.translation_keys[30].y, 50.0, 1e-3);

    // The pelvis still sits directly above the (scaled) root.
    let pelvis = clip.bone_track("pelvis").unwrap();
    approx(pelvis.translation_keys[30].y, 0.0, 1e-3);
    approx(pelvis.translation_keys[30].z, 90.0, 1e-3);
}

/// it should report per-axis apex displacement and peak speed
#[test]
fn apex_reports_extremes() {
    use clipforge_motion_core::root_motion::root_motion_apex;
    let clip = walk_clip();
    let (apex, max_speed) = root_motion_apex(&clip);
    approx(apex.translation.y, 100.0, 1e-2);
    approx(apex.translation.x, 0.0, 1e-3);
    // 100 units over one second, uniform speed.
    approx(max_speed, 100.0, 1.0);
}

/// it should reduce all six channels of a curve set in one filter pass
#[test]
fn curve_set_filter_reduces_channels() {
    use clipforge_motion_core::{sample_root_motion_curves, FilterKind};
    let clip = walk_clip();
    let mut curves = sample_root_motion_curves(&clip);
    let before = curves.translation[1].len();
    curves.filter(FilterKind::Reduce, 1e-3);
    // Linear travel collapses to its endpoints.
    assert!(curves.translation[1].len() < before);
    approx(curves.evaluate_translation(0.5).y, 50.0, 0.1);
}

/// it should sample per-frame motion deltas weighted per axis
#[test]
fn motion_curves_are_weighted() {
    let clip = capture_clip();
    let cfg = MotionSampleConfig {
        motion_bone: "pelvis".into(),
        global_weight: 0.5,
        translation_weights: AxisWeights::horizontal(1.0),
        rotation_weights: AxisWeights::default(),
        resize_to_origin: false,
    };
    let curves = sample_motion_curves(&clip, &cfg);
    assert!(curves.has_data());
    // Half of the 100-unit drift at the final frame.
    approx(curves.evaluate_translation(1.0).y, 50.0, 1e-3);
    // Height is not a weighted axis.
    approx(curves.evaluate_translation(1.0).z, 0.0, 1e-3);
}
