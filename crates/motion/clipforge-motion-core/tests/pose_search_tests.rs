use std::sync::Arc;

use clipforge_motion_core::pose_search::{can_sample_index, pose_distance};
use clipforge_motion_core::{
    can_sample_pose, is_loop_clip, is_same_pose, sample_distance, Bone, BoneTrack, Clip,
    PoseSampleBoneConfig, PoseSampleCurveConfig, PoseSearchConfig, SampleAxis, ScalarCurve,
    Skeleton, Transform,
};
use glam::Vec3;

fn walk_clip() -> Clip {
    clipforge_test_fixtures::clips::load("walk-root-motion").expect("walk fixture")
}

/// Two feet crossing each other along Y.
fn gait_clip() -> Clip {
    let skeleton = Arc::new(
        Skeleton::new(vec![
            Bone::new("root", None, Transform::IDENTITY),
            Bone::new("foot_l", Some(0), Transform::IDENTITY),
            Bone::new("foot_r", Some(0), Transform::IDENTITY),
        ])
        .unwrap(),
    );
    let frames = 13;
    let mut clip = Clip::new(skeleton, "gait", (frames - 1) as f32 / 30.0, frames);
    let mut left = BoneTrack::new();
    let mut right = BoneTrack::new();
    for i in 0..frames {
        // Left foot swings from +30 to -30 and back; right foot mirrors.
        let phase = i as f32 / (frames - 1) as f32 * std::f32::consts::TAU;
        let y = 30.0 * phase.cos();
        left.push(&Transform::from_translation(Vec3::new(0.0, y, 0.0)));
        right.push(&Transform::from_translation(Vec3::new(0.0, -y, 0.0)));
    }
    clip.set_track("foot_l", left);
    clip.set_track("foot_r", right);
    clip
}

/// it should always find a pose equal to itself, for any tolerance >= 0
#[test]
fn pose_equality_is_reflexive() {
    let clip = walk_clip();
    for time in [0.0, 0.25, 0.5, 1.0] {
        assert!(is_same_pose(&clip, time, &clip, time, 0.0));
        assert!(is_same_pose(&clip, time, &clip, time, 1e-3));
    }
}

/// it should reject clearly different poses and report the accumulated diff
#[test]
fn pose_inequality_reports_diff() {
    use clipforge_motion_core::pose_search::is_same_pose_with_diff;
    let clip = gait_clip();
    let (same, diff) = is_same_pose_with_diff(&clip, 0.0, &clip, 0.1, 0.1);
    assert!(!same);
    assert!(diff > 0.0);
}

/// it should detect loopable clips by comparing first and last poses
#[test]
fn loop_detection() {
    // The gait clip is periodic: first and last poses coincide.
    assert!(is_loop_clip(&gait_clip(), 1e-2));
    // The walk clip ends 100 units away from where it started, but the root
    // is excluded from pose comparison and the pelvis never moves locally.
    assert!(is_loop_clip(&walk_clip(), 1e-2));
}

/// it should emit signed distances with jump keys at direction reversals
#[test]
fn sample_distance_signs_and_reversals() {
    let mut clip = gait_clip();
    let cfg = PoseSearchConfig {
        frame_rate: 30.0,
        axis: SampleAxis::Y,
        tolerance_frames: -1,
        bones: vec![
            PoseSampleBoneConfig {
                bone: "foot_l".into(),
                reference_bone: None,
                axis_weights: Vec3::ZERO,
                curves: vec![PoseSampleCurveConfig {
                    output_curve: "feet_position".into(),
                    reference_curve: None,
                    reference_value: 0.0,
                }],
            },
            PoseSampleBoneConfig {
                bone: "foot_r".into(),
                reference_bone: None,
                axis_weights: Vec3::ZERO,
                curves: Vec::new(),
            },
        ],
    };
    sample_distance(&mut clip, &cfg);

    let curve = clip.curve("feet_position").expect("distance curve");
    assert!(!curve.is_empty());

    // Left foot starts ahead of the right: positive separation of 60 units.
    assert!((pose_distance(&clip, 0.0, "feet_position") - 60.0).abs() < 1.0);
    // Mid-clip the feet have swapped: negative separation.
    assert!(pose_distance(&clip, clip.duration() * 0.5, "feet_position") < -30.0);
    // The sign flip is encoded as explicit jump keys, not interpolation.
    assert!(curve.keys().iter().any(|k| k.is_jump()));
    assert!(clip.is_modified());
}

/// it should gate sampling on a reference curve value with frame look-ahead
#[test]
fn gating_by_reference_curve() {
    let mut clip = gait_clip();
    let mut gate = ScalarCurve::new();
    gate.add_key(0.0, 1.0);
    gate.add_jump(0.2, 1.0, 0.0);
    clip.set_curve("gate", gate);

    let cfg = PoseSampleCurveConfig {
        output_curve: "out".into(),
        reference_curve: Some("gate".into()),
        reference_value: 1.0,
    };
    let dt = 1.0 / 30.0;

    assert!(can_sample_pose(&clip, 0.1, &cfg, 0, dt));
    assert!(!can_sample_pose(&clip, 0.3, &cfg, 0, dt));
    // Negative tolerance disables the gate.
    assert!(can_sample_pose(&clip, 0.3, &cfg, -1, dt));

    // Look-ahead: a gate that only opens at 0.2 admits earlier times when
    // the frame tolerance reaches into the open region.
    let mut opening = ScalarCurve::new();
    opening.add_key(0.0, 0.0);
    opening.add_jump(0.2, 0.0, 1.0);
    clip.set_curve("opening", opening);
    let late_cfg = PoseSampleCurveConfig {
        output_curve: "out".into(),
        reference_curve: Some("opening".into()),
        reference_value: 1.0,
    };
    assert!(!can_sample_pose(&clip, 0.15, &late_cfg, 0, dt));
    assert!(can_sample_pose(&clip, 0.15, &late_cfg, 2, dt));
}

/// it should find the first admitting (bone, curve) pair
#[test]
fn can_sample_index_walks_configs() {
    let mut clip = gait_clip();
    let mut gate = ScalarCurve::new();
    gate.add_key(0.0, 1.0);
    clip.set_curve("gate", gate);

    let cfg = PoseSearchConfig {
        frame_rate: 30.0,
        axis: SampleAxis::Y,
        tolerance_frames: 0,
        bones: vec![PoseSampleBoneConfig {
            bone: "foot_l".into(),
            reference_bone: None,
            axis_weights: Vec3::ZERO,
            curves: vec![
                PoseSampleCurveConfig {
                    output_curve: "out".into(),
                    reference_curve: Some("gate".into()),
                    reference_value: 5.0, // never matches
                },
                PoseSampleCurveConfig {
                    output_curve: "out2".into(),
                    reference_curve: Some("gate".into()),
                    reference_value: 1.0,
                },
            ],
        }],
    };
    assert_eq!(can_sample_index(&clip, 0.0, &cfg), Some((0, 1)));
}
