use std::sync::Arc;

use clipforge_motion_core::{
    sample_contact_curves, sample_weight_curves, Bone, BoneTrack, Clip, ContactSampleConfig,
    ContactSmoothing, LegConfig, Skeleton, Transform,
};
use glam::Vec3;

fn foot_leg() -> LegConfig {
    LegConfig {
        foot_bone: "foot_l".into(),
        tip_bone: None,
        tip_socket_offset: Vec3::ZERO,
        heel_socket_offset: Vec3::ZERO,
    }
}

fn heights_clip(heights: &[f32]) -> Clip {
    let skeleton = Arc::new(
        Skeleton::new(vec![
            Bone::new("root", None, Transform::IDENTITY),
            Bone::new("foot_l", Some(0), Transform::IDENTITY),
        ])
        .unwrap(),
    );
    let duration = (heights.len() - 1) as f32 / 30.0;
    let mut clip = Clip::new(skeleton, "heights", duration, heights.len());
    let mut track = BoneTrack::new();
    for h in heights {
        track.push(&Transform::from_translation(Vec3::new(0.0, 0.0, *h)));
    }
    clip.set_track("foot_l", track);
    clip
}

fn landed_per_frame(clip: &Clip, curve: &str) -> Vec<bool> {
    let c = clip.curve(curve).expect("contact curve");
    (0..clip.num_frames())
        .map(|f| c.eval(clip.time_at_frame(f)) > 0.5)
        .collect()
}

/// it should classify the hop sequence with hysteresis exactly as specified:
/// frames 0,1,6,7 landed, 2..5 airborne, transitions between 1-2 and 5-6
#[test]
fn hop_sequence_classification() {
    let mut clip: Clip =
        clipforge_test_fixtures::clips::load("hop-heights").expect("hop fixture");
    let cfg = ContactSampleConfig {
        grounded_height: 0.0,
        landed_tolerance: 1.0,
        air_tolerance: 5.0,
        ..Default::default()
    };
    sample_contact_curves(&mut clip, &cfg, &[foot_leg()]);

    let landed = landed_per_frame(&clip, "foot_contact");
    assert_eq!(
        landed,
        vec![true, true, false, false, false, false, true, true]
    );

    // The transition keys are sharp jumps.
    let curve = clip.curve("foot_contact").unwrap();
    assert!(curve.keys().iter().filter(|k| k.is_jump()).count() >= 2);
    assert!(clip.is_modified());
}

/// it should produce identical classifications on repeated runs
#[test]
fn classification_is_deterministic() {
    let heights = [0.0, 0.0, 2.0, 8.0, 8.0, 2.0, 0.0, 0.0];
    let cfg = ContactSampleConfig {
        grounded_height: 0.0,
        landed_tolerance: 1.0,
        air_tolerance: 5.0,
        ..Default::default()
    };

    let mut first = heights_clip(&heights);
    sample_contact_curves(&mut first, &cfg, &[foot_leg()]);
    let mut second = heights_clip(&heights);
    sample_contact_curves(&mut second, &cfg, &[foot_leg()]);

    assert_eq!(first.curve("foot_contact"), second.curve("foot_contact"));
}

/// it should use different thresholds per state: a height inside the landed
/// margin but above the touchdown threshold keeps its current state
#[test]
fn hysteresis_depends_on_current_state() {
    // landed_tolerance 2, air_tolerance 1: 1.5 keeps a landed foot landed
    // but does not let an airborne foot touch down.
    let heights = [0.0, 1.5, 0.0, 1.5, 3.0, 1.5, 0.0];
    let mut clip = heights_clip(&heights);
    let cfg = ContactSampleConfig {
        grounded_height: 0.0,
        landed_tolerance: 2.0,
        air_tolerance: 1.0,
        ..Default::default()
    };
    sample_contact_curves(&mut clip, &cfg, &[foot_leg()]);

    let landed = landed_per_frame(&clip, "foot_contact");
    assert_eq!(landed, vec![true, true, true, true, false, false, true]);
}

/// it should classify by drift from a recorded idle pose when configured
#[test]
fn idle_pose_classification() {
    // The foot stays on the ground plane but slides away horizontally.
    let offsets = [0.0, 0.5, 3.0, 0.2];
    let skeleton = Arc::new(
        Skeleton::new(vec![
            Bone::new("root", None, Transform::IDENTITY),
            Bone::new("foot_l", Some(0), Transform::IDENTITY),
        ])
        .unwrap(),
    );
    let mut clip = Clip::new(skeleton, "slide", 3.0 / 30.0, 4);
    let mut track = BoneTrack::new();
    for y in offsets {
        track.push(&Transform::from_translation(Vec3::new(0.0, y, 0.0)));
    }
    clip.set_track("foot_l", track);

    let cfg = ContactSampleConfig {
        idle_pose_frame: Some(0),
        horizontal_tolerance: Some(1.0),
        ..Default::default()
    };
    sample_contact_curves(&mut clip, &cfg, &[foot_leg()]);

    let landed = landed_per_frame(&clip, "foot_contact");
    assert_eq!(landed, vec![true, true, false, true]);
}

/// it should name one curve per leg and fall back to the first name
#[test]
fn per_leg_curves_and_ranges() {
    let heights = [0.0, 5.0, 0.0];
    let mut clip = {
        let skeleton = Arc::new(
            Skeleton::new(vec![
                Bone::new("root", None, Transform::IDENTITY),
                Bone::new("foot_l", Some(0), Transform::IDENTITY),
                Bone::new("foot_r", Some(0), Transform::IDENTITY),
            ])
            .unwrap(),
        );
        let mut clip = Clip::new(skeleton, "two-legs", 2.0 / 30.0, 3);
        for name in ["foot_l", "foot_r"] {
            let mut track = BoneTrack::new();
            for h in heights {
                track.push(&Transform::from_translation(Vec3::new(0.0, 0.0, h)));
            }
            clip.set_track(name, track);
        }
        clip
    };

    let legs = vec![
        foot_leg(),
        LegConfig {
            foot_bone: "foot_r".into(),
            ..foot_leg()
        },
    ];
    let cfg = ContactSampleConfig {
        curve_names: vec!["contact_l".into(), "contact_r".into()],
        apex_ranges: vec![(0.0, 1.0), (0.0, 2.0)],
        landed_tolerance: 1.0,
        air_tolerance: 1.0,
        ..Default::default()
    };
    sample_contact_curves(&mut clip, &cfg, &legs);

    assert!(clip.curve("contact_l").is_some());
    let right = clip.curve("contact_r").unwrap();
    // Second leg uses its own apex range.
    assert!((right.eval(0.0) - 2.0).abs() < 1e-4);
}

/// it should blend rising edges into ramps when smoothing is configured
#[test]
fn weight_curves_ramp_rising_edges() {
    let heights = [0.0, 0.0, 6.0, 6.0, 6.0, 6.0, 0.0, 0.0, 0.0, 0.0];
    let mut stepped = heights_clip(&heights);
    let cfg_step = ContactSampleConfig {
        landed_tolerance: 1.0,
        air_tolerance: 1.0,
        ..Default::default()
    };
    sample_contact_curves(&mut stepped, &cfg_step, &[foot_leg()]);
    let stepped_len = stepped.curve("foot_contact").unwrap().len();

    let mut smoothed = heights_clip(&heights);
    let cfg_smooth = ContactSampleConfig {
        landed_tolerance: 1.0,
        air_tolerance: 1.0,
        smoothing: Some(ContactSmoothing::default()),
        ..Default::default()
    };
    sample_weight_curves(&mut smoothed, &cfg_smooth, &[foot_leg()]);

    let curve = smoothed.curve("foot_contact").unwrap();
    assert!(curve.len() > stepped_len, "expected ramp keys");
    // All values stay inside the apex range.
    for key in curve.keys() {
        assert!(key.value >= -1e-4 && key.value <= 1.0 + 1e-4);
    }
}

/// it should fall back to the stepped output when no smoothing is configured
#[test]
fn weight_curves_without_smoothing_step() {
    let heights = [0.0, 6.0, 0.0];
    let mut a = heights_clip(&heights);
    let mut b = heights_clip(&heights);
    let cfg = ContactSampleConfig {
        landed_tolerance: 1.0,
        air_tolerance: 1.0,
        ..Default::default()
    };
    sample_weight_curves(&mut a, &cfg, &[foot_leg()]);
    sample_contact_curves(&mut b, &cfg, &[foot_leg()]);
    assert_eq!(a.curve("foot_contact"), b.curve("foot_contact"));
}
