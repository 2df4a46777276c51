//! Pose-distance sampling, gated sampling, and whole-pose equality.

use clipforge_api_core::Transform;

use crate::bone::component_transform;
use crate::config::{PoseSampleBoneConfig, PoseSampleCurveConfig, PoseSearchConfig, SampleAxis};
use crate::curve::ScalarCurve;
use crate::data::Clip;

const VALUE_TOLERANCE: f32 = 0.01;
/// Evaluation nudge that reads the after-side of a jump key.
const JUMP_PROBE: f32 = 1e-3;

/// Gate check: true when the named reference curve equals `reference_value`
/// at `time`, just after it, or within the next `tolerance_frames` frames.
/// A negative tolerance disables gating entirely.
pub fn can_sample_pose(
    clip: &Clip,
    time: f32,
    gate: &PoseSampleCurveConfig,
    tolerance_frames: i32,
    sample_dt: f32,
) -> bool {
    if tolerance_frames < 0 {
        return true;
    }
    let Some(reference_name) = gate.reference_curve.as_deref() else {
        return false;
    };
    if gate.output_curve.is_empty() {
        return false;
    }
    let Some(reference) = clip.curve(reference_name) else {
        return false;
    };
    if reference.is_empty() {
        return false;
    }

    let matches = |t: f32| (reference.eval(t) - gate.reference_value).abs() <= VALUE_TOLERANCE;
    if matches(time) || matches(time + JUMP_PROBE) {
        return true;
    }
    for frame in 1..=tolerance_frames {
        let probe = time + frame as f32 * sample_dt;
        if matches(probe) || matches(probe + JUMP_PROBE) {
            return true;
        }
    }
    false
}

/// Whole-pose equality: every bone except the root matches in component
/// space within `tolerance`.
pub fn is_same_pose(
    clip_a: &Clip,
    time_a: f32,
    clip_b: &Clip,
    time_b: f32,
    tolerance: f32,
) -> bool {
    is_same_pose_with_diff(clip_a, time_a, clip_b, time_b, tolerance).0
}

/// As `is_same_pose`, also accumulating the absolute translation/rotation
/// difference of the first mismatching bone for diagnostics.
pub fn is_same_pose_with_diff(
    clip_a: &Clip,
    time_a: f32,
    clip_b: &Clip,
    time_b: f32,
    tolerance: f32,
) -> (bool, f32) {
    let skeleton = clip_a.skeleton().clone();
    for index in 1..skeleton.bone_count() {
        let Some(bone) = skeleton.bone_name(index) else {
            continue;
        };
        let pose_a = component_transform(clip_a, time_a, bone, false);
        let pose_b = component_transform(clip_b, time_b, bone, false);
        if !pose_a.approx_eq(&pose_b, tolerance) {
            let mut diff = 0.0;
            diff += (pose_a.translation.x - pose_b.translation.x).abs();
            diff += (pose_a.translation.y - pose_b.translation.y).abs();
            diff += (pose_a.translation.z - pose_b.translation.z).abs();
            let ra = pose_a.rotator();
            let rb = pose_b.rotator();
            diff += (ra.roll - rb.roll).abs();
            diff += (ra.pitch - rb.pitch).abs();
            diff += (ra.yaw - rb.yaw).abs();
            return (false, diff);
        }
    }
    (true, 0.0)
}

/// A clip whose first and last poses match is loopable.
pub fn is_loop_clip(clip: &Clip, tolerance: f32) -> bool {
    is_same_pose(clip, 0.0, clip, clip.duration(), tolerance)
}

/// Per-frame signed pose-distance curves, one per configured output.
///
/// The distance partner for a bone is the neighboring configured bone when
/// one exists (the paired-limb case), else the explicit reference bone, else
/// the root. The sign comes from comparing the configured axis between bone
/// and partner. Direction reversals and gating gaps receive jump keys to
/// zero so a single curve never interpolates through a sign flip.
pub fn sample_distance(clip: &mut Clip, cfg: &PoseSearchConfig) {
    if cfg.frame_rate <= 0.0 {
        log::warn!("sample_distance: non-positive frame rate");
        return;
    }
    let sample_dt = 1.0 / cfg.frame_rate;
    let duration = clip.duration();
    let skeleton = clip.skeleton().clone();
    let root_name = skeleton.root_name().to_string();

    for (bone_index, bone_cfg) in cfg.bones.iter().enumerate() {
        if bone_cfg.bone.is_empty() {
            continue;
        }
        if skeleton.bone_index(&bone_cfg.bone).is_none() {
            log::warn!("sample_distance: bone '{}' not in skeleton", bone_cfg.bone);
            continue;
        }

        // The neighboring bone entry pairs limbs for distance measurement.
        let partner = cfg
            .bones
            .get(bone_index.wrapping_sub(1))
            .or_else(|| cfg.bones.get(bone_index + 1))
            .filter(|other| !other.bone.is_empty())
            .map(|other| other.bone.clone());

        for curve_cfg in &bone_cfg.curves {
            if curve_cfg.output_curve.is_empty() {
                continue;
            }
            let mut curve = ScalarCurve::new();

            let mut t = 0.0f32;
            while t <= duration + 1e-4 {
                let time = t.clamp(0.0, duration);
                t += sample_dt;

                if !can_sample_pose(clip, time, curve_cfg, cfg.tolerance_frames, sample_dt) {
                    if time == 0.0 {
                        curve.add_key(0.0, 0.0);
                    } else if let Some(last) = curve.last_key().copied() {
                        if last.value != 0.0 {
                            // Ramp down to zero at the gate edge, keeping the
                            // last value on the far side for later gates.
                            curve.add_jump(time, 0.0, last.value);
                        }
                    }
                    continue;
                }

                let bone_cs = component_transform(clip, time, &bone_cfg.bone, false);
                let root_cs = component_transform(clip, time, &root_name, false);

                let reference_cs = match &partner {
                    Some(name) => Some(component_transform(clip, time, name, false)),
                    None => bone_cfg
                        .reference_bone
                        .as_deref()
                        .map(|name| component_transform(clip, time, name, false)),
                };

                let mut distance = match &reference_cs {
                    Some(reference) => bone_cs.translation.distance(reference.translation),
                    None => bone_cs.translation.distance(root_cs.translation),
                };
                distance *= axis_sign(
                    cfg.axis,
                    &bone_cs,
                    reference_cs.as_ref().unwrap_or(&root_cs),
                    bone_cfg,
                );

                if let Some(last) = curve.last_key().copied() {
                    let last_sign = last.value.signum();
                    let pose_sign = distance.signum();
                    let gap = time - last.time;
                    if gap > sample_dt * 1.5 || (last.value != 0.0 && last_sign != pose_sign) {
                        // Isolate the reversal: the previous key settles to
                        // zero, this sample spikes and settles to zero too.
                        if last.value != 0.0 {
                            curve.add_jump(last.time, 0.0, last.value);
                        }
                        curve.add_jump(time, distance, 0.0);
                        continue;
                    }
                }

                curve.add_key(time, distance);
            }

            if curve.is_empty() {
                clip.remove_curve(&curve_cfg.output_curve);
            } else {
                clip.set_curve(curve_cfg.output_curve.clone(), curve);
            }
        }
    }
    clip.mark_modified();
}

/// Evaluate a previously sampled distance curve.
pub fn pose_distance(clip: &Clip, time: f32, output_curve: &str) -> f32 {
    clip.curve(output_curve).map_or(0.0, |c| c.eval(time))
}

/// First (bone, curve) pair whose gate admits `time`.
pub fn can_sample_index(
    clip: &Clip,
    time: f32,
    cfg: &PoseSearchConfig,
) -> Option<(usize, usize)> {
    let sample_dt = if cfg.frame_rate > 0.0 {
        1.0 / cfg.frame_rate
    } else {
        return None;
    };
    for (bone_index, bone_cfg) in cfg.bones.iter().enumerate() {
        for (curve_index, curve_cfg) in bone_cfg.curves.iter().enumerate() {
            if can_sample_pose(clip, time, curve_cfg, cfg.tolerance_frames, sample_dt) {
                return Some((bone_index, curve_index));
            }
        }
    }
    None
}

/// Sign of the configured axis comparison, scaled by that axis' weight.
fn axis_sign(
    axis: SampleAxis,
    bone: &Transform,
    reference: &Transform,
    bone_cfg: &PoseSampleBoneConfig,
) -> f32 {
    let (bone_v, ref_v, weight) = match axis {
        SampleAxis::X => (
            bone.translation.x,
            reference.translation.x,
            bone_cfg.axis_weights.x,
        ),
        SampleAxis::Y => (
            bone.translation.y,
            reference.translation.y,
            bone_cfg.axis_weights.y,
        ),
        SampleAxis::Z => (
            bone.translation.z,
            reference.translation.z,
            bone_cfg.axis_weights.z,
        ),
    };
    let sign = if bone_v >= ref_v { 1.0 } else { -1.0 };
    let weight = if weight == 0.0 { 1.0 } else { weight };
    sign * weight
}
