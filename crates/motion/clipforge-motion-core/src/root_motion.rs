//! Root-motion extraction and redistribution.
//!
//! Motion moves between the root bone and a designated "motion" bone (the
//! pelvis in practice) with per-axis weights. The redistributed bone's local
//! transform is always rebuilt by expressing its old component-space
//! transform relative to the new root, so the rendered pose only changes by
//! the intentional redistribution.

use clipforge_api_core::{Rotator, Transform};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::bone::sample_local;
use crate::config::{MotionConvertConfig, MotionSampleConfig};
use crate::curve::ScalarCurve;
use crate::data::{BoneTrack, Clip};
use crate::filter::{apply_filter, FilterKind};

/// Six scalar channels describing a bone's motion over time: translation
/// X/Y/Z plus rotation roll/pitch/yaw (degrees). Rotation as independent
/// angle channels is what lets per-axis weights act on it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BoneCurveSet {
    pub translation: [ScalarCurve; 3],
    pub rotation: [ScalarCurve; 3],
}

impl BoneCurveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        for curve in self.translation.iter_mut().chain(self.rotation.iter_mut()) {
            curve.clear();
        }
    }

    pub fn has_data(&self) -> bool {
        self.translation
            .iter()
            .chain(self.rotation.iter())
            .any(|c| !c.is_empty())
    }

    pub fn add_transform_key(&mut self, time: f32, transform: &Transform) {
        let t = transform.translation;
        self.translation[0].add_key(time, t.x);
        self.translation[1].add_key(time, t.y);
        self.translation[2].add_key(time, t.z);
        let r = transform.rotator();
        self.rotation[0].add_key(time, r.roll);
        self.rotation[1].add_key(time, r.pitch);
        self.rotation[2].add_key(time, r.yaw);
    }

    pub fn evaluate_translation(&self, time: f32) -> Vec3 {
        Vec3::new(
            self.translation[0].eval(time),
            self.translation[1].eval(time),
            self.translation[2].eval(time),
        )
    }

    pub fn evaluate_rotator(&self, time: f32) -> Rotator {
        Rotator::new(
            self.rotation[0].eval(time),
            self.rotation[1].eval(time),
            self.rotation[2].eval(time),
        )
    }

    pub fn evaluate(&self, time: f32) -> Transform {
        Transform::new(
            self.evaluate_translation(time),
            self.evaluate_rotator(time).to_quat(),
            Vec3::ONE,
        )
    }

    /// Run a curve filter over all six channels.
    pub fn filter(&mut self, kind: FilterKind, tolerance: f32) {
        for curve in self.translation.iter_mut().chain(self.rotation.iter_mut()) {
            apply_filter(curve, kind, tolerance);
        }
    }
}

/// Root displacement across `[start_time, start_time + delta_time]`.
pub fn extract_root_motion(clip: &Clip, start_time: f32, delta_time: f32) -> Transform {
    extract_root_motion_range(clip, start_time, start_time + delta_time)
}

/// Root displacement between two times, clamped into the clip.
pub fn extract_root_motion_range(clip: &Clip, start: f32, end: f32) -> Transform {
    let root = clip.skeleton().root_name().to_string();
    let start = start.clamp(0.0, clip.duration());
    let end = end.clamp(0.0, clip.duration());
    let previous = sample_local(clip, start, &root);
    let current = sample_local(clip, end, &root);
    Transform::delta(&current, &previous)
}

/// Per-axis maxima of accumulated |translation| / |rotation| over the clip,
/// plus the peak frame-to-frame speed.
pub fn root_motion_apex(clip: &Clip) -> (Transform, f32) {
    let frames = clip.num_frames();
    if frames < 2 {
        return (Transform::IDENTITY, 0.0);
    }

    let mut max_speed = 0.0f32;
    let mut apex_translation = Vec3::ZERO;
    let mut apex_rotation = Rotator::ZERO;
    let mut accumulated = Transform::IDENTITY;

    for frame in 1..frames {
        let time = clip.time_at_frame(frame);
        let last_time = clip.time_at_frame(frame - 1);
        let dt = time - last_time;
        if dt <= 0.0 {
            continue;
        }
        let previous = extract_root_motion_range(clip, 0.0, last_time);
        let current = extract_root_motion_range(clip, 0.0, time);
        let delta = Transform::delta(&current, &previous);

        max_speed = max_speed.max((delta.translation / dt).length());
        accumulated = Transform::add_delta(&accumulated, &delta);

        apex_translation = apex_translation.max(accumulated.translation.abs());
        let rot = accumulated.rotator();
        apex_rotation.roll = apex_rotation.roll.max(rot.roll.abs());
        apex_rotation.pitch = apex_rotation.pitch.max(rot.pitch.abs());
        apex_rotation.yaw = apex_rotation.yaw.max(rot.yaw.abs());
    }

    let mut apex = Transform::new(apex_translation, apex_rotation.to_quat(), Vec3::ONE);
    apex.normalize_in_place();
    (apex, max_speed)
}

/// Bake the root bone's per-frame local transform into a curve set.
pub fn sample_root_motion_curves(clip: &Clip) -> BoneCurveSet {
    let mut curves = BoneCurveSet::new();
    let root = clip.skeleton().root_name().to_string();
    if clip.bone_track(&root).is_none() {
        log::warn!("sample_root_motion_curves: '{}' has no root track", clip.name);
        return curves;
    }
    for frame in 0..clip.num_frames() {
        let time = clip.time_at_frame(frame);
        let pose = sample_local(clip, time, &root);
        curves.add_transform_key(time, &pose);
    }
    curves
}

/// Bake the motion bone's per-frame delta from its reference pose, scaled by
/// the configured per-axis weights. The reference translation keeps only its
/// height so lateral drift counts as motion.
pub fn sample_motion_curves(clip: &Clip, cfg: &MotionSampleConfig) -> BoneCurveSet {
    let mut curves = BoneCurveSet::new();
    let skeleton = clip.skeleton().clone();
    let Some(motion_index) = skeleton.bone_index(&cfg.motion_bone) else {
        log::warn!("sample_motion_curves: bone '{}' not in skeleton", cfg.motion_bone);
        return curves;
    };
    let Some(track) = clip.get_track(&cfg.motion_bone, false) else {
        log::warn!("sample_motion_curves: no track for '{}'", cfg.motion_bone);
        return curves;
    };

    let reference = skeleton.reference_local(motion_index);
    let init_ls = Transform::new(
        Vec3::new(0.0, 0.0, reference.translation.z),
        reference.rotation,
        Vec3::ONE,
    );

    for frame in 0..clip.num_frames() {
        let time = clip.time_at_frame(frame);
        let motion_ls = sample_local(clip, time, &cfg.motion_bone);
        let delta = Transform::delta(&motion_ls, &init_ls);

        let mut translation = Vec3::ZERO;
        if frame < track.translation_keys.len() {
            translation = weighted_translation_onto(Vec3::ZERO, delta.translation, cfg);
        }

        let mut rotator = Rotator::ZERO;
        if frame < track.rotation_keys.len() {
            rotator = weighted_rotator_onto(Rotator::ZERO, delta.rotator(), cfg);
        }

        curves.add_transform_key(time, &Transform::new(translation, rotator.to_quat(), Vec3::ONE));
    }
    curves
}

/// Scale the root track per channel by the configured ratios. With
/// `remove_relative_motion` set, the motion bone's local track is rebuilt so
/// the component-space pose absorbs the change.
pub fn apply_root_motion_ratio(
    clip: &mut Clip,
    sample_cfg: &MotionSampleConfig,
    convert: &MotionConvertConfig,
    curves: &mut BoneCurveSet,
) {
    let root_name = clip.skeleton().root_name().to_string();
    let Some(source_root) = clip.get_track(&root_name, false) else {
        log::warn!("apply_root_motion_ratio: '{}' has no root track", clip.name);
        return;
    };
    let mut motion_track = clip.get_track(&sample_cfg.motion_bone, false);

    if !curves.has_data() {
        *curves = sample_root_motion_curves(clip);
    }

    let mut new_root = BoneTrack::new();
    for frame in 0..clip.num_frames() {
        let time = clip.time_at_frame(frame);
        let source_transform = curves.evaluate(time);

        let mut new_transform = Transform::IDENTITY;
        new_transform.translation = source_transform.translation * convert.translation_ratio;

        let mut rotator = source_transform.rotator();
        rotator.roll *= convert.rotation_ratio.x;
        rotator.pitch *= convert.rotation_ratio.y;
        rotator.yaw *= convert.rotation_ratio.z;
        new_transform.set_rotator(rotator);

        if let Some(scale) = source_root.scale_keys.get(frame) {
            new_transform.scale = *scale * convert.scale_ratio;
        }
        new_root.push(&new_transform);

        if convert.remove_relative_motion {
            if let Some(track) = motion_track.as_mut() {
                if frame < track.translation_keys.len() && frame < track.rotation_keys.len() {
                    let delta = Transform::delta(&new_transform, &source_transform);

                    let mut motion_cs = track.transform_at(frame).compose(&source_transform);
                    motion_cs.normalize_in_place();
                    motion_cs.translation += delta.translation;
                    let rot = (motion_cs.rotator() + delta.rotator()).normalized();
                    motion_cs.set_rotator(rot);

                    let mut motion_ls = motion_cs.to_relative(&new_transform);
                    motion_ls.normalize_in_place();
                    track.translation_keys[frame] = motion_ls.translation;
                    track.rotation_keys[frame] = motion_ls.rotation;
                }
            }
        }
    }

    clip.set_track(&root_name, new_root);
    if convert.remove_relative_motion {
        if let Some(track) = motion_track {
            clip.set_track(&sample_cfg.motion_bone, track);
        }
    }
    clip.mark_modified();
}

/// Root → motion: move the weighted share of the root's translation/rotation
/// onto the motion bone, leaving the remainder on the root. Returns the
/// sampled source root curves for inspection.
pub fn convert_root_to_motion(clip: &mut Clip, cfg: &MotionSampleConfig) -> BoneCurveSet {
    let mut curves = BoneCurveSet::new();
    let root_name = clip.skeleton().root_name().to_string();
    let Some(root_track) = clip.get_track(&root_name, false) else {
        log::warn!("convert_root_to_motion: '{}' has no root track", clip.name);
        return curves;
    };
    if clip.get_track(&cfg.motion_bone, false).is_none() {
        log::warn!("convert_root_to_motion: no track for '{}'", cfg.motion_bone);
        return curves;
    }

    let root_init = root_track.transform_at(0);

    let mut new_motion = BoneTrack::new();
    let mut new_root = BoneTrack::new();

    for frame in 0..clip.num_frames() {
        let time = clip.time_at_frame(frame);
        let motion_ls = sample_local(clip, time, &cfg.motion_bone);

        // Root pose for this frame, optionally rebased to the first frame.
        let mut source_root = root_track.transform_at(frame);
        if cfg.resize_to_origin {
            source_root.rotation =
                (root_init.rotation.inverse() * source_root.rotation).normalize();
            source_root.translation -= root_init.translation;
        }

        // Split translation: the weighted share leaves the root.
        let mut moved = Vec3::ZERO;
        let mut kept = source_root.translation;
        split_axis(&mut moved.x, &mut kept.x, cfg.global_weight, cfg.translation_weights.x);
        split_axis(&mut moved.y, &mut kept.y, cfg.global_weight, cfg.translation_weights.y);
        split_axis(&mut moved.z, &mut kept.z, cfg.global_weight, cfg.translation_weights.z);

        let mut moved_translation = moved;
        let mut source_for_curves = source_root;
        if cfg.resize_to_origin {
            let inv = root_init.rotation.inverse();
            moved_translation = inv * moved;
            source_for_curves.translation = inv * source_root.translation;
        }

        // Split rotation channels the same way.
        let mut moved_rot = Rotator::ZERO;
        let mut kept_rot = source_root.rotator();
        split_axis(&mut moved_rot.roll, &mut kept_rot.roll, cfg.global_weight, cfg.rotation_weights.x);
        split_axis(&mut moved_rot.pitch, &mut kept_rot.pitch, cfg.global_weight, cfg.rotation_weights.y);
        split_axis(&mut moved_rot.yaw, &mut kept_rot.yaw, cfg.global_weight, cfg.rotation_weights.z);

        let kept_root = Transform::new(kept, kept_rot.to_quat(), source_root.scale);
        let moved_share = Transform::new(moved_translation, moved_rot.to_quat(), Vec3::ONE);

        // The moved share carries the motion bone with it in component space.
        let mut motion_ws = motion_ls.compose(&moved_share);
        motion_ws.normalize_in_place();

        new_motion.push(&motion_ws);
        new_root.push(&kept_root);
        curves.add_transform_key(time, &source_for_curves);
    }

    clip.set_track(&root_name, new_root);
    clip.set_track(&cfg.motion_bone, new_motion);
    clip.mark_modified();
    curves
}

/// Motion → root: rebuild the root track from the sampled motion curves
/// (weighted per axis) and re-express the motion bone in the new root's
/// space so the component-space pose is numerically unchanged.
pub fn convert_motion_to_root(clip: &mut Clip, cfg: &MotionSampleConfig, curves: &BoneCurveSet) {
    let root_name = clip.skeleton().root_name().to_string();
    if clip.get_track(&root_name, false).is_none() {
        log::warn!("convert_motion_to_root: '{}' has no root track", clip.name);
        return;
    }
    let Some(mut motion_track) = clip.get_track(&cfg.motion_bone, true) else {
        log::warn!("convert_motion_to_root: no track for '{}'", cfg.motion_bone);
        return;
    };

    let mut new_root = BoneTrack::new();
    for frame in 0..clip.num_frames() {
        let time = clip.time_at_frame(frame);
        let source_root = sample_local(clip, time, &root_name);

        let value_rot = curves.evaluate_rotator(time);
        let value_translation = curves.evaluate_translation(time);

        let rotator = weighted_rotator_onto(source_root.rotator(), value_rot, cfg);
        let translation = weighted_translation_onto(source_root.translation, value_translation, cfg);
        let new_root_tf = Transform::new(translation, rotator.to_quat(), Vec3::ONE);
        new_root.push(&new_root_tf);

        if frame < motion_track.translation_keys.len() && frame < motion_track.rotation_keys.len() {
            let mut motion_cs = Transform::new(
                motion_track.translation_keys[frame],
                motion_track.rotation_keys[frame],
                Vec3::ONE,
            )
            .compose(&source_root);
            motion_cs.normalize_in_place();

            let mut motion_ls = motion_cs.to_relative(&new_root_tf);
            motion_ls.normalize_in_place();
            motion_track.rotation_keys[frame] = motion_ls.rotation;
            motion_track.translation_keys[frame] = motion_ls.translation;
        }
    }

    clip.set_track(&root_name, new_root);
    clip.set_track(&cfg.motion_bone, motion_track);
    clip.mark_modified();
}

/// `moved = value * w`, `kept = value * (1 - w)` for weighted axes.
fn split_axis(moved: &mut f32, kept: &mut f32, global: f32, weight: Option<f32>) {
    if let Some(w) = weight {
        let w = (global * w).clamp(0.0, 1.0);
        *moved = *kept * w;
        *kept *= 1.0 - w;
    }
}

fn weighted_translation_onto(mut base: Vec3, value: Vec3, cfg: &MotionSampleConfig) -> Vec3 {
    let w = &cfg.translation_weights;
    if let Some(wx) = w.x {
        base.x = value.x * cfg.global_weight * wx;
    }
    if let Some(wy) = w.y {
        base.y = value.y * cfg.global_weight * wy;
    }
    if let Some(wz) = w.z {
        base.z = value.z * cfg.global_weight * wz;
    }
    base
}

fn weighted_rotator_onto(mut base: Rotator, value: Rotator, cfg: &MotionSampleConfig) -> Rotator {
    let w = &cfg.rotation_weights;
    if let Some(wx) = w.x {
        base.roll = value.roll * cfg.global_weight * wx;
    }
    if let Some(wy) = w.y {
        base.pitch = value.pitch * cfg.global_weight * wy;
    }
    if let Some(wz) = w.z {
        base.yaw = value.yaw * cfg.global_weight * wz;
    }
    base
}
