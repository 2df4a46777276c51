//! Bone-space sampling: local transforms at arbitrary times, local-to-
//! component conversion via the parent chain, and root-motion presence
//! queries.
//!
//! Unresolvable bones yield the identity transform rather than an error: the
//! identity reads as "no data" and callers decide whether that matters.

use clipforge_api_core::Transform;

use crate::data::Clip;

const MOTION_EPSILON: f32 = 1e-4;

/// Local transform of `bone_name` at `time`, blending the two bracketing
/// frame keys. Bones without a track sample their reference pose; unknown
/// bones yield identity.
pub fn sample_local(clip: &Clip, time: f32, bone_name: &str) -> Transform {
    let Some(bone_index) = clip.skeleton().bone_index(bone_name) else {
        log::warn!("sample_local: bone '{bone_name}' not in skeleton");
        return Transform::IDENTITY;
    };
    let Some(track) = clip.bone_track(bone_name) else {
        return clip.skeleton().reference_local(bone_index);
    };
    if track.is_empty() {
        return clip.skeleton().reference_local(bone_index);
    }

    let ft = clip.frame_time();
    if ft <= 0.0 {
        return track.transform_at(0);
    }
    let t = time.clamp(0.0, clip.duration());
    let frame = (t / ft).floor() as usize;
    let alpha = (t - frame as f32 * ft) / ft;
    if alpha <= f32::EPSILON || frame + 1 >= clip.num_frames() {
        return track.transform_at(frame.min(clip.num_frames().saturating_sub(1)));
    }
    Transform::blend(
        &track.transform_at(frame),
        &track.transform_at(frame + 1),
        alpha,
    )
}

/// Local transform at an exact frame index.
pub fn sample_local_at_frame(clip: &Clip, frame: usize, bone_name: &str) -> Transform {
    sample_local(clip, clip.time_at_frame(frame), bone_name)
}

/// Component-space transform of `bone_name` at `time`: composes local
/// transforms up the parent chain. The root's contribution is its reference
/// pose unless `include_root_motion` asks for the animated root track.
pub fn component_transform(
    clip: &Clip,
    time: f32,
    bone_name: &str,
    include_root_motion: bool,
) -> Transform {
    let skeleton = clip.skeleton();
    let Some(mut index) = skeleton.bone_index(bone_name) else {
        log::warn!("component_transform: bone '{bone_name}' not in skeleton");
        return Transform::IDENTITY;
    };

    let mut acc = Transform::IDENTITY;
    while index != 0 {
        let name = skeleton.bone_name(index).unwrap_or_default();
        acc = acc.compose(&sample_local(clip, time, name));
        match skeleton.parent_index(index) {
            Some(parent) => index = parent,
            None => break,
        }
    }

    let root_cs = if include_root_motion {
        sample_local(clip, time, skeleton.root_name())
    } else {
        skeleton.reference_local(0)
    };
    let mut out = acc.compose(&root_cs);
    out.normalize_in_place();
    out
}

/// Express a component-space transform in `bone_name`'s local space, i.e.
/// relative to its parent's component-space transform.
pub fn local_from_component(
    clip: &Clip,
    time: f32,
    bone_name: &str,
    component: &Transform,
    include_root_motion: bool,
) -> Transform {
    let skeleton = clip.skeleton();
    let Some(index) = skeleton.bone_index(bone_name) else {
        return *component;
    };
    let Some(parent) = skeleton.parent_index(index) else {
        return *component;
    };
    let parent_name = skeleton.bone_name(parent).unwrap_or_default();
    let parent_cs = component_transform(clip, time, parent_name, include_root_motion);
    let mut out = component.to_relative(&parent_cs);
    out.normalize_in_place();
    out
}

/// True when the root bone's local transform changes across the window.
pub fn has_motion_between(clip: &Clip, last_time: f32, next_time: f32) -> bool {
    let root = clip.skeleton().root_name().to_string();
    let previous = sample_local(clip, last_time, &root);
    let current = sample_local(clip, next_time, &root);
    let delta = Transform::delta(&current, &previous);
    !delta.is_nearly_identity(MOTION_EPSILON)
}

/// True when the window still carries motion relative to the clip's final
/// root pose: once the root stops moving (every later pose equals the final
/// pose), windows at or past that point report false.
pub fn has_motion_data(clip: &Clip, last_time: f32, next_time: f32, sample_dt: f32) -> bool {
    let root = clip.skeleton().root_name().to_string();
    let duration = clip.duration();
    let final_pose = sample_local(clip, duration, &root);

    if sample_local(clip, last_time, &root).approx_eq(&final_pose, MOTION_EPSILON) {
        return false;
    }
    if sample_local(clip, next_time, &root).approx_eq(&final_pose, MOTION_EPSILON) {
        return false;
    }

    if sample_dt > 0.0 {
        let mut t = 0.0f32;
        while t <= duration + 1e-4 {
            let clamped = t.clamp(0.0, duration);
            if sample_local(clip, clamped, &root).approx_eq(&final_pose, MOTION_EPSILON) {
                if next_time >= clamped {
                    return false;
                }
                break;
            }
            t += sample_dt;
        }
    }
    true
}

/// Any frame where the root departs from origin/identity.
pub fn has_any_motion_data(clip: &Clip) -> bool {
    let root = clip.skeleton().root_name().to_string();
    for frame in 0..clip.num_frames() {
        let pose = sample_local(clip, clip.time_at_frame(frame), &root);
        if !pose.is_nearly_identity(MOTION_EPSILON) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BoneTrack;
    use crate::skeleton::{Bone, Skeleton};
    use glam::Vec3;
    use std::sync::Arc;

    fn two_bone_clip() -> Clip {
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
        let mut clip = Clip::new(skeleton, "test", 1.0, 3);
        let mut root = BoneTrack::new();
        for i in 0..3 {
            root.push(&Transform::from_translation(Vec3::new(
                0.0,
                i as f32 * 10.0,
                0.0,
            )));
        }
        clip.set_track("root", root);
        let mut pelvis = BoneTrack::new();
        for _ in 0..3 {
            pelvis.push(&Transform::from_translation(Vec3::new(0.0, 0.0, 90.0)));
        }
        clip.set_track("pelvis", pelvis);
        clip
    }

    #[test]
    fn sample_local_blends_between_frames() {
        let clip = two_bone_clip();
        let t = sample_local(&clip, 0.25, "root");
        assert!((t.translation.y - 5.0).abs() < 1e-5);
    }

    #[test]
    fn missing_bone_is_identity() {
        let clip = two_bone_clip();
        let t = sample_local(&clip, 0.5, "nope");
        assert!(t.approx_eq(&Transform::IDENTITY, 1e-6));
    }

    #[test]
    fn component_space_includes_root_only_when_asked() {
        let clip = two_bone_clip();
        let without = component_transform(&clip, 1.0, "pelvis", false);
        assert!((without.translation.z - 90.0).abs() < 1e-4);
        assert!(without.translation.y.abs() < 1e-4);

        let with = component_transform(&clip, 1.0, "pelvis", true);
        assert!((with.translation.y - 20.0).abs() < 1e-4);
    }

    #[test]
    fn component_round_trip_through_local() {
        let clip = two_bone_clip();
        let cs = component_transform(&clip, 0.5, "pelvis", true);
        let ls = local_from_component(&clip, 0.5, "pelvis", &cs, true);
        let expected = sample_local(&clip, 0.5, "pelvis");
        assert!(ls.approx_eq(&expected, 1e-4));
    }

    #[test]
    fn motion_queries() {
        let clip = two_bone_clip();
        assert!(has_any_motion_data(&clip));
        assert!(has_motion_between(&clip, 0.0, 0.5));

        let skeleton = clip.skeleton().clone();
        let still = Clip::new(skeleton, "still", 1.0, 3);
        assert!(!has_any_motion_data(&still));
    }
}
