//! Track retiming: resize a clip to a new frame count / duration / play
//! rate, and crop frame ranges.

use clipforge_api_core::Transform;

use crate::config::{CropConfig, ResizeConfig};
use crate::data::{BoneTrack, Clip};

/// Float-error margin when computing the output frame count, so the final
/// frame covers the full duration.
const FRAME_COUNT_EPSILON: f32 = 1e-4;

/// Resample every track of the clip to the target duration/frame-time, then
/// update the clip's frame math. A negative play rate reverses the result.
pub fn resize_clip(clip: &mut Clip, cfg: &ResizeConfig) {
    let source_frames = clip.num_frames();
    if source_frames < 2 {
        log::warn!("resize_clip: '{}' has fewer than two frames, skipping", clip.name);
        return;
    }
    let source_duration = clip.duration();
    if source_duration <= 0.0 {
        log::warn!("resize_clip: '{}' has zero duration, skipping", clip.name);
        return;
    }
    let source_frame_time = source_duration / (source_frames - 1) as f32;

    let target_frame_time = match cfg.frame_rate {
        Some(fps) if fps > 0.0 => 1.0 / fps,
        Some(_) => {
            log::warn!("resize_clip: non-positive frame rate, using source frame time");
            source_frame_time
        }
        None => source_frame_time,
    };

    let mut target_duration = match cfg.duration {
        Some(d) if d > 0.0 => d,
        _ => source_duration,
    };
    if let Some(rate) = cfg.play_rate {
        if rate != 0.0 {
            target_duration *= rate.abs();
        }
    }

    let target_frames = if target_frame_time <= 0.0 {
        1
    } else {
        (target_duration / target_frame_time + FRAME_COUNT_EPSILON) as usize + 1
    };

    let reverse = cfg.play_rate.is_some_and(|rate| rate < 0.0);
    let time_scale = target_duration / source_duration;

    let track_names: Vec<String> = clip.track_names().to_vec();
    for name in track_names {
        let Some(track) = clip.bone_track(&name) else {
            continue;
        };

        // Sample the source track at its own frame times, then rescale those
        // times into the target duration.
        let mut samples: Vec<(f32, Transform)> = Vec::with_capacity(source_frames);
        for frame in 0..source_frames {
            let time = if frame == source_frames - 1 {
                source_duration
            } else {
                (frame as f32 * source_frame_time).clamp(0.0, source_duration)
            };
            samples.push((time * time_scale, track.transform_at(frame)));
        }

        let mut new_track = BoneTrack::new();
        for frame in 0..target_frames {
            let t = if frame == target_frames - 1 {
                target_duration
            } else {
                (frame as f32 * target_frame_time).clamp(0.0, target_duration)
            };
            if let Some(transform) = sample_at(&samples, t) {
                new_track.push(&transform);
            }
        }

        let new_track = if reverse { new_track.reversed() } else { new_track };
        clip.set_track(&name, new_track);
    }

    clip.resize_frames(target_duration, target_frames);
    clip.mark_modified();
}

/// Locate the bracketing sample pair for `t` and blend; clamp to the nearest
/// end sample outside the covered range.
fn sample_at(samples: &[(f32, Transform)], t: f32) -> Option<Transform> {
    if samples.is_empty() {
        return None;
    }
    if t <= samples[0].0 {
        return Some(samples[0].1);
    }
    for i in 0..samples.len() {
        let (time, transform) = samples[i];
        if let Some((next_time, next_transform)) = samples.get(i + 1).copied() {
            if t >= time && t <= next_time {
                let span = next_time - time;
                if span <= f32::EPSILON {
                    return Some(transform);
                }
                let alpha = (t - time) / span;
                return Some(Transform::blend(&transform, &next_transform, alpha));
            }
        } else {
            return Some(transform);
        }
    }
    None
}

/// Remove the inclusive frame range `[start_frame, end_frame]` from every
/// multi-key channel and shrink the clip. Invalid ranges are a no-op.
pub fn crop_clip(clip: &mut Clip, cfg: &CropConfig) {
    let frames = clip.num_frames();
    if frames < 2 {
        return;
    }
    let start = cfg.start_frame;
    let end = cfg.end_frame.min(frames);
    if start > end || start >= frames {
        log::warn!(
            "crop_clip: invalid range [{start}, {}] for {frames} frames",
            cfg.end_frame
        );
        return;
    }

    let crop_keys = (end - start).min(frames - 1);
    if crop_keys == 0 {
        return;
    }
    let new_frames = frames - crop_keys;
    let frame_time = clip.frame_time();

    let track_names: Vec<String> = clip.track_names().to_vec();
    for name in track_names {
        if let Some(track) = clip.bone_track_mut(&name) {
            remove_range(&mut track.translation_keys, start, crop_keys);
            remove_range(&mut track.rotation_keys, start, crop_keys);
            remove_range(&mut track.scale_keys, start, crop_keys);
        }
    }

    clip.resize_frames((new_frames - 1) as f32 * frame_time, new_frames);
    clip.mark_modified();
}

/// Constant (single-key) channels are untouched; multi-key channels lose the
/// range.
fn remove_range<T>(keys: &mut Vec<T>, start: usize, count: usize) {
    if keys.len() > 1 {
        let end = (start + count).min(keys.len());
        if start < end {
            keys.drain(start..end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{Bone, Skeleton};
    use glam::Vec3;
    use std::sync::Arc;

    fn linear_clip(frames: usize, duration: f32) -> Clip {
        let skeleton = Arc::new(
            Skeleton::new(vec![Bone::new("root", None, Transform::IDENTITY)]).unwrap(),
        );
        let mut clip = Clip::new(skeleton, "linear", duration, frames);
        let mut track = BoneTrack::new();
        for i in 0..frames {
            let y = 100.0 * i as f32 / (frames - 1) as f32;
            track.push(&Transform::from_translation(Vec3::new(0.0, y, 0.0)));
        }
        clip.set_track("root", track);
        clip
    }

    #[test]
    fn crop_drops_keys_and_duration() {
        let mut clip = linear_clip(31, 1.0);
        crop_clip(
            &mut clip,
            &CropConfig {
                start_frame: 0,
                end_frame: 15,
            },
        );
        assert_eq!(clip.num_frames(), 16);
        assert!((clip.duration() - 0.5).abs() < 1e-5);
        // First remaining key was frame 15 of the source.
        let y = clip.bone_track("root").unwrap().translation_keys[0].y;
        assert!((y - 50.0).abs() < 1e-4);
    }

    #[test]
    fn crop_rejects_inverted_range() {
        let mut clip = linear_clip(10, 1.0);
        crop_clip(
            &mut clip,
            &CropConfig {
                start_frame: 8,
                end_frame: 2,
            },
        );
        assert_eq!(clip.num_frames(), 10);
        assert!(!clip.is_modified());
    }

    #[test]
    fn negative_play_rate_reverses_channels() {
        let mut clip = linear_clip(4, 1.0);
        resize_clip(
            &mut clip,
            &ResizeConfig {
                play_rate: Some(-1.0),
                ..Default::default()
            },
        );
        let track = clip.bone_track("root").unwrap();
        assert!((track.translation_keys[0].y - 100.0).abs() < 1e-4);
        assert!(track.translation_keys.last().unwrap().y.abs() < 1e-4);
    }
}
