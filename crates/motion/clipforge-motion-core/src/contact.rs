//! Per-limb ground-contact classification.
//!
//! A limb is tracked by two probe points, "tip" and "heel", composed from
//! socket offsets on the tip/foot bones. Classification compares each pose's
//! probe heights against the running minimum over the whole clip and against
//! the configured ground plane, with a tolerance that depends on the current
//! state (hysteresis). Two outputs exist: a sharp stepped contact curve, and
//! a graded weight curve with blended edges.

use clipforge_api_core::Transform;

use crate::blend::AlphaBlendIter;
use crate::bone::{component_transform, has_any_motion_data, has_motion_data, sample_local};
use crate::config::{ContactSampleConfig, ContactSmoothing, LegConfig};
use crate::curve::ScalarCurve;
use crate::data::Clip;
use crate::filter::apply_filter;

const WEIGHT_EPSILON: f32 = 1e-4;

/// Per-limb scratch state for one sampling pass: cached probe transforms,
/// per-pose heights, running minima, and the landed flag the hysteresis
/// feeds on.
#[derive(Debug, Default)]
pub struct LegContactState {
    pub tip_heights: Vec<f32>,
    pub heel_heights: Vec<f32>,
    pub tip_transforms: Vec<Transform>,
    pub heel_transforms: Vec<Transform>,
    pub tip_lowest: f32,
    pub heel_lowest: f32,
    pub tip_lowest_index: Option<usize>,
    pub heel_lowest_index: Option<usize>,
    pub tip_idle_pose: Option<Transform>,
    pub heel_idle_pose: Option<Transform>,
    pub is_landed: bool,
}

impl LegContactState {
    /// Walk the clip at `sample_dt`, caching probe transforms and heights.
    /// Returns the number of poses sampled.
    pub fn initialize(
        clip: &Clip,
        sample_dt: f32,
        leg: &LegConfig,
        idle_pose_frame: Option<usize>,
    ) -> (Self, usize) {
        let mut state = Self::default();
        if !leg.is_valid() || sample_dt <= 0.0 {
            return (state, 0);
        }

        let duration = clip.duration();

        if let Some(idle_frame) = idle_pose_frame {
            let idle_time = clip.time_at_frame(idle_frame);
            state.tip_idle_pose = Some(tip_probe(clip, idle_time, leg));
            state.heel_idle_pose = Some(heel_probe(clip, idle_time, leg));
        }

        let mut poses = 0usize;
        let mut t = 0.0f32;
        while t <= duration + 1e-4 {
            let time = t.clamp(0.0, duration);

            let tip = tip_probe(clip, time, leg);
            state.tip_heights.push(tip.translation.z);
            state.tip_transforms.push(tip);
            if state.tip_lowest_index.is_none() || state.tip_lowest > tip.translation.z {
                state.tip_lowest = tip.translation.z;
                state.tip_lowest_index = Some(poses);
            }

            let heel = heel_probe(clip, time, leg);
            state.heel_heights.push(heel.translation.z);
            state.heel_transforms.push(heel);
            if state.heel_lowest_index.is_none() || state.heel_lowest > heel.translation.z {
                state.heel_lowest = heel.translation.z;
                state.heel_lowest_index = Some(poses);
            }

            poses += 1;
            t += sample_dt;
        }
        (state, poses)
    }

    pub fn min_pose_height(&self, index: usize) -> f32 {
        self.tip_heights[index].min(self.heel_heights[index])
    }

    pub fn max_pose_height(&self, index: usize) -> f32 {
        self.tip_heights[index].max(self.heel_heights[index])
    }

    /// Landed when the smaller (or larger, per `use_min`) of the probes'
    /// height margins is within `tolerance`. The margin is the height above
    /// whichever is lower: the clip-wide minimum or the ground plane. When
    /// idle-pose references were recorded, horizontal drift from them decides
    /// instead.
    pub fn is_landed_pose(
        &self,
        index: usize,
        tolerance: f32,
        grounded_height: f32,
        horizontal_tolerance: Option<f32>,
        use_min: bool,
    ) -> bool {
        if index >= self.tip_transforms.len() || index >= self.heel_transforms.len() {
            return false;
        }

        if let (Some(tip_idle), Some(heel_idle), Some(h_tol)) =
            (&self.tip_idle_pose, &self.heel_idle_pose, horizontal_tolerance)
        {
            let tip_offset = self.tip_transforms[index]
                .translation
                .distance(tip_idle.translation);
            let heel_offset = self.heel_transforms[index]
                .translation
                .distance(heel_idle.translation);
            return tip_offset.max(heel_offset) <= h_tol;
        }

        let tip_diff = (self.tip_heights[index] - self.tip_lowest)
            .min(self.tip_heights[index] - grounded_height);
        let heel_diff = (self.heel_heights[index] - self.heel_lowest)
            .min(self.heel_heights[index] - grounded_height);
        let diff = if use_min {
            tip_diff.min(heel_diff)
        } else {
            tip_diff.max(heel_diff)
        };
        diff <= tolerance
    }
}

/// Tip probe: the socket offset in the tip bone's space (falling back to the
/// foot bone), composed into component space.
fn tip_probe(clip: &Clip, time: f32, leg: &LegConfig) -> Transform {
    let bone = leg.tip_bone.as_deref().unwrap_or(&leg.foot_bone);
    let socket = Transform::from_translation(leg.tip_socket_offset);
    if leg.tip_bone.is_some() {
        let tip_ls = sample_local(clip, time, bone);
        let foot_cs = component_transform(clip, time, &leg.foot_bone, false);
        socket.compose(&tip_ls).compose(&foot_cs)
    } else {
        socket.compose(&component_transform(clip, time, bone, false))
    }
}

/// Heel probe: the heel socket offset on the foot bone.
fn heel_probe(clip: &Clip, time: f32, leg: &LegConfig) -> Transform {
    Transform::from_translation(leg.heel_socket_offset)
        .compose(&component_transform(clip, time, &leg.foot_bone, false))
}

fn leg_value<'a, T>(values: &'a [T], index: usize) -> Option<&'a T> {
    values.get(index).or_else(|| values.first())
}

/// Hysteresis: while landed, the landed tolerance alone keeps contact; while
/// airborne, the stricter of the two must admit the pose before it can land.
fn tolerance_for(state_landed: bool, cfg: &ContactSampleConfig) -> f32 {
    if state_landed {
        cfg.landed_tolerance
    } else {
        cfg.air_tolerance.min(cfg.landed_tolerance)
    }
}

fn grounded_height_for(index: usize, cfg: &ContactSampleConfig) -> f32 {
    cfg.grounded_heights
        .get(index)
        .copied()
        .unwrap_or(cfg.grounded_height)
}

/// Sharp stepped contact curves: one per limb, apex value while landed,
/// baseline while airborne, with a jump key at every transition. Finishes
/// with the configured filter pass.
pub fn sample_contact_curves(clip: &mut Clip, cfg: &ContactSampleConfig, legs: &[LegConfig]) {
    if cfg.curve_names.is_empty() || cfg.apex_ranges.is_empty() || legs.is_empty() {
        log::warn!("sample_contact_curves: nothing to sample for '{}'", clip.name);
        return;
    }
    let sample_dt = if cfg.frame_rate > 0.0 {
        1.0 / cfg.frame_rate
    } else {
        log::warn!("sample_contact_curves: non-positive frame rate");
        return;
    };

    // Initialize every leg before any curve is written; a zero pose count
    // means the clip itself is degenerate.
    let mut states = Vec::with_capacity(legs.len());
    let mut poses = 0usize;
    for leg in legs {
        let (state, count) = LegContactState::initialize(clip, sample_dt, leg, cfg.idle_pose_frame);
        poses = count.max(poses);
        states.push(state);
    }
    if poses == 0 {
        return;
    }

    let duration = clip.duration();
    for (leg_index, (leg, state)) in legs.iter().zip(states.iter_mut()).enumerate() {
        if !leg.is_valid() {
            continue;
        }
        let Some(curve_name) = leg_value(&cfg.curve_names, leg_index).cloned() else {
            continue;
        };
        let (baseline, apex) = *leg_value(&cfg.apex_ranges, leg_index).unwrap_or(&(0.0, 1.0));
        let grounded = grounded_height_for(leg_index, cfg);

        let mut curve = ScalarCurve::new();
        for pose in 0..poses {
            let landed = state.is_landed_pose(
                pose,
                tolerance_for(state.is_landed, cfg),
                grounded,
                cfg.horizontal_tolerance,
                cfg.use_min_height,
            );

            if state.is_landed != landed {
                state.is_landed = landed;
                let pose_time =
                    (pose as i32 + cfg.offset_frame) as f32 * sample_dt + cfg.offset_time;

                if cfg.min_key_interval > 0.0 {
                    if let Some(last) = curve.last_key() {
                        if pose_time - last.time < cfg.min_key_interval {
                            continue;
                        }
                    }
                }

                let (new_value, old_value) =
                    if landed { (apex, baseline) } else { (baseline, apex) };
                if pose == 0 {
                    curve.add_key(pose_time.max(0.0), new_value);
                } else {
                    curve.add_jump(pose_time, old_value, new_value);
                }
            } else if pose == 0 {
                curve.add_key(0.0, baseline);
            }
        }

        if let Some(last) = curve.last_key() {
            let value = last.value;
            curve.add_key(duration, value);
        }
        curve.set_interp_all(cfg.interp);

        apply_filter(&mut curve, cfg.filter, cfg.filter_tolerance);
        clip.set_curve(curve_name, curve);
    }
    clip.mark_modified();
}

/// Graded weight curves with blended edges: apex while landed, `1 - alpha`
/// toward the airborne apex height otherwise, rising edges ramped with the
/// blend-in spec and falling edges with the blend-out spec. Windows without
/// root displacement collapse to instantaneous steps when
/// `unlock_without_motion` is set.
pub fn sample_weight_curves(clip: &mut Clip, cfg: &ContactSampleConfig, legs: &[LegConfig]) {
    let Some(smoothing) = cfg.smoothing.clone() else {
        // Without smoothing the stepped variant is the right output.
        sample_contact_curves(clip, cfg, legs);
        return;
    };
    if cfg.curve_names.is_empty() || cfg.apex_ranges.is_empty() || legs.is_empty() {
        log::warn!("sample_weight_curves: nothing to sample for '{}'", clip.name);
        return;
    }
    let sample_dt = if cfg.frame_rate > 0.0 {
        1.0 / cfg.frame_rate
    } else {
        return;
    };

    let mut states = Vec::with_capacity(legs.len());
    let mut poses = 0usize;
    for leg in legs {
        let (state, count) = LegContactState::initialize(clip, sample_dt, leg, cfg.idle_pose_frame);
        poses = count.max(poses);
        states.push(state);
    }
    if poses == 0 {
        return;
    }

    let has_motion = has_any_motion_data(clip);
    let duration = clip.duration();

    for (leg_index, (leg, state)) in legs.iter().zip(states.iter_mut()).enumerate() {
        if !leg.is_valid() {
            continue;
        }
        let Some(curve_name) = leg_value(&cfg.curve_names, leg_index).cloned() else {
            continue;
        };
        let (baseline, apex_out) = *leg_value(&cfg.apex_ranges, leg_index).unwrap_or(&(0.0, 1.0));
        let grounded = grounded_height_for(leg_index, cfg);

        let mut curve = ScalarCurve::new();
        let mut apex_height = 0.0f32;
        let mut lower_height = 0.0f32;

        for pose in 0..poses {
            let pose_height = state.max_pose_height(pose);
            let pose_time = (pose as i32 + cfg.offset_frame) as f32 * sample_dt + cfg.offset_time;

            let landed = state.is_landed_pose(
                pose,
                tolerance_for(state.is_landed, cfg),
                grounded,
                cfg.horizontal_tolerance,
                cfg.use_min_height,
            );

            if pose == 0 || state.is_landed != landed {
                if landed {
                    lower_height = state.min_pose_height(pose);
                }
                state.is_landed = landed;

                // Entering the air: find the apex height of this airborne
                // span by scanning forward until the limb lands again.
                if !landed {
                    apex_height = 0.0;
                    for ahead in pose..poses {
                        let trajectory_landed = state.is_landed_pose(
                            ahead,
                            tolerance_for(state.is_landed, cfg),
                            grounded,
                            cfg.horizontal_tolerance,
                            cfg.use_min_height,
                        );
                        if trajectory_landed {
                            break;
                        }
                        apex_height = apex_height.max(state.max_pose_height(ahead));
                    }
                }

                if cfg.min_key_interval > 0.0 {
                    if let Some(last) = curve.last_key() {
                        if pose_time - last.time < cfg.min_key_interval {
                            continue;
                        }
                    }
                }
            }

            let span = apex_height - lower_height;
            let alpha = if span == 0.0 {
                0.0
            } else {
                ((pose_height - lower_height) / span).abs()
            };
            let mut value = if landed {
                apex_out
            } else if smoothing.make_full_weight {
                0.0
            } else {
                1.0 - alpha
            };

            if smoothing.unlock_without_motion && has_motion {
                let key_time = (pose as f32 * sample_dt).clamp(0.0, duration);
                if !has_motion_data(clip, key_time - sample_dt, key_time, sample_dt) {
                    value = 0.0;
                }
            }

            if smoothing.avoid_inverse && curve.len() > 1 && value > WEIGHT_EPSILON {
                let keys = curve.keys();
                let a = keys[keys.len() - 2].value;
                let b = keys[keys.len() - 1].value;
                if a > WEIGHT_EPSILON && b > WEIGHT_EPSILON {
                    if a < b && value < b {
                        continue; // rising ramp, key would dip
                    }
                    if a > b && value > b {
                        continue; // falling ramp, key would bounce
                    }
                }
            }

            curve.add_key(
                pose_time,
                value.clamp(baseline.min(apex_out), baseline.max(apex_out)),
            );
        }

        apply_filter(&mut curve, cfg.filter, cfg.filter_tolerance);

        // A clip that never moves always ends unlocked: rewrite a trailing
        // baseline→apex step back to baseline.
        if smoothing.unlock_without_motion && !has_motion {
            force_tail_unlocked(&mut curve, baseline, apex_out);
        }

        blend_rising_edges(clip, &mut curve, &smoothing, sample_dt, duration, has_motion);
        blend_falling_edges(clip, &mut curve, &smoothing, sample_dt, duration, has_motion);

        apply_filter(&mut curve, cfg.filter, cfg.filter_tolerance);
        clip.set_curve(curve_name, curve);
    }
    clip.mark_modified();
}

fn force_tail_unlocked(curve: &mut ScalarCurve, baseline: f32, apex: f32) {
    if curve.len() <= 3 {
        return;
    }
    let n = curve.len();
    let keys = curve.keys();
    let tail_locked = keys[n - 1].value == apex && keys[n - 2].value == apex;
    let step_from_baseline = keys[n - 3].value == baseline;
    if tail_locked && step_from_baseline {
        let last_time = keys[n - 1].time;
        let drop_time = keys[n - 2].time;
        curve.update_or_add_key(last_time, baseline);
        curve.remove_key_at_time(drop_time);
    }
}

/// Overwrite each rising edge with an alpha-blended ramp, clipped so it never
/// reaches past the neighboring keys. With motion gating on, a window with no
/// root displacement collapses the ramp to a step and removes the stranded
/// non-zero keys.
fn blend_rising_edges(
    clip: &Clip,
    curve: &mut ScalarCurve,
    smoothing: &ContactSmoothing,
    sample_dt: f32,
    duration: f32,
    has_motion: bool,
) {
    let mut result = curve.clone();
    let keys: Vec<_> = curve.keys().to_vec();
    for i in 1..keys.len() {
        let a = keys[i - 1];
        let b = keys[i];
        if b.time >= duration || a.value >= b.value {
            continue;
        }

        let min_key_time = if i >= 2 { keys[i - 2].time } else { 0.0 };
        let offset = smoothing.blend_in_offset_ratio.clamp(0.0, 1.0);
        let mut end_time =
            (b.time + smoothing.blend_in.duration * offset).clamp(0.0, duration);
        let mut blend_time = smoothing.blend_in.duration.min(end_time - min_key_time);

        if smoothing.unlock_without_motion && has_motion && b.value > WEIGHT_EPSILON {
            // Collapse the ramp if any sample in its window has no motion.
            let mut key_time = end_time - blend_time;
            let mut elapsed = 0.0f32;
            while elapsed <= blend_time + WEIGHT_EPSILON {
                if !has_motion_data(clip, key_time - sample_dt, key_time, sample_dt) {
                    end_time = key_time;
                    blend_time = 0.0;
                    for k in keys.iter().rev() {
                        if k.time >= b.time - WEIGHT_EPSILON && k.value != 0.0 {
                            result.remove_key_at_time(k.time);
                        }
                    }
                    break;
                }
                key_time += sample_dt;
                elapsed += sample_dt;
            }
        }

        if blend_time > 0.0 {
            result.remove_key_at_time(b.time);
            let mut blend = AlphaBlendIter::new(&smoothing.blend_in, blend_time);
            let mut key_time = end_time - blend_time;
            let mut elapsed = 0.0f32;
            while elapsed <= blend_time + WEIGHT_EPSILON {
                let weight = blend.value();
                result.update_or_add_key(key_time, a.value + (b.value - a.value) * weight);
                key_time += sample_dt;
                elapsed += sample_dt;
                blend.advance(sample_dt);
            }
        }
    }
    *curve = result;
}

/// Falling-edge counterpart; picks the no-motion blend spec once the clip has
/// stopped displacing.
fn blend_falling_edges(
    clip: &Clip,
    curve: &mut ScalarCurve,
    smoothing: &ContactSmoothing,
    sample_dt: f32,
    duration: f32,
    has_motion: bool,
) {
    let mut result = curve.clone();
    let keys: Vec<_> = curve.keys().to_vec();
    for i in 1..keys.len() {
        let a = keys[i - 1];
        let b = keys[i];
        if a.value <= b.value {
            continue;
        }

        let window_has_motion = if smoothing.unlock_without_motion && has_motion {
            has_motion_data(clip, b.time, b.time + sample_dt, sample_dt)
        } else {
            true
        };
        let (spec, offset_ratio) = if window_has_motion {
            (&smoothing.blend_out, smoothing.blend_out_offset_ratio)
        } else {
            (
                &smoothing.no_motion_blend_out,
                smoothing.no_motion_blend_out_offset_ratio,
            )
        };

        let min_key_time = if i >= 2 { keys[i - 2].time } else { 0.0 };
        let offset = (1.0 - offset_ratio).clamp(0.0, 1.0);
        let end_time = (b.time + spec.duration * offset).clamp(0.0, duration);
        let blend_time = spec.duration.min(end_time - min_key_time);

        if blend_time > 0.0 {
            result.remove_key_at_time(b.time);
            let mut blend = AlphaBlendIter::new(spec, blend_time);
            let mut key_time = end_time - blend_time;
            let mut elapsed = 0.0f32;
            while elapsed <= blend_time + WEIGHT_EPSILON {
                let weight = blend.value();
                result.update_or_add_key(key_time, a.value + (b.value - a.value) * weight);
                key_time += sample_dt;
                elapsed += sample_dt;
                blend.advance(sample_dt);
            }
        }
    }
    *curve = result;
}
