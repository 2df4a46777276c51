//! Operation descriptors: a tagged enum of every batch operation plus one
//! dispatch point. The host builds a descriptor from its UI state and hands
//! it to `apply`; there is no per-command type hierarchy.

use serde::{Deserialize, Serialize};

use crate::config::{
    ContactSampleConfig, CropConfig, LegConfig, MotionConvertConfig, MotionSampleConfig,
    PoseSearchConfig, ResizeConfig,
};
use crate::contact::{sample_contact_curves, sample_weight_curves};
use crate::data::Clip;
use crate::filter::{apply_filter, FilterKind};
use crate::pose_search::sample_distance;
use crate::resample::{crop_clip, resize_clip};
use crate::root_motion::{
    apply_root_motion_ratio, convert_motion_to_root, convert_root_to_motion, sample_motion_curves,
    BoneCurveSet,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Operation {
    /// Retime the clip to a new duration / frame rate / play rate.
    Resize(ResizeConfig),
    /// Remove an inclusive frame range.
    Crop(CropConfig),
    /// Scale the root track per channel.
    ConvertRootMotion {
        sample: MotionSampleConfig,
        convert: MotionConvertConfig,
    },
    /// Move captured motion from the motion bone onto the root.
    MotionToRoot(MotionSampleConfig),
    /// Move root motion onto the motion bone.
    RootToMotion(MotionSampleConfig),
    /// Run one curve filter over a named scalar curve.
    FilterCurve {
        curve: String,
        kind: FilterKind,
        tolerance: f32,
    },
    /// Emit stepped per-limb contact curves.
    SampleContactCurves {
        config: ContactSampleConfig,
        legs: Vec<LegConfig>,
    },
    /// Emit graded, edge-blended per-limb weight curves.
    SampleWeightCurves {
        config: ContactSampleConfig,
        legs: Vec<LegConfig>,
    },
    /// Emit signed pose-distance curves.
    SamplePoseDistance(PoseSearchConfig),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Resize(_) => "resize",
            Operation::Crop(_) => "crop",
            Operation::ConvertRootMotion { .. } => "convert-root-motion",
            Operation::MotionToRoot(_) => "motion-to-root",
            Operation::RootToMotion(_) => "root-to-motion",
            Operation::FilterCurve { .. } => "filter-curve",
            Operation::SampleContactCurves { .. } => "sample-contact-curves",
            Operation::SampleWeightCurves { .. } => "sample-weight-curves",
            Operation::SamplePoseDistance(_) => "sample-pose-distance",
        }
    }
}

/// Run one operation against the clip. Missing data degrades to a no-op for
/// the affected element; the clip is marked modified by the operations that
/// write anything.
pub fn apply(clip: &mut Clip, operation: &Operation) {
    log::info!("applying '{}' to clip '{}'", operation.name(), clip.name);
    match operation {
        Operation::Resize(cfg) => resize_clip(clip, cfg),
        Operation::Crop(cfg) => crop_clip(clip, cfg),
        Operation::ConvertRootMotion { sample, convert } => {
            let mut curves = BoneCurveSet::new();
            apply_root_motion_ratio(clip, sample, convert, &mut curves);
        }
        Operation::MotionToRoot(cfg) => {
            let curves = sample_motion_curves(clip, cfg);
            convert_motion_to_root(clip, cfg, &curves);
        }
        Operation::RootToMotion(cfg) => {
            convert_root_to_motion(clip, cfg);
        }
        Operation::FilterCurve {
            curve,
            kind,
            tolerance,
        } => {
            let (kind, tolerance) = (*kind, *tolerance);
            let filtered = match clip.curve_mut(curve) {
                Some(target) => {
                    apply_filter(target, kind, tolerance);
                    true
                }
                None => false,
            };
            if filtered {
                clip.mark_modified();
            } else {
                log::warn!("filter-curve: no curve named '{curve}'");
            }
        }
        Operation::SampleContactCurves { config, legs } => {
            sample_contact_curves(clip, config, legs);
        }
        Operation::SampleWeightCurves { config, legs } => {
            sample_weight_curves(clip, config, legs);
        }
        Operation::SamplePoseDistance(cfg) => sample_distance(clip, cfg),
    }
}
