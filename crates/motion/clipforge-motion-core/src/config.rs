//! Per-operation configuration structs, passed by value into the engine.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::blend::BlendSpec;
use crate::curve::InterpMode;
use crate::filter::FilterKind;

/// Resize/retime target. `None` fields inherit from the source clip.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ResizeConfig {
    /// Target frame rate in frames per second.
    pub frame_rate: Option<f32>,
    /// Target duration in seconds.
    pub duration: Option<f32>,
    /// Duration multiplier; negative values also reverse the clip.
    pub play_rate: Option<f32>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct CropConfig {
    pub start_frame: usize,
    pub end_frame: usize,
}

/// Per-axis weights. `None` leaves the source channel untouched; `Some(w)`
/// moves `w` of the channel onto the target bone. For rotation the axes map
/// to roll (x), pitch (y), yaw (z).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct AxisWeights {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
}

impl AxisWeights {
    pub fn all(weight: f32) -> Self {
        Self {
            x: Some(weight),
            y: Some(weight),
            z: Some(weight),
        }
    }

    pub fn horizontal(weight: f32) -> Self {
        Self {
            x: Some(weight),
            y: Some(weight),
            z: None,
        }
    }
}

/// Which bone carries captured motion and how much of each channel moves
/// during a root-motion conversion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MotionSampleConfig {
    pub motion_bone: String,
    pub global_weight: f32,
    pub translation_weights: AxisWeights,
    pub rotation_weights: AxisWeights,
    /// Rebase the root track so the first frame sits at the origin before
    /// redistributing.
    pub resize_to_origin: bool,
}

impl Default for MotionSampleConfig {
    fn default() -> Self {
        Self {
            motion_bone: "pelvis".into(),
            global_weight: 1.0,
            translation_weights: AxisWeights::all(1.0),
            rotation_weights: AxisWeights::default(),
            resize_to_origin: false,
        }
    }
}

/// Straight per-channel scaling of the root track.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MotionConvertConfig {
    pub translation_ratio: Vec3,
    /// x scales roll, y pitch, z yaw.
    pub rotation_ratio: Vec3,
    pub scale_ratio: Vec3,
    /// Cancel the motion bone's residual local motion so the component-space
    /// pose survives the ratio change.
    pub remove_relative_motion: bool,
}

impl Default for MotionConvertConfig {
    fn default() -> Self {
        Self {
            translation_ratio: Vec3::ONE,
            rotation_ratio: Vec3::ONE,
            scale_ratio: Vec3::ONE,
            remove_relative_motion: false,
        }
    }
}

/// One limb for contact sampling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LegConfig {
    pub foot_bone: String,
    /// Toe/ball bone; empty means the foot bone alone is sampled.
    pub tip_bone: Option<String>,
    /// Contact probe offsets in the owning bone's space.
    pub tip_socket_offset: Vec3,
    pub heel_socket_offset: Vec3,
}

impl LegConfig {
    pub fn is_valid(&self) -> bool {
        !self.foot_bone.is_empty()
    }
}

/// Ramp smoothing for the weight-curve variant of contact sampling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContactSmoothing {
    pub blend_in: BlendSpec,
    pub blend_out: BlendSpec,
    /// Blend used on falling edges once the clip has stopped moving.
    pub no_motion_blend_out: BlendSpec,
    pub blend_in_offset_ratio: f32,
    pub blend_out_offset_ratio: f32,
    pub no_motion_blend_out_offset_ratio: f32,
    /// Force weight to zero over windows with no root displacement.
    pub unlock_without_motion: bool,
    /// Emit 0 instead of the graded `1 - alpha` while airborne.
    pub make_full_weight: bool,
    /// Drop keys that would locally reverse a ramp.
    pub avoid_inverse: bool,
}

impl Default for ContactSmoothing {
    fn default() -> Self {
        Self {
            blend_in: BlendSpec::default(),
            blend_out: BlendSpec::default(),
            no_motion_blend_out: BlendSpec::default(),
            blend_in_offset_ratio: 0.0,
            blend_out_offset_ratio: 0.0,
            no_motion_blend_out_offset_ratio: 0.0,
            unlock_without_motion: false,
            make_full_weight: false,
            avoid_inverse: true,
        }
    }
}

/// Contact state machine configuration shared by both contact outputs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContactSampleConfig {
    /// Pose sampling rate in frames per second.
    pub frame_rate: f32,
    /// One output curve name per leg; extra legs reuse the first name.
    pub curve_names: Vec<String>,
    /// (baseline, apex) output range per leg; extra legs reuse the first.
    pub apex_ranges: Vec<(f32, f32)>,
    /// World height of the ground plane; per-leg overrides win.
    pub grounded_height: f32,
    pub grounded_heights: Vec<f32>,
    /// Landing threshold while airborne; the stricter of the two tolerances
    /// gates touchdown.
    pub air_tolerance: f32,
    /// Contact margin that keeps a landed limb landed.
    pub landed_tolerance: f32,
    pub offset_time: f32,
    pub offset_frame: i32,
    /// Minimum spacing between emitted keys; 0 disables the check.
    pub min_key_interval: f32,
    pub interp: InterpMode,
    pub filter: FilterKind,
    pub filter_tolerance: f32,
    /// Classify on the lower of tip/heel when true, the higher otherwise.
    pub use_min_height: bool,
    /// Record idle-pose reference transforms at this frame and classify by
    /// drift from them instead of height.
    pub idle_pose_frame: Option<usize>,
    /// Maximum drift from the idle pose that still counts as contact.
    pub horizontal_tolerance: Option<f32>,
    pub smoothing: Option<ContactSmoothing>,
}

impl Default for ContactSampleConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            curve_names: vec!["foot_contact".into()],
            apex_ranges: vec![(0.0, 1.0)],
            grounded_height: 0.0,
            grounded_heights: Vec::new(),
            air_tolerance: 1.0,
            landed_tolerance: 1.0,
            offset_time: 0.0,
            offset_frame: 0,
            min_key_interval: 0.0,
            interp: InterpMode::Constant,
            filter: FilterKind::Bake,
            filter_tolerance: 0.001,
            use_min_height: true,
            idle_pose_frame: None,
            horizontal_tolerance: None,
            smoothing: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleAxis {
    X,
    Y,
    #[default]
    Z,
}

/// One output curve of the pose-distance sampler and its sampling gate.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PoseSampleCurveConfig {
    pub output_curve: String,
    /// Gate: only sample while this curve equals `reference_value`.
    pub reference_curve: Option<String>,
    pub reference_value: f32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PoseSampleBoneConfig {
    pub bone: String,
    /// Distance/sign partner; the root when absent.
    pub reference_bone: Option<String>,
    /// Per-axis sign multipliers; 0 reads as 1.
    pub axis_weights: Vec3,
    pub curves: Vec<PoseSampleCurveConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoseSearchConfig {
    /// Pose sampling rate in frames per second.
    pub frame_rate: f32,
    pub axis: SampleAxis,
    /// Gate look-ahead in frames; negative disables gating entirely.
    pub tolerance_frames: i32,
    pub bones: Vec<PoseSampleBoneConfig>,
}

impl Default for PoseSearchConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            axis: SampleAxis::Z,
            tolerance_frames: -1,
            bones: Vec::new(),
        }
    }
}
