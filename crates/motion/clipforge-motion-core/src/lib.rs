//! Clipforge Motion Core (engine-agnostic)
//!
//! The motion curve engine: track retiming, root-motion redistribution,
//! curve filtering, ground-contact sampling, and pose search. Every public
//! operation is a synchronous batch transformation of one clip; the host
//! serializes edits and persists whatever `Clip::mark_modified` flags.

pub mod blend;
pub mod bone;
pub mod config;
pub mod contact;
pub mod curve;
pub mod data;
pub mod filter;
pub mod interp;
pub mod op;
pub mod pose_search;
pub mod resample;
pub mod root_motion;
pub mod skeleton;

// Re-exports for consumers (host adapters)
pub use blend::{AlphaBlendIter, BlendCurve, BlendSpec};
pub use config::{
    AxisWeights, ContactSampleConfig, ContactSmoothing, CropConfig, LegConfig,
    MotionConvertConfig, MotionSampleConfig, PoseSampleBoneConfig, PoseSampleCurveConfig,
    PoseSearchConfig, ResizeConfig, SampleAxis,
};
pub use contact::{sample_contact_curves, sample_weight_curves, LegContactState};
pub use curve::{CurveKey, InterpMode, ScalarCurve, TangentWeightMode, Tangents};
pub use data::{BoneTrack, Clip};
pub use filter::{apply_filter, euler_filter, reduce_filter, FilterKind};
pub use op::{apply, Operation};
pub use pose_search::{can_sample_pose, is_loop_clip, is_same_pose, sample_distance};
pub use resample::{crop_clip, resize_clip};
pub use root_motion::{
    convert_motion_to_root, convert_root_to_motion, extract_root_motion,
    extract_root_motion_range, sample_motion_curves, sample_root_motion_curves, BoneCurveSet,
};
pub use skeleton::{Bone, Skeleton};
pub use clipforge_api_core::{CoreError, Rotator, Transform};
