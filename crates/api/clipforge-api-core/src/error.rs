//! Common error taxonomy.
//!
//! Batch operations follow a fail-soft contract: missing data degrades to a
//! per-element no-op and invalid ranges are clamped. `CoreError` is returned
//! only from constructors and validators, where the host has to know the
//! input was unusable before any work starts.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("bone '{0}' not found in skeleton")]
    MissingBone(String),

    #[error("no track for bone '{0}'")]
    MissingTrack(String),

    #[error("curve '{0}' not found")]
    MissingCurve(String),

    #[error("frame/time range [{start}, {end}] is invalid")]
    InvalidRange { start: f32, end: f32 },

    #[error("degenerate interval: {0}")]
    DegenerateMath(&'static str),

    #[error("clip has no frames")]
    EmptyClip,

    #[error("skeleton is invalid: {0}")]
    InvalidSkeleton(String),
}
