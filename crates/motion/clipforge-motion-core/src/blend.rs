//! Alpha-blend ramp evaluation.
//!
//! Each smoothing ramp constructs a fresh `AlphaBlendIter`; there is no
//! reusable blend object carrying state between sampling passes.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendCurve {
    #[default]
    Linear,
    /// Smoothstep.
    Cubic,
    /// Smootherstep.
    HermiteCubic,
    Sinusoidal,
}

impl BlendCurve {
    pub fn map(&self, alpha: f32) -> f32 {
        let a = alpha.clamp(0.0, 1.0);
        match self {
            BlendCurve::Linear => a,
            BlendCurve::Cubic => a * a * (3.0 - 2.0 * a),
            BlendCurve::HermiteCubic => a * a * a * (a * (a * 6.0 - 15.0) + 10.0),
            BlendCurve::Sinusoidal => (a * std::f32::consts::FRAC_PI_2).sin(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BlendSpec {
    /// Ramp length in seconds.
    pub duration: f32,
    pub curve: BlendCurve,
}

impl Default for BlendSpec {
    fn default() -> Self {
        Self {
            duration: 0.2,
            curve: BlendCurve::Linear,
        }
    }
}

/// Iterator-style ramp: construct per pass, advance by the sample step, read
/// the mapped weight.
#[derive(Clone, Debug)]
pub struct AlphaBlendIter {
    curve: BlendCurve,
    duration: f32,
    elapsed: f32,
}

impl AlphaBlendIter {
    /// `duration` overrides the spec's duration (ramps get clipped against
    /// neighboring keys).
    pub fn new(spec: &BlendSpec, duration: f32) -> Self {
        Self {
            curve: spec.curve,
            duration: duration.max(0.0),
            elapsed: 0.0,
        }
    }

    pub fn value(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        self.curve.map(self.elapsed / self.duration)
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed = (self.elapsed + dt).min(self.duration);
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }
}
