//! Transform algebra: compose, delta, blend, relative-space conversion.
//!
//! Conventions:
//! - `compose(parent)` expresses `self` (a local transform in `parent`'s
//!   space) in the parent's parent space; chaining up the hierarchy yields a
//!   component-space transform.
//! - `delta` is component-wise: translation subtracts, rotation multiplies by
//!   the inverse. It is the "root motion between two poses" operation, not a
//!   space change.
//! - Rotation is renormalized after every composition.

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::angles::normalize_angle;

const TRANSLATION_EPSILON: f32 = 1e-4;

/// Euler view of a rotation, degrees. Roll is about X, pitch about Y, yaw
/// about Z, composed intrinsically yaw-pitch-roll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotator {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Rotator {
    pub const ZERO: Rotator = Rotator {
        roll: 0.0,
        pitch: 0.0,
        yaw: 0.0,
    };

    pub fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }

    pub fn from_quat(q: Quat) -> Self {
        let (yaw, pitch, roll) = q.to_euler(EulerRot::ZYX);
        Self {
            roll: roll.to_degrees(),
            pitch: pitch.to_degrees(),
            yaw: yaw.to_degrees(),
        }
    }

    pub fn to_quat(self) -> Quat {
        Quat::from_euler(
            EulerRot::ZYX,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            self.roll.to_radians(),
        )
        .normalize()
    }

    /// Wrap every channel into (-180, 180].
    pub fn normalized(self) -> Self {
        Self {
            roll: normalize_angle(self.roll),
            pitch: normalize_angle(self.pitch),
            yaw: normalize_angle(self.yaw),
        }
    }
}

impl std::ops::Add for Rotator {
    type Output = Rotator;
    fn add(self, rhs: Rotator) -> Rotator {
        Rotator {
            roll: self.roll + rhs.roll,
            pitch: self.pitch + rhs.pitch,
            yaw: self.yaw + rhs.yaw,
        }
    }
}

/// Translation + rotation + scale. Rotation is kept normalized by every
/// operation that composes quaternions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation: rotation.normalize(),
            scale,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation: rotation.normalize(),
            ..Self::IDENTITY
        }
    }

    pub fn rotator(&self) -> Rotator {
        Rotator::from_quat(self.rotation)
    }

    pub fn set_rotator(&mut self, rotator: Rotator) {
        self.rotation = rotator.to_quat();
    }

    /// Express `self` (local in `parent`'s space) one level up the hierarchy.
    pub fn compose(&self, parent: &Transform) -> Transform {
        Transform {
            translation: parent.rotation * (self.translation * parent.scale) + parent.translation,
            rotation: (parent.rotation * self.rotation).normalize(),
            scale: self.scale * parent.scale,
        }
    }

    /// Express `self` (given in the same space as `base`) relative to `base`.
    /// Inverse of `compose`.
    pub fn to_relative(&self, base: &Transform) -> Transform {
        let inv_rot = base.rotation.inverse();
        let safe_scale = Vec3::new(
            safe_recip(base.scale.x),
            safe_recip(base.scale.y),
            safe_recip(base.scale.z),
        );
        Transform {
            translation: (inv_rot * (self.translation - base.translation)) * safe_scale,
            rotation: (inv_rot * self.rotation).normalize(),
            scale: self.scale * safe_scale,
        }
    }

    /// Component-wise delta `a - b`: translation subtracts, rotation composes
    /// with the inverse.
    pub fn delta(a: &Transform, b: &Transform) -> Transform {
        Transform {
            translation: a.translation - b.translation,
            rotation: (a.rotation * b.rotation.inverse()).normalize(),
            scale: a.scale,
        }
    }

    /// Component-wise accumulate `a + b`, the inverse of `delta`.
    pub fn add_delta(a: &Transform, b: &Transform) -> Transform {
        Transform {
            translation: a.translation + b.translation,
            rotation: (a.rotation * b.rotation).normalize(),
            scale: a.scale,
        }
    }

    /// Linear blend of translation and scale, spherical blend of rotation.
    pub fn blend(a: &Transform, b: &Transform, alpha: f32) -> Transform {
        let alpha = alpha.clamp(0.0, 1.0);
        Transform {
            translation: a.translation.lerp(b.translation, alpha),
            rotation: a.rotation.slerp(b.rotation, alpha).normalize(),
            scale: a.scale.lerp(b.scale, alpha),
        }
    }

    /// Per-axis weighted blend toward `other`. Rotation blends through Euler
    /// channels so each axis can carry its own weight.
    pub fn blend_weighted(
        &self,
        other: &Transform,
        translation_weight: Vec3,
        rotation_weight: Vec3,
        scale_weight: Vec3,
    ) -> Transform {
        let t = Vec3::new(
            lerp(self.translation.x, other.translation.x, translation_weight.x),
            lerp(self.translation.y, other.translation.y, translation_weight.y),
            lerp(self.translation.z, other.translation.z, translation_weight.z),
        );
        let ra = self.rotator();
        let rb = other.rotator();
        let rotator = Rotator {
            roll: lerp(ra.roll, rb.roll, rotation_weight.x),
            pitch: lerp(ra.pitch, rb.pitch, rotation_weight.y),
            yaw: lerp(ra.yaw, rb.yaw, rotation_weight.z),
        };
        let s = Vec3::new(
            lerp(self.scale.x, other.scale.x, scale_weight.x),
            lerp(self.scale.y, other.scale.y, scale_weight.y),
            lerp(self.scale.z, other.scale.z, scale_weight.z),
        );
        Transform {
            translation: t,
            rotation: rotator.to_quat(),
            scale: s,
        }
    }

    /// Snap sub-epsilon translation axes to zero, wrap rotation channels, and
    /// renormalize the quaternion.
    pub fn normalize_in_place(&mut self) {
        let mut t = self.translation;
        t.x = if t.x.abs() >= TRANSLATION_EPSILON { t.x } else { 0.0 };
        t.y = if t.y.abs() >= TRANSLATION_EPSILON { t.y } else { 0.0 };
        t.z = if t.z.abs() >= TRANSLATION_EPSILON { t.z } else { 0.0 };
        self.translation = t;
        self.rotation = self.rotator().normalized().to_quat();
    }

    pub fn is_nearly_identity(&self, tolerance: f32) -> bool {
        self.translation.abs().max_element() <= tolerance
            && self.rotation.angle_between(Quat::IDENTITY) <= tolerance
    }

    /// Component-wise equality within `tolerance`; rotation compares the
    /// closer of `q` and `-q` so both quaternion covers of a rotation match.
    pub fn approx_eq(&self, other: &Transform, tolerance: f32) -> bool {
        if (self.translation - other.translation).abs().max_element() > tolerance {
            return false;
        }
        if (self.scale - other.scale).abs().max_element() > tolerance {
            return false;
        }
        let q = glam::Vec4::from(self.rotation);
        let p = glam::Vec4::from(other.rotation);
        let direct = (q - p).abs().max_element();
        let flipped = (q + p).abs().max_element();
        direct.min(flipped) <= tolerance
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn safe_recip(v: f32) -> f32 {
    if v.abs() <= f32::EPSILON {
        0.0
    } else {
        v.recip()
    }
}
