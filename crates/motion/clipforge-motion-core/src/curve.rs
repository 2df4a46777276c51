//! Scalar keyed curves.
//!
//! Keys are kept sorted by time and times are unique: an instantaneous jump
//! is a single key carrying `value_before` (the value the curve arrives at)
//! and `value` (the value it leaves with). This replaces the duplicate-time /
//! epsilon-offset key encoding, which does not survive resampling.

use serde::{Deserialize, Serialize};

use crate::interp::{bezier_interp, bezier_to_power, lerp, solve_cubic};

/// Two keys closer than this are considered the same key.
pub const KEY_TIME_EPSILON: f32 = 1e-6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpMode {
    Constant,
    #[default]
    Linear,
    Cubic,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TangentWeightMode {
    #[default]
    None,
    Arrive,
    Leave,
    Both,
}

/// Cubic tangent data. Tangents are slopes (value per second); weights are
/// 2D handle lengths, used only when the matching side of `weight_mode` is
/// weighted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tangents {
    pub arrive: f32,
    pub leave: f32,
    pub arrive_weight: f32,
    pub leave_weight: f32,
    pub weight_mode: TangentWeightMode,
}

impl Tangents {
    pub fn arrive_is_weighted(&self) -> bool {
        matches!(
            self.weight_mode,
            TangentWeightMode::Arrive | TangentWeightMode::Both
        )
    }

    pub fn leave_is_weighted(&self) -> bool {
        matches!(
            self.weight_mode,
            TangentWeightMode::Leave | TangentWeightMode::Both
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    /// Value at and after `time`.
    pub value: f32,
    /// When set, the value the curve holds immediately before `time`
    /// (instantaneous jump marker).
    #[serde(default)]
    pub value_before: Option<f32>,
    #[serde(default)]
    pub interp: InterpMode,
    #[serde(default)]
    pub tangents: Tangents,
}

impl CurveKey {
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            value_before: None,
            interp: InterpMode::default(),
            tangents: Tangents::default(),
        }
    }

    pub fn with_interp(time: f32, value: f32, interp: InterpMode) -> Self {
        Self {
            interp,
            ..Self::new(time, value)
        }
    }

    /// Value the curve arrives at: the before-side of a jump, else `value`.
    pub fn arriving_value(&self) -> f32 {
        self.value_before.unwrap_or(self.value)
    }

    pub fn is_jump(&self) -> bool {
        self.value_before.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalarCurve {
    keys: Vec<CurveKey>,
}

impl ScalarCurve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    pub fn keys_mut(&mut self) -> &mut [CurveKey] {
        &mut self.keys
    }

    pub fn first_key(&self) -> Option<&CurveKey> {
        self.keys.first()
    }

    pub fn last_key(&self) -> Option<&CurveKey> {
        self.keys.last()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    fn find_at(&self, time: f32) -> Option<usize> {
        self.keys
            .iter()
            .position(|k| (k.time - time).abs() <= KEY_TIME_EPSILON)
    }

    /// Insert a key, replacing the value of an existing key at the same time.
    /// Returns the key index.
    pub fn add_key(&mut self, time: f32, value: f32) -> usize {
        self.insert(CurveKey::new(time, value))
    }

    /// Same contract as `add_key`; kept as a separate name so call sites read
    /// like the operations they port.
    pub fn update_or_add_key(&mut self, time: f32, value: f32) -> usize {
        self.add_key(time, value)
    }

    pub fn insert(&mut self, key: CurveKey) -> usize {
        if let Some(i) = self.find_at(key.time) {
            let before = self.keys[i].value_before;
            self.keys[i] = CurveKey {
                value_before: key.value_before.or(before),
                ..key
            };
            return i;
        }
        let at = self
            .keys
            .iter()
            .position(|k| k.time > key.time)
            .unwrap_or(self.keys.len());
        self.keys.insert(at, key);
        at
    }

    /// Record an instantaneous jump: the curve is `before` immediately before
    /// `time` and `after` from `time` on.
    pub fn add_jump(&mut self, time: f32, before: f32, after: f32) -> usize {
        if let Some(i) = self.find_at(time) {
            self.keys[i].value_before = Some(before);
            self.keys[i].value = after;
            return i;
        }
        self.insert(CurveKey {
            time,
            value: after,
            value_before: Some(before),
            interp: InterpMode::default(),
            tangents: Tangents::default(),
        })
    }

    pub fn remove_key(&mut self, index: usize) -> Option<CurveKey> {
        if index < self.keys.len() {
            Some(self.keys.remove(index))
        } else {
            None
        }
    }

    pub fn remove_key_at_time(&mut self, time: f32) -> Option<CurveKey> {
        self.find_at(time).map(|i| self.keys.remove(i))
    }

    pub fn set_interp_all(&mut self, interp: InterpMode) {
        for key in &mut self.keys {
            key.interp = interp;
        }
    }

    pub fn eval(&self, time: f32) -> f32 {
        match self.keys.len() {
            0 => 0.0,
            1 => {
                let k = &self.keys[0];
                if time < k.time - KEY_TIME_EPSILON {
                    k.arriving_value()
                } else {
                    k.value
                }
            }
            _ => {
                let first = &self.keys[0];
                let last = &self.keys[self.keys.len() - 1];
                if time < first.time - KEY_TIME_EPSILON {
                    return first.arriving_value();
                }
                if time >= last.time - KEY_TIME_EPSILON {
                    return last.value;
                }
                let mut i = 0;
                while i + 1 < self.keys.len() && self.keys[i + 1].time <= time + KEY_TIME_EPSILON {
                    i += 1;
                }
                eval_segment(&self.keys[i], &self.keys[i + 1], time)
            }
        }
    }
}

/// Evaluate the curve between two keys at `time`, honoring the left key's
/// interpolation mode and both keys' tangent data. The right key contributes
/// its arriving side, so a jump key terminates the segment at `value_before`.
pub fn eval_segment(left: &CurveKey, right: &CurveKey, time: f32) -> f32 {
    let right_value = right.arriving_value();
    let diff = right.time - left.time;
    if diff <= 0.0 || left.interp == InterpMode::Constant {
        return left.value;
    }
    let alpha = ((time - left.time) / diff).clamp(0.0, 1.0);
    let p0 = left.value;
    let p3 = right_value;
    match left.interp {
        InterpMode::Linear => lerp(p0, p3, alpha),
        InterpMode::Cubic => {
            let unweighted = !left.tangents.leave_is_weighted() && !right.tangents.arrive_is_weighted();
            if unweighted {
                let one_third = 1.0 / 3.0;
                let p1 = p0 + left.tangents.leave * diff * one_third;
                let p2 = p3 - right.tangents.arrive * diff * one_third;
                bezier_interp(p0, p1, p2, p3, alpha)
            } else {
                weighted_eval(left, right, right_value, alpha)
            }
        }
        InterpMode::Constant => left.value,
    }
}

/// Weighted cubic evaluation: tangents are 2D handles, so the time axis is a
/// cubic Bezier in its own right and the parameter matching `alpha` has to be
/// recovered by solving that cubic.
fn weighted_eval(left: &CurveKey, right: &CurveKey, right_value: f32, alpha: f32) -> f32 {
    let one_third = 1.0 / 3.0;
    let t1 = left.time;
    let t2 = right.time;
    let range_x = t2 - t1;

    let angle = left.tangents.leave.atan();
    let (sin_a, cos_a) = angle.sin_cos();
    let leave_weight = if left.tangents.leave_is_weighted() {
        left.tangents.leave_weight
    } else {
        let y = left.tangents.leave * range_x;
        (range_x * range_x + y * y).sqrt() * one_third
    };
    let key1_tan_x = cos_a * leave_weight + t1;
    let key1_tan_y = sin_a * leave_weight + left.value;

    let angle = right.tangents.arrive.atan();
    let (sin_a, cos_a) = angle.sin_cos();
    let arrive_weight = if right.tangents.arrive_is_weighted() {
        right.tangents.arrive_weight
    } else {
        let y = right.tangents.arrive * range_x;
        (range_x * range_x + y * y).sqrt() * one_third
    };
    let key2_tan_x = -cos_a * arrive_weight + t2;
    let key2_tan_y = -sin_a * arrive_weight + right_value;

    // Normalize the time axis and convert the x Bezier to the power basis
    // (f64 for root-finding precision).
    let nx1 = ((key1_tan_x - t1) / range_x) as f64;
    let nx2 = ((key2_tan_x - t1) / range_x) as f64;
    let (c3, c2, c1, c0) = bezier_to_power(0.0, nx1, nx2, 1.0);
    let coeff = [c0 - alpha as f64, c1, c2, c3];

    let mut results = [0.0f64; 3];
    let num_results = solve_cubic(coeff, &mut results);
    let new_interp = if num_results == 1 {
        results[0] as f32
    } else {
        let mut best = f32::MIN;
        for r in results.iter().take(num_results) {
            let r = *r as f32;
            if (0.0..=1.0).contains(&r) && (best < 0.0 || r > best) {
                best = r;
            }
        }
        if best == f32::MIN {
            0.0
        } else {
            best
        }
    };

    bezier_interp(left.value, key1_tan_y, key2_tan_y, right_value, new_interp)
}
