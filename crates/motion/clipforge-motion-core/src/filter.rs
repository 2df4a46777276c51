//! In-place scalar-curve filters: angle unwinding and tolerance-driven key
//! reduction.

use serde::{Deserialize, Serialize};

use clipforge_api_core::wind_relative_angle;

use crate::curve::{eval_segment, ScalarCurve};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    /// Exact curve, no filtering.
    #[default]
    Bake,
    Euler,
    Reduce,
}

pub fn apply_filter(curve: &mut ScalarCurve, kind: FilterKind, tolerance: f32) {
    match kind {
        FilterKind::Bake => {}
        FilterKind::Euler => euler_filter(curve),
        FilterKind::Reduce => reduce_filter(curve, tolerance),
    }
}

/// Unwind each key against its predecessor so adjacent values never differ by
/// more than half a turn. Jump keys keep their after-side untouched; a jump
/// is a deliberate discontinuity, not an unwinding artifact.
pub fn euler_filter(curve: &mut ScalarCurve) {
    if curve.len() <= 2 {
        return;
    }
    let keys = curve.keys_mut();
    for i in 1..keys.len() {
        let prev_value = keys[i - 1].value;
        match keys[i].value_before {
            Some(before) => {
                keys[i].value_before = Some(wind_relative_angle(prev_value, before));
            }
            None => {
                keys[i].value = wind_relative_angle(prev_value, keys[i].value);
            }
        }
    }
}

/// Greedy left-to-right key reduction. An interior key is dropped when the
/// curve evaluated without it — directly between the most recently retained
/// key and the next key — stays within `tolerance` of the key's value. First
/// and last keys are never removed; jump keys are load-bearing and always
/// retained.
pub fn reduce_filter(curve: &mut ScalarCurve, tolerance: f32) {
    if curve.len() <= 2 {
        return;
    }

    let mut anchor = 0usize;
    let mut remove = Vec::new();
    {
        let keys = curve.keys();
        for i in 1..keys.len() - 1 {
            let key = &keys[i];
            if key.is_jump() {
                anchor = i;
                continue;
            }
            let value_without = eval_segment(&keys[anchor], &keys[i + 1], key.time);
            if (value_without - key.value).abs() > tolerance {
                anchor = i;
            } else {
                remove.push(i);
            }
        }
    }

    for index in remove.into_iter().rev() {
        curve.remove_key(index);
    }
}
