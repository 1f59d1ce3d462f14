// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Component J — interpolation layer (spec.md §4.J).

use crate::agg::Value;

/// Fill strategy for a gap (spec.md §4.J).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InterpType {
    None,
    Prev,
    Next,
    Linear,
    SetValue,
}

/// The two rows bracketing a target timestamp, as found by
/// `neighborPoints` (spec.md §4.J: "the scanner may reverse one block to
/// fetch it").
#[derive(Clone, Debug)]
pub struct NeighborPoints {
    pub before: Option<(i64, Value)>,
    pub exact: Option<(i64, Value)>,
    pub after: Option<(i64, Value)>,
}

/// Point interpolation for a single-timestamp `interp(ts)` query
/// (spec.md §4.J).
///
/// Returns the exact row if present, otherwise synthesizes a value per
/// `interp_type`; `default_value` backs `SetValue`. `None` means no
/// value can be produced (e.g. `Prev` requested but there is no row
/// before the target).
#[must_use]
pub fn interpolate_point(
    target_ts: i64,
    neighbors: &NeighborPoints,
    interp_type: InterpType,
    default_value: Option<Value>,
) -> Option<(i64, Value)> {
    if let Some((ts, v)) = &neighbors.exact {
        return Some((*ts, v.clone()));
    }

    match interp_type {
        InterpType::None => None,
        InterpType::Prev => neighbors.before.clone(),
        InterpType::Next => neighbors.after.clone(),
        InterpType::SetValue => default_value.map(|v| (target_ts, v)),
        InterpType::Linear => {
            let (t0, v0) = neighbors.before.clone()?;
            let (t1, v1) = neighbors.after.clone()?;
            let f0 = v0.as_f64()?;
            let f1 = v1.as_f64()?;
            if t1 == t0 {
                return Some((target_ts, Value::Float(f0)));
            }
            let ratio = (target_ts - t0) as f64 / (t1 - t0) as f64;
            Some((target_ts, Value::Float(f0 + (f1 - f0) * ratio)))
        }
    }
}

/// Range interpolation: emits synthetic rows strictly between two
/// adjacent window outputs whenever the gap between their timestamps
/// exceeds one `interval` (spec.md §4.J "Range interpolation").
///
/// The interpolation cursor is bounded by `ekey`, corrected for scan
/// order — `ekey` is always the upper bound of the gap here, the caller
/// having already normalized ascending/descending ranges before calling.
#[must_use]
pub fn interpolate_range(
    left: (i64, Value),
    right: (i64, Value),
    interval: i64,
    ekey: i64,
    interp_type: InterpType,
) -> Vec<(i64, Value)> {
    let (t0, v0) = left;
    let (t1, v1) = right;

    if interval <= 0 || t1 - t0 <= interval {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut t = t0 + interval;
    while t < t1 && t <= ekey {
        let value = match interp_type {
            InterpType::None => break,
            InterpType::Prev => v0.clone(),
            InterpType::Next => v1.clone(),
            InterpType::SetValue => v0.clone(),
            InterpType::Linear => match (v0.as_f64(), v1.as_f64()) {
                (Some(f0), Some(f1)) => {
                    let ratio = (t - t0) as f64 / (t1 - t0) as f64;
                    Value::Float(f0 + (f1 - f0) * ratio)
                }
                _ => break,
            },
        };
        out.push((t, value));
        t += interval;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_row_wins_over_interpolation() {
        let neighbors = NeighborPoints {
            before: Some((90, Value::Int(1))),
            exact: Some((100, Value::Int(42))),
            after: Some((110, Value::Int(2))),
        };
        assert_eq!(
            interpolate_point(100, &neighbors, InterpType::Linear, None),
            Some((100, Value::Int(42)))
        );
    }

    #[test]
    fn linear_interpolates_between_neighbors() {
        let neighbors = NeighborPoints {
            before: Some((0, Value::Float(0.0))),
            exact: None,
            after: Some((100, Value::Float(100.0))),
        };
        let (ts, v) = interpolate_point(25, &neighbors, InterpType::Linear, None).unwrap();
        assert_eq!(ts, 25);
        assert_eq!(v, Value::Float(25.0));
    }

    #[test]
    fn prev_with_no_before_row_is_none() {
        let neighbors = NeighborPoints { before: None, exact: None, after: Some((110, Value::Int(2))) };
        assert_eq!(interpolate_point(100, &neighbors, InterpType::Prev, None), None);
    }

    #[test]
    fn range_interpolation_fills_gap_larger_than_interval() {
        let out = interpolate_range(
            (0, Value::Float(0.0)),
            (300, Value::Float(30.0)),
            100,
            300,
            InterpType::Linear,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].0, 100);
        assert_eq!(out[1].0, 200);
    }

    #[test]
    fn range_interpolation_skips_when_gap_within_one_interval() {
        let out = interpolate_range(
            (0, Value::Float(0.0)),
            (50, Value::Float(5.0)),
            100,
            50,
            InterpType::Linear,
        );
        assert!(out.is_empty());
    }
}
