// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! S7 (spec.md §8): point interpolation. Rows `(100, 10.0)` and
//! `(200, 20.0)`; `interp(v) at ts=150 fill linear` -> `15.0`; at
//! `ts=100` -> `10.0` exactly (the real row wins over synthesis); at
//! `ts=101` with `fill none` -> empty.

use test_log::test;
use vnode_query_engine::agg::Value;
use vnode_query_engine::interp::{interpolate_point, InterpType, NeighborPoints};

fn neighbors_around(target: i64) -> NeighborPoints {
    NeighborPoints {
        before: (target > 100).then_some((100, Value::Float(10.0))),
        exact: (target == 100).then_some((100, Value::Float(10.0))).or((target == 200).then_some((200, Value::Float(20.0)))),
        after: (target < 200).then_some((200, Value::Float(20.0))),
    }
}

#[test]
fn linear_interp_at_150_is_15() {
    let (ts, v) = interpolate_point(150, &neighbors_around(150), InterpType::Linear, None).unwrap();
    assert_eq!(ts, 150);
    assert_eq!(v, Value::Float(15.0));
}

#[test]
fn exact_row_at_100_wins_over_interpolation() {
    let (ts, v) = interpolate_point(100, &neighbors_around(100), InterpType::Linear, None).unwrap();
    assert_eq!(ts, 100);
    assert_eq!(v, Value::Float(10.0));
}

#[test]
fn fill_none_with_no_exact_row_yields_nothing() {
    let result = interpolate_point(101, &neighbors_around(101), InterpType::None, None);
    assert_eq!(result, None);
}
