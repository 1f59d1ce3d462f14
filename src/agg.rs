// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Component G — aggregation context (spec.md §4.G).
//!
//! Each output column owns one `AggContext`. `enum_dispatch` generates
//! the vtable so the window engine can hold a `Vec<AggContext>` without
//! boxing each one individually, the same trick the teacher uses at its
//! compaction-strategy boundary.

use crate::locator::Order;
use enum_dispatch::enum_dispatch;

/// A single decoded cell. Numeric kinds are widened to `f64`/`i64` at
/// the aggregation boundary (matching how the original engine keeps one
/// double-precision accumulator regardless of the column's storage
/// width); `Binary`/`NChar` values stay as owned bytes.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
}

impl Value {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Null | Self::Bytes(_) => None,
        }
    }
}

/// One block's worth of input to an aggregate's batched path.
pub struct AggInput<'a> {
    pub timestamps: &'a [i64],
    pub values: &'a [Value],
    pub order: Order,
}

/// One emitted output cell plus, where relevant, the source row's
/// timestamp (needed by `first_dst`/`last_dst`/`top`/`bottom` so the
/// pager can project companion columns).
#[derive(Clone, Debug, PartialEq)]
pub struct AggOutput {
    pub value: Value,
    pub ts: Option<i64>,
}

/// Lifecycle shared by every aggregate kind (spec.md §4.G: "`init`...,
/// per-block `xFunction`..., `xNextStep`..., `xFinalize`").
#[enum_dispatch]
pub trait AggregateFn {
    /// Resets to zero state; called when a window (re)opens.
    fn init(&mut self);

    /// Batched per-block update, the common path for a master pass.
    fn x_function(&mut self, input: &AggInput<'_>);

    /// Per-row update, used when a block can't be processed in bulk
    /// (e.g. a block straddling a window boundary).
    fn x_function_f(&mut self, ts: i64, value: &Value);

    /// Called on every context between the master and supplementary
    /// passes (spec.md §4.I); most kinds no-op, direction-sensitive
    /// kinds use it to prepare for scanning in reverse.
    fn x_next_step(&mut self) {}

    /// Hands the enclosing window's `[skey, ekey]` extent to a context
    /// that needs it to finalize (spec.md §4.H opens a window with its
    /// boundaries already known). Most kinds ignore it; `twa` uses it to
    /// weight the time before its first sample and after its last one.
    fn set_window(&mut self, _skey: i64, _ekey: i64) {}

    /// Produces this window's final output. May be called more than
    /// once for `top`/`bottom`/`diff`, which emit more than one row.
    fn x_finalize(&mut self) -> Vec<AggOutput>;

    /// `true` for the five kinds a supplementary pass is allowed to run
    /// (spec.md §4.G/§4.I: `first, last, first_dst, last_dst` plus
    /// `tag`/`ts` passthroughs, modeled here as "needs no supplement").
    fn runs_in_supplementary_pass(&self) -> bool {
        false
    }
}

#[derive(Default)]
pub struct CountAgg {
    count: i64,
}
impl AggregateFn for CountAgg {
    fn init(&mut self) {
        self.count = 0;
    }
    fn x_function(&mut self, input: &AggInput<'_>) {
        self.count += input.values.iter().filter(|v| !matches!(v, Value::Null)).count() as i64;
    }
    fn x_function_f(&mut self, _ts: i64, value: &Value) {
        if !matches!(value, Value::Null) {
            self.count += 1;
        }
    }
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        vec![AggOutput { value: Value::Int(self.count), ts: None }]
    }
}

#[derive(Default)]
pub struct SumAgg {
    sum: f64,
    any: bool,
}
impl AggregateFn for SumAgg {
    fn init(&mut self) {
        self.sum = 0.0;
        self.any = false;
    }
    fn x_function(&mut self, input: &AggInput<'_>) {
        for v in input.values {
            if let Some(f) = v.as_f64() {
                self.sum += f;
                self.any = true;
            }
        }
    }
    fn x_function_f(&mut self, _ts: i64, value: &Value) {
        if let Some(f) = value.as_f64() {
            self.sum += f;
            self.any = true;
        }
    }
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        let value = if self.any { Value::Float(self.sum) } else { Value::Null };
        vec![AggOutput { value, ts: None }]
    }
}

#[derive(Default)]
pub struct AvgAgg {
    sum: f64,
    count: i64,
}
impl AggregateFn for AvgAgg {
    fn init(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }
    fn x_function(&mut self, input: &AggInput<'_>) {
        for v in input.values {
            if let Some(f) = v.as_f64() {
                self.sum += f;
                self.count += 1;
            }
        }
    }
    fn x_function_f(&mut self, _ts: i64, value: &Value) {
        if let Some(f) = value.as_f64() {
            self.sum += f;
            self.count += 1;
        }
    }
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        let value = if self.count > 0 { Value::Float(self.sum / self.count as f64) } else { Value::Null };
        vec![AggOutput { value, ts: None }]
    }
}

#[derive(Default)]
pub struct MinMaxAgg {
    want_max: bool,
    extreme: Option<f64>,
    extreme_ts: Option<i64>,
}
impl MinMaxAgg {
    #[must_use]
    pub fn min() -> Self {
        Self { want_max: false, ..Default::default() }
    }
    #[must_use]
    pub fn max() -> Self {
        Self { want_max: true, ..Default::default() }
    }
    fn consider(&mut self, ts: i64, f: f64) {
        let better = match self.extreme {
            None => true,
            Some(cur) => if self.want_max { f > cur } else { f < cur },
        };
        if better {
            self.extreme = Some(f);
            self.extreme_ts = Some(ts);
        }
    }
}
impl AggregateFn for MinMaxAgg {
    fn init(&mut self) {
        self.extreme = None;
        self.extreme_ts = None;
    }
    fn x_function(&mut self, input: &AggInput<'_>) {
        for (ts, v) in input.timestamps.iter().zip(input.values.iter()) {
            if let Some(f) = v.as_f64() {
                self.consider(*ts, f);
            }
        }
    }
    fn x_function_f(&mut self, ts: i64, value: &Value) {
        if let Some(f) = value.as_f64() {
            self.consider(ts, f);
        }
    }
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        let value = self.extreme.map_or(Value::Null, Value::Float);
        vec![AggOutput { value, ts: self.extreme_ts }]
    }
}

/// Tracks sum/sum-of-squares/count so `spread` and `stddev` share one
/// accumulator shape (both are derived purely from those three moments).
#[derive(Default)]
pub struct MomentsAgg {
    want_spread: bool,
    sum: f64,
    sum_sq: f64,
    count: i64,
    min: Option<f64>,
    max: Option<f64>,
}
impl MomentsAgg {
    #[must_use]
    pub fn spread() -> Self {
        Self { want_spread: true, ..Default::default() }
    }
    #[must_use]
    pub fn stddev() -> Self {
        Self { want_spread: false, ..Default::default() }
    }
}
impl AggregateFn for MomentsAgg {
    fn init(&mut self) {
        *self = Self { want_spread: self.want_spread, ..Default::default() };
    }
    fn x_function(&mut self, input: &AggInput<'_>) {
        for v in input.values {
            self.x_function_f(0, v);
        }
    }
    fn x_function_f(&mut self, _ts: i64, value: &Value) {
        if let Some(f) = value.as_f64() {
            self.sum += f;
            self.sum_sq += f * f;
            self.count += 1;
            self.min = Some(self.min.map_or(f, |m| m.min(f)));
            self.max = Some(self.max.map_or(f, |m| m.max(f)));
        }
    }
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        let value = if self.want_spread {
            match (self.min, self.max) {
                (Some(min), Some(max)) => Value::Float(max - min),
                _ => Value::Null,
            }
        } else if self.count > 0 {
            let mean = self.sum / self.count as f64;
            let variance = (self.sum_sq / self.count as f64) - mean * mean;
            Value::Float(variance.max(0.0).sqrt())
        } else {
            Value::Null
        };
        vec![AggOutput { value, ts: None }]
    }
}

/// `first`/`last`: direction-sensitive, one of the five kinds a
/// supplementary pass is allowed to run (spec.md §4.G/§4.I).
#[derive(Default)]
pub struct FirstLastAgg {
    want_last: bool,
    value: Option<Value>,
    ts: Option<i64>,
}
impl FirstLastAgg {
    #[must_use]
    pub fn first() -> Self {
        Self { want_last: false, ..Default::default() }
    }
    #[must_use]
    pub fn last() -> Self {
        Self { want_last: true, ..Default::default() }
    }
}
impl AggregateFn for FirstLastAgg {
    fn init(&mut self) {
        self.value = None;
        self.ts = None;
    }
    fn x_function(&mut self, input: &AggInput<'_>) {
        for (ts, v) in input.timestamps.iter().zip(input.values.iter()) {
            self.x_function_f(*ts, v);
        }
    }
    fn x_function_f(&mut self, ts: i64, value: &Value) {
        if matches!(value, Value::Null) {
            return;
        }
        let take = match (self.ts, self.want_last) {
            (None, _) => true,
            (Some(cur), true) => ts >= cur,
            (Some(cur), false) => ts < cur,
        };
        if take {
            self.value = Some(value.clone());
            self.ts = Some(ts);
        }
    }
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        vec![AggOutput { value: self.value.clone().unwrap_or(Value::Null), ts: self.ts }]
    }
    fn runs_in_supplementary_pass(&self) -> bool {
        true
    }
}

/// `first_dst`/`last_dst`: like `first`/`last` but never answerable from
/// a pre-aggregate alone — always needs the ts column (spec.md §4.G).
pub type FirstDstLastDstAgg = FirstLastAgg;

/// `top`/`bottom(k)`: keeps the `k` most extreme `(ts, value)` pairs via
/// `interval-heap`, the same structure the teacher reaches for whenever
/// it needs a fixed-capacity double-ended priority queue.
pub struct TopBottomAgg {
    want_top: bool,
    k: usize,
    heap: interval_heap::IntervalHeap<(ordered_float_key::OrderedF64, i64)>,
}
impl TopBottomAgg {
    #[must_use]
    pub fn top(k: usize) -> Self {
        Self { want_top: true, k, heap: interval_heap::IntervalHeap::with_capacity(k) }
    }
    #[must_use]
    pub fn bottom(k: usize) -> Self {
        Self { want_top: false, k, heap: interval_heap::IntervalHeap::with_capacity(k) }
    }
}
impl AggregateFn for TopBottomAgg {
    fn init(&mut self) {
        self.heap = interval_heap::IntervalHeap::with_capacity(self.k);
    }
    fn x_function(&mut self, input: &AggInput<'_>) {
        for (ts, v) in input.timestamps.iter().zip(input.values.iter()) {
            self.x_function_f(*ts, v);
        }
    }
    fn x_function_f(&mut self, ts: i64, value: &Value) {
        let Some(f) = value.as_f64() else { return };
        let key = ordered_float_key::OrderedF64(f);

        if self.heap.len() < self.k {
            self.heap.push((key, ts));
        } else if self.want_top {
            let should_replace = self.heap.pop_min().is_some_and(|(m, mts)| {
                if key > m {
                    true
                } else {
                    self.heap.push((m, mts));
                    false
                }
            });
            if should_replace {
                self.heap.push((key, ts));
            }
        } else {
            let should_replace = self.heap.pop_max().is_some_and(|(m, mts)| {
                if key < m {
                    true
                } else {
                    self.heap.push((m, mts));
                    false
                }
            });
            if should_replace {
                self.heap.push((key, ts));
            }
        }
    }
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        // Drain in descending order regardless of top/bottom: top-k is
        // reported largest-first, bottom-k smallest-first, which after
        // collecting ascending (pop_min repeatedly) just means bottom
        // keeps the natural order and top reverses it.
        let mut ascending = Vec::with_capacity(self.heap.len());
        while let Some((key, ts)) = self.heap.pop_min() {
            ascending.push((key.0, ts));
        }
        if self.want_top {
            ascending.reverse();
        }
        ascending.into_iter().map(|(f, ts)| AggOutput { value: Value::Float(f), ts: Some(ts) }).collect()
    }
}

/// A small wrapper so `f64` can live in an ordered collection; NaNs
/// never appear in a time series value column in practice, and if one
/// did it would simply sort as the heap's ordering defines (no panics).
mod ordered_float_key {
    #[derive(Copy, Clone, Debug, PartialEq)]
    pub struct OrderedF64(pub f64);
    impl Eq for OrderedF64 {}
    impl PartialOrd for OrderedF64 {
        fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }
    impl Ord for OrderedF64 {
        fn cmp(&self, other: &Self) -> std::cmp::Ordering {
            self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
        }
    }
}

/// Time-weighted average: `sum(value[i] * (ts[i+1]-ts[i])) / (ekey-skey)`,
/// the weighted sum extended to the window's own boundaries rather than
/// just the span between the first and last sample — a window whose rows
/// don't reach `skey`/`ekey` still weights by the full window width, not
/// by how much of it happened to contain data (spec.md §4.G `twa`).
#[derive(Default)]
pub struct TwaAgg {
    points: Vec<(i64, f64)>,
    skey: Option<i64>,
    ekey: Option<i64>,
}
impl AggregateFn for TwaAgg {
    fn init(&mut self) {
        self.points.clear();
    }
    fn x_function(&mut self, input: &AggInput<'_>) {
        for (ts, v) in input.timestamps.iter().zip(input.values.iter()) {
            if let Some(f) = v.as_f64() {
                self.points.push((*ts, f));
            }
        }
    }
    fn x_function_f(&mut self, ts: i64, value: &Value) {
        if let Some(f) = value.as_f64() {
            self.points.push((ts, f));
        }
    }
    fn set_window(&mut self, skey: i64, ekey: i64) {
        self.skey = Some(skey);
        self.ekey = Some(ekey);
    }
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        if self.points.is_empty() {
            return vec![AggOutput { value: Value::Null, ts: None }];
        }
        self.points.sort_by_key(|(ts, _)| *ts);

        let Some(skey) = self.skey else {
            return Self::finalize_over_sample_span(&self.points);
        };
        let Some(ekey) = self.ekey else {
            return Self::finalize_over_sample_span(&self.points);
        };

        let span = ekey - skey;
        if span <= 0 {
            return vec![AggOutput { value: Value::Null, ts: None }];
        }

        #[expect(clippy::indexing_slicing, reason = "points is non-empty by construction above")]
        let (first_ts, first_v) = self.points[0];
        let mut weighted = first_v * (first_ts - skey) as f64;

        for pair in self.points.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, _) = pair[1];
            weighted += v0 * (t1 - t0) as f64;
        }

        #[expect(clippy::indexing_slicing, reason = "points is non-empty by construction above")]
        let (last_ts, last_v) = self.points[self.points.len() - 1];
        weighted += last_v * (ekey - last_ts) as f64;

        vec![AggOutput { value: Value::Float(weighted / span as f64), ts: None }]
    }
}
impl TwaAgg {
    /// Falls back to weighting only the span between the first and last
    /// sample, for a context never handed a window extent (e.g. a bare
    /// `twa` used directly in a test, outside the window engine).
    fn finalize_over_sample_span(points: &[(i64, f64)]) -> Vec<AggOutput> {
        if points.len() < 2 {
            return vec![AggOutput { value: Value::Null, ts: None }];
        }
        let mut weighted = 0.0;
        let mut span = 0i64;
        for pair in points.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, _) = pair[1];
            let dt = t1 - t0;
            weighted += v0 * dt as f64;
            span += dt;
        }
        let value = if span > 0 { Value::Float(weighted / span as f64) } else { Value::Null };
        vec![AggOutput { value, ts: None }]
    }
}

/// `diff`: emits `n-1` rows, one per consecutive pair.
#[derive(Default)]
pub struct DiffAgg {
    points: Vec<(i64, f64)>,
}
impl AggregateFn for DiffAgg {
    fn init(&mut self) {
        self.points.clear();
    }
    fn x_function(&mut self, input: &AggInput<'_>) {
        for (ts, v) in input.timestamps.iter().zip(input.values.iter()) {
            if let Some(f) = v.as_f64() {
                self.points.push((*ts, f));
            }
        }
    }
    fn x_function_f(&mut self, ts: i64, value: &Value) {
        if let Some(f) = value.as_f64() {
            self.points.push((ts, f));
        }
    }
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        self.points.sort_by_key(|(ts, _)| *ts);
        self.points
            .windows(2)
            .map(|pair| AggOutput { value: Value::Float(pair[1].1 - pair[0].1), ts: Some(pair[1].0) })
            .collect()
    }
}

/// `rate`/`irate`: rate of change per second between the first and last
/// (rate) or last two (irate) points in the window.
#[derive(Default)]
pub struct RateAgg {
    instantaneous: bool,
    points: Vec<(i64, f64)>,
}
impl RateAgg {
    #[must_use]
    pub fn rate() -> Self {
        Self { instantaneous: false, points: Vec::new() }
    }
    #[must_use]
    pub fn irate() -> Self {
        Self { instantaneous: true, points: Vec::new() }
    }
}
impl AggregateFn for RateAgg {
    fn init(&mut self) {
        self.points.clear();
    }
    fn x_function(&mut self, input: &AggInput<'_>) {
        for (ts, v) in input.timestamps.iter().zip(input.values.iter()) {
            if let Some(f) = v.as_f64() {
                self.points.push((*ts, f));
            }
        }
    }
    fn x_function_f(&mut self, ts: i64, value: &Value) {
        if let Some(f) = value.as_f64() {
            self.points.push((ts, f));
        }
    }
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        self.points.sort_by_key(|(ts, _)| *ts);
        let Some(&(t0, v0)) = (if self.instantaneous { self.points.iter().rev().nth(1) } else { self.points.first() })
        else {
            return vec![AggOutput { value: Value::Null, ts: None }];
        };
        let Some(&(t1, v1)) = self.points.last() else {
            return vec![AggOutput { value: Value::Null, ts: None }];
        };
        let dt_secs = (t1 - t0) as f64 / 1_000.0;
        let value = if dt_secs > 0.0 { Value::Float((v1 - v0) / dt_secs) } else { Value::Null };
        vec![AggOutput { value, ts: None }]
    }
}

/// `percentile`: linear-interpolated rank statistic over every sampled
/// value in the window (spec.md §4.G: output 1, no ts dependency, no
/// pre-agg). Recovered from `examples/original_source`'s
/// `apercentile`/`percentile` family, dropped entirely by the
/// distillation (spec.md SPEC_FULL.md "Feature supplements").
pub struct PercentileAgg {
    percentile: f64,
    values: Vec<f64>,
}
impl PercentileAgg {
    #[must_use]
    pub fn new(percentile: f64) -> Self {
        Self { percentile, values: Vec::new() }
    }
}
impl AggregateFn for PercentileAgg {
    fn init(&mut self) {
        self.values.clear();
    }
    fn x_function(&mut self, input: &AggInput<'_>) {
        self.values.extend(input.values.iter().filter_map(Value::as_f64));
    }
    fn x_function_f(&mut self, _ts: i64, value: &Value) {
        if let Some(f) = value.as_f64() {
            self.values.push(f);
        }
    }
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        if self.values.is_empty() {
            return vec![AggOutput { value: Value::Null, ts: None }];
        }
        self.values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = self.values.len();
        let rank = (self.percentile / 100.0) * (n - 1) as f64;
        let lo = rank.floor().max(0.0) as usize;
        let hi = rank.ceil().max(0.0) as usize;
        let frac = rank - rank.floor();

        #[expect(clippy::indexing_slicing, reason = "lo/hi derived from rank clamped into [0, n-1]")]
        let value = if lo == hi { self.values[lo] } else { self.values[lo] + (self.values[hi] - self.values[lo]) * frac };

        vec![AggOutput { value: Value::Float(value), ts: None }]
    }
}

/// Passthrough kinds (`tag`, `tagprj`, `ts_dummy`): the value is fixed
/// for the whole query (a tag literal) or is the row's own timestamp,
/// never aggregated.
pub struct PassthroughAgg {
    fixed: Value,
}
impl PassthroughAgg {
    #[must_use]
    pub fn tag(value: Value) -> Self {
        Self { fixed: value }
    }
    #[must_use]
    pub fn ts_dummy() -> Self {
        Self { fixed: Value::Null }
    }
}
impl AggregateFn for PassthroughAgg {
    fn init(&mut self) {}
    fn x_function(&mut self, _input: &AggInput<'_>) {}
    fn x_function_f(&mut self, ts: i64, _value: &Value) {
        if matches!(self.fixed, Value::Null) {
            self.fixed = Value::Int(ts);
        }
    }
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        vec![AggOutput { value: self.fixed.clone(), ts: None }]
    }
    fn runs_in_supplementary_pass(&self) -> bool {
        true
    }
}

/// `ts_comp`: a verbatim-copy stream of the primary timestamp column,
/// recovered from `examples/original_source` (spec.md SPEC_FULL.md
/// "Feature supplements" — not an aggregate in the usual sense, it just
/// accumulates the raw bytes for a later `SELECT _block_dist`-style
/// consumer).
#[derive(Default)]
pub struct TsCompAgg {
    raw: Vec<u8>,
}
impl AggregateFn for TsCompAgg {
    fn init(&mut self) {
        self.raw.clear();
    }
    fn x_function(&mut self, input: &AggInput<'_>) {
        self.raw.extend(input.timestamps.iter().flat_map(|t| t.to_le_bytes()));
    }
    fn x_function_f(&mut self, ts: i64, _value: &Value) {
        self.raw.extend_from_slice(&ts.to_le_bytes());
    }
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        vec![AggOutput { value: Value::Bytes(std::mem::take(&mut self.raw)), ts: None }]
    }
}

/// `arithmetic`: applies a binary op element-wise across two already
/// computed input columns, emitting one row per input row.
#[derive(Copy, Clone, Debug)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}
pub struct ArithmeticAgg {
    op: ArithOp,
    lhs: Vec<f64>,
    rhs: Vec<f64>,
}
impl ArithmeticAgg {
    #[must_use]
    pub fn new(op: ArithOp) -> Self {
        Self { op, lhs: Vec::new(), rhs: Vec::new() }
    }

    /// Feeds one row's operand pair directly (arithmetic doesn't scan
    /// blocks itself; it composes two already-materialized columns).
    pub fn push_pair(&mut self, lhs: f64, rhs: f64) {
        self.lhs.push(lhs);
        self.rhs.push(rhs);
    }
}
impl AggregateFn for ArithmeticAgg {
    fn init(&mut self) {
        self.lhs.clear();
        self.rhs.clear();
    }
    fn x_function(&mut self, _input: &AggInput<'_>) {}
    fn x_function_f(&mut self, _ts: i64, _value: &Value) {}
    fn x_finalize(&mut self) -> Vec<AggOutput> {
        self.lhs
            .iter()
            .zip(self.rhs.iter())
            .map(|(&a, &b)| {
                let v = match self.op {
                    ArithOp::Add => a + b,
                    ArithOp::Sub => a - b,
                    ArithOp::Mul => a * b,
                    ArithOp::Div => a / b,
                };
                AggOutput { value: Value::Float(v), ts: None }
            })
            .collect()
    }
}

#[enum_dispatch(AggregateFn)]
pub enum AggContext {
    Count(CountAgg),
    Sum(SumAgg),
    Avg(AvgAgg),
    MinMax(MinMaxAgg),
    Moments(MomentsAgg),
    FirstLast(FirstLastAgg),
    TopBottom(TopBottomAgg),
    Twa(TwaAgg),
    Diff(DiffAgg),
    Rate(RateAgg),
    Percentile(PercentileAgg),
    Passthrough(PassthroughAgg),
    TsComp(TsCompAgg),
    Arithmetic(ArithmeticAgg),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(ts: &'a [i64], values: &'a [Value]) -> AggInput<'a> {
        AggInput { timestamps: ts, values, order: Order::Ascending }
    }

    #[test]
    fn count_skips_nulls() {
        let mut ctx: AggContext = CountAgg::default().into();
        ctx.init();
        let ts = [1, 2, 3];
        let values = [Value::Int(1), Value::Null, Value::Int(3)];
        ctx.x_function(&input(&ts, &values));
        assert_eq!(ctx.x_finalize(), vec![AggOutput { value: Value::Int(2), ts: None }]);
    }

    #[test]
    fn min_max_track_timestamp_of_extreme() {
        let mut min: AggContext = MinMaxAgg::min().into();
        min.init();
        let ts = [10, 20, 30];
        let values = [Value::Int(5), Value::Int(1), Value::Int(9)];
        min.x_function(&input(&ts, &values));
        assert_eq!(min.x_finalize(), vec![AggOutput { value: Value::Float(1.0), ts: Some(20) }]);
    }

    #[test]
    fn last_takes_latest_timestamp_regardless_of_scan_order() {
        let mut last: AggContext = FirstLastAgg::last().into();
        last.init();
        last.x_function_f(5, &Value::Int(50));
        last.x_function_f(2, &Value::Int(20));
        assert_eq!(last.x_finalize(), vec![AggOutput { value: Value::Int(50), ts: Some(5) }]);
        assert!(last.runs_in_supplementary_pass());
    }

    #[test]
    fn top_k_keeps_largest_values() {
        let mut top: AggContext = TopBottomAgg::top(2).into();
        top.init();
        for (ts, v) in [(1, 3.0), (2, 9.0), (3, 1.0), (4, 7.0)] {
            top.x_function_f(ts, &Value::Float(v));
        }
        let out = top.x_finalize();
        let values: Vec<f64> = out.iter().map(|o| o.value.as_f64().unwrap()).collect();
        assert_eq!(values, vec![9.0, 7.0]);
    }

    #[test]
    fn diff_emits_n_minus_one_rows() {
        let mut diff: AggContext = DiffAgg::default().into();
        diff.init();
        for (ts, v) in [(1, 10.0), (2, 15.0), (3, 13.0)] {
            diff.x_function_f(ts, &Value::Float(v));
        }
        let out = diff.x_finalize();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].value, Value::Float(5.0));
        assert_eq!(out[1].value, Value::Float(-2.0));
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let mut ctx: AggContext = PercentileAgg::new(50.0).into();
        ctx.init();
        for v in [1.0, 2.0, 3.0, 4.0] {
            ctx.x_function_f(0, &Value::Float(v));
        }
        // n=4, rank = 0.5 * 3 = 1.5 -> interpolates between values[1]=2 and values[2]=3
        assert_eq!(ctx.x_finalize(), vec![AggOutput { value: Value::Float(2.5), ts: None }]);
    }

    #[test]
    fn percentile_zero_and_hundred_are_extremes() {
        let mut min: AggContext = PercentileAgg::new(0.0).into();
        min.init();
        let mut max: AggContext = PercentileAgg::new(100.0).into();
        max.init();
        for v in [5.0, 1.0, 9.0, 3.0] {
            min.x_function_f(0, &Value::Float(v));
            max.x_function_f(0, &Value::Float(v));
        }
        assert_eq!(min.x_finalize(), vec![AggOutput { value: Value::Float(1.0), ts: None }]);
        assert_eq!(max.x_finalize(), vec![AggOutput { value: Value::Float(9.0), ts: None }]);
    }

    #[test]
    fn twa_weights_by_full_window_extent_not_just_sample_span() {
        let mut ctx: AggContext = TwaAgg::default().into();
        ctx.init();
        ctx.set_window(0, 100);
        // One sample at the window's midpoint: value 10 the whole way.
        ctx.x_function_f(50, &Value::Float(10.0));
        assert_eq!(ctx.x_finalize(), vec![AggOutput { value: Value::Float(10.0), ts: None }]);
    }

    #[test]
    fn twa_without_window_falls_back_to_sample_span() {
        let mut ctx: AggContext = TwaAgg::default().into();
        ctx.init();
        ctx.x_function_f(0, &Value::Float(0.0));
        ctx.x_function_f(100, &Value::Float(10.0));
        // sample-span fallback: sum(v[i]*dt) / span = (0*100) / 100 = 0
        assert_eq!(ctx.x_finalize(), vec![AggOutput { value: Value::Float(0.0), ts: None }]);
    }

    #[test]
    fn stddev_and_spread_share_moments() {
        let mut spread: AggContext = MomentsAgg::spread().into();
        spread.init();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            spread.x_function_f(0, &Value::Float(v));
        }
        assert_eq!(spread.x_finalize(), vec![AggOutput { value: Value::Float(7.0), ts: None }]);
    }
}
