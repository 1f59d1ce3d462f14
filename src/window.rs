// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Component H — window engine (spec.md §4.H).
//!
//! One `WindowSet` per query: either a single context group (no
//! aggregation), a time-keyed set of tumbling/sliding windows, or a
//! group-by-value-keyed set. Closed windows spill to fixed-size pages
//! through [`crate::spill`] once a configured threshold of closed
//! windows accumulates, the same "compact once a watermark is crossed"
//! shape the teacher applies to its own compaction trigger.

use crate::agg::AggContext;
use crate::locator::Order;
use rustc_hash::FxHashMap;

/// A group-by key: either a window start time or an arbitrary grouped
/// column value, hashed the same way regardless of origin (spec.md
/// §4.H "otherwise identical").
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum WindowKey {
    Time(i64),
    Int(i64),
    Bytes(Vec<u8>),
}

/// One active window's extent and per-output-column aggregation state.
pub struct WindowEntry {
    pub key: WindowKey,
    pub skey: i64,
    pub ekey: i64,
    pub closed: bool,
    pub contexts: Vec<AggContext>,
    /// Set once the supplementary pass determines this window's
    /// direction-sensitive aggregates are already satisfied (spec.md
    /// §4.I "reopened selectively").
    pub supplement_done: bool,
}

/// Window boundary alignment (spec.md §4.H): `skey = floor((t - epoch) /
/// interval) * interval + epoch`, `ekey = skey + interval - 1`. When the
/// query spans less than one interval, the window degenerates to the
/// whole query range to avoid overflowing `ekey`.
#[must_use]
pub fn align_window(t: i64, epoch: i64, interval: i64, query_key_first: i64, degenerate: bool) -> (i64, i64) {
    if degenerate {
        return (query_key_first, i64::MAX);
    }
    let skey = (t - epoch).div_euclid(interval) * interval + epoch;
    let ekey = skey.saturating_add(interval).saturating_sub(1);
    (skey, ekey)
}

/// Per-query set of windows (or the single group for non-aggregated
/// queries), indexed by key for O(1) lookup (spec.md §4.H "hash table
/// startKey -> windowIndex").
pub struct WindowSet {
    entries: Vec<WindowEntry>,
    index: FxHashMap<WindowKey, usize>,
    order: Order,
    closed_spill_threshold: usize,
    closed_count: usize,
}

impl WindowSet {
    #[must_use]
    pub fn new(order: Order, closed_spill_threshold: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
            order,
            closed_spill_threshold,
            closed_count: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&WindowEntry> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut WindowEntry> {
        self.entries.get_mut(index)
    }

    /// Opens (or returns the already-open) window for `key`, capacity
    /// doubling as the vector grows (spec.md §4.H "Capacity grows by
    /// doubling").
    pub fn open_or_get(
        &mut self,
        key: WindowKey,
        skey: i64,
        ekey: i64,
        make_contexts: impl FnOnce() -> Vec<AggContext>,
    ) -> usize {
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }

        if self.entries.len() == self.entries.capacity() {
            let grow_to = (self.entries.capacity() * 2).max(4);
            self.entries.reserve(grow_to - self.entries.len());
        }

        let mut contexts = make_contexts();
        for ctx in &mut contexts {
            ctx.init();
            ctx.set_window(skey, ekey);
        }

        let idx = self.entries.len();
        self.entries.push(WindowEntry {
            key: key.clone(),
            skey,
            ekey,
            closed: false,
            contexts,
            supplement_done: false,
        });
        self.index.insert(key, idx);
        idx
    }

    /// Closes every window whose `ekey` (ascending) / `skey`
    /// (descending) has fallen strictly behind `last_key`, the scan
    /// watermark (spec.md §4.H).
    pub fn close_elapsed(&mut self, last_key: i64) {
        for entry in &mut self.entries {
            if entry.closed {
                continue;
            }
            let elapsed = match self.order {
                Order::Ascending => entry.ekey < last_key,
                Order::Descending => entry.skey > last_key,
            };
            if elapsed {
                entry.closed = true;
                self.closed_count += 1;
            }
        }
    }

    #[must_use]
    pub fn should_compact(&self) -> bool {
        self.closed_count >= self.closed_spill_threshold && self.closed_spill_threshold > 0
    }

    /// Removes every closed window from the active set, returning them
    /// for the caller to spill via [`crate::spill::SpillArea`] and
    /// rebasing the hash index to the surviving entries' new indices
    /// (spec.md §4.H "rebases the hash table to the new indices").
    pub fn compact(&mut self) -> Vec<WindowEntry> {
        let mut closed = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());

        for entry in self.entries.drain(..) {
            if entry.closed {
                closed.push(entry);
            } else {
                kept.push(entry);
            }
        }

        self.entries = kept;
        self.closed_count = 0;

        self.index.clear();
        for (idx, entry) in self.entries.iter().enumerate() {
            self.index.insert(entry.key.clone(), idx);
        }

        closed
    }
}

/// Active-window discovery for one row in sliding mode (spec.md §4.H):
/// starting either from `prev_skey` (cursor == -1) or from the
/// currently active window, steps by `sliding` until the row's
/// timestamp falls in `[skey, ekey]`. Returns every window start the row
/// belongs to, since `sliding < interval` lets one row span several
/// overlapping windows.
#[must_use]
pub fn active_windows(
    t: i64,
    prev_skey: i64,
    cursor_skey: Option<i64>,
    interval: i64,
    sliding: i64,
    order: Order,
) -> Vec<i64> {
    let start = cursor_skey.unwrap_or(prev_skey);
    let step = sliding.max(1);

    let mut out = Vec::new();
    let mut skey = start;
    let ascending = matches!(order, Order::Ascending);

    // Walk forward (or backward, for descending order) from `start`
    // until we've passed every window that could contain `t`; sliding
    // windows overlap only within one `interval`, so this terminates in
    // at most `interval / sliding + 1` steps.
    loop {
        let ekey = skey + interval - 1;
        if ascending {
            if skey > t {
                break;
            }
            if t <= ekey {
                out.push(skey);
            }
            skey += step;
        } else {
            if ekey < t {
                break;
            }
            if skey <= t {
                out.push(skey);
            }
            skey -= step;
        }

        if out.len() > (interval / step + 2) as usize {
            break;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_window_basic() {
        let (skey, ekey) = align_window(105, 0, 100, 0, false);
        assert_eq!((skey, ekey), (100, 199));
    }

    #[test]
    fn align_window_degenerate_range_spans_whole_query() {
        let (skey, ekey) = align_window(105, 0, 100, 50, true);
        assert_eq!((skey, ekey), (50, i64::MAX));
    }

    #[test]
    fn open_or_get_reuses_existing_window() {
        let mut set = WindowSet::new(Order::Ascending, 4);
        let idx1 = set.open_or_get(WindowKey::Time(100), 100, 199, Vec::new);
        let idx2 = set.open_or_get(WindowKey::Time(100), 100, 199, Vec::new);
        assert_eq!(idx1, idx2);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn close_elapsed_marks_windows_behind_watermark() {
        let mut set = WindowSet::new(Order::Ascending, 1);
        set.open_or_get(WindowKey::Time(0), 0, 99, Vec::new);
        set.open_or_get(WindowKey::Time(100), 100, 199, Vec::new);

        set.close_elapsed(150);
        assert!(set.get(0).unwrap().closed);
        assert!(!set.get(1).unwrap().closed);
        assert!(set.should_compact());
    }

    #[test]
    fn compact_removes_closed_windows_and_rebases_index() {
        let mut set = WindowSet::new(Order::Ascending, 1);
        set.open_or_get(WindowKey::Time(0), 0, 99, Vec::new);
        set.open_or_get(WindowKey::Time(100), 100, 199, Vec::new);
        set.close_elapsed(150);

        let closed = set.compact();
        assert_eq!(closed.len(), 1);
        assert_eq!(set.len(), 1);

        let idx = set.open_or_get(WindowKey::Time(100), 100, 199, Vec::new);
        assert_eq!(idx, 0);
    }

    #[test]
    fn sliding_window_row_spans_multiple_overlapping_windows() {
        // interval=100, sliding=50: windows [0,99],[50,149],[100,199]...
        let windows = active_windows(120, 0, None, 100, 50, Order::Ascending);
        assert_eq!(windows, vec![50, 100]);
    }
}
