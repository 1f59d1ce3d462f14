// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Top-level query state (spec.md §3 "Q", §6.2).

use crate::locator::Order;
use std::sync::atomic::{AtomicBool, Ordering};

/// `query.over` (spec.md §6.2): a small hand-rolled bitfield (no need
/// to reach for a crate for four bits). `COMPLETED` is sticky and cannot
/// co-exist with `NOT_COMPLETED`, enforced by [`Over::set_completed`]
/// rather than left to callers to maintain by convention.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Over(u8);

impl Over {
    pub const NOT_COMPLETED: Over = Over(0b0001);
    pub const COMPLETED: Over = Over(0b0010);
    pub const NO_DATA_TO_CHECK: Over = Over(0b0100);
    pub const RESBUF_FULL: Over = Over(0b1000);

    #[must_use]
    pub fn contains(self, flag: Over) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn insert(&mut self, flag: Over) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: Over) {
        self.0 &= !flag.0;
    }

    /// Sets `COMPLETED` and clears `NOT_COMPLETED`, maintaining the
    /// mutual-exclusion invariant from spec.md §6.2.
    pub fn set_completed(&mut self) {
        self.remove(Self::NOT_COMPLETED);
        self.insert(Self::COMPLETED);
    }

    #[must_use]
    pub fn is_completed(self) -> bool {
        self.contains(Self::COMPLETED)
    }
}

impl Default for Over {
    fn default() -> Self {
        Self::NOT_COMPLETED
    }
}

/// Cancellation flag polled at every block boundary (spec.md §5
/// "Cancellation"). `Clone` shares the same underlying flag so an
/// external collaborator holding a clone can cancel a running query.
#[derive(Clone, Default)]
pub struct KillFlag(std::sync::Arc<AtomicBool>);

impl KillFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kill(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_killed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl crate::scanner::KillSwitch for KillFlag {
    fn is_killed(&self) -> bool {
        Self::is_killed(self)
    }
}

/// One query's top-level state (spec.md §3 `Q`).
pub struct Query {
    pub order: Order,
    pub skey: i64,
    pub ekey: i64,
    pub over: Over,
    pub killed: KillFlag,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Query {
    #[must_use]
    pub fn new(order: Order, skey: i64, ekey: i64) -> Self {
        Self {
            order,
            skey,
            ekey,
            over: Over::default(),
            killed: KillFlag::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Polled at every block boundary (spec.md §5). If killed, sets
    /// `NO_DATA_TO_CHECK` and completes the query, letting the pager
    /// emit whatever has already been produced (spec.md §7 "Out-of-memory
    /// on spill/arena" / cancellation policy).
    pub fn check_killed(&mut self) -> bool {
        if self.killed.is_killed() {
            self.over.insert(Over::NO_DATA_TO_CHECK);
            self.over.set_completed();
            log::debug!("query killed at block boundary, completing with partial results");
            true
        } else {
            false
        }
    }
}
