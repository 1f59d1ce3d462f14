// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Component I — two-pass scanner (spec.md §4.I).
//!
//! `ScanPhase` is an explicit enum (spec.md §9 redesign guidance: avoid
//! the original's field-flip tricks) rather than a boolean or a reused
//! direction field, so the master/supplementary distinction reads at
//! every call site instead of being inferred from `order`.

use crate::locator::Order;
use crate::position::{BlockExtent, Cursor};

/// Which of the two scans is currently running.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScanPhase {
    /// Runs in the query's chosen order; for a query whose only
    /// direction-sensitive aggregate is `last`, the order is flipped to
    /// descending up front so the first qualifying row closes the
    /// window (spec.md §4.I "optimised").
    Master,
    /// Only runs if the master pass left a direction-sensitive aggregate
    /// unsatisfied; reverses direction and disables every aggregate
    /// except the five listed in spec.md §4.G.
    Supplementary,
}

/// Per-table scan state threaded through both passes.
pub struct ScanState {
    pub phase: ScanPhase,
    pub order: Order,
    pub skey: i64,
    pub ekey: i64,
    pub cursor: Cursor,
    /// Saved so the supplementary pass (and any resumption after it)
    /// can restore exactly where the master pass left off (spec.md
    /// §4.F "save/restore").
    saved_master_cursor: Option<(crate::position::Position, BlockExtent)>,
}

impl ScanState {
    #[must_use]
    pub fn new(order: Order, skey: i64, ekey: i64, cursor: Cursor) -> Self {
        Self { phase: ScanPhase::Master, order, skey, ekey, cursor, saved_master_cursor: None }
    }

    /// `true` if any context in `contexts` needs the supplementary pass
    /// (spec.md §4.I: "only if the query carries any direction-sensitive
    /// aggregate not satisfied by the master pass").
    #[must_use]
    pub fn needs_supplement(contexts: &[crate::agg::AggContext]) -> bool {
        use crate::agg::AggregateFn;
        contexts.iter().any(crate::agg::AggregateFn::runs_in_supplementary_pass)
    }

    /// Transitions from `Master` to `Supplementary`: flips `order`,
    /// swaps `skey`/`ekey`, calls `xNextStep` on every context, and
    /// repositions the cursor to scan from `endPos` back to `startPos`
    /// (spec.md §4.I "Between the two passes").
    pub fn enter_supplementary(&mut self, contexts: &mut [crate::agg::AggContext]) {
        use crate::agg::AggregateFn;

        debug_assert_eq!(self.phase, ScanPhase::Master);
        self.saved_master_cursor = Some(self.cursor.save());

        self.phase = ScanPhase::Supplementary;
        self.order = self.order.flipped();
        std::mem::swap(&mut self.skey, &mut self.ekey);

        for ctx in contexts {
            ctx.x_next_step();
        }
    }

    /// Restores the cursor saved before the supplementary pass began, so
    /// a subsequent table (or a continuation of this one) resumes from
    /// the master pass's own position rather than the supplementary
    /// pass's final one (spec.md §4.F).
    pub fn finish_supplementary(&mut self) {
        debug_assert_eq!(self.phase, ScanPhase::Supplementary);
        if let Some(saved) = self.saved_master_cursor.take() {
            self.cursor.restore(saved);
        }
        self.phase = ScanPhase::Master;
    }

    /// Selective reopening (spec.md §4.I): during the supplementary
    /// pass, a window closed by the master pass is reopened only if its
    /// direction-sensitive aggregate is not yet complete — resolved
    /// against `original_source`'s `reverseFillRes`/`reverseIndex`
    /// fields, which gate reopening per-window rather than closing all
    /// windows and rescanning from scratch.
    #[must_use]
    pub fn should_reopen(&self, window: &crate::window::WindowEntry) -> bool {
        self.phase == ScanPhase::Supplementary && window.closed && !window.supplement_done
    }
}

/// Polled at every block boundary (spec.md §5 "Cancellation"). When
/// `true` the scanner must stop and report `NoDataToCheck`, leaving
/// whatever was already emitted intact.
pub trait KillSwitch {
    fn is_killed(&self) -> bool;
}
