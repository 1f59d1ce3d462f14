// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Component F — cursor/position model (spec.md §4.F).
//!
//! A `Position` names one row: either a `(fileId, slot, pos)` triple on
//! disk, or a `(slot, pos)` pair in the cache ring (`file_id == CACHE`).
//! The scanner never compares timestamps to decide "am I past the end" —
//! it compares positions, which is what lets the two-pass scanner save
//! and restore a cursor across the master/supplementary boundary without
//! re-deriving it from a key (spec.md §4.I).

use crate::locator::Order;

/// Sentinel `file_id` meaning "the cache ring", never a real day-file id.
pub const CACHE: i32 = -1;

/// One row's address within a table's scan space.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    pub file_id: i32,
    pub slot: usize,
    pub pos: usize,
}

impl Position {
    #[must_use]
    pub fn in_cache(slot: usize, pos: usize) -> Self {
        Self { file_id: CACHE, slot, pos }
    }

    #[must_use]
    pub fn on_disk(file_id: i32, slot: usize, pos: usize) -> Self {
        debug_assert_ne!(file_id, CACHE);
        Self { file_id, slot, pos }
    }

    #[must_use]
    pub fn is_cache(self) -> bool {
        self.file_id == CACHE
    }

    /// Total order consistent with `order`: on-disk positions precede
    /// cache positions in ascending scans (files are always older than
    /// the ring), cache precedes disk in descending scans.
    #[must_use]
    pub fn cmp_in(self, other: Self, order: Order) -> std::cmp::Ordering {
        use std::cmp::Ordering;

        let rank = |p: Self| -> (i64, i64, i64) {
            let file_rank = if p.is_cache() { i64::MAX } else { i64::from(p.file_id) };
            (file_rank, p.slot as i64, p.pos as i64)
        };

        let ordering = rank(self).cmp(&rank(other));
        match order {
            Order::Ascending => ordering,
            Order::Descending => ordering.reverse(),
        }
    }
}

/// One block's extent within a table's scan space, needed to compute
/// `next_pos`/`end_pos` without re-reading the block (spec.md §4.F).
#[derive(Copy, Clone, Debug)]
pub struct BlockExtent {
    pub file_id: i32,
    pub slot: usize,
    pub num_of_points: usize,
}

/// The three positions the spec names for one block in one scan
/// direction: the first row to read, the step to the next block's
/// first row, and the last row in the block (spec.md §4.F
/// `startPos`/`nextPos`/`endPos`).
#[must_use]
pub fn start_pos(block: BlockExtent, order: Order) -> Position {
    match order {
        Order::Ascending => Position { file_id: block.file_id, slot: block.slot, pos: 0 },
        Order::Descending => Position {
            file_id: block.file_id,
            slot: block.slot,
            pos: block.num_of_points.saturating_sub(1),
        },
    }
}

#[must_use]
pub fn end_pos(block: BlockExtent, order: Order) -> Position {
    match order {
        Order::Ascending => Position {
            file_id: block.file_id,
            slot: block.slot,
            pos: block.num_of_points.saturating_sub(1),
        },
        Order::Descending => Position { file_id: block.file_id, slot: block.slot, pos: 0 },
    }
}

/// A live cursor over one table's rows, tracking both its current
/// position and the block extent it is currently inside.
#[derive(Copy, Clone, Debug)]
pub struct Cursor {
    pub position: Position,
    pub block: BlockExtent,
    pub order: Order,
}

impl Cursor {
    #[must_use]
    pub fn new(block: BlockExtent, order: Order) -> Self {
        Self { position: start_pos(block, order), block, order }
    }

    /// `true` once the cursor has walked past the last row of its
    /// current block; the caller must then advance to the next block
    /// via the locator/next-file machinery before calling `advance`
    /// again, updating `self.block` first.
    #[must_use]
    pub fn at_block_end(self) -> bool {
        self.position == end_pos(self.block, self.order)
    }

    /// Steps the cursor by `step` rows within the current block
    /// (spec.md §4.F `moveToNext(step, loadData)`); `loadData` is the
    /// caller's concern (whether to materialize the row), not the
    /// cursor's, so it isn't modeled here.
    ///
    /// Saturates at the block boundary rather than overflowing past it —
    /// callers check `at_block_end` to decide when to cross blocks.
    pub fn advance(&mut self, step: usize) {
        let end = end_pos(self.block, self.order).pos;
        match self.order {
            Order::Ascending => {
                self.position.pos = (self.position.pos + step).min(end);
            }
            Order::Descending => {
                self.position.pos = self.position.pos.saturating_sub(step).max(end);
            }
        }
    }

    /// Re-points the cursor at a new block, starting from that block's
    /// `start_pos`. Used both to cross a block boundary in one file and
    /// to cross a file/cache boundary (spec.md §4.C/§4.F).
    pub fn enter_block(&mut self, block: BlockExtent) {
        self.block = block;
        self.position = start_pos(block, self.order);
    }

    /// Snapshots the cursor so the two-pass scanner can restore it after
    /// the supplementary pass finishes with this table (spec.md §4.I).
    #[must_use]
    pub fn save(self) -> (Position, BlockExtent) {
        (self.position, self.block)
    }

    pub fn restore(&mut self, saved: (Position, BlockExtent)) {
        self.position = saved.0;
        self.block = saved.1;
    }
}
