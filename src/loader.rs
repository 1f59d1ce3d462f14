// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Component D — demand loader (spec.md §4.D).
//!
//! Decides, for one candidate block, how much of it a query actually
//! needs to touch: nothing (the pre-aggregate alone answers the query),
//! only the timestamp column (window boundaries), every requested
//! column, or the block can be discarded outright because its key range
//! or pre-aggregate values can't possibly satisfy the query.

use crate::descriptor::{ColumnPreAgg, CompBlock};
use crate::schema::{ColId, ColumnType};

/// What the scanner must load from a block before it can be processed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LoadDecision {
    /// Pre-aggregate values in the descriptor fully answer the query for
    /// every requested column (spec.md §4.D "NoLoad").
    NoLoad,
    /// Only the primary timestamp column is needed (e.g. to place window
    /// boundaries before deciding whether any value column matters).
    LoadTs,
    /// Every requested column must be decoded.
    LoadAll,
    /// The block cannot contribute to the result at all and should not
    /// even be visited for its pre-aggregate (e.g. entirely outside the
    /// query's key range).
    DiscardBlock,
}

/// A value range a query needs a column's block-local values to fall
/// within, used for the pre-aggregate short-circuit (spec.md §4.D).
/// Float columns widen the comparison by one ULP-scale epsilon on each
/// side, since min/max pre-aggregates are computed in the stored
/// precision and a query's literal bound may not land exactly on a
/// representable value.
#[derive(Copy, Clone, Debug)]
pub struct ValueFilter {
    pub col_id: ColId,
    pub col_type: ColumnType,
    pub lo: f64,
    pub hi: f64,
}

const FLOAT_EPSILON: f64 = 1e-9;

impl ValueFilter {
    /// `true` if `pre_agg`'s `[min, max]` range could contain any value
    /// satisfying this filter — i.e. the ranges overlap. `false` means
    /// the block can be skipped for this column without decoding it.
    #[must_use]
    pub fn overlaps(self, pre_agg: &ColumnPreAgg) -> bool {
        let (min, max) = if self.col_type.is_float() {
            (pre_agg.min.as_f64(), pre_agg.max.as_f64())
        } else {
            (pre_agg.min.as_i64() as f64, pre_agg.max.as_i64() as f64)
        };

        let (lo, hi) = if self.col_type.is_float() {
            (self.lo - FLOAT_EPSILON, self.hi + FLOAT_EPSILON)
        } else {
            (self.lo, self.hi)
        };

        max >= lo && min <= hi
    }
}

/// Decides the load level for one block against the query's key range
/// and (optionally) value filters and requested output columns.
///
/// `requested_columns` is the physical-order index of every column the
/// query reads (already resolved via `TableSchema::index_of`); empty
/// means "timestamp only" (e.g. a pure `count(*)`).
#[must_use]
pub fn decide(
    block: &CompBlock,
    key_range: (i64, i64),
    filters: &[ValueFilter],
    requested_columns: &[usize],
    needs_raw_values: bool,
) -> LoadDecision {
    let (skey, ekey) = key_range;
    if block.key_last < skey || block.key_first > ekey {
        return LoadDecision::DiscardBlock;
    }

    // `filters` is matched by position against the first `filters.len()`
    // entries of `requested_columns` (the caller zips them up front).
    for (physical_index, filter) in requested_columns.iter().zip(filters.iter()) {
        if let Some(pre_agg) = block.col_pre_agg.get(*physical_index) {
            if !filter.overlaps(pre_agg) {
                return LoadDecision::DiscardBlock;
            }
        }
    }

    if needs_raw_values {
        LoadDecision::LoadAll
    } else if block_fully_covered(block, key_range) && !requested_columns.is_empty() {
        // Pre-aggregates alone answer the query: the block lies entirely
        // inside the window/range and every requested column has a
        // pre-aggregate (spec.md §4.D "NoLoad").
        LoadDecision::NoLoad
    } else {
        LoadDecision::LoadTs
    }
}

fn block_fully_covered(block: &CompBlock, key_range: (i64, i64)) -> bool {
    let (skey, ekey) = key_range;
    block.key_first >= skey && block.key_last <= ekey
}

/// Bookkeeping for one block currently materialized for a table,
/// carried across the master/supplementary passes (spec.md §4.D
/// `SLoadDataBlockInfo`).
#[derive(Copy, Clone, Debug)]
pub struct LoadDataBlockInfo {
    pub file_id: i32,
    pub slot: usize,
    pub file_list_index: i32,
    pub table_sid: u32,
    /// `true` once this block's timestamp column has been decoded, so a
    /// second `LoadTs` request for the same block is a no-op.
    pub ts_loaded: bool,
}

impl LoadDataBlockInfo {
    #[must_use]
    pub fn new(file_id: i32, slot: usize, file_list_index: i32, table_sid: u32) -> Self {
        Self { file_id, slot, file_list_index, table_sid, ts_loaded: false }
    }

    #[must_use]
    pub fn matches(self, file_id: i32, slot: usize) -> bool {
        self.file_id == file_id && self.slot == slot
    }
}
