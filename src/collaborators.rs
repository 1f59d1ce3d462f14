// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Contracts with the external collaborators named in spec.md §1/§6:
//! the write path, WAL, RPC transport, tag metadata, and the ts-buffer
//! (used by joins/subqueries to feed a secondary timestamp stream into
//! `prepare`). None of these are implemented here — this crate only
//! consumes them — but their shapes are pinned so the scanner's
//! contract with them is explicit rather than implied.

use crate::schema::ColId;

/// Per-table tag values, supplied to `prepare` (spec.md §6.2) and read
/// by `tag`/`tagprj` aggregate contexts (spec.md §4.G).
pub trait TagInfo {
    fn tag_value(&self, col_id: ColId) -> Option<crate::agg::Value>;
}

/// An externally supplied timestamp stream (spec.md §6.2 `tsBuffer?`),
/// e.g. from a join's outer query, that further restricts which rows
/// this table's scan may emit.
pub trait TsBuffer {
    /// `true` if `ts` is present in the buffer and should be scanned.
    fn contains(&self, ts: i64) -> bool;
}

/// The write path / WAL collaborator this crate never calls into
/// directly, but whose guarantees the cache-ring reader (Component E)
/// depends on: a slot is rewritten only by bumping `blockId`, never by
/// mutating it in place (spec.md §5).
pub trait WriteAppendGuarantee {
    fn current_block_id(&self, table_sid: u32) -> u64;
}
