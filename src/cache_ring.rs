// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Component E — cache-ring reader (spec.md §4.E, §5).
//!
//! The cache ring itself is owned by the write path (out of scope, see
//! spec.md §1); this module is the *reader* side: a snapshot primitive
//! plus per-slot validity checks that let a query observe the ring
//! without ever taking its mutex for longer than the snapshot itself.

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

/// One cache slot's content. `timestamps`/`columns` are shallow copies
/// (cheap: `Vec<i64>` + per-column byte vectors) taken once a slot
/// passes validity — spec.md §4.E: "the block is *copied* into the
/// reader's private scratch (shallow...)".
#[derive(Clone, Debug)]
pub struct CacheBlock {
    pub block_id: u64,
    pub num_of_points: u32,
    pub timestamps: Vec<i64>,
    /// Column runs in physical/schema order, column 0 (timestamp)
    /// duplicated into `timestamps` above for convenient access.
    pub columns: Vec<Vec<u8>>,
}

/// A table's ring of `max_blocks` in-memory cache slots (spec.md §3
/// "Cache ring"). Slots are addressed by logical index `0..max_blocks`;
/// `None` means "flushed to disk".
pub struct CacheRing {
    max_blocks: usize,
    slots: Vec<RwLock<Option<CacheBlock>>>,
    current_slot: AtomicUsize,
    first_slot: AtomicUsize,
    commit_slot: AtomicUsize,
    commit_point: AtomicU32,
    /// Highest `block_id` assigned to `slots[current_slot]`, read inside
    /// the same critical section as the other counters so a snapshot is
    /// internally consistent (spec.md §4.E).
    current_block_id: AtomicI64,
    /// Guards the handful of atomic loads that make up a snapshot. The
    /// *real* vnode cache pool mutex also guards slot writes; here we
    /// only need it for read-side atomicity, matching spec.md §5's "short
    /// critical section... to snapshot counters".
    pool_lock: Mutex<()>,
}

/// An atomically-captured view of the ring's counters (spec.md §4.E).
#[derive(Copy, Clone, Debug)]
pub struct CacheSnapshot {
    pub num_of_blocks: usize,
    pub current_slot: usize,
    pub first_slot: usize,
    pub commit_slot: usize,
    pub commit_point: u32,
    pub current_block_id: i64,
}

/// Outcome of validating one slot against a snapshot.
#[derive(Debug)]
pub enum SlotOutcome {
    /// All four validity predicates held; here is the (possibly
    /// commit-point-elided) block.
    Valid(CacheBlock),
    /// At least one predicate failed — the scanner falls back to the
    /// on-disk key (spec.md §4.E, §7: "never fatal").
    FlushedOrInvalidated,
}

impl CacheRing {
    #[must_use]
    pub fn new(max_blocks: usize) -> Self {
        Self {
            max_blocks,
            slots: (0..max_blocks).map(|_| RwLock::new(None)).collect(),
            current_slot: AtomicUsize::new(0),
            first_slot: AtomicUsize::new(0),
            commit_slot: AtomicUsize::new(0),
            commit_point: AtomicU32::new(0),
            current_block_id: AtomicI64::new(-1),
            pool_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn max_blocks(&self) -> usize {
        self.max_blocks
    }

    /// Atomically captures the ring's counters (spec.md §4.E).
    #[must_use]
    pub fn snapshot(&self) -> CacheSnapshot {
        let _guard = self.pool_lock.lock().expect("lock poisoned");

        let current_slot = self.current_slot.load(Ordering::Acquire);
        let first_slot = self.first_slot.load(Ordering::Acquire);
        let commit_slot = self.commit_slot.load(Ordering::Acquire);
        let commit_point = self.commit_point.load(Ordering::Acquire);

        let current_block_id = self
            .slots
            .get(current_slot)
            .and_then(|s| s.read().expect("lock poisoned").as_ref().map(|b| b.block_id as i64))
            .unwrap_or(-1);

        let num_of_blocks = if current_slot >= first_slot {
            current_slot - first_slot + 1
        } else {
            self.max_blocks - first_slot + current_slot + 1
        };

        CacheSnapshot {
            num_of_blocks,
            current_slot,
            first_slot,
            commit_slot,
            commit_point,
            current_block_id,
        }
    }

    /// Validates and (shallow-)copies slot `slot` against `snapshot`
    /// (spec.md §4.E validity predicates 1–4), eliding the durably
    /// persisted prefix when `slot == firstSlot == commitSlot`.
    #[must_use]
    pub fn read_slot(&self, snapshot: &CacheSnapshot, slot: usize) -> SlotOutcome {
        let Some(lock) = self.slots.get(slot) else {
            return SlotOutcome::FlushedOrInvalidated;
        };
        let guard = lock.read().expect("lock poisoned");
        let Some(block) = guard.as_ref() else {
            return SlotOutcome::FlushedOrInvalidated;
        };

        // predicate 3: slot not yet reallocated to a later write
        if block.block_id as i64 > snapshot.current_block_id {
            return SlotOutcome::FlushedOrInvalidated;
        }
        // predicate 4
        if block.num_of_points == 0 {
            return SlotOutcome::FlushedOrInvalidated;
        }

        let mut block = block.clone();

        if slot == snapshot.first_slot && slot == snapshot.commit_slot && snapshot.commit_point > 0
        {
            let elide = (snapshot.commit_point as usize).min(block.timestamps.len());
            block.timestamps.drain(..elide);
            for col in &mut block.columns {
                let width = col.len() / block.num_of_points.max(1) as usize;
                col.drain(..elide * width);
            }
            block.num_of_points = block.num_of_points.saturating_sub(elide as u32);
        }

        SlotOutcome::Valid(block)
    }

    /// Maps a logical ring position (monotonically increasing, possibly
    /// `>= max_blocks`) to its physical slot index.
    #[must_use]
    pub fn wrap(&self, logical: i64) -> usize {
        logical.rem_euclid(self.max_blocks as i64) as usize
    }

    /// Locates the slot containing `target` within `snapshot.first_slot
    /// ..= snapshot.current_slot` (spec.md §4.C "Cache variant"), using
    /// each candidate slot's own timestamp range as the key. Slots that
    /// fail validity are treated as absent (the caller falls back to
    /// disk for that key the same way `read_slot` does for reads).
    #[must_use]
    pub fn locate(
        &self,
        snapshot: &CacheSnapshot,
        target: i64,
        order: crate::locator::Order,
    ) -> Option<usize> {
        let n = snapshot.num_of_blocks;
        crate::locator::locate_by(n, target, order, |i| {
            let physical = self.wrap(snapshot.first_slot as i64 + i as i64);
            match self.read_slot(snapshot, physical) {
                SlotOutcome::Valid(b) => (
                    *b.timestamps.first().unwrap_or(&i64::MAX),
                    *b.timestamps.last().unwrap_or(&i64::MIN),
                ),
                SlotOutcome::FlushedOrInvalidated => (i64::MAX, i64::MIN),
            }
        })
        .map(|i| self.wrap(snapshot.first_slot as i64 + i as i64))
    }

    // --- test/writer-simulation helpers -----------------------------
    // The real writer lives outside this crate (spec.md §1); these let
    // tests drive the ring the way the write path would, to exercise
    // the invalidation scenarios in spec.md §8 (S6).

    #[cfg(any(test, feature = "test-helpers"))]
    pub fn write_slot_for_test(
        &self,
        slot: usize,
        block: CacheBlock,
        current_slot: usize,
        first_slot: usize,
        commit_slot: usize,
        commit_point: u32,
    ) {
        let _guard = self.pool_lock.lock().expect("lock poisoned");
        *self.slots[slot].write().expect("lock poisoned") = Some(block);
        self.current_slot.store(current_slot, Ordering::Release);
        self.first_slot.store(first_slot, Ordering::Release);
        self.commit_slot.store(commit_slot, Ordering::Release);
        self.commit_point.store(commit_point, Ordering::Release);
    }
}
