//! The tracking table.
//!
//! A fixed-length array of atomic 64-bit LSN stamps plus an activation
//! stamp. Writers ratchet slots upward with compare-and-swap loops; a
//! slot always holds the maximum LSN of every block that ever hashed to
//! it. Collisions therefore only produce false positives (a slot
//! vouching for a block that was not individually modified), never false
//! negatives.
//!
//! The table is shared: any number of marker threads, one checkpoint
//! reader, and any number of scan readers operate on it concurrently
//! with no mutual exclusion.

use crate::addressing::slot_pair;
use blocktrack_core::{BlockId, Lsn};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Magic bytes identifying a persisted map image.
pub const MAP_MAGIC: [u8; 4] = *b"cbt\0";

/// On-disk format version. Bump on any change to the image layout, the
/// block hash, or the slot derivation.
pub const MAP_FORMAT_VERSION: u32 = 1;

/// The shared table of modification stamps.
///
/// Created zeroed (every slot and the activation stamp invalid) and
/// never resized; a budget change is a full reinitialization of a new
/// instance. Hand the table around in an [`Arc`](std::sync::Arc); there
/// is no process-wide singleton.
pub struct TrackingTable {
    /// LSN at which this table instance was last activated. Invalid
    /// until the first mark or checkpoint, then set exactly once.
    init_lsn: AtomicU64,
    /// The slot stamps.
    slots: Box<[AtomicU64]>,
}

impl TrackingTable {
    /// Create a zeroed table with `slot_count` slots.
    pub fn new(slot_count: usize) -> Self {
        let mut slots = Vec::with_capacity(slot_count);
        slots.resize_with(slot_count, || AtomicU64::new(Lsn::INVALID.as_u64()));
        TrackingTable {
            init_lsn: AtomicU64::new(Lsn::INVALID.as_u64()),
            slots: slots.into_boxed_slice(),
        }
    }

    /// Number of slots. Fixed for the instance's lifetime.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Current activation stamp.
    pub fn init_lsn(&self) -> Lsn {
        Lsn::new(self.init_lsn.load(Ordering::SeqCst))
    }

    /// Activate the table at `lsn` if it is not activated yet.
    ///
    /// Only the transition invalid -> valid is possible: the first
    /// successful compare-and-swap wins, racing callers adopt the
    /// published value, and the stamp never regresses. Returns the
    /// winning activation stamp.
    pub fn activate(&self, lsn: Lsn) -> Lsn {
        let mut current = self.init_lsn.load(Ordering::SeqCst);
        loop {
            if current != Lsn::INVALID.as_u64() {
                return Lsn::new(current);
            }
            match self.init_lsn.compare_exchange(
                Lsn::INVALID.as_u64(),
                lsn.as_u64(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    debug!("tracking map activated at {}", lsn);
                    return lsn;
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Record that `block` was modified at `lsn`.
    ///
    /// No-op for an invalid LSN. Activates the table on the first mark,
    /// then ratchets both addressed slots up to `lsn`. Never blocks:
    /// contention is resolved by CAS retry, and a slot already at or
    /// above `lsn` is left alone.
    pub fn mark(&self, block: &BlockId, lsn: Lsn) {
        if !lsn.is_valid() {
            return;
        }
        if !self.init_lsn().is_valid() {
            self.activate(lsn);
        }

        let (slot1, slot2) = slot_pair(block, self.slots.len() as u64);
        trace!(
            "mark block {:?} at {}: slots {} and {}",
            block,
            lsn,
            slot1,
            slot2
        );
        Self::ratchet(&self.slots[slot1], lsn.as_u64());
        Self::ratchet(&self.slots[slot2], lsn.as_u64());
    }

    /// Atomically read one slot stamp.
    ///
    /// Values observed for a given slot are non-decreasing over time;
    /// there is no ordering guarantee across slots.
    pub fn read_slot(&self, index: usize) -> Lsn {
        Lsn::new(self.slots[index].load(Ordering::SeqCst))
    }

    /// Overwrite one slot stamp.
    ///
    /// Load-path only: the decode path fills a freshly constructed table
    /// before it is shared, so a plain store is sound there. Never call
    /// this on a live table; it would break the ratchet invariant.
    pub fn store_slot(&self, index: usize, lsn: Lsn) {
        self.slots[index].store(lsn.as_u64(), Ordering::SeqCst);
    }

    /// Overwrite the activation stamp. Load-path only, same caveat as
    /// [`store_slot`](TrackingTable::store_slot).
    pub fn restore_init_lsn(&self, lsn: Lsn) {
        self.init_lsn.store(lsn.as_u64(), Ordering::SeqCst);
    }

    /// Raise `slot` to `new` unless it is already at or above it.
    fn ratchet(slot: &AtomicU64, new: u64) {
        let mut current = slot.load(Ordering::SeqCst);
        while current < new {
            match slot.compare_exchange_weak(current, new, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }
}

impl std::fmt::Debug for TrackingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingTable")
            .field("slot_count", &self.slots.len())
            .field("init_lsn", &self.init_lsn())
            .finish()
    }
}
