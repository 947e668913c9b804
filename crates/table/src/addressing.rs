//! Slot addressing.
//!
//! Every block identity maps to two slot indices. The second index is
//! derived from the same 64-bit hash with its halves swapped, which is
//! cheap and decorrelates the pair without a second hash pass. Writers
//! and readers must agree bit-for-bit on this mapping: any change to the
//! hash function or the derivation below invalidates every persisted map
//! and requires a [`MAP_FORMAT_VERSION`] bump.
//!
//! [`MAP_FORMAT_VERSION`]: crate::MAP_FORMAT_VERSION

use blocktrack_core::BlockId;
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// 64-bit hash of a block identity, seeded with 0.
pub fn block_hash(block: &BlockId) -> u64 {
    xxh3_64_with_seed(&block.to_bytes(), 0)
}

/// The two slot indices a block maps to in a table of `slot_count`
/// slots.
///
/// The indices may coincide for small tables; marking handles that
/// naturally (the same slot is ratcheted twice).
pub fn slot_pair(block: &BlockId, slot_count: u64) -> (usize, usize) {
    debug_assert!(slot_count > 0, "addressing an empty table");
    let hash = block_hash(block);
    let slot1 = (hash % slot_count) as usize;
    let slot2 = (hash.rotate_left(32) % slot_count) as usize;
    (slot1, slot2)
}
