//! Tracking table for blocktrack
//!
//! This crate implements the in-memory half of the engine:
//! - Two-way hash addressing of block identities to slot indices
//! - The lock-free table of atomic LSN stamps with ratchet updates
//!
//! The table never blocks a writer on another writer or on a reader; all
//! updates are compare-and-swap loops over independent 64-bit atomics.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod addressing;
pub mod table;

pub use addressing::{block_hash, slot_pair};
pub use table::{TrackingTable, MAP_FORMAT_VERSION, MAP_MAGIC};
