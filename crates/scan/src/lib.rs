//! Changed-set scanning for blocktrack
//!
//! This crate turns the tracking table plus a host object enumeration
//! into per-object changed-block bitmaps:
//! - [`BlockBitmap`]: growable byte-aligned bitmap, one bit per block
//! - [`ChangedBlockIter`]: lazy per-object scan against a query LSN
//!
//! Results are sound but imprecise: slot collisions can report blocks
//! that were not individually modified, but a marked block is never
//! missed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitmap;
pub mod scanner;

pub use bitmap::BlockBitmap;
pub use scanner::{scan_changed_blocks, ChangedBlockIter, ChangedBlocks, ScanSummary};
