//! # Blocktrack
//!
//! Changed-block tracking engine for incremental backups.
//!
//! Blocktrack answers one question soundly under heavy write
//! concurrency and bounded memory: *which storage blocks changed since
//! log position X?* Writers stamp a fixed-size table of atomic LSN
//! slots addressed by a two-way hash of the block identity; a crash-safe
//! checkpoint persists the table; a lazy scan reconciles the table
//! against the host's object enumeration and emits per-object bitmaps.
//!
//! Answers may over-report (hash collisions produce false positives)
//! but never miss a marked block.
//!
//! ## Quick Start
//!
//! ```ignore
//! use blocktrack::prelude::*;
//!
//! let config = TrackerConfig::from_megabytes("./data", 16);
//! let tracker = Tracker::open(config)?;
//!
//! // Host write path: stamp modified blocks.
//! tracker.mark(&block_id, lsn);
//!
//! // Checkpoint actor: persist the map.
//! tracker.checkpoint(&lsn_source)?;
//!
//! // Backup pass: collect changes since a position.
//! for changed in tracker.changed_blocks(since, &enumerator)? {
//!     send(changed.path, changed.bitmap.as_bytes());
//! }
//! ```
//!
//! ## Guarantees
//!
//! - Marking never blocks a writer on another writer or on checkpoints.
//! - Per-slot stamps only ever increase (monotonic ratchet).
//! - A corrupt or size-mismatched persisted image degrades to a fresh,
//!   empty map (forcing one full capture), never a crash.
//! - Callers must checkpoint before trusting an answer against a
//!   just-recorded modification; an unpersisted mark can be lost to a
//!   crash.

#![warn(missing_docs)]

mod error;
mod tracker;

pub mod prelude;

// Re-export main entry points
pub use error::{Error, Result};
pub use tracker::Tracker;

// Re-export the building blocks for hosts that need them directly
pub use blocktrack_core::{
    BlockId, ConfigError, ContainerId, Lsn, LsnSource, ObjectEntry, ObjectEnumerator,
    TrackerConfig,
};
pub use blocktrack_durability::{CheckpointError, CheckpointManager, CheckpointPhase};
pub use blocktrack_scan::{BlockBitmap, ChangedBlockIter, ChangedBlocks, ScanSummary};
pub use blocktrack_table::TrackingTable;
