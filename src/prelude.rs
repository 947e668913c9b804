//! Convenient imports for blocktrack.
//!
//! ```ignore
//! use blocktrack::prelude::*;
//!
//! let tracker = Tracker::open(TrackerConfig::from_megabytes("./data", 16))?;
//! ```

// Main entry point
pub use crate::tracker::Tracker;

// Error handling
pub use crate::error::{Error, Result};

// Core types
pub use blocktrack_core::{BlockId, ContainerId, Lsn, TrackerConfig};

// Host integration traits
pub use blocktrack_core::{LsnSource, ObjectEntry, ObjectEnumerator};

// Scan results
pub use blocktrack_scan::{BlockBitmap, ChangedBlocks, ScanSummary};
