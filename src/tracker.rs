//! Main tracker entry point.
//!
//! [`Tracker`] ties the pieces together: it loads (or freshly
//! initializes) the shared table at open, routes marks into it, drives
//! checkpoints, and answers changed-block queries. The handle is
//! explicitly constructed and passed around; there is no process-wide
//! map. Share it behind an [`Arc`] from as many threads as needed.

use crate::error::{Error, Result};
use blocktrack_core::{BlockId, Lsn, LsnSource, ObjectEntry, ObjectEnumerator, TrackerConfig};
use blocktrack_durability::CheckpointManager;
use blocktrack_scan::{scan_changed_blocks, ChangedBlockIter};
use blocktrack_table::TrackingTable;
use std::sync::Arc;
use tracing::{debug, info};

/// The changed-block tracker.
///
/// One instance per activation. Marking is safe from any number of
/// threads; checkpointing is meant for a single actor; scans can run
/// on demand.
pub struct Tracker {
    config: TrackerConfig,
    checkpoints: CheckpointManager,
    /// `None` while tracking is disabled.
    table: Option<Arc<TrackingTable>>,
}

impl Tracker {
    /// Open a tracker under `config`.
    ///
    /// With a zero budget the tracker comes up disabled and any stale
    /// persisted artifacts are removed. Otherwise the persisted map is
    /// loaded if it passes validation, and a fresh map is initialized if
    /// it is missing, mismatched, or corrupt. Only real I/O failures
    /// make opening fail.
    pub fn open(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let checkpoints = CheckpointManager::new(config.data_dir());

        if !config.is_enabled() {
            info!("changed-block tracking disabled, cleaning artifacts");
            checkpoints.remove_artifacts()?;
            return Ok(Tracker {
                config,
                checkpoints,
                table: None,
            });
        }

        let table = checkpoints.load_or_init(&config)?;
        info!(
            "changed-block tracking enabled: {} slots, init_lsn {}",
            table.slot_count(),
            table.init_lsn()
        );
        Ok(Tracker {
            config,
            checkpoints,
            table: Some(Arc::new(table)),
        })
    }

    /// Engine version string.
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Whether tracking is active.
    pub fn is_enabled(&self) -> bool {
        self.table.is_some()
    }

    /// The configuration this tracker was opened with.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of slots in the active table, 0 when disabled.
    pub fn slot_count(&self) -> usize {
        self.table.as_ref().map_or(0, |table| table.slot_count())
    }

    /// LSN of the last map activation, `None` when disabled.
    ///
    /// Queries below this position are outside the coverage window and
    /// need a full capture instead of an incremental one.
    pub fn init_lsn(&self) -> Option<Lsn> {
        self.table.as_ref().map(|table| table.init_lsn())
    }

    /// The shared table handle, for hosts that wire marking into their
    /// write path directly. `None` when disabled.
    pub fn table(&self) -> Option<&Arc<TrackingTable>> {
        self.table.as_ref()
    }

    /// Record that `block` was modified at `lsn`. No-op when tracking
    /// is disabled or `lsn` is invalid.
    pub fn mark(&self, block: &BlockId, lsn: Lsn) {
        if let Some(table) = &self.table {
            table.mark(block, lsn);
        }
    }

    /// Record a modification of every block of an enumerated object.
    ///
    /// For host paths that rewrite whole objects behind the block-level
    /// write path (bulk copies, directory-level restores): stamps each
    /// block of the entry's range at `lsn`.
    pub fn mark_object(&self, entry: &ObjectEntry, lsn: Lsn) {
        let Some(table) = &self.table else {
            return;
        };
        debug!(
            "marking all {} blocks of {} at {}",
            entry.block_count, entry.path, lsn
        );
        for offset in 0..entry.block_count {
            let bid = BlockId::new(entry.container, entry.fork, entry.start_block + offset);
            table.mark(&bid, lsn);
        }
    }

    /// Write a durable checkpoint of the map.
    ///
    /// When disabled, removes any persisted artifacts instead and
    /// succeeds. I/O failures are transient: the previous durable image
    /// stays intact and the next cycle retries from scratch.
    pub fn checkpoint(&self, lsns: &dyn LsnSource) -> Result<()> {
        match &self.table {
            None => {
                self.checkpoints.remove_artifacts()?;
                Ok(())
            }
            Some(table) => {
                self.checkpoints.checkpoint(table, lsns)?;
                Ok(())
            }
        }
    }

    /// Lazily scan for blocks changed at or after `query_lsn`.
    ///
    /// Errors with [`Error::Disabled`] when tracking is off. The
    /// returned iterator restarts the enumeration from the beginning
    /// and can be dropped between objects to abort the scan.
    pub fn changed_blocks<'a>(
        &'a self,
        query_lsn: Lsn,
        enumerator: &'a dyn ObjectEnumerator,
    ) -> Result<ChangedBlockIter<'a>> {
        let table = self.table.as_deref().ok_or(Error::Disabled)?;
        Ok(scan_changed_blocks(table, query_lsn, enumerator)?)
    }

    /// Turn tracking off: drop the table and remove persisted
    /// artifacts. Equivalent to reopening with a zero budget.
    pub fn disable(&mut self) -> Result<()> {
        info!("disabling changed-block tracking");
        self.table = None;
        self.config.map_size_bytes = 0;
        self.checkpoints.remove_artifacts()?;
        Ok(())
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("enabled", &self.is_enabled())
            .field("slot_count", &self.slot_count())
            .field("data_dir", &self.config.data_dir())
            .finish()
    }
}
