//! Checkpoint manager.
//!
//! Persists the tracking table crash-safely and reloads it at startup.
//!
//! ## Write protocol
//!
//! Each cycle walks `Idle -> Writing -> Syncing -> Renaming -> Idle`:
//! encode the full table to a temp file, fsync it, rename it over the
//! canonical path, fsync the directory. A failure at any step leaves the
//! previous durable image untouched; the abandoned temp file is simply
//! overwritten by the next cycle. A checkpoint may miss marks that land
//! after their slot was read; the in-memory table keeps the true
//! maximum, so a later checkpoint captures them.
//!
//! ## Load protocol
//!
//! Size, magic, version, and checksum are all validated. Any mismatch
//! discards the image with a warning and initializes fresh: a
//! pessimistically empty map is always a sound starting point. Only real
//! I/O failures are fatal.

use crate::codec::{decode_table, encode_table, encoded_len, CodecError};
use blocktrack_core::{LsnSource, TrackerConfig};
use blocktrack_table::TrackingTable;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Canonical file name of the persisted map image.
pub const MAP_FILE: &str = "changed.map";

/// Temp file used for atomic replacement of [`MAP_FILE`].
pub const MAP_FILE_TMP: &str = "changed.map.tmp";

/// Where a checkpoint cycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointPhase {
    /// No cycle in progress.
    Idle,
    /// Encoding the table into the temp file.
    Writing,
    /// Flushing the temp file to stable storage.
    Syncing,
    /// Replacing the canonical image.
    Renaming,
    /// Tracking was turned off; persisted artifacts are removed instead
    /// of written.
    Disabled,
}

/// Checkpoint failures.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The renamed image does not have the expected length. This should
    /// never happen after a successful rename and indicates something
    /// else is writing to the map path.
    #[error("map image size mismatch after rename: expected {expected} bytes, found {found}")]
    ImageSizeMismatch {
        /// Expected image length.
        expected: u64,
        /// Length found on disk.
        found: u64,
    },

    /// An I/O failure. Fatal to this cycle only; the next cycle retries
    /// from scratch against the intact previous image.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Orchestrates checkpoint cycles and startup loads for one data
/// directory.
///
/// There is exactly one checkpoint actor per table; concurrent calls are
/// serialized, never interleaved.
pub struct CheckpointManager {
    data_dir: PathBuf,
    /// Serializes checkpoint cycles.
    cycle_lock: Mutex<()>,
    phase: Mutex<CheckpointPhase>,
}

impl CheckpointManager {
    /// Create a manager for `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        CheckpointManager {
            data_dir: data_dir.into(),
            cycle_lock: Mutex::new(()),
            phase: Mutex::new(CheckpointPhase::Idle),
        }
    }

    /// Path of the canonical map image.
    pub fn map_path(&self) -> PathBuf {
        self.data_dir.join(MAP_FILE)
    }

    /// Path of the temp image used during replacement.
    pub fn tmp_path(&self) -> PathBuf {
        self.data_dir.join(MAP_FILE_TMP)
    }

    /// Current cycle phase.
    pub fn phase(&self) -> CheckpointPhase {
        *self.phase.lock()
    }

    fn set_phase(&self, phase: CheckpointPhase) {
        *self.phase.lock() = phase;
    }

    /// Write a durable checkpoint of `table`.
    ///
    /// Lazily activates the table first if nothing has activated it yet,
    /// stamping it with the host's current (or replay) position so the
    /// coverage window starts no later than this checkpoint.
    pub fn checkpoint(
        &self,
        table: &TrackingTable,
        lsns: &dyn LsnSource,
    ) -> Result<(), CheckpointError> {
        let _cycle = self.cycle_lock.lock();

        if !table.init_lsn().is_valid() {
            let stamp = lsns.stamp_lsn();
            let won = table.activate(stamp);
            debug!("checkpoint activated tracking map at {}", won);
        }

        debug!("checkpoint started for {}", self.map_path().display());
        let result = self.write_cycle(table);
        if result.is_err() {
            self.set_phase(CheckpointPhase::Idle);
        }
        result
    }

    fn write_cycle(&self, table: &TrackingTable) -> Result<(), CheckpointError> {
        let tmp_path = self.tmp_path();
        let map_path = self.map_path();

        self.set_phase(CheckpointPhase::Writing);
        let mut file = File::create(&tmp_path)?;
        encode_table(table, &mut file)?;

        self.set_phase(CheckpointPhase::Syncing);
        file.sync_all()?;
        drop(file);

        self.set_phase(CheckpointPhase::Renaming);
        durable_rename(&tmp_path, &map_path)?;

        // The renamed image must be exactly the size the format implies.
        let expected = encoded_len(table.slot_count() as u64);
        let found = fs::metadata(&map_path)?.len();
        if found != expected {
            self.set_phase(CheckpointPhase::Idle);
            return Err(CheckpointError::ImageSizeMismatch { expected, found });
        }

        self.set_phase(CheckpointPhase::Idle);
        info!(
            "checkpoint complete: {} ({} slots, init_lsn {})",
            map_path.display(),
            table.slot_count(),
            table.init_lsn()
        );
        Ok(())
    }

    /// Load the persisted table, or initialize a fresh one.
    ///
    /// A missing image, a size mismatch, or a corrupt image all produce
    /// a fresh table (the two latter after removing the bad file). The
    /// cleanup-and-retry is bounded: one cleanup pass at most, then the
    /// fresh path. I/O failures are fatal; without a readable directory
    /// there is no safe state to construct.
    pub fn load_or_init(&self, config: &TrackerConfig) -> Result<TrackingTable, CheckpointError> {
        let slot_count = config.slot_count() as usize;
        let expected_len = config.file_len();
        let map_path = self.map_path();

        // A temp image can only be a leftover from an interrupted cycle.
        remove_if_exists(&self.tmp_path())?;

        for _attempt in 0..2 {
            let metadata = match fs::metadata(&map_path) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => break,
                Err(e) => return Err(e.into()),
            };

            if metadata.len() != expected_len {
                warn!(
                    "map image {} has unexpected size {} (expected {}), discarding",
                    map_path.display(),
                    metadata.len(),
                    expected_len
                );
                remove_if_exists(&map_path)?;
                continue;
            }

            let mut reader = BufReader::new(File::open(&map_path)?);
            match decode_table(&mut reader, slot_count) {
                Ok(table) => {
                    info!(
                        "loaded tracking map {} ({} slots, init_lsn {})",
                        map_path.display(),
                        table.slot_count(),
                        table.init_lsn()
                    );
                    return Ok(table);
                }
                Err(CodecError::Io(e)) => return Err(e.into()),
                Err(e) => {
                    warn!(
                        "map image {} is unusable ({}), discarding and reinitializing",
                        map_path.display(),
                        e
                    );
                    remove_if_exists(&map_path)?;
                    continue;
                }
            }
        }

        info!("initialized fresh tracking map ({} slots)", slot_count);
        Ok(TrackingTable::new(slot_count))
    }

    /// Remove all persisted artifacts.
    ///
    /// Called when tracking is turned off so a later re-enable cannot
    /// adopt a stale image. Leaves the manager in the `Disabled` phase.
    pub fn remove_artifacts(&self) -> io::Result<()> {
        let _cycle = self.cycle_lock.lock();
        debug!("removing tracking map artifacts in {}", self.data_dir.display());

        remove_if_exists(&self.tmp_path())?;
        remove_if_exists(&self.map_path())?;
        fsync_dir(&self.data_dir)?;

        self.set_phase(CheckpointPhase::Disabled);
        Ok(())
    }
}

/// Remove a file, treating "already gone" as success.
fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Rename `from` over `to` and make the replacement durable.
fn durable_rename(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)?;
    if let Some(dir) = to.parent() {
        fsync_dir(dir)?;
    }
    Ok(())
}

/// Flush directory metadata where the platform requires it for a rename
/// or unlink to be durable.
#[cfg(unix)]
fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
