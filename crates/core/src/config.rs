//! Tracker configuration.
//!
//! The map's memory footprint is a fixed byte budget configured once per
//! activation. Everything else (slot count, on-disk image size) derives
//! from it. A zero budget means tracking is disabled.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Fixed header length of the map image: 4-byte magic, u32 format
/// version, u64 activation stamp.
pub const MAP_HEADER_LEN: u64 = 16;

/// Trailing CRC32C length of the map image.
pub const MAP_CHECKSUM_LEN: u64 = 4;

/// Length of one slot stamp.
pub const SLOT_LEN: u64 = 8;

/// Configuration for one tracker activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Byte budget for the whole map, header and checksum included.
    /// Zero disables tracking.
    pub map_size_bytes: u64,
    /// Directory holding the persisted map image.
    pub data_dir: PathBuf,
}

impl TrackerConfig {
    /// Create a configuration from a raw byte budget.
    pub fn new(data_dir: impl Into<PathBuf>, map_size_bytes: u64) -> Self {
        TrackerConfig {
            map_size_bytes,
            data_dir: data_dir.into(),
        }
    }

    /// Create a configuration from a budget in mebibytes, the unit hosts
    /// usually configure.
    pub fn from_megabytes(data_dir: impl Into<PathBuf>, megabytes: u64) -> Self {
        Self::new(data_dir, megabytes * 1024 * 1024)
    }

    /// Whether tracking is enabled under this configuration.
    pub fn is_enabled(&self) -> bool {
        self.map_size_bytes != 0
    }

    /// Number of slot stamps the budget can hold after header and
    /// checksum overhead.
    pub fn slot_count(&self) -> u64 {
        self.map_size_bytes
            .saturating_sub(MAP_HEADER_LEN + MAP_CHECKSUM_LEN)
            / SLOT_LEN
    }

    /// Exact length of the persisted map image for this budget. Any
    /// on-disk file of a different length is invalid.
    pub fn file_len(&self) -> u64 {
        MAP_HEADER_LEN + self.slot_count() * SLOT_LEN + MAP_CHECKSUM_LEN
    }

    /// Smallest enabled budget: header, checksum, and one slot.
    pub const fn min_map_size() -> u64 {
        MAP_HEADER_LEN + MAP_CHECKSUM_LEN + SLOT_LEN
    }

    /// The configured data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Validate the configuration.
    ///
    /// A zero budget is valid (tracking disabled). An enabled budget must
    /// leave room for at least one slot; anything smaller is a
    /// configuration error, not something to coerce silently.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_enabled() && self.slot_count() == 0 {
            return Err(ConfigError::BudgetTooSmall {
                budget: self.map_size_bytes,
                min: Self::min_map_size(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_disabled_and_valid() {
        let config = TrackerConfig::new("/tmp/t", 0);
        assert!(!config.is_enabled());
        assert_eq!(config.slot_count(), 0);
        config.validate().unwrap();
    }

    #[test]
    fn test_slot_count_excludes_overhead() {
        // 16 slots plus header and checksum.
        let config = TrackerConfig::new("/tmp/t", 16 * 8 + 20);
        assert_eq!(config.slot_count(), 16);
        assert_eq!(config.file_len(), 16 * 8 + 20);
    }

    #[test]
    fn test_partial_slot_is_dropped() {
        let config = TrackerConfig::new("/tmp/t", 16 * 8 + 20 + 5);
        assert_eq!(config.slot_count(), 16);
        // The image is tight even when the budget is not.
        assert_eq!(config.file_len(), 16 * 8 + 20);
    }

    #[test]
    fn test_too_small_budget_rejected() {
        let config = TrackerConfig::new("/tmp/t", 12);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::BudgetTooSmall { .. }));
    }

    #[test]
    fn test_megabyte_helper() {
        let config = TrackerConfig::from_megabytes("/tmp/t", 1);
        assert_eq!(config.map_size_bytes, 1024 * 1024);
        config.validate().unwrap();
    }
}
