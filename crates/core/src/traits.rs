//! Host-facing traits.
//!
//! The engine consumes two services from its host and assumes nothing
//! else about it: a source of log positions and an enumerator of storage
//! objects. Both are plain traits so tests can supply in-process
//! implementations.

use crate::block::ContainerId;
use crate::lsn::Lsn;
use std::io;

/// Source of log positions.
///
/// Positions are monotonic within one activation lifetime. During
/// recovery replay the replay position stands in for the live insert
/// position.
pub trait LsnSource {
    /// Current insert position of the host's durability log.
    fn current_lsn(&self) -> Lsn;

    /// Current replay position, meaningful while [`in_recovery`]
    /// returns true.
    ///
    /// [`in_recovery`]: LsnSource::in_recovery
    fn replay_lsn(&self) -> Lsn;

    /// Whether the host is replaying its log.
    fn in_recovery(&self) -> bool {
        false
    }

    /// The position a new stamp should carry right now: the replay
    /// position during recovery, the insert position otherwise.
    fn stamp_lsn(&self) -> Lsn {
        if self.in_recovery() {
            self.replay_lsn()
        } else {
            self.current_lsn()
        }
    }
}

/// One enumerated storage object: a contiguous block range of one fork
/// of one container, addressed by a host-meaningful path.
///
/// Large objects split into segments appear as several entries with
/// increasing `start_block`, each emitted (and bitmapped) separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Owning container.
    pub container: ContainerId,
    /// Fork number.
    pub fork: u32,
    /// Host path of the object, returned verbatim in scan results.
    pub path: String,
    /// First block number of this entry's range.
    pub start_block: u32,
    /// Number of blocks in this entry's range.
    pub block_count: u32,
}

/// Enumerator of trackable storage objects.
///
/// Implementations walk the host's storage layout and must exclude
/// temporary and transient objects. Enumeration restarts from the
/// beginning on every call; the engine never asks for an incremental
/// diff.
pub trait ObjectEnumerator {
    /// Lazily enumerate objects from the start.
    fn objects(&self) -> io::Result<Box<dyn Iterator<Item = ObjectEntry> + '_>>;

    /// Optional per-object modification watermark.
    ///
    /// When the host tracks a max LSN per object, returning it here lets
    /// the scanner skip objects untouched since the query position. This
    /// is purely an optimization; `None` means "always scan".
    fn max_lsn_hint(&self, _entry: &ObjectEntry) -> Option<Lsn> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLsns {
        current: u64,
        replay: u64,
        recovering: bool,
    }

    impl LsnSource for FixedLsns {
        fn current_lsn(&self) -> Lsn {
            Lsn::new(self.current)
        }
        fn replay_lsn(&self) -> Lsn {
            Lsn::new(self.replay)
        }
        fn in_recovery(&self) -> bool {
            self.recovering
        }
    }

    #[test]
    fn test_stamp_prefers_replay_during_recovery() {
        let live = FixedLsns {
            current: 200,
            replay: 150,
            recovering: false,
        };
        assert_eq!(live.stamp_lsn(), Lsn::new(200));

        let replaying = FixedLsns {
            current: 200,
            replay: 150,
            recovering: true,
        };
        assert_eq!(replaying.stamp_lsn(), Lsn::new(150));
    }
}
