//! Shared helpers for integration tests.

use blocktrack::prelude::*;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

/// A host log stub: hands out increasing positions from a counter.
pub struct TestLsns {
    position: AtomicU64,
}

impl TestLsns {
    pub fn at(position: u64) -> Self {
        TestLsns {
            position: AtomicU64::new(position),
        }
    }
}

impl LsnSource for TestLsns {
    fn current_lsn(&self) -> Lsn {
        Lsn::new(self.position.fetch_add(1, Ordering::SeqCst))
    }

    fn replay_lsn(&self) -> Lsn {
        self.current_lsn()
    }
}

/// An in-memory object enumerator over a fixed set of entries.
pub struct MemEnumerator {
    entries: Vec<ObjectEntry>,
    hints: HashMap<String, Lsn>,
}

impl MemEnumerator {
    pub fn new(entries: Vec<ObjectEntry>) -> Self {
        MemEnumerator {
            entries,
            hints: HashMap::new(),
        }
    }

    #[allow(dead_code)]
    pub fn with_hint(mut self, path: &str, lsn: Lsn) -> Self {
        self.hints.insert(path.to_string(), lsn);
        self
    }
}

impl ObjectEnumerator for MemEnumerator {
    fn objects(&self) -> io::Result<Box<dyn Iterator<Item = ObjectEntry> + '_>> {
        Ok(Box::new(self.entries.iter().cloned()))
    }

    fn max_lsn_hint(&self, entry: &ObjectEntry) -> Option<Lsn> {
        self.hints.get(&entry.path).copied()
    }
}

/// One object spanning blocks `0..block_count`.
pub fn object(path: &str, object_id: u32, block_count: u32) -> ObjectEntry {
    ObjectEntry {
        container: ContainerId::new(1, 2, object_id),
        fork: 0,
        path: path.to_string(),
        start_block: 0,
        block_count,
    }
}

/// Block `block` of `entry`.
pub fn block_of(entry: &ObjectEntry, block: u32) -> BlockId {
    BlockId::new(entry.container, entry.fork, block)
}

/// A config whose table holds exactly `slot_count` slots.
pub fn config_with_slots(dir: &std::path::Path, slot_count: u64) -> TrackerConfig {
    TrackerConfig::new(dir, slot_count * 8 + 20)
}
