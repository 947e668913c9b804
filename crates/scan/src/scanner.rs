//! Changed-set scanner.
//!
//! Walks the host's object enumeration and probes the tracking table for
//! every block, emitting a bitmap per object that has at least one block
//! stamped at or after the query LSN.
//!
//! A block is reported only when *both* of its slots qualify: stamped at
//! or after the query position, and inside the coverage window that
//! starts at the table's activation stamp. A slot stamped before the
//! activation stamp cannot vouch for the requested range: the scan
//! records it as a coverage gap and leaves the block out, and the caller
//! must fall back to a full capture when the summary (or a query below
//! the activation stamp) says the window does not cover the request.

use crate::bitmap::BlockBitmap;
use blocktrack_core::{BlockId, Lsn, ObjectEntry, ObjectEnumerator};
use blocktrack_table::{slot_pair, TrackingTable};
use std::io;
use tracing::{debug, trace};

/// Changed blocks of one enumerated object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedBlocks {
    /// Host path of the object, as supplied by the enumerator.
    pub path: String,
    /// Blocks considered for this object (the bitmap's domain).
    pub block_count: u32,
    /// One bit per block in the object's range, relative to its start
    /// block; set bits are changed (or collision false positives).
    pub bitmap: BlockBitmap,
}

/// Counters accumulated across one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Objects delivered by the enumerator.
    pub objects_seen: u64,
    /// Objects skipped by the enumerator's max-LSN hint.
    pub objects_skipped_by_hint: u64,
    /// Objects emitted with at least one changed block.
    pub objects_emitted: u64,
    /// Total changed blocks reported.
    pub blocks_changed: u64,
    /// Probes that found a stamp predating the activation stamp. Any
    /// nonzero value means the map may not cover part of the requested
    /// history and the affected objects need a full capture.
    pub coverage_gaps: u64,
}

impl ScanSummary {
    /// Whether the map's coverage window failed to vouch for part of
    /// this scan.
    pub fn has_coverage_gaps(&self) -> bool {
        self.coverage_gaps > 0
    }
}

/// Start a changed-block scan at `query_lsn`.
///
/// Enumeration I/O errors surface here; the returned iterator itself is
/// infallible. Each call restarts from the beginning of the enumeration;
/// a scan cannot resume mid-stream. Dropping the iterator between
/// objects aborts the scan cooperatively.
pub fn scan_changed_blocks<'a>(
    table: &'a TrackingTable,
    query_lsn: Lsn,
    enumerator: &'a dyn ObjectEnumerator,
) -> io::Result<ChangedBlockIter<'a>> {
    // Read once: activation only ever transitions invalid -> valid, and
    // a scan that started against an inactive map has nothing to report.
    let init_lsn = table.init_lsn();
    debug!(
        "changed-block scan from {} (init_lsn {})",
        query_lsn, init_lsn
    );
    Ok(ChangedBlockIter {
        table,
        query_lsn,
        init_lsn,
        objects: enumerator.objects()?,
        enumerator,
        summary: ScanSummary::default(),
    })
}

/// Lazy iterator over per-object changed-block bitmaps.
pub struct ChangedBlockIter<'a> {
    table: &'a TrackingTable,
    query_lsn: Lsn,
    init_lsn: Lsn,
    objects: Box<dyn Iterator<Item = ObjectEntry> + 'a>,
    enumerator: &'a dyn ObjectEnumerator,
    summary: ScanSummary,
}

impl ChangedBlockIter<'_> {
    /// Counters accumulated so far; complete once the iterator is
    /// exhausted.
    pub fn summary(&self) -> ScanSummary {
        self.summary
    }

    fn scan_object(&mut self, entry: &ObjectEntry) -> Option<ChangedBlocks> {
        // Never activated: the map has no history at all, so nothing is
        // reported no matter the query position.
        if !self.init_lsn.is_valid() {
            return None;
        }

        let slot_count = self.table.slot_count() as u64;
        let mut bitmap = BlockBitmap::new();

        for offset in 0..entry.block_count {
            let block = entry.start_block + offset;
            let bid = BlockId::new(entry.container, entry.fork, block);
            let (slot1, slot2) = slot_pair(&bid, slot_count);

            let stamp1 = self.table.read_slot(slot1);
            if !self.covered(stamp1) {
                continue;
            }
            if stamp1 < self.query_lsn {
                continue;
            }

            // Only probe the second slot once the first qualifies.
            let stamp2 = self.table.read_slot(slot2);
            if !self.covered(stamp2) {
                continue;
            }
            if stamp2 >= self.query_lsn {
                trace!(
                    "block {} of {} changed (stamps {} and {})",
                    block,
                    entry.path,
                    stamp1,
                    stamp2
                );
                bitmap.set(offset);
            }
        }

        if bitmap.is_empty() {
            return None;
        }
        self.summary.objects_emitted += 1;
        self.summary.blocks_changed += bitmap.count_ones();
        Some(ChangedBlocks {
            path: entry.path.clone(),
            block_count: entry.block_count,
            bitmap,
        })
    }

    /// Whether `stamp` is inside the coverage window. A valid stamp
    /// below the activation stamp is the one case where the map cannot
    /// vouch for history, so count it.
    fn covered(&mut self, stamp: Lsn) -> bool {
        if stamp >= self.init_lsn {
            return true;
        }
        if stamp.is_valid() {
            self.summary.coverage_gaps += 1;
        }
        false
    }
}

impl Iterator for ChangedBlockIter<'_> {
    type Item = ChangedBlocks;

    fn next(&mut self) -> Option<ChangedBlocks> {
        loop {
            let entry = self.objects.next()?;
            self.summary.objects_seen += 1;

            if let Some(hint) = self.enumerator.max_lsn_hint(&entry) {
                if hint < self.query_lsn {
                    trace!(
                        "skipping {}: watermark {} below query {}",
                        entry.path,
                        hint,
                        self.query_lsn
                    );
                    self.summary.objects_skipped_by_hint += 1;
                    continue;
                }
            }

            if let Some(changed) = self.scan_object(&entry) {
                return Some(changed);
            }
        }
    }
}
