//! Tracker lifecycle: enable, disable, coverage window, bulk marking.

mod common;

use blocktrack::prelude::*;
use common::*;
use tempfile::TempDir;

const MAP_FILE: &str = "changed.map";
const MAP_FILE_TMP: &str = "changed.map.tmp";

// ============================================================================
// Disabled tracking
// ============================================================================

#[test]
fn zero_budget_opens_disabled() {
    let dir = TempDir::new().unwrap();
    let tracker = Tracker::open(TrackerConfig::new(dir.path(), 0)).unwrap();

    assert!(!tracker.is_enabled());
    assert_eq!(tracker.slot_count(), 0);
    assert_eq!(tracker.init_lsn(), None);
}

#[test]
fn disabled_mark_is_noop_and_query_errors() {
    let dir = TempDir::new().unwrap();
    let tracker = Tracker::open(TrackerConfig::new(dir.path(), 0)).unwrap();
    let entry = object("base/100", 100, 16);

    // Marks are silently dropped.
    tracker.mark(&block_of(&entry, 1), Lsn::new(10));

    // Queries are a hard error the caller must handle.
    let enumerator = MemEnumerator::new(vec![entry]);
    let err = tracker
        .changed_blocks(Lsn::new(1), &enumerator)
        .err()
        .expect("disabled query must fail");
    assert!(matches!(err, Error::Disabled));
}

#[test]
fn disabled_checkpoint_removes_stale_artifacts() {
    let dir = TempDir::new().unwrap();
    let entry = object("base/100", 100, 16);

    // Leave a persisted image behind.
    {
        let tracker = Tracker::open(config_with_slots(dir.path(), 64)).unwrap();
        tracker.mark(&block_of(&entry, 1), Lsn::new(10));
        tracker.checkpoint(&TestLsns::at(20)).unwrap();
    }
    assert!(dir.path().join(MAP_FILE).exists());

    // Reopen disabled: open already cleans, and checkpoint stays clean.
    let tracker = Tracker::open(TrackerConfig::new(dir.path(), 0)).unwrap();
    assert!(!dir.path().join(MAP_FILE).exists());

    tracker.checkpoint(&TestLsns::at(30)).unwrap();
    assert!(!dir.path().join(MAP_FILE).exists());
    assert!(!dir.path().join(MAP_FILE_TMP).exists());
}

#[test]
fn disable_tears_down_live_tracker() {
    let dir = TempDir::new().unwrap();
    let entry = object("base/100", 100, 16);

    let mut tracker = Tracker::open(config_with_slots(dir.path(), 64)).unwrap();
    tracker.mark(&block_of(&entry, 1), Lsn::new(10));
    tracker.checkpoint(&TestLsns::at(20)).unwrap();
    assert!(tracker.is_enabled());

    tracker.disable().unwrap();
    assert!(!tracker.is_enabled());
    assert!(!dir.path().join(MAP_FILE).exists());

    tracker.mark(&block_of(&entry, 2), Lsn::new(30));
    let enumerator = MemEnumerator::new(vec![entry]);
    assert!(matches!(
        tracker.changed_blocks(Lsn::new(1), &enumerator),
        Err(Error::Disabled)
    ));
}

#[test]
fn too_small_budget_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let err = Tracker::open(TrackerConfig::new(dir.path(), 10)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

// ============================================================================
// Coverage window
// ============================================================================

#[test]
fn never_activated_map_reports_nothing() {
    let dir = TempDir::new().unwrap();
    let tracker = Tracker::open(config_with_slots(dir.path(), 64)).unwrap();
    let entry = object("base/100", 100, 64);

    assert_eq!(tracker.init_lsn(), Some(Lsn::INVALID));

    let enumerator = MemEnumerator::new(vec![entry]);
    for query in [0u64, 1, 1000] {
        let results: Vec<ChangedBlocks> = tracker
            .changed_blocks(Lsn::new(query), &enumerator)
            .unwrap()
            .collect();
        assert!(results.is_empty(), "query {query}");
    }
}

#[test]
fn checkpoint_activates_map_without_marks() {
    let dir = TempDir::new().unwrap();
    let tracker = Tracker::open(config_with_slots(dir.path(), 64)).unwrap();

    tracker.checkpoint(&TestLsns::at(700)).unwrap();
    assert_eq!(tracker.init_lsn(), Some(Lsn::new(700)));
}

#[test]
fn scan_summary_reports_coverage_gaps() {
    let dir = TempDir::new().unwrap();
    let config = config_with_slots(dir.path(), 1 << 12);
    let entry = object("base/100", 100, 64);

    let tracker = Tracker::open(config).unwrap();
    let table = tracker.table().unwrap();
    table.mark(&block_of(&entry, 3), Lsn::new(40));
    // Age the window forward to the state a map restored from a later
    // activation records: stamps exist below the activation point.
    table.restore_init_lsn(Lsn::new(60));

    let enumerator = MemEnumerator::new(vec![entry]);
    let mut iter = tracker.changed_blocks(Lsn::new(30), &enumerator).unwrap();
    let results: Vec<ChangedBlocks> = iter.by_ref().collect();

    assert!(results.is_empty());
    assert!(iter.summary().has_coverage_gaps());
}

// ============================================================================
// Bulk marking
// ============================================================================

#[test]
fn mark_object_stamps_every_block() {
    let dir = TempDir::new().unwrap();
    let tracker = Tracker::open(config_with_slots(dir.path(), 1 << 12)).unwrap();
    let entry = object("base/100", 100, 128);

    tracker.mark_object(&entry, Lsn::new(100));

    let enumerator = MemEnumerator::new(vec![entry]);
    let results: Vec<ChangedBlocks> = tracker
        .changed_blocks(Lsn::new(50), &enumerator)
        .unwrap()
        .collect();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].block_count, 128);
    for block in 0..128 {
        assert!(results[0].bitmap.contains(block), "block {block}");
    }
}

#[test]
fn mark_object_on_segment_range() {
    let dir = TempDir::new().unwrap();
    let tracker = Tracker::open(config_with_slots(dir.path(), 1 << 12)).unwrap();
    let segment = ObjectEntry {
        container: ContainerId::new(1, 2, 100),
        fork: 0,
        path: "base/100.2".to_string(),
        start_block: 2048,
        block_count: 32,
    };

    tracker.mark_object(&segment, Lsn::new(100));

    let enumerator = MemEnumerator::new(vec![segment]);
    let results: Vec<ChangedBlocks> = tracker
        .changed_blocks(Lsn::new(50), &enumerator)
        .unwrap()
        .collect();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].bitmap.count_ones(), 32);
}

// ============================================================================
// Introspection
// ============================================================================

#[test]
fn version_is_exposed() {
    assert!(!Tracker::version().is_empty());
}

#[test]
fn hint_prunes_scan_work() {
    let dir = TempDir::new().unwrap();
    let tracker = Tracker::open(config_with_slots(dir.path(), 1 << 12)).unwrap();
    let hot = object("base/100", 100, 16);
    let cold = object("base/200", 200, 16);
    tracker.mark(&block_of(&hot, 1), Lsn::new(500));
    tracker.mark(&block_of(&cold, 1), Lsn::new(90));

    let enumerator = MemEnumerator::new(vec![hot, cold])
        .with_hint("base/100", Lsn::new(500))
        .with_hint("base/200", Lsn::new(90));

    let mut iter = tracker.changed_blocks(Lsn::new(100), &enumerator).unwrap();
    let results: Vec<ChangedBlocks> = iter.by_ref().collect();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path, "base/100");
    let summary = iter.summary();
    assert_eq!(summary.objects_skipped_by_hint, 1);
    assert_eq!(summary.objects_emitted, 1);
}
