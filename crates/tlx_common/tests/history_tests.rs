//! Operation history persistence and retention.

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use tlx_common::{OperationHistory, OperationRecord, OperationStatus};

fn record_at(minute: i64, status: OperationStatus, command: &str) -> OperationRecord {
    let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    OperationRecord::new("InstallPackage", command, status)
        .with_timestamp(base + Duration::minutes(minute))
}

#[test]
fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/history.sqlite");

    {
        let history = OperationHistory::open(&path).unwrap();
        history
            .add(&record_at(0, OperationStatus::Failed, "sudo apt install -y htopp")
                .with_error("E: Unable to locate package htopp"))
            .unwrap();
    }

    let history = OperationHistory::open(&path).unwrap();
    assert_eq!(history.path(), Some(path.as_path()));
    let rows = history.get_recent(10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, Some(1));
    assert_eq!(
        rows[0].error_message.as_deref(),
        Some("E: Unable to locate package htopp")
    );
}

#[test]
fn test_get_recent_is_bounded_and_descending() {
    let history = OperationHistory::open_in_memory().unwrap();
    // Insert out of chronological order
    for minute in [5, 1, 9, 3, 7] {
        history
            .add(&record_at(minute, OperationStatus::Simulated, "apt install -s htop"))
            .unwrap();
    }

    let rows = history.get_recent(3).unwrap();
    assert_eq!(rows.len(), 3);
    for pair in rows.windows(2) {
        assert!(pair[0].timestamp > pair[1].timestamp);
    }
    assert_eq!(rows[0].timestamp, record_at(9, OperationStatus::Simulated, "").timestamp);
}

#[test]
fn test_cleanup_keeps_most_recent() {
    let history = OperationHistory::open_in_memory().unwrap();
    for minute in 0..10 {
        history
            .add(&record_at(minute, OperationStatus::Success, "sudo apt update"))
            .unwrap();
    }

    let deleted = history.cleanup_old(4).unwrap();
    assert_eq!(deleted, 6);
    assert_eq!(history.count().unwrap(), 4);

    let oldest_kept = history
        .get_recent(10)
        .unwrap()
        .into_iter()
        .map(|r| r.timestamp)
        .min()
        .unwrap();
    assert_eq!(oldest_kept, record_at(6, OperationStatus::Success, "").timestamp);

    // Keeping more than exist deletes nothing
    assert_eq!(history.cleanup_old(100).unwrap(), 0);
    assert_eq!(history.count().unwrap(), 4);
}

#[test]
fn test_similar_failures_match_literal_substring() {
    let history = OperationHistory::open_in_memory().unwrap();
    history
        .add(&record_at(0, OperationStatus::Failed, "sudo apt install -y lib_foo%"))
        .unwrap();
    history
        .add(&record_at(1, OperationStatus::Failed, "sudo apt install -y libXfoo"))
        .unwrap();
    history
        .add(&record_at(2, OperationStatus::Success, "sudo apt install -y lib_foo%"))
        .unwrap();

    let rows = history.get_similar_failures("lib_foo%", 10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].command, "sudo apt install -y lib_foo%");
}

#[test]
fn test_stats_filtered_by_intent() {
    let history = OperationHistory::open_in_memory().unwrap();
    history
        .add(&record_at(0, OperationStatus::Success, "sudo apt install -y htop"))
        .unwrap();
    history
        .add(&OperationRecord::new("UpdateSystem", "sudo apt update", OperationStatus::Failed))
        .unwrap();

    let all = history.get_stats(None).unwrap();
    assert_eq!(all.total, 2);
    let install = history.get_stats(Some("InstallPackage")).unwrap();
    assert_eq!(install.total, 1);
    assert_eq!(install.success, 1);
    assert_eq!(install.failed, 0);
}

#[test]
fn test_concurrent_writers() {
    let history = Arc::new(OperationHistory::open_in_memory().unwrap());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let history = Arc::clone(&history);
            thread::spawn(move || {
                for i in 0..25 {
                    history
                        .add(&OperationRecord::new(
                            "SearchPackage",
                            format!("apt search pkg{}-{}", t, i),
                            OperationStatus::Simulated,
                        ))
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(history.count().unwrap(), 100);
}
