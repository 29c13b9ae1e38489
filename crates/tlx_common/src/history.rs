//! Operation History
//!
//! Append-only SQLite log of every simulated, executed, failed or cancelled
//! operation. Used for audit, statistics and finding earlier failures of
//! the same command when troubleshooting.
//!
//! Location: ~/.local/share/tinyllamax/history.sqlite (see `paths`)

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Terminal status of a logged operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
    Failed,
    Cancelled,
    Simulated,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Success => "success",
            OperationStatus::Failed => "failed",
            OperationStatus::Cancelled => "cancelled",
            OperationStatus::Simulated => "simulated",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "success" => Ok(OperationStatus::Success),
            "failed" => Ok(OperationStatus::Failed),
            "cancelled" => Ok(OperationStatus::Cancelled),
            "simulated" => Ok(OperationStatus::Simulated),
            _ => anyhow::bail!("Invalid operation status: {}", s),
        }
    }
}

/// One audit row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Assigned by the store on insert
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub intent_type: String,
    pub command: String,
    pub status: OperationStatus,
    pub output_summary: String,
    pub error_message: Option<String>,
}

impl OperationRecord {
    pub fn new(
        intent_type: impl Into<String>,
        command: impl Into<String>,
        status: OperationStatus,
    ) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            intent_type: intent_type.into(),
            command: command.into(),
            status,
            output_summary: String::new(),
            error_message: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.output_summary = summary.into();
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Counts grouped by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub simulated: u64,
}

const SELECT_COLUMNS: &str =
    "SELECT id, timestamp, intent_type, command, status, output_summary, error_message
     FROM operations";

/// History store backed by SQLite
pub struct OperationHistory {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl OperationHistory {
    /// Open or create the history at the default per-user location
    pub fn open_default() -> Result<Self> {
        Self::open(&crate::paths::default_history_path())
    }

    /// Open or create the history at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;

        // Concurrent background tasks share the file
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .context("Failed to set busy timeout")?;

        info!("Opening operation history at: {}", path.display());

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Private in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Operation history lock poisoned"))
    }

    /// Create table and indexes. Safe to run on every startup.
    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS operations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                intent_type TEXT NOT NULL,
                command TEXT NOT NULL,
                status TEXT NOT NULL,
                output_summary TEXT,
                error_message TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_timestamp
             ON operations(timestamp DESC)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_intent
             ON operations(intent_type)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_status
             ON operations(status)",
            [],
        )?;

        Ok(())
    }

    /// Append a record, returning its assigned id
    pub fn add(&self, record: &OperationRecord) -> Result<i64> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO operations (
                timestamp, intent_type, command, status, output_summary, error_message
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                format_timestamp(&record.timestamp),
                record.intent_type,
                record.command,
                record.status.as_str(),
                record.output_summary,
                record.error_message,
            ],
        )
        .context("Failed to insert operation record")?;

        let id = conn.last_insert_rowid();
        debug!("Recorded {} operation with ID: {}", record.status, id);
        Ok(id)
    }

    /// Most recent operations, newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<OperationRecord>> {
        self.query(
            &format!("{} ORDER BY timestamp DESC, id DESC LIMIT ?1", SELECT_COLUMNS),
            params![sql_limit(limit)],
        )
    }

    pub fn get_by_intent(&self, intent_type: &str, limit: usize) -> Result<Vec<OperationRecord>> {
        self.query(
            &format!(
                "{} WHERE intent_type = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
                SELECT_COLUMNS
            ),
            params![intent_type, sql_limit(limit)],
        )
    }

    pub fn get_by_status(
        &self,
        status: OperationStatus,
        limit: usize,
    ) -> Result<Vec<OperationRecord>> {
        self.query(
            &format!(
                "{} WHERE status = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
                SELECT_COLUMNS
            ),
            params![status.as_str(), sql_limit(limit)],
        )
    }

    /// Failed operations whose command contains `pattern` (literal substring)
    pub fn get_similar_failures(&self, pattern: &str, limit: usize) -> Result<Vec<OperationRecord>> {
        self.query(
            &format!(
                "{} WHERE status = 'failed' AND instr(command, ?1) > 0
                 ORDER BY timestamp DESC, id DESC LIMIT ?2",
                SELECT_COLUMNS
            ),
            params![pattern, sql_limit(limit)],
        )
    }

    /// Counts per status, optionally restricted to one intent type
    pub fn get_stats(&self, intent_type: Option<&str>) -> Result<HistoryStats> {
        let conn = self.lock()?;

        let rows: Vec<(String, i64)> = match intent_type {
            Some(intent) => {
                let mut stmt = conn.prepare(
                    "SELECT status, COUNT(*) FROM operations
                     WHERE intent_type = ?1
                     GROUP BY status",
                )?;
                let rows = stmt
                    .query_map(params![intent], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT status, COUNT(*) FROM operations GROUP BY status")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        let mut stats = HistoryStats::default();
        for (status, count) in rows {
            let count = count.max(0) as u64;
            stats.total += count;
            match status.parse::<OperationStatus>() {
                Ok(OperationStatus::Success) => stats.success = count,
                Ok(OperationStatus::Failed) => stats.failed = count,
                Ok(OperationStatus::Cancelled) => stats.cancelled = count,
                Ok(OperationStatus::Simulated) => stats.simulated = count,
                Err(_) => {}
            }
        }

        Ok(stats)
    }

    /// Total number of stored records
    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM operations", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Delete all but the `keep_count` most recent records
    pub fn cleanup_old(&self, keep_count: usize) -> Result<usize> {
        let conn = self.lock()?;

        let deleted = conn
            .execute(
                "DELETE FROM operations
                 WHERE id NOT IN (
                     SELECT id FROM operations
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?1
                 )",
                params![sql_limit(keep_count)],
            )
            .context("Failed to clean up operation history")?;

        if deleted > 0 {
            info!("Deleted {} old operation records", deleted);
        }
        Ok(deleted)
    }

    fn query<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<OperationRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map(params, row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

/// Fixed-width RFC 3339 so text order is chronological order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// SQLite LIMIT value; counts beyond `i64::MAX` mean no limit
fn sql_limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<OperationRecord> {
    let timestamp_str: String = row.get(1)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    let status_str: String = row.get(4)?;
    let status = status_str
        .parse::<OperationStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into()))?;

    let output_summary: Option<String> = row.get(5)?;

    Ok(OperationRecord {
        id: Some(row.get(0)?),
        timestamp,
        intent_type: row.get(2)?,
        command: row.get(3)?,
        status,
        output_summary: output_summary.unwrap_or_default(),
        error_message: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    fn at(offset_secs: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::seconds(offset_secs)
    }

    fn record(intent: &str, command: &str, status: OperationStatus, ts: i64) -> OperationRecord {
        OperationRecord::new(intent, command, status).with_timestamp(at(ts))
    }

    #[test]
    fn test_schema_and_indexes_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.sqlite");
        let history = OperationHistory::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(history.path(), Some(path.as_path()));

        let conn = history.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        for idx in ["idx_timestamp", "idx_intent", "idx_status"] {
            assert!(names.iter().any(|n| n == idx), "missing {idx}");
        }
    }

    #[test]
    fn test_schema_init_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("history.sqlite");
        let first = OperationHistory::open(&path).unwrap();
        first
            .add(&record("UpdateSystem", "sudo apt update", OperationStatus::Success, 0))
            .unwrap();
        drop(first);

        let second = OperationHistory::open(&path).unwrap();
        assert_eq!(second.count().unwrap(), 1);
    }

    #[test]
    fn test_add_assigns_increasing_ids() {
        let history = OperationHistory::open_in_memory().unwrap();
        let a = history
            .add(&record("InstallPackage", "apt install -s curl", OperationStatus::Simulated, 0))
            .unwrap();
        let b = history
            .add(&record("InstallPackage", "sudo apt install -y curl", OperationStatus::Success, 1))
            .unwrap();
        assert!(a >= 1);
        assert!(b > a);
    }

    #[test]
    fn test_round_trip_fields() {
        let history = OperationHistory::open_in_memory().unwrap();
        let original = record("RemovePackage", "sudo apt remove -y vim", OperationStatus::Failed, 5)
            .with_summary("E: Could not open lock file")
            .with_error("E: Could not open lock file /var/lib/dpkg/lock-frontend");
        let id = history.add(&original).unwrap();

        let got = history.get_recent(1).unwrap().remove(0);
        assert_eq!(got.id, Some(id));
        assert_eq!(got.timestamp, original.timestamp);
        assert_eq!(got.status, OperationStatus::Failed);
        assert_eq!(got.output_summary, original.output_summary);
        assert_eq!(got.error_message, original.error_message);
    }

    #[test]
    fn test_get_recent_orders_by_timestamp() {
        let history = OperationHistory::open_in_memory().unwrap();
        // Insert out of chronological order
        for ts in [30, 10, 50, 20, 40] {
            history
                .add(&record("SearchPackage", "apt search x", OperationStatus::Simulated, ts))
                .unwrap();
        }

        let recent = history.get_recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        let times: Vec<_> = recent.iter().map(|r| r.timestamp).collect();
        assert_eq!(times, vec![at(50), at(40), at(30)]);

        assert_eq!(history.get_recent(100).unwrap().len(), 5);
    }

    #[test]
    fn test_filters_by_intent_and_status() {
        let history = OperationHistory::open_in_memory().unwrap();
        history
            .add(&record("InstallPackage", "apt install -s htop", OperationStatus::Simulated, 0))
            .unwrap();
        history
            .add(&record("InstallPackage", "sudo apt install -y htop", OperationStatus::Success, 1))
            .unwrap();
        history
            .add(&record("UpdateSystem", "sudo apt update", OperationStatus::Failed, 2))
            .unwrap();

        let installs = history.get_by_intent("InstallPackage", 10).unwrap();
        assert_eq!(installs.len(), 2);
        assert!(installs.iter().all(|r| r.intent_type == "InstallPackage"));

        let failed = history.get_by_status(OperationStatus::Failed, 10).unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].command, "sudo apt update");

        assert!(history.get_by_intent("ExplainCommand", 10).unwrap().is_empty());
    }

    #[test]
    fn test_similar_failures_is_literal_substring() {
        let history = OperationHistory::open_in_memory().unwrap();
        history
            .add(&record("InstallPackage", "sudo apt install -y nginx", OperationStatus::Failed, 0))
            .unwrap();
        history
            .add(&record("InstallPackage", "sudo apt install -y nginx", OperationStatus::Success, 1))
            .unwrap();
        history
            .add(&record("InstallPackage", "sudo apt install -y my_pkg", OperationStatus::Failed, 2))
            .unwrap();

        let nginx = history.get_similar_failures("nginx", 5).unwrap();
        assert_eq!(nginx.len(), 1);
        assert_eq!(nginx[0].status, OperationStatus::Failed);

        // LIKE wildcards must not match arbitrary characters
        assert!(history.get_similar_failures("my%pkg", 5).unwrap().is_empty());
        assert_eq!(history.get_similar_failures("my_pkg", 5).unwrap().len(), 1);
        assert_eq!(history.get_similar_failures("apt install", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_stats() {
        let history = OperationHistory::open_in_memory().unwrap();
        let rows = [
            ("InstallPackage", OperationStatus::Simulated),
            ("InstallPackage", OperationStatus::Success),
            ("InstallPackage", OperationStatus::Failed),
            ("UpdateSystem", OperationStatus::Cancelled),
            ("UpdateSystem", OperationStatus::Simulated),
        ];
        for (i, (intent, status)) in rows.iter().enumerate() {
            history.add(&record(intent, "cmd", *status, i as i64)).unwrap();
        }

        let all = history.get_stats(None).unwrap();
        assert_eq!(
            all,
            HistoryStats {
                total: 5,
                success: 1,
                failed: 1,
                cancelled: 1,
                simulated: 2,
            }
        );

        let install = history.get_stats(Some("InstallPackage")).unwrap();
        assert_eq!(install.total, 3);
        assert_eq!(install.cancelled, 0);

        let none = history.get_stats(Some("DetectDistro")).unwrap();
        assert_eq!(none, HistoryStats::default());
    }

    #[test]
    fn test_cleanup_keeps_most_recent() {
        let history = OperationHistory::open_in_memory().unwrap();
        for ts in [5, 1, 4, 2, 3, 6] {
            history
                .add(&record("UpdateSystem", "apt update -s", OperationStatus::Simulated, ts))
                .unwrap();
        }

        let deleted = history.cleanup_old(4).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(history.count().unwrap(), 4);

        let remaining: Vec<_> = history.get_recent(10).unwrap().iter().map(|r| r.timestamp).collect();
        assert_eq!(remaining, vec![at(6), at(5), at(4), at(3)]);

        // Keeping more than exist deletes nothing
        assert_eq!(history.cleanup_old(100).unwrap(), 0);
        assert_eq!(history.count().unwrap(), 4);

        assert_eq!(history.cleanup_old(0).unwrap(), 4);
        assert_eq!(history.count().unwrap(), 0);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("FAILED".parse::<OperationStatus>().unwrap(), OperationStatus::Failed);
        assert!("failure".parse::<OperationStatus>().is_err());
    }

    #[test]
    fn test_huge_limits_mean_no_limit() {
        let history = OperationHistory::open_in_memory().unwrap();
        for i in 0..3 {
            history
                .add(&record("UpdateSystem", "sudo apt update", OperationStatus::Failed, i))
                .unwrap();
        }
        assert_eq!(history.get_recent(usize::MAX).unwrap().len(), 3);
        assert_eq!(history.get_by_intent("UpdateSystem", usize::MAX).unwrap().len(), 3);
        assert_eq!(
            history.get_by_status(OperationStatus::Failed, usize::MAX).unwrap().len(),
            3
        );
        assert_eq!(history.get_similar_failures("apt", usize::MAX).unwrap().len(), 3);
        assert_eq!(history.cleanup_old(usize::MAX).unwrap(), 0);
        assert_eq!(history.count().unwrap(), 3);
    }
}
