//! SQLite record sink
//!
//! Records and failed Targets are written through a shared connection on
//! the blocking pool, so store writes never stall other in-flight Targets.

use crate::crawler::TargetFailure;
use crate::state::TargetState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordSink, StoreError, StoreResult};
use crate::storage::{Record, RunRecord, RunStatus};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Opens (or creates) a record database and initializes its schema
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_database(path: &Path) -> StoreResult<Connection> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA temp_store = MEMORY;
    ",
    )?;

    initialize_schema(&conn)?;
    Ok(conn)
}

/// Record sink bound to one crawl run
#[derive(Clone)]
pub struct SqliteRecordSink {
    conn: Arc<Mutex<Connection>>,
    run_id: i64,
}

impl SqliteRecordSink {
    /// Opens the database at `path` and starts a new run
    pub fn open(path: &Path, config_hash: &str) -> StoreResult<Self> {
        let conn = open_database(path)?;
        Self::start_run(conn, config_hash)
    }

    /// Creates an in-memory database with a new run
    pub fn open_in_memory(config_hash: &str) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Self::start_run(conn, config_hash)
    }

    fn start_run(conn: Connection, config_hash: &str) -> StoreResult<Self> {
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![
                Utc::now().to_rfc3339(),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        let run_id = conn.last_insert_rowid();
        tracing::debug!("Started run {}", run_id);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            run_id,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Closes the run with its final status and totals
    pub fn finish_run(
        &self,
        status: RunStatus,
        targets_completed: u64,
        targets_failed: u64,
        rows_found: u64,
    ) -> StoreResult<()> {
        let run_id = self.run_id;
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE runs
                 SET status = ?1, finished_at = ?2, targets_completed = ?3,
                     targets_failed = ?4, rows_found = ?5
                 WHERE id = ?6",
                params![
                    status.to_db_string(),
                    Utc::now().to_rfc3339(),
                    targets_completed as i64,
                    targets_failed as i64,
                    rows_found as i64,
                    run_id
                ],
            )?;
            Ok(())
        })
    }

    /// Gets the run this sink writes to
    pub fn get_run(&self) -> StoreResult<RunRecord> {
        let run_id = self.run_id;
        self.with_conn(|conn| {
            get_run(conn, run_id)?.ok_or_else(|| {
                StoreError::Unavailable(format!("run {} disappeared", run_id))
            })
        })
    }

    /// Records of this run, in insertion order
    pub fn records(&self) -> StoreResult<Vec<Record>> {
        let run_id = self.run_id;
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT payload FROM records WHERE run_id = ?1 ORDER BY id")?;
            let payloads = stmt
                .query_map(params![run_id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;

            payloads
                .iter()
                .map(|payload| serde_json::from_str(payload).map_err(StoreError::from))
                .collect()
        })
    }

    /// Failed Targets of this run, in the order they failed
    pub fn failures(&self) -> StoreResult<Vec<TargetFailure>> {
        let run_id = self.run_id;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT target_id, url, stage, attempts, message
                 FROM failed_targets WHERE run_id = ?1 ORDER BY id",
            )?;
            let failures = stmt
                .query_map(params![run_id], |row| {
                    Ok(TargetFailure {
                        target_id: row.get::<_, i64>(0)? as u64,
                        url: row.get(1)?,
                        stage: TargetState::from_str_name(&row.get::<_, String>(2)?)
                            .unwrap_or(TargetState::Failed),
                        attempts: row.get(3)?,
                        message: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(failures)
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }

    /// Runs `f` against the connection on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl RecordSink for SqliteRecordSink {
    async fn push_record(&self, record: &Record) -> StoreResult<()> {
        let payload = serde_json::to_string(record)?;
        let run_id = self.run_id;
        let target_id = record.target_id() as i64;
        let url = record.url().to_string();
        let kind = record.kind();
        let ordinal = record.ordinal() as i64;

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO records (run_id, target_id, url, kind, ordinal, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(run_id, url, kind, ordinal) DO UPDATE SET
                     target_id = excluded.target_id,
                     payload = excluded.payload,
                     created_at = excluded.created_at",
                params![
                    run_id,
                    target_id,
                    url,
                    kind,
                    ordinal,
                    payload,
                    Utc::now().to_rfc3339()
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn record_failure(&self, failure: &TargetFailure) -> StoreResult<()> {
        let run_id = self.run_id;
        let failure = failure.clone();

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO failed_targets
                     (run_id, target_id, url, stage, attempts, message, failed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    run_id,
                    failure.target_id as i64,
                    failure.url,
                    failure.stage.as_str(),
                    failure.attempts,
                    failure.message,
                    Utc::now().to_rfc3339()
                ],
            )?;
            Ok(())
        })
        .await
    }
}

fn get_run(conn: &Connection, run_id: i64) -> StoreResult<Option<RunRecord>> {
    let run = conn
        .query_row(
            "SELECT id, started_at, finished_at, config_hash, status,
                    targets_completed, targets_failed, rows_found
             FROM runs WHERE id = ?1",
            params![run_id],
            map_run,
        )
        .optional()?;
    Ok(run)
}

fn map_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        targets_completed: row.get::<_, i64>(5)? as u64,
        targets_failed: row.get::<_, i64>(6)? as u64,
        rows_found: row.get::<_, i64>(7)? as u64,
    })
}

/// Aggregate counts for the latest run in a record database
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    pub total_runs: u64,
    pub latest_run: Option<RunRecord>,
    pub row_records: u64,
    pub chunk_records: u64,
    pub distinct_urls: u64,
    pub failed_targets: u64,
}

/// Loads statistics for the most recent run
pub fn load_run_statistics(conn: &Connection) -> StoreResult<RunStatistics> {
    let total_runs: i64 = conn.query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;

    let latest_run = conn
        .query_row(
            "SELECT id, started_at, finished_at, config_hash, status,
                    targets_completed, targets_failed, rows_found
             FROM runs ORDER BY id DESC LIMIT 1",
            [],
            map_run,
        )
        .optional()?;

    let Some(run) = latest_run else {
        return Ok(RunStatistics {
            total_runs: total_runs as u64,
            ..Default::default()
        });
    };

    let count = |sql: &str| -> StoreResult<u64> {
        let n: i64 = conn.query_row(sql, params![run.id], |row| row.get(0))?;
        Ok(n as u64)
    };

    Ok(RunStatistics {
        total_runs: total_runs as u64,
        row_records: count("SELECT COUNT(*) FROM records WHERE run_id = ?1 AND kind = 'row'")?,
        chunk_records: count(
            "SELECT COUNT(*) FROM records WHERE run_id = ?1 AND kind = 'chunk'",
        )?,
        distinct_urls: count("SELECT COUNT(DISTINCT url) FROM records WHERE run_id = ?1")?,
        failed_targets: count("SELECT COUNT(*) FROM failed_targets WHERE run_id = ?1")?,
        latest_run: Some(run),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(position: usize, cell: &str) -> Record {
        Record::Row {
            target_id: 1,
            url: "https://example.com/list".to_string(),
            position,
            cells: vec![cell.to_string()],
        }
    }

    #[test]
    fn test_open_in_memory_starts_run() {
        let sink = SqliteRecordSink::open_in_memory("hash").unwrap();
        let run = sink.get_run().unwrap();
        assert_eq!(run.id, sink.run_id());
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.config_hash, "hash");
    }

    #[tokio::test]
    async fn test_records_roundtrip_in_order() {
        let sink = SqliteRecordSink::open_in_memory("hash").unwrap();
        sink.push_record(&row(0, "a")).await.unwrap();
        sink.push_record(&row(1, "b")).await.unwrap();

        let records = sink.records().unwrap();
        assert_eq!(records, vec![row(0, "a"), row(1, "b")]);
    }

    #[tokio::test]
    async fn test_reprocessing_replaces_records() {
        let sink = SqliteRecordSink::open_in_memory("hash").unwrap();
        sink.push_record(&row(0, "old")).await.unwrap();
        sink.push_record(&row(0, "new")).await.unwrap();

        assert_eq!(sink.records().unwrap(), vec![row(0, "new")]);
    }

    #[tokio::test]
    async fn test_failures_are_stored() {
        let sink = SqliteRecordSink::open_in_memory("hash").unwrap();
        let failure = TargetFailure {
            target_id: 4,
            url: "https://example.com/broken".to_string(),
            stage: TargetState::Loading,
            attempts: 3,
            message: "timed out".to_string(),
        };
        sink.record_failure(&failure).await.unwrap();

        assert_eq!(sink.failures().unwrap(), vec![failure]);
    }

    #[tokio::test]
    async fn test_statistics_for_latest_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crawl.db");

        let first = SqliteRecordSink::open(&path, "h1").unwrap();
        first.push_record(&row(0, "x")).await.unwrap();
        first.finish_run(RunStatus::Completed, 1, 0, 1).unwrap();

        let second = SqliteRecordSink::open(&path, "h2").unwrap();
        second.push_record(&row(0, "a")).await.unwrap();
        second.push_record(&row(1, "b")).await.unwrap();
        second
            .push_record(&Record::Chunk {
                target_id: 1,
                url: "https://example.com/list".to_string(),
                chunk_index: 1,
                row_count: 2,
                rows: vec![vec!["a".into()], vec!["b".into()]],
            })
            .await
            .unwrap();
        second.finish_run(RunStatus::Completed, 1, 0, 2).unwrap();

        let conn = open_database(&path).unwrap();
        let stats = load_run_statistics(&conn).unwrap();
        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.row_records, 2);
        assert_eq!(stats.chunk_records, 1);
        assert_eq!(stats.distinct_urls, 1);
        assert_eq!(stats.failed_targets, 0);

        let run = stats.latest_run.unwrap();
        assert_eq!(run.config_hash, "h2");
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.rows_found, 2);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_statistics_on_empty_database() {
        let dir = TempDir::new().unwrap();
        let conn = open_database(&dir.path().join("empty.db")).unwrap();
        let stats = load_run_statistics(&conn).unwrap();
        assert_eq!(stats.total_runs, 0);
        assert!(stats.latest_run.is_none());
    }
}
