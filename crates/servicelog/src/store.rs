//! Servicelog store accessor.
//!
//! The database belongs to the firmware diagnostics writer, so every cycle
//! opens a fresh read-only connection and closes it before returning. A
//! handle is never kept between cycles.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tokio::time::timeout;
use tracing::{debug, warn};

use rtas_core::error::StoreError;
use rtas_core::types::LogEntry;

use crate::error::ServicelogError;

const COUNT_ROWS_SQL: &str = "SELECT COUNT(*) FROM EVENTS";

const FETCH_DELTA_SQL: &str = "SELECT ID, SEVERITY, DESCRIPTION FROM EVENTS \
     WHERE ID > ? AND SEVERITY > ? ORDER BY ID ASC";

/// Opens read-only connections to the servicelog database.
#[derive(Debug, Clone)]
pub struct SqliteLogStore {
    path: PathBuf,
    op_timeout: Duration,
}

impl SqliteLogStore {
    /// Creates an accessor for the database at `path`.
    ///
    /// `op_timeout` bounds every open and query.
    pub fn new(path: impl Into<PathBuf>, op_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            op_timeout,
        }
    }

    /// Database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fails when the database file is absent.
    ///
    /// Checked once at startup; afterwards a missing file only skips cycles.
    pub fn ensure_exists(&self) -> Result<(), ServicelogError> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(ServicelogError::StoreMissing {
                path: self.path.display().to_string(),
            })
        }
    }

    /// Opens a connection for one cycle.
    ///
    /// Fails with [`StoreError::Unavailable`] when the file is missing, is not
    /// a database, or is locked past the deadline.
    pub async fn open_cycle(&self) -> Result<StoreHandle, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .read_only(true)
            .create_if_missing(false)
            .busy_timeout(self.op_timeout);

        let mut conn = self
            .with_deadline("open", options.connect())
            .await?
            .map_err(|e| self.unavailable(&e))?;

        // The header is only read lazily; probe it so a corrupt file fails here.
        let probe = self
            .with_deadline(
                "open",
                sqlx::query_scalar::<_, i64>("PRAGMA schema_version").fetch_one(&mut conn),
            )
            .await;
        match probe {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                let err = self.unavailable(&e);
                close_quietly(conn, self.op_timeout).await;
                return Err(err);
            }
            Err(e) => {
                close_quietly(conn, self.op_timeout).await;
                return Err(e);
            }
        }

        debug!(path = %self.path.display(), "servicelog store opened");
        Ok(StoreHandle {
            conn,
            op_timeout: self.op_timeout,
        })
    }

    async fn with_deadline<F: Future>(
        &self,
        operation: &'static str,
        fut: F,
    ) -> Result<F::Output, StoreError> {
        timeout(self.op_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout {
                operation,
                secs: self.op_timeout.as_secs(),
            })
    }

    fn unavailable(&self, err: &sqlx::Error) -> StoreError {
        StoreError::Unavailable {
            path: self.path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

/// An open connection, valid for a single cycle.
///
/// Release with [`StoreHandle::close`]; dropping also frees the connection but
/// skips the orderly shutdown.
#[derive(Debug)]
pub struct StoreHandle {
    conn: SqliteConnection,
    op_timeout: Duration,
}

impl StoreHandle {
    /// Total number of rows, regardless of severity.
    pub async fn count_rows(&mut self) -> Result<u64, StoreError> {
        let count = timeout(
            self.op_timeout,
            sqlx::query_scalar::<_, i64>(COUNT_ROWS_SQL).fetch_one(&mut self.conn),
        )
        .await
        .map_err(|_| self.timed_out("count_rows"))?
        .map_err(query_failed)?;

        u64::try_from(count)
            .map_err(|_| StoreError::QueryFailed(format!("negative row count {count}")))
    }

    /// Entries with `ID > since_id` and `SEVERITY > threshold`, by ascending id.
    ///
    /// A single undecodable row fails the whole fetch.
    pub async fn fetch_delta(
        &mut self,
        since_id: u64,
        threshold: i64,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let since_id = i64::try_from(since_id).unwrap_or(i64::MAX);

        let rows = timeout(
            self.op_timeout,
            sqlx::query_as::<_, (i64, i64, Option<String>)>(FETCH_DELTA_SQL)
                .bind(since_id)
                .bind(threshold)
                .fetch_all(&mut self.conn),
        )
        .await
        .map_err(|_| self.timed_out("fetch_delta"))?
        .map_err(query_failed)?;

        rows.into_iter()
            .map(|(id, severity, description)| match description {
                Some(description) => Ok(LogEntry::new(id, severity, description)),
                None => Err(StoreError::QueryFailed(format!("row {id}: NULL DESCRIPTION"))),
            })
            .collect()
    }

    /// Closes the connection, giving up after the operation timeout.
    pub async fn close(self) {
        close_quietly(self.conn, self.op_timeout).await;
    }

    fn timed_out(&self, operation: &'static str) -> StoreError {
        StoreError::Timeout {
            operation,
            secs: self.op_timeout.as_secs(),
        }
    }
}

fn query_failed(err: sqlx::Error) -> StoreError {
    StoreError::QueryFailed(err.to_string())
}

async fn close_quietly(conn: SqliteConnection, deadline: Duration) {
    match timeout(deadline, conn.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "failed to close servicelog connection"),
        Err(_) => warn!(
            secs = deadline.as_secs(),
            "servicelog connection close timed out, abandoning it"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_db(path: &Path, rows: &[(i64, &str)]) {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let mut conn = options.connect().await.unwrap();
        sqlx::query(
            "CREATE TABLE EVENTS (ID INTEGER PRIMARY KEY AUTOINCREMENT, SEVERITY INTEGER, DESCRIPTION TEXT)",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        for (severity, description) in rows {
            sqlx::query("INSERT INTO EVENTS (SEVERITY, DESCRIPTION) VALUES (?, ?)")
                .bind(*severity)
                .bind(*description)
                .execute(&mut conn)
                .await
                .unwrap();
        }
        conn.close().await.unwrap();
    }

    fn store(path: &Path) -> SqliteLogStore {
        SqliteLogStore::new(path, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn count_and_fetch_filter_by_id_and_severity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servicelog.db");
        create_db(
            &path,
            &[(1, "boot"), (2, "link up"), (5, "dimm error"), (6, "psu"), (3, "fan")],
        )
        .await;

        let mut handle = store(&path).open_cycle().await.unwrap();
        assert_eq!(handle.count_rows().await.unwrap(), 5);

        let delta = handle.fetch_delta(0, 4).await.unwrap();
        let ids: Vec<i64> = delta.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(delta[0].description, "dimm error");

        let delta = handle.fetch_delta(3, 0).await.unwrap();
        let ids: Vec<i64> = delta.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 5]);
        handle.close().await;
    }

    #[tokio::test]
    async fn open_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let err = store(&path).open_cycle().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
        assert!(!path.exists(), "open must never create the database");
    }

    #[tokio::test]
    async fn open_corrupt_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servicelog.db");
        std::fs::write(&path, "not an sqlite database\n".repeat(512)).unwrap();
        let err = store(&path).open_cycle().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn missing_table_is_query_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servicelog.db");
        let mut conn = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .connect()
            .await
            .unwrap();
        sqlx::query("CREATE TABLE OTHER (X INTEGER)")
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();

        let mut handle = store(&path).open_cycle().await.unwrap();
        let err = handle.count_rows().await.unwrap_err();
        assert!(matches!(err, StoreError::QueryFailed(_)));
        handle.close().await;
    }

    #[tokio::test]
    async fn null_description_fails_whole_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servicelog.db");
        create_db(&path, &[(5, "ok")]).await;
        let mut conn = SqliteConnectOptions::new()
            .filename(&path)
            .connect()
            .await
            .unwrap();
        sqlx::query("INSERT INTO EVENTS (SEVERITY, DESCRIPTION) VALUES (6, NULL)")
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();

        let mut handle = store(&path).open_cycle().await.unwrap();
        let err = handle.fetch_delta(0, 0).await.unwrap_err();
        match err {
            StoreError::QueryFailed(reason) => assert!(reason.contains("row 2"), "{reason}"),
            other => panic!("unexpected error: {other:?}"),
        }
        handle.close().await;
    }

    #[tokio::test]
    async fn close_returns_within_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servicelog.db");
        create_db(&path, &[(5, "ok")]).await;

        let handle = SqliteLogStore::new(&path, Duration::from_millis(500))
            .open_cycle()
            .await
            .unwrap();
        let started = std::time::Instant::now();
        handle.close().await;
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn ensure_exists_reports_missing_path() {
        let store = store(Path::new("/nonexistent/servicelog.db"));
        let err = store.ensure_exists().unwrap_err();
        assert!(matches!(err, ServicelogError::StoreMissing { .. }));
    }
}
