//! Daemon test fixtures.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use tempfile::TempDir;

use rtas_core::config::RtasConfig;

/// Temp directory holding a servicelog database and the PID file path.
pub struct DaemonFixture {
    pub dir: TempDir,
    pub db_path: PathBuf,
    pub pid_path: PathBuf,
}

impl DaemonFixture {
    /// Creates the directory and a servicelog with `severities` as rows.
    pub async fn with_rows(severities: &[i64]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("servicelog.db");
        let pid_path = dir.path().join("run").join("kube-rtas.pid");
        create_servicelog(&db_path, severities).await;
        Self {
            dir,
            db_path,
            pid_path,
        }
    }

    /// Config using the log sink, a fixed node name and this fixture's paths.
    pub fn config(&self) -> RtasConfig {
        let mut config = RtasConfig::default();
        config.general.pid_file = self.pid_path.display().to_string();
        config.servicelog.db_path = self.db_path.display().to_string();
        config.servicelog.severity_threshold = 3;
        config.notifier.kind = "log".to_owned();
        config.notifier.node_name = "test-node".to_owned();
        config
    }
}

pub async fn create_servicelog(path: &Path, severities: &[i64]) {
    let mut conn = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE EVENTS (ID INTEGER PRIMARY KEY AUTOINCREMENT, SEVERITY INTEGER, DESCRIPTION TEXT)",
    )
    .execute(&mut conn)
    .await
    .unwrap();
    for severity in severities {
        sqlx::query("INSERT INTO EVENTS (SEVERITY, DESCRIPTION) VALUES (?, 'platform event')")
            .bind(*severity)
            .execute(&mut conn)
            .await
            .unwrap();
    }
    conn.close().await.unwrap();
}
