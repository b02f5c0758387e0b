//! Shared fixtures: an on-disk servicelog and a recording sink.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use tempfile::TempDir;

use rtas_core::error::DispatchError;
use rtas_core::event::{NodeEvent, NodeIdentity};
use rtas_core::pipeline::EventSink;
use rtas_servicelog::{CycleRunner, Dispatcher, SqliteLogStore, StartFrom};

/// Temporary servicelog database with the firmware schema.
pub struct TestServicelog {
    _dir: TempDir,
    path: PathBuf,
}

impl TestServicelog {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servicelog.db");
        let log = Self { _dir: dir, path };
        log.create().await;
        log
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn create(&self) {
        let mut conn = SqliteConnectOptions::new()
            .filename(&self.path)
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
        conn.close().await.unwrap();
    }

    /// Appends entries the way the diagnostics writer does.
    pub async fn append(&self, entries: &[(i64, &str)]) {
        let mut conn = SqliteConnectOptions::new()
            .filename(&self.path)
            .connect()
            .await
            .unwrap();
        for (severity, description) in entries {
            sqlx::query("INSERT INTO EVENTS (SEVERITY, DESCRIPTION) VALUES (?, ?)")
                .bind(*severity)
                .bind(*description)
                .execute(&mut conn)
                .await
                .unwrap();
        }
        conn.close().await.unwrap();
    }

    /// Appends a row whose DESCRIPTION is NULL.
    pub async fn append_malformed(&self, severity: i64) {
        let mut conn = SqliteConnectOptions::new()
            .filename(&self.path)
            .connect()
            .await
            .unwrap();
        sqlx::query("INSERT INTO EVENTS (SEVERITY, DESCRIPTION) VALUES (?, NULL)")
            .bind(severity)
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();
    }

    pub fn remove(&self) {
        std::fs::remove_file(&self.path).unwrap();
    }
}

/// Sink that records every attempt and can be told to fail one call.
#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<usize>,
    fail_on_call: Mutex<Option<usize>>,
    attempted: Mutex<Vec<i64>>,
    delivered: Mutex<Vec<NodeEvent>>,
}

impl RecordingSink {
    /// Fails the `n`-th call from now (1-based), once.
    pub fn fail_on_next(&self, n: usize) {
        let calls = *self.calls.lock().unwrap();
        *self.fail_on_call.lock().unwrap() = Some(calls + n);
    }

    pub fn attempted_ids(&self) -> Vec<i64> {
        self.attempted.lock().unwrap().clone()
    }

    pub fn delivered_ids(&self) -> Vec<i64> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.entry_id)
            .collect()
    }

    pub fn delivered(&self) -> Vec<NodeEvent> {
        self.delivered.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, event: &NodeEvent) -> Result<(), DispatchError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        self.attempted.lock().unwrap().push(event.entry_id);

        let mut fail_on = self.fail_on_call.lock().unwrap();
        if *fail_on == Some(call) {
            *fail_on = None;
            return Err(DispatchError::Rejected {
                status: 503,
                body: "apiserver unavailable".to_owned(),
            });
        }
        drop(fail_on);

        self.delivered.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub fn node() -> NodeIdentity {
    NodeIdentity::new("worker-1").unwrap()
}

pub fn runner<S: EventSink>(path: &Path, sink: S, threshold: i64) -> CycleRunner<S> {
    CycleRunner::new(
        SqliteLogStore::new(path, Duration::from_secs(5)),
        Dispatcher::new(sink, node(), Duration::from_secs(5)),
        threshold,
        StartFrom::Beginning,
    )
}
