//! In-memory stores for unit tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::{MigrateError, Result};
use crate::source::{ExportSession, SourceStore};
use crate::target::{InsertSession, TargetStore};

/// `id,name` CSV with `rows` data records.
pub fn csv_table(rows: usize) -> String {
    let mut csv = String::from("id,name\n");
    for i in 1..=rows {
        csv.push_str(&format!("{},name_{}\n", i, i));
    }
    csv
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn refused(store: &str) -> MigrateError {
    MigrateError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        format!("{} connection refused", store),
    ))
}

/// Take one from `counter` if it is non-zero.
fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[derive(Default)]
struct SourceState {
    exported: Mutex<Vec<String>>,
    closed: AtomicUsize,
}

/// Source whose every table exports the same CSV text.
pub struct MockSource {
    chunks: Vec<Bytes>,
    fail_mid_stream: bool,
    fail_open: bool,
    unavailable_for: AtomicU32,
    pings: AtomicU32,
    state: Arc<SourceState>,
}

impl MockSource {
    pub fn new(csv: &str) -> Self {
        // Odd-sized chunks so records straddle chunk boundaries.
        let chunks = csv
            .as_bytes()
            .chunks(7)
            .map(Bytes::copy_from_slice)
            .collect();
        Self {
            chunks,
            fail_mid_stream: false,
            fail_open: false,
            unavailable_for: AtomicU32::new(0),
            pings: AtomicU32::new(0),
            state: Arc::default(),
        }
    }

    /// Stream half the data, then fail.
    pub fn failing_mid_stream(mut self) -> Self {
        self.fail_mid_stream = true;
        self
    }

    /// Answer pings but refuse every session.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Refuse the first `k` pings.
    pub fn unavailable_for(self, k: u32) -> Self {
        self.unavailable_for.store(k, Ordering::SeqCst);
        self
    }

    pub fn pings(&self) -> u32 {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn exported_tables(&self) -> Vec<String> {
        self.state.exported.lock().unwrap().clone()
    }

    pub fn closed_sessions(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceStore for MockSource {
    fn name(&self) -> &str {
        "PostgreSQL"
    }

    async fn ping(&self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.unavailable_for) {
            return Err(refused("PostgreSQL"));
        }
        Ok(())
    }

    async fn open(&self) -> Result<Box<dyn ExportSession>> {
        if self.fail_open {
            return Err(refused("PostgreSQL"));
        }
        Ok(Box::new(MockExportSession {
            chunks: self.chunks.clone(),
            fail_mid_stream: self.fail_mid_stream,
            state: self.state.clone(),
            closed: false,
        }))
    }
}

struct MockExportSession {
    chunks: Vec<Bytes>,
    fail_mid_stream: bool,
    state: Arc<SourceState>,
    closed: bool,
}

#[async_trait]
impl ExportSession for MockExportSession {
    async fn copy_out_csv(&mut self, table: &str) -> Result<BoxStream<'static, Result<Bytes>>> {
        self.state.exported.lock().unwrap().push(table.to_string());

        if self.fail_mid_stream {
            let half = self.chunks.len() / 2;
            let items: Vec<Result<Bytes>> = self.chunks[..half]
                .iter()
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(refused("PostgreSQL"))))
                .collect();
            return Ok(stream::iter(items).boxed());
        }

        let items: Vec<Result<Bytes>> = self.chunks.iter().cloned().map(Ok).collect();
        Ok(stream::iter(items).boxed())
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Default)]
struct TargetState {
    committed: Mutex<Vec<(String, Bytes)>>,
    attempts: AtomicUsize,
    closed: AtomicUsize,
}

/// Destination that records inserted payloads.
pub struct MockTarget {
    reject_insert: Option<usize>,
    fail_open: bool,
    unavailable_for: AtomicU32,
    pings: AtomicU32,
    state: Arc<TargetState>,
}

impl MockTarget {
    pub fn new() -> Self {
        Self {
            reject_insert: None,
            fail_open: false,
            unavailable_for: AtomicU32::new(0),
            pings: AtomicU32::new(0),
            state: Arc::default(),
        }
    }

    /// Reject the `n`th insert call (1-based) with a server error.
    pub fn rejecting_insert(mut self, n: usize) -> Self {
        self.reject_insert = Some(n);
        self
    }

    /// Answer pings but refuse every session.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Refuse the first `k` pings.
    pub fn unavailable_for(self, k: u32) -> Self {
        self.unavailable_for.store(k, Ordering::SeqCst);
        self
    }

    pub fn pings(&self) -> u32 {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> Vec<(String, Bytes)> {
        self.state.committed.lock().unwrap().clone()
    }

    /// Data rows across committed payloads, headers excluded.
    pub fn committed_rows(&self) -> usize {
        self.committed()
            .iter()
            .map(|(_, payload)| payload.iter().filter(|&&b| b == b'\n').count() - 1)
            .sum()
    }

    pub fn insert_attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    pub fn closed_sessions(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TargetStore for MockTarget {
    fn name(&self) -> &str {
        "ClickHouse"
    }

    async fn ping(&self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.unavailable_for) {
            return Err(refused("ClickHouse"));
        }
        Ok(())
    }

    async fn open(&self) -> Result<Box<dyn InsertSession>> {
        if self.fail_open {
            return Err(refused("ClickHouse"));
        }
        Ok(Box::new(MockInsertSession {
            reject_insert: self.reject_insert,
            state: self.state.clone(),
            closed: false,
        }))
    }
}

struct MockInsertSession {
    reject_insert: Option<usize>,
    state: Arc<TargetState>,
    closed: bool,
}

#[async_trait]
impl InsertSession for MockInsertSession {
    async fn insert_csv(&mut self, table: &str, chunk: Bytes) -> Result<()> {
        let attempt = self.state.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.reject_insert == Some(attempt) {
            return Err(MigrateError::ClickHouse {
                status: 400,
                message: "Code: 27. Cannot parse input".to_string(),
            });
        }
        self.state
            .committed
            .lock()
            .unwrap()
            .push((table.to_string(), chunk));
        Ok(())
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
