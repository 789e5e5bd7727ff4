//! Job model: one unit of transfer work and its outcome.

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::MigrationMode;

/// Where a job's rows come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum JobSource {
    /// A source table, exported to a fresh intermediate file.
    Table(String),
    /// A pre-existing CSV file under the dump directory.
    CsvFile(String),
}

/// One configured transfer. Immutable once built from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub mode: MigrationMode,
    pub source: JobSource,
    pub dest_table: String,
    pub batch_size: usize,
}

impl Job {
    /// Human-readable job name used in events.
    pub fn label(&self) -> String {
        match (&self.source, self.mode) {
            (JobSource::Table(t), MigrationMode::Pull) => t.clone(),
            (JobSource::Table(t), _) if *t == self.dest_table => t.clone(),
            (JobSource::Table(t), _) => format!("{} -> {}", t, self.dest_table),
            (JobSource::CsvFile(f), _) => format!("{} -> {}", f, self.dest_table),
        }
    }

    /// Intermediate file this job reads or writes.
    ///
    /// Table sources get a new timestamped name on every run so earlier
    /// dumps are never overwritten.
    pub fn dump_path<Tz: TimeZone>(&self, dump_dir: &Path, now: &DateTime<Tz>) -> PathBuf
    where
        Tz::Offset: std::fmt::Display,
    {
        match &self.source {
            JobSource::CsvFile(name) => dump_dir.join(name),
            JobSource::Table(table) => dump_dir.join(format!(
                "dump_{}_{}.csv",
                now.format("%Y%m%d_%H%M%S"),
                table.replace(['/', '\\'], "_")
            )),
        }
    }
}

/// Result of a completed job. A failed job aborts the run, so only jobs that
/// finished every stage get an outcome.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub label: String,
    pub mode: MigrationMode,
    pub source: JobSource,
    pub dest_table: String,

    /// Intermediate file written or read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_extracted: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_loaded: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub batches: Option<usize>,

    pub duration_seconds: f64,
}

impl JobOutcome {
    pub(crate) fn new(job: &Job) -> Self {
        Self {
            label: job.label(),
            mode: job.mode,
            source: job.source.clone(),
            dest_table: job.dest_table.clone(),
            artifact: None,
            rows_extracted: None,
            rows_loaded: None,
            batches: None,
            duration_seconds: 0.0,
        }
    }
}
