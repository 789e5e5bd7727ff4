//! Structured progress events emitted by the pipeline.
//!
//! Pipeline components never configure logging. They emit [`PipelineEvent`]s
//! to an [`EventSink`] handed to them at construction. [`TracingSink`]
//! renders events as `tracing` records; how those are formatted and where
//! they are written is decided by whoever installs the subscriber.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// A pipeline stage, as named in failure events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Load,
    Gate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Load => "load",
            Stage::Gate => "connection gate",
        }
    }
}

/// Progress and failure events.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StoreReady {
        store: String,
        attempts: u32,
    },
    StoreUnavailable {
        store: String,
        attempt: u32,
        error: String,
    },
    JobStarted {
        index: usize,
        total: usize,
        label: String,
        mode: String,
    },
    ExportStarted {
        table: String,
        path: PathBuf,
    },
    ExportFinished {
        table: String,
        path: PathBuf,
        rows: u64,
        bytes: u64,
        elapsed: Duration,
    },
    LoadStarted {
        table: String,
        path: PathBuf,
        batch_size: usize,
    },
    BatchLoaded {
        table: String,
        batch: usize,
        rows: usize,
        total_rows: u64,
        elapsed: Duration,
    },
    LoadFinished {
        table: String,
        rows: u64,
        batches: usize,
        elapsed: Duration,
    },
    JobCompleted {
        index: usize,
        label: String,
    },
    StageFailed {
        stage: Stage,
        table: String,
        error: String,
    },
}

/// Receiver of pipeline events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PipelineEvent);
}

/// Renders events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn shared() -> Arc<dyn EventSink> {
        Arc::new(TracingSink)
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StoreReady { store, attempts } => {
                info!(store = %store, attempts = *attempts, "{} connection successful", store);
            }
            PipelineEvent::StoreUnavailable {
                store,
                attempt,
                error,
            } => {
                warn!(
                    store = %store,
                    attempt = *attempt,
                    "Waiting for {}... Error: {}",
                    store,
                    error
                );
            }
            PipelineEvent::JobStarted {
                index,
                total,
                label,
                mode,
            } => {
                info!(job = index + 1, total = *total, mode = %mode, "Starting job {}", label);
            }
            PipelineEvent::ExportStarted { table, path } => {
                info!(table = %table, "Starting PostgreSQL export to {}", path.display());
            }
            PipelineEvent::ExportFinished {
                table,
                path,
                rows,
                bytes,
                elapsed,
            } => {
                info!(
                    table = %table,
                    rows = *rows,
                    "Data exported to {} (Size: {:.2} MB, Time: {:.2} seconds)",
                    path.display(),
                    *bytes as f64 / (1024.0 * 1024.0),
                    elapsed.as_secs_f64()
                );
            }
            PipelineEvent::LoadStarted {
                table,
                path,
                batch_size,
            } => {
                info!(
                    table = %table,
                    "Starting ClickHouse import from {} with batch size {}",
                    path.display(),
                    batch_size
                );
            }
            PipelineEvent::BatchLoaded {
                table,
                batch,
                rows,
                total_rows,
                elapsed,
            } => {
                info!(
                    table = %table,
                    batch = *batch,
                    "Inserted batch of {} rows (Total: {}, Batch time: {:.2}s)",
                    rows,
                    total_rows,
                    elapsed.as_secs_f64()
                );
            }
            PipelineEvent::LoadFinished {
                table,
                rows,
                batches,
                elapsed,
            } => {
                info!(
                    batches = *batches,
                    "Import complete! Total {} rows imported to {} in {:.2} seconds",
                    rows,
                    table,
                    elapsed.as_secs_f64()
                );
            }
            PipelineEvent::JobCompleted { index, label } => {
                info!(job = index + 1, "Job {} completed successfully", label);
            }
            PipelineEvent::StageFailed {
                stage,
                table,
                error,
            } => {
                error!(stage = stage.as_str(), table = %table, "Migration failed: {}", error);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Sink that keeps every event for assertions.
    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<PipelineEvent>>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<PipelineEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn failures(&self) -> Vec<PipelineEvent> {
            self.events()
                .into_iter()
                .filter(|e| matches!(e, PipelineEvent::StageFailed { .. }))
                .collect()
        }

        pub fn batch_sizes(&self) -> Vec<usize> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    PipelineEvent::BatchLoaded { rows, .. } => Some(rows),
                    _ => None,
                })
                .collect()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: &PipelineEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
