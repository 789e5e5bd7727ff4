//! Migration orchestrator - runs the configured jobs in order.
//!
//! Per job, by mode:
//! - pull: gate(source), extract
//! - push: check file, gate(destination), load
//! - full: gate(source), extract, gate(destination), load
//!
//! The first stage failure is reported once and aborts the run.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::{Config, SourceConfig, TargetConfig};
use crate::error::{MigrateError, Result};
use crate::events::{EventSink, PipelineEvent, Stage, TracingSink};
use crate::gate::{ConnectionGate, GateConfig};
use crate::pipeline::{Job, JobOutcome, JobSource};
use crate::source::{PgSource, SourceStore};
use crate::target::{ClickHouseTarget, TargetStore};
use crate::transfer::{Extractor, Loader};

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    source: Option<Arc<dyn SourceStore>>,
    target: Option<Arc<dyn TargetStore>>,
    events: Arc<dyn EventSink>,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Mode every job ran in.
    pub mode: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    pub jobs_total: usize,
    pub jobs_completed: usize,

    /// Data rows written to intermediate files.
    pub rows_extracted: u64,

    /// Data rows inserted into the destination.
    pub rows_loaded: u64,

    /// Intermediate files produced or consumed, in job order.
    pub artifacts: Vec<PathBuf>,

    pub jobs: Vec<JobOutcome>,
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Connectivity of one store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreHealth {
    pub store: String,
    pub connected: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of [`Orchestrator::health_check`]. Stores the mode does not use
/// are not probed and reported as `None`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub mode: String,
    pub source: Option<StoreHealth>,
    pub target: Option<StoreHealth>,
    pub healthy: bool,
}

impl Orchestrator {
    /// Create an orchestrator over the given stores.
    ///
    /// Each store the configured mode needs must be present; the other one is
    /// ignored.
    pub fn new(
        config: Config,
        source: Option<Arc<dyn SourceStore>>,
        target: Option<Arc<dyn TargetStore>>,
    ) -> Result<Self> {
        config.validate()?;
        let mode = config.migration_schema;
        if mode.needs_source() && source.is_none() {
            return Err(MigrateError::Config(format!(
                "migration_schema '{}' requires a source store",
                mode
            )));
        }
        if mode.needs_target() && target.is_none() {
            return Err(MigrateError::Config(format!(
                "migration_schema '{}' requires a destination store",
                mode
            )));
        }

        Ok(Self {
            config,
            source: if mode.needs_source() { source } else { None },
            target: if mode.needs_target() { target } else { None },
            events: TracingSink::shared(),
        })
    }

    /// Create an orchestrator whose stores are configured from the
    /// environment. Only the stores the mode needs are resolved.
    pub fn from_env(config: Config) -> Result<Self> {
        let mode = config.migration_schema;
        let source: Option<Arc<dyn SourceStore>> = if mode.needs_source() {
            Some(Arc::new(PgSource::new(SourceConfig::from_env()?)?))
        } else {
            None
        };
        let target: Option<Arc<dyn TargetStore>> = if mode.needs_target() {
            Some(Arc::new(ClickHouseTarget::new(TargetConfig::from_env()?)?))
        } else {
            None
        };
        Self::new(config, source, target)
    }

    /// Replace the event sink (default: [`TracingSink`]).
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Run every job in order, stopping at the first failure.
    pub async fn run(&self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let mode = self.config.migration_schema;
        let jobs = self.config.jobs();

        info!(
            "Starting migration run {} (mode: {}, jobs: {})",
            run_id,
            mode,
            jobs.len()
        );

        let gate = ConnectionGate::new(
            GateConfig::from(&self.config.connection_retry),
            self.events.clone(),
        );

        let mut outcomes = Vec::with_capacity(jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            self.events.emit(&PipelineEvent::JobStarted {
                index,
                total: jobs.len(),
                label: job.label(),
                mode: mode.to_string(),
            });

            let outcome = self.run_job(&gate, job).await?;

            self.events.emit(&PipelineEvent::JobCompleted {
                index,
                label: outcome.label.clone(),
            });
            outcomes.push(outcome);
        }

        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let result = MigrationResult {
            run_id,
            status: "completed".to_string(),
            mode: mode.to_string(),
            duration_seconds,
            started_at,
            completed_at,
            jobs_total: jobs.len(),
            jobs_completed: outcomes.len(),
            rows_extracted: outcomes.iter().filter_map(|o| o.rows_extracted).sum(),
            rows_loaded: outcomes.iter().filter_map(|o| o.rows_loaded).sum(),
            artifacts: outcomes.iter().filter_map(|o| o.artifact.clone()).collect(),
            jobs: outcomes,
        };

        info!(
            "Migration completed in {:.2}s: {} job(s), {} row(s) extracted, {} row(s) loaded",
            result.duration_seconds,
            result.jobs_completed,
            result.rows_extracted,
            result.rows_loaded
        );

        Ok(result)
    }

    async fn run_job(&self, gate: &ConnectionGate, job: &Job) -> Result<JobOutcome> {
        let start = Instant::now();
        let mut outcome = JobOutcome::new(job);
        let path = job.dump_path(&self.config.dump_dir, &Local::now());
        outcome.artifact = Some(path.clone());

        match &job.source {
            JobSource::Table(table) => {
                let source = self.source_store()?;
                self.stage(Stage::Gate, table, self.wait_for_source(gate, &source))
                    .await?;

                let extractor = Extractor::new(source, self.events.clone());
                let stats = self
                    .stage(Stage::Extract, table, extractor.export_table(table, &path))
                    .await?;
                outcome.rows_extracted = Some(stats.rows);
            }
            JobSource::CsvFile(_) => {
                let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
                if !exists {
                    let err = MigrateError::load(
                        &job.dest_table,
                        0,
                        format!("CSV file not found: {}", path.display()),
                    );
                    return Err(self.report(Stage::Load, &job.dest_table, err));
                }
            }
        }

        if job.mode.needs_target() {
            let target = self.target_store()?;
            self.stage(
                Stage::Gate,
                &job.dest_table,
                self.wait_for_target(gate, &target),
            )
            .await?;

            let loader = Loader::new(target, self.events.clone());
            let stats = self
                .stage(
                    Stage::Load,
                    &job.dest_table,
                    loader.load_file(&path, job.batch_size, &job.dest_table),
                )
                .await?;
            outcome.rows_loaded = Some(stats.rows);
            outcome.batches = Some(stats.batches);
        }

        outcome.duration_seconds = start.elapsed().as_secs_f64();
        Ok(outcome)
    }

    /// Probe each store the mode uses once, without retry.
    pub async fn health_check(&self) -> HealthCheckResult {
        let source = match &self.source {
            Some(store) => Some(probe(store.name(), store.ping()).await),
            None => None,
        };
        let target = match &self.target {
            Some(store) => Some(probe(store.name(), store.ping()).await),
            None => None,
        };
        let healthy = source.iter().chain(target.iter()).all(|h| h.connected);

        HealthCheckResult {
            mode: self.config.migration_schema.to_string(),
            source,
            target,
            healthy,
        }
    }

    async fn wait_for_source(
        &self,
        gate: &ConnectionGate,
        store: &Arc<dyn SourceStore>,
    ) -> Result<u32> {
        gate.wait_until_ready(store.name(), || {
            let store = Arc::clone(store);
            async move { store.ping().await }
        })
        .await
    }

    async fn wait_for_target(
        &self,
        gate: &ConnectionGate,
        store: &Arc<dyn TargetStore>,
    ) -> Result<u32> {
        gate.wait_until_ready(store.name(), || {
            let store = Arc::clone(store);
            async move { store.ping().await }
        })
        .await
    }

    /// Await a stage, reporting its failure once.
    async fn stage<T, F>(&self, stage: Stage, table: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        fut.await.map_err(|e| self.report(stage, table, e))
    }

    fn report(&self, stage: Stage, table: &str, err: MigrateError) -> MigrateError {
        self.events.emit(&PipelineEvent::StageFailed {
            stage,
            table: table.to_string(),
            error: err.to_string(),
        });
        err
    }

    fn source_store(&self) -> Result<Arc<dyn SourceStore>> {
        self.source
            .clone()
            .ok_or_else(|| MigrateError::Config("no source store configured".into()))
    }

    fn target_store(&self) -> Result<Arc<dyn TargetStore>> {
        self.target
            .clone()
            .ok_or_else(|| MigrateError::Config("no destination store configured".into()))
    }
}

async fn probe<F>(store: &str, ping: F) -> StoreHealth
where
    F: Future<Output = Result<()>>,
{
    let start = Instant::now();
    let result = ping.await;
    StoreHealth {
        store: store.to_string(),
        connected: result.is_ok(),
        latency_ms: start.elapsed().as_millis() as u64,
        error: result.err().map(|e| e.to_string()),
    }
}
