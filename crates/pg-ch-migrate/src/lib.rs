//! # pg-ch-migrate
//!
//! Batch PostgreSQL to ClickHouse transfer library.
//!
//! Tables move through an intermediate CSV file in three modes:
//!
//! - **pull**: export source tables to timestamped CSV files
//! - **push**: bulk-load pre-existing CSV files into ClickHouse
//! - **full**: export, then load the file just written
//!
//! Exports use PostgreSQL `COPY ... TO STDOUT` streamed straight to disk.
//! Loads split the file into fixed-size batches, each sent as one
//! `INSERT ... FORMAT CSVWithNames` call over the ClickHouse HTTP interface.
//! Every stage waits for its store to accept connections first.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pg_ch_migrate::{Config, Orchestrator};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> pg_ch_migrate::Result<()> {
//!     let config = Config::load("/config/config.json")?;
//!     let orchestrator = Orchestrator::from_env(config)?;
//!     let result = orchestrator.run().await?;
//!     println!("Loaded {} rows", result.rows_loaded);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod gate;
pub mod orchestrator;
pub mod pipeline;
pub mod source;
pub mod target;
pub mod transfer;

#[cfg(test)]
mod test_support;

// Re-exports for convenient access
pub use config::{Config, MigrationMode, SourceConfig, TargetConfig};
pub use error::{MigrateError, Result};
pub use events::{EventSink, PipelineEvent, TracingSink};
pub use gate::{ConnectionGate, GateConfig};
pub use orchestrator::{HealthCheckResult, MigrationResult, Orchestrator};
pub use pipeline::{Job, JobSource};
pub use source::{PgSource, SourceStore};
pub use target::{ClickHouseTarget, TargetStore};
pub use transfer::{ExportStats, Extractor, LoadStats, Loader};
