//! Configuration loading and validation.

mod env;
mod types;
mod validation;

pub use types::*;
pub use validation::{validate_source, validate_target};

use crate::error::{MigrateError, Result};
use crate::pipeline::{Job, JobSource};
use std::path::Path;

impl Config {
    /// Load configuration from a JSON or YAML file, chosen by extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MigrateError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Expand the configuration into the ordered job list for this run.
    pub fn jobs(&self) -> Vec<Job> {
        let mode = self.migration_schema;
        match mode {
            MigrationMode::Push => self
                .csv_files
                .iter()
                .map(|f| Job {
                    mode,
                    source: JobSource::CsvFile(f.csv.clone()),
                    dest_table: f.table.clone(),
                    batch_size: f.insert_batchsize,
                })
                .collect(),
            MigrationMode::Pull | MigrationMode::Full => self
                .tables
                .iter()
                .map(|t| Job {
                    mode,
                    source: JobSource::Table(t.name.clone()),
                    dest_table: t.target_table.clone().unwrap_or_else(|| t.name.clone()),
                    batch_size: t.insert_batchsize,
                })
                .collect(),
        }
    }
}
