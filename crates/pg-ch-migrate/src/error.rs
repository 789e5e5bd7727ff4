//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid JSON/YAML, missing fields, missing environment)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store never became reachable within the configured attempt bound
    #[error("{store} unreachable after {attempts} attempt(s): {message}")]
    Connectivity {
        store: String,
        attempts: u32,
        message: String,
    },

    /// Streaming export from the source failed
    #[error("Extraction failed for table {table}: {message}")]
    Extraction { table: String, message: String },

    /// Bulk insert into the destination failed
    #[error("Load failed for table {table} at batch {batch}: {message}")]
    Load {
        table: String,
        batch: usize,
        message: String,
    },

    /// Source database connection or query error
    #[error("Source database error: {0}")]
    Source(#[from] tokio_postgres::Error),

    /// Destination HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Destination rejected a request
    #[error("ClickHouse returned HTTP {status}: {message}")]
    ClickHouse { status: u16, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create an Extraction error from any underlying failure.
    pub fn extraction(table: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        MigrateError::Extraction {
            table: table.into(),
            message: cause.to_string(),
        }
    }

    /// Create a Load error from any underlying failure.
    pub fn load(table: impl Into<String>, batch: usize, cause: impl std::fmt::Display) -> Self {
        MigrateError::Load {
            table: table.into(),
            batch,
            message: cause.to_string(),
        }
    }

    /// Whether this error was raised before any store was contacted.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            MigrateError::Config(_) | MigrateError::Yaml(_) | MigrateError::Json(_)
        )
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            e if e.is_config() => 2,
            MigrateError::Connectivity { .. } => 3,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
