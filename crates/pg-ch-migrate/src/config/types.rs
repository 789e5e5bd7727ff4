//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Transfer mode selected by `migration_schema`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationMode {
    /// Source table to CSV file only.
    Pull,
    /// Pre-existing CSV file to destination only.
    Push,
    /// Source table to CSV file to destination.
    Full,
}

impl MigrationMode {
    /// Whether jobs in this mode read from the source store.
    pub fn needs_source(&self) -> bool {
        matches!(self, MigrationMode::Pull | MigrationMode::Full)
    }

    /// Whether jobs in this mode write to the destination store.
    pub fn needs_target(&self) -> bool {
        matches!(self, MigrationMode::Push | MigrationMode::Full)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationMode::Pull => "pull",
            MigrationMode::Push => "push",
            MigrationMode::Full => "full",
        }
    }
}

impl fmt::Display for MigrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root configuration structure (the job file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transfer mode for every job in this file.
    pub migration_schema: MigrationMode,

    /// Source tables (pull and full modes).
    #[serde(default)]
    pub tables: Vec<TableConfig>,

    /// Pre-existing CSV files (push mode).
    #[serde(default)]
    pub csv_files: Vec<CsvFileConfig>,

    /// Directory holding intermediate CSV files (default: /tmp/dumps).
    #[serde(default = "default_dump_dir")]
    pub dump_dir: PathBuf,

    /// Connection gate behavior.
    #[serde(default)]
    pub connection_retry: RetryConfig,
}

/// One source table to extract (and optionally load).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Source table name, optionally schema-qualified.
    pub name: String,

    /// Destination table name (default: same as `name`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_table: Option<String>,

    /// Data rows per insert call.
    pub insert_batchsize: usize,
}

/// One pre-existing CSV file to load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvFileConfig {
    /// File name relative to the dump directory.
    pub csv: String,

    /// Destination table name.
    pub table: String,

    /// Data rows per insert call.
    pub insert_batchsize: usize,
}

/// Connection gate retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Seconds to sleep between failed connection attempts (default: 2).
    #[serde(default = "default_retry_delay_secs")]
    pub delay_secs: u64,

    /// Give up after this many attempts. Unbounded if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_retry_delay_secs(),
            max_attempts: None,
        }
    }
}

/// Source database (PostgreSQL) connection parameters.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Schema placed on the export session's search_path (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,

    /// SSL mode (default: "disable").
    #[serde(default = "default_disable")]
    pub ssl_mode: String,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Destination (ClickHouse HTTP interface) connection parameters.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Server host.
    pub host: String,

    /// HTTP port (default: 8123).
    #[serde(default = "default_ch_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub username: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Use HTTPS (default: false).
    #[serde(default)]
    pub secure: bool,
}

impl TargetConfig {
    /// Base URL of the HTTP interface.
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}/", scheme, self.host, self.port)
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("secure", &self.secure)
            .finish()
    }
}

// Default value functions for serde
fn default_dump_dir() -> PathBuf {
    PathBuf::from("/tmp/dumps")
}

fn default_retry_delay_secs() -> u64 {
    2
}

pub(crate) fn default_pg_port() -> u16 {
    5432
}

pub(crate) fn default_ch_port() -> u16 {
    8123
}

pub(crate) fn default_public_schema() -> String {
    "public".to_string()
}

pub(crate) fn default_disable() -> String {
    "disable".to_string()
}
