//! Connection parameter resolution from environment variables.
//!
//! Source (PostgreSQL): `PG_HOST`, `PG_PORT`, `PG_DB`, `PG_USER`,
//! `PG_PASSWORD`, `PG_SCHEMA`, `PG_SSLMODE`.
//!
//! Destination (ClickHouse): `CH_HOST`, `CH_PORT`, `CH_DB`, `CH_USER`,
//! `CH_PASSWORD`, `CH_SECURE`.

use super::types::{
    default_ch_port, default_disable, default_pg_port, default_public_schema, SourceConfig,
    TargetConfig,
};
use crate::error::{MigrateError, Result};

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MigrateError::Config(format!(
            "environment variable {} is required",
            key
        ))),
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn port<F>(lookup: &F, key: &str, default: u16) -> Result<u16>
where
    F: Fn(&str) -> Option<String>,
{
    match optional(lookup, key) {
        Some(v) => v.trim().parse::<u16>().map_err(|_| {
            MigrateError::Config(format!("{} must be a port number, got '{}'", key, v))
        }),
        None => Ok(default),
    }
}

impl SourceConfig {
    /// Resolve source parameters from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve source parameters through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            host: required(&lookup, "PG_HOST")?,
            port: port(&lookup, "PG_PORT", default_pg_port())?,
            database: required(&lookup, "PG_DB")?,
            user: required(&lookup, "PG_USER")?,
            password: lookup("PG_PASSWORD").unwrap_or_default(),
            schema: optional(&lookup, "PG_SCHEMA").unwrap_or_else(default_public_schema),
            ssl_mode: optional(&lookup, "PG_SSLMODE").unwrap_or_else(default_disable),
        })
    }
}

impl TargetConfig {
    /// Resolve destination parameters from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve destination parameters through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secure = match optional(&lookup, "CH_SECURE")
            .map(|v| v.to_lowercase())
            .as_deref()
        {
            None | Some("false") | Some("no") | Some("0") => false,
            Some("true") | Some("yes") | Some("1") => true,
            Some(other) => {
                return Err(MigrateError::Config(format!(
                    "CH_SECURE must be true or false, got '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            host: required(&lookup, "CH_HOST")?,
            port: port(&lookup, "CH_PORT", default_ch_port())?,
            database: required(&lookup, "CH_DB")?,
            username: required(&lookup, "CH_USER")?,
            password: lookup("CH_PASSWORD").unwrap_or_default(),
            secure,
        })
    }
}
