//! Configuration validation.

use std::path::{Component, Path};

use super::{Config, MigrationMode, SourceConfig, TargetConfig};
use crate::core::identifier::validate_identifier;
use crate::error::{MigrateError, Result};

/// Validate the job file.
pub fn validate(config: &Config) -> Result<()> {
    match config.migration_schema {
        MigrationMode::Push => {
            if config.csv_files.is_empty() {
                return Err(MigrateError::Config(
                    "csv_files must list at least one file for migration_schema 'push'".into(),
                ));
            }
            for (i, entry) in config.csv_files.iter().enumerate() {
                if entry.csv.trim().is_empty() {
                    return Err(MigrateError::Config(format!(
                        "csv_files[{}].csv is required",
                        i
                    )));
                }
                if !is_relative_file_name(&entry.csv) {
                    return Err(MigrateError::Config(format!(
                        "csv_files[{}].csv must stay inside the dump directory: {:?}",
                        i, entry.csv
                    )));
                }
                validate_identifier(&entry.table)
                    .map_err(|e| MigrateError::Config(format!("csv_files[{}].table: {}", i, e)))?;
                validate_batch_size(entry.insert_batchsize, &format!("csv_files[{}]", i))?;
            }
        }
        MigrationMode::Pull | MigrationMode::Full => {
            if config.tables.is_empty() {
                return Err(MigrateError::Config(format!(
                    "tables must list at least one table for migration_schema '{}'",
                    config.migration_schema
                )));
            }
            for (i, entry) in config.tables.iter().enumerate() {
                validate_identifier(&entry.name)
                    .map_err(|e| MigrateError::Config(format!("tables[{}].name: {}", i, e)))?;
                if let Some(ref target) = entry.target_table {
                    validate_identifier(target).map_err(|e| {
                        MigrateError::Config(format!("tables[{}].target_table: {}", i, e))
                    })?;
                }
                validate_batch_size(entry.insert_batchsize, &format!("tables[{}]", i))?;
            }
        }
    }

    if config.dump_dir.as_os_str().is_empty() {
        return Err(MigrateError::Config("dump_dir cannot be empty".into()));
    }

    if let Some(0) = config.connection_retry.max_attempts {
        return Err(MigrateError::Config(
            "connection_retry.max_attempts must be at least 1".into(),
        ));
    }

    Ok(())
}

/// A name that resolves under whatever directory it is joined to: relative,
/// with no `.`, `..`, root or prefix components.
fn is_relative_file_name(name: &str) -> bool {
    Path::new(name)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

fn validate_batch_size(batch_size: usize, context: &str) -> Result<()> {
    if batch_size == 0 {
        return Err(MigrateError::Config(format!(
            "{}.insert_batchsize must be at least 1",
            context
        )));
    }
    Ok(())
}

/// Validate source connection parameters.
pub fn validate_source(source: &SourceConfig) -> Result<()> {
    if source.host.is_empty() {
        return Err(MigrateError::Config("source host is required".into()));
    }
    if source.database.is_empty() {
        return Err(MigrateError::Config("source database is required".into()));
    }
    if source.user.is_empty() {
        return Err(MigrateError::Config("source user is required".into()));
    }
    validate_identifier(&source.schema)
        .map_err(|e| MigrateError::Config(format!("source schema: {}", e)))?;
    Ok(())
}

/// Validate destination connection parameters.
pub fn validate_target(target: &TargetConfig) -> Result<()> {
    if target.host.is_empty() {
        return Err(MigrateError::Config("destination host is required".into()));
    }
    if target.database.is_empty() {
        return Err(MigrateError::Config(
            "destination database is required".into(),
        ));
    }
    if target.username.is_empty() {
        return Err(MigrateError::Config(
            "destination username is required".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CsvFileConfig, RetryConfig, TableConfig};
    use std::path::PathBuf;

    fn valid_config() -> Config {
        Config {
            migration_schema: MigrationMode::Full,
            tables: vec![TableConfig {
                name: "orders".to_string(),
                target_table: None,
                insert_batchsize: 500,
            }],
            csv_files: vec![],
            dump_dir: PathBuf::from("/tmp/dumps"),
            connection_retry: RetryConfig::default(),
        }
    }

    fn source() -> SourceConfig {
        SourceConfig {
            host: "localhost".to_string(),
            port: 5432,
            database: "shop".to_string(),
            user: "etl".to_string(),
            password: "password".to_string(),
            schema: "public".to_string(),
            ssl_mode: "disable".to_string(),
        }
    }

    fn target() -> TargetConfig {
        TargetConfig {
            host: "localhost".to_string(),
            port: 8123,
            database: "analytics".to_string(),
            username: "default".to_string(),
            password: "password".to_string(),
            secure: false,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = valid_config();
        config.tables[0].insert_batchsize = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("insert_batchsize"));
    }

    #[test]
    fn test_full_mode_requires_tables() {
        let mut config = valid_config();
        config.tables.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_push_mode_requires_csv_files() {
        let mut config = valid_config();
        config.migration_schema = MigrationMode::Push;
        assert!(validate(&config).is_err());

        config.csv_files.push(CsvFileConfig {
            csv: "preloaded.csv".to_string(),
            table: "orders".to_string(),
            insert_batchsize: 500,
        });
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_push_mode_rejects_parent_traversal() {
        let mut config = valid_config();
        config.migration_schema = MigrationMode::Push;
        config.csv_files.push(CsvFileConfig {
            csv: "../etc/passwd".to_string(),
            table: "orders".to_string(),
            insert_batchsize: 500,
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_push_mode_rejects_absolute_and_dotted_names() {
        for name in ["/etc/passwd", "./preloaded.csv", "exports/../../x.csv"] {
            let mut config = valid_config();
            config.migration_schema = MigrationMode::Push;
            config.csv_files.push(CsvFileConfig {
                csv: name.to_string(),
                table: "orders".to_string(),
                insert_batchsize: 500,
            });
            let err = validate(&config).unwrap_err();
            assert!(err.is_config(), "{}", name);
            assert!(err.to_string().contains("dump directory"), "{}", name);
        }
    }

    #[test]
    fn test_push_mode_accepts_nested_relative_name() {
        let mut config = valid_config();
        config.migration_schema = MigrationMode::Push;
        config.csv_files.push(CsvFileConfig {
            csv: "exports/2024/orders.csv".to_string(),
            table: "orders".to_string(),
            insert_batchsize: 500,
        });
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_max_attempts_rejected() {
        let mut config = valid_config();
        config.connection_retry.max_attempts = Some(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_source_host() {
        let mut src = source();
        src.host = "".to_string();
        assert!(validate_source(&src).is_err());
        assert!(validate_source(&source()).is_ok());
    }

    #[test]
    fn test_missing_target_user() {
        let mut tgt = target();
        tgt.username = "".to_string();
        assert!(validate_target(&tgt).is_err());
        assert!(validate_target(&target()).is_ok());
    }

    #[test]
    fn test_source_config_debug_redacts_password() {
        let mut src = source();
        src.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", src);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_123"));
    }

    #[test]
    fn test_target_config_debug_redacts_password() {
        let mut tgt = target();
        tgt.password = "super_secret_password_456".to_string();
        let debug_output = format!("{:?}", tgt);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_456"));
    }
}
