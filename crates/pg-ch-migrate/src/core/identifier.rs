//! Identifier validation and quoting for dynamically built statements.
//!
//! Table names come from the job file and cannot be bound as statement
//! parameters, so they are validated and quoted per dialect before being
//! placed into `COPY` and `INSERT` text.
//!
//! Names may be schema-qualified (`sales.orders`). Each dot-separated part is
//! quoted separately; quoting makes names case-sensitive.

use crate::error::{MigrateError, Result};

/// Maximum identifier length (conservative limit across both stores).
/// - PostgreSQL: 63 bytes
/// - ClickHouse: no hard limit, but long names are rejected by most tooling
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects empty identifiers, identifiers containing null bytes or control
/// characters, empty path segments (`sales..orders`) and identifiers that
/// exceed the maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.chars().any(|c| c == '\0' || c.is_control()) {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier contains control characters (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    if name.split('.').any(|part| part.is_empty()) {
        return Err(MigrateError::Config(format!(
            "Identifier has an empty name segment: {:?}",
            name
        )));
    }

    Ok(())
}

/// Quote a possibly schema-qualified PostgreSQL name.
///
/// ```ignore
/// assert_eq!(qualify_pg("orders")?, "\"orders\"");
/// assert_eq!(qualify_pg("sales.orders")?, "\"sales\".\"orders\"");
/// ```
pub fn qualify_pg(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(name
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join("."))
}

/// Quote a possibly database-qualified ClickHouse name using backticks.
///
/// ```ignore
/// assert_eq!(qualify_ch("orders")?, "`orders`");
/// assert_eq!(qualify_ch("analytics.orders")?, "`analytics`.`orders`");
/// ```
pub fn qualify_ch(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(name
        .split('.')
        .map(|part| format!("`{}`", part.replace('\\', "\\\\").replace('`', "\\`")))
        .collect::<Vec<_>>()
        .join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_names() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("   ").is_err());
        assert!(validate_identifier("orders\0").is_err());
        assert!(validate_identifier("orders\n; DROP TABLE x").is_err());
        assert!(validate_identifier("sales..orders").is_err());
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH + 1)).is_err());
        assert!(validate_identifier("sales.orders").is_ok());
    }

    #[test]
    fn test_qualify_pg() {
        assert_eq!(qualify_pg("orders").unwrap(), "\"orders\"");
        assert_eq!(qualify_pg("sales.orders").unwrap(), "\"sales\".\"orders\"");
        assert_eq!(qualify_pg("we\"ird").unwrap(), "\"we\"\"ird\"");
    }

    #[test]
    fn test_qualify_ch() {
        assert_eq!(qualify_ch("orders").unwrap(), "`orders`");
        assert_eq!(qualify_ch("analytics.orders").unwrap(), "`analytics`.`orders`");
        assert_eq!(qualify_ch("we`ird").unwrap(), "`we\\`ird`");
    }
}
