#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB` storage for cleaned traffic-violation records.
//!
//! [`sink`] bulk-loads a cleaned record set into a single table through the
//! `DuckDB` appender, inside one transaction. [`queries`] holds the read
//! side used by the dashboard commands.

pub mod paths;
pub mod queries;
pub mod sink;

use std::sync::LazyLock;

use regex::Regex;

/// Plain SQL identifiers: a letter or underscore, then letters, digits, or
/// underscores.
static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error (e.g. creating the data directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cell could not be converted to its column's SQL type.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// The destination table exists with a different column list.
    #[error("Table '{table}' has columns {actual:?} but the records have {expected:?}")]
    SchemaMismatch {
        /// Table name.
        table: String,
        /// Columns of the record set being loaded.
        expected: Vec<String>,
        /// Columns found in the table.
        actual: Vec<String>,
    },

    /// A table or column name is not a plain identifier.
    #[error("Invalid SQL identifier: {name:?}")]
    InvalidIdentifier {
        /// The rejected name.
        name: String,
    },
}

/// Validates `name` as a plain identifier and returns it double-quoted.
///
/// # Errors
///
/// Returns [`DbError::InvalidIdentifier`] if the name contains anything
/// other than ASCII letters, digits, and underscores.
pub fn quote_identifier(name: &str) -> Result<String, DbError> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(format!("\"{name}\""))
    } else {
        Err(DbError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_identifiers() {
        assert_eq!(quote_identifier("date_of_stop").unwrap(), "\"date_of_stop\"");
        assert_eq!(quote_identifier("_x1").unwrap(), "\"_x1\"");
    }

    #[test]
    fn rejects_injection_attempts() {
        for name in ["", "1abc", "make; DROP TABLE t", "a\"b", "dl state"] {
            assert!(matches!(
                quote_identifier(name),
                Err(DbError::InvalidIdentifier { .. })
            ));
        }
    }
}
