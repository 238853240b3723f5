#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cell values, column types, and the in-memory record set shared by every
//! stage of the traffic-violations pipeline.
//!
//! Raw CSV rows enter as [`Value::Text`] cells, the cleaning stages rewrite
//! them into typed values, and the sink consumes the final [`RecordSet`].

pub mod record_set;

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use record_set::{Column, RecordSet, sink_column_name};

/// Errors raised when a [`RecordSet`] would become ragged or a column is
/// looked up that does not exist.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// A row did not have one cell per header.
    #[error("Row {row} has {actual} cells but the header declares {expected} columns")]
    RowLength {
        /// Zero-based row index.
        row: usize,
        /// Number of header columns.
        expected: usize,
        /// Number of cells found.
        actual: usize,
    },

    /// A replacement column did not match the record count.
    #[error("Column '{column}' has {actual} values but the record set has {expected} rows")]
    ColumnLength {
        /// Column name.
        column: String,
        /// Current row count.
        expected: usize,
        /// Length of the supplied values.
        actual: usize,
    },

    /// A required column is absent.
    #[error("Missing column: {column}")]
    MissingColumn {
        /// Column name.
        column: String,
    },
}

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

impl Geolocation {
    /// Creates a new geolocation from the given coordinates.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Geolocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// A single cell of a [`RecordSet`].
///
/// `Missing` is the only null; every stage that rejects a value writes
/// `Missing` rather than an error.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value (null).
    #[default]
    Missing,
    /// Free or categorical text.
    Text(String),
    /// Tri-state flag when combined with `Missing`.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Date and time of day combined.
    Timestamp(NaiveDateTime),
    /// Paired coordinates.
    Point(Geolocation),
}

impl Value {
    /// Builds a [`Value::Text`] from anything string-like.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Returns `true` for [`Value::Missing`].
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Returns the inner string of a [`Value::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value as text, or `None` when missing.
    ///
    /// Non-text values use their [`Display`](fmt::Display) form, so a float
    /// read back from an earlier stage can still be normalized as text.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Self::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Self::Point(p) => write!(f, "{p}"),
        }
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Missing, Self::Text)
    }
}

/// Declared target type of a sink column.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColumnType {
    /// Date plus time of day.
    Timestamp,
    /// Nullable 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Text.
    Text,
    /// Nullable boolean.
    Boolean,
}

impl ColumnType {
    /// Returns the SQL type used when creating the sink table.
    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Timestamp => "TIMESTAMP",
            Self::Integer => "BIGINT",
            Self::Float => "DOUBLE",
            Self::Text => "VARCHAR",
            Self::Boolean => "BOOLEAN",
        }
    }
}
