//! Final type enforcement.
//!
//! Every column named in the schema is cast to its declared
//! [`ColumnType`]. A single uncastable cell aborts the whole step and leaves
//! the record set untouched. Casting a value that already has the target
//! type returns it unchanged, so enforcement can be repeated safely.

use std::collections::BTreeMap;

use chrono::NaiveTime;
use traffic_violations_record_models::{ColumnType, RecordSet, Value};

use crate::temporal::{parse_date, parse_datetime};

/// Errors raised while enforcing the declared schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A declared column is not present.
    #[error("Declared column '{column}' is not in the record set")]
    MissingColumn {
        /// Column name.
        column: String,
    },

    /// A cell cannot be represented as the declared type.
    #[error("Cannot cast '{value}' in column '{column}' (row {row}) to {target}")]
    Cast {
        /// Column name.
        column: String,
        /// Zero-based row index.
        row: usize,
        /// Rendered offending value.
        value: String,
        /// Declared type.
        target: ColumnType,
    },
}

#[allow(
    clippy::float_cmp,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
fn float_to_int(x: f64) -> Option<i64> {
    (x.is_finite() && x.trunc() == x && x >= i64::MIN as f64 && x < i64::MAX as f64)
        .then_some(x as i64)
}

fn text_to_int(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(float_to_int))
}

fn text_to_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Casts one cell to `target`. Missing always stays missing. Returns `None`
/// when the value cannot be represented.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cast_value(value: &Value, target: ColumnType) -> Option<Value> {
    let cast = match (target, value) {
        (_, Value::Missing) => Value::Missing,

        (ColumnType::Text, Value::Text(_)) => value.clone(),
        (ColumnType::Text, other) => Value::Text(other.to_string()),

        (ColumnType::Timestamp, Value::Timestamp(_)) => value.clone(),
        (ColumnType::Timestamp, Value::Date(d)) => Value::Timestamp(d.and_time(NaiveTime::MIN)),
        (ColumnType::Timestamp, Value::Text(s)) => Value::Timestamp(
            parse_datetime(s).or_else(|| parse_date(s).map(|d| d.and_time(NaiveTime::MIN)))?,
        ),

        (ColumnType::Integer, Value::Int(_)) => value.clone(),
        (ColumnType::Integer, Value::Float(x)) => Value::Int(float_to_int(*x)?),
        (ColumnType::Integer, Value::Bool(b)) => Value::Int(i64::from(*b)),
        (ColumnType::Integer, Value::Text(s)) => Value::Int(text_to_int(s)?),

        (ColumnType::Float, Value::Float(_)) => value.clone(),
        (ColumnType::Float, Value::Int(i)) => Value::Float(*i as f64),
        (ColumnType::Float, Value::Text(s)) => {
            Value::Float(s.trim().parse::<f64>().ok().filter(|x| x.is_finite())?)
        }

        (ColumnType::Boolean, Value::Bool(_)) => value.clone(),
        (ColumnType::Boolean, Value::Text(s)) => Value::Bool(text_to_bool(s)?),

        _ => return None,
    };
    Some(cast)
}

/// Casts every declared column. Columns not named in the schema are left
/// as they are.
///
/// # Errors
///
/// Returns [`SchemaError::MissingColumn`] if a declared column is absent, or
/// [`SchemaError::Cast`] for the first cell that cannot be cast. In either
/// case no column has been modified.
pub fn enforce_schema(
    records: &mut RecordSet,
    schema: &BTreeMap<String, ColumnType>,
) -> Result<(), SchemaError> {
    let mut cast_columns: Vec<(&str, Vec<Value>)> = Vec::with_capacity(schema.len());

    for (column, &target) in schema {
        let values = records
            .column(column)
            .ok_or_else(|| SchemaError::MissingColumn {
                column: column.clone(),
            })?;
        let cast = values
            .iter()
            .enumerate()
            .map(|(row, value)| {
                cast_value(value, target).ok_or_else(|| SchemaError::Cast {
                    column: column.clone(),
                    row,
                    value: value.to_string(),
                    target,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        cast_columns.push((column.as_str(), cast));
    }

    for (column, cast) in cast_columns {
        if let Some(slot) = records.column_mut(column) {
            for (cell, value) in slot.iter_mut().zip(cast) {
                *cell = value;
            }
        }
    }

    log::debug!("Enforced types on {} columns", schema.len());
    Ok(())
}
