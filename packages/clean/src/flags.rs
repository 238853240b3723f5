//! Tri-state yes/no flag columns.

use traffic_violations_lookup::PipelineConfig;
use traffic_violations_lookup::config::BooleanConfig;
use traffic_violations_record_models::{RecordSet, Value};

use crate::CleanError;
use crate::normalize::normalize_value;

/// Maps one raw cell to `Bool(true)`, `Bool(false)`, or missing.
///
/// Recognized tokens come from the config. An empty or null cell is `false`
/// when `missing_is_false` is set; anything else unrecognized is missing.
#[must_use]
pub fn parse_flag(value: &Value, config: &BooleanConfig) -> Value {
    match normalize_value(value) {
        Value::Text(token) if config.truthy.contains(&token) => Value::Bool(true),
        Value::Text(token) if config.falsy.contains(&token) => Value::Bool(false),
        Value::Missing if config.missing_is_false => Value::Bool(false),
        _ => Value::Missing,
    }
}

/// Converts every configured flag column.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if a flag column is absent.
pub fn clean_flags(records: &mut RecordSet, config: &PipelineConfig) -> Result<(), CleanError> {
    for column in &config.boolean.columns {
        for value in records.require_mut(column)? {
            *value = parse_flag(value, &config.boolean);
        }
    }
    Ok(())
}
