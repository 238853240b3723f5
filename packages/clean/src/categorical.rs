//! Text categoricals: agency, location, search fields, region codes, driver
//! city, and the catch-all group.

use std::collections::BTreeMap;

use traffic_violations_lookup::PipelineConfig;
use traffic_violations_lookup::config::SearchConfig;
use traffic_violations_record_models::{RecordSet, Value};

use crate::CleanError;
use crate::frequency::{FrequencyTable, collapse_long_tail};
use crate::normalize::{NON_ALPHA_RE, non_empty, normalize_value, strip_matches};

fn rewrite(value: Value, rewrites: Option<&BTreeMap<String, String>>) -> Value {
    match (value, rewrites) {
        (Value::Text(s), Some(map)) => map.get(&s).map_or(Value::Text(s), |to| Value::text(to)),
        (value, _) => value,
    }
}

/// Normalizes the agency and sub-agency columns.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if either column is absent.
pub fn clean_agency(records: &mut RecordSet, config: &PipelineConfig) -> Result<(), CleanError> {
    for column in [&config.columns.agency, &config.columns.sub_agency] {
        crate::normalize::normalize_column(records.require_mut(column)?);
    }
    Ok(())
}

/// Normalizes the location column and applies the configured substring
/// replacements.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if the location column is absent.
pub fn clean_location(records: &mut RecordSet, config: &PipelineConfig) -> Result<(), CleanError> {
    let replacements = &config.location.replacements;
    for value in records.require_mut(&config.columns.location)? {
        *value = match normalize_value(value) {
            Value::Text(mut location) => {
                for (from, to) in replacements {
                    location = location.replace(from.as_str(), to);
                }
                non_empty(location.trim().to_string())
            }
            other => other,
        };
    }
    Ok(())
}

/// Cleans one search-field cell.
///
/// Not-applicable tokens are matched on the trimmed uppercase text before
/// null folding, so a literal `"nan"` becomes the `NA` value rather than
/// missing.
#[must_use]
pub fn clean_search_value(value: &Value, column: &str, config: &SearchConfig) -> Value {
    if let Some(raw) = value.to_text()
        && config.na_tokens.contains(raw.trim().to_uppercase().as_str())
    {
        return Value::text(&config.na_value);
    }

    let mut cleaned = normalize_value(value);
    if config.strip_trailing_hyphen.contains(column)
        && let Value::Text(s) = &cleaned
    {
        cleaned = non_empty(s.trim_end_matches('-').to_string());
    }
    rewrite(cleaned, config.rewrites.get(column))
}

/// Cleans every configured search column.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if a search column is absent.
pub fn clean_search(records: &mut RecordSet, config: &PipelineConfig) -> Result<(), CleanError> {
    let search = &config.search;
    for column in &search.columns {
        for value in records.require_mut(column)? {
            *value = clean_search_value(value, column, search);
        }
    }
    Ok(())
}

/// Keeps region codes found in the valid-code list; everything else becomes
/// missing.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if a region column is absent.
pub fn clean_regions(records: &mut RecordSet, config: &PipelineConfig) -> Result<(), CleanError> {
    let valid = config.region.valid_codes();
    for column in &config.region.columns {
        for value in records.require_mut(column)? {
            *value = match normalize_value(value) {
                Value::Text(code) if valid.contains(code.as_str()) => Value::Text(code),
                _ => Value::Missing,
            };
        }
    }
    Ok(())
}

/// Keeps letters only, drops leading mask characters (`"XXROCKVILLE"`), and
/// turns cities seen no more than the cutoff into missing.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if the driver-city column is absent.
pub fn clean_driver_city(
    records: &mut RecordSet,
    config: &PipelineConfig,
) -> Result<(), CleanError> {
    let mask = config.city.mask_char;
    let values = records.require_mut(&config.columns.driver_city)?;
    for value in values.iter_mut() {
        *value = match strip_matches(&normalize_value(value), &NON_ALPHA_RE) {
            Value::Text(city) => non_empty(city.trim_start_matches(mask).to_string()),
            other => other,
        };
    }

    let table = FrequencyTable::from_values(values);
    let collapsed = collapse_long_tail(
        values,
        &table,
        config.frequency.city_min_count,
        &Value::Missing,
    );
    log::debug!("Dropped {collapsed} rare driver cities");
    Ok(())
}

/// Normalizes the catch-all columns, applying per-column missing markers
/// and value rewrites.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if a column is absent.
pub fn clean_categoricals(
    records: &mut RecordSet,
    config: &PipelineConfig,
) -> Result<(), CleanError> {
    let categorical = &config.categorical;
    for column in &categorical.columns {
        let missing_markers = categorical.missing_values.get(column);
        let rewrites = categorical.rewrites.get(column);
        for value in records.require_mut(column)? {
            let cleaned = match normalize_value(value) {
                Value::Text(s) if missing_markers.is_some_and(|m| m.contains(&s)) => {
                    Value::Missing
                }
                other => other,
            };
            *value = rewrite(cleaned, rewrites);
        }
    }
    Ok(())
}
