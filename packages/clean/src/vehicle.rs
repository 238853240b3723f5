//! Vehicle columns: composite type split, model year, make, model, color.

use traffic_violations_lookup::PipelineConfig;
use traffic_violations_record_models::{RecordSet, Value};

use crate::CleanError;
use crate::frequency::{FrequencyTable, collapse_long_tail};
use crate::normalize::{
    NON_ALNUM_SPACE_RE, NON_ALPHA_RE, non_empty, normalize_value, parse_number, strip_matches,
};

/// Separator between vehicle code and category (`"02 - AUTOMOBILE"`).
const VEHICLE_TYPE_SEPARATOR: &str = " - ";

/// Splits a normalized composite vehicle type into code and category.
///
/// At most one split is made, so further separators stay in the category.
/// Without a separator the whole string is the code and the category is
/// missing.
#[must_use]
pub fn split_vehicle_type(value: &Value) -> (Value, Value) {
    let Value::Text(raw) = normalize_value(value) else {
        return (Value::Missing, Value::Missing);
    };
    match raw.split_once(VEHICLE_TYPE_SEPARATOR) {
        Some((code, category)) => (
            non_empty(code.to_string()),
            non_empty(category.to_string()),
        ),
        None => (Value::Text(raw), Value::Missing),
    }
}

/// Writes the derived vehicle code and category columns. The raw vehicle
/// type column is left as read.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if the vehicle type column is absent.
pub fn clean_vehicle_type(
    records: &mut RecordSet,
    config: &PipelineConfig,
) -> Result<(), CleanError> {
    let columns = &config.columns;
    let (codes, categories): (Vec<Value>, Vec<Value>) = records
        .require(&columns.vehicle_type)?
        .iter()
        .map(split_vehicle_type)
        .unzip();
    records.set_column(&columns.vehicle_code, codes)?;
    records.set_column(&columns.vehicle_category, categories)?;
    Ok(())
}

/// Parses a model year and applies inclusive bounds. Whole numbers become
/// integers; fractional ones stay floats so schema enforcement can refuse
/// them.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn clean_year_value(value: &Value, min: i64, max: i64) -> Value {
    let Some(year) = parse_number(value) else {
        return Value::Missing;
    };
    if year < min as f64 || year > max as f64 {
        return Value::Missing;
    }
    if year.fract() == 0.0 {
        Value::Int(year as i64)
    } else {
        Value::Float(year)
    }
}

/// Applies [`clean_year_value`] to the year column.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if the year column is absent.
pub fn clean_year(records: &mut RecordSet, config: &PipelineConfig) -> Result<(), CleanError> {
    let bounds = config.year;
    for value in records.require_mut(&config.columns.year)? {
        *value = clean_year_value(value, bounds.min, bounds.max);
    }
    Ok(())
}

/// Normalizes makes to letters only, applies the correction table, then
/// collapses makes seen no more than the cutoff (and missing makes) into the
/// fallback category.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if the make column is absent.
pub fn clean_make(records: &mut RecordSet, config: &PipelineConfig) -> Result<(), CleanError> {
    let values = records.require_mut(&config.columns.make)?;
    for value in values.iter_mut() {
        let letters = strip_matches(&normalize_value(value), &NON_ALPHA_RE);
        *value = match letters {
            Value::Text(make) => config
                .make_corrections
                .get(&make)
                .map_or(Value::Text(make), |canonical| Value::text(canonical)),
            other => other,
        };
    }

    let table = FrequencyTable::from_values(values);
    let frequency = &config.frequency;
    let collapsed = collapse_long_tail(
        values,
        &table,
        frequency.make_min_count,
        &Value::text(&frequency.make_fallback),
    );
    log::debug!(
        "Collapsed {collapsed} makes into {} ({} distinct before)",
        frequency.make_fallback,
        table.len()
    );
    Ok(())
}

/// Keeps letters, digits, and spaces, drops leading zeros, then turns models
/// seen no more than the cutoff into missing.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if the model column is absent.
pub fn clean_model(records: &mut RecordSet, config: &PipelineConfig) -> Result<(), CleanError> {
    let values = records.require_mut(&config.columns.model)?;
    for value in values.iter_mut() {
        *value = match strip_matches(&normalize_value(value), &NON_ALNUM_SPACE_RE) {
            Value::Text(model) => {
                let model = model.trim_start_matches('0');
                if model.is_empty() || model == "NONE" {
                    Value::Missing
                } else {
                    Value::text(model)
                }
            }
            other => other,
        };
    }

    let table = FrequencyTable::from_values(values);
    let collapsed = collapse_long_tail(
        values,
        &table,
        config.frequency.model_min_count,
        &Value::Missing,
    );
    log::debug!("Dropped {collapsed} rare models");
    Ok(())
}

/// Rewrites verbose raw colors to their short form. Unmapped colors are
/// kept exactly as read.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if the color column is absent.
pub fn clean_color(records: &mut RecordSet, config: &PipelineConfig) -> Result<(), CleanError> {
    for value in records.require_mut(&config.columns.color)? {
        if let Some(raw) = value.as_text()
            && let Some(short) = config.color_map.get(raw)
        {
            *value = Value::text(short);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use traffic_violations_lookup::default_config;

    use super::*;

    fn single(name: &str, values: Vec<Value>) -> RecordSet {
        RecordSet::from_rows(
            vec![name.to_string()],
            values.into_iter().map(|v| vec![v]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn splits_vehicle_type_once() {
        assert_eq!(
            split_vehicle_type(&Value::text("02 - Automobile")),
            (Value::text("02"), Value::text("AUTOMOBILE"))
        );
        assert_eq!(
            split_vehicle_type(&Value::text("29 - Unknown - Other")),
            (Value::text("29"), Value::text("UNKNOWN - OTHER"))
        );
        assert_eq!(
            split_vehicle_type(&Value::text("Moped")),
            (Value::text("MOPED"), Value::Missing)
        );
        assert_eq!(
            split_vehicle_type(&Value::Missing),
            (Value::Missing, Value::Missing)
        );
    }

    #[test]
    fn vehicle_type_adds_derived_columns() {
        let mut records = single("VehicleType", vec![Value::text("05 - Light Duty Truck")]);
        clean_vehicle_type(&mut records, default_config()).unwrap();
        assert_eq!(records.column("Vehicle Code").unwrap(), &[Value::text("05")]);
        assert_eq!(
            records.column("Vehicle Category").unwrap(),
            &[Value::text("LIGHT DUTY TRUCK")]
        );
        assert_eq!(
            records.column("VehicleType").unwrap(),
            &[Value::text("05 - Light Duty Truck")]
        );
    }

    #[test]
    fn year_bounds_are_inclusive() {
        let year = |raw: &str| clean_year_value(&Value::text(raw), 1960, 2025);
        assert_eq!(year("1959"), Value::Missing);
        assert_eq!(year("1960"), Value::Int(1960));
        assert_eq!(year("2025"), Value::Int(2025));
        assert_eq!(year("2026"), Value::Missing);
        assert_eq!(year("2004.0"), Value::Int(2004));
        assert_eq!(year("2004.5"), Value::Float(2004.5));
        assert_eq!(year("unknown"), Value::Missing);
    }

    #[test]
    fn make_corrections_apply_before_collapsing() {
        let mut values = vec![Value::text("toyt"); 150];
        values.extend(vec![Value::text("Toyota"); 60]);
        values.extend(vec![Value::text("FORD"); 200]);
        values.push(Value::Missing);
        values.push(Value::text("F0RD!"));
        let mut records = single("Make", values);

        clean_make(&mut records, default_config()).unwrap();
        let makes = records.column("Make").unwrap();

        assert_eq!(makes[0], Value::text("TOYOTA"));
        assert_eq!(makes[150], Value::text("TOYOTA"));
        assert_eq!(makes[210], Value::text("OTHER"));
        assert_eq!(makes[410], Value::text("OTHER"));
        assert_eq!(makes[411], Value::text("OTHER"));
    }

    #[test]
    fn models_lose_punctuation_and_leading_zeros() {
        let mut values = vec![Value::text("4s"); 51];
        values.extend(vec![Value::text("004S"); 10]);
        values.push(Value::text("none"));
        values.push(Value::text("rare-1"));
        let mut records = single("Model", values);

        clean_model(&mut records, default_config()).unwrap();
        let models = records.column("Model").unwrap();

        assert_eq!(models[0], Value::text("4S"));
        assert_eq!(models[51], Value::text("4S"));
        assert_eq!(models[61], Value::Missing);
        assert_eq!(models[62], Value::Missing);
    }

    #[test]
    fn colors_map_verbose_values_only() {
        let config = default_config();
        let (verbose, short) = config.color_map.iter().next().unwrap();
        let mut records = single(
            "Color",
            vec![Value::text(verbose.as_str()), Value::text("PURPLE"), Value::Missing],
        );
        clean_color(&mut records, config).unwrap();
        assert_eq!(
            records.column("Color").unwrap(),
            &[Value::text(short.as_str()), Value::text("PURPLE"), Value::Missing]
        );
    }
}
