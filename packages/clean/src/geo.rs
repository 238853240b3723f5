//! Coordinate validation and the derived geolocation pair.

use traffic_violations_lookup::PipelineConfig;
use traffic_violations_lookup::config::GeoConfig;
use traffic_violations_record_models::{Geolocation, RecordSet, Value};

use crate::CleanError;
use crate::normalize::parse_number;

/// Rounds `x` to `precision` decimal places.
#[must_use]
pub fn round_to(x: f64, precision: i32) -> f64 {
    let factor = 10_f64.powi(precision);
    (x * factor).round() / factor
}

/// Parses, rounds, and range-checks one coordinate. Zero is treated as the
/// "not recorded" placeholder and rejected.
#[must_use]
pub fn clean_coordinate(value: &Value, min: f64, max: f64, precision: i32) -> Option<f64> {
    let raw = parse_number(value)?;
    if raw == 0.0 {
        return None;
    }
    let rounded = round_to(raw, precision);
    (min..=max).contains(&rounded).then_some(rounded)
}

fn clean_axis(values: &[Value], min: f64, max: f64, precision: i32) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| clean_coordinate(v, min, max, precision))
        .collect()
}

fn to_values(coords: &[Option<f64>]) -> Vec<Value> {
    coords
        .iter()
        .map(|c| c.map_or(Value::Missing, Value::Float))
        .collect()
}

/// Cleans latitude and longitude independently, then writes the geolocation
/// pair for records where both survived.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if a coordinate column is absent.
pub fn clean_coordinates(
    records: &mut RecordSet,
    config: &PipelineConfig,
) -> Result<(), CleanError> {
    let columns = &config.columns;
    let GeoConfig {
        latitude_min,
        latitude_max,
        longitude_min,
        longitude_max,
        precision,
    } = config.geo;

    let latitudes = clean_axis(
        records.require(&columns.latitude)?,
        latitude_min,
        latitude_max,
        precision,
    );
    let longitudes = clean_axis(
        records.require(&columns.longitude)?,
        longitude_min,
        longitude_max,
        precision,
    );

    let points: Vec<Value> = latitudes
        .iter()
        .zip(&longitudes)
        .map(|pair| match pair {
            (Some(lat), Some(lon)) => Value::Point(Geolocation::new(*lat, *lon)),
            _ => Value::Missing,
        })
        .collect();

    let located = points.iter().filter(|p| !p.is_missing()).count();
    log::debug!("{located} of {} records have valid coordinates", records.len());

    records.set_column(&columns.latitude, to_values(&latitudes))?;
    records.set_column(&columns.longitude, to_values(&longitudes))?;
    records.set_column(&columns.geolocation, points)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use traffic_violations_lookup::default_config;

    use super::*;

    fn coords(pairs: &[(&str, &str)]) -> RecordSet {
        RecordSet::from_rows(
            vec!["Latitude".to_string(), "Longitude".to_string()],
            pairs
                .iter()
                .map(|(lat, lon)| vec![Value::text(*lat), Value::text(*lon)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn rounds_to_six_places() {
        assert!((round_to(39.123_456_789, 6) - 39.123_457).abs() < 1e-12);
    }

    #[test]
    fn rejects_zero_and_out_of_range() {
        assert_eq!(clean_coordinate(&Value::text("0"), -90.0, 90.0, 6), None);
        assert_eq!(clean_coordinate(&Value::text("95.0"), 18.9, 71.5, 6), None);
        assert_eq!(clean_coordinate(&Value::text("x"), 18.9, 71.5, 6), None);
        assert_eq!(
            clean_coordinate(&Value::text("39.05"), 18.9, 71.5, 6),
            Some(39.05)
        );
    }

    #[test]
    fn keeps_surviving_axis_when_other_fails() {
        let mut records = coords(&[("39.05", "-77.1"), ("39.05", "0"), ("5.0", "-77.1")]);
        clean_coordinates(&mut records, default_config()).unwrap();

        assert_eq!(
            records.column("Latitude").unwrap(),
            &[Value::Float(39.05), Value::Float(39.05), Value::Missing]
        );
        assert_eq!(
            records.column("Longitude").unwrap(),
            &[Value::Float(-77.1), Value::Missing, Value::Float(-77.1)]
        );
        assert_eq!(
            records.column("Geolocation").unwrap(),
            &[
                Value::Point(Geolocation::new(39.05, -77.1)),
                Value::Missing,
                Value::Missing,
            ]
        );
    }

    #[test]
    fn rerun_leaves_coordinates_unchanged() {
        let mut records = coords(&[("39.0512345678", "-77.1")]);
        clean_coordinates(&mut records, default_config()).unwrap();
        let once = records.clone();
        clean_coordinates(&mut records, default_config()).unwrap();
        assert_eq!(records, once);
    }
}
