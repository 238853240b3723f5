//! Config-driven pipeline definition.
//!
//! [`PipelineConfig`] captures every column name, column group, threshold,
//! and lookup table the cleaning stages consult. Stage code never hard-codes
//! any of these; it reads them from the config it is handed.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use traffic_violations_record_models::ColumnType;

use crate::ConfigError;

// ── Top-level config ─────────────────────────────────────────────────────

/// Complete static configuration for one pipeline run.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Names of the single-purpose columns.
    pub columns: ColumnNames,
    /// Duplicate-merge settings.
    pub dedup: DedupConfig,
    /// Date-of-stop validation.
    pub temporal: TemporalConfig,
    /// Coordinate bounds and rounding.
    pub geo: GeoConfig,
    /// Vehicle model-year bounds.
    pub year: YearConfig,
    /// Long-tail frequency cutoffs.
    pub frequency: FrequencyConfig,
    /// Driver-city cleaning.
    pub city: CityConfig,
    /// Location text rewrites.
    #[serde(default)]
    pub location: LocationConfig,
    /// Tri-state flag columns.
    pub boolean: BooleanConfig,
    /// Search-related columns.
    pub search: SearchConfig,
    /// Region-code columns and the valid code list.
    pub region: RegionConfig,
    /// Remaining categorical columns.
    pub categorical: CategoricalConfig,
    /// Misspelled/variant make → canonical make.
    pub make_corrections: BTreeMap<String, String>,
    /// Verbose raw color → canonical short color.
    pub color_map: BTreeMap<String, String>,
    /// Declared target type per column.
    pub schema: BTreeMap<String, ColumnType>,
    /// Sink settings.
    pub sink: SinkConfig,
}

/// Source header names for every column that a single stage owns.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnNames {
    /// Deduplication key.
    pub id: String,
    /// Free-text description merged across duplicates.
    pub description: String,
    /// Free-text charge merged across duplicates.
    pub charge: String,
    /// Calendar date of the stop.
    pub date_of_stop: String,
    /// Time of day of the stop.
    pub time_of_stop: String,
    /// Derived date + time column.
    pub timestamp: String,
    /// Agency name.
    pub agency: String,
    /// Sub-agency name.
    pub sub_agency: String,
    /// Location description.
    pub location: String,
    /// Latitude.
    pub latitude: String,
    /// Longitude.
    pub longitude: String,
    /// Derived coordinate pair.
    pub geolocation: String,
    /// Raw composite vehicle type (`"02 - Automobile"`).
    pub vehicle_type: String,
    /// Derived vehicle code (`"02"`).
    pub vehicle_code: String,
    /// Derived vehicle category (`"AUTOMOBILE"`).
    pub vehicle_category: String,
    /// Vehicle model year.
    pub year: String,
    /// Vehicle make.
    pub make: String,
    /// Vehicle model.
    pub model: String,
    /// Vehicle color.
    pub color: String,
    /// Driver's home city.
    pub driver_city: String,
}

/// How duplicate records are merged.
#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    /// Separator between distinct descriptions.
    pub description_separator: String,
    /// Separator between distinct charges.
    pub charge_separator: String,
    /// Characters stripped from the start of each description.
    #[serde(default)]
    pub description_leading_strip: String,
}

/// Date-of-stop acceptance window.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TemporalConfig {
    /// Earliest accepted year; the latest is the current year.
    pub min_year: i32,
}

/// Coordinate acceptance box and rounding.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GeoConfig {
    /// Southern bound (inclusive).
    pub latitude_min: f64,
    /// Northern bound (inclusive).
    pub latitude_max: f64,
    /// Western bound (inclusive).
    pub longitude_min: f64,
    /// Eastern bound (inclusive).
    pub longitude_max: f64,
    /// Decimal places kept after rounding.
    pub precision: i32,
}

/// Inclusive model-year bounds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct YearConfig {
    /// Oldest accepted year.
    pub min: i64,
    /// Newest accepted year.
    pub max: i64,
}

/// Long-tail cutoffs. A value survives only when its count is strictly
/// greater than the cutoff.
#[derive(Debug, Clone, Deserialize)]
pub struct FrequencyConfig {
    /// Cutoff for makes.
    pub make_min_count: usize,
    /// Category that unpopular makes collapse into.
    pub make_fallback: String,
    /// Cutoff for models (unpopular models become missing).
    pub model_min_count: usize,
    /// Cutoff for driver cities (unpopular cities become missing).
    pub city_min_count: usize,
}

/// Driver-city settings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CityConfig {
    /// Placeholder character stripped from the start of city names.
    pub mask_char: char,
}

/// Location settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationConfig {
    /// Substring replacements applied after normalization.
    #[serde(default)]
    pub replacements: BTreeMap<String, String>,
}

/// Tri-state flag settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BooleanConfig {
    /// Flag columns.
    pub columns: Vec<String>,
    /// Normalized tokens meaning `true`.
    pub truthy: BTreeSet<String>,
    /// Normalized tokens meaning `false`.
    pub falsy: BTreeSet<String>,
    /// Whether an empty/missing raw value counts as `false`.
    #[serde(default)]
    pub missing_is_false: bool,
}

/// Search-column settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Search columns.
    pub columns: Vec<String>,
    /// Tokens rewritten to [`Self::na_value`].
    pub na_tokens: BTreeSet<String>,
    /// Literal "not applicable" value (not a null).
    pub na_value: String,
    /// Columns whose values lose trailing hyphens.
    #[serde(default)]
    pub strip_trailing_hyphen: BTreeSet<String>,
    /// Per-column exact-value rewrites.
    #[serde(default)]
    pub rewrites: BTreeMap<String, BTreeMap<String, String>>,
}

/// Region-code settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionConfig {
    /// Region-code columns.
    pub columns: Vec<String>,
    /// US state codes.
    pub us_states: Vec<String>,
    /// US territory codes.
    #[serde(default)]
    pub us_territories: Vec<String>,
    /// Canadian province codes.
    #[serde(default)]
    pub canadian_provinces: Vec<String>,
    /// Canadian territory codes.
    #[serde(default)]
    pub canadian_territories: Vec<String>,
}

impl RegionConfig {
    /// All recognized region codes.
    #[must_use]
    pub fn valid_codes(&self) -> BTreeSet<&str> {
        self.us_states
            .iter()
            .chain(&self.us_territories)
            .chain(&self.canadian_provinces)
            .chain(&self.canadian_territories)
            .map(String::as_str)
            .collect()
    }
}

/// Catch-all categorical settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoricalConfig {
    /// Columns.
    pub columns: Vec<String>,
    /// Per-column values that mean "missing".
    #[serde(default)]
    pub missing_values: BTreeMap<String, BTreeSet<String>>,
    /// Per-column exact-value rewrites.
    #[serde(default)]
    pub rewrites: BTreeMap<String, BTreeMap<String, String>>,
}

/// Sink settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    /// Destination table name.
    pub table: String,
}

// ── Validation ───────────────────────────────────────────────────────────

impl PipelineConfig {
    /// Checks bound ordering, separators, and column groups.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        if self.geo.latitude_min > self.geo.latitude_max {
            return invalid(format!(
                "geo.latitude_min ({}) exceeds geo.latitude_max ({})",
                self.geo.latitude_min, self.geo.latitude_max
            ));
        }
        if self.geo.longitude_min > self.geo.longitude_max {
            return invalid(format!(
                "geo.longitude_min ({}) exceeds geo.longitude_max ({})",
                self.geo.longitude_min, self.geo.longitude_max
            ));
        }
        if self.year.min > self.year.max {
            return invalid(format!(
                "year.min ({}) exceeds year.max ({})",
                self.year.min, self.year.max
            ));
        }
        if self.dedup.description_separator.is_empty() || self.dedup.charge_separator.is_empty() {
            return invalid("dedup separators must not be empty".to_string());
        }
        for (group, columns) in [
            ("boolean", &self.boolean.columns),
            ("search", &self.search.columns),
            ("region", &self.region.columns),
            ("categorical", &self.categorical.columns),
        ] {
            if columns.is_empty() {
                return invalid(format!("{group}.columns must not be empty"));
            }
        }
        if let Some(token) = self.boolean.truthy.intersection(&self.boolean.falsy).next() {
            return invalid(format!("boolean token '{token}' is both truthy and falsy"));
        }
        if self.sink.table.is_empty() {
            return invalid("sink.table must not be empty".to_string());
        }

        Ok(())
    }

    /// Every source column a run reads. Derived columns (timestamp, vehicle
    /// code/category) are excluded since the pipeline creates them.
    #[must_use]
    pub fn required_columns(&self) -> Vec<&str> {
        let c = &self.columns;
        let mut required: Vec<&str> = vec![
            c.id.as_str(),
            c.description.as_str(),
            c.charge.as_str(),
            c.date_of_stop.as_str(),
            c.time_of_stop.as_str(),
            c.agency.as_str(),
            c.sub_agency.as_str(),
            c.location.as_str(),
            c.latitude.as_str(),
            c.longitude.as_str(),
            c.vehicle_type.as_str(),
            c.year.as_str(),
            c.make.as_str(),
            c.model.as_str(),
            c.color.as_str(),
            c.driver_city.as_str(),
        ];
        for group in [
            &self.boolean.columns,
            &self.search.columns,
            &self.region.columns,
            &self.categorical.columns,
        ] {
            required.extend(group.iter().map(String::as_str));
        }
        required
    }
}
