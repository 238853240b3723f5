//! Ordered stage driver.
//!
//! Stages run strictly in [`Stage::ALL`] order; no stage reads a column that
//! a later stage produces. The whole record set is owned by the driver for
//! the duration of the run and handed back only once every stage succeeded.

use std::sync::Arc;

use chrono::NaiveDate;
use traffic_violations_lookup::PipelineConfig;
use traffic_violations_record_models::RecordSet;

use crate::progress::ProgressCallback;
use crate::{CleanError, categorical, dedup, flags, geo, schema, temporal, vehicle};

/// One cleaning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    MergeDuplicates,
    DateOfStop,
    TimeOfStop,
    Agency,
    Location,
    Coordinates,
    BooleanFlags,
    SearchFields,
    RegionCodes,
    VehicleType,
    Year,
    Make,
    Model,
    Color,
    DriverCity,
    Categoricals,
    Schema,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: &[Self] = &[
        Self::MergeDuplicates,
        Self::DateOfStop,
        Self::TimeOfStop,
        Self::Agency,
        Self::Location,
        Self::Coordinates,
        Self::BooleanFlags,
        Self::SearchFields,
        Self::RegionCodes,
        Self::VehicleType,
        Self::Year,
        Self::Make,
        Self::Model,
        Self::Color,
        Self::DriverCity,
        Self::Categoricals,
        Self::Schema,
    ];

    /// Human-readable label used in logs and progress output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MergeDuplicates => "Merging duplicate records",
            Self::DateOfStop => "Cleaning date of stop",
            Self::TimeOfStop => "Cleaning time of stop and timestamp",
            Self::Agency => "Cleaning agency columns",
            Self::Location => "Cleaning location",
            Self::Coordinates => "Cleaning coordinates",
            Self::BooleanFlags => "Cleaning boolean flags",
            Self::SearchFields => "Cleaning search columns",
            Self::RegionCodes => "Cleaning region codes",
            Self::VehicleType => "Splitting vehicle type",
            Self::Year => "Cleaning vehicle year",
            Self::Make => "Cleaning vehicle make",
            Self::Model => "Cleaning vehicle model",
            Self::Color => "Cleaning vehicle color",
            Self::DriverCity => "Cleaning driver city",
            Self::Categoricals => "Cleaning categorical columns",
            Self::Schema => "Enforcing column types",
        }
    }

    fn apply(
        self,
        mut records: RecordSet,
        config: &PipelineConfig,
        today: NaiveDate,
    ) -> Result<RecordSet, CleanError> {
        match self {
            Self::MergeDuplicates => return dedup::merge_duplicates(records, config),
            Self::DateOfStop => temporal::clean_date_of_stop(&mut records, config, today)?,
            Self::TimeOfStop => temporal::clean_time_of_stop(&mut records, config)?,
            Self::Agency => categorical::clean_agency(&mut records, config)?,
            Self::Location => categorical::clean_location(&mut records, config)?,
            Self::Coordinates => geo::clean_coordinates(&mut records, config)?,
            Self::BooleanFlags => flags::clean_flags(&mut records, config)?,
            Self::SearchFields => categorical::clean_search(&mut records, config)?,
            Self::RegionCodes => categorical::clean_regions(&mut records, config)?,
            Self::VehicleType => vehicle::clean_vehicle_type(&mut records, config)?,
            Self::Year => vehicle::clean_year(&mut records, config)?,
            Self::Make => vehicle::clean_make(&mut records, config)?,
            Self::Model => vehicle::clean_model(&mut records, config)?,
            Self::Color => vehicle::clean_color(&mut records, config)?,
            Self::DriverCity => categorical::clean_driver_city(&mut records, config)?,
            Self::Categoricals => categorical::clean_categoricals(&mut records, config)?,
            Self::Schema => schema::enforce_schema(&mut records, &config.schema)?,
        }
        Ok(records)
    }
}

/// Runs every stage over `records`.
///
/// `today` bounds date-of-stop validation; callers pass the local date so
/// runs are reproducible in tests.
///
/// # Errors
///
/// Returns [`CleanError`] if a required column is missing or schema
/// enforcement fails. Row-level problems never error; they become missing
/// values.
pub fn run_stages(
    records: RecordSet,
    config: &PipelineConfig,
    today: NaiveDate,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<RecordSet, CleanError> {
    progress.set_total(Stage::ALL.len() as u64);

    let mut records = records;
    for stage in Stage::ALL {
        log::info!("{}...", stage.label());
        progress.set_message(stage.label().to_string());
        records = stage.apply(records, config, today)?;
        progress.inc(1);
    }

    progress.finish(format!("Cleaned {} records", records.len()));
    Ok(records)
}
