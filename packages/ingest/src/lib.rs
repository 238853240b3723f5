#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! End-to-end run driver for the traffic-violations pipeline.
//!
//! A run reads the raw CSV, passes the records through every cleaning stage
//! in order, optionally writes the cleaned table back out as CSV, and
//! bulk-loads it into `DuckDB`. Nothing is persisted until every stage has
//! succeeded.

pub mod csv_io;

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use traffic_violations_clean::progress::ProgressCallback;
use traffic_violations_clean::{CleanError, run_stages};
use traffic_violations_database::{DbError, paths, sink};
use traffic_violations_lookup::{ConfigError, PipelineConfig, default_config, load_config};
use traffic_violations_record_models::RecordError;

pub use csv_io::{load_csv, save_csv};

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// CSV parse or write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The record set became inconsistent.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// A cleaning stage failed.
    #[error(transparent)]
    Clean(#[from] CleanError),

    /// Loading into the database failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The input has no header row.
    #[error("CSV file contains no header row")]
    NoHeader,

    /// The input lacks columns the pipeline reads.
    #[error("Input is missing required columns: {missing:?}")]
    MissingColumns {
        /// Column names not found in the header.
        missing: Vec<String>,
    },
}

/// What a run should read and where its output goes.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Raw CSV to clean.
    pub input: PathBuf,
    /// Alternative pipeline config; the embedded default when `None`.
    pub config: Option<PathBuf>,
    /// Database file; see [`paths::resolve_db_path`].
    pub db: Option<PathBuf>,
    /// Destination table; the config's sink table when `None`.
    pub table: Option<String>,
    /// Also write the cleaned table here.
    pub output_csv: Option<PathBuf>,
    /// Clean (and export) without touching the database.
    pub skip_load: bool,
}

/// Row counts from a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Raw rows read.
    pub rows_read: usize,
    /// Rows left after merging duplicates.
    pub rows_cleaned: usize,
    /// Rows appended to the database (zero when loading was skipped).
    pub rows_loaded: u64,
}

fn resolve_config(options: &RunOptions) -> Result<Cow<'static, PipelineConfig>, IngestError> {
    Ok(match &options.config {
        Some(path) => Cow::Owned(load_config(path)?),
        None => Cow::Borrowed(default_config()),
    })
}

/// Runs the whole pipeline once.
///
/// `today` bounds the date-of-stop check.
///
/// # Errors
///
/// Returns [`IngestError`] on any structural failure: unreadable input or
/// config, missing columns, schema enforcement, or the database load. Row
/// level problems never fail a run.
pub fn run(
    options: &RunOptions,
    today: NaiveDate,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<RunReport, IngestError> {
    let config = resolve_config(options)?;

    let records = load_csv(&options.input, &config)?;
    let rows_read = records.len();

    let cleaned = run_stages(records, &config, today, progress)?;
    let rows_cleaned = cleaned.len();
    log::info!("Cleaned {rows_read} raw rows into {rows_cleaned} records");

    if let Some(path) = &options.output_csv {
        save_csv(path, &cleaned)?;
    }

    let rows_loaded = if options.skip_load {
        log::info!("Skipping database load");
        0
    } else {
        let db_path = paths::resolve_db_path(options.db.as_deref());
        let conn = sink::open(&db_path)?;
        let table = options.table.as_deref().unwrap_or(&config.sink.table);
        sink::append_records(&conn, table, &cleaned, &config.schema)?
    };

    log::info!("Pipeline complete");
    Ok(RunReport {
        rows_read,
        rows_cleaned,
        rows_loaded,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::Path;

    use traffic_violations_clean::progress::null_progress;
    use traffic_violations_database::queries;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn write_input(dir: &Path, rows: &[&[(&str, &str)]]) -> PathBuf {
        let headers = default_config().required_columns();
        let mut lines = vec![headers.join(",")];
        for row in rows {
            let cells: BTreeMap<&str, &str> = row.iter().copied().collect();
            lines.push(
                headers
                    .iter()
                    .map(|h| cells.get(h).copied().unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join(","),
            );
        }
        let path = dir.join("violations.csv");
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    const SAMPLE_ROWS: &[&[(&str, &str)]] = &[
        &[
            ("SeqID", "a1"),
            ("Description", "speeding"),
            ("Charge", "21-801"),
            ("Date Of Stop", "05/01/2020"),
            ("Time Of Stop", "08:15:00"),
            ("Latitude", "39.05"),
            ("Longitude", "-77.1"),
            ("Accident", "Yes"),
            ("State", "MD"),
        ],
        &[
            ("SeqID", "a1"),
            ("Description", "no seatbelt"),
            ("Charge", "22-412"),
            ("Date Of Stop", "05/01/2020"),
            ("Time Of Stop", "08:15:00"),
        ],
        &[("SeqID", "b2"), ("Description", "failure to stop"), ("Latitude", "0")],
    ];

    #[test]
    fn run_cleans_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), SAMPLE_ROWS);
        let db = dir.path().join("db").join("test.duckdb");
        let options = RunOptions {
            input,
            db: Some(db.clone()),
            table: Some("stops".to_string()),
            output_csv: Some(dir.path().join("clean.csv")),
            ..RunOptions::default()
        };

        let report = run(&options, today(), &null_progress()).unwrap();
        assert_eq!(
            report,
            RunReport {
                rows_read: 3,
                rows_cleaned: 2,
                rows_loaded: 2,
            }
        );

        let conn = sink::open(&db).unwrap();
        assert_eq!(queries::count_rows(&conn, "stops").unwrap(), 2);
        let summary = queries::summary(&conn, "stops").unwrap();
        assert_eq!(summary.accident_related, 1);

        let exported = std::fs::read_to_string(dir.path().join("clean.csv")).unwrap();
        assert!(exported.contains("SPEEDING | NO SEATBELT"));
    }

    #[test]
    fn skip_load_leaves_database_alone() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("never.duckdb");
        let options = RunOptions {
            input: write_input(dir.path(), SAMPLE_ROWS),
            db: Some(db.clone()),
            skip_load: true,
            ..RunOptions::default()
        };

        let report = run(&options, today(), &null_progress()).unwrap();
        assert_eq!(report.rows_loaded, 0);
        assert!(!db.exists());
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let options = RunOptions {
            input: PathBuf::from("/nonexistent/violations.csv"),
            skip_load: true,
            ..RunOptions::default()
        };
        assert!(matches!(
            run(&options, today(), &null_progress()),
            Err(IngestError::Io(_))
        ));
    }

    #[test]
    fn custom_config_renames_sink_table() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("pipeline.toml");
        let toml = std::fs::read_to_string(
            Path::new(env!("CARGO_MANIFEST_DIR")).join("../lookup/config/pipeline.toml"),
        )
        .unwrap()
        .replace("table = \"traffic_violations\"", "table = \"custom_stops\"");
        std::fs::write(&config_path, toml).unwrap();

        let db = dir.path().join("custom.duckdb");
        let options = RunOptions {
            input: write_input(dir.path(), SAMPLE_ROWS),
            config: Some(config_path),
            db: Some(db.clone()),
            ..RunOptions::default()
        };
        run(&options, today(), &null_progress()).unwrap();

        let conn = sink::open(&db).unwrap();
        assert_eq!(queries::count_rows(&conn, "custom_stops").unwrap(), 2);
    }
}
