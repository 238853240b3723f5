#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the traffic-violations pipeline.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use traffic_violations_clean::Stage;
use traffic_violations_cli_utils::{IndicatifProgress, MultiProgress, init_logger};
use traffic_violations_database::{paths, queries, sink};
use traffic_violations_database_models::BoundingBox;
use traffic_violations_ingest::{RunOptions, run};
use traffic_violations_lookup::default_config;

#[derive(Parser)]
#[command(
    name = "traffic_violations",
    about = "Traffic violation cleaning pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw CSV export and load it into `DuckDB`
    Run {
        /// Raw CSV file
        #[arg(long)]
        input: PathBuf,
        /// Pipeline config TOML (defaults to the embedded config)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Database file (overrides `TRAFFIC_VIOLATIONS_DB`)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Destination table (defaults to the config's sink table)
        #[arg(long)]
        table: Option<String>,
        /// Also write the cleaned records to this CSV file
        #[arg(long)]
        output_csv: Option<PathBuf>,
        /// Clean without loading into the database
        #[arg(long)]
        skip_load: bool,
    },
    /// Print headline numbers for the loaded table
    Summary {
        /// Database file (overrides `TRAFFIC_VIOLATIONS_DB`)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Table to read
        #[arg(long)]
        table: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the most frequent values of a column
    Top {
        /// Sink column name (e.g. `make`, `violation_type`)
        column: String,
        /// Number of values to show
        #[arg(long, default_value = "10")]
        limit: u32,
        /// Database file (overrides `TRAFFIC_VIOLATIONS_DB`)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Table to read
        #[arg(long)]
        table: Option<String>,
    },
    /// List located violations inside a bounding box
    Bbox {
        /// Western longitude
        #[arg(long, allow_negative_numbers = true)]
        west: f64,
        /// Southern latitude
        #[arg(long, allow_negative_numbers = true)]
        south: f64,
        /// Eastern longitude
        #[arg(long, allow_negative_numbers = true)]
        east: f64,
        /// Northern latitude
        #[arg(long, allow_negative_numbers = true)]
        north: f64,
        /// Maximum points to list
        #[arg(long, default_value = "100")]
        limit: u32,
        /// Database file (overrides `TRAFFIC_VIOLATIONS_DB`)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Table to read
        #[arg(long)]
        table: Option<String>,
    },
}

fn table_or_default(table: Option<String>) -> String {
    table.unwrap_or_else(|| default_config().sink.table.clone())
}

fn open_db(db: Option<PathBuf>) -> Result<duckdb::Connection, Box<dyn std::error::Error>> {
    Ok(sink::open(&paths::resolve_db_path(db.as_deref()))?)
}

#[allow(clippy::too_many_lines)]
fn execute(command: Commands, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run {
            input,
            config,
            db,
            table,
            output_csv,
            skip_load,
        } => {
            let start = Instant::now();
            let options = RunOptions {
                input,
                config,
                db,
                table,
                output_csv,
                skip_load,
            };
            let progress =
                IndicatifProgress::steps_bar(multi, "Cleaning", Stage::ALL.len() as u64);
            let report = run(&options, chrono::Local::now().date_naive(), &progress)?;
            log::info!(
                "Done: {} raw rows, {} cleaned, {} loaded in {:.1}s",
                report.rows_read,
                report.rows_cleaned,
                report.rows_loaded,
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Summary { db, table, json } => {
            let conn = open_db(db)?;
            let summary = queries::summary(&conn, &table_or_default(table))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                let top = |v: Option<&traffic_violations_database_models::ValueCount>| {
                    v.map_or_else(|| "N/A".to_string(), |v| format!("{} ({})", v.value, v.count))
                };
                println!("Total violations:  {}", summary.total);
                println!("Accident related:  {}", summary.accident_related);
                println!("High-risk zone:    {}", top(summary.top_location.as_ref()));
                println!("Top vehicle make:  {}", top(summary.top_make.as_ref()));
                println!("Top vehicle model: {}", top(summary.top_model.as_ref()));
            }
        }
        Commands::Top {
            column,
            limit,
            db,
            table,
        } => {
            let conn = open_db(db)?;
            let counts = queries::count_by(&conn, &table_or_default(table), &column, limit)?;
            println!("{:<40} COUNT", column.to_uppercase());
            println!("{}", "-".repeat(50));
            for entry in &counts {
                println!("{:<40} {}", entry.value, entry.count);
            }
        }
        Commands::Bbox {
            west,
            south,
            east,
            north,
            limit,
            db,
            table,
        } => {
            let conn = open_db(db)?;
            let bbox = BoundingBox::new(west, south, east, north);
            let points = queries::points_in_bbox(&conn, &table_or_default(table), &bbox, limit)?;
            for point in &points {
                println!(
                    "{:>10.6} {:>11.6}  {:<12} {:<20} {}",
                    point.latitude,
                    point.longitude,
                    point
                        .date_of_stop
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default(),
                    point.violation_type.as_deref().unwrap_or(""),
                    point.location.as_deref().unwrap_or("")
                );
            }
            log::info!("{} points inside {bbox:?}", points.len());
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();

    if let Err(e) = execute(cli.command, &multi) {
        log::error!("{e}");
        return Err(e);
    }
    Ok(())
}
