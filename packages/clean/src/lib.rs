#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cleaning stages for traffic-violation records.
//!
//! Each stage is an independent pass over one column group of a
//! [`RecordSet`](traffic_violations_record_models::RecordSet), driven by the
//! thresholds and lookup tables in
//! [`PipelineConfig`](traffic_violations_lookup::PipelineConfig).
//! [`pipeline::run_stages`] runs them in their fixed order and finishes with
//! [`schema::enforce_schema`].
//!
//! Invalid cell values are never errors: they become
//! [`Value::Missing`](traffic_violations_record_models::Value::Missing).
//! Only structural problems (a missing column, an uncastable value at the
//! schema step) surface as [`CleanError`].

pub mod categorical;
pub mod dedup;
pub mod flags;
pub mod frequency;
pub mod geo;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod schema;
pub mod temporal;
pub mod vehicle;

use traffic_violations_record_models::RecordError;

pub use pipeline::{Stage, run_stages};
pub use schema::SchemaError;

/// Errors that abort a cleaning run.
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    /// The record set is missing a column or would become ragged.
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// Schema enforcement failed.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}
