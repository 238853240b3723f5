#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Row types read back from the traffic-violations table.
//!
//! These are the shapes the dashboard and map views consume. They are
//! independent of the in-memory record model used while cleaning.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Returns `true` if the point lies inside the box (edges included).
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.south..=self.north).contains(&latitude) && (self.west..=self.east).contains(&longitude)
    }
}

/// One distinct value of a column and how many rows carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    /// The column value.
    pub value: String,
    /// Number of rows.
    pub count: u64,
}

/// A located violation, as plotted on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Location description.
    pub location: Option<String>,
    /// Violation type.
    pub violation_type: Option<String>,
    /// Date of the stop.
    pub date_of_stop: Option<NaiveDateTime>,
}

/// Headline numbers for the whole table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViolationSummary {
    /// Total violations.
    pub total: u64,
    /// Violations flagged as accident-related.
    pub accident_related: u64,
    /// Location with the most violations.
    pub top_location: Option<ValueCount>,
    /// Most common vehicle make.
    pub top_make: Option<ValueCount>,
    /// Most common vehicle model.
    pub top_model: Option<ValueCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_contains_edges() {
        let bbox = BoundingBox::new(-77.5, 38.9, -76.9, 39.4);
        assert!(bbox.contains(39.0, -77.1));
        assert!(bbox.contains(38.9, -77.5));
        assert!(!bbox.contains(40.0, -77.1));
        assert!(!bbox.contains(39.0, -76.0));
    }
}
