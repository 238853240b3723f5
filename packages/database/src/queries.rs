//! Read-side queries over the loaded table.
//!
//! The map and summary queries read the sink names of the standard columns
//! (`latitude`, `location`, `make`, ...). Every table and column name is
//! checked with [`quote_identifier`] before it reaches SQL.

use chrono::NaiveDateTime;
use duckdb::Connection;
use traffic_violations_database_models::{BoundingBox, MapPoint, ValueCount, ViolationSummary};

use crate::{DbError, quote_identifier};

const LATITUDE: &str = "latitude";
const LONGITUDE: &str = "longitude";
const LOCATION: &str = "location";
const VIOLATION_TYPE: &str = "violation_type";
const DATE_OF_STOP: &str = "date_of_stop";
const ACCIDENT: &str = "accident";
const MAKE: &str = "make";
const MODEL: &str = "model";

fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

/// Parses `DuckDB`'s text rendering of a timestamp.
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Number of rows in `table`.
///
/// # Errors
///
/// Returns [`DbError`] if the name is invalid or the query fails.
pub fn count_rows(conn: &Connection, table: &str) -> Result<u64, DbError> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table)?);
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(to_count(count))
}

/// Distinct non-null values of one column, as text, sorted.
///
/// # Errors
///
/// Returns [`DbError`] if a name is invalid or the query fails.
pub fn distinct_values(
    conn: &Connection,
    table: &str,
    column: &str,
) -> Result<Vec<String>, DbError> {
    let column = quote_identifier(column)?;
    let sql = format!(
        "SELECT DISTINCT CAST({column} AS VARCHAR) AS v FROM {}
         WHERE {column} IS NOT NULL
         ORDER BY v",
        quote_identifier(table)?
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        values.push(row.get(0)?);
    }
    Ok(values)
}

/// The `limit` most frequent non-null values of one column, most frequent
/// first (ties broken alphabetically).
///
/// # Errors
///
/// Returns [`DbError`] if a name is invalid or the query fails.
pub fn count_by(
    conn: &Connection,
    table: &str,
    column: &str,
    limit: u32,
) -> Result<Vec<ValueCount>, DbError> {
    let column = quote_identifier(column)?;
    let sql = format!(
        "SELECT CAST({column} AS VARCHAR) AS v, COUNT(*) AS n FROM {}
         WHERE {column} IS NOT NULL
         GROUP BY v
         ORDER BY n DESC, v ASC
         LIMIT ?",
        quote_identifier(table)?
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([limit])?;

    let mut counts = Vec::new();
    while let Some(row) = rows.next()? {
        counts.push(ValueCount {
            value: row.get(0)?,
            count: to_count(row.get(1)?),
        });
    }
    Ok(counts)
}

/// Located violations inside `bbox`, most recent first.
///
/// # Errors
///
/// Returns [`DbError`] if the table name is invalid or the query fails.
pub fn points_in_bbox(
    conn: &Connection,
    table: &str,
    bbox: &BoundingBox,
    limit: u32,
) -> Result<Vec<MapPoint>, DbError> {
    let sql = format!(
        "SELECT {LATITUDE}, {LONGITUDE}, {LOCATION}, {VIOLATION_TYPE},
                CAST({DATE_OF_STOP} AS VARCHAR)
         FROM {}
         WHERE {LATITUDE} BETWEEN ? AND ?
           AND {LONGITUDE} BETWEEN ? AND ?
         ORDER BY {DATE_OF_STOP} DESC NULLS LAST
         LIMIT ?",
        quote_identifier(table)?
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(duckdb::params![
        bbox.south, bbox.north, bbox.west, bbox.east, limit
    ])?;

    let mut points = Vec::new();
    while let Some(row) = rows.next()? {
        let date: Option<String> = row.get(4)?;
        points.push(MapPoint {
            latitude: row.get(0)?,
            longitude: row.get(1)?,
            location: row.get(2)?,
            violation_type: row.get(3)?,
            date_of_stop: date.as_deref().and_then(parse_timestamp),
        });
    }
    Ok(points)
}

fn top_value(conn: &Connection, table: &str, column: &str) -> Result<Option<ValueCount>, DbError> {
    Ok(count_by(conn, table, column, 1)?.into_iter().next())
}

/// Headline numbers for the dashboard.
///
/// # Errors
///
/// Returns [`DbError`] if the table name is invalid or a query fails.
pub fn summary(conn: &Connection, table: &str) -> Result<ViolationSummary, DbError> {
    let sql = format!(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE {ACCIDENT}) FROM {}",
        quote_identifier(table)?
    );
    let (total, accident_related): (i64, i64) =
        conn.query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?)))?;

    Ok(ViolationSummary {
        total: to_count(total),
        accident_related: to_count(accident_related),
        top_location: top_value(conn, table, LOCATION)?,
        top_make: top_value(conn, table, MAKE)?,
        top_model: top_value(conn, table, MODEL)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE stops (
                latitude DOUBLE, longitude DOUBLE, location VARCHAR,
                violation_type VARCHAR, date_of_stop TIMESTAMP, accident BOOLEAN,
                make VARCHAR, model VARCHAR
            );
            INSERT INTO stops VALUES
                (39.10, -77.10, 'GEORGIA AVE / COLESVILLE RD', 'CITATION', '2020-05-01 00:00:00', TRUE, 'TOYOTA', 'CAMRY'),
                (39.20, -77.20, 'GEORGIA AVE / COLESVILLE RD', 'WARNING', '2021-06-01 00:00:00', FALSE, 'TOYOTA', 'COROLLA'),
                (38.00, -76.00, 'RT 355', 'CITATION', NULL, FALSE, 'HONDA', 'CAMRY'),
                (NULL, NULL, NULL, 'ESERO', NULL, NULL, NULL, NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn counts_rows() {
        assert_eq!(count_rows(&seeded(), "stops").unwrap(), 4);
    }

    #[test]
    fn lists_distinct_values_without_nulls() {
        let values = distinct_values(&seeded(), "stops", "make").unwrap();
        assert_eq!(values, vec!["HONDA", "TOYOTA"]);
    }

    #[test]
    fn counts_by_frequency_then_name() {
        let counts = count_by(&seeded(), "stops", "violation_type", 2).unwrap();
        assert_eq!(
            counts,
            vec![
                ValueCount {
                    value: "CITATION".to_string(),
                    count: 2
                },
                ValueCount {
                    value: "ESERO".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn filters_points_by_bbox() {
        let bbox = BoundingBox::new(-77.5, 39.0, -77.0, 39.5);
        let points = points_in_bbox(&seeded(), "stops", &bbox, 10).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].violation_type.as_deref(), Some("WARNING"));
        assert_eq!(
            points[0].date_of_stop,
            parse_timestamp("2021-06-01 00:00:00")
        );
        assert!(points.iter().all(|p| bbox.contains(p.latitude, p.longitude)));
    }

    #[test]
    fn summarizes_table() {
        let summary = summary(&seeded(), "stops").unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.accident_related, 1);
        assert_eq!(
            summary.top_location.map(|v| v.value).as_deref(),
            Some("GEORGIA AVE / COLESVILLE RD")
        );
        assert_eq!(summary.top_make.map(|v| v.count), Some(2));
        assert_eq!(summary.top_model.map(|v| v.value).as_deref(), Some("CAMRY"));
    }

    #[test]
    fn rejects_invalid_column() {
        assert!(matches!(
            count_by(&seeded(), "stops", "make) --", 5),
            Err(DbError::InvalidIdentifier { .. })
        ));
    }
}
