//! Bulk load of a cleaned record set into `DuckDB`.
//!
//! The destination table is created on first load from the declared schema.
//! Later loads must present exactly the same column list. Rows are streamed
//! through the `DuckDB` appender, and the whole load (table creation
//! included) runs in one transaction, so a failure leaves nothing behind.

use std::collections::BTreeMap;
use std::path::Path;

use duckdb::types::{TimeUnit, Value as SqlValue};
use duckdb::{Connection, appender_params_from_iter};
use traffic_violations_record_models::{ColumnType, RecordSet, Value, sink_column_name};

use crate::{DbError, quote_identifier};

/// Opens (or creates) the database file, creating parent directories as
/// needed.
///
/// # Errors
///
/// Returns [`DbError`] if the directory or connection cannot be created.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        crate::paths::ensure_dir(parent)?;
    }
    log::info!("Opening database at {}", path.display());
    Ok(Connection::open(path)?)
}

/// Column names of `table` in ordinal order, or an empty list if the table
/// does not exist.
///
/// # Errors
///
/// Returns [`DbError`] if the catalog query fails.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns
         WHERE table_name = ?
         ORDER BY ordinal_position",
    )?;
    let mut rows = stmt.query([table])?;

    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get(0)?);
    }
    Ok(columns)
}

/// One destination column: sink name plus its SQL type.
struct SinkColumn {
    name: String,
    column_type: ColumnType,
}

fn sink_columns(
    records: &RecordSet,
    schema: &BTreeMap<String, ColumnType>,
) -> Result<Vec<SinkColumn>, DbError> {
    records
        .column_names()
        .map(|source| {
            let name = sink_column_name(source);
            quote_identifier(&name)?;
            Ok(SinkColumn {
                name,
                column_type: schema.get(source).copied().unwrap_or(ColumnType::Text),
            })
        })
        .collect()
}

fn create_table(conn: &Connection, table: &str, columns: &[SinkColumn]) -> Result<(), DbError> {
    let definitions = columns
        .iter()
        .map(|c| Ok(format!("{} {}", quote_identifier(&c.name)?, c.column_type.sql_type())))
        .collect::<Result<Vec<_>, DbError>>()?
        .join(", ");
    let sql = format!("CREATE TABLE {} ({definitions})", quote_identifier(table)?);
    log::debug!("{sql}");
    conn.execute_batch(&sql)?;
    Ok(())
}

/// Converts one cell to the `DuckDB` value for its declared column type.
///
/// # Errors
///
/// Returns [`DbError::Conversion`] if the cell does not fit the type.
#[allow(clippy::cast_precision_loss)]
pub fn to_sql_value(value: &Value, column_type: ColumnType) -> Result<SqlValue, DbError> {
    Ok(match (column_type, value) {
        (_, Value::Missing) => SqlValue::Null,
        (ColumnType::Text, other) => SqlValue::Text(other.to_string()),
        (ColumnType::Timestamp, Value::Timestamp(ts)) => {
            SqlValue::Timestamp(TimeUnit::Microsecond, ts.and_utc().timestamp_micros())
        }
        (ColumnType::Timestamp, Value::Date(d)) => SqlValue::Timestamp(
            TimeUnit::Microsecond,
            d.and_time(chrono::NaiveTime::MIN)
                .and_utc()
                .timestamp_micros(),
        ),
        (ColumnType::Integer, Value::Int(i)) => SqlValue::BigInt(*i),
        (ColumnType::Float, Value::Float(x)) => SqlValue::Double(*x),
        (ColumnType::Float, Value::Int(i)) => SqlValue::Double(*i as f64),
        (ColumnType::Boolean, Value::Bool(b)) => SqlValue::Boolean(*b),
        (column_type, other) => {
            return Err(DbError::Conversion {
                message: format!("cannot store {other:?} in a {column_type} column"),
            });
        }
    })
}

fn append_all(
    conn: &Connection,
    table: &str,
    records: &RecordSet,
    columns: &[SinkColumn],
) -> Result<(), DbError> {
    let existing = table_columns(conn, table)?;
    if existing.is_empty() {
        log::info!("Creating table {table} with {} columns", columns.len());
        create_table(conn, table, columns)?;
    } else {
        let expected: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        if existing != expected {
            return Err(DbError::SchemaMismatch {
                table: table.to_string(),
                expected,
                actual: existing,
            });
        }
    }

    let mut appender = conn.appender(table)?;
    let source = records.columns();
    for row in 0..records.len() {
        let values = source
            .iter()
            .zip(columns)
            .map(|(column, sink)| to_sql_value(&column.values[row], sink.column_type))
            .collect::<Result<Vec<_>, _>>()?;
        appender.append_row(appender_params_from_iter(values))?;
    }
    appender.flush()?;
    Ok(())
}

/// Appends every record to `table`, creating it if needed.
///
/// Column names are the sink forms of the record-set headers; SQL types come
/// from `schema` (undeclared columns are stored as text). Returns the number
/// of rows loaded.
///
/// # Errors
///
/// Returns [`DbError::InvalidIdentifier`] for unusable table or column
/// names, [`DbError::SchemaMismatch`] if the table exists with different
/// columns, or any conversion/database error. On error the transaction is
/// rolled back and the table is left as it was.
pub fn append_records(
    conn: &Connection,
    table: &str,
    records: &RecordSet,
    schema: &BTreeMap<String, ColumnType>,
) -> Result<u64, DbError> {
    quote_identifier(table)?;
    let columns = sink_columns(records, schema)?;

    conn.execute_batch("BEGIN TRANSACTION")?;
    match append_all(conn, table, records, &columns) {
        Ok(()) => {
            conn.execute_batch("COMMIT")?;
            log::info!("Loaded {} rows into {table}", records.len());
            Ok(records.len() as u64)
        }
        Err(e) => {
            if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                log::error!("Rollback after failed load also failed: {rollback}");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::queries::count_rows;

    fn schema() -> BTreeMap<String, ColumnType> {
        [
            ("SeqID", ColumnType::Text),
            ("Date Of Stop", ColumnType::Timestamp),
            ("Year", ColumnType::Integer),
            ("Latitude", ColumnType::Float),
            ("Accident", ColumnType::Boolean),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    fn records(year: Value) -> RecordSet {
        let date = NaiveDate::from_ymd_opt(2020, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        RecordSet::from_rows(
            ["SeqID", "Date Of Stop", "Year", "Latitude", "Accident", "Make"]
                .map(String::from)
                .to_vec(),
            vec![
                vec![
                    Value::text("a"),
                    Value::Timestamp(date),
                    Value::Int(2010),
                    Value::Float(39.1),
                    Value::Bool(true),
                    Value::text("TOYOTA"),
                ],
                vec![
                    Value::text("b"),
                    Value::Missing,
                    year,
                    Value::Missing,
                    Value::Bool(false),
                    Value::Missing,
                ],
            ],
        )
        .unwrap()
    }

    #[test]
    fn creates_table_and_appends_rows() {
        let conn = Connection::open_in_memory().unwrap();
        let loaded = append_records(&conn, "stops", &records(Value::Missing), &schema()).unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(count_rows(&conn, "stops").unwrap(), 2);
        assert_eq!(
            table_columns(&conn, "stops").unwrap(),
            vec!["seqid", "date_of_stop", "year", "latitude", "accident", "make"]
        );

        let year: Option<i64> = conn
            .query_row("SELECT year FROM stops WHERE seqid = 'a'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(year, Some(2010));
        let ts: String = conn
            .query_row(
                "SELECT CAST(date_of_stop AS VARCHAR) FROM stops WHERE seqid = 'a'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(ts, "2020-05-01 00:00:00");
    }

    #[test]
    fn appends_to_matching_existing_table() {
        let conn = Connection::open_in_memory().unwrap();
        append_records(&conn, "stops", &records(Value::Missing), &schema()).unwrap();
        append_records(&conn, "stops", &records(Value::Int(1999)), &schema()).unwrap();
        assert_eq!(count_rows(&conn, "stops").unwrap(), 4);
    }

    #[test]
    fn rejects_mismatched_existing_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE stops (seqid VARCHAR)").unwrap();
        let err = append_records(&conn, "stops", &records(Value::Missing), &schema()).unwrap_err();
        assert!(matches!(err, DbError::SchemaMismatch { .. }));
    }

    #[test]
    fn failed_load_leaves_no_partial_rows() {
        let conn = Connection::open_in_memory().unwrap();
        let err =
            append_records(&conn, "stops", &records(Value::text("abc")), &schema()).unwrap_err();

        assert!(matches!(err, DbError::Conversion { .. }));
        assert!(table_columns(&conn, "stops").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_table_name() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            append_records(&conn, "stops; --", &records(Value::Missing), &schema()),
            Err(DbError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn opens_file_in_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.duckdb");
        let conn = open(&path).unwrap();
        append_records(&conn, "stops", &records(Value::Missing), &schema()).unwrap();
        assert!(path.exists());
    }
}
