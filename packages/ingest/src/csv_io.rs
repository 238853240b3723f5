//! CSV source and export.
//!
//! Cells are read verbatim; an empty cell is the only thing treated as
//! missing at this point. Trimming and null-token folding belong to the
//! cleaning stages.

use std::io;
use std::path::Path;

use traffic_violations_lookup::PipelineConfig;
use traffic_violations_record_models::{RecordSet, Value};

use crate::IngestError;

fn cell(raw: &str) -> Value {
    if raw.is_empty() {
        Value::Missing
    } else {
        Value::text(raw)
    }
}

/// Reads a header row plus records from any reader and checks that every
/// column the pipeline needs is present.
///
/// # Errors
///
/// Returns [`IngestError::NoHeader`] for an empty header,
/// [`IngestError::MissingColumns`] when required columns are absent, or
/// [`IngestError::Csv`] for malformed input (including ragged rows).
pub fn read_records<R: io::Read>(
    reader: R,
    config: &PipelineConfig,
) -> Result<RecordSet, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(IngestError::NoHeader);
    }

    let missing: Vec<String> = config
        .required_columns()
        .into_iter()
        .filter(|required| !headers.iter().any(|h| h == required))
        .map(str::to_owned)
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns { missing });
    }

    let mut records = RecordSet::with_columns(&headers);
    for result in reader.records() {
        let record = result?;
        records.push_row(record.iter().map(cell).collect())?;
    }

    Ok(records)
}

/// Reads the raw CSV at `path`.
///
/// # Errors
///
/// See [`read_records`]; also fails if the file cannot be opened.
pub fn load_csv(path: &Path, config: &PipelineConfig) -> Result<RecordSet, IngestError> {
    log::info!("Reading {}", path.display());
    let file = std::fs::File::open(path)?;
    let records = read_records(io::BufReader::new(file), config)?;
    log::info!(
        "Read {} records with {} columns",
        records.len(),
        records.columns().len()
    );
    Ok(records)
}

/// Writes records with their original headers. Missing cells are empty.
///
/// # Errors
///
/// Returns [`IngestError`] if the output cannot be written.
pub fn write_records<W: io::Write>(writer: W, records: &RecordSet) -> Result<(), IngestError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(records.column_names())?;
    for row in 0..records.len() {
        writer.write_record(records.row_values(row).iter().map(ToString::to_string))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the cleaned table to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`IngestError`] if the directory or file cannot be written.
pub fn save_csv(path: &Path, records: &RecordSet) -> Result<(), IngestError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        traffic_violations_database::paths::ensure_dir(parent)?;
    }
    log::info!("Writing {} records to {}", records.len(), path.display());
    write_records(std::fs::File::create(path)?, records)
}

#[cfg(test)]
mod tests {
    use traffic_violations_lookup::default_config;

    use super::*;

    fn header() -> String {
        default_config().required_columns().join(",")
    }

    #[test]
    fn reads_cells_and_marks_empty_missing() {
        let width = default_config().required_columns().len();
        let mut row = vec![""; width];
        row[0] = "abc123";
        let input = format!("{}\n{}\n", header(), row.join(","));

        let records = read_records(input.as_bytes(), default_config()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records.column("SeqID").unwrap(), &[Value::text("abc123")]);
        assert_eq!(records.column("Make").unwrap(), &[Value::Missing]);
    }

    #[test]
    fn trims_header_names() {
        let input = header().replace("SeqID", " SeqID ") + "\n";
        let records = read_records(input.as_bytes(), default_config()).unwrap();
        assert!(records.has_column("SeqID"));
    }

    #[test]
    fn reports_missing_required_columns() {
        let err = read_records("SeqID,Make\n1,FORD\n".as_bytes(), default_config()).unwrap_err();
        let IngestError::MissingColumns { missing } = err else {
            panic!("expected missing columns, got {err}");
        };
        assert!(missing.contains(&"Description".to_string()));
        assert!(!missing.contains(&"SeqID".to_string()));
    }

    #[test]
    fn rejects_ragged_rows() {
        let input = format!("{}\nonly,two\n", header());
        assert!(matches!(
            read_records(input.as_bytes(), default_config()),
            Err(IngestError::Csv(_))
        ));
    }

    #[test]
    fn writes_missing_as_empty_cells() {
        let records = RecordSet::from_rows(
            vec!["SeqID".to_string(), "Year".to_string()],
            vec![vec![Value::text("a"), Value::Int(2010)], vec![Value::text("b"), Value::Missing]],
        )
        .unwrap();
        let mut out = Vec::new();
        write_records(&mut out, &records).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "SeqID,Year\na,2010\nb,\n");
    }

    #[test]
    fn save_csv_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("clean.csv");
        let records = RecordSet::from_rows(vec!["SeqID".to_string()], vec![vec![Value::text("a")]])
            .unwrap();
        save_csv(&path, &records).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "SeqID\na\n");
    }
}
