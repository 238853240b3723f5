//! Duplicate merging.
//!
//! Rows sharing an id are collapsed into one. The first row of each id group
//! supplies every column except description and charge, which become the
//! separator-joined distinct values of the whole group (in first-seen order).

use std::collections::{BTreeMap, BTreeSet};

use traffic_violations_lookup::PipelineConfig;
use traffic_violations_record_models::{RecordSet, Value};

use crate::CleanError;
use crate::normalize::normalize_value;

/// Distinct non-missing values in first-seen order.
#[derive(Debug, Default)]
struct DistinctValues {
    seen: BTreeSet<String>,
    ordered: Vec<String>,
}

impl DistinctValues {
    fn push(&mut self, value: &Value) {
        if let Some(text) = value.to_text()
            && self.seen.insert(text.clone())
        {
            self.ordered.push(text);
        }
    }

    fn join(&self, separator: &str) -> Value {
        Value::Text(self.ordered.join(separator))
    }
}

#[derive(Debug)]
struct MergeGroup {
    first_row: usize,
    descriptions: DistinctValues,
    charges: DistinctValues,
}

/// Drops exact duplicate rows, normalizes description and charge, and merges
/// rows that share an id.
///
/// Records with a missing id are treated as one group. A group whose values
/// are all missing gets an empty merged string.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if the id, description, or charge column is
/// absent.
pub fn merge_duplicates(
    records: RecordSet,
    config: &PipelineConfig,
) -> Result<RecordSet, CleanError> {
    let columns = &config.columns;
    for name in [&columns.id, &columns.description, &columns.charge] {
        records.require(name)?;
    }

    let mut records = drop_exact_duplicates(records);

    let strip: Vec<char> = config.dedup.description_leading_strip.chars().collect();
    for value in records.require_mut(&columns.description)? {
        *value = clean_description(value, &strip);
    }
    for value in records.require_mut(&columns.charge)? {
        *value = normalize_value(value);
    }

    let ids = records.require(&columns.id)?;
    let descriptions = records.require(&columns.description)?;
    let charges = records.require(&columns.charge)?;

    let mut group_index: BTreeMap<Option<String>, usize> = BTreeMap::new();
    let mut groups: Vec<MergeGroup> = Vec::new();
    for row in 0..records.len() {
        let index = *group_index.entry(ids[row].to_text()).or_insert_with(|| {
            groups.push(MergeGroup {
                first_row: row,
                descriptions: DistinctValues::default(),
                charges: DistinctValues::default(),
            });
            groups.len() - 1
        });
        let group = &mut groups[index];
        group.descriptions.push(&descriptions[row]);
        group.charges.push(&charges[row]);
    }

    let first_rows: Vec<usize> = groups.iter().map(|g| g.first_row).collect();
    let mut merged = records.take_rows(&first_rows);
    merged.set_column(
        &columns.description,
        groups
            .iter()
            .map(|g| g.descriptions.join(&config.dedup.description_separator))
            .collect(),
    )?;
    merged.set_column(
        &columns.charge,
        groups
            .iter()
            .map(|g| g.charges.join(&config.dedup.charge_separator))
            .collect(),
    )?;

    log::info!(
        "Merged {} records into {} unique ids",
        records.len(),
        merged.len()
    );

    Ok(merged)
}

/// Keeps the first occurrence of every row whose cells are all identical.
fn drop_exact_duplicates(records: RecordSet) -> RecordSet {
    let mut seen: BTreeSet<Vec<Option<String>>> = BTreeSet::new();
    let keep: Vec<usize> = (0..records.len())
        .filter(|&row| {
            let key = records
                .row_values(row)
                .into_iter()
                .map(Value::to_text)
                .collect();
            seen.insert(key)
        })
        .collect();

    if keep.len() == records.len() {
        return records;
    }
    log::info!(
        "Dropped {} exact duplicate rows",
        records.len() - keep.len()
    );
    records.take_rows(&keep)
}

fn clean_description(value: &Value, leading_strip: &[char]) -> Value {
    match normalize_value(value) {
        Value::Text(s) => {
            let stripped = s.trim_start_matches(leading_strip);
            if stripped.is_empty() {
                Value::Missing
            } else {
                Value::text(stripped)
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use traffic_violations_lookup::default_config;

    use super::*;

    fn records(rows: &[(&str, &str, &str, &str)]) -> RecordSet {
        RecordSet::from_rows(
            vec![
                "SeqID".to_string(),
                "Description".to_string(),
                "Charge".to_string(),
                "Make".to_string(),
            ],
            rows.iter()
                .map(|(id, desc, charge, make)| {
                    [id, desc, charge, make]
                        .iter()
                        .map(|s| {
                            if s.is_empty() {
                                Value::Missing
                            } else {
                                Value::text(**s)
                            }
                        })
                        .collect()
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn merges_descriptions_and_charges_per_id() {
        let input = records(&[
            ("A", "speeding", "21-801", "TOYOTA"),
            ("A", "no seatbelt", "22-412", "HONDA"),
            ("A", "SPEEDING ", "21-801", "FORD"),
            ("B", "failure to stop", "21-707", "FORD"),
        ]);
        let merged = merge_duplicates(input, default_config()).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged.column("Description").unwrap(),
            &[
                Value::text("SPEEDING | NO SEATBELT"),
                Value::text("FAILURE TO STOP"),
            ]
        );
        assert_eq!(
            merged.column("Charge").unwrap(),
            &[Value::text("21-801,22-412"), Value::text("21-707")]
        );
        assert_eq!(
            merged.column("Make").unwrap(),
            &[Value::text("TOYOTA"), Value::text("FORD")]
        );
    }

    #[test]
    fn drops_exact_duplicates_before_merging() {
        let input = records(&[
            ("A", "speeding", "21-801", "TOYOTA"),
            ("A", "speeding", "21-801", "TOYOTA"),
        ]);
        let merged = merge_duplicates(input, default_config()).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.column("Description").unwrap(), &[Value::text("SPEEDING")]);
    }

    #[test]
    fn strips_leading_punctuation_from_descriptions() {
        let input = records(&[("A", ", ) driving", "21-801", "TOYOTA")]);
        let merged = merge_duplicates(input, default_config()).unwrap();
        assert_eq!(merged.column("Description").unwrap(), &[Value::text("DRIVING")]);
    }

    #[test]
    fn all_missing_group_yields_empty_string() {
        let input = records(&[("A", "", "nan", "TOYOTA"), ("A", "", "", "TOYOTA")]);
        let merged = merge_duplicates(input, default_config()).unwrap();
        assert_eq!(merged.column("Description").unwrap(), &[Value::text("")]);
        assert_eq!(merged.column("Charge").unwrap(), &[Value::text("")]);
    }

    #[test]
    fn missing_ids_form_one_group() {
        let input = records(&[("", "a", "1", "X"), ("", "b", "2", "Y")]);
        let merged = merge_duplicates(input, default_config()).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.column("Description").unwrap(), &[Value::text("A | B")]);
    }

    #[test]
    fn keeps_first_seen_group_order() {
        let input = records(&[
            ("B", "x", "1", "M"),
            ("A", "y", "2", "M"),
            ("B", "z", "3", "M"),
        ]);
        let merged = merge_duplicates(input, default_config()).unwrap();
        assert_eq!(
            merged.column("SeqID").unwrap(),
            &[Value::text("B"), Value::text("A")]
        );
    }

    #[test]
    fn reports_missing_id_column() {
        let input = RecordSet::from_rows(vec!["Description".to_string()], vec![]).unwrap();
        assert!(matches!(
            merge_duplicates(input, default_config()),
            Err(CleanError::Record(_))
        ));
    }
}
