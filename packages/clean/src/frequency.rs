//! Long-tail collapsing for high-cardinality categoricals.
//!
//! Runs in two passes. [`FrequencyTable::from_values`] counts every value of
//! the cleaned column, then [`collapse_long_tail`] rewrites each cell using
//! the finished table. No per-row step sees dataset-wide state other than
//! through the table.

use std::collections::BTreeMap;

use traffic_violations_record_models::Value;

/// Occurrence count of every distinct non-missing value in one column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: BTreeMap<String, usize>,
}

impl FrequencyTable {
    /// Counts the values of a column. Missing cells are not counted.
    #[must_use]
    pub fn from_values(values: &[Value]) -> Self {
        let mut counts = BTreeMap::new();
        for text in values.iter().filter_map(Value::to_text) {
            *counts.entry(text).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Occurrences of `value`, zero if never seen.
    #[must_use]
    pub fn count(&self, value: &str) -> usize {
        self.counts.get(value).copied().unwrap_or(0)
    }

    /// Number of distinct values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns `true` if no values were counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `true` if `value` occurs strictly more than `min_count` times.
    #[must_use]
    pub fn is_popular(&self, value: &str, min_count: usize) -> bool {
        self.count(value) > min_count
    }
}

/// Replaces every cell that is not popular (including missing cells) with
/// `fallback`. Returns how many cells were rewritten.
pub fn collapse_long_tail(
    values: &mut [Value],
    table: &FrequencyTable,
    min_count: usize,
    fallback: &Value,
) -> usize {
    let mut collapsed = 0;
    for value in values {
        let keep = value
            .to_text()
            .is_some_and(|text| table.is_popular(&text, min_count));
        if !keep && value != fallback {
            *value = fallback.clone();
            collapsed += 1;
        }
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(counts: &[(&str, usize)]) -> Vec<Value> {
        counts
            .iter()
            .flat_map(|(v, n)| std::iter::repeat_n(Value::text(*v), *n))
            .collect()
    }

    #[test]
    fn counts_distinct_values() {
        let mut values = column(&[("TOYOTA", 3), ("FORD", 1)]);
        values.push(Value::Missing);
        let table = FrequencyTable::from_values(&values);
        assert_eq!(table.len(), 2);
        assert_eq!(table.count("TOYOTA"), 3);
        assert_eq!(table.count("HONDA"), 0);
    }

    #[test]
    fn threshold_is_strictly_greater_than() {
        let mut values = column(&[("TOYOTA", 201), ("FORD", 200)]);
        let table = FrequencyTable::from_values(&values);
        let collapsed = collapse_long_tail(&mut values, &table, 200, &Value::text("OTHER"));

        assert_eq!(collapsed, 200);
        assert_eq!(values[0], Value::text("TOYOTA"));
        assert_eq!(values[201], Value::text("OTHER"));
    }

    #[test]
    fn missing_collapses_to_fallback() {
        let mut values = column(&[("CIVIC", 3)]);
        values.push(Value::Missing);
        let table = FrequencyTable::from_values(&values);

        collapse_long_tail(&mut values, &table, 2, &Value::text("OTHER"));
        assert_eq!(values[3], Value::text("OTHER"));
    }

    #[test]
    fn missing_fallback_leaves_missing_untouched() {
        let mut values = vec![Value::Missing, Value::text("RARE")];
        let table = FrequencyTable::from_values(&values);
        let collapsed = collapse_long_tail(&mut values, &table, 0, &Value::Missing);
        assert_eq!(collapsed, 0);
        assert_eq!(values, vec![Value::Missing, Value::text("RARE")]);
    }
}
