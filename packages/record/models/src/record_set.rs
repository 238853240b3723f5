//! Column-oriented in-memory table.
//!
//! Every cleaning stage is a pass over one or a few named columns, so the
//! table is stored as a list of columns of equal length rather than a list
//! of rows.

use crate::{RecordError, Value};

/// A named column of cell values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Column {
    /// Column name as it appears in the source header.
    pub name: String,
    /// One value per record.
    pub values: Vec<Value>,
}

/// An ordered set of equal-length [`Column`]s.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    columns: Vec<Column>,
    rows: usize,
}

impl RecordSet {
    /// Creates an empty record set with the given column names and no rows.
    #[must_use]
    pub fn with_columns<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            columns: names
                .iter()
                .map(|name| Column {
                    name: name.as_ref().to_string(),
                    values: Vec::new(),
                })
                .collect(),
            rows: 0,
        }
    }

    /// Builds a record set from a header and row-major cells.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::RowLength`] if any row does not have exactly
    /// one cell per header.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, RecordError> {
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column {
                name,
                values: Vec::with_capacity(rows.len()),
            })
            .collect();

        let row_count = rows.len();
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(RecordError::RowLength {
                    row: i,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }

        Ok(Self {
            columns,
            rows: row_count,
        })
    }

    /// Appends one row.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::RowLength`] if the row width differs from the
    /// column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), RecordError> {
        if row.len() != self.columns.len() {
            return Err(RecordError::RowLength {
                row: self.rows,
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.values.push(value);
        }
        self.rows += 1;
        Ok(())
    }

    /// Number of records.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows
    }

    /// Returns `true` if there are no records.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// All columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Returns `true` if a column with this name exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of the named column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Mutable values of the named column. The slice cannot change length.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut [Value]> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| c.values.as_mut_slice())
    }

    /// Like [`Self::column`] but reports a missing column as an error.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingColumn`] if no column has this name.
    pub fn require(&self, name: &str) -> Result<&[Value], RecordError> {
        self.column(name).ok_or_else(|| RecordError::MissingColumn {
            column: name.to_string(),
        })
    }

    /// Like [`Self::column_mut`] but reports a missing column as an error.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingColumn`] if no column has this name.
    pub fn require_mut(&mut self, name: &str) -> Result<&mut [Value], RecordError> {
        self.column_mut(name)
            .ok_or_else(|| RecordError::MissingColumn {
                column: name.to_string(),
            })
    }

    /// Replaces the named column, or appends it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::ColumnLength`] if `values` does not have one
    /// entry per record.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), RecordError> {
        if values.len() != self.rows {
            return Err(RecordError::ColumnLength {
                column: name.to_string(),
                expected: self.rows,
                actual: values.len(),
            });
        }
        if let Some(column) = self.columns.iter_mut().find(|c| c.name == name) {
            column.values = values;
        } else {
            self.columns.push(Column {
                name: name.to_string(),
                values,
            });
        }
        Ok(())
    }

    /// Cells of one record, in column order.
    #[must_use]
    pub fn row_values(&self, row: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[row]).collect()
    }

    /// Builds a new record set containing only the given rows, in the given
    /// order.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: indices.iter().map(|&i| c.values[i].clone()).collect(),
                })
                .collect(),
            rows: indices.len(),
        }
    }
}

/// Converts a source header name to the sink column name
/// (`"Date Of Stop"` → `"date_of_stop"`).
#[must_use]
pub fn sink_column_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}
