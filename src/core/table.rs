//! Column-oriented table of hourly observations.
//!
//! Rows are unique by timestamp and kept in ascending time order. Every
//! column holds exactly one value per timestamp; missing cells are NaN.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// An in-memory table of observation records.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationTable {
    timestamps: Vec<DateTime<Utc>>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl ObservationTable {
    /// Build a table, sorting rows by timestamp.
    ///
    /// Fails if a column length differs from the number of timestamps or if
    /// two rows share a timestamp.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        columns: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self, TableError> {
        for (name, values) in &columns {
            if values.len() != timestamps.len() {
                return Err(TableError::RaggedColumn {
                    column: name.clone(),
                    expected: timestamps.len(),
                    actual: values.len(),
                });
            }
        }

        let mut order: Vec<usize> = (0..timestamps.len()).collect();
        order.sort_by_key(|&i| timestamps[i]);

        if let Some(pair) = order
            .windows(2)
            .find(|pair| timestamps[pair[0]] == timestamps[pair[1]])
        {
            return Err(TableError::DuplicateTimestamp(timestamps[pair[0]]));
        }

        let sorted_timestamps = order.iter().map(|&i| timestamps[i]).collect();
        let sorted_columns = columns
            .into_iter()
            .map(|(name, values)| {
                let sorted = order.iter().map(|&i| values[i]).collect();
                (name, sorted)
            })
            .collect();

        Ok(Self {
            timestamps: sorted_timestamps,
            columns: sorted_columns,
        })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Row timestamps in ascending order.
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Timestamp of the most recent row.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in lexical order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Index of the row with exactly this timestamp.
    pub fn position_of(&self, timestamp: DateTime<Utc>) -> Option<usize> {
        self.timestamps.binary_search(&timestamp).ok()
    }

    /// Add or replace a column. Values must be in row order.
    pub fn insert_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), TableError> {
        if values.len() != self.len() {
            return Err(TableError::RaggedColumn {
                column: name.to_string(),
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    /// A new table holding the first `n` rows (or all rows if fewer).
    pub fn head(&self, n: usize) -> Self {
        let end = n.min(self.len());
        Self {
            timestamps: self.timestamps[..end].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| (name.clone(), values[..end].to_vec()))
                .collect(),
        }
    }

    /// A new table holding the last `n` rows (or all rows if fewer).
    pub fn tail(&self, n: usize) -> Self {
        let start = self.len().saturating_sub(n);
        Self {
            timestamps: self.timestamps[start..].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| (name.clone(), values[start..].to_vec()))
                .collect(),
        }
    }
}

/// Errors raised when assembling a table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableError {
    DuplicateTimestamp(DateTime<Utc>),
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::DuplicateTimestamp(ts) => {
                write!(f, "Duplicate timestamp: {}", ts.to_rfc3339())
            }
            TableError::RaggedColumn {
                column,
                expected,
                actual,
            } => write!(
                f,
                "Column {column} has {actual} values, expected {expected}"
            ),
        }
    }
}

impl std::error::Error for TableError {}
