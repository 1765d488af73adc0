//! Feature window construction.
//!
//! The model consumes a fixed-length sequence of the most recent hourly
//! observations, projected onto the feature columns it was trained on.

use crate::core::error::ForecastError;
use crate::core::table::ObservationTable;
use chrono::{DateTime, Utc};
use ndarray::Array2;

/// Number of consecutive observations in a feature window.
pub const WINDOW_LEN: usize = 6;

/// A `WINDOW_LEN x F` block of feature values in timestamp order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWindow {
    /// Row-major values, one row per observation
    pub values: Array2<f64>,
    /// Timestamp of each row
    pub timestamps: Vec<DateTime<Utc>>,
    /// Feature column names, one per block column
    pub columns: Vec<String>,
}

impl FeatureWindow {
    /// An all-zero window over the given columns, stamped at `end`.
    pub fn zeros(columns: &[String], end: DateTime<Utc>) -> Self {
        let timestamps = (0..WINDOW_LEN)
            .rev()
            .map(|back| end - chrono::Duration::hours(back as i64))
            .collect();
        Self {
            values: Array2::zeros((WINDOW_LEN, columns.len())),
            timestamps,
            columns: columns.to_vec(),
        }
    }

    /// Timestamp of the oldest row.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.timestamps.first().copied()
    }

    /// Timestamp of the newest row.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }
}

/// Build the window from the most recent `WINDOW_LEN` rows of the table.
pub fn build_feature_window(
    table: &ObservationTable,
    columns: &[String],
) -> Result<FeatureWindow, ForecastError> {
    build_feature_window_ending_at(table, columns, table.len().saturating_sub(1))
}

/// Build the window whose last row is `end_index`.
pub fn build_feature_window_ending_at(
    table: &ObservationTable,
    columns: &[String],
    end_index: usize,
) -> Result<FeatureWindow, ForecastError> {
    let source_columns = ensure_columns(table, columns)?;

    let available = if end_index < table.len() {
        end_index + 1
    } else {
        table.len()
    };
    if available < WINDOW_LEN {
        return Err(ForecastError::InsufficientData {
            required: WINDOW_LEN,
            available,
        });
    }

    let start = available - WINDOW_LEN;
    let values = Array2::from_shape_fn((WINDOW_LEN, columns.len()), |(row, col)| {
        source_columns[col][start + row]
    });

    let window = FeatureWindow {
        values,
        timestamps: table.timestamps()[start..available].to_vec(),
        columns: columns.to_vec(),
    };

    tracing::debug!(
        start = ?window.start(),
        end = ?window.end(),
        features = columns.len(),
        "Built feature window"
    );

    Ok(window)
}

/// Resolve every requested column, in request order.
fn ensure_columns<'a>(
    table: &'a ObservationTable,
    columns: &[String],
) -> Result<Vec<&'a [f64]>, ForecastError> {
    columns
        .iter()
        .map(|name| {
            table
                .column(name)
                .ok_or_else(|| ForecastError::MissingColumn(name.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    fn hour(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn make_table(rows: usize) -> ObservationTable {
        let mut columns = BTreeMap::new();
        columns.insert("a".to_string(), (0..rows).map(|i| i as f64).collect());
        columns.insert("b".to_string(), (0..rows).map(|i| 100.0 + i as f64).collect());
        columns.insert("so2".to_string(), (0..rows).map(|i| i as f64 * 2.0).collect());
        ObservationTable::new((0..rows as i64).map(hour).collect(), columns).unwrap()
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_window_takes_last_rows_in_order() {
        let table = make_table(10);
        let window = build_feature_window(&table, &cols(&["b", "a"])).unwrap();

        assert_eq!(window.shape(), (WINDOW_LEN, 2));
        for row in 0..WINDOW_LEN {
            let source = 4 + row;
            assert_eq!(window.values[[row, 0]], 100.0 + source as f64);
            assert_eq!(window.values[[row, 1]], source as f64);
        }
        assert_eq!(window.start(), Some(hour(4)));
        assert_eq!(window.end(), Some(hour(9)));
    }

    #[test]
    fn test_exactly_window_len_rows() {
        let table = make_table(WINDOW_LEN);
        let window = build_feature_window(&table, &cols(&["a"])).unwrap();
        assert_eq!(window.shape(), (WINDOW_LEN, 1));
        assert_eq!(window.values[[0, 0]], 0.0);
    }

    #[test]
    fn test_insufficient_data() {
        for rows in 0..WINDOW_LEN {
            let table = make_table(rows);
            let err = build_feature_window(&table, &cols(&["a"])).unwrap_err();
            assert_eq!(
                err,
                ForecastError::InsufficientData {
                    required: WINDOW_LEN,
                    available: rows
                }
            );
        }
    }

    #[test]
    fn test_missing_column() {
        let table = make_table(10);
        let err = build_feature_window(&table, &cols(&["a", "traffic_index"])).unwrap_err();
        assert_eq!(err, ForecastError::MissingColumn("traffic_index".to_string()));
    }

    #[test]
    fn test_input_table_untouched() {
        let table = make_table(8);
        let before = table.clone();
        let _ = build_feature_window(&table, &cols(&["a", "b"])).unwrap();
        assert_eq!(table, before);
    }

    #[test]
    fn test_window_ending_at_index() {
        let table = make_table(10);
        let window = build_feature_window_ending_at(&table, &cols(&["a"]), 6).unwrap();
        assert_eq!(window.end(), Some(hour(6)));
        assert_eq!(window.values[[WINDOW_LEN - 1, 0]], 6.0);

        let err = build_feature_window_ending_at(&table, &cols(&["a"]), 3).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { available: 4, .. }));
    }

    #[test]
    fn test_zero_window() {
        let window = FeatureWindow::zeros(&cols(&["a", "b", "c"]), hour(10));
        assert_eq!(window.shape(), (WINDOW_LEN, 3));
        assert!(window.values.iter().all(|v| *v == 0.0));
        assert_eq!(window.end(), Some(hour(10)));
        assert_eq!(window.start(), Some(hour(5)));
    }
}
