//! Data quality checks on a loaded table.

use crate::core::table::ObservationTable;
use crate::core::windowing::WINDOW_LEN;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Pollutant readings above this are flagged (µg/m³).
pub const OUTLIER_LIMIT: f64 = 500.0;

/// Columns checked against [`OUTLIER_LIMIT`].
const OUTLIER_COLUMNS: [&str; 2] = ["so2", "nh3"];

/// Summary of what a table contains and whether a forecast can run on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub rows: usize,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Required columns absent from the table
    pub missing_columns: Vec<String>,
    /// NaN cells per required column
    pub missing_cells: BTreeMap<String, usize>,
    /// Consecutive rows not exactly one hour apart
    pub cadence_gaps: usize,
    /// Readings above the outlier limit per pollutant column
    pub outliers: BTreeMap<String, usize>,
    /// Share of filled cells across required columns, in percent
    pub completeness_pct: f64,
    pub target_mean: Option<f64>,
    pub target_std_dev: Option<f64>,
    pub target_min: Option<f64>,
    pub target_max: Option<f64>,
    pub valid: bool,
}

impl QualityReport {
    /// Inspect `table` for the given feature columns and target.
    pub fn inspect(table: &ObservationTable, features: &[String], target: &str) -> Self {
        let mut required: Vec<&str> = features.iter().map(String::as_str).collect();
        if !required.contains(&target) {
            required.push(target);
        }

        let missing_columns: Vec<String> = required
            .iter()
            .filter(|name| !table.has_column(name))
            .map(|name| name.to_string())
            .collect();

        let missing_cells: BTreeMap<String, usize> = required
            .iter()
            .filter_map(|name| {
                table
                    .column(name)
                    .map(|values| (name.to_string(), values.iter().filter(|v| v.is_nan()).count()))
            })
            .collect();

        let total_cells = table.len() * required.len();
        let filled: usize = required
            .iter()
            .filter_map(|name| table.column(name))
            .map(|values| values.iter().filter(|v| !v.is_nan()).count())
            .sum();
        let completeness_pct = if total_cells == 0 {
            0.0
        } else {
            filled as f64 / total_cells as f64 * 100.0
        };

        let cadence_gaps = table
            .timestamps()
            .windows(2)
            .filter(|pair| pair[1] - pair[0] != Duration::hours(1))
            .count();

        let outliers = OUTLIER_COLUMNS
            .iter()
            .filter_map(|name| {
                table.column(name).map(|values| {
                    let count = values.iter().filter(|v| **v > OUTLIER_LIMIT).count();
                    (name.to_string(), count)
                })
            })
            .collect();

        let target_values: Vec<f64> = table
            .column(target)
            .map(|values| values.iter().copied().filter(|v| v.is_finite()).collect())
            .unwrap_or_default();
        let (target_mean, target_std_dev, target_min, target_max) = if target_values.is_empty() {
            (None, None, None, None)
        } else {
            let std_dev = if target_values.len() > 1 {
                Some(target_values.iter().std_dev())
            } else {
                None
            };
            (
                Some(target_values.iter().mean()),
                std_dev,
                Some(target_values.iter().copied().fold(f64::INFINITY, f64::min)),
                Some(target_values.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            )
        };

        let valid = missing_columns.is_empty() && table.len() >= WINDOW_LEN;

        Self {
            rows: table.len(),
            start: table.timestamps().first().copied(),
            end: table.last_timestamp(),
            missing_columns,
            missing_cells,
            cadence_gaps,
            outliers,
            completeness_pct,
            target_mean,
            target_std_dev,
            target_min,
            target_max,
            valid,
        }
    }

    /// Human-readable lines for the `validate` command.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Rows: {}", self.rows)];
        if let (Some(start), Some(end)) = (self.start, self.end) {
            lines.push(format!("Period: {} .. {}", start.to_rfc3339(), end.to_rfc3339()));
        }
        lines.push(format!("Completeness: {:.1}%", self.completeness_pct));
        lines.push(format!("Cadence gaps: {}", self.cadence_gaps));
        if !self.missing_columns.is_empty() {
            lines.push(format!("Missing columns: {}", self.missing_columns.join(", ")));
        }
        for (column, count) in self.missing_cells.iter().filter(|(_, c)| **c > 0) {
            lines.push(format!("Empty cells in {column}: {count}"));
        }
        for (column, count) in self.outliers.iter().filter(|(_, c)| **c > 0) {
            lines.push(format!("Outliers in {column} (> {OUTLIER_LIMIT}): {count}"));
        }
        if let (Some(mean), Some(min), Some(max)) =
            (self.target_mean, self.target_min, self.target_max)
        {
            lines.push(format!("Target mean {mean:.1}, min {min:.1}, max {max:.1}"));
        }
        lines.push(format!("Valid: {}", if self.valid { "yes" } else { "no" }));
        lines.join("\n")
    }
}
