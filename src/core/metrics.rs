//! Backtest accuracy over historical windows.
//!
//! Every window end whose target row (`end + horizon`) exists in the table
//! is forecast and compared with what was actually observed. Windows with a
//! missing cell are skipped.

use crate::core::alert::AlertLevel;
use crate::core::error::ForecastError;
use crate::core::pipeline::Forecaster;
use crate::core::table::ObservationTable;
use crate::core::windowing::{build_feature_window_ending_at, WINDOW_LEN};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Forecast error statistics over a backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub sample_size: usize,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    /// Share of samples whose predicted level matches the observed level
    pub level_agreement: f64,
    pub predicted_levels: BTreeMap<AlertLevel, u64>,
}

/// One forecast/observation pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestSample {
    pub predicted: f64,
    pub observed: f64,
    pub predicted_level: AlertLevel,
    pub observed_level: AlertLevel,
}

/// Run the forecaster over past windows.
///
/// `last` limits the walk to the most recent eligible windows. Returns
/// `Ok(None)` when no window has an observed target.
pub fn backtest(
    forecaster: &Forecaster,
    table: &ObservationTable,
    target_column: &str,
    last: Option<usize>,
) -> Result<Option<AccuracyReport>, ForecastError> {
    let target = table
        .column(target_column)
        .ok_or_else(|| ForecastError::MissingColumn(target_column.to_string()))?;
    let horizon = Duration::hours(forecaster.horizon_hours() as i64);

    let mut pairs: Vec<(usize, usize)> = (WINDOW_LEN.saturating_sub(1)..table.len())
        .filter_map(|end| {
            let target_time = table.timestamps()[end] + horizon;
            table
                .position_of(target_time)
                .filter(|&idx| target[idx].is_finite())
                .map(|idx| (end, idx))
        })
        .collect();

    if let Some(n) = last {
        let skip = pairs.len().saturating_sub(n);
        pairs.drain(..skip);
    }

    let mut samples = Vec::with_capacity(pairs.len());
    let mut skipped = 0usize;
    for (end, idx) in pairs {
        let window = build_feature_window_ending_at(table, forecaster.feature_columns(), end)?;
        if window.values.iter().any(|v| !v.is_finite()) {
            skipped += 1;
            continue;
        }
        let forecast = forecaster.evaluate(&window)?;
        let observed = target[idx];
        samples.push(BacktestSample {
            predicted: forecast.value,
            observed,
            predicted_level: forecast.level,
            observed_level: forecaster.scheme().classify(observed),
        });
    }

    if skipped > 0 {
        tracing::debug!(skipped, "Skipped backtest windows with missing values");
    }

    let levels = forecaster.scheme().levels();
    Ok(summarize(&samples, &levels))
}

/// Aggregate samples into a report.
pub fn summarize(samples: &[BacktestSample], levels: &[AlertLevel]) -> Option<AccuracyReport> {
    if samples.is_empty() {
        return None;
    }

    let n = samples.len() as f64;
    let observed: Vec<f64> = samples.iter().map(|s| s.observed).collect();
    let errors: Vec<f64> = samples.iter().map(|s| s.predicted - s.observed).collect();

    let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

    let observed_mean = observed.iter().mean();
    let ss_res: f64 = errors.iter().map(|e| e * e).sum();
    let ss_tot: f64 = observed.iter().map(|o| (o - observed_mean).powi(2)).sum();
    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    let mut predicted_levels: BTreeMap<AlertLevel, u64> =
        levels.iter().map(|&level| (level, 0)).collect();
    let mut agreeing = 0usize;
    for sample in samples {
        *predicted_levels.entry(sample.predicted_level).or_default() += 1;
        if sample.predicted_level == sample.observed_level {
            agreeing += 1;
        }
    }

    Some(AccuracyReport {
        sample_size: samples.len(),
        rmse: mse.sqrt(),
        mae,
        r2,
        level_agreement: agreeing as f64 / n,
        predicted_levels,
    })
}
