//! Core forecasting pipeline.
//!
//! This module contains:
//! - The observation table and feature window builder
//! - Normalization and the sequence regressor
//! - Alert classification, current per-pollutant levels and the AQI
//! - Backtest accuracy and data quality reports

pub mod alert;
pub mod aqi;
pub mod error;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod quality;
pub mod scaler;
pub mod table;
pub mod windowing;

// Re-export commonly used types
pub use alert::{
    classify_so2, AlertBand, AlertLevel, AlertMessage, AlertScheme, CurrentAlert, LegendEntry,
    PollutantSchemes, SO2_ALERT_RED, SO2_ALERT_YELLOW,
};
pub use aqi::{overall, sub_index, AqiBand, AqiReading, OverallAqi, Pollutant, Recommendations};
pub use error::ForecastError;
pub use metrics::{backtest, AccuracyReport};
pub use model::{LstmRegressor, Regressor};
pub use pipeline::{Forecast, ForecastArtifacts, Forecaster};
pub use quality::QualityReport;
pub use scaler::Normalizer;
pub use table::{ObservationTable, TableError};
pub use windowing::{build_feature_window, build_feature_window_ending_at, FeatureWindow, WINDOW_LEN};
