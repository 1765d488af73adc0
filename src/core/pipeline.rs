//! Forecast-and-alert evaluation.
//!
//! The artifacts (normalizer + model) are loaded once and shared read-only.
//! A [`Forecaster`] holds them behind an `Arc` and runs one synchronous
//! window -> scale -> predict -> classify pass per call.

use crate::core::alert::{AlertLevel, AlertScheme};
use crate::core::error::ForecastError;
use crate::core::model::{LstmRegressor, Regressor};
use crate::core::scaler::Normalizer;
use crate::core::table::ObservationTable;
use crate::core::windowing::{build_feature_window, FeatureWindow, WINDOW_LEN};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Fitted normalizer and model, paired 1:1 on input shape.
pub struct ForecastArtifacts {
    normalizer: Normalizer,
    model: Box<dyn Regressor>,
}

impl ForecastArtifacts {
    /// Load both artifacts from disk and check they agree.
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self, ForecastError> {
        let normalizer = Normalizer::load(scaler_path)?;
        let model = LstmRegressor::load(model_path)?;
        let artifacts = Self::from_parts(normalizer, Box::new(model));
        artifacts.validate().map_err(|reason| ForecastError::ArtifactInvalid {
            path: model_path.to_path_buf(),
            reason,
        })?;
        Ok(artifacts)
    }

    /// Assemble artifacts from in-memory parts.
    pub fn from_parts(normalizer: Normalizer, model: Box<dyn Regressor>) -> Self {
        Self { normalizer, model }
    }

    /// The normalizer and the model must describe the same feature count,
    /// and the model must consume a window of `WINDOW_LEN` steps.
    pub fn validate(&self) -> Result<(), String> {
        let (timesteps, features) = self.model.input_shape();
        if timesteps != WINDOW_LEN {
            return Err(format!(
                "model expects {timesteps} timesteps, windows have {WINDOW_LEN}"
            ));
        }
        if features != self.normalizer.n_features() {
            return Err(format!(
                "model expects {features} features, normalizer was fitted on {}",
                self.normalizer.n_features()
            ));
        }
        Ok(())
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn model(&self) -> &dyn Regressor {
        self.model.as_ref()
    }
}

/// A single forecast with its alert level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Timestamp of the newest observation used
    pub issued_at: DateTime<Utc>,
    /// Time the forecast refers to
    pub target_time: DateTime<Utc>,
    /// Forecast concentration (µg/m³)
    pub value: f64,
    pub level: AlertLevel,
}

/// Runs the window builder and evaluator against shared artifacts.
#[derive(Clone)]
pub struct Forecaster {
    artifacts: Arc<ForecastArtifacts>,
    scheme: AlertScheme,
    feature_columns: Vec<String>,
    horizon_hours: u32,
}

impl Forecaster {
    pub fn new(
        artifacts: Arc<ForecastArtifacts>,
        scheme: AlertScheme,
        feature_columns: Vec<String>,
        horizon_hours: u32,
    ) -> Self {
        Self {
            artifacts,
            scheme,
            feature_columns,
            horizon_hours,
        }
    }

    pub fn scheme(&self) -> &AlertScheme {
        &self.scheme
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn horizon_hours(&self) -> u32 {
        self.horizon_hours
    }

    /// Build the window from the table tail and evaluate it.
    pub fn forecast(&self, table: &ObservationTable) -> Result<Forecast, ForecastError> {
        let window = build_feature_window(table, &self.feature_columns)?;
        self.evaluate(&window)
    }

    /// Scale, predict and classify one window.
    ///
    /// A missing (NaN) or infinite cell anywhere in the window is an
    /// inference failure; no value is produced for it.
    pub fn evaluate(&self, window: &FeatureWindow) -> Result<Forecast, ForecastError> {
        if let Some(((row, col), _)) = window.values.indexed_iter().find(|(_, v)| !v.is_finite()) {
            let column = window.columns.get(col).map(String::as_str).unwrap_or("?");
            let at = window
                .timestamps
                .get(row)
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default();
            tracing::warn!(column, at = %at, "Missing value in feature window");
            return Err(ForecastError::Inference(format!(
                "missing value for {column} at {at}"
            )));
        }

        let scaled = self.artifacts.normalizer.transform(&window.values)?;
        let value = self.artifacts.model.predict(scaled.view())?;
        let level = self.scheme.classify(value);

        let issued_at = window.end().ok_or_else(|| {
            ForecastError::Inference("feature window has no timestamps".to_string())
        })?;
        let target_time = issued_at + Duration::hours(self.horizon_hours as i64);

        tracing::info!(
            issued_at = %issued_at.to_rfc3339(),
            value,
            level = %level,
            "Forecast evaluated"
        );

        Ok(Forecast {
            issued_at,
            target_time,
            value,
            level,
        })
    }
}
