//! Pre-fitted per-column normalization.
//!
//! The parameters are fitted offline together with the model and stored as
//! JSON next to it. They are read once and never modified afterwards.

use crate::core::error::ForecastError;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-column normalization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Normalizer {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl Normalizer {
    /// Load and validate a normalizer artifact.
    pub fn load(path: &Path) -> Result<Self, ForecastError> {
        if !path.exists() {
            return Err(ForecastError::ArtifactNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| invalid(path, e.to_string()))?;
        let normalizer: Normalizer =
            serde_json::from_str(&content).map_err(|e| invalid(path, e.to_string()))?;
        normalizer.validate().map_err(|reason| invalid(path, reason))?;

        tracing::info!(
            path = %path.display(),
            features = normalizer.n_features(),
            "Loaded normalizer"
        );
        Ok(normalizer)
    }

    /// Number of columns the parameters were fitted on.
    pub fn n_features(&self) -> usize {
        match self {
            Normalizer::Standard { scale, .. } | Normalizer::MinMax { scale, .. } => scale.len(),
        }
    }

    /// Check parameter lengths agree and values are usable.
    pub fn validate(&self) -> Result<(), String> {
        let (offset, scale) = match self {
            Normalizer::Standard { mean, scale } => (mean, scale),
            Normalizer::MinMax { min, scale } => (min, scale),
        };

        if offset.len() != scale.len() {
            return Err(format!(
                "parameter length mismatch: {} offsets, {} scales",
                offset.len(),
                scale.len()
            ));
        }
        if scale.is_empty() {
            return Err("no columns".to_string());
        }
        if offset.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err("non-finite parameter".to_string());
        }
        if matches!(self, Normalizer::Standard { .. }) && scale.iter().any(|s| *s == 0.0) {
            return Err("zero scale".to_string());
        }
        Ok(())
    }

    /// Normalize every column of the block. The input is left untouched.
    pub fn transform(&self, block: &Array2<f64>) -> Result<Array2<f64>, ForecastError> {
        let actual = block.ncols();
        if actual != self.n_features() {
            return Err(ForecastError::Scaling {
                expected: self.n_features(),
                actual,
            });
        }

        let scaled = match self {
            Normalizer::Standard { mean, scale } => {
                let mean = Array1::from(mean.clone());
                let scale = Array1::from(scale.clone());
                (block - &mean) / &scale
            }
            Normalizer::MinMax { min, scale } => {
                let min = Array1::from(min.clone());
                let scale = Array1::from(scale.clone());
                block * &scale + &min
            }
        };

        Ok(scaled)
    }
}

fn invalid(path: &Path, reason: String) -> ForecastError {
    ForecastError::ArtifactInvalid {
        path: PathBuf::from(path),
        reason,
    }
}
