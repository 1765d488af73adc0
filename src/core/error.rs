//! Error taxonomy for the forecast pipeline.
//!
//! None of these are recovered inside the pipeline. Each one aborts the
//! current render and is surfaced to the user as-is.

use std::path::PathBuf;

/// Errors raised while building a window, scaling it, or running the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Fewer observation rows than the window needs.
    InsufficientData { required: usize, available: usize },
    /// A required feature column is absent from the table.
    MissingColumn(String),
    /// Window column count does not match the fitted normalizer.
    Scaling { expected: usize, actual: usize },
    /// Model shape mismatch or non-finite output.
    Inference(String),
    /// Model or normalizer file does not exist.
    ArtifactNotFound(PathBuf),
    /// Model or normalizer file exists but cannot be used.
    ArtifactInvalid { path: PathBuf, reason: String },
}

impl ForecastError {
    /// Stable machine-readable code, used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ForecastError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            ForecastError::MissingColumn(_) => "MISSING_COLUMN",
            ForecastError::Scaling { .. } => "SCALING_ERROR",
            ForecastError::Inference(_) => "INFERENCE_ERROR",
            ForecastError::ArtifactNotFound(_) => "ARTIFACT_NOT_FOUND",
            ForecastError::ArtifactInvalid { .. } => "ARTIFACT_INVALID",
        }
    }

    /// Whether the error comes from the input table rather than the artifacts.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            ForecastError::InsufficientData { .. } | ForecastError::MissingColumn(_)
        )
    }
}

impl std::fmt::Display for ForecastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastError::InsufficientData {
                required,
                available,
            } => write!(
                f,
                "Insufficient data: {required} observations required, {available} available"
            ),
            ForecastError::MissingColumn(name) => write!(f, "Missing column: {name}"),
            ForecastError::Scaling { expected, actual } => write!(
                f,
                "Scaling error: normalizer fitted on {expected} columns, window has {actual}"
            ),
            ForecastError::Inference(e) => write!(f, "Inference error: {e}"),
            ForecastError::ArtifactNotFound(path) => {
                write!(f, "Artifact not found: {}", path.display())
            }
            ForecastError::ArtifactInvalid { path, reason } => {
                write!(f, "Invalid artifact {}: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for ForecastError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = ForecastError::InsufficientData {
            required: 6,
            available: 2,
        };
        assert_eq!(err.code(), "INSUFFICIENT_DATA");
        assert!(err.is_data_error());

        let err = ForecastError::ArtifactNotFound(PathBuf::from("model.json"));
        assert_eq!(err.code(), "ARTIFACT_NOT_FOUND");
        assert!(!err.is_data_error());
    }

    #[test]
    fn test_display_mentions_counts() {
        let err = ForecastError::Scaling {
            expected: 15,
            actual: 14,
        };
        let msg = err.to_string();
        assert!(msg.contains("15"));
        assert!(msg.contains("14"));
    }
}
