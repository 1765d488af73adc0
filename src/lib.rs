//! AlertAir - short-horizon SO₂ forecast and health alerts for Gabès.
//!
//! This library turns recent hourly air-quality observations into a
//! forecast of the SO₂ concentration a few hours ahead, classifies it
//! into an alert level, and assembles the dashboard view around it.
//!
//! # Pipeline
//!
//! - **Window**: the last 6 hourly rows, projected onto the model's feature
//!   columns
//! - **Scale**: pre-fitted per-column normalization
//! - **Predict**: a stacked LSTM regressor loaded from a JSON artifact
//! - **Classify**: inclusive thresholds mapping the value to a level
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          AlertAir                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │ DataSource  │──▶│  Windowing  │──▶│ Normalizer  │        │
//! │  │ (csv/fixt.) │   │  (6 hours)  │   │  (scale)    │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │                                             │               │
//! │                                             ▼               │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │  Dashboard  │◀──│   Alert     │◀──│  Regressor  │        │
//! │  │    View     │   │  Scheme     │   │   (LSTM)    │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use alertair::{source, Config, DashboardBuilder, ForecastArtifacts, Forecaster};
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let artifacts = ForecastArtifacts::load(&config.model_path, &config.scaler_path)
//!     .expect("artifacts present");
//! let forecaster = Forecaster::new(
//!     Arc::new(artifacts),
//!     config.alert.clone(),
//!     config.feature_columns.clone(),
//!     config.horizon_hours,
//! );
//!
//! let table = source::from_config(&config).unwrap().load().unwrap();
//! let forecast = forecaster.forecast(&table).unwrap();
//! let view = DashboardBuilder::new(&config).unwrap().build(&table, &forecast);
//! println!("{}", alertair::dashboard::render_text(&view));
//! ```

pub mod config;
pub mod core;
pub mod dashboard;
pub mod source;
pub mod tally;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, SiteConfig, SourceConfig};
pub use core::{
    AlertLevel, AlertScheme, Forecast, ForecastArtifacts, ForecastError, Forecaster,
    ObservationTable,
};
pub use dashboard::{DashboardBuilder, DashboardView};
pub use source::{DataSource, SourceError};
pub use tally::{RenderTally, SharedRenderTally, TallyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Notice shown on every dashboard render.
pub const DEMO_NOTICE: &str =
    "Système en phase de démonstration : les alertes ne sont pas réellement envoyées.";
