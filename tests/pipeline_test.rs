//! End-to-end tests of the forecast pipeline

use alertair::config::{Config, SourceConfig, DEFAULT_FEATURE_COLUMNS};
use alertair::core::model::{Activation, DenseLayerSpec, LstmLayerSpec, LstmModelSpec};
use alertair::core::{
    backtest, AlertLevel, AlertScheme, ForecastArtifacts, ForecastError, Forecaster,
    LstmRegressor, Normalizer, QualityReport, WINDOW_LEN,
};
use alertair::dashboard::{render_text, DashboardBuilder};
use alertair::source::{self, CsvFileSource, DataSource, FixtureSource};
use chrono::{Duration, TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Arc;

fn manifest_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

fn feature_columns() -> Vec<String> {
    DEFAULT_FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Small LSTM whose output tracks the scaled SO2_lag1 feature.
fn in_memory_artifacts() -> ForecastArtifacts {
    let features = DEFAULT_FEATURE_COLUMNS.len();
    let units = 2;
    let mut kernel = vec![vec![0.0; 4 * units]; features];
    // Cell gate input from SO2_lag1
    kernel[9][2 * units] = 1.0;
    let spec = LstmModelSpec {
        timesteps: WINDOW_LEN,
        features,
        lstm: vec![LstmLayerSpec {
            units,
            kernel,
            recurrent_kernel: vec![vec![0.0; 4 * units]; units],
            bias: vec![0.0; 4 * units],
        }],
        dense: vec![DenseLayerSpec {
            weights: vec![vec![120.0], vec![0.0]],
            bias: vec![90.0],
            activation: Activation::Linear,
        }],
    };
    let model = LstmRegressor::from_spec(spec).unwrap();
    let mut mean = vec![0.0; features];
    let mut scale = vec![1.0; features];
    mean[9] = 90.0;
    scale[9] = 60.0;
    let normalizer = Normalizer::Standard { mean, scale };
    ForecastArtifacts::from_parts(normalizer, Box::new(model))
}

fn forecaster(scheme: AlertScheme) -> Forecaster {
    let artifacts = in_memory_artifacts();
    artifacts.validate().unwrap();
    Forecaster::new(Arc::new(artifacts), scheme, feature_columns(), 3)
}

#[test]
fn test_fixture_forecast_end_to_end() {
    let end = Utc.with_ymd_and_hms(2024, 8, 20, 9, 0, 0).unwrap();
    let table = FixtureSource::new(72, end, 11).load().unwrap();
    let forecaster = forecaster(AlertScheme::default());

    let forecast = forecaster.forecast(&table).unwrap();
    assert!(forecast.value.is_finite());
    assert_eq!(forecast.issued_at, end);
    assert_eq!(forecast.target_time, end + Duration::hours(3));
    assert_eq!(forecast.level, forecaster.scheme().classify(forecast.value));

    let view = DashboardBuilder::new(&Config::default())
        .unwrap()
        .build(&table, &forecast);
    assert_eq!(view.history.len(), 24);
    assert_eq!(view.alert.level, forecast.level);
    assert!(render_text(&view).contains(&view.alert.headline));
}

#[test]
fn test_same_inputs_same_forecast() {
    let end = Utc.with_ymd_and_hms(2024, 8, 20, 9, 0, 0).unwrap();
    let table = FixtureSource::new(24, end, 5).load().unwrap();
    let forecaster = forecaster(AlertScheme::default());
    let first = forecaster.forecast(&table).unwrap();
    let second = forecaster.forecast(&table).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_short_history_is_insufficient_data() {
    let end = Utc.with_ymd_and_hms(2024, 8, 20, 9, 0, 0).unwrap();
    let table = FixtureSource::new(5, end, 5).load().unwrap();
    let err = forecaster(AlertScheme::default())
        .forecast(&table)
        .unwrap_err();
    assert_eq!(
        err,
        ForecastError::InsufficientData {
            required: WINDOW_LEN,
            available: 5
        }
    );
}

#[test]
fn test_four_level_scheme_reaches_orange() {
    let forecaster = forecaster(AlertScheme::who_four_level());
    let end = Utc.with_ymd_and_hms(2024, 8, 20, 9, 0, 0).unwrap();
    let mut table = FixtureSource::new(24, end, 2).load().unwrap();

    // A steady SO2_lag1 at the normalizer mean keeps the cell at zero: 90 µg/m³.
    table.insert_column("SO2_lag1", vec![90.0; 24]).unwrap();
    let forecast = forecaster.forecast(&table).unwrap();
    assert!((forecast.value - 90.0).abs() < 1e-9);
    assert_eq!(forecast.level, AlertLevel::Orange);

    table.insert_column("SO2_lag1", vec![0.0; 24]).unwrap();
    assert_eq!(forecaster.forecast(&table).unwrap().level, AlertLevel::Yellow);

    table.insert_column("SO2_lag1", vec![300.0; 24]).unwrap();
    assert_eq!(forecaster.forecast(&table).unwrap().level, AlertLevel::Red);
}

#[test]
fn test_shortest_fixture_forecasts() {
    let end = Utc.with_ymd_and_hms(2024, 8, 20, 9, 0, 0).unwrap();
    let table = FixtureSource::new(WINDOW_LEN, end, 1).load().unwrap();
    let forecast = forecaster(AlertScheme::default()).forecast(&table).unwrap();
    assert!(forecast.value.is_finite());
}

#[test]
fn test_backtest_on_fixture() {
    let end = Utc.with_ymd_and_hms(2024, 8, 20, 9, 0, 0).unwrap();
    let table = FixtureSource::new(96, end, 3).load().unwrap();
    let report = backtest(&forecaster(AlertScheme::default()), &table, "so2", None)
        .unwrap()
        .unwrap();

    // The first full window ends at row 5; the last 3 rows have no target.
    assert_eq!(report.sample_size, 96 - (WINDOW_LEN - 1) - 3);
    assert!(report.rmse >= report.mae);
    assert!(report.level_agreement >= 0.0 && report.level_agreement <= 1.0);
    let counted: u64 = report.predicted_levels.values().sum();
    assert_eq!(counted as usize, report.sample_size);
}

#[test]
fn test_bundled_sample_data_and_artifacts() {
    let config = Config::default();
    let artifacts = ForecastArtifacts::load(
        &manifest_path("artifacts/model_so2_3h.json"),
        &manifest_path("artifacts/scaler_so2_3h.json"),
    )
    .unwrap();
    let forecaster = Forecaster::new(
        Arc::new(artifacts),
        config.alert.clone(),
        config.feature_columns.clone(),
        config.horizon_hours,
    );

    let source = CsvFileSource::new(
        manifest_path("data/gabes_air_quality.csv"),
        config.column_aliases.clone(),
        config.tz().unwrap(),
    );
    let table = source.load().unwrap();
    assert_eq!(table.len(), 48);

    let report = QualityReport::inspect(&table, &config.feature_columns, &config.target_column);
    assert!(report.valid, "{}", report.summary());
    assert_eq!(report.missing_cells["so2"], 1);

    let forecast = forecaster.forecast(&table).unwrap();
    assert!(forecast.value.is_finite());
    assert_eq!(forecast.level, config.alert.classify(forecast.value));
}

#[test]
fn test_bundled_artifacts_reject_window_with_missing_cell() {
    let config = Config::default();
    let artifacts = ForecastArtifacts::load(
        &manifest_path("artifacts/model_so2_3h.json"),
        &manifest_path("artifacts/scaler_so2_3h.json"),
    )
    .unwrap();
    let forecaster = Forecaster::new(
        Arc::new(artifacts),
        config.alert.clone(),
        config.feature_columns.clone(),
        config.horizon_hours,
    );
    let table = CsvFileSource::new(
        manifest_path("data/gabes_air_quality.csv"),
        config.column_aliases.clone(),
        config.tz().unwrap(),
    )
    .load()
    .unwrap();

    // The blank SO2 cell at row 17 feeds the lags of rows 18 and 19.
    let partial = table.head(20);
    assert!(partial.column("SO2_lag1").unwrap()[18].is_nan());
    let err = forecaster.forecast(&partial).unwrap_err();
    assert_eq!(err.code(), "INFERENCE_ERROR");
}

#[test]
fn test_missing_artifact_is_reported() {
    let err = ForecastArtifacts::load(
        &manifest_path("artifacts/no_such_model.json"),
        &manifest_path("artifacts/scaler_so2_3h.json"),
    )
    .err()
    .unwrap();
    assert_eq!(err.code(), "ARTIFACT_NOT_FOUND");
}

#[test]
fn test_source_from_config() {
    let config = Config {
        source: SourceConfig::Fixture { hours: 30, seed: 9 },
        ..Config::default()
    };
    let table = source::from_config(&config).unwrap().load().unwrap();
    assert_eq!(table.len(), 30);
    for column in DEFAULT_FEATURE_COLUMNS {
        assert!(table.has_column(column));
    }
}
