//! Observation sources.
//!
//! A source produces an [`ObservationTable`] on demand. The CSV export is
//! the production source; the fixture source generates a deterministic
//! synthetic series for demos and tests.

pub mod csv;
pub mod fixture;

pub use self::csv::CsvFileSource;
pub use fixture::FixtureSource;

use crate::config::{Config, ConfigError, SourceConfig};
use crate::core::table::{ObservationTable, TableError};
use chrono::{Datelike, Timelike};
use chrono_tz::Tz;

/// Anything that can produce the observation table.
pub trait DataSource: Send + Sync {
    /// Short description for logs and status output.
    fn describe(&self) -> String;

    /// Load the full table.
    fn load(&self) -> Result<ObservationTable, SourceError>;
}

/// Build the source named in the configuration.
pub fn from_config(config: &Config) -> Result<Box<dyn DataSource>, ConfigError> {
    let tz = config.tz()?;
    let source: Box<dyn DataSource> = match &config.source {
        SourceConfig::Csv { path } => Box::new(CsvFileSource::new(
            path.clone(),
            config.column_aliases.clone(),
            tz,
        )),
        SourceConfig::Fixture { hours, seed } => {
            Box::new(FixtureSource::new(*hours, chrono::Utc::now(), *seed).with_timezone(tz))
        }
    };
    tracing::debug!(source = %source.describe(), "Data source selected");
    Ok(source)
}

/// Fill in calendar and lag columns the table does not already carry.
///
/// Calendar features use local time in `tz`; `dayofweek` counts from
/// Monday = 0. Lags shift by rows, leaving NaN where no earlier row exists.
pub fn derive_features(table: &mut ObservationTable, tz: Tz) -> Result<(), TableError> {
    let local: Vec<_> = table
        .timestamps()
        .iter()
        .map(|ts| ts.with_timezone(&tz))
        .collect();

    if !table.has_column("hour") {
        let hours = local.iter().map(|t| t.hour() as f64).collect();
        table.insert_column("hour", hours)?;
    }
    if !table.has_column("dayofweek") {
        let days = local
            .iter()
            .map(|t| t.weekday().num_days_from_monday() as f64)
            .collect();
        table.insert_column("dayofweek", days)?;
    }
    if !table.has_column("is_weekend") {
        let weekend = local
            .iter()
            .map(|t| {
                if t.weekday().num_days_from_monday() >= 5 {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        table.insert_column("is_weekend", weekend)?;
    }

    for (base, prefix) in [("so2", "SO2"), ("nh3", "NH3")] {
        let Some(values) = table.column(base).map(<[f64]>::to_vec) else {
            continue;
        };
        for lag in 1..=2 {
            let name = format!("{prefix}_lag{lag}");
            if !table.has_column(&name) {
                table.insert_column(&name, shift(&values, lag))?;
            }
        }
    }
    Ok(())
}

fn shift(values: &[f64], lag: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| if i >= lag { values[i - lag] } else { f64::NAN })
        .collect()
}

/// Errors raised while loading observations.
#[derive(Debug)]
pub enum SourceError {
    Io(String),
    Parse { line: usize, message: String },
    Table(TableError),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io(e) => write!(f, "IO error: {e}"),
            SourceError::Parse { line, message } => write!(f, "Line {line}: {message}"),
            SourceError::Table(e) => write!(f, "Invalid table: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<TableError> for SourceError {
    fn from(e: TableError) -> Self {
        SourceError::Table(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::BTreeMap;

    #[test]
    fn test_derive_calendar_and_lags() {
        // 2024-06-07 21:00 UTC is Friday 22:00 in Tunis (UTC+1)
        let start: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 6, 7, 21, 0, 0).unwrap();
        let timestamps = (0..4).map(|h| start + Duration::hours(h)).collect();
        let mut columns = BTreeMap::new();
        columns.insert("so2".to_string(), vec![10.0, 20.0, 30.0, 40.0]);
        let mut table = ObservationTable::new(timestamps, columns).unwrap();

        derive_features(&mut table, chrono_tz::Africa::Tunis).unwrap();

        assert_eq!(table.column("hour").unwrap(), &[22.0, 23.0, 0.0, 1.0]);
        assert_eq!(table.column("dayofweek").unwrap(), &[4.0, 4.0, 5.0, 5.0]);
        assert_eq!(table.column("is_weekend").unwrap(), &[0.0, 0.0, 1.0, 1.0]);

        let lag1 = table.column("SO2_lag1").unwrap();
        assert!(lag1[0].is_nan());
        assert_eq!(&lag1[1..], &[10.0, 20.0, 30.0]);
        let lag2 = table.column("SO2_lag2").unwrap();
        assert_eq!(&lag2[2..], &[10.0, 20.0]);
        assert!(!table.has_column("NH3_lag1"));
    }

    #[test]
    fn test_derive_keeps_existing_columns() {
        let start: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap();
        let mut columns = BTreeMap::new();
        columns.insert("hour".to_string(), vec![99.0]);
        let mut table = ObservationTable::new(vec![start], columns).unwrap();

        derive_features(&mut table, chrono_tz::UTC).unwrap();
        assert_eq!(table.column("hour").unwrap(), &[99.0]);
    }

    #[test]
    fn test_from_config_fixture() {
        let config = Config {
            source: SourceConfig::Fixture { hours: 12, seed: 1 },
            ..Config::default()
        };
        let source = from_config(&config).unwrap();
        assert!(source.describe().contains("fixture"));
        assert_eq!(source.load().unwrap().len(), 12);
    }
}
