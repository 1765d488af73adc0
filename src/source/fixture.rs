//! Deterministic synthetic observations.
//!
//! The series follows the daily rhythm of an industrial coastal site: SO₂
//! rises with plant activity and onshore wind, with occasional plume
//! episodes. The same seed and end time always produce the same table.

use crate::core::table::ObservationTable;
use crate::source::{derive_features, DataSource, SourceError};
use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use chrono_tz::Tz;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Hours generated ahead of the first emitted row so lag columns are complete.
const WARM_UP_HOURS: usize = 2;

/// Synthetic hourly source.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    hours: usize,
    end: DateTime<Utc>,
    seed: u64,
    timezone: Tz,
}

impl FixtureSource {
    /// `hours` rows ending at `end`, truncated to the hour.
    pub fn new(hours: usize, end: DateTime<Utc>, seed: u64) -> Self {
        Self {
            hours,
            end: end.duration_trunc(Duration::hours(1)).unwrap_or(end),
            seed,
            timezone: chrono_tz::Africa::Tunis,
        }
    }

    /// Timezone used for the calendar features.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Generate the table.
    pub fn generate(&self) -> Result<ObservationTable, SourceError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let total = self.hours + WARM_UP_HOURS;
        let start = self.end - Duration::hours(total.saturating_sub(1) as i64);
        let timestamps: Vec<DateTime<Utc>> = (0..total)
            .map(|i| start + Duration::hours(i as i64))
            .collect();

        let names = [
            "temp",
            "humidity",
            "wind_speed",
            "wind_dir",
            "pressure",
            "precip",
            "so2",
            "nh3",
            "industrial_index",
            "traffic_index",
        ];
        let mut columns: BTreeMap<String, Vec<f64>> = names
            .iter()
            .map(|name| (name.to_string(), Vec::with_capacity(total)))
            .collect();

        let mut pressure = 1013.0;
        let mut plume_hours = 0u32;

        for ts in &timestamps {
            let hour = ts.with_timezone(&self.timezone).hour() as f64;
            let diurnal = (2.0 * PI * (hour - 9.0) / 24.0).sin();

            let temp = 20.0 + 6.0 * diurnal + rng.gen_range(-1.0..1.0);
            let humidity = (65.0 - 15.0 * diurnal + rng.gen_range(-5.0..5.0)).clamp(20.0, 100.0);
            let wind_speed = (3.5 + 2.0 * diurnal + rng.gen_range(-1.0..1.5)).max(0.2);
            // Sea breeze from the east by day, land breeze from the west by night
            let breeze = if diurnal > 0.0 { 90.0 } else { 270.0 };
            let wind_dir = (breeze + rng.gen_range(-40.0..40.0) + 360.0) % 360.0;
            pressure += rng.gen_range(-0.6..0.6);
            let precip = if rng.gen_bool(0.05) {
                rng.gen_range(0.1..4.0)
            } else {
                0.0
            };

            let industrial = (0.6 + 0.3 * (2.0 * PI * (hour - 6.0) / 24.0).sin()
                + rng.gen_range(-0.05..0.05))
            .clamp(0.0, 1.0);
            let rush = (-(hour - 8.0).powi(2) / 4.0).exp() + (-(hour - 18.0).powi(2) / 4.0).exp();
            let traffic = (0.2 + 0.7 * rush + rng.gen_range(-0.05..0.05)).clamp(0.0, 1.0);

            if plume_hours == 0 && rng.gen_bool(0.04) {
                plume_hours = rng.gen_range(2..6);
            }
            let onshore = if (45.0..=135.0).contains(&wind_dir) { 1.4 } else { 1.0 };
            let mut so2 = (35.0 + 90.0 * industrial) * onshore / (0.5 + wind_speed / 4.0)
                + rng.gen_range(-8.0..8.0);
            if plume_hours > 0 {
                so2 += rng.gen_range(120.0..260.0);
                plume_hours -= 1;
            }
            if precip > 0.0 {
                so2 *= 0.7;
            }
            let nh3 = 8.0 + 25.0 * industrial + rng.gen_range(-3.0..3.0);

            let row = [
                temp,
                humidity,
                wind_speed,
                wind_dir,
                pressure,
                precip,
                so2.max(0.0),
                nh3.max(0.0),
                industrial,
                traffic,
            ];
            for (name, value) in names.iter().zip(row) {
                if let Some(values) = columns.get_mut(*name) {
                    values.push(value);
                }
            }
        }

        let mut table = ObservationTable::new(timestamps, columns)?;
        derive_features(&mut table, self.timezone)?;
        Ok(table.tail(self.hours))
    }
}

impl DataSource for FixtureSource {
    fn describe(&self) -> String {
        format!("fixture:{}h seed {}", self.hours, self.seed)
    }

    fn load(&self) -> Result<ObservationTable, SourceError> {
        let table = self.generate()?;
        tracing::info!(rows = table.len(), seed = self.seed, "Generated fixture observations");
        Ok(table)
    }
}
