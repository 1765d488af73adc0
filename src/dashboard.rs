//! Dashboard display model and terminal rendering.
//!
//! A [`DashboardView`] is everything one render of the dashboard shows: the
//! recent SO₂ history, the forecast point, the alert banner and the legend,
//! plus the current SO₂/NH₃ levels and their overall AQI.
//! It serializes to JSON for the HTTP endpoint and renders to text for the
//! CLI.

use crate::config::{Config, ConfigError, SiteConfig};
use crate::core::alert::{AlertMessage, AlertScheme, CurrentAlert, LegendEntry, PollutantSchemes};
use crate::core::aqi::{overall, sub_index, AqiReading, OverallAqi, Pollutant};
use crate::core::pipeline::Forecast;
use crate::core::table::ObservationTable;
use crate::DEMO_NOTICE;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const LOCAL_FORMAT: &str = "%d/%m/%Y %H:%M";
const BAR_WIDTH: usize = 40;

/// One observed point of the history series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub local_time: String,
    /// None where the reading is missing
    pub value: Option<f64>,
}

/// The forecast marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub target_time: DateTime<Utc>,
    pub local_time: String,
    pub value: f64,
    pub horizon_hours: u32,
}

/// Everything shown by one dashboard render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardView {
    pub render_id: String,
    pub site: SiteConfig,
    pub pollutant: String,
    pub last_updated_utc: DateTime<Utc>,
    pub last_updated_local: String,
    pub history: Vec<SeriesPoint>,
    pub forecast: ForecastPoint,
    pub alert: AlertMessage,
    /// Banner color of the alert level
    pub color: String,
    /// Sub-index of the forecast value
    pub aqi: AqiReading,
    /// Latest observed level of each pollutant present in the table
    pub current: Vec<CurrentAlert>,
    /// Overall index of the latest observed readings
    pub current_aqi: Option<OverallAqi>,
    pub legend: Vec<LegendEntry>,
    pub notice: String,
}

/// Assembles views from a table and its forecast.
pub struct DashboardBuilder {
    site: SiteConfig,
    target_column: String,
    history_hours: usize,
    scheme: AlertScheme,
    current_schemes: PollutantSchemes,
    timezone: Tz,
}

impl DashboardBuilder {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            site: config.site.clone(),
            target_column: config.target_column.clone(),
            history_hours: config.history_hours,
            scheme: config.alert.clone(),
            current_schemes: config.current_alerts.clone(),
            timezone: config.tz()?,
        })
    }

    /// Build the view. The history is the last `history_hours` target
    /// readings; the forecast sits `horizon` hours after the last one.
    pub fn build(&self, table: &ObservationTable, forecast: &Forecast) -> DashboardView {
        let recent = table.tail(self.history_hours);
        let history = match recent.column(&self.target_column) {
            Some(values) => recent
                .timestamps()
                .iter()
                .zip(values)
                .map(|(ts, value)| SeriesPoint {
                    timestamp: *ts,
                    local_time: self.local(*ts),
                    value: value.is_finite().then_some(*value),
                })
                .collect(),
            None => {
                tracing::warn!(column = %self.target_column, "Target column absent, history empty");
                Vec::new()
            }
        };

        let current: Vec<CurrentAlert> = Pollutant::ALL
            .iter()
            .filter_map(|&pollutant| {
                latest_reading(&recent, pollutant.column())
                    .map(|value| self.current_schemes.check(pollutant, value))
            })
            .collect();
        let readings: Vec<(Pollutant, f64)> =
            current.iter().map(|c| (c.pollutant, c.value)).collect();

        let horizon_hours = (forecast.target_time - forecast.issued_at).num_hours().max(0) as u32;
        let pollutant = Pollutant::from_column(&self.target_column).unwrap_or(Pollutant::So2);

        DashboardView {
            render_id: Uuid::new_v4().to_string(),
            site: self.site.clone(),
            pollutant: self.target_column.clone(),
            last_updated_utc: forecast.issued_at,
            last_updated_local: self.local(forecast.issued_at),
            history,
            forecast: ForecastPoint {
                target_time: forecast.target_time,
                local_time: self.local(forecast.target_time),
                value: forecast.value,
                horizon_hours,
            },
            alert: AlertMessage::for_forecast(forecast.level, forecast.value, horizon_hours),
            color: forecast.level.color().to_string(),
            aqi: sub_index(pollutant, forecast.value),
            current_aqi: overall(&readings),
            current,
            legend: self.scheme.legend(),
            notice: DEMO_NOTICE.to_string(),
        }
    }

    fn local(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.timezone).format(LOCAL_FORMAT).to_string()
    }
}

/// Most recent finite value of a column.
fn latest_reading(table: &ObservationTable, column: &str) -> Option<f64> {
    table
        .column(column)?
        .iter()
        .rev()
        .find(|v| v.is_finite())
        .copied()
}

/// Render a view for the terminal.
pub fn render_text(view: &DashboardView) -> String {
    let mut out = String::new();
    let rule = "=".repeat(60);

    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!(
        "[{}] {}\n",
        view.alert.level.label(),
        view.alert.headline
    ));
    out.push_str(&format!("{}\n", view.alert.detail));
    out.push_str(&format!("{rule}\n\n"));

    out.push_str(&format!(
        "Site: {} ({:.2}, {:.2})\n",
        view.site.name, view.site.latitude, view.site.longitude
    ));
    out.push_str(&format!("Last update: {}\n", view.last_updated_local));
    out.push_str(&format!(
        "AQI ({} forecast): {:.0} - {}\n",
        view.pollutant,
        view.aqi.value,
        view.aqi.band.label()
    ));

    if !view.current.is_empty() {
        out.push_str("Current levels:\n");
        for alert in &view.current {
            out.push_str(&format!(
                "  {:<4} {:>7.1} µg/m³  [{}]\n",
                alert.pollutant.label(),
                alert.value,
                alert.level.label()
            ));
            if alert.is_raised() {
                out.push_str(&format!("       {}\n", alert.message));
            }
        }
    }
    if let Some(aqi) = &view.current_aqi {
        out.push_str(&format!(
            "AQI (current): {:.0} - {}, dominant {}\n",
            aqi.value,
            aqi.band.label(),
            aqi.dominant.label()
        ));
        out.push_str(&format!("  {}\n", aqi.health_message));
        out.push_str(&format!("  General: {}\n", aqi.recommendations.general));
        out.push_str(&format!("  Sensitive: {}\n", aqi.recommendations.sensitive));
        out.push_str(&format!("  Outdoor: {}\n", aqi.recommendations.outdoor));
    }
    out.push('\n');

    out.push_str("Thresholds:\n");
    for entry in &view.legend {
        out.push_str(&format!("  {:<10} {}\n", entry.name, entry.range));
    }
    out.push('\n');

    let max = view
        .history
        .iter()
        .filter_map(|p| p.value)
        .chain(std::iter::once(view.forecast.value))
        .fold(0.0f64, f64::max);
    let bar = |value: f64| -> String {
        if max <= 0.0 {
            return String::new();
        }
        let len = ((value.max(0.0) / max) * BAR_WIDTH as f64).round() as usize;
        "#".repeat(len)
    };

    out.push_str(&format!("{} (µg/m³), last {} h:\n", view.pollutant, view.history.len()));
    for point in &view.history {
        let time = point.local_time.rsplit(' ').next().unwrap_or(&point.local_time);
        match point.value {
            Some(value) => out.push_str(&format!("  {time} | {:<40} {value:.1}\n", bar(value))),
            None => out.push_str(&format!("  {time} | {:<40} --\n", "")),
        }
    }
    let time = view
        .forecast
        .local_time
        .rsplit(' ')
        .next()
        .unwrap_or(&view.forecast.local_time);
    out.push_str(&format!(
        "  {time} * {:<40} {:.1}  (+{}h forecast)\n\n",
        bar(view.forecast.value),
        view.forecast.value,
        view.forecast.horizon_hours
    ));

    out.push_str(&format!("{}\n", view.notice));
    out
}
