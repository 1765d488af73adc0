//! Alert classification of a forecast concentration.
//!
//! A scheme is an ordered list of bands. Each band's bound is inclusive: a
//! value exactly on a bound belongs to the higher band.

use crate::core::aqi::Pollutant;
use serde::{Deserialize, Serialize};

/// SO₂ concentration at which the default scheme turns yellow (µg/m³).
pub const SO2_ALERT_YELLOW: f64 = 100.0;

/// SO₂ concentration at which the default scheme turns red (µg/m³).
pub const SO2_ALERT_RED: f64 = 250.0;

/// Alert level, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Green,
    Yellow,
    Orange,
    Red,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 4] = [
        AlertLevel::Green,
        AlertLevel::Yellow,
        AlertLevel::Orange,
        AlertLevel::Red,
    ];

    /// Banner color.
    pub fn color(&self) -> &'static str {
        match self {
            AlertLevel::Green => "#2e7d32",
            AlertLevel::Yellow => "#f9a825",
            AlertLevel::Orange => "#ef6c00",
            AlertLevel::Red => "#c62828",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlertLevel::Green => "GREEN",
            AlertLevel::Yellow => "YELLOW",
            AlertLevel::Orange => "ORANGE",
            AlertLevel::Red => "RED",
        }
    }

    /// Short French name used in the threshold legend.
    pub fn legend_name(&self) -> &'static str {
        match self {
            AlertLevel::Green => "Normal",
            AlertLevel::Yellow => "Vigilance",
            AlertLevel::Orange => "Élevé",
            AlertLevel::Red => "Alerte",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A level and the concentration from which it applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertBand {
    pub level: AlertLevel,
    pub lower_bound: f64,
}

/// Thresholds mapping a concentration to an alert level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertScheme {
    /// Bands above green, ascending by bound
    pub bands: Vec<AlertBand>,
}

impl Default for AlertScheme {
    /// Three levels: yellow from 100 µg/m³, red from 250 µg/m³.
    fn default() -> Self {
        Self {
            bands: vec![
                AlertBand {
                    level: AlertLevel::Yellow,
                    lower_bound: SO2_ALERT_YELLOW,
                },
                AlertBand {
                    level: AlertLevel::Red,
                    lower_bound: SO2_ALERT_RED,
                },
            ],
        }
    }
}

impl AlertScheme {
    /// Four-level WHO-derived SO₂ scheme: yellow 20, orange 50, red 100.
    pub fn who_four_level() -> Self {
        Self {
            bands: vec![
                AlertBand {
                    level: AlertLevel::Yellow,
                    lower_bound: 20.0,
                },
                AlertBand {
                    level: AlertLevel::Orange,
                    lower_bound: 50.0,
                },
                AlertBand {
                    level: AlertLevel::Red,
                    lower_bound: 100.0,
                },
            ],
        }
    }

    /// WHO-derived NH₃ scheme for current readings: yellow 30, orange 60,
    /// red 120.
    pub fn who_nh3() -> Self {
        Self {
            bands: vec![
                AlertBand {
                    level: AlertLevel::Yellow,
                    lower_bound: 30.0,
                },
                AlertBand {
                    level: AlertLevel::Orange,
                    lower_bound: 60.0,
                },
                AlertBand {
                    level: AlertLevel::Red,
                    lower_bound: 120.0,
                },
            ],
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "default" | "three-level" => Some(Self::default()),
            "who" | "four-level" => Some(Self::who_four_level()),
            "who-nh3" => Some(Self::who_nh3()),
            _ => None,
        }
    }

    /// Bounds must be finite and strictly increasing, levels strictly rising
    /// above green.
    pub fn validate(&self) -> Result<(), String> {
        let mut previous: Option<&AlertBand> = None;
        for band in &self.bands {
            if !band.lower_bound.is_finite() {
                return Err(format!("{} bound is not finite", band.level));
            }
            if band.level == AlertLevel::Green {
                return Err("green is the implicit base level".to_string());
            }
            if let Some(prev) = previous {
                if band.lower_bound <= prev.lower_bound {
                    return Err(format!(
                        "{} bound {} must exceed {} bound {}",
                        band.level, band.lower_bound, prev.level, prev.lower_bound
                    ));
                }
                if band.level <= prev.level {
                    return Err(format!("{} listed after {}", band.level, prev.level));
                }
            }
            previous = Some(band);
        }
        Ok(())
    }

    /// Level for a concentration.
    pub fn classify(&self, value: f64) -> AlertLevel {
        self.bands
            .iter()
            .rev()
            .find(|band| value >= band.lower_bound)
            .map(|band| band.level)
            .unwrap_or(AlertLevel::Green)
    }

    /// Levels this scheme can produce, ascending.
    pub fn levels(&self) -> Vec<AlertLevel> {
        std::iter::once(AlertLevel::Green)
            .chain(self.bands.iter().map(|b| b.level))
            .collect()
    }

    /// Legend entries: each level with the range it covers.
    pub fn legend(&self) -> Vec<LegendEntry> {
        let mut entries = Vec::with_capacity(self.bands.len() + 1);
        let first_bound = self.bands.first().map(|b| b.lower_bound);
        entries.push(LegendEntry {
            level: AlertLevel::Green,
            name: AlertLevel::Green.legend_name().to_string(),
            color: AlertLevel::Green.color().to_string(),
            range: match first_bound {
                Some(bound) => format!("< {bound} µg/m³"),
                None => "toutes valeurs".to_string(),
            },
        });
        for band in &self.bands {
            entries.push(LegendEntry {
                level: band.level,
                name: band.level.legend_name().to_string(),
                color: band.level.color().to_string(),
                range: format!("≥ {} µg/m³", band.lower_bound),
            });
        }
        entries
    }
}

/// Classify an SO₂ forecast with the default three-level scheme.
pub fn classify_so2(value: f64) -> AlertLevel {
    if value >= SO2_ALERT_RED {
        AlertLevel::Red
    } else if value >= SO2_ALERT_YELLOW {
        AlertLevel::Yellow
    } else {
        AlertLevel::Green
    }
}

/// One line of the threshold legend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub level: AlertLevel,
    pub name: String,
    pub color: String,
    pub range: String,
}

/// The banner shown for a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub level: AlertLevel,
    pub headline: String,
    pub detail: String,
}

impl AlertMessage {
    /// Banner text for a forecast value at the given horizon.
    pub fn for_forecast(level: AlertLevel, value: f64, horizon_hours: u32) -> Self {
        let headline = match level {
            AlertLevel::Green => "Qualité de l'air normale",
            AlertLevel::Yellow => "Vigilance accrue",
            AlertLevel::Orange => "Concentration de SO₂ élevée",
            AlertLevel::Red => "ALERTE SANITAIRE",
        };
        let advice = match level {
            AlertLevel::Green => "Profitez de vos activités en plein air.",
            AlertLevel::Yellow => {
                "Les personnes sensibles devraient limiter les activités prolongées en extérieur."
            }
            AlertLevel::Orange => {
                "Évitez les activités prolongées en extérieur. Personnes sensibles : restez à l'intérieur."
            }
            AlertLevel::Red => {
                "Restez à l'intérieur. Fermez les fenêtres. Évitez toute exposition."
            }
        };

        Self {
            level,
            headline: headline.to_string(),
            detail: format!(
                "SO₂ prévu à {value:.1} µg/m³ dans {horizon_hours}h. {advice}"
            ),
        }
    }
}

/// Thresholds applied to the latest observed reading of each pollutant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollutantSchemes {
    pub so2: AlertScheme,
    pub nh3: AlertScheme,
}

impl Default for PollutantSchemes {
    fn default() -> Self {
        Self {
            so2: AlertScheme::who_four_level(),
            nh3: AlertScheme::who_nh3(),
        }
    }
}

impl PollutantSchemes {
    pub fn get(&self, pollutant: Pollutant) -> &AlertScheme {
        match pollutant {
            Pollutant::So2 => &self.so2,
            Pollutant::Nh3 => &self.nh3,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for pollutant in Pollutant::ALL {
            self.get(pollutant)
                .validate()
                .map_err(|e| format!("{}: {e}", pollutant.column()))?;
        }
        Ok(())
    }

    /// Classify one observed concentration.
    pub fn check(&self, pollutant: Pollutant, value: f64) -> CurrentAlert {
        let level = self.get(pollutant).classify(value);
        CurrentAlert {
            pollutant,
            value,
            level,
            message: current_message(pollutant, level, value),
        }
    }
}

/// Level of a pollutant as currently observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentAlert {
    pub pollutant: Pollutant,
    pub value: f64,
    pub level: AlertLevel,
    pub message: String,
}

impl CurrentAlert {
    /// Green readings raise nothing.
    pub fn is_raised(&self) -> bool {
        self.level > AlertLevel::Green
    }
}

fn current_message(pollutant: Pollutant, level: AlertLevel, value: f64) -> String {
    let name = pollutant.label();
    match (level, pollutant) {
        (AlertLevel::Green, _) => format!("Concentration de {name} normale ({value:.1} µg/m³)."),
        (AlertLevel::Yellow, Pollutant::So2) => format!(
            "Concentration de {name} modérée ({value:.1} µg/m³). Les personnes sensibles devraient limiter les activités prolongées en extérieur."
        ),
        (AlertLevel::Yellow, Pollutant::Nh3) => format!(
            "Concentration de {name} modérée ({value:.1} µg/m³). Surveillance recommandée pour les personnes sensibles."
        ),
        (AlertLevel::Orange, Pollutant::So2) => format!(
            "Concentration de {name} élevée ({value:.1} µg/m³). Évitez les activités prolongées en extérieur. Personnes sensibles : restez à l'intérieur."
        ),
        (AlertLevel::Orange, Pollutant::Nh3) => format!(
            "Concentration de {name} élevée ({value:.1} µg/m³). Limitez l'exposition. Risque pour les voies respiratoires."
        ),
        (AlertLevel::Red, Pollutant::So2) => format!(
            "ALERTE ROUGE : concentration de {name} dangereuse ({value:.1} µg/m³). Restez à l'intérieur. Fermez les fenêtres. Évitez toute exposition."
        ),
        (AlertLevel::Red, Pollutant::Nh3) => format!(
            "ALERTE ROUGE : concentration de {name} dangereuse ({value:.1} µg/m³). Risque sanitaire grave. Évacuez si possible."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scheme_boundaries() {
        let scheme = AlertScheme::default();
        let cases = [
            (99.9, AlertLevel::Green),
            (100.0, AlertLevel::Yellow),
            (100.1, AlertLevel::Yellow),
            (249.9, AlertLevel::Yellow),
            (250.0, AlertLevel::Red),
            (250.1, AlertLevel::Red),
        ];
        for (value, expected) in cases {
            assert_eq!(scheme.classify(value), expected, "value {value}");
            assert_eq!(classify_so2(value), expected, "value {value}");
        }
    }

    #[test]
    fn test_negative_and_zero_are_green() {
        let scheme = AlertScheme::default();
        assert_eq!(scheme.classify(0.0), AlertLevel::Green);
        assert_eq!(scheme.classify(-12.0), AlertLevel::Green);
    }

    #[test]
    fn test_four_level_scheme() {
        let scheme = AlertScheme::who_four_level();
        assert!(scheme.validate().is_ok());
        assert_eq!(scheme.classify(19.99), AlertLevel::Green);
        assert_eq!(scheme.classify(20.0), AlertLevel::Yellow);
        assert_eq!(scheme.classify(50.0), AlertLevel::Orange);
        assert_eq!(scheme.classify(100.0), AlertLevel::Red);
        assert_eq!(scheme.levels().len(), 4);
    }

    #[test]
    fn test_validate_rejects_unordered_bounds() {
        let scheme = AlertScheme {
            bands: vec![
                AlertBand {
                    level: AlertLevel::Yellow,
                    lower_bound: 250.0,
                },
                AlertBand {
                    level: AlertLevel::Red,
                    lower_bound: 100.0,
                },
            ],
        };
        assert!(scheme.validate().is_err());

        let scheme = AlertScheme {
            bands: vec![AlertBand {
                level: AlertLevel::Green,
                lower_bound: 0.0,
            }],
        };
        assert!(scheme.validate().is_err());
    }

    #[test]
    fn test_presets() {
        assert_eq!(AlertScheme::preset("default"), Some(AlertScheme::default()));
        assert_eq!(
            AlertScheme::preset("WHO"),
            Some(AlertScheme::who_four_level())
        );
        assert_eq!(AlertScheme::preset("unknown"), None);
    }

    #[test]
    fn test_legend() {
        let legend = AlertScheme::default().legend();
        assert_eq!(legend.len(), 3);
        assert_eq!(legend[0].level, AlertLevel::Green);
        assert!(legend[0].range.contains("< 100"));
        assert!(legend[2].range.contains("250"));
    }

    #[test]
    fn test_message_text() {
        let msg = AlertMessage::for_forecast(AlertLevel::Red, 312.46, 3);
        assert_eq!(msg.headline, "ALERTE SANITAIRE");
        assert!(msg.detail.contains("312.5 µg/m³"));
        assert!(msg.detail.contains("dans 3h"));
    }

    #[test]
    fn test_current_levels_per_pollutant() {
        let schemes = PollutantSchemes::default();
        assert!(schemes.validate().is_ok());

        // NH3 tolerates more than SO2 before each level
        let so2 = schemes.check(Pollutant::So2, 55.0);
        assert_eq!(so2.level, AlertLevel::Orange);
        assert!(so2.message.contains("SO₂ élevée (55.0 µg/m³)"));
        let nh3 = schemes.check(Pollutant::Nh3, 45.0);
        assert_eq!(nh3.level, AlertLevel::Yellow);
        assert!(nh3.message.contains("Surveillance recommandée"));

        assert_eq!(schemes.check(Pollutant::Nh3, 29.9).level, AlertLevel::Green);
        assert!(!schemes.check(Pollutant::Nh3, 29.9).is_raised());
        assert_eq!(schemes.check(Pollutant::Nh3, 120.0).level, AlertLevel::Red);
        assert!(schemes.check(Pollutant::So2, 100.0).message.starts_with("ALERTE ROUGE"));
    }

    #[test]
    fn test_level_ordering() {
        assert!(AlertLevel::Green < AlertLevel::Yellow);
        assert!(AlertLevel::Orange < AlertLevel::Red);
        assert_eq!(AlertLevel::Yellow.to_string(), "YELLOW");
    }
}
