//! Air Quality Index sub-indices.
//!
//! Piecewise-linear interpolation between concentration breakpoints, as in
//! the US EPA method. Concentrations beyond the last breakpoint saturate at
//! the maximum index. The overall index of a set of readings is the highest
//! sub-index; the pollutant that sets it is the dominant one.

use serde::{Deserialize, Serialize};

/// Index returned for concentrations above every breakpoint.
pub const AQI_MAX: f64 = 500.0;

/// `[c_low, c_high, i_low, i_high]`
type Breakpoint = [f64; 4];

/// SO₂ breakpoints (µg/m³).
const SO2_BREAKPOINTS: [Breakpoint; 6] = [
    [0.0, 20.0, 0.0, 50.0],
    [20.0, 50.0, 51.0, 100.0],
    [50.0, 100.0, 101.0, 150.0],
    [100.0, 200.0, 151.0, 200.0],
    [200.0, 500.0, 201.0, 300.0],
    [500.0, 1000.0, 301.0, 500.0],
];

/// NH₃ breakpoints (µg/m³).
const NH3_BREAKPOINTS: [Breakpoint; 6] = [
    [0.0, 30.0, 0.0, 50.0],
    [30.0, 60.0, 51.0, 100.0],
    [60.0, 120.0, 101.0, 150.0],
    [120.0, 200.0, 151.0, 200.0],
    [200.0, 400.0, 201.0, 300.0],
    [400.0, 800.0, 301.0, 500.0],
];

/// Pollutants with a breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pollutant {
    So2,
    Nh3,
}

impl Pollutant {
    pub const ALL: [Pollutant; 2] = [Pollutant::So2, Pollutant::Nh3];

    /// Canonical table column.
    pub fn column(&self) -> &'static str {
        match self {
            Pollutant::So2 => "so2",
            Pollutant::Nh3 => "nh3",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Pollutant::So2 => "SO₂",
            Pollutant::Nh3 => "NH₃",
        }
    }

    /// Match a column name such as `so2` or `NH3_ug_m3`.
    pub fn from_column(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.starts_with("so2") {
            Some(Pollutant::So2)
        } else if lower.starts_with("nh3") {
            Some(Pollutant::Nh3)
        } else {
            None
        }
    }

    fn breakpoints(&self) -> &'static [Breakpoint] {
        match self {
            Pollutant::So2 => &SO2_BREAKPOINTS,
            Pollutant::Nh3 => &NH3_BREAKPOINTS,
        }
    }
}

/// AQI health band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiBand {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiBand {
    pub fn from_index(aqi: f64) -> Self {
        if aqi <= 50.0 {
            AqiBand::Good
        } else if aqi <= 100.0 {
            AqiBand::Moderate
        } else if aqi <= 150.0 {
            AqiBand::UnhealthySensitive
        } else if aqi <= 200.0 {
            AqiBand::Unhealthy
        } else if aqi <= 300.0 {
            AqiBand::VeryUnhealthy
        } else {
            AqiBand::Hazardous
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            AqiBand::Good => "#00E400",
            AqiBand::Moderate => "#FFFF00",
            AqiBand::UnhealthySensitive => "#FF7E00",
            AqiBand::Unhealthy => "#FF0000",
            AqiBand::VeryUnhealthy => "#8F3F97",
            AqiBand::Hazardous => "#7E0023",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiBand::Good => "Good",
            AqiBand::Moderate => "Moderate",
            AqiBand::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            AqiBand::Unhealthy => "Unhealthy",
            AqiBand::VeryUnhealthy => "Very Unhealthy",
            AqiBand::Hazardous => "Hazardous",
        }
    }

    /// French health message shown with the index.
    pub fn health_message(&self) -> &'static str {
        match self {
            AqiBand::Good => {
                "La qualité de l'air est satisfaisante. Profitez de vos activités en plein air."
            }
            AqiBand::Moderate => {
                "Qualité de l'air acceptable. Personnes sensibles : limitez les efforts prolongés."
            }
            AqiBand::UnhealthySensitive => {
                "Les personnes sensibles peuvent ressentir des effets. Limitez les activités extérieures prolongées."
            }
            AqiBand::Unhealthy => {
                "Tout le monde peut commencer à ressentir des effets. Évitez les activités extérieures prolongées."
            }
            AqiBand::VeryUnhealthy => {
                "Alerte sanitaire : risques pour la santé accrus. Évitez les sorties. Personnes à risque : restez à l'intérieur."
            }
            AqiBand::Hazardous => {
                "ALERTE URGENTE : urgence sanitaire. Restez à l'intérieur. Fermez portes et fenêtres."
            }
        }
    }

    pub fn recommendations(&self) -> Recommendations {
        let (general, sensitive, outdoor) = match self {
            AqiBand::Good => (
                "Conditions idéales pour toutes activités en extérieur",
                "Aucune restriction",
                "Toutes activités recommandées",
            ),
            AqiBand::Moderate => (
                "Acceptable pour la plupart des gens",
                "Limitez les efforts prolongés si vous êtes sensible",
                "Activités normales possibles",
            ),
            AqiBand::UnhealthySensitive => (
                "Réduisez les activités extérieures intenses",
                "Évitez les efforts prolongés en extérieur",
                "Préférez les activités en intérieur",
            ),
            AqiBand::Unhealthy => (
                "Évitez les activités extérieures prolongées",
                "Restez à l'intérieur",
                "Activités en intérieur uniquement",
            ),
            AqiBand::VeryUnhealthy | AqiBand::Hazardous => (
                "Restez à l'intérieur. Fermez portes et fenêtres",
                "Évacuez si possible. Urgence sanitaire",
                "Interdit : danger immédiat",
            ),
        };
        Recommendations {
            general: general.to_string(),
            sensitive: sensitive.to_string(),
            outdoor: outdoor.to_string(),
        }
    }
}

/// Advice for the public, for sensitive groups and for outdoor activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendations {
    pub general: String,
    pub sensitive: String,
    pub outdoor: String,
}

/// An index value with its band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AqiReading {
    pub pollutant: Pollutant,
    pub value: f64,
    pub band: AqiBand,
}

impl AqiReading {
    pub fn color(&self) -> &'static str {
        self.band.color()
    }
}

/// Sub-index for one pollutant concentration.
pub fn sub_index(pollutant: Pollutant, concentration: f64) -> AqiReading {
    let value = interpolate(concentration, pollutant.breakpoints());
    AqiReading {
        pollutant,
        value,
        band: AqiBand::from_index(value),
    }
}

/// Combined index over several pollutant readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallAqi {
    pub value: f64,
    pub band: AqiBand,
    pub dominant: Pollutant,
    pub pollutants: Vec<AqiReading>,
    pub health_message: String,
    pub recommendations: Recommendations,
}

/// Overall index of the given concentrations.
///
/// Non-finite concentrations are left out. On a tie the pollutant listed
/// first is dominant. `None` when nothing is left to index.
pub fn overall(concentrations: &[(Pollutant, f64)]) -> Option<OverallAqi> {
    let pollutants: Vec<AqiReading> = concentrations
        .iter()
        .filter(|(_, c)| c.is_finite())
        .map(|&(pollutant, c)| sub_index(pollutant, c))
        .collect();

    let top = pollutants
        .iter()
        .fold(None::<&AqiReading>, |best, r| match best {
            Some(b) if b.value >= r.value => Some(b),
            _ => Some(r),
        })
        .copied()?;

    Some(OverallAqi {
        value: top.value,
        band: top.band,
        dominant: top.pollutant,
        health_message: top.band.health_message().to_string(),
        recommendations: top.band.recommendations(),
        pollutants,
    })
}

fn interpolate(concentration: f64, breakpoints: &[Breakpoint]) -> f64 {
    // Negative readings are sensor noise around zero.
    let c = concentration.max(0.0);
    breakpoints
        .iter()
        .find(|[c_low, c_high, _, _]| c >= *c_low && c <= *c_high)
        .map(|[c_low, c_high, i_low, i_high]| {
            (i_high - i_low) / (c_high - c_low) * (c - c_low) + i_low
        })
        .unwrap_or(AQI_MAX)
}
