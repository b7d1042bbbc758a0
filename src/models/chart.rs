use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::{Aspect, Body, Dignities, MoonPhase, OrbTable, Pattern, ZodiacSign};
use crate::error::ChartError;

/// House systems supported by the ephemeris
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum HouseSystem {
    #[default]
    Placidus,
    Koch,
    WholeSign,
    Equal,
    Campanus,
    Regiomontanus,
    Porphyry,
    Morinus,
    Alcabitius,
}

impl HouseSystem {
    pub const ALL: [HouseSystem; 9] = [
        HouseSystem::Placidus,
        HouseSystem::Koch,
        HouseSystem::WholeSign,
        HouseSystem::Equal,
        HouseSystem::Campanus,
        HouseSystem::Regiomontanus,
        HouseSystem::Porphyry,
        HouseSystem::Morinus,
        HouseSystem::Alcabitius,
    ];

    /// Swiss Ephemeris house system code
    pub fn code(&self) -> u8 {
        match self {
            HouseSystem::Placidus => b'P',
            HouseSystem::Koch => b'K',
            HouseSystem::WholeSign => b'W',
            HouseSystem::Equal => b'E',
            HouseSystem::Campanus => b'C',
            HouseSystem::Regiomontanus => b'R',
            HouseSystem::Porphyry => b'O',
            HouseSystem::Morinus => b'M',
            HouseSystem::Alcabitius => b'B',
        }
    }
}

impl fmt::Display for HouseSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HouseSystem::Placidus => "Placidus",
            HouseSystem::Koch => "Koch",
            HouseSystem::WholeSign => "Whole Sign",
            HouseSystem::Equal => "Equal",
            HouseSystem::Campanus => "Campanus",
            HouseSystem::Regiomontanus => "Regiomontanus",
            HouseSystem::Porphyry => "Porphyry",
            HouseSystem::Morinus => "Morinus",
            HouseSystem::Alcabitius => "Alcabitius",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for HouseSystem {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let system = match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "placidus" => HouseSystem::Placidus,
            "koch" => HouseSystem::Koch,
            "whole_sign" | "wholesign" => HouseSystem::WholeSign,
            "equal" => HouseSystem::Equal,
            "campanus" => HouseSystem::Campanus,
            "regiomontanus" => HouseSystem::Regiomontanus,
            "porphyry" => HouseSystem::Porphyry,
            "morinus" => HouseSystem::Morinus,
            "alcabitius" | "alcabitus" => HouseSystem::Alcabitius,
            _ => return Err(ChartError::invalid(format!("Invalid house system: {}", s))),
        };
        Ok(system)
    }
}

/// What a chart was cast for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Natal,
    Transit,
    SolarReturn,
    LunarReturn,
    Progressed,
    Composite,
}

impl FromStr for ChartType {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chart_type = match s.trim().to_lowercase().as_str() {
            "natal" => ChartType::Natal,
            "transit" => ChartType::Transit,
            "solar_return" => ChartType::SolarReturn,
            "lunar_return" => ChartType::LunarReturn,
            "progressed" => ChartType::Progressed,
            "synastry" | "composite" | "davison" => {
                return Err(ChartError::invalid(format!(
                    "Chart type {} requires exactly 2 subjects; use compare_charts",
                    s
                )))
            }
            _ => return Err(ChartError::invalid(format!("Invalid chart type: {}", s))),
        };
        Ok(chart_type)
    }
}

/// Progression techniques
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionKind {
    /// One day after birth for each year of life
    #[default]
    Secondary,
    /// One day after birth for each sidereal month of life
    Tertiary,
    /// One sidereal month after birth for each year of life
    Minor,
    /// Secondary progressed Sun arc applied to every natal point
    SolarArc,
}

impl FromStr for ProgressionKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "secondary" => Ok(ProgressionKind::Secondary),
            "tertiary" => Ok(ProgressionKind::Tertiary),
            "minor" => Ok(ProgressionKind::Minor),
            "solar_arc" => Ok(ProgressionKind::SolarArc),
            _ => Err(ChartError::invalid(format!("Invalid progression type: {}", s))),
        }
    }
}

/// A chart object at the chart's instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CelestialObject {
    pub body: Body,
    /// Ecliptic longitude (0-360 degrees)
    pub longitude: f64,
    pub latitude: f64,
    /// Speed in longitude (degrees per day, negative = retrograde)
    pub speed: f64,
    /// House placement (1-12)
    pub house: u8,
    pub sign: ZodiacSign,
    /// Degree within the sign
    pub sign_degree: f64,
    pub retrograde: bool,
    #[serde(default, skip_serializing_if = "Dignities::is_empty")]
    pub dignities: Dignities,
}

impl CelestialObject {
    pub fn new(body: Body, longitude: f64, latitude: f64, speed: f64, house: u8) -> Self {
        let longitude = longitude.rem_euclid(360.0);
        let sign = ZodiacSign::from_longitude(longitude);
        Self {
            body,
            longitude,
            latitude,
            speed,
            house,
            sign,
            sign_degree: longitude - sign.start_degree(),
            retrograde: body.can_retrograde() && speed < 0.0,
            dignities: Dignities::of(body, sign),
        }
    }
}

/// Describes how and for what a chart was computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartMetadata {
    pub chart_type: ChartType,
    /// Instant the positions were computed for (UTC)
    pub datetime: DateTime<Utc>,
    pub julian_day: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub house_system: HouseSystem,
    /// Objects whose pairs are considered for aspects
    pub included: BTreeSet<Body>,
    pub orbs: OrbTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progression: Option<ProgressionKind>,
    /// Natal instant a derived chart was computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_datetime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
}

/// Positions and house cusps at one instant. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub metadata: ChartMetadata,
    pub objects: BTreeMap<Body, CelestialObject>,
    /// House cusps, index 0 = 1st house
    pub cusps: [f64; 12],
}

impl Chart {
    pub fn object(&self, body: Body) -> Option<&CelestialObject> {
        self.objects.get(&body)
    }

    /// Each house with its cusp and the bodies placed in it. Angles are left out.
    pub fn houses(&self) -> Vec<House> {
        self.cusps
            .iter()
            .zip(1u8..)
            .map(|(&cusp, number)| House {
                number,
                cusp,
                sign: ZodiacSign::from_longitude(cusp),
                objects: self
                    .objects
                    .values()
                    .filter(|object| object.house == number && !object.body.is_angle())
                    .map(|object| object.body)
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct House {
    pub number: u8,
    /// Cusp longitude
    pub cusp: f64,
    pub sign: ZodiacSign,
    /// Occupants in chart order
    pub objects: Vec<Body>,
}

/// A chart together with the analytics derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedChart {
    pub chart: Chart,
    pub aspects: Vec<Aspect>,
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub houses: Vec<House>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moon_phase: Option<MoonPhase>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_house_system_aliases() {
        assert_eq!(
            "whole_sign".parse::<HouseSystem>().unwrap(),
            HouseSystem::WholeSign
        );
        assert_eq!(
            "Alcabitus".parse::<HouseSystem>().unwrap(),
            HouseSystem::Alcabitius
        );
        assert!("topocentric".parse::<HouseSystem>().is_err());
    }

    #[test]
    fn test_two_subject_chart_types_are_rejected() {
        let err = "synastry".parse::<ChartType>().unwrap_err();
        assert!(err.to_string().contains("2 subjects"));
    }

    #[test]
    fn test_celestial_object_derives_sign_and_retrograde() {
        let mercury = CelestialObject::new(Body::Mercury, 365.0, 0.0, -0.4, 3);
        assert_eq!(mercury.sign, ZodiacSign::Aries);
        assert!((mercury.sign_degree - 5.0).abs() < 1e-9);
        assert!(mercury.retrograde);

        let moon = CelestialObject::new(Body::Moon, 100.0, 0.0, -1.0, 1);
        assert!(!moon.retrograde);
        assert!(moon.dignities.ruler);
        assert!(mercury.dignities.is_empty());
    }

    #[test]
    fn test_houses_list_their_occupants() {
        let cusps: [f64; 12] = std::array::from_fn(|i| i as f64 * 30.0);
        let objects = [
            CelestialObject::new(Body::Sun, 10.0, 0.0, 1.0, 1),
            CelestialObject::new(Body::Ascendant, 0.0, 0.0, 0.0, 1),
            CelestialObject::new(Body::Moon, 95.0, 0.0, 13.0, 4),
            CelestialObject::new(Body::Venus, 100.0, 0.0, 1.0, 4),
        ];
        let chart = Chart {
            metadata: ChartMetadata {
                chart_type: ChartType::Natal,
                datetime: DateTime::<Utc>::UNIX_EPOCH,
                julian_day: 2440587.5,
                latitude: 0.0,
                longitude: 0.0,
                timezone: "UTC".to_string(),
                house_system: HouseSystem::Equal,
                included: BTreeSet::new(),
                orbs: OrbTable::default(),
                progression: None,
                source_datetime: None,
                cache_key: None,
            },
            objects: objects.into_iter().map(|object| (object.body, object)).collect(),
            cusps,
        };

        let houses = chart.houses();
        assert_eq!(houses.len(), 12);
        assert_eq!(houses[0].objects, vec![Body::Sun]);
        assert_eq!(houses[3].sign, ZodiacSign::Cancer);
        assert_eq!(houses[3].objects, vec![Body::Moon, Body::Venus]);
        assert!(houses[6].objects.is_empty());
    }
}
