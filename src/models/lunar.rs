use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChartError;

/// Lunar phase names
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum LunarPhaseName {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl LunarPhaseName {
    /// The four phases that occur at an exact Sun-Moon angle
    pub fn principal() -> &'static [LunarPhaseName] {
        &[
            LunarPhaseName::NewMoon,
            LunarPhaseName::FirstQuarter,
            LunarPhaseName::FullMoon,
            LunarPhaseName::LastQuarter,
        ]
    }

    /// Exact Moon-minus-Sun angle for principal phases
    pub fn exact_angle(&self) -> Option<f64> {
        match self {
            LunarPhaseName::NewMoon => Some(0.0),
            LunarPhaseName::FirstQuarter => Some(90.0),
            LunarPhaseName::FullMoon => Some(180.0),
            LunarPhaseName::LastQuarter => Some(270.0),
            _ => None,
        }
    }

    /// Determine phase from the angle between Sun and Moon
    pub fn from_phase_angle(angle: f64) -> Self {
        // Phase angle: Moon longitude - Sun longitude (normalized 0-360)
        let normalized = angle.rem_euclid(360.0);

        match normalized {
            a if a < 22.5 => LunarPhaseName::NewMoon,
            a if a < 67.5 => LunarPhaseName::WaxingCrescent,
            a if a < 112.5 => LunarPhaseName::FirstQuarter,
            a if a < 157.5 => LunarPhaseName::WaxingGibbous,
            a if a < 202.5 => LunarPhaseName::FullMoon,
            a if a < 247.5 => LunarPhaseName::WaningGibbous,
            a if a < 292.5 => LunarPhaseName::LastQuarter,
            a if a < 337.5 => LunarPhaseName::WaningCrescent,
            _ => LunarPhaseName::NewMoon,
        }
    }

    /// Calculate illumination fraction (0.0-1.0) from phase angle
    pub fn illumination_from_angle(angle: f64) -> f64 {
        let radians = angle.rem_euclid(360.0).to_radians();
        (1.0 - radians.cos()) / 2.0
    }
}

/// The Moon's phase at a chart's instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoonPhase {
    pub phase: LunarPhaseName,
    /// Moon longitude minus Sun longitude (0-360)
    pub angle: f64,
    /// Illuminated fraction of the disc (0-1)
    pub illumination: f64,
}

impl MoonPhase {
    pub fn from_longitudes(sun: f64, moon: f64) -> Self {
        let angle = (moon - sun).rem_euclid(360.0);
        Self {
            phase: LunarPhaseName::from_phase_angle(angle),
            angle,
            illumination: LunarPhaseName::illumination_from_angle(angle),
        }
    }
}

impl fmt::Display for LunarPhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LunarPhaseName::NewMoon => "New Moon",
            LunarPhaseName::WaxingCrescent => "Waxing Crescent",
            LunarPhaseName::FirstQuarter => "First Quarter",
            LunarPhaseName::WaxingGibbous => "Waxing Gibbous",
            LunarPhaseName::FullMoon => "Full Moon",
            LunarPhaseName::WaningGibbous => "Waning Gibbous",
            LunarPhaseName::LastQuarter => "Last Quarter",
            LunarPhaseName::WaningCrescent => "Waning Crescent",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for LunarPhaseName {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "new_moon" | "new" => Ok(LunarPhaseName::NewMoon),
            "first_quarter" => Ok(LunarPhaseName::FirstQuarter),
            "full_moon" | "full" => Ok(LunarPhaseName::FullMoon),
            "last_quarter" | "third_quarter" => Ok(LunarPhaseName::LastQuarter),
            _ => Err(ChartError::invalid(format!(
                "Invalid phase: {} (expected new_moon, first_quarter, full_moon or last_quarter)",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_angle() {
        assert_eq!(LunarPhaseName::from_phase_angle(5.0), LunarPhaseName::NewMoon);
        assert_eq!(LunarPhaseName::from_phase_angle(185.0), LunarPhaseName::FullMoon);
        assert_eq!(LunarPhaseName::from_phase_angle(350.0), LunarPhaseName::NewMoon);
    }

    #[test]
    fn test_illumination() {
        assert!(LunarPhaseName::illumination_from_angle(0.0).abs() < 1e-9);
        assert!((LunarPhaseName::illumination_from_angle(180.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_moon_phase_wraps_elongation() {
        let phase = MoonPhase::from_longitudes(350.0, 80.0);
        assert!((phase.angle - 90.0).abs() < 1e-9);
        assert_eq!(phase.phase, LunarPhaseName::FirstQuarter);
        assert!((phase.illumination - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_only_principal_phases_parse() {
        assert_eq!("Full Moon".parse::<LunarPhaseName>().unwrap(), LunarPhaseName::FullMoon);
        assert!("waxing_gibbous".parse::<LunarPhaseName>().is_err());
    }
}
