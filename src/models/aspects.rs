use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::Body;
use crate::error::ChartError;

/// Types of astrological aspects, declared in order of exact angle
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
pub enum AspectType {
    Conjunction,
    SemiSextile,
    SemiSquare,
    Sextile,
    Square,
    Trine,
    Sesquiquadrate,
    Quincunx,
    Opposition,
}

impl AspectType {
    pub const ALL: [AspectType; 9] = [
        AspectType::Conjunction,
        AspectType::SemiSextile,
        AspectType::SemiSquare,
        AspectType::Sextile,
        AspectType::Square,
        AspectType::Trine,
        AspectType::Sesquiquadrate,
        AspectType::Quincunx,
        AspectType::Opposition,
    ];

    /// Get the exact angle for this aspect
    pub fn angle(&self) -> f64 {
        match self {
            AspectType::Conjunction => 0.0,
            AspectType::SemiSextile => 30.0,
            AspectType::SemiSquare => 45.0,
            AspectType::Sextile => 60.0,
            AspectType::Square => 90.0,
            AspectType::Trine => 120.0,
            AspectType::Sesquiquadrate => 135.0,
            AspectType::Quincunx => 150.0,
            AspectType::Opposition => 180.0,
        }
    }

    /// Get all major aspects
    pub fn major_aspects() -> &'static [AspectType] {
        &[
            AspectType::Conjunction,
            AspectType::Sextile,
            AspectType::Square,
            AspectType::Trine,
            AspectType::Opposition,
        ]
    }
}

impl fmt::Display for AspectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AspectType::Conjunction => "conjunction",
            AspectType::SemiSextile => "semi-sextile",
            AspectType::SemiSquare => "semi-square",
            AspectType::Sextile => "sextile",
            AspectType::Square => "square",
            AspectType::Trine => "trine",
            AspectType::Sesquiquadrate => "sesquiquadrate",
            AspectType::Quincunx => "quincunx",
            AspectType::Opposition => "opposition",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for AspectType {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        let aspect = match normalized.as_str() {
            "conjunction" => AspectType::Conjunction,
            "semisextile" => AspectType::SemiSextile,
            "semisquare" => AspectType::SemiSquare,
            "sextile" => AspectType::Sextile,
            "square" => AspectType::Square,
            "trine" => AspectType::Trine,
            "sesquiquadrate" | "sesquisquare" => AspectType::Sesquiquadrate,
            "quincunx" | "inconjunct" => AspectType::Quincunx,
            "opposition" => AspectType::Opposition,
            _ => return Err(ChartError::invalid(format!("Unknown aspect: {}", s))),
        };
        Ok(aspect)
    }
}

/// Permitted deviation per aspect type. Types absent from the table are never matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct OrbTable(BTreeMap<AspectType, f64>);

impl OrbTable {
    /// Build a table from the major orb, sextile orb and minor orb
    pub fn with_orbs(major: [f64; 4], sextile: f64, minor: f64) -> Self {
        let [conjunction, opposition, trine, square] = major;
        let mut orbs = BTreeMap::new();
        orbs.insert(AspectType::Conjunction, conjunction);
        orbs.insert(AspectType::Opposition, opposition);
        orbs.insert(AspectType::Trine, trine);
        orbs.insert(AspectType::Square, square);
        orbs.insert(AspectType::Sextile, sextile);
        for minor_aspect in [
            AspectType::SemiSextile,
            AspectType::SemiSquare,
            AspectType::Sesquiquadrate,
            AspectType::Quincunx,
        ] {
            orbs.insert(minor_aspect, minor);
        }
        Self(orbs)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (AspectType, f64)>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn orb(&self, aspect: AspectType) -> Option<f64> {
        self.0.get(&aspect).copied()
    }

    pub fn set(&mut self, aspect: AspectType, orb: f64) {
        self.0.insert(aspect, orb);
    }

    /// Keep only the listed aspect types
    pub fn restrict_to(&mut self, aspects: &[AspectType]) {
        self.0.retain(|aspect, _| aspects.contains(aspect));
    }

    /// Entries in ascending angle order
    pub fn iter(&self) -> impl Iterator<Item = (AspectType, f64)> + '_ {
        self.0.iter().map(|(aspect, orb)| (*aspect, *orb))
    }

    pub fn aspect_types(&self) -> Vec<AspectType> {
        self.0.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for OrbTable {
    fn default() -> Self {
        Self::with_orbs([8.0, 8.0, 8.0, 8.0], 6.0, 3.0)
    }
}

/// An aspect between two chart objects. `first` always orders before `second`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Aspect {
    pub first: Body,
    pub second: Body,
    pub aspect_type: AspectType,
    /// Deviation from the exact angle (in degrees)
    pub orb: f64,
    /// Whether the separation is moving toward exact
    pub applying: bool,
}

impl Aspect {
    pub fn new(a: Body, b: Body, aspect_type: AspectType, orb: f64, applying: bool) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first,
            second,
            aspect_type,
            orb,
            applying,
        }
    }

    pub fn involves(&self, body: Body) -> bool {
        self.first == body || self.second == body
    }
}

/// An aspect between objects of two different charts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CrossAspect {
    pub first_chart_object: Body,
    pub second_chart_object: Body,
    pub aspect_type: AspectType,
    pub orb: f64,
    pub applying: bool,
}
