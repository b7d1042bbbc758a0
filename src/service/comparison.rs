//! Two-chart comparisons: synastry and composite

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::matcher::signed_difference;
use crate::ephemeris::{house_of, julian_day_to_datetime};
use crate::error::ChartError;
use crate::models::{AnalyzedChart, CelestialObject, Chart, ChartMetadata, ChartType, CrossAspect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    Synastry,
    Composite,
}

impl fmt::Display for ComparisonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonKind::Synastry => write!(f, "synastry"),
            ComparisonKind::Composite => write!(f, "composite"),
        }
    }
}

impl FromStr for ComparisonKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "synastry" => Ok(ComparisonKind::Synastry),
            "composite" => Ok(ComparisonKind::Composite),
            "davison" => Err(ChartError::invalid(
                "Davison charts are not supported; use synastry or composite",
            )),
            _ => Err(ChartError::invalid(format!("Invalid comparison type: {}", s))),
        }
    }
}

/// Both charts plus the aspects between them, first chart's objects first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synastry {
    pub first: Arc<AnalyzedChart>,
    pub second: Arc<AnalyzedChart>,
    pub aspects: Vec<CrossAspect>,
}

/// Point halfway along the shorter arc from `a` to `b`
pub fn midpoint(a: f64, b: f64) -> f64 {
    (a + signed_difference(a, b) / 2.0).rem_euclid(360.0)
}

/// Composite chart from the shorter-arc midpoints of the objects both charts
/// share and of their house cusps. Houses are reassigned from the composite
/// cusps. Callers that need a stable result pass the charts in a canonical
/// order; exact oppositions resolve toward the first chart.
pub fn composite_chart(first: &Chart, second: &Chart) -> Result<Chart, ChartError> {
    let mut cusps = [0.0; 12];
    for (i, cusp) in cusps.iter_mut().enumerate() {
        *cusp = midpoint(first.cusps[i], second.cusps[i]);
    }

    let objects = first
        .objects
        .values()
        .filter_map(|a| second.object(a.body).map(|b| (a, b)))
        .map(|(a, b)| {
            let longitude = midpoint(a.longitude, b.longitude);
            let object = CelestialObject::new(
                a.body,
                longitude,
                (a.latitude + b.latitude) / 2.0,
                (a.speed + b.speed) / 2.0,
                house_of(longitude, &cusps),
            );
            (a.body, object)
        })
        .collect();

    let julian_day = (first.metadata.julian_day + second.metadata.julian_day) / 2.0;
    let metadata = ChartMetadata {
        chart_type: ChartType::Composite,
        datetime: julian_day_to_datetime(julian_day)?,
        julian_day,
        latitude: (first.metadata.latitude + second.metadata.latitude) / 2.0,
        longitude: signed_difference(0.0, midpoint(first.metadata.longitude, second.metadata.longitude)),
        timezone: "UTC".to_string(),
        house_system: first.metadata.house_system,
        included: first
            .metadata
            .included
            .union(&second.metadata.included)
            .copied()
            .collect(),
        orbs: first.metadata.orbs.clone(),
        progression: None,
        source_datetime: None,
        cache_key: None,
    };

    Ok(Chart {
        metadata,
        objects,
        cusps,
    })
}
