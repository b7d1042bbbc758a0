//! Validation of chart requests into canonical specs
//!
//! Everything is checked here, before the ephemeris is touched. The canonical
//! form uses ordered collections so logically identical requests hash to the
//! same cache key.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::cache::cache_key;
use crate::config::Settings;
use crate::ephemeris::{parse_coordinate, parse_instant, resolve_timezone, Axis};
use crate::error::ChartError;
use crate::models::{
    AspectType, Body, ChartRequest, ChartType, CoordinateInput, HouseSystem, OrbTable,
    ProgressionKind,
};

/// A fully validated chart request
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub chart_type: ChartType,
    /// Birth or event instant
    pub datetime: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Tz,
    pub house_system: HouseSystem,
    /// Objects whose pairs are matched for aspects
    pub included: BTreeSet<Body>,
    pub orbs: OrbTable,
    /// Return year / progression date for derived chart types
    pub target: Option<DateTime<Utc>>,
    pub progression: Option<ProgressionKind>,
}

#[derive(Serialize)]
struct CanonicalChart<'a> {
    chart_type: ChartType,
    timestamp_ms: i64,
    latitude: f64,
    longitude: f64,
    timezone: &'a str,
    house_system: HouseSystem,
    included: &'a BTreeSet<Body>,
    orbs: &'a OrbTable,
    target_ms: Option<i64>,
    progression: Option<ProgressionKind>,
}

impl ChartSpec {
    pub fn from_request(request: &ChartRequest, settings: &Settings) -> Result<Self, ChartError> {
        let timezone = resolve_timezone(request.timezone.as_deref())?;
        let datetime = parse_instant(&request.datetime, timezone)?;
        let latitude = coordinate(&request.latitude, Axis::Latitude)?;
        let longitude = coordinate(&request.longitude, Axis::Longitude)?;

        let chart_type = match request.chart_type.as_deref() {
            Some(name) => name.parse::<ChartType>()?,
            None => ChartType::Natal,
        };
        if chart_type == ChartType::Composite {
            return Err(ChartError::invalid(
                "Composite charts require exactly 2 subjects; use compare_charts",
            ));
        }

        let house_system = match request.house_system.as_deref() {
            Some(name) => name.parse::<HouseSystem>()?,
            None => settings.default_house_system,
        };

        let included = inclusion_set(request.include_objects.as_deref())?;
        let orbs = orb_table(&settings.orbs, request.orbs.as_ref(), request.aspects.as_deref())?;

        let derived = matches!(
            chart_type,
            ChartType::SolarReturn | ChartType::LunarReturn | ChartType::Progressed
        );
        let target = if derived {
            Some(match request.target_date.as_deref() {
                Some(date) => parse_instant(date, timezone)?,
                None => today_utc(),
            })
        } else {
            None
        };

        let progression = if chart_type == ChartType::Progressed {
            Some(match request.progression.as_deref() {
                Some(name) => name.parse::<ProgressionKind>()?,
                None => ProgressionKind::default(),
            })
        } else {
            None
        };

        Ok(Self {
            chart_type,
            datetime,
            latitude,
            longitude,
            timezone,
            house_system,
            included,
            orbs,
            target,
            progression,
        })
    }

    /// Every object placed in the chart: the standard set plus the inclusion set
    pub fn objects(&self) -> BTreeSet<Body> {
        Body::chart_defaults()
            .iter()
            .copied()
            .chain(self.included.iter().copied())
            .collect()
    }

    pub fn cache_key(&self) -> Option<String> {
        cache_key(
            "chart",
            &CanonicalChart {
                chart_type: self.chart_type,
                timestamp_ms: self.datetime.timestamp_millis(),
                latitude: self.latitude,
                longitude: self.longitude,
                timezone: self.timezone.name(),
                house_system: self.house_system,
                included: &self.included,
                orbs: &self.orbs,
                target_ms: self.target.map(|t| t.timestamp_millis()),
                progression: self.progression,
            },
        )
    }
}

/// Midnight UTC today, so repeated requests without a target share a key
pub(crate) fn today_utc() -> DateTime<Utc> {
    Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn coordinate(input: &CoordinateInput, axis: Axis) -> Result<f64, ChartError> {
    match input {
        CoordinateInput::Degrees(degrees) => parse_coordinate(&degrees.to_string(), axis),
        CoordinateInput::Text(text) => parse_coordinate(text, axis),
    }
}

/// Sun through Pluto plus any requested extras
pub(crate) fn inclusion_set(extras: Option<&[String]>) -> Result<BTreeSet<Body>, ChartError> {
    let mut included: BTreeSet<Body> = Body::planets().iter().copied().collect();
    for name in extras.unwrap_or_default() {
        included.insert(name.parse::<Body>()?);
    }
    Ok(included)
}

pub(crate) fn parse_bodies(names: &[String]) -> Result<BTreeSet<Body>, ChartError> {
    names.iter().map(|name| name.parse::<Body>()).collect()
}

pub(crate) fn parse_aspects(names: &[String]) -> Result<BTreeSet<AspectType>, ChartError> {
    names.iter().map(|name| name.parse::<AspectType>()).collect()
}

/// Defaults, then per-aspect overrides, then the optional aspect filter
pub(crate) fn orb_table(
    defaults: &OrbTable,
    overrides: Option<&BTreeMap<String, f64>>,
    aspects: Option<&[String]>,
) -> Result<OrbTable, ChartError> {
    let mut orbs = defaults.clone();

    for (name, orb) in overrides.into_iter().flatten() {
        let aspect = name.parse::<AspectType>()?;
        if !orb.is_finite() || *orb < 0.0 || *orb > 180.0 {
            return Err(ChartError::invalid(format!(
                "Orb for {} must be between 0 and 180, got {}",
                aspect, orb
            )));
        }
        orbs.set(aspect, orb + 0.0);
    }

    if let Some(names) = aspects {
        let selected: Vec<AspectType> = parse_aspects(names)?.into_iter().collect();
        orbs.restrict_to(&selected);
    }

    Ok(orbs)
}
