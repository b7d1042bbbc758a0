use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{AspectType, Body, LunarPhaseName, ZodiacSign};

/// Direction of a station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationKind {
    /// Speed falls through zero: the body turns retrograde
    Retrograde,
    /// Speed rises through zero: the body turns direct
    Direct,
}

/// A discrete event located by the event finder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub datetime: DateTime<Utc>,
    pub julian_day: f64,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A transiting body reaches an exact aspect to a natal position
    AspectExact {
        transiting: Body,
        natal: Body,
        aspect: AspectType,
        transiting_longitude: f64,
        retrograde: bool,
    },
    Station {
        body: Body,
        station: StationKind,
        longitude: f64,
    },
    PhaseExact {
        phase: LunarPhaseName,
        moon_longitude: f64,
        moon_sign: ZodiacSign,
    },
    Ingress {
        body: Body,
        sign: ZodiacSign,
        retrograde: bool,
    },
}

/// One retrograde cycle. Stations outside the searched window are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrogradePeriod {
    pub body: Body,
    pub station_retrograde: Option<Event>,
    pub station_direct: Option<Event>,
    /// Last time before the retrograde station that the body crossed the direct-station degree
    pub shadow_start: Option<DateTime<Utc>>,
    /// First time after the direct station that the body passes the retrograde-station degree
    pub shadow_end: Option<DateTime<Utc>>,
}

/// Sampled positions at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EphemerisRow {
    pub datetime: DateTime<Utc>,
    pub julian_day: f64,
    pub positions: BTreeMap<Body, f64>,
}
