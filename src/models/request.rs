//! Request payloads accepted by the chart service

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A coordinate as decimal degrees or as text ("32.72N", "117W09", "32°43'12\"N")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum CoordinateInput {
    Degrees(f64),
    Text(String),
}

impl From<f64> for CoordinateInput {
    fn from(degrees: f64) -> Self {
        CoordinateInput::Degrees(degrees)
    }
}

impl From<&str> for CoordinateInput {
    fn from(text: &str) -> Self {
        CoordinateInput::Text(text.to_string())
    }
}

/// Input for a single chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ChartRequest {
    #[schemars(
        description = "Birth or event time in ISO 8601 (YYYY-MM-DDTHH:MM:SS). Local to `timezone` unless it carries an offset"
    )]
    pub datetime: String,
    #[schemars(description = "Latitude in decimal degrees or text such as '32.72N'")]
    pub latitude: CoordinateInput,
    #[schemars(description = "Longitude in decimal degrees or text such as '117W09'")]
    pub longitude: CoordinateInput,
    #[serde(default)]
    #[schemars(
        description = "Timezone name, abbreviation or UTC offset (e.g. 'America/Los_Angeles', 'PST', 'UTC-8'). Defaults to UTC"
    )]
    pub timezone: Option<String>,
    #[serde(default)]
    #[schemars(
        description = "natal, transit, solar_return, lunar_return or progressed (default: natal)"
    )]
    pub chart_type: Option<String>,
    #[serde(default)]
    #[schemars(description = "House system (default: placidus)")]
    pub house_system: Option<String>,
    #[serde(default)]
    #[schemars(
        description = "Extra objects to include in aspects: chiron, lilith, ceres, pallas, juno, vesta, north_node, south_node, ascendant, midheaven"
    )]
    pub include_objects: Option<Vec<String>>,
    #[serde(default)]
    #[schemars(description = "Orb overrides by aspect name, e.g. {\"trine\": 6.0}")]
    pub orbs: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    #[schemars(description = "Aspect types to look for (default: all with an orb)")]
    pub aspects: Option<Vec<String>>,
    #[serde(default)]
    #[schemars(
        description = "Target date for return and progressed charts (default: today, UTC)"
    )]
    pub target_date: Option<String>,
    #[serde(default)]
    #[schemars(
        description = "Progression technique for progressed charts: secondary, tertiary, minor or solar_arc (default: secondary)"
    )]
    pub progression: Option<String>,
}

impl ChartRequest {
    pub fn new(
        datetime: impl Into<String>,
        latitude: impl Into<CoordinateInput>,
        longitude: impl Into<CoordinateInput>,
    ) -> Self {
        Self {
            datetime: datetime.into(),
            latitude: latitude.into(),
            longitude: longitude.into(),
            timezone: None,
            chart_type: None,
            house_system: None,
            include_objects: None,
            orbs: None,
            aspects: None,
            target_date: None,
            progression: None,
        }
    }

    /// Fill fields left unset from batch-wide settings
    pub fn with_shared(mut self, shared: &SharedChartSettings) -> Self {
        if self.timezone.is_none() {
            self.timezone = shared.timezone.clone();
        }
        if self.chart_type.is_none() {
            self.chart_type = shared.chart_type.clone();
        }
        if self.house_system.is_none() {
            self.house_system = shared.house_system.clone();
        }
        if self.include_objects.is_none() {
            self.include_objects = shared.include_objects.clone();
        }
        if self.orbs.is_none() {
            self.orbs = shared.orbs.clone();
        }
        if self.aspects.is_none() {
            self.aspects = shared.aspects.clone();
        }
        if self.target_date.is_none() {
            self.target_date = shared.target_date.clone();
        }
        self
    }
}

/// Settings applied to every batch item that leaves the field unset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SharedChartSettings {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub chart_type: Option<String>,
    #[serde(default)]
    pub house_system: Option<String>,
    #[serde(default)]
    pub include_objects: Option<Vec<String>>,
    #[serde(default)]
    pub orbs: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub aspects: Option<Vec<String>>,
    #[serde(default)]
    pub target_date: Option<String>,
}

/// Input for batch chart computation
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct BatchRequest {
    #[schemars(description = "Chart requests, computed concurrently; results keep this order")]
    pub requests: Vec<ChartRequest>,
    #[serde(default)]
    #[schemars(description = "Defaults for fields the individual requests leave unset")]
    pub shared_settings: Option<SharedChartSettings>,
    #[serde(default)]
    #[schemars(description = "Timeout for the whole batch in seconds (default: 30)")]
    pub timeout_seconds: Option<f64>,
}

/// A time window for event searches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WindowInput {
    #[schemars(description = "Start of the window (ISO 8601 date or datetime)")]
    pub start_date: String,
    #[schemars(description = "End of the window (ISO 8601 date or datetime)")]
    pub end_date: String,
    #[serde(default)]
    #[schemars(description = "Timezone for naive dates (default: UTC)")]
    pub timezone: Option<String>,
    #[serde(default)]
    #[schemars(description = "Time precision in minutes, at least 0.001 (default: 1)")]
    pub precision_minutes: Option<f64>,
    #[serde(default)]
    #[schemars(
        description = "Coarse sampling step in days, no longer than the window (default: per body, 0.5 for the Moon up to 5 for outer planets)"
    )]
    pub step_days: Option<f64>,
}

/// Input for transit search
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct TransitQuery {
    #[schemars(description = "The natal chart transits are measured against")]
    pub natal: ChartRequest,
    #[serde(flatten)]
    pub window: WindowInput,
    #[serde(default)]
    #[schemars(description = "Transiting bodies (default: Sun through Pluto)")]
    pub transiting_objects: Option<Vec<String>>,
    #[serde(default)]
    #[schemars(description = "Natal points (default: the natal chart's included objects)")]
    pub natal_objects: Option<Vec<String>>,
    #[serde(default)]
    #[schemars(description = "Aspect types (default: the five major aspects)")]
    pub aspects: Option<Vec<String>>,
}

/// Input for moon phase search
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct MoonPhaseQuery {
    #[serde(flatten)]
    pub window: WindowInput,
    #[serde(default)]
    #[schemars(
        description = "Phases to find: new_moon, first_quarter, full_moon, last_quarter (default: all)"
    )]
    pub phases: Option<Vec<String>>,
}

/// Input for per-body searches (retrograde periods, sign ingresses)
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct BodyEventQuery {
    #[serde(flatten)]
    pub window: WindowInput,
    #[serde(default)]
    #[schemars(
        description = "Bodies to search (default: Sun through Pluto, or Mercury through Pluto for retrograde periods)"
    )]
    pub objects: Option<Vec<String>>,
}

/// Input for progressed charts
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct ProgressionQuery {
    pub natal: ChartRequest,
    #[serde(default)]
    #[schemars(description = "Date to progress to (default: today, UTC)")]
    pub target_date: Option<String>,
    #[serde(default)]
    #[schemars(description = "secondary, tertiary, minor or solar_arc (default: secondary)")]
    pub progression_type: Option<String>,
}

/// Input for pattern search
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct PatternQuery {
    #[serde(default)]
    #[schemars(description = "Chart to compute and search")]
    pub chart: Option<ChartRequest>,
    #[serde(default)]
    #[schemars(description = "A chart previously returned by calculate_chart, searched as is")]
    pub computed_chart: Option<serde_json::Value>,
    #[serde(default)]
    #[schemars(
        description = "Pattern types: grand_trine, t_square, yod, grand_cross, kite, mystic_rectangle (default: all)"
    )]
    pub pattern_types: Option<Vec<String>>,
}

/// Input for two-chart comparison
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct ComparisonQuery {
    pub first: ChartRequest,
    pub second: ChartRequest,
    #[schemars(description = "synastry or composite")]
    pub comparison: String,
}

/// Input for an ephemeris table
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct EphemerisQuery {
    #[serde(flatten)]
    pub window: WindowInput,
    #[serde(default)]
    #[schemars(description = "daily, hourly or weekly (default: daily)")]
    pub interval: Option<String>,
    #[serde(default)]
    #[schemars(description = "Bodies to tabulate (default: Sun through Pluto)")]
    pub objects: Option<Vec<String>>,
}
