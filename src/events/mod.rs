//! Discrete astrological events located in time

pub mod finder;
pub mod ingress;
pub mod phases;
pub mod returns;
pub mod stations;
pub mod transits;

pub use finder::{
    find_crossings, wrap_signed, Crossing, Direction, FinderOptions, Resolution, SearchWindow,
    DEFAULT_PRECISION, MIN_PRECISION_MINUTES,
};
pub use ingress::find_ingresses;
pub use phases::find_moon_phases;
pub use returns::{lunar_return, solar_return};
pub use stations::{find_retrograde_periods, find_stations};
pub use transits::find_transits;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::ephemeris::{julian_day_to_datetime, BodyPosition, Ephemeris, HousePositions};
use crate::error::ChartError;
use crate::models::{Body, Event, EventKind, HouseSystem};

pub(crate) fn event_at(julian_day: f64, kind: EventKind) -> Result<Event, ChartError> {
    Ok(Event {
        datetime: julian_day_to_datetime(julian_day)?,
        julian_day,
        kind,
    })
}

pub(crate) fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| a.julian_day.total_cmp(&b.julian_day));
}

pub(crate) fn require_moving_body(body: Body) -> Result<(), ChartError> {
    if body.is_angle() {
        return Err(ChartError::invalid(format!(
            "{} depends on the observer's location and cannot be searched",
            body
        )));
    }
    Ok(())
}

/// Remembers positions within one search so coarse samples shared by several
/// signals hit the ephemeris once
pub(crate) struct PositionMemo<'a> {
    inner: &'a dyn Ephemeris,
    positions: Mutex<HashMap<(Body, u64), BodyPosition>>,
}

impl<'a> PositionMemo<'a> {
    pub(crate) fn new(inner: &'a dyn Ephemeris) -> Self {
        Self {
            inner,
            positions: Mutex::new(HashMap::new()),
        }
    }
}

impl Ephemeris for PositionMemo<'_> {
    fn position(&self, body: Body, julian_day: f64) -> Result<BodyPosition, ChartError> {
        let key = (body, julian_day.to_bits());
        if let Ok(positions) = self.positions.lock() {
            if let Some(position) = positions.get(&key) {
                return Ok(*position);
            }
        }

        let position = self.inner.position(body, julian_day)?;
        if let Ok(mut positions) = self.positions.lock() {
            positions.insert(key, position);
        }
        Ok(position)
    }

    fn houses(
        &self,
        julian_day: f64,
        latitude: f64,
        longitude: f64,
        system: HouseSystem,
    ) -> Result<HousePositions, ChartError> {
        self.inner.houses(julian_day, latitude, longitude, system)
    }
}
