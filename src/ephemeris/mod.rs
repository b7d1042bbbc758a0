//! Ephemeris collaborator: body positions and house cusps at an instant

pub mod calculator;
pub mod houses;
pub mod location;
#[cfg(test)]
pub mod synthetic;
pub mod time;

pub use calculator::SwissEphemeris;
pub use houses::{house_of, HousePositions};
pub use location::{parse_coordinate, resolve_timezone, Axis};
pub use time::{datetime_to_julian_day, julian_day_to_datetime, parse_instant};

use crate::error::ChartError;
use crate::models::{Body, HouseSystem};

/// Geocentric ecliptic position of a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPosition {
    /// Ecliptic longitude (0-360 degrees)
    pub longitude: f64,
    pub latitude: f64,
    /// Speed in longitude (degrees per day, negative = retrograde)
    pub speed: f64,
}

/// Source of planetary positions and house cusps.
///
/// Implementations must be deterministic. Failures surface as
/// [`ChartError::DataUnavailable`].
pub trait Ephemeris: Send + Sync {
    /// Position of a body at a Julian day (UT). Angles need a location and are
    /// only available through [`Ephemeris::houses`].
    fn position(&self, body: Body, julian_day: f64) -> Result<BodyPosition, ChartError>;

    fn houses(
        &self,
        julian_day: f64,
        latitude: f64,
        longitude: f64,
        system: HouseSystem,
    ) -> Result<HousePositions, ChartError>;
}

impl<E: Ephemeris + ?Sized> Ephemeris for &E {
    fn position(&self, body: Body, julian_day: f64) -> Result<BodyPosition, ChartError> {
        (**self).position(body, julian_day)
    }

    fn houses(
        &self,
        julian_day: f64,
        latitude: f64,
        longitude: f64,
        system: HouseSystem,
    ) -> Result<HousePositions, ChartError> {
        (**self).houses(julian_day, latitude, longitude, system)
    }
}

impl<E: Ephemeris + ?Sized> Ephemeris for std::sync::Arc<E> {
    fn position(&self, body: Body, julian_day: f64) -> Result<BodyPosition, ChartError> {
        (**self).position(body, julian_day)
    }

    fn houses(
        &self,
        julian_day: f64,
        latitude: f64,
        longitude: f64,
        system: HouseSystem,
    ) -> Result<HousePositions, ChartError> {
        (**self).houses(julian_day, latitude, longitude, system)
    }
}

/// Position of an angle from two house computations one minute apart
pub(crate) fn angle_position(
    ephemeris: &dyn Ephemeris,
    angle: Body,
    houses: &HousePositions,
    julian_day: f64,
    latitude: f64,
    longitude: f64,
    system: HouseSystem,
) -> Result<BodyPosition, ChartError> {
    const STEP: f64 = 1.0 / 1440.0;
    let later = ephemeris.houses(julian_day + STEP, latitude, longitude, system)?;
    let (now, next) = match angle {
        Body::Ascendant => (houses.ascendant, later.ascendant),
        Body::Midheaven => (houses.midheaven, later.midheaven),
        other => {
            return Err(ChartError::Internal(format!("{} is not an angle", other)));
        }
    };
    let delta = (next - now + 540.0).rem_euclid(360.0) - 180.0;
    Ok(BodyPosition {
        longitude: now.rem_euclid(360.0),
        latitude: 0.0,
        speed: delta / STEP,
    })
}
