//! Solar and lunar returns

use super::finder::{find_crossings, Direction, FinderOptions, SearchWindow};
use crate::ephemeris::Ephemeris;
use crate::error::ChartError;
use crate::models::Body;

pub const TROPICAL_YEAR_DAYS: f64 = 365.242_2;
pub const SIDEREAL_MONTH_DAYS: f64 = 27.321_582;

const SOLAR_RETURN_SLACK_DAYS: f64 = 3.0;
const LUNAR_RETURN_SEARCH_DAYS: f64 = 30.0;

/// Instant the Sun returns to `natal_longitude` closest to `anniversary`
pub fn solar_return(
    ephemeris: &dyn Ephemeris,
    natal_longitude: f64,
    anniversary: f64,
    precision: f64,
) -> Result<f64, ChartError> {
    let window = SearchWindow::around(
        anniversary - SOLAR_RETURN_SLACK_DAYS,
        anniversary + SOLAR_RETURN_SLACK_DAYS,
    );
    let options = FinderOptions::angular(Body::Sun.sampling_step(), precision, 360.0);
    let crossings = find_crossings(
        |t| Ok(ephemeris.position(Body::Sun, t)?.longitude - natal_longitude),
        &window,
        &options,
    )?;

    crossings
        .iter()
        .filter(|crossing| crossing.direction == Direction::Rising)
        .map(|crossing| crossing.julian_day)
        .min_by(|a, b| (a - anniversary).abs().total_cmp(&(b - anniversary).abs()))
        .ok_or_else(|| {
            ChartError::DataUnavailable(format!(
                "No solar return within {} days of JD {:.1}",
                SOLAR_RETURN_SLACK_DAYS, anniversary
            ))
        })
}

/// First instant at or after `after` when the Moon returns to `natal_longitude`
pub fn lunar_return(
    ephemeris: &dyn Ephemeris,
    natal_longitude: f64,
    after: f64,
    precision: f64,
) -> Result<f64, ChartError> {
    let window = SearchWindow::around(after, after + LUNAR_RETURN_SEARCH_DAYS);
    let options = FinderOptions::angular(Body::Moon.sampling_step(), precision, 360.0);
    let crossings = find_crossings(
        |t| Ok(ephemeris.position(Body::Moon, t)?.longitude - natal_longitude),
        &window,
        &options,
    )?;

    crossings
        .iter()
        .find(|crossing| crossing.direction == Direction::Rising)
        .map(|crossing| crossing.julian_day)
        .ok_or_else(|| {
            ChartError::DataUnavailable(format!(
                "No lunar return within {} days of JD {:.1}",
                LUNAR_RETURN_SEARCH_DAYS, after
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::synthetic::{Motion, SyntheticEphemeris, EPOCH};
    use crate::events::DEFAULT_PRECISION;

    #[test]
    fn test_solar_return_near_anniversary() {
        let rate = 360.0 / TROPICAL_YEAR_DAYS;
        let ephemeris =
            SyntheticEphemeris::new().with_motion(Body::Sun, Motion::linear(280.0, rate));
        let anniversary = EPOCH + 10.0 * TROPICAL_YEAR_DAYS + 1.0;

        let found = solar_return(&ephemeris, 280.0, anniversary, DEFAULT_PRECISION).unwrap();
        assert!((found - (EPOCH + 10.0 * TROPICAL_YEAR_DAYS)).abs() <= DEFAULT_PRECISION);
    }

    #[test]
    fn test_lunar_return_is_first_after() {
        let ephemeris =
            SyntheticEphemeris::new().with_motion(Body::Moon, Motion::linear(0.0, 12.0));
        // Moon at 0 every 30 days; starting at day 5 the next return is day 30
        let found = lunar_return(&ephemeris, 0.0, EPOCH + 5.0, DEFAULT_PRECISION).unwrap();
        assert!((found - (EPOCH + 30.0)).abs() <= DEFAULT_PRECISION);
    }

    #[test]
    fn test_missing_return_is_data_unavailable() {
        let ephemeris = SyntheticEphemeris::new().with_motion(Body::Sun, Motion::fixed(10.0));
        let result = solar_return(&ephemeris, 200.0, EPOCH, DEFAULT_PRECISION);
        assert!(matches!(result, Err(ChartError::DataUnavailable(_))));
    }
}
