//! Sign ingresses

use super::finder::{find_crossings, Direction, FinderOptions, Resolution, SearchWindow};
use super::{event_at, require_moving_body};
use crate::ephemeris::Ephemeris;
use crate::error::ChartError;
use crate::models::{Body, Event, EventKind, ZodiacSign};

const SIGN_WIDTH: f64 = 30.0;

/// Instants when `body` crosses a sign boundary. Crossings while retrograde
/// re-enter the previous sign.
pub fn find_ingresses(
    ephemeris: &dyn Ephemeris,
    body: Body,
    window: &SearchWindow,
    resolution: Resolution,
) -> Result<Vec<Event>, ChartError> {
    require_moving_body(body)?;

    let options = FinderOptions::angular(resolution.step_for(body), resolution.precision, SIGN_WIDTH);
    let crossings = find_crossings(
        |t| Ok(ephemeris.position(body, t)?.longitude),
        window,
        &options,
    )?;

    crossings
        .into_iter()
        .map(|crossing| {
            let position = ephemeris.position(body, crossing.julian_day)?;
            let boundary = (position.longitude / SIGN_WIDTH).round() * SIGN_WIDTH;
            let retrograde = crossing.direction == Direction::Falling;
            let entered = if retrograde {
                ZodiacSign::from_longitude((boundary - SIGN_WIDTH / 2.0).rem_euclid(360.0))
            } else {
                ZodiacSign::from_longitude((boundary + SIGN_WIDTH / 2.0).rem_euclid(360.0))
            };
            event_at(
                crossing.julian_day,
                EventKind::Ingress {
                    body,
                    sign: entered,
                    retrograde,
                },
            )
        })
        .collect()
}
