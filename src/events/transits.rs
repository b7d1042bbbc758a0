//! Exact transit hits against fixed natal positions

use tracing::debug;

use super::finder::{find_crossings, FinderOptions, Resolution, SearchWindow};
use super::{event_at, require_moving_body, sort_events, PositionMemo};
use crate::ephemeris::Ephemeris;
use crate::error::ChartError;
use crate::models::{AspectType, Body, Event, EventKind};

/// Target offsets of the transiting body from the natal point.
/// Conjunction and opposition have a single target; every other angle is
/// reached from both sides.
fn targets(aspect: AspectType) -> Vec<f64> {
    let angle = aspect.angle();
    if angle == 0.0 || angle == 180.0 {
        vec![angle]
    } else {
        vec![angle, 360.0 - angle]
    }
}

/// Every instant in `window` when a transiting body forms an exact aspect to
/// a natal point, retrograde re-passes included. Events are in time order.
pub fn find_transits(
    ephemeris: &dyn Ephemeris,
    transiting: &[Body],
    natal: &[(Body, f64)],
    aspects: &[AspectType],
    window: &SearchWindow,
    resolution: Resolution,
) -> Result<Vec<Event>, ChartError> {
    let memo = PositionMemo::new(ephemeris);
    let mut events = Vec::new();

    for &body in transiting {
        require_moving_body(body)?;
        let step = resolution.step_for(body);

        for &(natal_body, natal_longitude) in natal {
            for &aspect in aspects {
                for target in targets(aspect) {
                    let options = FinderOptions::angular(step, resolution.precision, 360.0);
                    let crossings = find_crossings(
                        |t| Ok(memo.position(body, t)?.longitude - natal_longitude - target),
                        window,
                        &options,
                    )?;

                    for crossing in crossings {
                        let position = memo.position(body, crossing.julian_day)?;
                        events.push(event_at(
                            crossing.julian_day,
                            EventKind::AspectExact {
                                transiting: body,
                                natal: natal_body,
                                aspect,
                                transiting_longitude: position.longitude,
                                retrograde: body.can_retrograde() && position.speed < 0.0,
                            },
                        )?);
                    }
                }
            }
        }
    }

    sort_events(&mut events);
    debug!(
        "Found {} transit hits over {:.1} days",
        events.len(),
        window.span()
    );
    Ok(events)
}
