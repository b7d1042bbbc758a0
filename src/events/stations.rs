//! Stations and retrograde periods with their shadows

use tracing::debug;

use super::finder::{find_crossings, Direction, FinderOptions, Resolution, SearchWindow};
use super::{event_at, require_moving_body, PositionMemo};
use crate::ephemeris::{julian_day_to_datetime, Ephemeris};
use crate::error::ChartError;
use crate::models::{Body, Event, EventKind, RetrogradePeriod, StationKind};

/// Minimum distance searched on either side of a retrograde for its shadow
const MIN_SHADOW_SEARCH_DAYS: f64 = 30.0;

/// Zero crossings of the body's speed. Bodies that never turn retrograde
/// yield no stations.
pub fn find_stations(
    ephemeris: &dyn Ephemeris,
    body: Body,
    window: &SearchWindow,
    resolution: Resolution,
) -> Result<Vec<Event>, ChartError> {
    require_moving_body(body)?;
    if !body.can_retrograde() {
        return Ok(Vec::new());
    }

    let options = FinderOptions::new(resolution.step_for(body), resolution.precision);
    let crossings = find_crossings(
        |t| Ok(ephemeris.position(body, t)?.speed),
        window,
        &options,
    )?;

    crossings
        .into_iter()
        .map(|crossing| {
            let position = ephemeris.position(body, crossing.julian_day)?;
            let station = match crossing.direction {
                Direction::Falling => StationKind::Retrograde,
                Direction::Rising => StationKind::Direct,
            };
            event_at(
                crossing.julian_day,
                EventKind::Station {
                    body,
                    station,
                    longitude: position.longitude,
                },
            )
        })
        .collect()
}

fn station_longitude(event: &Event) -> Option<f64> {
    match event.kind {
        EventKind::Station { longitude, .. } => Some(longitude),
        _ => None,
    }
}

fn station_kind(event: &Event) -> Option<StationKind> {
    match event.kind {
        EventKind::Station { station, .. } => Some(station),
        _ => None,
    }
}

/// Retrograde cycles overlapping `window`.
///
/// A cycle already under way at the start of the window has no retrograde
/// station; one still running at the end has no direct station. Shadows are
/// only computed for complete cycles.
pub fn find_retrograde_periods(
    ephemeris: &dyn Ephemeris,
    body: Body,
    window: &SearchWindow,
    resolution: Resolution,
) -> Result<Vec<RetrogradePeriod>, ChartError> {
    let memo = PositionMemo::new(ephemeris);
    let stations = find_stations(&memo, body, window, resolution)?;

    let mut periods = Vec::new();
    let mut pending: Option<Event> = None;

    for station in stations {
        match station_kind(&station) {
            Some(StationKind::Retrograde) => {
                if let Some(open) = pending.take() {
                    periods.push(open_period(body, Some(open), None));
                }
                pending = Some(station);
            }
            Some(StationKind::Direct) => {
                let retrograde = pending.take();
                periods.push(open_period(body, retrograde, Some(station)));
            }
            None => {}
        }
    }
    if let Some(open) = pending {
        periods.push(open_period(body, Some(open), None));
    }

    for period in &mut periods {
        let (Some(retrograde), Some(direct)) = (&period.station_retrograde, &period.station_direct)
        else {
            continue;
        };
        let (Some(retrograde_degree), Some(direct_degree)) =
            (station_longitude(retrograde), station_longitude(direct))
        else {
            continue;
        };

        let duration = direct.julian_day - retrograde.julian_day;
        let reach = (3.0 * duration).max(MIN_SHADOW_SEARCH_DAYS);
        let options = FinderOptions::angular(resolution.step_for(body), resolution.precision, 360.0);

        let before = SearchWindow::around(retrograde.julian_day - reach, retrograde.julian_day);
        let entry = find_crossings(
            |t| Ok(memo.position(body, t)?.longitude - direct_degree),
            &before,
            &options,
        )?;
        if let Some(last) = entry.last() {
            period.shadow_start = Some(julian_day_to_datetime(last.julian_day)?);
        }

        let after = SearchWindow::around(direct.julian_day, direct.julian_day + reach);
        let exit = find_crossings(
            |t| Ok(memo.position(body, t)?.longitude - retrograde_degree),
            &after,
            &options,
        )?;
        if let Some(first) = exit.first() {
            period.shadow_end = Some(julian_day_to_datetime(first.julian_day)?);
        }
    }

    debug!("Found {} retrograde periods for {}", periods.len(), body);
    Ok(periods)
}

fn open_period(
    body: Body,
    station_retrograde: Option<Event>,
    station_direct: Option<Event>,
) -> RetrogradePeriod {
    RetrogradePeriod {
        body,
        station_retrograde,
        station_direct,
        shadow_start: None,
        shadow_end: None,
    }
}
