//! Event searches and ephemeris tables over a time window

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::canonical::{parse_aspects, parse_bodies, ChartSpec};
use super::{CachedResult, Cancellation, ChartService, Checked};
use crate::cache::cache_key;
use crate::ephemeris::{
    datetime_to_julian_day, julian_day_to_datetime, parse_instant, resolve_timezone, Ephemeris,
};
use crate::error::ChartError;
use crate::events::{
    find_ingresses, find_moon_phases, find_retrograde_periods, find_transits, sort_events,
    Resolution, SearchWindow, MIN_PRECISION_MINUTES,
};
use crate::models::{
    AspectType, Body, BodyEventQuery, EphemerisQuery, EphemerisRow, Event, LunarPhaseName,
    MoonPhaseQuery, RetrogradePeriod, TransitQuery, WindowInput,
};

/// A validated search window with its sampling resolution
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedWindow {
    pub(crate) window: SearchWindow,
    pub(crate) resolution: Resolution,
}

#[derive(Serialize)]
struct CanonicalWindow {
    start: u64,
    end: u64,
    precision: u64,
    step: Option<u64>,
}

impl ResolvedWindow {
    fn canonical(&self) -> CanonicalWindow {
        CanonicalWindow {
            start: self.window.start().to_bits(),
            end: self.window.end().to_bits(),
            precision: self.resolution.precision.to_bits(),
            step: self.resolution.step.map(f64::to_bits),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interval {
    Hourly,
    Daily,
    Weekly,
}

impl Interval {
    fn parse(name: Option<&str>) -> Result<Self, ChartError> {
        match name.map(|n| n.trim().to_lowercase()).as_deref() {
            None | Some("daily") => Ok(Interval::Daily),
            Some("hourly") => Ok(Interval::Hourly),
            Some("weekly") => Ok(Interval::Weekly),
            Some(other) => Err(ChartError::invalid(format!(
                "Invalid interval: {} (expected hourly, daily or weekly)",
                other
            ))),
        }
    }

    fn days(&self) -> f64 {
        match self {
            Interval::Hourly => 1.0 / 24.0,
            Interval::Daily => 1.0,
            Interval::Weekly => 7.0,
        }
    }
}

/// Bodies from the request, or `defaults`; angles are rejected because they
/// need an observer location
fn searchable_bodies(
    names: Option<&[String]>,
    defaults: &[Body],
) -> Result<Vec<Body>, ChartError> {
    let bodies: Vec<Body> = match names {
        Some(names) => parse_bodies(names)?.into_iter().collect(),
        None => defaults.to_vec(),
    };
    if bodies.is_empty() {
        return Err(ChartError::invalid("At least one object is required"));
    }
    if let Some(angle) = bodies.iter().find(|body| body.is_angle()) {
        return Err(ChartError::invalid(format!(
            "{} depends on the observer's location and cannot be searched",
            angle
        )));
    }
    Ok(bodies)
}

fn events_of(cached: CachedResult) -> Option<Arc<Vec<Event>>> {
    match cached {
        CachedResult::Events(events) => Some(events),
        _ => None,
    }
}

impl ChartService {
    pub(crate) fn resolve_window(&self, input: &WindowInput) -> Result<ResolvedWindow, ChartError> {
        let timezone = resolve_timezone(input.timezone.as_deref())?;
        let start = datetime_to_julian_day(parse_instant(&input.start_date, timezone)?);
        let end = datetime_to_julian_day(parse_instant(&input.end_date, timezone)?);
        let window = SearchWindow::new(start, end, self.settings.max_search_days)?;

        let precision = match input.precision_minutes {
            Some(minutes) if minutes.is_finite() && minutes >= MIN_PRECISION_MINUTES => {
                minutes / 1440.0
            }
            Some(minutes) => {
                return Err(ChartError::invalid(format!(
                    "precision_minutes must be at least {}, got {}",
                    MIN_PRECISION_MINUTES, minutes
                )))
            }
            None => self.settings.default_precision(),
        };
        let mut resolution = Resolution::new(precision);

        if let Some(step) = input.step_days {
            if !(step.is_finite() && step > 0.0 && step <= window.span()) {
                return Err(ChartError::invalid(format!(
                    "step_days must be positive and no longer than the {:.2} day window, got {}",
                    window.span(),
                    step
                )));
            }
            resolution = resolution.with_step(step);
        }

        Ok(ResolvedWindow { window, resolution })
    }

    /// Exact transits of moving bodies to natal positions
    pub fn find_transits(
        &self,
        query: &TransitQuery,
        cancel: &Cancellation,
    ) -> Result<Arc<Vec<Event>>, ChartError> {
        let natal = ChartSpec::from_request(&query.natal, &self.settings)?;
        let resolved = self.resolve_window(&query.window)?;
        let transiting = searchable_bodies(query.transiting_objects.as_deref(), Body::planets())?;
        let natal_objects: BTreeSet<Body> = match query.natal_objects.as_deref() {
            Some(names) => parse_bodies(names)?,
            None => natal.included.clone(),
        };
        let placed = natal.objects();
        if let Some(missing) = natal_objects.iter().find(|body| !placed.contains(body)) {
            return Err(ChartError::invalid(format!(
                "{} is not in the natal chart; add it to include_objects",
                missing
            )));
        }
        let aspects: Vec<AspectType> = match query.aspects.as_deref() {
            Some(names) => parse_aspects(names)?.into_iter().collect(),
            None => AspectType::major_aspects().to_vec(),
        };

        let key = natal.cache_key().and_then(|natal_key| {
            cache_key(
                "transits",
                &(
                    natal_key,
                    resolved.canonical(),
                    &transiting,
                    &natal_objects,
                    &aspects,
                ),
            )
        });

        self.cached(key, cancel, events_of, CachedResult::Events, |ephemeris| {
            let chart = self.chart_for_spec(&natal, cancel)?;
            let points: Vec<(Body, f64)> = natal_objects
                .iter()
                .filter_map(|body| chart.chart.object(*body))
                .map(|object| (object.body, object.longitude))
                .collect();
            debug!(
                "Searching {} transiting bodies against {} natal points",
                transiting.len(),
                points.len()
            );
            let events = find_transits(
                ephemeris,
                &transiting,
                &points,
                &aspects,
                &resolved.window,
                resolved.resolution,
            )?;
            Ok(Arc::new(events))
        })
    }

    /// Exact principal lunar phases in a window
    pub fn moon_phases(
        &self,
        query: &MoonPhaseQuery,
        cancel: &Cancellation,
    ) -> Result<Arc<Vec<Event>>, ChartError> {
        let resolved = self.resolve_window(&query.window)?;
        let phases: Vec<LunarPhaseName> = match query.phases.as_deref() {
            Some(names) => names
                .iter()
                .map(|name| name.parse::<LunarPhaseName>())
                .collect::<Result<BTreeSet<_>, _>>()?
                .into_iter()
                .collect(),
            None => LunarPhaseName::principal().to_vec(),
        };
        let key = cache_key("moon_phases", &(resolved.canonical(), &phases));

        self.cached(key, cancel, events_of, CachedResult::Events, |ephemeris| {
            let events = find_moon_phases(
                ephemeris,
                &phases,
                &resolved.window,
                resolved.resolution,
            )?;
            Ok(Arc::new(events))
        })
    }

    /// Retrograde cycles of each requested body, grouped by body
    pub fn retrograde_periods(
        &self,
        query: &BodyEventQuery,
        cancel: &Cancellation,
    ) -> Result<Arc<Vec<RetrogradePeriod>>, ChartError> {
        let resolved = self.resolve_window(&query.window)?;
        let bodies = searchable_bodies(query.objects.as_deref(), &Body::planets()[2..])?;
        if let Some(body) = bodies.iter().find(|body| !body.can_retrograde()) {
            return Err(ChartError::invalid(format!("{} is never retrograde", body)));
        }
        let key = cache_key("retrogrades", &(resolved.canonical(), &bodies));

        self.cached(
            key,
            cancel,
            |cached| match cached {
                CachedResult::Retrogrades(periods) => Some(periods),
                _ => None,
            },
            CachedResult::Retrogrades,
            |ephemeris| {
                let mut periods = Vec::new();
                for &body in &bodies {
                    periods.extend(find_retrograde_periods(
                        ephemeris,
                        body,
                        &resolved.window,
                        resolved.resolution,
                    )?);
                }
                Ok(Arc::new(periods))
            },
        )
    }

    /// Sign ingresses of each requested body, in time order
    pub fn sign_ingresses(
        &self,
        query: &BodyEventQuery,
        cancel: &Cancellation,
    ) -> Result<Arc<Vec<Event>>, ChartError> {
        let resolved = self.resolve_window(&query.window)?;
        let bodies = searchable_bodies(query.objects.as_deref(), Body::planets())?;
        let key = cache_key("ingresses", &(resolved.canonical(), &bodies));

        self.cached(key, cancel, events_of, CachedResult::Events, |ephemeris| {
            let mut events = Vec::new();
            for &body in &bodies {
                events.extend(find_ingresses(
                    ephemeris,
                    body,
                    &resolved.window,
                    resolved.resolution,
                )?);
            }
            sort_events(&mut events);
            Ok(Arc::new(events))
        })
    }

    /// Positions sampled at a fixed interval. Not cached.
    pub fn ephemeris_table(
        &self,
        query: &EphemerisQuery,
        cancel: &Cancellation,
    ) -> Result<Vec<EphemerisRow>, ChartError> {
        let resolved = self.resolve_window(&query.window)?;
        let interval = Interval::parse(query.interval.as_deref())?;
        let bodies = searchable_bodies(query.objects.as_deref(), Body::planets())?;

        let step = interval.days();
        let span = resolved.window.span();
        let max_rows = self.settings.max_search_days;
        if span / step > max_rows {
            return Err(ChartError::RangeTooLarge {
                requested_days: span,
                max_days: max_rows * step,
            });
        }

        let ephemeris = Checked::new(self.ephemeris.as_ref(), cancel);
        let start = resolved.window.start();
        // Tolerate rounding in the Julian day difference
        let count = (span / step + 1e-9).floor() as usize + 1;
        let mut rows = Vec::with_capacity(count);
        for i in 0..count {
            let julian_day = start + i as f64 * step;
            let mut positions = BTreeMap::new();
            for &body in &bodies {
                positions.insert(body, ephemeris.position(body, julian_day)?.longitude);
            }
            rows.push(EphemerisRow {
                datetime: julian_day_to_datetime(julian_day)?,
                julian_day,
                positions,
            });
        }
        Ok(rows)
    }
}
