//! Chart computation for every single-subject chart type

use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;
use tracing::debug;

use super::canonical::ChartSpec;
use crate::ephemeris::{
    angle_position, datetime_to_julian_day, house_of, julian_day_to_datetime, Ephemeris,
};
use crate::error::ChartError;
use crate::events::returns::{SIDEREAL_MONTH_DAYS, TROPICAL_YEAR_DAYS};
use crate::events::{lunar_return, solar_return};
use crate::models::{Body, CelestialObject, Chart, ChartMetadata, ChartType, ProgressionKind};

/// Place every object and the house cusps at the metadata's instant and location
pub(crate) fn chart_at(
    ephemeris: &dyn Ephemeris,
    metadata: ChartMetadata,
    objects: &BTreeSet<Body>,
) -> Result<Chart, ChartError> {
    let julian_day = metadata.julian_day;
    let (latitude, longitude, system) =
        (metadata.latitude, metadata.longitude, metadata.house_system);
    let houses = ephemeris.houses(julian_day, latitude, longitude, system)?;

    let mut placed = BTreeMap::new();
    for &body in objects {
        let position = if body.is_angle() {
            angle_position(
                ephemeris, body, &houses, julian_day, latitude, longitude, system,
            )?
        } else {
            ephemeris.position(body, julian_day)?
        };
        let house = house_of(position.longitude, &houses.cusps);
        placed.insert(
            body,
            CelestialObject::new(
                body,
                position.longitude,
                position.latitude,
                position.speed,
                house,
            ),
        );
    }

    Ok(Chart {
        metadata,
        objects: placed,
        cusps: houses.cusps,
    })
}

fn metadata_for(spec: &ChartSpec, julian_day: f64) -> Result<ChartMetadata, ChartError> {
    Ok(ChartMetadata {
        chart_type: spec.chart_type,
        datetime: julian_day_to_datetime(julian_day)?,
        julian_day,
        latitude: spec.latitude,
        longitude: spec.longitude,
        timezone: spec.timezone.name().to_string(),
        house_system: spec.house_system,
        included: spec.included.clone(),
        orbs: spec.orbs.clone(),
        progression: spec.progression,
        source_datetime: None,
        cache_key: None,
    })
}

fn target_julian_day(spec: &ChartSpec) -> Result<f64, ChartError> {
    spec.target
        .map(datetime_to_julian_day)
        .ok_or_else(|| ChartError::Internal(format!("{:?} chart without a target date", spec.chart_type)))
}

/// Compute the chart a validated spec describes. `precision` (days) applies
/// to the return searches.
pub fn compute_chart(
    ephemeris: &dyn Ephemeris,
    spec: &ChartSpec,
    precision: f64,
) -> Result<Chart, ChartError> {
    let natal_jd = datetime_to_julian_day(spec.datetime);
    let objects = spec.objects();

    match spec.chart_type {
        ChartType::Natal | ChartType::Transit => {
            let mut metadata = metadata_for(spec, natal_jd)?;
            metadata.datetime = spec.datetime;
            chart_at(ephemeris, metadata, &objects)
        }
        ChartType::SolarReturn => {
            let target = spec.target.ok_or_else(|| {
                ChartError::Internal("solar return without a target date".to_string())
            })?;
            let natal_sun = ephemeris.position(Body::Sun, natal_jd)?.longitude;
            let years = f64::from(target.year() - spec.datetime.year());
            let anniversary = natal_jd + years * TROPICAL_YEAR_DAYS;
            let julian_day = solar_return(ephemeris, natal_sun, anniversary, precision)?;
            debug!("Solar return for {} at JD {:.5}", target.year(), julian_day);

            let mut metadata = metadata_for(spec, julian_day)?;
            metadata.source_datetime = Some(spec.datetime);
            chart_at(ephemeris, metadata, &objects)
        }
        ChartType::LunarReturn => {
            let natal_moon = ephemeris.position(Body::Moon, natal_jd)?.longitude;
            let julian_day =
                lunar_return(ephemeris, natal_moon, target_julian_day(spec)?, precision)?;
            debug!("Lunar return at JD {:.5}", julian_day);

            let mut metadata = metadata_for(spec, julian_day)?;
            metadata.source_datetime = Some(spec.datetime);
            chart_at(ephemeris, metadata, &objects)
        }
        ChartType::Progressed => progressed_chart(ephemeris, spec, natal_jd, &objects),
        ChartType::Composite => Err(ChartError::invalid(
            "Composite charts are computed from two charts",
        )),
    }
}

/// Instant whose positions stand for `elapsed` days of life
fn progressed_julian_day(kind: ProgressionKind, natal_jd: f64, elapsed: f64) -> f64 {
    match kind {
        ProgressionKind::Secondary | ProgressionKind::SolarArc => {
            natal_jd + elapsed / TROPICAL_YEAR_DAYS
        }
        ProgressionKind::Tertiary => natal_jd + elapsed / SIDEREAL_MONTH_DAYS,
        ProgressionKind::Minor => natal_jd + elapsed / TROPICAL_YEAR_DAYS * SIDEREAL_MONTH_DAYS,
    }
}

fn progressed_chart(
    ephemeris: &dyn Ephemeris,
    spec: &ChartSpec,
    natal_jd: f64,
    objects: &BTreeSet<Body>,
) -> Result<Chart, ChartError> {
    let kind = spec.progression.unwrap_or_default();
    let target_jd = target_julian_day(spec)?;
    let progressed_jd = progressed_julian_day(kind, natal_jd, target_jd - natal_jd);

    if kind != ProgressionKind::SolarArc {
        let mut metadata = metadata_for(spec, progressed_jd)?;
        metadata.source_datetime = Some(spec.datetime);
        return chart_at(ephemeris, metadata, objects);
    }

    let natal_metadata = metadata_for(spec, natal_jd)?;
    let natal = chart_at(ephemeris, natal_metadata, objects)?;
    let natal_sun = natal
        .object(Body::Sun)
        .map(|sun| sun.longitude)
        .ok_or_else(|| ChartError::Internal("natal chart without the Sun".to_string()))?;
    let progressed_sun = ephemeris.position(Body::Sun, progressed_jd)?.longitude;
    let arc = (progressed_sun - natal_sun).rem_euclid(360.0);
    debug!("Solar arc of {:.4} degrees", arc);

    let mut cusps = natal.cusps;
    for cusp in cusps.iter_mut() {
        *cusp = (*cusp + arc).rem_euclid(360.0);
    }
    let placed = natal
        .objects
        .values()
        .map(|object| {
            let longitude = (object.longitude + arc).rem_euclid(360.0);
            let house = house_of(longitude, &cusps);
            (
                object.body,
                CelestialObject::new(object.body, longitude, object.latitude, object.speed, house),
            )
        })
        .collect();

    let mut metadata = metadata_for(spec, target_jd)?;
    metadata.source_datetime = Some(spec.datetime);
    Ok(Chart {
        metadata,
        objects: placed,
        cusps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::synthetic::{SyntheticEphemeris, EPOCH};
    use crate::events::DEFAULT_PRECISION;
    use crate::models::{HouseSystem, OrbTable};
    use chrono::{DateTime, TimeZone, Utc};

    fn spec(chart_type: ChartType, target: Option<DateTime<Utc>>) -> ChartSpec {
        ChartSpec {
            chart_type,
            datetime: Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap(),
            latitude: 51.5,
            longitude: 0.0,
            timezone: chrono_tz::UTC,
            house_system: HouseSystem::Equal,
            included: Body::planets().iter().copied().collect(),
            orbs: OrbTable::default(),
            target,
            progression: (chart_type == ChartType::Progressed)
                .then_some(ProgressionKind::Secondary),
        }
    }

    fn sun(chart: &Chart) -> f64 {
        chart.object(Body::Sun).unwrap().longitude
    }

    #[test]
    fn test_natal_chart_places_objects_and_houses() {
        let ephemeris = SyntheticEphemeris::new();
        let chart = compute_chart(&ephemeris, &spec(ChartType::Natal, None), DEFAULT_PRECISION)
            .unwrap();

        assert_eq!(chart.objects.len(), Body::chart_defaults().len());
        assert!((chart.metadata.julian_day - EPOCH).abs() < 1e-9);
        assert!((sun(&chart) - 7.0).abs() < 1e-9);
        assert_eq!(chart.object(Body::Sun).unwrap().house, 1);
        assert!((chart.cusps[3] - 90.0).abs() < 1e-9);
        assert!(chart.object(Body::Ascendant).unwrap().speed > 300.0);
    }

    #[test]
    fn test_unavailable_body_fails_the_chart() {
        let ephemeris = SyntheticEphemeris::new().with_unavailable(Body::Pluto);
        let result = compute_chart(&ephemeris, &spec(ChartType::Natal, None), DEFAULT_PRECISION);
        assert!(matches!(result, Err(ChartError::DataUnavailable(_))));
    }

    #[test]
    fn test_secondary_progression_advances_a_day_per_year() {
        let ephemeris = SyntheticEphemeris::new();
        let target = Utc.with_ymd_and_hms(2010, 1, 1, 12, 0, 0).unwrap();
        let chart = compute_chart(
            &ephemeris,
            &spec(ChartType::Progressed, Some(target)),
            DEFAULT_PRECISION,
        )
        .unwrap();

        let days = 3653.0 / TROPICAL_YEAR_DAYS;
        assert!((chart.metadata.julian_day - (EPOCH + days)).abs() < 1e-6);
        assert!((sun(&chart) - (7.0 + 0.9856 * days)).abs() < 1e-6);
        assert!(chart.metadata.source_datetime.is_some());
    }

    #[test]
    fn test_solar_arc_shifts_every_point() {
        let ephemeris = SyntheticEphemeris::new();
        let target = Utc.with_ymd_and_hms(2010, 1, 1, 12, 0, 0).unwrap();
        let mut solar_arc = spec(ChartType::Progressed, Some(target));
        solar_arc.progression = Some(ProgressionKind::SolarArc);
        let chart = compute_chart(&ephemeris, &solar_arc, DEFAULT_PRECISION).unwrap();

        let arc = 0.9856 * 3653.0 / TROPICAL_YEAR_DAYS;
        assert!((sun(&chart) - (7.0 + arc)).abs() < 1e-6);
        assert!((chart.object(Body::Moon).unwrap().longitude - (30.0 + arc)).abs() < 1e-6);
        assert!((chart.cusps[0] - arc).abs() < 1e-6);
    }

    #[test]
    fn test_solar_return_restores_natal_sun() {
        let ephemeris = SyntheticEphemeris::new();
        let target = Utc.with_ymd_and_hms(2003, 6, 1, 0, 0, 0).unwrap();
        let chart = compute_chart(
            &ephemeris,
            &spec(ChartType::SolarReturn, Some(target)),
            DEFAULT_PRECISION,
        )
        .unwrap();

        assert!((sun(&chart) - 7.0).abs() < 0.01);
        assert_eq!(chart.metadata.datetime.year(), 2003);
    }

    #[test]
    fn test_lunar_return_follows_target() {
        let ephemeris = SyntheticEphemeris::new();
        let target = Utc.with_ymd_and_hms(2000, 2, 1, 0, 0, 0).unwrap();
        let chart = compute_chart(
            &ephemeris,
            &spec(ChartType::LunarReturn, Some(target)),
            DEFAULT_PRECISION,
        )
        .unwrap();

        let moon = chart.object(Body::Moon).unwrap().longitude;
        assert!((moon - 30.0).abs() < 0.05);
        assert!(chart.metadata.datetime >= target);
    }
}
