//! Exact times of the principal lunar phases

use super::finder::{find_crossings, Direction, FinderOptions, Resolution, SearchWindow};
use super::{event_at, sort_events, PositionMemo};
use crate::ephemeris::Ephemeris;
use crate::error::ChartError;
use crate::models::{Body, Event, EventKind, LunarPhaseName, ZodiacSign};

/// Instants when the Moon−Sun elongation reaches each requested phase angle
/// (all four principal phases when `phases` is empty)
pub fn find_moon_phases(
    ephemeris: &dyn Ephemeris,
    phases: &[LunarPhaseName],
    window: &SearchWindow,
    resolution: Resolution,
) -> Result<Vec<Event>, ChartError> {
    let phases = if phases.is_empty() {
        LunarPhaseName::principal()
    } else {
        phases
    };

    let memo = PositionMemo::new(ephemeris);
    let elongation = |t: f64| -> Result<f64, ChartError> {
        let moon = memo.position(Body::Moon, t)?;
        let sun = memo.position(Body::Sun, t)?;
        Ok(moon.longitude - sun.longitude)
    };

    let mut events = Vec::new();
    for &phase in phases {
        let angle = phase.exact_angle().ok_or_else(|| {
            ChartError::invalid(format!("{} has no exact phase angle", phase))
        })?;

        let options = FinderOptions::angular(
            resolution.step_for(Body::Moon),
            resolution.precision,
            360.0,
        );
        let crossings = find_crossings(|t| Ok(elongation(t)? - angle), window, &options)?;

        for crossing in crossings {
            // The elongation only grows; a falling crossing is sampling noise
            if crossing.direction != Direction::Rising {
                continue;
            }
            let moon = memo.position(Body::Moon, crossing.julian_day)?;
            events.push(event_at(
                crossing.julian_day,
                EventKind::PhaseExact {
                    phase,
                    moon_longitude: moon.longitude,
                    moon_sign: ZodiacSign::from_longitude(moon.longitude),
                },
            )?);
        }
    }

    sort_events(&mut events);
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::synthetic::{Motion, SyntheticEphemeris, EPOCH};
    use crate::events::DEFAULT_PRECISION;

    fn lunation_ephemeris() -> SyntheticEphemeris {
        // Elongation grows 12 deg/day from 0: a 30-day synodic month
        SyntheticEphemeris::new()
            .with_motion(Body::Sun, Motion::linear(100.0, 1.0))
            .with_motion(Body::Moon, Motion::linear(100.0, 13.0))
    }

    #[test]
    fn test_principal_phases_in_order() {
        let ephemeris = lunation_ephemeris();
        let window = SearchWindow::new(EPOCH + 1.0, EPOCH + 31.0, 3660.0).unwrap();
        let events = find_moon_phases(&ephemeris, &[], &window, Resolution::default()).unwrap();

        let phases: Vec<LunarPhaseName> = events
            .iter()
            .map(|event| match event.kind {
                EventKind::PhaseExact { phase, .. } => phase,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                LunarPhaseName::FirstQuarter,
                LunarPhaseName::FullMoon,
                LunarPhaseName::LastQuarter,
                LunarPhaseName::NewMoon,
            ]
        );
        assert!((events[1].julian_day - (EPOCH + 15.0)).abs() <= DEFAULT_PRECISION);
        assert!((events[3].julian_day - (EPOCH + 30.0)).abs() <= DEFAULT_PRECISION);
    }

    #[test]
    fn test_phase_filter() {
        let ephemeris = lunation_ephemeris();
        let window = SearchWindow::new(EPOCH + 1.0, EPOCH + 61.0, 3660.0).unwrap();
        let events = find_moon_phases(
            &ephemeris,
            &[LunarPhaseName::FullMoon],
            &window,
            Resolution::default(),
        )
        .unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_intermediate_phases_rejected() {
        let ephemeris = lunation_ephemeris();
        let window = SearchWindow::new(EPOCH, EPOCH + 10.0, 3660.0).unwrap();
        let result = find_moon_phases(
            &ephemeris,
            &[LunarPhaseName::WaxingGibbous],
            &window,
            Resolution::default(),
        );
        assert!(matches!(result, Err(ChartError::InputValidation(_))));
    }
}
