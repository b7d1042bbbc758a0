//! Deterministic ephemeris for tests: linear motion plus an optional epicycle

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{BodyPosition, Ephemeris, HousePositions};
use crate::error::ChartError;
use crate::models::{Body, HouseSystem};

pub const EPOCH: f64 = 2_451_545.0;

/// `longitude(t) = start + rate·(t − EPOCH) + amplitude·sin(τ·(t − EPOCH)/period)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub start: f64,
    pub rate: f64,
    pub amplitude: f64,
    pub period: f64,
}

impl Motion {
    pub fn linear(start: f64, rate: f64) -> Self {
        Self {
            start,
            rate,
            amplitude: 0.0,
            period: 1.0,
        }
    }

    pub fn fixed(longitude: f64) -> Self {
        Self::linear(longitude, 0.0)
    }

    /// Net direct motion with a loop; retrograde when `amplitude·τ/period > rate`
    pub fn looping(start: f64, rate: f64, amplitude: f64, period: f64) -> Self {
        Self {
            start,
            rate,
            amplitude,
            period,
        }
    }

    pub fn longitude(&self, julian_day: f64) -> f64 {
        let t = julian_day - EPOCH;
        (self.start + self.rate * t + self.amplitude * (TAU * t / self.period).sin())
            .rem_euclid(360.0)
    }

    pub fn speed(&self, julian_day: f64) -> f64 {
        let t = julian_day - EPOCH;
        self.rate + self.amplitude * TAU / self.period * (TAU * t / self.period).cos()
    }
}

#[derive(Debug)]
pub struct SyntheticEphemeris {
    motions: BTreeMap<Body, Motion>,
    unavailable: BTreeSet<Body>,
    delay: Option<Duration>,
    /// Extra sleep for queries earlier than the Julian day
    slow_before: Option<(f64, Duration)>,
    calls: AtomicUsize,
}

impl Default for SyntheticEphemeris {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticEphemeris {
    /// Every non-angle body moving at roughly its mean rate
    pub fn new() -> Self {
        let rates = [
            (Body::Sun, 0.9856),
            (Body::Moon, 13.1764),
            (Body::Mercury, 1.3),
            (Body::Venus, 1.2),
            (Body::Mars, 0.524),
            (Body::Jupiter, 0.083),
            (Body::Saturn, 0.033),
            (Body::Uranus, 0.0117),
            (Body::Neptune, 0.006),
            (Body::Pluto, 0.004),
            (Body::NorthNode, -0.053),
            (Body::SouthNode, -0.053),
            (Body::Chiron, 0.02),
            (Body::Lilith, 0.111),
            (Body::Ceres, 0.214),
            (Body::Pallas, 0.214),
            (Body::Juno, 0.226),
            (Body::Vesta, 0.272),
        ];
        let motions = rates
            .iter()
            .enumerate()
            .map(|(i, (body, rate))| (*body, Motion::linear(i as f64 * 23.0 + 7.0, *rate)))
            .collect();

        Self {
            motions,
            unavailable: BTreeSet::new(),
            delay: None,
            slow_before: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_motion(mut self, body: Body, motion: Motion) -> Self {
        self.motions.insert(body, motion);
        self
    }

    pub fn with_unavailable(mut self, body: Body) -> Self {
        self.unavailable.insert(body);
        self
    }

    /// Sleep on every position query
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep only on queries before `julian_day`
    pub fn with_delay_before(mut self, julian_day: f64, delay: Duration) -> Self {
        self.slow_before = Some((julian_day, delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Ephemeris for SyntheticEphemeris {
    fn position(&self, body: Body, julian_day: f64) -> Result<BodyPosition, ChartError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some((cutoff, delay)) = self.slow_before {
            if julian_day < cutoff {
                std::thread::sleep(delay);
            }
        }
        if self.unavailable.contains(&body) {
            return Err(ChartError::DataUnavailable(format!("no data for {}", body)));
        }
        let motion = self
            .motions
            .get(&body)
            .ok_or_else(|| ChartError::invalid(format!("{} requires a location", body)))?;
        Ok(BodyPosition {
            longitude: motion.longitude(julian_day),
            latitude: 0.0,
            speed: motion.speed(julian_day),
        })
    }

    /// Equal houses from an Ascendant turning once per sidereal day
    fn houses(
        &self,
        julian_day: f64,
        _latitude: f64,
        longitude: f64,
        _system: HouseSystem,
    ) -> Result<HousePositions, ChartError> {
        let ascendant = (360.985_647 * (julian_day - EPOCH) + longitude).rem_euclid(360.0);
        let mut cusps = [0.0; 12];
        for (i, cusp) in cusps.iter_mut().enumerate() {
            *cusp = (ascendant + 30.0 * i as f64).rem_euclid(360.0);
        }
        Ok(HousePositions {
            cusps,
            ascendant,
            midheaven: (ascendant - 90.0).rem_euclid(360.0),
        })
    }
}
