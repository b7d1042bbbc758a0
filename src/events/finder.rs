//! Zero-crossing search over a sampled signal
//!
//! The signal is sampled at a coarse step, sign changes between consecutive
//! samples bracket a crossing, and each bracket is bisected until it is
//! narrower than the requested precision.

use tracing::trace;

use crate::error::ChartError;
use crate::models::Body;

/// One minute, in days
pub const DEFAULT_PRECISION: f64 = 1.0 / 1440.0;

/// Finest precision callers may request, in minutes
pub const MIN_PRECISION_MINUTES: f64 = 1e-3;

const MAX_BISECTIONS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Negative to positive
    Rising,
    /// Positive to negative
    Falling,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub julian_day: f64,
    pub direction: Direction,
}

/// A validated `[start, end]` range of Julian days
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchWindow {
    start: f64,
    end: f64,
}

impl SearchWindow {
    pub fn new(start: f64, end: f64, max_days: f64) -> Result<Self, ChartError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(ChartError::invalid("Search window bounds must be finite"));
        }
        if end < start {
            return Err(ChartError::invalid(format!(
                "Search window ends before it starts ({} < {})",
                end, start
            )));
        }
        let span = end - start;
        if span > max_days {
            return Err(ChartError::RangeTooLarge {
                requested_days: span,
                max_days,
            });
        }
        Ok(Self { start, end })
    }

    /// Window for internal follow-up searches whose extent is already bounded
    pub(crate) fn around(start: f64, end: f64) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderOptions {
    /// Coarse sampling step (days)
    pub step: f64,
    /// Bisection stops once the bracket is narrower than this (days)
    pub precision: f64,
    /// Angular signals are wrapped into (−m/2, m/2] for modulus `m`
    pub modulus: Option<f64>,
}

impl FinderOptions {
    pub fn new(step: f64, precision: f64) -> Self {
        Self {
            step,
            precision,
            modulus: None,
        }
    }

    pub fn angular(step: f64, precision: f64, modulus: f64) -> Self {
        Self {
            step,
            precision,
            modulus: Some(modulus),
        }
    }

    fn validate(&self) -> Result<(), ChartError> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(ChartError::invalid(format!(
                "Sampling step must be positive, got {}",
                self.step
            )));
        }
        if !(self.precision.is_finite() && self.precision > 0.0) {
            return Err(ChartError::invalid(format!(
                "Precision must be positive, got {}",
                self.precision
            )));
        }
        if let Some(modulus) = self.modulus {
            if !(modulus.is_finite() && modulus > 0.0) {
                return Err(ChartError::invalid(format!(
                    "Modulus must be positive, got {}",
                    modulus
                )));
            }
        }
        Ok(())
    }

    fn wrap(&self, value: f64) -> f64 {
        match self.modulus {
            Some(modulus) => wrap_signed(value, modulus),
            None => value,
        }
    }
}

/// How finely a body search samples and refines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// Bisection precision (days)
    pub precision: f64,
    /// Coarse step override (days); each body's own step otherwise
    pub step: Option<f64>,
}

impl Resolution {
    pub fn new(precision: f64) -> Self {
        Self {
            precision,
            step: None,
        }
    }

    pub fn with_step(self, step: f64) -> Self {
        Self {
            step: Some(step),
            ..self
        }
    }

    pub fn step_for(&self, body: Body) -> f64 {
        self.step.unwrap_or_else(|| body.sampling_step())
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION)
    }
}

/// Wrap `value` into (−modulus/2, modulus/2]
pub fn wrap_signed(value: f64, modulus: f64) -> f64 {
    let half = modulus / 2.0;
    let wrapped = value.rem_euclid(modulus);
    if wrapped > half {
        wrapped - modulus
    } else {
        wrapped
    }
}

/// Find every zero crossing of `signal` within `window`.
///
/// A sample that is exactly zero is reported once. For angular signals a
/// sign change whose samples jump by at least half the modulus is the wrap
/// seam, not a crossing.
pub fn find_crossings<F>(
    mut signal: F,
    window: &SearchWindow,
    options: &FinderOptions,
) -> Result<Vec<Crossing>, ChartError>
where
    F: FnMut(f64) -> Result<f64, ChartError>,
{
    options.validate()?;

    let mut sample = |t: f64| -> Result<f64, ChartError> {
        let value = options.wrap(signal(t)?);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ChartError::Internal(format!("Signal is not finite at JD {}", t)))
        }
    };

    let mut samples: Vec<(f64, f64)> = Vec::new();
    let mut index = 0u64;
    loop {
        let t = window.start + index as f64 * options.step;
        if t >= window.end {
            break;
        }
        samples.push((t, sample(t)?));
        index += 1;
    }
    samples.push((window.end, sample(window.end)?));

    let mut crossings = Vec::new();
    for i in 0..samples.len() {
        let (t, value) = samples[i];

        if value == 0.0 {
            let previous = i.checked_sub(1).map(|j| samples[j].1);
            let next = samples.get(i + 1).map(|s| s.1);
            let direction = match (previous, next) {
                (Some(p), _) if p > 0.0 => Direction::Falling,
                (Some(p), _) if p < 0.0 => Direction::Rising,
                (_, Some(n)) if n < 0.0 => Direction::Falling,
                _ => Direction::Rising,
            };
            crossings.push(Crossing {
                julian_day: t,
                direction,
            });
            continue;
        }

        if i == 0 {
            continue;
        }
        let (t_prev, v_prev) = samples[i - 1];
        if v_prev == 0.0 || v_prev.signum() == value.signum() {
            continue;
        }
        if let Some(modulus) = options.modulus {
            if (value - v_prev).abs() >= modulus / 2.0 {
                trace!("Skipping wrap seam between JD {} and {}", t_prev, t);
                continue;
            }
        }

        let julian_day = bisect(&mut sample, t_prev, v_prev, t, options.precision)?;
        crossings.push(Crossing {
            julian_day,
            direction: if v_prev < 0.0 {
                Direction::Rising
            } else {
                Direction::Falling
            },
        });
    }

    Ok(crossings)
}

fn bisect<F>(
    sample: &mut F,
    mut lo: f64,
    mut f_lo: f64,
    mut hi: f64,
    precision: f64,
) -> Result<f64, ChartError>
where
    F: FnMut(f64) -> Result<f64, ChartError>,
{
    let mut iterations = 0;
    while hi - lo > precision && iterations < MAX_BISECTIONS {
        let mid = (lo + hi) / 2.0;
        // Bracket is down to adjacent floats
        if mid <= lo || mid >= hi {
            break;
        }
        iterations += 1;
        let f_mid = sample(mid)?;
        if f_mid == 0.0 {
            return Ok(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    Ok((lo + hi) / 2.0)
}
