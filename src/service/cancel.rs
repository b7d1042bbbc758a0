//! Cooperative cancellation checked at every ephemeris call

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::ephemeris::{BodyPosition, Ephemeris, HousePositions};
use crate::error::ChartError;
use crate::models::{Body, HouseSystem};

/// Shared cancellation flag plus an optional deadline
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// Never cancelled unless [`Cancellation::cancel`] is called
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn check(&self) -> Result<(), ChartError> {
        if self.is_cancelled() {
            Err(ChartError::TimedOut(
                "computation cancelled before completion".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Ephemeris that fails with `TimedOut` once the computation is cancelled.
/// The check runs after each query completes.
pub struct Checked<'a> {
    inner: &'a dyn Ephemeris,
    cancel: &'a Cancellation,
}

impl<'a> Checked<'a> {
    pub fn new(inner: &'a dyn Ephemeris, cancel: &'a Cancellation) -> Self {
        Self { inner, cancel }
    }
}

impl Ephemeris for Checked<'_> {
    fn position(&self, body: Body, julian_day: f64) -> Result<BodyPosition, ChartError> {
        let position = self.inner.position(body, julian_day)?;
        self.cancel.check()?;
        Ok(position)
    }

    fn houses(
        &self,
        julian_day: f64,
        latitude: f64,
        longitude: f64,
        system: HouseSystem,
    ) -> Result<HousePositions, ChartError> {
        let houses = self.inner.houses(julian_day, latitude, longitude, system)?;
        self.cancel.check()?;
        Ok(houses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::synthetic::SyntheticEphemeris;
    use std::time::Duration;

    #[test]
    fn test_cancel_flag_is_shared() {
        let cancel = Cancellation::none();
        let clone = cancel.clone();
        assert!(cancel.check().is_ok());

        clone.cancel();
        assert!(matches!(cancel.check(), Err(ChartError::TimedOut(_))));
    }

    #[test]
    fn test_deadline_expires() {
        let cancel = Cancellation::with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_checked_ephemeris_stops_after_cancel() {
        let ephemeris = SyntheticEphemeris::new();
        let cancel = Cancellation::none();
        let checked = Checked::new(&ephemeris, &cancel);

        assert!(checked.position(Body::Sun, 2_451_545.0).is_ok());
        cancel.cancel();
        assert!(matches!(
            checked.position(Body::Sun, 2_451_545.0),
            Err(ChartError::TimedOut(_))
        ));
        // The query itself completed before the check
        assert_eq!(ephemeris.calls(), 2);
    }
}
