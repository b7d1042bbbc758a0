//! Classifies the angle between two bodies into an aspect

use crate::error::ChartError;
use crate::models::{AspectType, OrbTable};

/// A classified separation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectMatch {
    pub aspect_type: AspectType,
    /// Deviation from the exact angle (in degrees)
    pub orb: f64,
}

/// Signed difference `to − from` wrapped into (−180, 180]
pub fn signed_difference(from: f64, to: f64) -> f64 {
    let diff = (to - from).rem_euclid(360.0);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

/// Normalize any finite angle into a separation within 0-180
pub fn normalize_separation(angle: f64) -> Result<f64, ChartError> {
    if !angle.is_finite() {
        return Err(ChartError::invalid(format!(
            "Separation must be a finite angle, got {}",
            angle
        )));
    }
    let wrapped = angle.rem_euclid(360.0);
    Ok(if wrapped > 180.0 {
        360.0 - wrapped
    } else {
        wrapped
    })
}

/// Find the aspect whose exact angle is closest to `separation`, if any lies
/// within its orb. Ties go to the lower angle.
pub fn classify(separation: f64, orbs: &OrbTable) -> Result<Option<AspectMatch>, ChartError> {
    let separation = normalize_separation(separation)?;

    let mut best: Option<AspectMatch> = None;
    for (aspect_type, max_orb) in orbs.iter() {
        let deviation = (separation - aspect_type.angle()).abs();
        if deviation > max_orb {
            continue;
        }
        // Entries iterate in ascending angle, so strict comparison keeps the lower angle
        if best.map_or(true, |current| deviation < current.orb) {
            best = Some(AspectMatch {
                aspect_type,
                orb: deviation,
            });
        }
    }

    Ok(best)
}

/// Whether the separation between two moving points is closing on `aspect_type`.
///
/// An exact hit or equal speeds count as separating.
pub fn is_applying(
    first_longitude: f64,
    first_speed: f64,
    second_longitude: f64,
    second_speed: f64,
    aspect_type: AspectType,
) -> bool {
    let diff = signed_difference(first_longitude, second_longitude);
    let separation = diff.abs();

    // d|diff|/dt = sign(diff) * d(diff)/dt
    let direction = if diff < 0.0 { -1.0 } else { 1.0 };
    let separation_rate = direction * (second_speed - first_speed);

    let deviation = separation - aspect_type.angle();
    deviation * separation_rate < 0.0
}

/// Classify two moving points: the aspect, its orb and whether it is applying
pub fn match_points(
    first: (f64, f64),
    second: (f64, f64),
    orbs: &OrbTable,
) -> Result<Option<(AspectMatch, bool)>, ChartError> {
    let (first_longitude, first_speed) = first;
    let (second_longitude, second_speed) = second;

    let separation = signed_difference(first_longitude, second_longitude);
    let Some(found) = classify(separation, orbs)? else {
        return Ok(None);
    };

    let applying = is_applying(
        first_longitude,
        first_speed,
        second_longitude,
        second_speed,
        found.aspect_type,
    );
    Ok(Some((found, applying)))
}
