//! Conversions between civil time and Julian days

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::ChartError;

/// Julian day of the Unix epoch (1970-01-01T00:00:00Z)
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Convert a UTC instant to a Julian day (UT)
pub fn datetime_to_julian_day(datetime: DateTime<Utc>) -> f64 {
    let seconds =
        datetime.timestamp() as f64 + f64::from(datetime.timestamp_subsec_nanos()) / 1e9;
    UNIX_EPOCH_JD + seconds / SECONDS_PER_DAY
}

/// Convert a Julian day (UT) back to a UTC instant, rounded to the millisecond
pub fn julian_day_to_datetime(julian_day: f64) -> Result<DateTime<Utc>, ChartError> {
    let millis = ((julian_day - UNIX_EPOCH_JD) * SECONDS_PER_DAY * 1000.0).round();
    if !millis.is_finite() {
        return Err(ChartError::Internal(format!(
            "Julian day {} is not a valid instant",
            julian_day
        )));
    }
    DateTime::from_timestamp_millis(millis as i64).ok_or_else(|| {
        ChartError::Internal(format!("Julian day {} is out of range", julian_day))
    })
}

/// Parse an ISO 8601 timestamp.
///
/// Timestamps carrying an offset (`Z`, `+02:00`) are absolute. Naive timestamps
/// and bare dates are wall-clock times in `timezone`.
pub fn parse_instant(input: &str, timezone: Tz) -> Result<DateTime<Utc>, ChartError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ChartError::invalid("Empty datetime"));
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(datetime.with_timezone(&Utc));
    }
    if let Ok(datetime) = DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%z") {
        return Ok(datetime.with_timezone(&Utc));
    }

    let naive = parse_naive(trimmed).ok_or_else(|| {
        ChartError::invalid(format!(
            "Invalid datetime format: {}. Expected ISO 8601 (YYYY-MM-DDTHH:MM:SS)",
            input
        ))
    })?;

    // Convert local time to UTC
    timezone
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            ChartError::invalid(format!(
                "Ambiguous or invalid local time {} in {}",
                input,
                timezone.name()
            ))
        })
}

fn parse_naive(input: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];

    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
