//! Coordinate parsing and timezone resolution

use chrono_tz::Tz;

use crate::error::ChartError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn limit(&self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Axis::Latitude => "Latitude",
            Axis::Longitude => "Longitude",
        }
    }

    fn negative_direction(&self, direction: char) -> Option<bool> {
        match (self, direction) {
            (Axis::Latitude, 'N') | (Axis::Longitude, 'E') => Some(false),
            (Axis::Latitude, 'S') | (Axis::Longitude, 'W') => Some(true),
            _ => None,
        }
    }
}

/// Parse a coordinate into signed decimal degrees.
///
/// Accepts `"32.72N"`, `"-117.16"`, `"32°43'12\"N"`, `"32 43 12 S"`, `"32:43:12"`
/// and the compact `"117W09"` (degrees, direction, minutes).
pub fn parse_coordinate(input: &str, axis: Axis) -> Result<f64, ChartError> {
    let trimmed = input.trim();
    let invalid = || ChartError::invalid(format!("Invalid {}: {}", axis.name().to_lowercase(), input));

    let direction_at = trimmed
        .char_indices()
        .find(|(_, c)| c.is_ascii_alphabetic() && !matches!(c, 'd' | 'm' | 's'))
        .map(|(index, c)| (index, c.to_ascii_uppercase()));

    let value = match direction_at {
        Some((index, direction)) => {
            let negative = axis.negative_direction(direction).ok_or_else(invalid)?;
            let (before, after) = trimmed.split_at(index);
            let after = &after[direction.len_utf8()..];
            let magnitude = if after.trim().is_empty() {
                parse_dms(before).ok_or_else(invalid)?
            } else {
                // Compact form: degrees before the letter, minutes after it
                let degrees: f64 = before.trim().parse().map_err(|_| invalid())?;
                let minutes: f64 = after.trim().parse().map_err(|_| invalid())?;
                if !(0.0..60.0).contains(&minutes) {
                    return Err(invalid());
                }
                degrees + minutes / 60.0
            };
            if negative {
                -magnitude.abs()
            } else {
                magnitude.abs()
            }
        }
        None => {
            let (negative, rest) = match trimmed.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
            };
            let magnitude = parse_dms(rest).ok_or_else(invalid)?;
            if negative {
                -magnitude
            } else {
                magnitude
            }
        }
    };

    if !value.is_finite() || value.abs() > axis.limit() {
        return Err(ChartError::invalid(format!(
            "{} must be between -{} and {}: {}",
            axis.name(),
            axis.limit(),
            axis.limit(),
            input
        )));
    }

    // Normalise -0.0 so equal coordinates canonicalize identically
    Ok(value + 0.0)
}

/// Parse degrees, minutes, seconds ("32°43'12\"", "32 43 12", "32d43m12s", "32:43:12")
fn parse_dms(input: &str) -> Option<f64> {
    let parts: Vec<f64> = input
        .split(|c: char| matches!(c, '°' | '\'' | '"' | 'd' | 'm' | 's' | ':' | ' ' | '′' | '″'))
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [degrees] => Some(*degrees),
        [degrees, minutes] if *minutes < 60.0 => Some(degrees + minutes / 60.0),
        [degrees, minutes, seconds] if *minutes < 60.0 && *seconds < 60.0 => {
            Some(degrees + minutes / 60.0 + seconds / 3600.0)
        }
        _ => None,
    }
}

/// Resolve a timezone name, abbreviation or UTC offset. `None` means UTC.
pub fn resolve_timezone(input: Option<&str>) -> Result<Tz, ChartError> {
    let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(chrono_tz::UTC);
    };

    if let Ok(tz) = raw.parse::<Tz>() {
        return Ok(tz);
    }

    if let Some(tz) = abbreviation(raw) {
        return Ok(tz);
    }

    if let Some(offset) = parse_utc_offset(raw) {
        return offset;
    }

    let needle = raw.to_lowercase().replace(' ', "_");
    let candidates: Vec<Tz> = chrono_tz::TZ_VARIANTS
        .iter()
        .copied()
        .filter(|tz| tz.name().to_lowercase().contains(&needle))
        .collect();

    match candidates.as_slice() {
        [tz] => Ok(*tz),
        [] => Err(ChartError::LocationUnresolved(format!(
            "Unknown timezone: {}",
            raw
        ))),
        many => Err(ChartError::LocationUnresolved(format!(
            "Ambiguous timezone {}: matches {} zones (e.g. {}, {})",
            raw,
            many.len(),
            many[0].name(),
            many[1].name()
        ))),
    }
}

fn abbreviation(raw: &str) -> Option<Tz> {
    let tz = match raw.to_uppercase().as_str() {
        "PST" | "PDT" => chrono_tz::America::Los_Angeles,
        "MST" | "MDT" => chrono_tz::America::Denver,
        "CST" | "CDT" => chrono_tz::America::Chicago,
        "EST" | "EDT" => chrono_tz::America::New_York,
        "GMT" | "UTC" | "Z" => chrono_tz::UTC,
        "BST" => chrono_tz::Europe::London,
        "CET" | "CEST" => chrono_tz::Europe::Paris,
        _ => return None,
    };
    Some(tz)
}

/// "UTC-8", "GMT+05", "+03:00" map to the fixed Etc/GMT zones
fn parse_utc_offset(raw: &str) -> Option<Result<Tz, ChartError>> {
    let upper = raw.to_uppercase();
    let rest = upper
        .strip_prefix("UTC")
        .or_else(|| upper.strip_prefix("GMT"))
        .unwrap_or(&upper);

    let (sign, digits) = match rest.chars().next()? {
        '+' => (1, &rest[1..]),
        '-' => (-1, &rest[1..]),
        _ => return None,
    };
    if !digits.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return Some(Err(ChartError::LocationUnresolved(format!(
            "Malformed UTC offset: {}",
            raw
        ))));
    }

    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;

    if minutes != 0 {
        return Some(Err(ChartError::LocationUnresolved(format!(
            "No fixed zone for non-whole-hour offset {}",
            raw
        ))));
    }

    let offset = sign * hours;
    if !(-12..=14).contains(&offset) {
        return Some(Err(ChartError::LocationUnresolved(format!(
            "UTC offset out of range: {}",
            raw
        ))));
    }

    // Etc/GMT zones use the POSIX sign convention (Etc/GMT-5 is UTC+5)
    let name = match offset {
        0 => "Etc/GMT".to_string(),
        o if o > 0 => format!("Etc/GMT-{}", o),
        o => format!("Etc/GMT+{}", -o),
    };
    Some(name.parse::<Tz>().map_err(|_| {
        ChartError::LocationUnresolved(format!("Unknown UTC offset: {}", raw))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_with_direction() {
        assert!((parse_coordinate("32.72N", Axis::Latitude).unwrap() - 32.72).abs() < 1e-9);
        assert!((parse_coordinate("117.16W", Axis::Longitude).unwrap() + 117.16).abs() < 1e-9);
        assert!((parse_coordinate("-32.72", Axis::Latitude).unwrap() + 32.72).abs() < 1e-9);
    }

    #[test]
    fn test_parse_dms_and_compact() {
        let lat = parse_coordinate("32°43'12\"N", Axis::Latitude).unwrap();
        assert!((lat - 32.72).abs() < 1e-9);

        let lon = parse_coordinate("117W09", Axis::Longitude).unwrap();
        assert!((lon + 117.15).abs() < 1e-9);
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert!(parse_coordinate("95N", Axis::Latitude).is_err());
        assert!(parse_coordinate("12E", Axis::Latitude).is_err());
        assert!(parse_coordinate("abc", Axis::Longitude).is_err());
    }

    #[test]
    fn test_negative_zero_is_normalised() {
        let value = parse_coordinate("-0.0", Axis::Latitude).unwrap();
        assert!(value.is_sign_positive());
    }

    #[test]
    fn test_resolve_timezone() {
        assert_eq!(resolve_timezone(None).unwrap(), chrono_tz::UTC);
        assert_eq!(
            resolve_timezone(Some("America/Los_Angeles")).unwrap(),
            chrono_tz::America::Los_Angeles
        );
        assert_eq!(
            resolve_timezone(Some("PST")).unwrap(),
            chrono_tz::America::Los_Angeles
        );
        assert_eq!(resolve_timezone(Some("UTC-8")).unwrap().name(), "Etc/GMT+8");
        assert_eq!(
            resolve_timezone(Some("Panama")).unwrap(),
            chrono_tz::America::Panama
        );
    }

    #[test]
    fn test_non_ascii_offset_is_unresolved() {
        for raw in ["UTC+1é1", "GMT-0½", "+１２"] {
            assert!(
                matches!(
                    resolve_timezone(Some(raw)),
                    Err(ChartError::LocationUnresolved(_))
                ),
                "{}",
                raw
            );
        }
        assert!(matches!(
            resolve_timezone(Some("UTC+0530")),
            Err(ChartError::LocationUnresolved(_))
        ));
        assert_eq!(resolve_timezone(Some("GMT+0300")).unwrap().name(), "Etc/GMT-3");
    }

    #[test]
    fn test_unresolvable_timezones() {
        assert!(matches!(
            resolve_timezone(Some("Atlantis/Lost_City")),
            Err(ChartError::LocationUnresolved(_))
        ));
        // Matches America/Indiana/*, America/Argentina/* and more
        assert!(matches!(
            resolve_timezone(Some("America/")),
            Err(ChartError::LocationUnresolved(_))
        ));
    }
}
