//! House system calculations using Swiss Ephemeris

use crate::error::ChartError;
use crate::models::HouseSystem;

/// Result of house calculation
#[derive(Debug, Clone, PartialEq)]
pub struct HousePositions {
    /// House cusps (12 houses, index 0 = 1st house)
    pub cusps: [f64; 12],
    pub ascendant: f64,
    pub midheaven: f64,
}

/// Calculate house cusps for a given time and location.
///
/// Callers must hold the ephemeris lock.
pub(crate) fn calc_houses(
    julian_day: f64,
    latitude: f64,
    longitude: f64,
    system: HouseSystem,
) -> Result<HousePositions, ChartError> {
    // Swiss Ephemeris uses a 13-element array for cusps (index 1-12)
    // and a 10-element array for special points
    let mut cusps: [f64; 13] = [0.0; 13];
    let mut ascmc: [f64; 10] = [0.0; 10];

    let ret = unsafe {
        libswisseph_sys::swe_houses(
            julian_day,
            latitude,
            longitude,
            i32::from(system.code()),
            cusps.as_mut_ptr(),
            ascmc.as_mut_ptr(),
        )
    };

    if ret < 0 {
        return Err(ChartError::DataUnavailable(format!(
            "{} houses unavailable at latitude {:.2}",
            system, latitude
        )));
    }

    let mut house_cusps: [f64; 12] = [0.0; 12];
    house_cusps.copy_from_slice(&cusps[1..13]);

    Ok(HousePositions {
        cusps: house_cusps,
        ascendant: ascmc[0],
        midheaven: ascmc[1],
    })
}

/// Determine which house (1-12) a longitude falls in.
///
/// A point belongs to the house whose cusp it has passed and whose successor
/// cusp it has not, including houses that straddle 0° Aries.
pub fn house_of(longitude: f64, cusps: &[f64; 12]) -> u8 {
    let lon = longitude.rem_euclid(360.0);

    for i in 0..12 {
        let start = cusps[i].rem_euclid(360.0);
        let end = cusps[(i + 1) % 12].rem_euclid(360.0);

        let in_house = if start <= end {
            lon >= start && lon < end
        } else {
            lon >= start || lon < end
        };

        if in_house {
            return (i + 1) as u8;
        }
    }

    // Degenerate cusps (all equal)
    1
}
