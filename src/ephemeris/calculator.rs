//! Swiss Ephemeris wrapper for planetary calculations
//!
//! Safe wrappers around the libswisseph-sys FFI bindings. The C library keeps
//! global state and is not reentrant, so every call goes through one
//! process-wide lock.

use std::ffi::{CStr, CString};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use super::houses::{calc_houses, HousePositions};
use super::{BodyPosition, Ephemeris};
use crate::error::ChartError;
use crate::models::{Body, HouseSystem};

// Swiss Ephemeris constants
const SEFLG_SPEED: i32 = 256; // Include speed in calculations
const SEFLG_SWIEPH: i32 = 2; // Use Swiss Ephemeris

static SWE_LOCK: Mutex<()> = Mutex::new(());

fn swe_lock() -> MutexGuard<'static, ()> {
    // The guarded value is unit; a panic elsewhere leaves nothing inconsistent
    SWE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Production ephemeris backed by the Swiss Ephemeris C library
#[derive(Debug, Clone)]
pub struct SwissEphemeris {
    data_path: Option<String>,
}

impl SwissEphemeris {
    /// Initialise the library. Without a data path the Moshier analytical
    /// ephemeris is used (planets, Moon, nodes and Lilith only).
    pub fn new(data_path: Option<&Path>) -> Result<Self, ChartError> {
        let _guard = swe_lock();

        let data_path = match data_path {
            Some(path) => {
                let display_path = path.to_string_lossy().into_owned();
                let c_path = CString::new(display_path.clone()).map_err(|_| {
                    ChartError::invalid(format!("Ephemeris path contains a NUL byte: {}", display_path))
                })?;
                let raw = c_path.into_raw();
                unsafe {
                    // The library copies the path into its own buffer
                    libswisseph_sys::swe_set_ephe_path(raw);
                    drop(CString::from_raw(raw));
                }
                info!("Swiss Ephemeris data path: {}", display_path);
                Some(display_path)
            }
            None => {
                unsafe {
                    libswisseph_sys::swe_set_ephe_path(std::ptr::null_mut());
                }
                info!("Swiss Ephemeris using Moshier analytical ephemeris");
                None
            }
        };

        Ok(Self { data_path })
    }

    pub fn data_path(&self) -> Option<&str> {
        self.data_path.as_deref()
    }
}

fn calc_body(swe_id: i32, body: Body, julian_day: f64) -> Result<BodyPosition, ChartError> {
    let mut xx: [f64; 6] = [0.0; 6];
    let mut serr: [i8; 256] = [0; 256];

    let iflg = SEFLG_SPEED | SEFLG_SWIEPH;

    let ret = {
        let _guard = swe_lock();
        unsafe {
            libswisseph_sys::swe_calc_ut(
                julian_day,
                swe_id,
                iflg,
                xx.as_mut_ptr(),
                serr.as_mut_ptr(),
            )
        }
    };

    if ret < 0 {
        let error_msg = unsafe { CStr::from_ptr(serr.as_ptr()) }
            .to_string_lossy()
            .to_string();
        debug!("swe_calc_ut failed for {} at JD {}: {}", body, julian_day, error_msg);
        return Err(ChartError::DataUnavailable(format!(
            "{} at JD {:.5}: {}",
            body, julian_day, error_msg
        )));
    }

    if xx.iter().take(4).any(|value| !value.is_finite()) {
        return Err(ChartError::DataUnavailable(format!(
            "{} at JD {:.5}: non-finite position",
            body, julian_day
        )));
    }

    Ok(BodyPosition {
        longitude: xx[0].rem_euclid(360.0),
        latitude: xx[1],
        speed: xx[3],
    })
}

impl Ephemeris for SwissEphemeris {
    fn position(&self, body: Body, julian_day: f64) -> Result<BodyPosition, ChartError> {
        if body == Body::SouthNode {
            let north = calc_body(
                Body::NorthNode.swe_id().unwrap_or_default(),
                Body::NorthNode,
                julian_day,
            )?;
            return Ok(BodyPosition {
                longitude: (north.longitude + 180.0).rem_euclid(360.0),
                latitude: -north.latitude,
                speed: north.speed,
            });
        }

        let swe_id = body.swe_id().ok_or_else(|| {
            ChartError::invalid(format!("{} requires a location; compute it from houses", body))
        })?;
        calc_body(swe_id, body, julian_day)
    }

    fn houses(
        &self,
        julian_day: f64,
        latitude: f64,
        longitude: f64,
        system: HouseSystem,
    ) -> Result<HousePositions, ChartError> {
        let _guard = swe_lock();
        calc_houses(julian_day, latitude, longitude, system)
    }
}
