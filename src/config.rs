//! Runtime settings from environment variables

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;

use crate::events::MIN_PRECISION_MINUTES;
use crate::models::{AspectType, HouseSystem, OrbTable};

/// Service configuration
///
/// Environment variables (all optional):
/// - `ASTROLABE_CACHE_ENABLED` (default: true)
/// - `ASTROLABE_CACHE_MAX_ENTRIES` (default: 1000)
/// - `ASTROLABE_CACHE_TTL_SECONDS` (default: 3600)
/// - `ASTROLABE_EPHEMERIS_PATH` (default: platform data dir `ephemeris/` if present)
/// - `ASTROLABE_HOUSE_SYSTEM` (default: placidus)
/// - `ASTROLABE_ORB_CONJUNCTION`, `_OPPOSITION`, `_TRINE`, `_SQUARE` (default: 8)
/// - `ASTROLABE_ORB_SEXTILE` (default: 6), `ASTROLABE_ORB_MINOR` (default: 3)
/// - `ASTROLABE_MAX_BATCH_SIZE` (default: 100)
/// - `ASTROLABE_BATCH_TIMEOUT_SECONDS` (default: 30)
/// - `ASTROLABE_WORKER_POOL_SIZE` (default: available parallelism)
/// - `ASTROLABE_MAX_SEARCH_DAYS` (default: 3660)
/// - `ASTROLABE_PRECISION_MINUTES` (default: 1)
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub cache_enabled: bool,
    pub cache_max_entries: usize,
    pub cache_ttl: Duration,
    pub ephemeris_path: Option<PathBuf>,
    pub default_house_system: HouseSystem,
    pub orbs: OrbTable,
    pub max_batch_size: usize,
    pub batch_timeout: Duration,
    pub worker_pool_size: usize,
    pub max_search_days: f64,
    pub default_precision_minutes: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_max_entries: 1000,
            cache_ttl: Duration::from_secs(3600),
            ephemeris_path: None,
            default_house_system: HouseSystem::Placidus,
            orbs: OrbTable::default(),
            max_batch_size: 100,
            batch_timeout: Duration::from_secs(30),
            worker_pool_size: default_worker_pool_size(),
            max_search_days: 3660.0,
            default_precision_minutes: 1.0,
        }
    }
}

fn default_worker_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_ephemeris_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("com", "astrolabe", "astrolabe")?;
    let path = dirs.data_dir().join("ephemeris");
    path.is_dir().then_some(path)
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::from_lookup(|name| std::env::var(name).ok())?;
        if settings.ephemeris_path.is_none() {
            settings.ephemeris_path = default_ephemeris_path();
        }
        Ok(settings)
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut orbs = defaults.orbs.clone();
        for (suffix, aspects) in [
            ("CONJUNCTION", &[AspectType::Conjunction][..]),
            ("OPPOSITION", &[AspectType::Opposition][..]),
            ("TRINE", &[AspectType::Trine][..]),
            ("SQUARE", &[AspectType::Square][..]),
            ("SEXTILE", &[AspectType::Sextile][..]),
            (
                "MINOR",
                &[
                    AspectType::SemiSextile,
                    AspectType::SemiSquare,
                    AspectType::Sesquiquadrate,
                    AspectType::Quincunx,
                ][..],
            ),
        ] {
            let name = format!("ASTROLABE_ORB_{}", suffix);
            if let Some(orb) = parse_var::<f64>(&name, get(&name))? {
                if !(orb.is_finite() && (0.0..=180.0).contains(&orb)) {
                    return Err(anyhow!("{} must be between 0 and 180, got {}", name, orb));
                }
                for aspect in aspects {
                    orbs.set(*aspect, orb);
                }
            }
        }

        let default_house_system = match get("ASTROLABE_HOUSE_SYSTEM") {
            Some(value) => value
                .parse::<HouseSystem>()
                .map_err(|e| anyhow!("ASTROLABE_HOUSE_SYSTEM: {}", e))?,
            None => defaults.default_house_system,
        };

        let settings = Self {
            cache_enabled: parse_var("ASTROLABE_CACHE_ENABLED", get("ASTROLABE_CACHE_ENABLED"))?
                .unwrap_or(defaults.cache_enabled),
            cache_max_entries: parse_var(
                "ASTROLABE_CACHE_MAX_ENTRIES",
                get("ASTROLABE_CACHE_MAX_ENTRIES"),
            )?
            .unwrap_or(defaults.cache_max_entries),
            cache_ttl: parse_var::<u64>(
                "ASTROLABE_CACHE_TTL_SECONDS",
                get("ASTROLABE_CACHE_TTL_SECONDS"),
            )?
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl),
            ephemeris_path: get("ASTROLABE_EPHEMERIS_PATH").map(PathBuf::from),
            default_house_system,
            orbs,
            max_batch_size: parse_var("ASTROLABE_MAX_BATCH_SIZE", get("ASTROLABE_MAX_BATCH_SIZE"))?
                .unwrap_or(defaults.max_batch_size),
            batch_timeout: parse_var::<f64>(
                "ASTROLABE_BATCH_TIMEOUT_SECONDS",
                get("ASTROLABE_BATCH_TIMEOUT_SECONDS"),
            )?
            .map(Duration::try_from_secs_f64)
            .transpose()
            .context("ASTROLABE_BATCH_TIMEOUT_SECONDS must be a non-negative number of seconds")?
            .unwrap_or(defaults.batch_timeout),
            worker_pool_size: parse_var(
                "ASTROLABE_WORKER_POOL_SIZE",
                get("ASTROLABE_WORKER_POOL_SIZE"),
            )?
            .unwrap_or(defaults.worker_pool_size),
            max_search_days: parse_var("ASTROLABE_MAX_SEARCH_DAYS", get("ASTROLABE_MAX_SEARCH_DAYS"))?
                .unwrap_or(defaults.max_search_days),
            default_precision_minutes: parse_var(
                "ASTROLABE_PRECISION_MINUTES",
                get("ASTROLABE_PRECISION_MINUTES"),
            )?
            .unwrap_or(defaults.default_precision_minutes),
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.worker_pool_size == 0 {
            return Err(anyhow!("ASTROLABE_WORKER_POOL_SIZE must be at least 1"));
        }
        if self.max_batch_size == 0 {
            return Err(anyhow!("ASTROLABE_MAX_BATCH_SIZE must be at least 1"));
        }
        if !(self.max_search_days.is_finite() && self.max_search_days > 0.0) {
            return Err(anyhow!(
                "ASTROLABE_MAX_SEARCH_DAYS must be positive, got {}",
                self.max_search_days
            ));
        }
        if !(self.default_precision_minutes.is_finite()
            && self.default_precision_minutes >= MIN_PRECISION_MINUTES)
        {
            return Err(anyhow!(
                "ASTROLABE_PRECISION_MINUTES must be at least {}, got {}",
                MIN_PRECISION_MINUTES,
                self.default_precision_minutes
            ));
        }
        Ok(())
    }

    /// Default event precision in days
    pub fn default_precision(&self) -> f64 {
        self.default_precision_minutes / 1440.0
    }
}

fn parse_var<T>(name: &str, value: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow!("{}={:?} is invalid: {}", name, raw, e))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();

        assert!(settings.cache_enabled);
        assert_eq!(settings.cache_max_entries, 1000);
        assert_eq!(settings.cache_ttl, Duration::from_secs(3600));
        assert_eq!(settings.max_batch_size, 100);
        assert_eq!(settings.batch_timeout, Duration::from_secs(30));
        assert_eq!(settings.default_house_system, HouseSystem::Placidus);
        assert_eq!(settings.orbs, OrbTable::default());
        assert!((settings.default_precision() - 1.0 / 1440.0).abs() < 1e-12);
    }

    #[test]
    fn test_custom_config() {
        let settings = Settings::from_lookup(lookup(&[
            ("ASTROLABE_CACHE_ENABLED", "false"),
            ("ASTROLABE_MAX_BATCH_SIZE", "10"),
            ("ASTROLABE_BATCH_TIMEOUT_SECONDS", "2.5"),
            ("ASTROLABE_HOUSE_SYSTEM", "whole_sign"),
            ("ASTROLABE_ORB_TRINE", "5"),
            ("ASTROLABE_ORB_MINOR", "1.5"),
            ("ASTROLABE_EPHEMERIS_PATH", "/opt/ephe"),
        ]))
        .unwrap();

        assert!(!settings.cache_enabled);
        assert_eq!(settings.max_batch_size, 10);
        assert_eq!(settings.batch_timeout, Duration::from_millis(2500));
        assert_eq!(settings.default_house_system, HouseSystem::WholeSign);
        assert_eq!(settings.orbs.orb(AspectType::Trine), Some(5.0));
        assert_eq!(settings.orbs.orb(AspectType::Quincunx), Some(1.5));
        assert_eq!(settings.orbs.orb(AspectType::Square), Some(8.0));
        assert_eq!(settings.ephemeris_path, Some(PathBuf::from("/opt/ephe")));
    }

    #[test]
    fn test_malformed_values_are_errors() {
        assert!(Settings::from_lookup(lookup(&[("ASTROLABE_CACHE_MAX_ENTRIES", "lots")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("ASTROLABE_WORKER_POOL_SIZE", "0")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("ASTROLABE_ORB_TRINE", "-1")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("ASTROLABE_HOUSE_SYSTEM", "vedic")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("ASTROLABE_PRECISION_MINUTES", "1e-9")])).is_err());
    }
}
