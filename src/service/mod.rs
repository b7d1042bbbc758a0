//! Chart service: validation, caching and computation behind every operation

pub mod batch;
pub mod cancel;
pub mod canonical;
pub mod comparison;
pub mod compute;
pub mod info;
pub mod queries;

pub use batch::{calculate_batch, BatchReport, BatchSlot};
pub use cancel::{Cancellation, Checked};
pub use canonical::ChartSpec;
pub use comparison::{composite_chart, ComparisonKind, Synastry};
pub use compute::compute_chart;
pub use info::ChartInfo;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analysis::{analyze, cross_aspects, detect_patterns, AspectGraph};
use crate::cache::{cache_key, Cache, CacheStats};
use crate::config::Settings;
use crate::ephemeris::Ephemeris;
use crate::error::ChartError;
use crate::models::{
    AnalyzedChart, Chart, ChartRequest, ComparisonQuery, Event, Pattern, PatternKind,
    PatternQuery, ProgressionQuery, RetrogradePeriod,
};

/// Values held by the result cache
#[derive(Debug, Clone)]
pub enum CachedResult {
    Chart(Arc<AnalyzedChart>),
    Events(Arc<Vec<Event>>),
    Retrogrades(Arc<Vec<RetrogradePeriod>>),
    Synastry(Arc<Synastry>),
}

/// Outcome of a two-chart comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "comparison", rename_all = "snake_case")]
pub enum Comparison {
    Synastry(Arc<Synastry>),
    Composite(Arc<AnalyzedChart>),
}

/// Entry point for chart computation. Owns the ephemeris handle, the result
/// cache and the settings; shared across workers behind an `Arc`.
pub struct ChartService {
    ephemeris: Arc<dyn Ephemeris>,
    cache: Cache<CachedResult>,
    settings: Settings,
}

impl ChartService {
    pub fn new(ephemeris: Arc<dyn Ephemeris>, settings: Settings) -> Self {
        let cache = if settings.cache_enabled {
            Cache::new(settings.cache_max_entries, settings.cache_ttl)
        } else {
            Cache::disabled()
        };
        info!(
            "Chart service ready (cache: {}, max entries: {}, workers: {})",
            if cache.is_enabled() { "on" } else { "off" },
            settings.cache_max_entries,
            settings.worker_pool_size
        );

        Self {
            ephemeris,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Return the cached value under `key` or compute, cache and return it.
    /// Failures and cancelled computations are never stored.
    fn cached<T: Clone>(
        &self,
        key: Option<String>,
        cancel: &Cancellation,
        extract: fn(CachedResult) -> Option<T>,
        wrap: fn(T) -> CachedResult,
        compute: impl FnOnce(&dyn Ephemeris) -> Result<T, ChartError>,
    ) -> Result<T, ChartError> {
        if let Some(key) = &key {
            if let Some(found) = self.cache.get(key).and_then(extract) {
                debug!("Cache hit for {}", key);
                return Ok(found);
            }
            debug!("Cache miss for {}", key);
        }

        let ephemeris = Checked::new(self.ephemeris.as_ref(), cancel);
        let value = compute(&ephemeris)?;
        cancel.check()?;

        if let Some(key) = key {
            self.cache.put(key, wrap(value.clone()));
        }
        Ok(value)
    }

    /// Compute (or fetch) a single chart with its aspects and patterns
    pub fn calculate_chart(
        &self,
        request: &ChartRequest,
        cancel: &Cancellation,
    ) -> Result<Arc<AnalyzedChart>, ChartError> {
        let spec = ChartSpec::from_request(request, &self.settings)?;
        self.chart_for_spec(&spec, cancel)
    }

    pub(crate) fn chart_for_spec(
        &self,
        spec: &ChartSpec,
        cancel: &Cancellation,
    ) -> Result<Arc<AnalyzedChart>, ChartError> {
        let key = spec.cache_key();
        let precision = self.settings.default_precision();
        self.cached(
            key.clone(),
            cancel,
            |cached| match cached {
                CachedResult::Chart(chart) => Some(chart),
                _ => None,
            },
            CachedResult::Chart,
            |ephemeris| {
                let mut chart = compute_chart(ephemeris, spec, precision)?;
                chart.metadata.cache_key = key;
                Ok(Arc::new(analyze(chart, &[])?))
            },
        )
    }

    /// Progressed chart for a natal request
    pub fn calculate_progressions(
        &self,
        query: &ProgressionQuery,
        cancel: &Cancellation,
    ) -> Result<Arc<AnalyzedChart>, ChartError> {
        let mut request = query.natal.clone();
        request.chart_type = Some("progressed".to_string());
        if query.target_date.is_some() {
            request.target_date = query.target_date.clone();
        }
        if query.progression_type.is_some() {
            request.progression = query.progression_type.clone();
        }
        self.calculate_chart(&request, cancel)
    }

    /// Patterns of a chart computed here or supplied as a prior result
    pub fn find_patterns(
        &self,
        query: &PatternQuery,
        cancel: &Cancellation,
    ) -> Result<Vec<Pattern>, ChartError> {
        let kinds: Vec<PatternKind> = query
            .pattern_types
            .iter()
            .flatten()
            .map(|name| name.parse::<PatternKind>())
            .collect::<Result<BTreeSet<_>, _>>()?
            .into_iter()
            .collect();

        match (&query.chart, &query.computed_chart) {
            (Some(request), None) => {
                let analyzed = self.calculate_chart(request, cancel)?;
                Ok(analyzed
                    .patterns
                    .iter()
                    .filter(|pattern| kinds.is_empty() || kinds.contains(&pattern.kind))
                    .cloned()
                    .collect())
            }
            (None, Some(value)) => {
                let chart = chart_from_value(value)?;
                let graph =
                    AspectGraph::build(&chart, &chart.metadata.included, &chart.metadata.orbs)?;
                Ok(detect_patterns(&graph, &kinds))
            }
            _ => Err(ChartError::invalid(
                "Provide exactly one of `chart` or `computed_chart`",
            )),
        }
    }

    /// Synastry or composite comparison of two charts
    pub fn compare(
        &self,
        query: &ComparisonQuery,
        cancel: &Cancellation,
    ) -> Result<Comparison, ChartError> {
        let kind = query.comparison.parse::<ComparisonKind>()?;
        let first = ChartSpec::from_request(&query.first, &self.settings)?;
        let second = ChartSpec::from_request(&query.second, &self.settings)?;
        let keys = first.cache_key().zip(second.cache_key());

        match kind {
            ComparisonKind::Synastry => {
                let key = keys.and_then(|(a, b)| cache_key("synastry", &(a, b)));
                let synastry = self.cached(
                    key,
                    cancel,
                    |cached| match cached {
                        CachedResult::Synastry(synastry) => Some(synastry),
                        _ => None,
                    },
                    CachedResult::Synastry,
                    |_| {
                        let a = self.chart_for_spec(&first, cancel)?;
                        let b = self.chart_for_spec(&second, cancel)?;
                        let aspects = cross_aspects(&a.chart, &b.chart, &a.chart.metadata.orbs)?;
                        Ok(Arc::new(Synastry {
                            first: a,
                            second: b,
                            aspects,
                        }))
                    },
                )?;
                Ok(Comparison::Synastry(synastry))
            }
            ComparisonKind::Composite => {
                // Component order follows the sorted keys so swapped inputs agree
                let swap = keys.as_ref().is_some_and(|(a, b)| b < a);
                let (first, second) = if swap {
                    (second, first)
                } else {
                    (first, second)
                };
                let key = keys.and_then(|(a, b)| {
                    let (low, high) = if b < a { (b, a) } else { (a, b) };
                    cache_key("composite", &(low, high))
                });

                let composite = self.cached(
                    key.clone(),
                    cancel,
                    |cached| match cached {
                        CachedResult::Chart(chart) => Some(chart),
                        _ => None,
                    },
                    CachedResult::Chart,
                    |_| {
                        let a = self.chart_for_spec(&first, cancel)?;
                        let b = self.chart_for_spec(&second, cancel)?;
                        let mut chart = composite_chart(&a.chart, &b.chart)?;
                        chart.metadata.cache_key = key;
                        Ok(Arc::new(analyze(chart, &[])?))
                    },
                )?;
                Ok(Comparison::Composite(composite))
            }
        }
    }
}

/// Accept either an analyzed chart or a bare chart as returned earlier
fn chart_from_value(value: &serde_json::Value) -> Result<Chart, ChartError> {
    if let Ok(analyzed) = serde_json::from_value::<AnalyzedChart>(value.clone()) {
        return Ok(analyzed.chart);
    }
    serde_json::from_value::<Chart>(value.clone())
        .map_err(|e| ChartError::invalid(format!("computed_chart is not a chart: {}", e)))
}
