//! Chart analytics: aspect matching, the aspect graph and pattern detection

pub mod graph;
pub mod matcher;
pub mod patterns;

pub use graph::{cross_aspects, AspectGraph};
pub use matcher::{classify, is_applying, match_points, normalize_separation, AspectMatch};
pub use patterns::detect_patterns;

use crate::error::ChartError;
use crate::models::{AnalyzedChart, Body, Chart, MoonPhase, PatternKind};

/// Build the aspect graph from the chart's own inclusion set and orbs, then
/// detect patterns. The Moon's phase is derived when both luminaries are placed.
pub fn analyze(chart: Chart, kinds: &[PatternKind]) -> Result<AnalyzedChart, ChartError> {
    let graph = AspectGraph::build(&chart, &chart.metadata.included, &chart.metadata.orbs)?;
    let patterns = detect_patterns(&graph, kinds);
    let moon_phase = chart
        .object(Body::Sun)
        .zip(chart.object(Body::Moon))
        .map(|(sun, moon)| MoonPhase::from_longitudes(sun.longitude, moon.longitude));

    Ok(AnalyzedChart {
        aspects: graph.aspects(),
        patterns,
        houses: chart.houses(),
        moon_phase,
        chart,
    })
}
