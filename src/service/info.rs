//! What the service can compute, with the defaults it applies

use serde::Serialize;

use super::{ChartService, ComparisonKind};
use crate::models::{AspectType, Body, ChartType, HouseSystem, PatternKind, ProgressionKind};

const CHART_TYPES: [ChartType; 5] = [
    ChartType::Natal,
    ChartType::Transit,
    ChartType::SolarReturn,
    ChartType::LunarReturn,
    ChartType::Progressed,
];

const PROGRESSIONS: [ProgressionKind; 4] = [
    ProgressionKind::Secondary,
    ProgressionKind::Tertiary,
    ProgressionKind::Minor,
    ProgressionKind::SolarArc,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectInfo {
    pub object: Body,
    /// Placed in every chart without `include_objects`
    pub placed_by_default: bool,
    pub can_retrograde: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AspectInfo {
    pub aspect: AspectType,
    pub angle: f64,
    /// Configured default orb; `None` when the aspect is switched off
    pub default_orb: Option<f64>,
    pub major: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartInfo {
    pub chart_types: Vec<ChartType>,
    pub progressions: Vec<ProgressionKind>,
    pub comparisons: Vec<ComparisonKind>,
    pub house_systems: Vec<HouseSystem>,
    pub default_house_system: HouseSystem,
    pub objects: Vec<ObjectInfo>,
    pub aspects: Vec<AspectInfo>,
    pub patterns: Vec<PatternKind>,
    pub dignities: Vec<&'static str>,
}

impl ChartService {
    pub fn chart_info(&self) -> ChartInfo {
        let settings = self.settings();
        let objects = Body::all()
            .iter()
            .map(|&body| ObjectInfo {
                object: body,
                placed_by_default: Body::chart_defaults().contains(&body),
                can_retrograde: body.can_retrograde(),
            })
            .collect();
        let aspects = AspectType::ALL
            .iter()
            .map(|&aspect| AspectInfo {
                aspect,
                angle: aspect.angle(),
                default_orb: settings.orbs.orb(aspect),
                major: AspectType::major_aspects().contains(&aspect),
            })
            .collect();

        ChartInfo {
            chart_types: CHART_TYPES.to_vec(),
            progressions: PROGRESSIONS.to_vec(),
            comparisons: vec![ComparisonKind::Synastry, ComparisonKind::Composite],
            house_systems: HouseSystem::ALL.to_vec(),
            default_house_system: settings.default_house_system,
            objects,
            aspects,
            patterns: PatternKind::all().to_vec(),
            dignities: vec!["ruler", "exalted", "detriment", "fall"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::synthetic::SyntheticEphemeris;
    use crate::service::tests::service_with;

    #[test]
    fn test_chart_info_lists_every_option() {
        let info = service_with(SyntheticEphemeris::new()).chart_info();

        assert_eq!(info.house_systems, HouseSystem::ALL.to_vec());
        assert_eq!(info.objects.len(), Body::all().len());
        assert_eq!(info.aspects.len(), AspectType::ALL.len());
        assert_eq!(info.patterns.len(), 6);

        let trine = info
            .aspects
            .iter()
            .find(|a| a.aspect == AspectType::Trine)
            .unwrap();
        assert_eq!(trine.default_orb, Some(8.0));
        assert!(trine.major);

        let chiron = info.objects.iter().find(|o| o.object == Body::Chiron).unwrap();
        assert!(!chiron.placed_by_default);
        let sun = info.objects.iter().find(|o| o.object == Body::Sun).unwrap();
        assert!(sun.placed_by_default && !sun.can_retrograde);
    }
}
