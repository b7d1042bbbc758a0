//! Pairwise aspects of a chart as a graph keyed by body pair

use std::collections::{BTreeMap, BTreeSet};

use super::matcher::match_points;
use crate::error::ChartError;
use crate::models::{Aspect, AspectType, Body, Chart, CrossAspect, OrbTable};

/// Chart bodies as nodes, aspects within orb as edges
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AspectGraph {
    nodes: BTreeSet<Body>,
    edges: BTreeMap<(Body, Body), Aspect>,
}

fn pair_key(a: Body, b: Body) -> (Body, Body) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl AspectGraph {
    pub fn new(nodes: impl IntoIterator<Item = Body>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            edges: BTreeMap::new(),
        }
    }

    /// Match every pair of chart objects where at least one is in `included`
    pub fn build(
        chart: &Chart,
        included: &BTreeSet<Body>,
        orbs: &OrbTable,
    ) -> Result<Self, ChartError> {
        let mut graph = Self::new(chart.objects.keys().copied());
        let objects: Vec<_> = chart.objects.values().collect();

        for (i, first) in objects.iter().enumerate() {
            for second in &objects[i + 1..] {
                if !included.contains(&first.body) && !included.contains(&second.body) {
                    continue;
                }
                let matched = match_points(
                    (first.longitude, first.speed),
                    (second.longitude, second.speed),
                    orbs,
                )?;
                if let Some((found, applying)) = matched {
                    graph.insert(Aspect::new(
                        first.body,
                        second.body,
                        found.aspect_type,
                        found.orb,
                        applying,
                    ));
                }
            }
        }

        Ok(graph)
    }

    /// Add an edge, replacing any edge already present for the pair
    pub fn insert(&mut self, aspect: Aspect) {
        self.nodes.insert(aspect.first);
        self.nodes.insert(aspect.second);
        self.edges
            .insert(pair_key(aspect.first, aspect.second), aspect);
    }

    pub fn nodes(&self) -> &BTreeSet<Body> {
        &self.nodes
    }

    pub fn edge(&self, a: Body, b: Body) -> Option<&Aspect> {
        self.edges.get(&pair_key(a, b))
    }

    /// Whether `a` and `b` are joined by an edge of `aspect_type`
    pub fn is(&self, a: Body, b: Body, aspect_type: AspectType) -> bool {
        self.edge(a, b)
            .is_some_and(|aspect| aspect.aspect_type == aspect_type)
    }

    pub fn edges_of_type(&self, aspect_type: AspectType) -> impl Iterator<Item = &Aspect> + '_ {
        self.edges
            .values()
            .filter(move |aspect| aspect.aspect_type == aspect_type)
    }

    /// All edges in pair order
    pub fn aspects(&self) -> Vec<Aspect> {
        self.edges.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Aspects from every object of `first` to every object of `second`
pub fn cross_aspects(
    first: &Chart,
    second: &Chart,
    orbs: &OrbTable,
) -> Result<Vec<CrossAspect>, ChartError> {
    let mut aspects = Vec::new();
    for a in first.objects.values() {
        for b in second.objects.values() {
            let matched = match_points((a.longitude, a.speed), (b.longitude, b.speed), orbs)?;
            if let Some((found, applying)) = matched {
                aspects.push(CrossAspect {
                    first_chart_object: a.body,
                    second_chart_object: b.body,
                    aspect_type: found.aspect_type,
                    orb: found.orb,
                    applying,
                });
            }
        }
    }
    Ok(aspects)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{CelestialObject, ChartMetadata, ChartType, HouseSystem};
    use chrono::{TimeZone, Utc};

    pub(crate) fn chart_with(positions: &[(Body, f64)]) -> Chart {
        let objects = positions
            .iter()
            .map(|(body, longitude)| (*body, CelestialObject::new(*body, *longitude, 0.0, 0.0, 1)))
            .collect();
        Chart {
            metadata: ChartMetadata {
                chart_type: ChartType::Natal,
                datetime: Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap(),
                julian_day: 2_451_545.0,
                latitude: 0.0,
                longitude: 0.0,
                timezone: "UTC".to_string(),
                house_system: HouseSystem::Placidus,
                included: Body::planets().iter().copied().collect(),
                orbs: OrbTable::default(),
                progression: None,
                source_datetime: None,
                cache_key: None,
            },
            objects,
            cusps: [0.0, 30.0, 60.0, 90.0, 120.0, 150.0, 180.0, 210.0, 240.0, 270.0, 300.0, 330.0],
        }
    }

    #[test]
    fn test_build_finds_trine() {
        let chart = chart_with(&[(Body::Sun, 280.5), (Body::Moon, 160.0), (Body::Mars, 30.0)]);
        let graph = AspectGraph::build(&chart, &chart.metadata.included, &OrbTable::default())
            .unwrap();

        let trine = graph.edge(Body::Moon, Body::Sun).unwrap();
        assert_eq!(trine.aspect_type, AspectType::Trine);
        assert_eq!(trine.first, Body::Sun);
        assert!((trine.orb - 0.5).abs() < 1e-9);
        assert!(graph.edge(Body::Sun, Body::Mars).is_none());
    }

    #[test]
    fn test_pairs_outside_inclusion_set_are_skipped() {
        let chart = chart_with(&[(Body::Ceres, 10.0), (Body::Vesta, 12.0), (Body::Sun, 100.0)]);
        let included: BTreeSet<Body> = [Body::Sun].into_iter().collect();
        let graph = AspectGraph::build(&chart, &included, &OrbTable::default()).unwrap();

        assert!(graph.edge(Body::Ceres, Body::Vesta).is_none());
        assert_eq!(graph.nodes().len(), 3);
    }

    #[test]
    fn test_edge_set_independent_of_insertion_order() {
        let mut forward = AspectGraph::default();
        let mut backward = AspectGraph::default();
        let aspects = vec![
            Aspect::new(Body::Sun, Body::Moon, AspectType::Trine, 1.0, false),
            Aspect::new(Body::Mars, Body::Venus, AspectType::Square, 2.0, true),
        ];
        for aspect in &aspects {
            forward.insert(aspect.clone());
        }
        for aspect in aspects.iter().rev() {
            backward.insert(aspect.clone());
        }
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 2);
    }

    #[test]
    fn test_cross_aspects() {
        let first = chart_with(&[(Body::Sun, 0.0)]);
        let second = chart_with(&[(Body::Moon, 182.0), (Body::Venus, 45.0)]);
        let aspects = cross_aspects(&first, &second, &OrbTable::default()).unwrap();

        assert_eq!(aspects.len(), 2);
        assert_eq!(aspects[0].second_chart_object, Body::Moon);
        assert_eq!(aspects[0].aspect_type, AspectType::Opposition);
        assert_eq!(aspects[1].aspect_type, AspectType::SemiSquare);
    }
}
