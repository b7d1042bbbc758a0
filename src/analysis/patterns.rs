//! Aspect configurations found by enumerating small templates over the graph

use std::collections::BTreeSet;

use super::graph::AspectGraph;
use crate::models::{Aspect, AspectType, Body, Pattern, PatternKind};

/// Find every instance of the requested pattern kinds (all kinds when empty).
///
/// Each participant set is reported once per kind.
pub fn detect_patterns(graph: &AspectGraph, kinds: &[PatternKind]) -> Vec<Pattern> {
    let kinds = if kinds.is_empty() {
        PatternKind::all()
    } else {
        kinds
    };

    let mut seen: BTreeSet<(PatternKind, Vec<Body>)> = BTreeSet::new();
    let mut patterns = Vec::new();

    for kind in kinds {
        let found = match kind {
            PatternKind::GrandTrine => grand_trines(graph),
            PatternKind::TSquare => apex_patterns(
                graph,
                PatternKind::TSquare,
                AspectType::Opposition,
                AspectType::Square,
            ),
            PatternKind::Yod => apex_patterns(
                graph,
                PatternKind::Yod,
                AspectType::Sextile,
                AspectType::Quincunx,
            ),
            PatternKind::GrandCross => grand_crosses(graph),
            PatternKind::Kite => kites(graph),
            PatternKind::MysticRectangle => mystic_rectangles(graph),
        };

        for pattern in found {
            if seen.insert((pattern.kind, pattern.participants.clone())) {
                patterns.push(pattern);
            }
        }
    }

    patterns
}

fn pattern(graph: &AspectGraph, kind: PatternKind, bodies: &[Body], apex: Option<Body>) -> Pattern {
    let mut participants = bodies.to_vec();
    participants.sort();

    let mut aspects: Vec<Aspect> = Vec::new();
    for (i, a) in participants.iter().enumerate() {
        for b in &participants[i + 1..] {
            if let Some(aspect) = graph.edge(*a, *b) {
                aspects.push(aspect.clone());
            }
        }
    }

    Pattern {
        kind,
        participants,
        apex,
        aspects,
    }
}

/// Triangles of trines
fn trine_triangles(graph: &AspectGraph) -> Vec<[Body; 3]> {
    let mut triangles = Vec::new();
    for edge in graph.edges_of_type(AspectType::Trine) {
        for &third in graph.nodes().range(edge.second..).skip(1) {
            if graph.is(edge.first, third, AspectType::Trine)
                && graph.is(edge.second, third, AspectType::Trine)
            {
                triangles.push([edge.first, edge.second, third]);
            }
        }
    }
    triangles
}

fn grand_trines(graph: &AspectGraph) -> Vec<Pattern> {
    trine_triangles(graph)
        .iter()
        .map(|triangle| pattern(graph, PatternKind::GrandTrine, triangle, None))
        .collect()
}

/// A base edge of `base` type plus an apex joined to both ends by `legs`
fn apex_patterns(
    graph: &AspectGraph,
    kind: PatternKind,
    base: AspectType,
    legs: AspectType,
) -> Vec<Pattern> {
    let mut found = Vec::new();
    for edge in graph.edges_of_type(base) {
        for &apex in graph.nodes() {
            if apex == edge.first || apex == edge.second {
                continue;
            }
            if graph.is(edge.first, apex, legs) && graph.is(edge.second, apex, legs) {
                found.push(pattern(
                    graph,
                    kind,
                    &[edge.first, edge.second, apex],
                    Some(apex),
                ));
            }
        }
    }
    found
}

/// Disjoint pairs of opposition edges, in pair order
fn opposition_pairs(graph: &AspectGraph) -> Vec<(&Aspect, &Aspect)> {
    let oppositions: Vec<&Aspect> = graph.edges_of_type(AspectType::Opposition).collect();
    let mut pairs = Vec::new();
    for (i, first) in oppositions.iter().enumerate() {
        for second in &oppositions[i + 1..] {
            if first.involves(second.first) || first.involves(second.second) {
                continue;
            }
            pairs.push((*first, *second));
        }
    }
    pairs
}

fn grand_crosses(graph: &AspectGraph) -> Vec<Pattern> {
    opposition_pairs(graph)
        .into_iter()
        .filter(|(first, second)| {
            [first.first, first.second].iter().all(|&a| {
                graph.is(a, second.first, AspectType::Square)
                    && graph.is(a, second.second, AspectType::Square)
            })
        })
        .map(|(first, second)| {
            pattern(
                graph,
                PatternKind::GrandCross,
                &[first.first, first.second, second.first, second.second],
                None,
            )
        })
        .collect()
}

/// Two oppositions whose ends are joined alternately by trines and sextiles
fn mystic_rectangles(graph: &AspectGraph) -> Vec<Pattern> {
    let mut found = Vec::new();
    for (first, second) in opposition_pairs(graph) {
        let (a, b) = (first.first, first.second);
        let (c, d) = (second.first, second.second);

        let straight = graph.is(a, c, AspectType::Trine)
            && graph.is(b, d, AspectType::Trine)
            && graph.is(a, d, AspectType::Sextile)
            && graph.is(b, c, AspectType::Sextile);
        let crossed = graph.is(a, c, AspectType::Sextile)
            && graph.is(b, d, AspectType::Sextile)
            && graph.is(a, d, AspectType::Trine)
            && graph.is(b, c, AspectType::Trine);

        if straight || crossed {
            found.push(pattern(graph, PatternKind::MysticRectangle, &[a, b, c, d], None));
        }
    }
    found
}

/// A grand trine plus a body opposite one vertex and sextile to the other two
fn kites(graph: &AspectGraph) -> Vec<Pattern> {
    let mut found = Vec::new();
    for triangle in trine_triangles(graph) {
        for (index, &vertex) in triangle.iter().enumerate() {
            let others: Vec<Body> = triangle
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, body)| *body)
                .collect();

            for &tail in graph.nodes() {
                if triangle.contains(&tail) {
                    continue;
                }
                if graph.is(tail, vertex, AspectType::Opposition)
                    && others
                        .iter()
                        .all(|&other| graph.is(tail, other, AspectType::Sextile))
                {
                    let bodies = [triangle[0], triangle[1], triangle[2], tail];
                    found.push(pattern(graph, PatternKind::Kite, &bodies, Some(tail)));
                }
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_of(edges: &[(Body, Body, AspectType)]) -> AspectGraph {
        let mut graph = AspectGraph::default();
        for (a, b, aspect_type) in edges {
            graph.insert(Aspect::new(*a, *b, *aspect_type, 1.0, false));
        }
        graph
    }

    #[test]
    fn test_single_grand_trine() {
        let graph = graph_of(&[
            (Body::Sun, Body::Mars, AspectType::Trine),
            (Body::Mars, Body::Saturn, AspectType::Trine),
            (Body::Sun, Body::Saturn, AspectType::Trine),
            (Body::Moon, Body::Venus, AspectType::Square),
        ]);

        let patterns = detect_patterns(&graph, &[PatternKind::GrandTrine]);
        assert_eq!(patterns.len(), 1);
        assert_eq!(
            patterns[0].participants,
            vec![Body::Sun, Body::Mars, Body::Saturn]
        );
        assert_eq!(patterns[0].aspects.len(), 3);
    }

    #[test]
    fn test_two_disjoint_grand_trines() {
        let graph = graph_of(&[
            (Body::Sun, Body::Mars, AspectType::Trine),
            (Body::Mars, Body::Saturn, AspectType::Trine),
            (Body::Sun, Body::Saturn, AspectType::Trine),
            (Body::Moon, Body::Venus, AspectType::Trine),
            (Body::Venus, Body::Uranus, AspectType::Trine),
            (Body::Moon, Body::Uranus, AspectType::Trine),
        ]);

        let patterns = detect_patterns(&graph, &[PatternKind::GrandTrine]);
        assert_eq!(patterns.len(), 2);
        assert_ne!(patterns[0].participants, patterns[1].participants);
    }

    #[test]
    fn test_t_square_and_yod_apex() {
        let graph = graph_of(&[
            (Body::Sun, Body::Moon, AspectType::Opposition),
            (Body::Sun, Body::Mars, AspectType::Square),
            (Body::Moon, Body::Mars, AspectType::Square),
            (Body::Venus, Body::Jupiter, AspectType::Sextile),
            (Body::Venus, Body::Pluto, AspectType::Quincunx),
            (Body::Jupiter, Body::Pluto, AspectType::Quincunx),
        ]);

        let patterns = detect_patterns(&graph, &[]);
        let t_square = patterns
            .iter()
            .find(|p| p.kind == PatternKind::TSquare)
            .unwrap();
        assert_eq!(t_square.apex, Some(Body::Mars));

        let yod = patterns.iter().find(|p| p.kind == PatternKind::Yod).unwrap();
        assert_eq!(yod.apex, Some(Body::Pluto));
        assert_eq!(patterns.len(), 2);
    }

    #[test]
    fn test_grand_cross_contains_t_squares() {
        // Sun 0, Mars 90, Moon 180, Jupiter 270
        let graph = graph_of(&[
            (Body::Sun, Body::Moon, AspectType::Opposition),
            (Body::Mars, Body::Jupiter, AspectType::Opposition),
            (Body::Sun, Body::Mars, AspectType::Square),
            (Body::Sun, Body::Jupiter, AspectType::Square),
            (Body::Moon, Body::Mars, AspectType::Square),
            (Body::Moon, Body::Jupiter, AspectType::Square),
        ]);

        let crosses = detect_patterns(&graph, &[PatternKind::GrandCross]);
        assert_eq!(crosses.len(), 1);
        assert_eq!(crosses[0].participants.len(), 4);
        assert_eq!(crosses[0].aspects.len(), 6);

        let t_squares = detect_patterns(&graph, &[PatternKind::TSquare]);
        assert_eq!(t_squares.len(), 4);
    }

    #[test]
    fn test_kite_and_mystic_rectangle() {
        // Sun 0, Mars 120, Saturn 240, Moon 180
        let kite_graph = graph_of(&[
            (Body::Sun, Body::Mars, AspectType::Trine),
            (Body::Mars, Body::Saturn, AspectType::Trine),
            (Body::Sun, Body::Saturn, AspectType::Trine),
            (Body::Sun, Body::Moon, AspectType::Opposition),
            (Body::Moon, Body::Mars, AspectType::Sextile),
            (Body::Moon, Body::Saturn, AspectType::Sextile),
        ]);
        let kites = detect_patterns(&kite_graph, &[PatternKind::Kite]);
        assert_eq!(kites.len(), 1);
        assert_eq!(kites[0].apex, Some(Body::Moon));

        // Sun 0, Venus 60, Moon 180, Mars 240
        let rectangle_graph = graph_of(&[
            (Body::Sun, Body::Moon, AspectType::Opposition),
            (Body::Venus, Body::Mars, AspectType::Opposition),
            (Body::Sun, Body::Venus, AspectType::Sextile),
            (Body::Moon, Body::Mars, AspectType::Sextile),
            (Body::Sun, Body::Mars, AspectType::Trine),
            (Body::Moon, Body::Venus, AspectType::Trine),
        ]);
        let rectangles = detect_patterns(&rectangle_graph, &[PatternKind::MysticRectangle]);
        assert_eq!(rectangles.len(), 1);
        assert_eq!(
            rectangles[0].participants,
            vec![Body::Sun, Body::Moon, Body::Venus, Body::Mars]
        );
    }

    #[test]
    fn test_empty_graph_has_no_patterns() {
        assert!(detect_patterns(&AspectGraph::default(), &[]).is_empty());
    }
}
