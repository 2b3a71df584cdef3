//! Distance overlap between route sets.
//!
//! For each route identifier present (with geometry) in every set, the
//! overlap is the length of the directed segments used by all sets divided
//! by the length of the union of their segments. Two 1 km routes sharing
//! 0.5 km overlap by `0.5 / 1.5`. Lengths are planar decimal degrees.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use route_equity_route_models::{RouteSet, Segment};
use serde::Serialize;

use crate::RouteError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapSummary {
    /// Identifiers with non-empty geometry in every set.
    pub shared_routes: usize,
    /// Shared routes whose segment union has zero length.
    pub zero_length_routes: usize,
    /// Mean overlap over the remaining routes; `NaN` when none remain.
    pub mean_overlap: f64,
}

/// Mean proportion of shared distance across `sets`.
///
/// # Errors
///
/// Returns [`RouteError::TooFewSets`] when fewer than two sets are given.
pub fn distance_overlap(sets: &[&RouteSet]) -> Result<OverlapSummary, RouteError> {
    let Some((first, rest)) = sets.split_first().filter(|_| sets.len() >= 2) else {
        return Err(RouteError::TooFewSets {
            required: 2,
            found: sets.len(),
        });
    };

    let mut shared_routes = 0;
    let mut zero_length_routes = 0;
    let mut overlaps = Vec::new();

    for route in first.iter() {
        let routes: Option<Vec<_>> = std::iter::once(Some(route))
            .chain(rest.iter().map(|set| set.get(&route.id)))
            .map(|r| r.filter(|r| !r.vertices.is_empty()))
            .collect();
        let Some(routes) = routes else {
            continue;
        };
        shared_routes += 1;

        let mut usage: BTreeMap<Segment, usize> = BTreeMap::new();
        for r in &routes {
            for segment in r.segments().collect::<BTreeSet<_>>() {
                *usage.entry(segment).or_default() += 1;
            }
        }

        let (mut shared, mut total) = (0.0, 0.0);
        for (segment, count) in &usage {
            let length = segment.planar_length();
            if *count == routes.len() {
                shared += length;
            }
            total += length;
        }

        if total > 0.0 {
            overlaps.push(shared / total);
        } else {
            log::debug!("Route {} has no segment length", route.id);
            zero_length_routes += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let mean_overlap = if overlaps.is_empty() {
        f64::NAN
    } else {
        overlaps.iter().sum::<f64>() / overlaps.len() as f64
    };

    log::info!(
        "Overlap across {} sets: {shared_routes} shared routes, mean {mean_overlap:.3}",
        sets.len()
    );
    Ok(OverlapSummary {
        shared_routes,
        zero_length_routes,
        mean_overlap,
    })
}

#[cfg(test)]
mod tests {
    use route_equity_route_models::{LatLon, RoutePolyline};

    use super::*;

    fn set(label: &str, routes: &[(&str, &[(f64, f64)])]) -> RouteSet {
        let mut set = RouteSet::new(label);
        for (id, points) in routes {
            let vertices = points.iter().map(|&(lat, lon)| LatLon::new(lat, lon)).collect();
            set.insert(RoutePolyline::new((*id).to_string(), vertices, 1.0));
        }
        set
    }

    #[test]
    fn identical_sets_fully_overlap() {
        let a = set("a", &[("1", &[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)])]);
        let summary = distance_overlap(&[&a, &a.clone()]).unwrap();
        assert!((summary.mean_overlap - 1.0).abs() < 1e-12);
    }

    #[test]
    fn disjoint_routes_do_not_overlap() {
        let a = set("a", &[("1", &[(0.0, 0.0), (0.0, 1.0)])]);
        let b = set("b", &[("1", &[(5.0, 5.0), (6.0, 5.0)])]);
        let summary = distance_overlap(&[&a, &b]).unwrap();
        assert!(summary.mean_overlap.abs() < 1e-12);
    }

    #[test]
    fn partial_overlap_uses_union_length() {
        // Shared first unit, then each set diverges for one unit.
        let a = set("a", &[("1", &[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)])]);
        let b = set("b", &[("1", &[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)])]);
        let summary = distance_overlap(&[&a, &b]).unwrap();
        assert!((summary.mean_overlap - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn zero_length_routes_are_counted_not_divided() {
        let a = set("a", &[("1", &[(0.0, 0.0)])]);
        let summary = distance_overlap(&[&a, &a.clone()]).unwrap();
        assert_eq!(summary.shared_routes, 1);
        assert_eq!(summary.zero_length_routes, 1);
        assert!(summary.mean_overlap.is_nan());
    }

    #[test]
    fn needs_two_sets() {
        let a = set("a", &[]);
        assert!(matches!(
            distance_overlap(&[&a]),
            Err(RouteError::TooFewSets { .. })
        ));
    }
}
