//! Pairing of two route sets by route identifier.

use route_equity_route_models::{RoutePolyline, RouteSet};
use serde::{Deserialize, Serialize};

/// The two algorithms' routes for one identifier.
#[derive(Debug, Clone, Copy)]
pub struct RoutePair<'a> {
    pub id: &'a str,
    pub a: &'a RoutePolyline,
    pub b: &'a RoutePolyline,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingReport {
    pub routes_a: usize,
    pub routes_b: usize,
    /// Identifiers present in both sets.
    pub shared: usize,
    /// Shared identifiers dropped because both travel times were equal.
    pub unchanged: usize,
    pub retained: usize,
}

/// Pairs routes present in both sets, in identifier order.
///
/// With `only_different`, pairs whose travel times compare equal are
/// dropped. The comparison is exact `==` on the raw `f64` values with no
/// tolerance, so `600.0` and `600.000_000_1` count as different.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn pair_routes<'a>(
    a: &'a RouteSet,
    b: &'a RouteSet,
    only_different: bool,
) -> (Vec<RoutePair<'a>>, PairingReport) {
    let mut report = PairingReport {
        routes_a: a.len(),
        routes_b: b.len(),
        ..PairingReport::default()
    };

    let pairs: Vec<RoutePair<'a>> = a
        .iter()
        .filter_map(|route_a| {
            let route_b = b.get(&route_a.id)?;
            report.shared += 1;
            if only_different && route_a.travel_time_secs == route_b.travel_time_secs {
                report.unchanged += 1;
                return None;
            }
            Some(RoutePair {
                id: &route_a.id,
                a: route_a,
                b: route_b,
            })
        })
        .collect();

    report.retained = pairs.len();
    log::info!(
        "{} x {}: {} shared routes, {} unchanged dropped, {} retained",
        a.label,
        b.label,
        report.shared,
        report.unchanged,
        report.retained
    );
    (pairs, report)
}

#[cfg(test)]
mod tests {
    use route_equity_route_models::LatLon;

    use super::*;

    fn route(id: &str, time: f64) -> RoutePolyline {
        RoutePolyline::new(id.to_string(), vec![LatLon::new(0.0, 0.0)], time)
    }

    fn sets() -> (RouteSet, RouteSet) {
        let mut a = RouteSet::new("a");
        let mut b = RouteSet::new("b");
        for (id, ta, tb) in [("1", 600.0, 600.0), ("2", 600.0, 600.000_000_1), ("3", 10.0, 20.0)] {
            a.insert(route(id, ta));
            b.insert(route(id, tb));
        }
        a.insert(route("only-a", 1.0));
        b.insert(route("only-b", 1.0));
        (a, b)
    }

    #[test]
    fn keeps_only_shared_ids() {
        let (a, b) = sets();
        let (pairs, report) = pair_routes(&a, &b, false);
        let ids: Vec<&str> = pairs.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(report.shared, 3);
        assert_eq!(report.unchanged, 0);
    }

    #[test]
    fn drops_exactly_equal_times_only() {
        let (a, b) = sets();
        let (pairs, report) = pair_routes(&a, &b, true);
        let ids: Vec<&str> = pairs.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["2", "3"]);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.retained, 2);
    }
}
