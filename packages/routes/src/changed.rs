//! Counts how many routes an alternative algorithm actually changed
//! relative to a baseline.

use route_equity_route_models::RouteSet;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub baseline_routes: usize,
    /// Baseline routes with a positive travel time.
    pub baseline_valid: usize,
    pub comparison_routes: usize,
    /// Comparison routes with no valid baseline counterpart.
    pub comparison_skipped: usize,
    /// Comparison routes with a valid baseline counterpart and a positive
    /// travel time.
    pub comparison_valid: usize,
    /// Valid comparison routes whose travel time differs from the baseline.
    pub changed: usize,
}

/// Compares travel times route by route. Times are compared exactly.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn count_changed_routes(baseline: &RouteSet, comparison: &RouteSet) -> ChangeSummary {
    let valid_baseline = |id: &str| {
        baseline
            .get(id)
            .map(|r| r.travel_time_secs)
            .filter(|&t| t > 0.0)
    };

    let mut summary = ChangeSummary {
        baseline_routes: baseline.len(),
        baseline_valid: baseline.iter().filter(|r| r.travel_time_secs > 0.0).count(),
        comparison_routes: comparison.len(),
        ..ChangeSummary::default()
    };

    for route in comparison.iter() {
        let Some(baseline_time) = valid_baseline(&route.id) else {
            summary.comparison_skipped += 1;
            continue;
        };
        if route.travel_time_secs > 0.0 {
            summary.comparison_valid += 1;
            if route.travel_time_secs != baseline_time {
                summary.changed += 1;
            }
        }
    }

    log::info!(
        "{} vs {}: {} of {} valid routes changed ({} skipped)",
        comparison.label,
        baseline.label,
        summary.changed,
        summary.comparison_valid,
        summary.comparison_skipped
    );
    summary
}

#[cfg(test)]
mod tests {
    use route_equity_route_models::RoutePolyline;

    use super::*;

    fn set(label: &str, routes: &[(&str, f64)]) -> RouteSet {
        let mut set = RouteSet::new(label);
        for (id, time) in routes {
            set.insert(RoutePolyline::new((*id).to_string(), Vec::new(), *time));
        }
        set
    }

    #[test]
    fn counts_changed_valid_routes() {
        let baseline = set("fast", &[("1", 100.0), ("2", 200.0), ("3", -1.0), ("4", 50.0)]);
        let comparison = set("safe", &[("1", 100.0), ("2", 250.0), ("3", 90.0), ("4", 0.0), ("5", 10.0)]);

        let summary = count_changed_routes(&baseline, &comparison);

        assert_eq!(summary.baseline_valid, 3);
        assert_eq!(summary.comparison_skipped, 2);
        assert_eq!(summary.comparison_valid, 2);
        assert_eq!(summary.changed, 1);
    }
}
