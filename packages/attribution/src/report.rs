//! Per-algorithm summary of the tracts a route set passes through.

use route_equity_geography::grid::GridIndex;
use route_equity_geography::income::CensusIncomeTable;
use route_equity_route_models::{RoutePolyline, RouteSet};
use serde::{Deserialize, Serialize};

use crate::AttributionError;
use crate::attributor::{AttributionStats, PolylineAttributor};
use crate::histogram::UsageHistogram;
use crate::hmi::{HmiEstimate, HmiOptions, entropy, weighted_hmi};

/// Tract entropy and weighted HMI of one route set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSetReport {
    pub label: String,
    pub routes_processed: usize,
    /// Routes left out because they match the baseline.
    pub routes_skipped: usize,
    pub points: AttributionStats,
    /// Distinct tracts the processed routes pass through.
    pub tracts: usize,
    /// `NaN` when no sample point hit the grid.
    pub entropy: f64,
    pub hmi: HmiEstimate,
}

/// Whether `route` takes part in a comparison against `baseline`.
///
/// A route counts when its travel time is positive and differs exactly from
/// the baseline's. Routes missing from the baseline always count.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn differs_from_baseline(route: &RoutePolyline, baseline: &RouteSet) -> bool {
    let baseline_time = baseline.get(&route.id).map_or(-1.0, |r| r.travel_time_secs);
    route.travel_time_secs > 0.0 && route.travel_time_secs != baseline_time
}

/// Attributes every route of `routes` with weight 1 and summarizes the
/// resulting histogram.
///
/// With a `baseline`, only routes that [differ from it](differs_from_baseline)
/// are attributed.
///
/// # Errors
///
/// * [`AttributionError::EmptyHistogram`] if no attributed point lands in a
///   tract with income data
/// * [`AttributionError::Bootstrap`] if the bootstrap options are invalid
pub fn route_set_report(
    routes: &RouteSet,
    baseline: Option<&RouteSet>,
    grid: &GridIndex,
    income: &CensusIncomeTable,
    options: HmiOptions<'_>,
) -> Result<RouteSetReport, AttributionError> {
    let attributor = PolylineAttributor::new(grid);
    let mut histogram = UsageHistogram::new();
    let mut points = AttributionStats::default();
    let mut routes_processed = 0;
    let mut routes_skipped = 0;

    for route in routes.iter() {
        if baseline.is_some_and(|baseline| !differs_from_baseline(route, baseline)) {
            routes_skipped += 1;
            continue;
        }
        routes_processed += 1;
        points += attributor.attribute(&route.vertices, 1, &mut histogram);
    }

    log::info!(
        "{}: {routes_processed} routes processed, {routes_skipped} skipped, {} of {} points outside the grid",
        routes.label,
        points.points_missed,
        points.points_sampled
    );

    let entropy = entropy(&histogram);
    let hmi = weighted_hmi(&histogram, income, options)?;

    Ok(RouteSetReport {
        label: routes.label.clone(),
        routes_processed,
        routes_skipped,
        points,
        tracts: histogram.len(),
        entropy,
        hmi,
    })
}

#[cfg(test)]
mod tests {
    use route_equity_geography_models::{GridCell, Hmi, TractIndex};
    use route_equity_route_models::LatLon;

    use super::*;

    fn grid() -> GridIndex {
        GridIndex::from_cells([
            (GridCell::new(0, 0), TractIndex(0)),
            (GridCell::new(0, 1), TractIndex(1)),
            (GridCell::new(0, 2), TractIndex(2)),
        ])
    }

    fn income() -> CensusIncomeTable {
        CensusIncomeTable::from_values(vec![
            Hmi::Reported(10.0),
            Hmi::Reported(30.0),
            Hmi::Missing,
        ])
    }

    fn set(label: &str, routes: &[(&str, f64, &[(f64, f64)])]) -> RouteSet {
        routes
            .iter()
            .map(|(id, time, points)| {
                let vertices = points.iter().map(|&(lat, lon)| LatLon::new(lat, lon)).collect();
                RoutePolyline::new((*id).to_string(), vertices, *time)
            })
            .fold(RouteSet::new(label), |mut set, route| {
                set.insert(route);
                set
            })
    }

    #[test]
    fn attributes_all_routes_without_baseline() {
        let routes = set(
            "fast",
            &[
                ("1", 60.0, &[(0.0, 0.0), (0.0, 0.001)]),
                ("2", 60.0, &[(0.0, 0.002), (5.0, 5.0)]),
            ],
        );

        let report =
            route_set_report(&routes, None, &grid(), &income(), HmiOptions::Deterministic)
                .unwrap();

        assert_eq!(report.routes_processed, 2);
        assert_eq!(report.points.points_sampled, 4);
        assert_eq!(report.points.points_missed, 1);
        assert_eq!(report.tracts, 3);
        assert!((report.entropy - 3_f64.log2()).abs() < 1e-12);
        assert!((report.hmi.mean - 20.0).abs() < 1e-12);
        assert_eq!(report.hmi.excluded_tracts, 1);
    }

    #[test]
    fn skips_routes_matching_the_baseline() {
        let baseline = set("fast", &[("1", 60.0, &[]), ("2", 60.0, &[])]);
        let routes = set(
            "safe",
            &[
                ("1", 60.0, &[(0.0, 0.0)]),
                ("2", 75.0, &[(0.0, 0.001)]),
                ("3", 90.0, &[(0.0, 0.001)]),
                ("4", -1.0, &[(0.0, 0.0)]),
            ],
        );

        let report = route_set_report(
            &routes,
            Some(&baseline),
            &grid(),
            &income(),
            HmiOptions::Deterministic,
        )
        .unwrap();

        assert_eq!(report.routes_processed, 2);
        assert_eq!(report.routes_skipped, 2);
        assert!((report.hmi.mean - 30.0).abs() < 1e-12);
    }

    #[test]
    fn no_usable_income_is_an_error() {
        let routes = set("fast", &[("1", 60.0, &[(0.0, 0.002)])]);
        let result =
            route_set_report(&routes, None, &grid(), &income(), HmiOptions::Deterministic);
        assert!(matches!(result, Err(AttributionError::EmptyHistogram)));
    }
}
