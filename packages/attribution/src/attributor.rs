//! Maps route polylines onto census tracts.
//!
//! Multi-vertex polylines are sampled at a fixed planar step so that a tract
//! receives weight in proportion to the distance the route travels through
//! it, not the number of vertices the router happened to emit there.

use std::ops::AddAssign;

use route_equity_geography::grid::GridIndex;
use route_equity_route_models::LatLon;
use serde::{Deserialize, Serialize};

use crate::histogram::UsageHistogram;

/// Sampling step along a polyline, in decimal degrees (roughly 250 m).
pub const SAMPLE_STEP: f64 = 0.0025;

/// Counts of points looked up while attributing one or more polylines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionStats {
    pub points_sampled: u64,
    /// Sampled points that fell outside every grid cell.
    pub points_missed: u64,
}

impl AddAssign for AttributionStats {
    fn add_assign(&mut self, rhs: Self) {
        self.points_sampled += rhs.points_sampled;
        self.points_missed += rhs.points_missed;
    }
}

/// Resolves polyline sample points through a [`GridIndex`].
#[derive(Debug, Clone, Copy)]
pub struct PolylineAttributor<'a> {
    grid: &'a GridIndex,
    step: f64,
}

impl<'a> PolylineAttributor<'a> {
    #[must_use]
    pub const fn new(grid: &'a GridIndex) -> Self {
        Self {
            grid,
            step: SAMPLE_STEP,
        }
    }

    /// Adds `weight` to the tract of every sample point on `vertices`.
    ///
    /// Polylines with at most two vertices, or shorter than one sampling
    /// step, are attributed vertex by vertex. Longer ones are sampled from
    /// distance 0, adding one step per sample while the running distance is
    /// below their planar length, interpolating linearly in `(lon, lat)` space. Misses are
    /// counted and otherwise ignored.
    pub fn attribute(
        &self,
        vertices: &[LatLon],
        weight: u64,
        histogram: &mut UsageHistogram,
    ) -> AttributionStats {
        let mut stats = AttributionStats::default();
        let mut visit = |point: LatLon| {
            stats.points_sampled += 1;
            match self.grid.lookup(point.lat, point.lon) {
                Some(tract) => histogram.add(tract, weight),
                None => stats.points_missed += 1,
            }
        };

        let cumulative = cumulative_lengths(vertices);
        let length = cumulative.last().copied().unwrap_or(0.0);

        if vertices.len() <= 2 || length < self.step {
            vertices.iter().copied().for_each(&mut visit);
        } else {
            // Distances accumulate one step at a time; near exact multiples of
            // the step this decides whether the final sample is taken.
            let mut segment = 0;
            let mut distance = 0.0;
            while distance < length {
                while cumulative[segment + 1] <= distance {
                    segment += 1;
                }
                visit(interpolate(
                    vertices[segment],
                    vertices[segment + 1],
                    cumulative[segment],
                    cumulative[segment + 1],
                    distance,
                ));
                distance += self.step;
            }
        }

        if stats.points_missed > 0 {
            log::trace!(
                "{} of {} sample points fell outside the grid",
                stats.points_missed,
                stats.points_sampled
            );
        }
        stats
    }
}

/// Running planar length at each vertex, starting at 0.
fn cumulative_lengths(vertices: &[LatLon]) -> Vec<f64> {
    let mut total = 0.0;
    let mut lengths = Vec::with_capacity(vertices.len());
    if !vertices.is_empty() {
        lengths.push(0.0);
    }
    for pair in vertices.windows(2) {
        total += pair[0].planar_distance(&pair[1]);
        lengths.push(total);
    }
    lengths
}

fn interpolate(from: LatLon, to: LatLon, start: f64, end: f64, distance: f64) -> LatLon {
    let span = end - start;
    if span <= 0.0 {
        return from;
    }
    let t = (distance - start) / span;
    LatLon::new(
        (to.lat - from.lat).mul_add(t, from.lat),
        (to.lon - from.lon).mul_add(t, from.lon),
    )
}

#[cfg(test)]
mod tests {
    use route_equity_geography_models::{GridCell, TractIndex};

    use super::*;

    /// Tract 0 covers longitude 0 for latitudes 0.000..=0.020; tract 1
    /// covers latitude 0 for longitudes 0.001..=0.020.
    fn grid() -> GridIndex {
        let mut cells = Vec::new();
        for i in 0..=20 {
            cells.push((GridCell::new(i, 0), TractIndex(0)));
        }
        for i in 1..=20 {
            cells.push((GridCell::new(0, i), TractIndex(1)));
        }
        GridIndex::from_cells(cells)
    }

    #[test]
    fn two_vertex_polyline_counts_each_vertex() {
        let grid = grid();
        let mut histogram = UsageHistogram::new();
        let stats = PolylineAttributor::new(&grid).attribute(
            &[LatLon::new(0.0, 0.0), LatLon::new(0.02, 0.0)],
            1,
            &mut histogram,
        );

        assert_eq!(stats.points_sampled, 2);
        assert_eq!(stats.points_missed, 0);
        assert_eq!(histogram.get(TractIndex(0)), 2);
    }

    #[test]
    fn long_polyline_is_sampled_by_distance() {
        let grid = grid();
        let mut histogram = UsageHistogram::new();
        // Straight north for 0.02 degrees: samples at 0, 0.0025, ..., 0.0175.
        let stats = PolylineAttributor::new(&grid).attribute(
            &[
                LatLon::new(0.0, 0.0),
                LatLon::new(0.01, 0.0),
                LatLon::new(0.02, 0.0),
            ],
            3,
            &mut histogram,
        );

        assert_eq!(stats.points_sampled, 8);
        assert_eq!(stats.points_missed, 0);
        assert_eq!(histogram.get(TractIndex(0)), 24);
    }

    #[test]
    fn sampling_follows_direction_changes() {
        let grid = grid();
        let mut histogram = UsageHistogram::new();
        // East along lat 0, then north along lon 0.01 where no cells exist.
        let stats = PolylineAttributor::new(&grid).attribute(
            &[
                LatLon::new(0.0, 0.0),
                LatLon::new(0.0, 0.01),
                LatLon::new(0.01, 0.01),
            ],
            1,
            &mut histogram,
        );

        // Samples at 0, 0.0025, ..., 0.0175: five up to the corner, three
        // on the northern leg.
        assert_eq!(stats.points_sampled, 8);
        assert_eq!(histogram.get(TractIndex(0)), 1);
        assert_eq!(histogram.get(TractIndex(1)), 4);
        assert_eq!(stats.points_missed, 3);
    }

    #[test]
    fn sample_count_follows_accumulated_distance() {
        let grid = grid();
        let mut histogram = UsageHistogram::new();
        // Ten additions of the step fall just short of 0.025, so an eleventh
        // sample is taken.
        let stats = PolylineAttributor::new(&grid).attribute(
            &[
                LatLon::new(0.0, 0.0),
                LatLon::new(0.0, 0.0),
                LatLon::new(0.025, 0.0),
            ],
            1,
            &mut histogram,
        );

        assert_eq!(stats.points_sampled, 11);
    }

    #[test]
    fn short_polyline_falls_back_to_vertices() {
        let grid = grid();
        let mut histogram = UsageHistogram::new();
        let stats = PolylineAttributor::new(&grid).attribute(
            &[
                LatLon::new(0.0, 0.0),
                LatLon::new(0.001, 0.0),
                LatLon::new(0.001, 0.001),
            ],
            1,
            &mut histogram,
        );

        assert_eq!(stats.points_sampled, 3);
        assert_eq!(stats.points_missed, 1);
        assert_eq!(histogram.get(TractIndex(0)), 2);
    }

    #[test]
    fn misses_are_counted_not_fatal() {
        let grid = grid();
        let mut histogram = UsageHistogram::new();
        let stats = PolylineAttributor::new(&grid).attribute(
            &[LatLon::new(45.0, 45.0)],
            1,
            &mut histogram,
        );

        assert_eq!(stats.points_sampled, 1);
        assert_eq!(stats.points_missed, 1);
        assert!(histogram.is_empty());
    }

    #[test]
    fn empty_polyline_samples_nothing() {
        let grid = grid();
        let mut histogram = UsageHistogram::new();
        let stats = PolylineAttributor::new(&grid).attribute(&[], 1, &mut histogram);
        assert_eq!(stats, AttributionStats::default());
    }
}
