//! Bootstrap classification of per-segment usage differences.
//!
//! Each retained route identifier contributes, for every directed segment,
//! its usage in set A minus its usage in set B. An iteration draws the
//! retained identifiers with replacement, so a segment's statistic for that
//! iteration is the sum of each identifier's contribution times the number
//! of times it was drawn. Iterations only store those draw counts; the
//! per-segment distributions are assembled afterwards, one segment at a
//! time, from an index of the identifiers that touch each segment.

use std::collections::BTreeMap;

use rayon::prelude::*;
use route_equity_bootstrap::interval::PercentileInterval;
use route_equity_bootstrap::progress::ProgressCallback;
use route_equity_bootstrap::random::RandomSource;
use route_equity_bootstrap::{BootstrapError, BootstrapOptions, resample_counts, run_iterations};
use route_equity_route_models::{RouteSet, Segment};
use route_equity_routes::shared::{PairingReport, RoutePair, pair_routes};
use serde::{Deserialize, Serialize};

use crate::{EngineStage, SignificanceError};

/// Bootstrap settings plus the route filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOptions {
    pub bootstrap: BootstrapOptions,
    /// Drop identifiers whose two travel times are exactly equal.
    pub only_different: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            bootstrap: BootstrapOptions::default(),
            only_different: true,
        }
    }
}

/// Percentile interval of a segment's net usage difference (A minus B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentStats {
    pub median: i64,
    pub lower_bound: i64,
    pub upper_bound: i64,
    /// Both bounds are strictly positive or both strictly negative.
    pub significant: bool,
}

impl SegmentStats {
    #[must_use]
    pub const fn from_interval(interval: PercentileInterval<i64>) -> Self {
        let (lower, upper) = (interval.lower, interval.upper);
        Self {
            median: interval.median,
            lower_bound: lower,
            upper_bound: upper,
            significant: (lower > 0 && upper > 0) || (lower < 0 && upper < 0),
        }
    }
}

/// Classified segments of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDifferenceReport {
    pub label_a: String,
    pub label_b: String,
    pub options: EngineOptions,
    pub pairing: PairingReport,
    /// Every segment of a retained route, in either set.
    pub segments: BTreeMap<Segment, SegmentStats>,
}

/// Serializable counts describing a [`SegmentDifferenceReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSummary {
    pub label_a: String,
    pub label_b: String,
    pub iterations: usize,
    pub alpha: f64,
    pub pairing: PairingReport,
    pub segments: usize,
    pub significant: usize,
    /// Significant segments used more by set A.
    pub more_in_a: usize,
    /// Significant segments used more by set B.
    pub more_in_b: usize,
}

impl SegmentDifferenceReport {
    /// Significant segments in segment order.
    pub fn significant(&self) -> impl Iterator<Item = (&Segment, &SegmentStats)> {
        self.segments.iter().filter(|(_, stats)| stats.significant)
    }

    #[must_use]
    pub fn summary(&self) -> SegmentSummary {
        let (mut significant, mut more_in_a, mut more_in_b) = (0, 0, 0);
        for (_, stats) in self.significant() {
            significant += 1;
            if stats.median > 0 {
                more_in_a += 1;
            } else if stats.median < 0 {
                more_in_b += 1;
            }
        }
        SegmentSummary {
            label_a: self.label_a.clone(),
            label_b: self.label_b.clone(),
            iterations: self.options.bootstrap.iterations,
            alpha: self.options.bootstrap.alpha,
            pairing: self.pairing,
            segments: self.segments.len(),
            significant,
            more_in_a,
            more_in_b,
        }
    }
}

/// Compares the segment usage of two route sets.
pub struct SegmentDifferenceEngine<'a> {
    options: EngineOptions,
    random: &'a dyn RandomSource,
    progress: &'a dyn ProgressCallback,
}

impl<'a> SegmentDifferenceEngine<'a> {
    #[must_use]
    pub const fn new(
        options: EngineOptions,
        random: &'a dyn RandomSource,
        progress: &'a dyn ProgressCallback,
    ) -> Self {
        Self {
            options,
            random,
            progress,
        }
    }

    /// Runs filtering, enumeration, resampling, and classification.
    ///
    /// # Errors
    ///
    /// * [`SignificanceError::Bootstrap`] if the bootstrap options are
    ///   invalid
    /// * [`SignificanceError::NoEligibleRoutes`] if no identifier is shared
    ///   by both sets after filtering
    pub fn run(
        &self,
        a: &RouteSet,
        b: &RouteSet,
    ) -> Result<SegmentDifferenceReport, SignificanceError> {
        let bootstrap = self.options.bootstrap;
        bootstrap.validate()?;

        log::info!("{}: {} vs {}", EngineStage::Filtering, a.label, b.label);
        let (pairs, pairing) = pair_routes(a, b, self.options.only_different);
        if pairs.is_empty() {
            return Err(SignificanceError::NoEligibleRoutes);
        }

        let usage = usage_index(&pairs);
        log::info!(
            "{}: {} segments across {} routes",
            EngineStage::SegmentEnumeration,
            usage.len(),
            pairs.len()
        );

        log::info!(
            "{}: {} iterations",
            EngineStage::Resampling,
            bootstrap.iterations
        );
        self.progress
            .set_message(format!("Resampling {} route pairs", pairs.len()));
        let draws = run_iterations(&bootstrap, self.random, self.progress, |rng| {
            resample_counts(rng, pairs.len())
        });

        log::info!(
            "{}: {} segments",
            EngineStage::SignificanceClassification,
            usage.len()
        );
        let classified: Option<Vec<(Segment, SegmentStats)>> = usage
            .into_par_iter()
            .map(|(segment, contributions)| {
                let mut distribution: Vec<i64> = draws
                    .iter()
                    .map(|counts| {
                        contributions
                            .iter()
                            .map(|&(route, net)| i64::from(counts[route]) * net)
                            .sum()
                    })
                    .collect();
                distribution.sort_unstable();
                PercentileInterval::from_sorted(&distribution, bootstrap.alpha)
                    .map(|interval| (segment, SegmentStats::from_interval(interval)))
            })
            .collect();
        let segments: BTreeMap<Segment, SegmentStats> = classified
            .ok_or(BootstrapError::NoIterations)?
            .into_iter()
            .collect();

        let report = SegmentDifferenceReport {
            label_a: a.label.clone(),
            label_b: b.label.clone(),
            options: self.options,
            pairing,
            segments,
        };
        let summary = report.summary();
        log::info!(
            "{}: {} of {} segments significant ({} more in {}, {} more in {})",
            EngineStage::Output,
            summary.significant,
            summary.segments,
            summary.more_in_a,
            summary.label_a,
            summary.more_in_b,
            summary.label_b
        );
        Ok(report)
    }
}

/// Segment to `(pair index, net usage)` for every pair whose two routes use
/// the segment a different number of times. Segments whose net usage is zero
/// for every pair are kept with no contributions.
fn usage_index(pairs: &[RoutePair<'_>]) -> Vec<(Segment, Vec<(usize, i64)>)> {
    let mut index: BTreeMap<Segment, Vec<(usize, i64)>> = BTreeMap::new();
    for (i, pair) in pairs.iter().enumerate() {
        let mut net: BTreeMap<Segment, i64> = BTreeMap::new();
        for segment in pair.a.segments() {
            *net.entry(segment).or_default() += 1;
        }
        for segment in pair.b.segments() {
            *net.entry(segment).or_default() -= 1;
        }
        for (segment, n) in net {
            let contributions = index.entry(segment).or_default();
            if n != 0 {
                contributions.push((i, n));
            }
        }
    }
    index.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use route_equity_bootstrap::progress::NullProgress;
    use route_equity_bootstrap::random::SeededRandom;
    use route_equity_route_models::{LatLon, RoutePolyline};

    use super::*;

    fn route(id: String, time: f64, points: &[(f64, f64)]) -> RoutePolyline {
        let vertices = points.iter().map(|&(lat, lon)| LatLon::new(lat, lon)).collect();
        RoutePolyline::new(id, vertices, time)
    }

    /// `n` routes per set; every route in a set follows the same path.
    fn uniform_set(label: &str, n: usize, time: f64, points: &[(f64, f64)]) -> RouteSet {
        (0..n)
            .map(|i| route(format!("r{i}"), time, points))
            .fold(RouteSet::new(label), |mut set, route| {
                set.insert(route);
                set
            })
    }

    fn options(iterations: usize, only_different: bool) -> EngineOptions {
        EngineOptions {
            bootstrap: BootstrapOptions {
                iterations,
                alpha: 0.01,
            },
            only_different,
        }
    }

    const WEST: &[(f64, f64)] = &[(0.0, 0.0), (0.0, -1.0), (1.0, -1.0)];
    const EAST: &[(f64, f64)] = &[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)];

    #[test]
    fn identical_sets_have_no_significant_segments() {
        let a = uniform_set("a", 10, 60.0, WEST);
        let b = uniform_set("b", 10, 60.0, WEST);
        let random = SeededRandom::new(1);

        let report = SegmentDifferenceEngine::new(options(100, false), &random, &NullProgress)
            .run(&a, &b)
            .unwrap();

        assert_eq!(report.segments.len(), 2);
        assert_eq!(report.significant().count(), 0);
        for stats in report.segments.values() {
            assert_eq!((stats.lower_bound, stats.median, stats.upper_bound), (0, 0, 0));
        }
    }

    #[test]
    fn disjoint_paths_are_significant_with_opposite_signs() {
        let a = uniform_set("a", 10, 60.0, WEST);
        let b = uniform_set("b", 10, 90.0, EAST);
        let random = SeededRandom::new(2);

        let report = SegmentDifferenceEngine::new(options(200, true), &random, &NullProgress)
            .run(&a, &b)
            .unwrap();

        assert_eq!(report.segments.len(), 4);
        assert_eq!(report.significant().count(), 4);
        let west = Segment::new(LatLon::new(0.0, 0.0), LatLon::new(0.0, -1.0));
        let east = Segment::new(LatLon::new(0.0, 0.0), LatLon::new(0.0, 1.0));
        assert_eq!(report.segments[&west].median, 10);
        assert_eq!(report.segments[&east].median, -10);

        let summary = report.summary();
        assert_eq!(summary.more_in_a, 2);
        assert_eq!(summary.more_in_b, 2);
    }

    #[test]
    fn shared_prefix_is_not_significant() {
        let a = uniform_set("a", 8, 60.0, &[(5.0, 5.0), (0.0, 0.0), (0.0, -1.0)]);
        let b = uniform_set("b", 8, 70.0, &[(5.0, 5.0), (0.0, 0.0), (0.0, 1.0)]);
        let random = SeededRandom::new(3);

        let report = SegmentDifferenceEngine::new(options(100, true), &random, &NullProgress)
            .run(&a, &b)
            .unwrap();

        let shared = Segment::new(LatLon::new(5.0, 5.0), LatLon::new(0.0, 0.0));
        assert!(!report.segments[&shared].significant);
        assert_eq!(report.significant().count(), 2);
    }

    #[test]
    fn exactly_equal_times_are_filtered() {
        let mut a = uniform_set("a", 3, 60.0, WEST);
        let mut b = uniform_set("b", 3, 60.0, EAST);
        a.insert(route("near".to_string(), 600.0, WEST));
        b.insert(route("near".to_string(), 600.000_000_1, EAST));
        let random = SeededRandom::new(4);

        let report = SegmentDifferenceEngine::new(options(50, true), &random, &NullProgress)
            .run(&a, &b)
            .unwrap();

        assert_eq!(report.pairing.shared, 4);
        assert_eq!(report.pairing.unchanged, 3);
        assert_eq!(report.pairing.retained, 1);
    }

    #[test]
    fn nothing_left_after_filtering_is_an_error() {
        let a = uniform_set("a", 5, 60.0, WEST);
        let b = uniform_set("b", 5, 60.0, EAST);
        let random = SeededRandom::new(5);

        let result =
            SegmentDifferenceEngine::new(options(50, true), &random, &NullProgress).run(&a, &b);
        assert!(matches!(result, Err(SignificanceError::NoEligibleRoutes)));
    }

    #[test]
    fn invalid_options_fail_before_pairing() {
        let a = uniform_set("a", 5, 60.0, WEST);
        let random = SeededRandom::new(6);

        let result =
            SegmentDifferenceEngine::new(options(0, false), &random, &NullProgress).run(&a, &a);
        assert!(matches!(
            result,
            Err(SignificanceError::Bootstrap(BootstrapError::NoIterations))
        ));
    }

    #[test]
    fn same_seed_gives_same_report() {
        // Half of the routes differ, so the distributions actually vary.
        let mut a = uniform_set("a", 12, 60.0, WEST);
        let b = uniform_set("b", 12, 80.0, WEST);
        for i in 0..6 {
            a.insert(route(format!("r{i}"), 60.0, EAST));
        }
        let random = SeededRandom::new(77);
        let engine = SegmentDifferenceEngine::new(options(300, true), &random, &NullProgress);

        let first = engine.run(&a, &b).unwrap();
        let second = engine.run(&a, &b).unwrap();
        assert_eq!(first, second);

        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| engine.run(&a, &b).unwrap());
        assert_eq!(first, single);
    }
}
