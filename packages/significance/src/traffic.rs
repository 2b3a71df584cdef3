//! Income of the tracts where one algorithm adds or removes traffic.
//!
//! Significant segments are attributed to tracts three times, weighted by
//! the absolute median, lower, and upper usage difference. The interval is
//! formed from the HMI of the bound-weighted histograms and is therefore an
//! approximation: it reflects uncertainty in segment counts, not a resample
//! of income values, and the "lower" weighting can yield the higher HMI.

use std::collections::BTreeMap;

use route_equity_attribution::AttributionError;
use route_equity_attribution::attributor::{AttributionStats, PolylineAttributor};
use route_equity_attribution::histogram::UsageHistogram;
use route_equity_attribution::hmi::{HmiOptions, weighted_hmi};
use route_equity_geography::grid::GridIndex;
use route_equity_geography::income::CensusIncomeTable;
use route_equity_route_models::Segment;
use serde::{Deserialize, Serialize};

use crate::engine::SegmentStats;

/// Weighted HMI on one side of the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficHmi {
    pub segments: usize,
    /// HMI weighted by the median difference.
    pub hmi: f64,
    /// Smaller of the two bound-weighted HMIs.
    pub lower: f64,
    /// Larger of the two bound-weighted HMIs.
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentTrafficReport {
    pub segments_processed: usize,
    /// Segments that were not significant.
    pub segments_skipped: usize,
    pub points: AttributionStats,
    /// Segments used more by the first algorithm. `None` when there are
    /// none, or none of them reach a tract with income data.
    pub more_traffic: Option<TrafficHmi>,
    /// Segments used less by the first algorithm.
    pub less_traffic: Option<TrafficHmi>,
}

#[derive(Default)]
struct Side {
    segments: usize,
    median: UsageHistogram,
    lower: UsageHistogram,
    upper: UsageHistogram,
}

impl Side {
    fn add(
        &mut self,
        attributor: &PolylineAttributor<'_>,
        segment: &Segment,
        stats: &SegmentStats,
    ) -> AttributionStats {
        self.segments += 1;
        let vertices = [segment.from, segment.to];
        attributor.attribute(&vertices, stats.lower_bound.unsigned_abs(), &mut self.lower);
        attributor.attribute(&vertices, stats.upper_bound.unsigned_abs(), &mut self.upper);
        attributor.attribute(&vertices, stats.median.unsigned_abs(), &mut self.median)
    }

    fn summarize(&self, income: &CensusIncomeTable, label: &str) -> Option<TrafficHmi> {
        if self.segments == 0 {
            return None;
        }
        let hmi = |histogram: &UsageHistogram| -> Option<f64> {
            match weighted_hmi(histogram, income, HmiOptions::Deterministic) {
                Ok(estimate) => Some(estimate.mean),
                Err(AttributionError::EmptyHistogram) => None,
                Err(e) => {
                    log::error!("{label}: {e}");
                    None
                }
            }
        };

        let (Some(median), Some(lower), Some(upper)) =
            (hmi(&self.median), hmi(&self.lower), hmi(&self.upper))
        else {
            log::warn!("{label}: no segment reaches a tract with income data");
            return None;
        };

        Some(TrafficHmi {
            segments: self.segments,
            hmi: median,
            lower: lower.min(upper),
            upper: lower.max(upper),
        })
    }
}

/// Summarizes the income of tracts crossed by significant segments, split
/// by the sign of their median difference.
#[must_use]
pub fn segment_traffic_report(
    segments: &BTreeMap<Segment, SegmentStats>,
    grid: &GridIndex,
    income: &CensusIncomeTable,
) -> SegmentTrafficReport {
    let attributor = PolylineAttributor::new(grid);
    let mut more = Side::default();
    let mut less = Side::default();
    let mut points = AttributionStats::default();
    let mut segments_processed = 0;
    let mut segments_skipped = 0;

    for (segment, stats) in segments {
        if !stats.significant {
            segments_skipped += 1;
            continue;
        }
        segments_processed += 1;
        if stats.median > 0 {
            points += more.add(&attributor, segment, stats);
        } else if stats.median < 0 {
            points += less.add(&attributor, segment, stats);
        }
    }

    log::info!(
        "{segments_processed} significant segments ({} more traffic, {} less traffic), {segments_skipped} skipped",
        more.segments,
        less.segments
    );

    SegmentTrafficReport {
        segments_processed,
        segments_skipped,
        points,
        more_traffic: more.summarize(income, "More traffic"),
        less_traffic: less.summarize(income, "Less traffic"),
    }
}
