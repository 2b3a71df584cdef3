//! Tract diversity and distance-weighted household median income.

use route_equity_bootstrap::interval::PercentileInterval;
use route_equity_bootstrap::progress::ProgressCallback;
use route_equity_bootstrap::random::RandomSource;
use route_equity_bootstrap::{BootstrapError, BootstrapOptions, resample_mean, run_iterations};
use route_equity_geography::income::CensusIncomeTable;
use serde::{Deserialize, Serialize};

use crate::AttributionError;
use crate::histogram::UsageHistogram;

/// Base-2 Shannon entropy of the histogram's normalized counts.
///
/// `0` for a single tract, `log2(k)` for `k` equally used tracts, and `NaN`
/// when the histogram holds no weight.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn entropy(histogram: &UsageHistogram) -> f64 {
    let total = histogram.total();
    if total == 0 {
        return f64::NAN;
    }
    let total = total as f64;
    histogram
        .iter()
        .map(|(_, count)| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum::<f64>()
        .max(0.0)
}

/// How [`weighted_hmi`] estimates its result.
#[derive(Clone, Copy)]
pub enum HmiOptions<'a> {
    /// Plain weighted mean, no interval.
    Deterministic,
    /// Percentile bootstrap over the weighted samples.
    Bootstrap {
        options: BootstrapOptions,
        random: &'a dyn RandomSource,
        progress: &'a dyn ProgressCallback,
    },
}

/// Weighted household median income of the tracts a histogram covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HmiEstimate {
    /// Weighted mean, or the median of the bootstrap means.
    pub mean: f64,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    /// Tracts dropped because they have no income value.
    pub excluded_tracts: usize,
    /// Weight carried by the dropped tracts.
    pub excluded_weight: u64,
    /// Total weight averaged over.
    pub sample_size: u64,
}

/// Computes the weighted HMI of `histogram`.
///
/// Tracts whose income is missing are dropped (and counted) before
/// averaging. With [`HmiOptions::Bootstrap`], each iteration draws as many
/// values as the total weight, with replacement, from the multiset in which
/// every tract's income appears once per unit of weight; the estimate is
/// the median of the sorted iteration means and the bounds are the
/// `alpha / 2` and `1 - alpha / 2` entries.
///
/// # Errors
///
/// * [`AttributionError::Bootstrap`] if the bootstrap options are invalid
/// * [`AttributionError::EmptyHistogram`] if no weight remains after
///   dropping tracts without income
pub fn weighted_hmi(
    histogram: &UsageHistogram,
    income: &CensusIncomeTable,
    options: HmiOptions<'_>,
) -> Result<HmiEstimate, AttributionError> {
    if let HmiOptions::Bootstrap { options, .. } = options {
        options.validate()?;
    }

    let mut weighted = Vec::with_capacity(histogram.len());
    let mut excluded_tracts = 0;
    let mut excluded_weight = 0;
    for (tract, count) in histogram.iter() {
        if let Some(value) = income.get(tract).value() {
            weighted.push((value, count));
        } else {
            log::debug!("Removed tract {tract} with no income data ({count} samples)");
            excluded_tracts += 1;
            excluded_weight += count;
        }
    }

    let sample_size: u64 = weighted.iter().map(|(_, count)| count).sum();
    if sample_size == 0 {
        return Err(AttributionError::EmptyHistogram);
    }

    let mut estimate = HmiEstimate {
        mean: weighted_mean(&weighted, sample_size),
        lower_bound: None,
        upper_bound: None,
        excluded_tracts,
        excluded_weight,
        sample_size,
    };

    if let HmiOptions::Bootstrap {
        options,
        random,
        progress,
    } = options
    {
        #[allow(clippy::cast_possible_truncation)]
        let samples: Vec<f64> = weighted
            .iter()
            .flat_map(|&(value, count)| std::iter::repeat_n(value, count as usize))
            .collect();

        progress.set_message(format!("Resampling {sample_size} weighted HMI values"));
        let mut means = run_iterations(&options, random, progress, |rng| {
            resample_mean(rng, &samples)
        });
        means.sort_by(f64::total_cmp);

        let interval = PercentileInterval::from_sorted(&means, options.alpha)
            .ok_or(BootstrapError::NoIterations)?;
        estimate.mean = interval.median;
        estimate.lower_bound = Some(interval.lower);
        estimate.upper_bound = Some(interval.upper);
    }

    Ok(estimate)
}

#[allow(clippy::cast_precision_loss)]
fn weighted_mean(weighted: &[(f64, u64)], total: u64) -> f64 {
    weighted
        .iter()
        .map(|&(value, count)| value * count as f64)
        .sum::<f64>()
        / total as f64
}
