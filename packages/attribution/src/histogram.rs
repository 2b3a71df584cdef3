//! Weighted tract usage counts.

use std::collections::BTreeMap;

use route_equity_geography_models::TractIndex;
use serde::{Deserialize, Serialize};

/// Accumulated sample weight per census tract.
///
/// Tracts that were never hit read as zero and are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageHistogram {
    counts: BTreeMap<TractIndex, u64>,
}

impl UsageHistogram {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `weight` to `tract`. A zero weight leaves the histogram as is.
    pub fn add(&mut self, tract: TractIndex, weight: u64) {
        if weight > 0 {
            *self.counts.entry(tract).or_default() += weight;
        }
    }

    #[must_use]
    pub fn get(&self, tract: TractIndex) -> u64 {
        self.counts.get(&tract).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of tracts with a non-zero count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Tracts and their counts in tract order.
    pub fn iter(&self) -> impl Iterator<Item = (TractIndex, u64)> + '_ {
        self.counts.iter().map(|(tract, count)| (*tract, *count))
    }
}

impl FromIterator<(TractIndex, u64)> for UsageHistogram {
    fn from_iter<I: IntoIterator<Item = (TractIndex, u64)>>(iter: I) -> Self {
        let mut histogram = Self::new();
        for (tract, weight) in iter {
            histogram.add(tract, weight);
        }
        histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_tracts_read_as_zero() {
        let mut histogram = UsageHistogram::new();
        histogram.add(TractIndex(3), 2);
        histogram.add(TractIndex(3), 5);
        histogram.add(TractIndex(4), 0);

        assert_eq!(histogram.get(TractIndex(3)), 7);
        assert_eq!(histogram.get(TractIndex(4)), 0);
        assert_eq!(histogram.len(), 1);
        assert_eq!(histogram.total(), 7);
    }

    #[test]
    fn collects_repeated_tracts() {
        let histogram: UsageHistogram =
            [(TractIndex(0), 1), (TractIndex(1), 2), (TractIndex(0), 3)]
                .into_iter()
                .collect();
        assert_eq!(histogram.get(TractIndex(0)), 4);
        assert_eq!(histogram.total(), 6);
        assert_eq!(histogram.iter().count(), 2);
    }
}
