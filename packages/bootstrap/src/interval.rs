//! Percentile intervals over a sorted bootstrap distribution.

use serde::{Deserialize, Serialize};

/// Index of quantile `q` in a sorted sample of length `len`:
/// `floor(len * q)`, clamped to the last element.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn percentile_index(len: usize, q: f64) -> usize {
    let index = ((len as f64) * q).floor().max(0.0) as usize;
    index.min(len.saturating_sub(1))
}

/// `alpha / 2`, median, and `1 - alpha / 2` entries of a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileInterval<T> {
    pub lower: T,
    pub median: T,
    pub upper: T,
}

impl<T: Copy> PercentileInterval<T> {
    /// Reads the interval from an already sorted slice. `None` when empty.
    #[must_use]
    pub fn from_sorted(sorted: &[T], alpha: f64) -> Option<Self> {
        if sorted.is_empty() {
            return None;
        }
        let at = |q: f64| sorted[percentile_index(sorted.len(), q)];
        Some(Self {
            lower: at(alpha / 2.0),
            median: at(0.5),
            upper: at(1.0 - alpha / 2.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_99_percent_interval_of_1000() {
        assert_eq!(percentile_index(1_000, 0.005), 5);
        assert_eq!(percentile_index(1_000, 0.5), 500);
        assert_eq!(percentile_index(1_000, 0.995), 995);
    }

    #[test]
    fn clamps_to_last_element() {
        assert_eq!(percentile_index(10, 1.0), 9);
        assert_eq!(percentile_index(1, 0.995), 0);
    }

    #[test]
    fn reads_interval_from_sorted_values() {
        let values: Vec<i64> = (0..1_000).collect();
        let interval = PercentileInterval::from_sorted(&values, 0.01).unwrap();
        assert_eq!(
            interval,
            PercentileInterval {
                lower: 5,
                median: 500,
                upper: 995
            }
        );
    }

    #[test]
    fn empty_distribution_has_no_interval() {
        assert!(PercentileInterval::<f64>::from_sorted(&[], 0.01).is_none());
    }
}
