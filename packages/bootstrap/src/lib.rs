#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Bootstrap resampling primitives shared by the HMI and segment engines.
//!
//! Iterations run on the rayon pool. Each one reads an immutable snapshot of
//! its inputs, draws from its own [`random::RandomSource`] stream, and
//! returns an independent partial result; the driver concatenates them in
//! iteration order. Nothing is shared mutably while iterations run.

pub mod interval;
pub mod progress;
pub mod random;

use rand::Rng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::progress::ProgressCallback;
use crate::random::RandomSource;

/// Default number of bootstrap iterations.
pub const DEFAULT_ITERATIONS: usize = 1_000;

/// Default significance level (99% interval).
pub const DEFAULT_ALPHA: f64 = 0.01;

/// Invalid bootstrap configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BootstrapError {
    /// Zero iterations requested.
    #[error("Bootstrap needs at least one iteration")]
    NoIterations,

    /// Alpha outside the open interval (0, 1).
    #[error("Alpha must be between 0 and 1 (exclusive), got {alpha}")]
    InvalidAlpha {
        /// The rejected value.
        alpha: f64,
    },
}

/// Iteration count and significance level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapOptions {
    pub iterations: usize,
    pub alpha: f64,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl BootstrapOptions {
    /// # Errors
    ///
    /// Returns an error if there are no iterations or alpha is not strictly
    /// between 0 and 1.
    pub fn validate(&self) -> Result<(), BootstrapError> {
        if self.iterations == 0 {
            return Err(BootstrapError::NoIterations);
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(BootstrapError::InvalidAlpha { alpha: self.alpha });
        }
        Ok(())
    }
}

/// Runs `iteration` once per bootstrap iteration in parallel and returns
/// the results in iteration order.
pub fn run_iterations<T, F>(
    options: &BootstrapOptions,
    random: &dyn RandomSource,
    progress: &dyn ProgressCallback,
    iteration: F,
) -> Vec<T>
where
    T: Send,
    F: Fn(&mut StdRng) -> T + Sync,
{
    progress.set_total(options.iterations as u64);

    let results: Vec<T> = (0..options.iterations)
        .into_par_iter()
        .map(|i| {
            let mut rng = random.iteration_rng(i);
            let result = iteration(&mut rng);
            progress.inc(1);
            result
        })
        .collect();

    progress.finish(format!("{} iterations", options.iterations));
    results
}

/// Mean of `values.len()` draws with replacement from `values`.
///
/// `NaN` for an empty slice.
#[allow(clippy::cast_precision_loss)]
pub fn resample_mean<R: Rng + ?Sized>(rng: &mut R, values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    let sum: f64 = (0..n).map(|_| values[rng.random_range(0..n)]).sum();
    sum / n as f64
}

/// Draws `n` indices from `0..n` with replacement and returns how many
/// times each index was drawn.
pub fn resample_counts<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<u32> {
    let mut counts = vec![0_u32; n];
    for _ in 0..n {
        counts[rng.random_range(0..n)] += 1;
    }
    counts
}
