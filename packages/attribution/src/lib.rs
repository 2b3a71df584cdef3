#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Attributes route geometry to census tracts and summarizes the result.
//!
//! A [`attributor::PolylineAttributor`] walks a polyline, resolves sample
//! points through the region's grid index, and accumulates weighted counts
//! in a [`histogram::UsageHistogram`]. The histogram then yields a tract
//! diversity score ([`hmi::entropy`]) and a distance-weighted household
//! median income ([`hmi::weighted_hmi`]), optionally with a bootstrap
//! confidence interval.

pub mod attributor;
pub mod histogram;
pub mod hmi;
pub mod report;

use route_equity_bootstrap::BootstrapError;
use thiserror::Error;

/// Errors that can occur while summarizing attributed routes.
#[derive(Debug, Error)]
pub enum AttributionError {
    /// Nothing remained to average once tracts without income were dropped.
    #[error("No tracts with income data remain in the histogram")]
    EmptyHistogram,

    /// Bootstrap options were rejected.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
}
