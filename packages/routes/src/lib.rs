#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Route set loading and comparison utilities.
//!
//! Routing CSVs are produced by external route fetchers. Loading is
//! best-effort: malformed rows are skipped and counted, never fatal. The
//! remaining modules compare two or more loaded route sets by identifier.

pub mod changed;
pub mod load;
pub mod overlap;
pub mod shared;

use thiserror::Error;

/// Errors that can occur while loading or comparing route sets.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Reading the input failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the CSV header.
    #[error("Missing column '{column}'")]
    MissingColumn {
        /// Name of the column that was expected.
        column: String,
    },

    /// A polyline field could not be parsed.
    #[error("Invalid polyline: {message}")]
    InvalidPolyline {
        /// Description of what went wrong.
        message: String,
    },

    /// A comparison needs more route sets than were given.
    #[error("Need at least {required} route sets, got {found}")]
    TooFewSets {
        /// Minimum number of sets.
        required: usize,
        /// Number of sets provided.
        found: usize,
    },
}
