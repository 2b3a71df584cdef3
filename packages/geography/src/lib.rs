#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grid and census lookups for a single geographic region.
//!
//! [`grid::GridIndex`] resolves discretized coordinates to census tracts and
//! [`income::CensusIncomeTable`] attaches household median income to each
//! tract, imputing gaps from intersecting neighbors. Both are built once per
//! region and stay immutable for the duration of an analysis run.

pub mod grid;
pub mod income;
pub mod normalize;

use thiserror::Error;

/// Errors that can occur while loading or building geography artifacts.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Reading or writing a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Tract boundaries could not be loaded.
    #[error("Spatial error: {0}")]
    Spatial(#[from] route_equity_spatial::SpatialError),

    /// A required column is absent from a CSV header.
    #[error("Missing column '{column}'")]
    MissingColumn {
        /// Name of the column that was expected.
        column: String,
    },

    /// A CSV header did not match the expected layout.
    #[error("Unexpected header: expected {expected}, found {found}")]
    UnexpectedHeader {
        /// The expected header, comma separated.
        expected: String,
        /// The header that was found, comma separated.
        found: String,
    },
}
