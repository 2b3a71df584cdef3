#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Finds road segments whose usage differs significantly between two
//! routing algorithms.
//!
//! The [`engine::SegmentDifferenceEngine`] pairs the routes both algorithms
//! produced for the same trip, resamples those pairs with replacement, and
//! classifies every directed segment by the percentile interval of its net
//! usage difference. Results can be written to and read back from a
//! `GeoJSON` feature collection ([`geojson_io`]) and summarized by the
//! income of the tracts gaining or losing traffic ([`traffic`]).

pub mod engine;
pub mod geojson_io;
pub mod traffic;

use route_equity_bootstrap::BootstrapError;
use strum_macros::Display;
use thiserror::Error;

/// Phases of a segment difference run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineStage {
    Loading,
    Filtering,
    SegmentEnumeration,
    Resampling,
    SignificanceClassification,
    Output,
}

/// Errors that can occur while computing or exchanging segment differences.
#[derive(Debug, Error)]
pub enum SignificanceError {
    /// No route identifier survived pairing and filtering.
    #[error("No routes are shared by both sets after filtering")]
    NoEligibleRoutes,

    /// Bootstrap options were rejected.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    /// Reading or writing a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input was not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The input parsed but was not a `FeatureCollection`.
    #[error("Expected a FeatureCollection of segments")]
    NotFeatureCollection,

    /// A feature could not be read as a segment with statistics.
    #[error("Invalid segment feature {index}: {message}")]
    InvalidFeature {
        /// Position of the feature in the collection.
        index: usize,
        /// What was wrong with it.
        message: String,
    },
}
