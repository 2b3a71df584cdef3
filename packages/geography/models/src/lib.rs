#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grid cell, census tract, and household median income types.
//!
//! Coordinates are discretized into fixed-precision grid cells, and grid
//! cells resolve to census tracts. Every precomputed grid/tract artifact is
//! tied to [`GRID_PRECISION`]; changing it invalidates all of them.

use serde::{Deserialize, Serialize};

/// Number of decimal digits kept when discretizing a coordinate.
pub const GRID_PRECISION: u32 = 3;

/// Multiplier applied to a coordinate before rounding (`10^GRID_PRECISION`).
pub const GRID_SCALE: f64 = 1_000.0;

/// Converts a latitude or longitude into its integer grid coordinate.
///
/// `35.2358 -> 35236`, `-74.5233 -> -74523`. Exact halves round to the
/// nearest even integer so that artifacts produced by other tools agree.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn grid_coord(value: f64) -> i32 {
    (value * GRID_SCALE).round_ties_even() as i32
}

/// Converts an integer grid coordinate back to the coordinate of the
/// cell's lower edge.
#[must_use]
pub fn cell_edge(coord: i32) -> f64 {
    f64::from(coord) / GRID_SCALE
}

/// A discretized coordinate cell (~111 m in the latitude direction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridCell {
    /// Scaled latitude.
    pub row: i32,
    /// Scaled longitude.
    pub col: i32,
}

impl GridCell {
    /// Creates a cell from already scaled row/column values.
    #[must_use]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Discretizes a `(lat, lon)` coordinate.
    #[must_use]
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self {
            row: grid_coord(lat),
            col: grid_coord(lon),
        }
    }
}

/// Position of a census tract in the ordered tract boundary collection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TractIndex(pub usize);

impl std::fmt::Display for TractIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Household median income of a census tract.
///
/// Non-numeric and non-positive source values are both treated as
/// missing. A missing tract must be imputed or excluded; it never
/// contributes a placeholder value to an average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Hmi {
    /// Valid value taken from the income records.
    Reported(f64),
    /// Mean of the reported values of intersecting neighbor tracts.
    Imputed(f64),
    /// No usable value.
    Missing,
}

impl Hmi {
    /// Validates a raw income field.
    ///
    /// Returns [`Hmi::Missing`] for anything that is not a finite number
    /// greater than zero.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 => Self::Reported(value),
            _ => Self::Missing,
        }
    }

    /// The usable income value, if any.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Reported(v) | Self::Imputed(v) => Some(v),
            Self::Missing => None,
        }
    }

    /// Only values that came straight from the income records.
    #[must_use]
    pub const fn reported(self) -> Option<f64> {
        match self {
            Self::Reported(v) => Some(v),
            Self::Imputed(_) | Self::Missing => None,
        }
    }

    #[must_use]
    pub const fn is_missing(self) -> bool {
        matches!(self, Self::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discretizes_coordinates() {
        assert_eq!(grid_coord(35.2358), 35_236);
        assert_eq!(grid_coord(-74.5233), -74_523);
        assert_eq!(grid_coord(40.523), 40_523);
    }

    #[test]
    fn exact_halves_round_to_even() {
        assert_eq!(grid_coord(0.0005), 0);
        assert_eq!(grid_coord(0.0015), 2);
        assert_eq!(grid_coord(0.0025), 2);
        assert_eq!(grid_coord(0.0035), 4);
        assert_eq!(grid_coord(-0.0025), -2);
        assert_eq!(grid_coord(0.0125), 12);
    }

    #[test]
    fn cell_from_lat_lon_uses_lat_as_row() {
        let cell = GridCell::from_lat_lon(37.7749, -122.4194);
        assert_eq!(cell, GridCell::new(37_775, -122_419));
    }

    #[test]
    fn parses_valid_income() {
        assert_eq!(Hmi::parse("52000"), Hmi::Reported(52_000.0));
        assert_eq!(Hmi::parse(" 61250.5 "), Hmi::Reported(61_250.5));
    }

    #[test]
    fn non_numeric_and_non_positive_income_is_missing() {
        assert_eq!(Hmi::parse("-"), Hmi::Missing);
        assert_eq!(Hmi::parse(""), Hmi::Missing);
        assert_eq!(Hmi::parse("0"), Hmi::Missing);
        assert_eq!(Hmi::parse("-666666666"), Hmi::Missing);
        assert_eq!(Hmi::parse("NaN"), Hmi::Missing);
    }

    #[test]
    fn imputed_values_are_usable_but_not_reported() {
        let hmi = Hmi::Imputed(15.0);
        assert_eq!(hmi.value(), Some(15.0));
        assert_eq!(hmi.reported(), None);
        assert!(Hmi::Missing.value().is_none());
    }
}
