//! Grid cell to census tract lookup.
//!
//! The mapping is a fixed table keyed by [`GridCell`]. Lookups are exact
//! matches on the discretized coordinate with no nearest-cell fallback;
//! callers count and handle misses.
//!
//! The on-disk form is a CSV with an `x,y,ctidx` header where `x` is the
//! scaled longitude and `y` the scaled latitude.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use route_equity_geography_models::{GRID_SCALE, GridCell, TractIndex, cell_edge};
use route_equity_spatial::{Bounds, TractBoundaries, TractGeometry};
use serde::{Deserialize, Serialize};

use crate::GeoError;

const HEADER: [&str; 3] = ["x", "y", "ctidx"];

/// Fraction of a cell that a tract must cover to claim it.
const MIN_CELL_OVERLAP: f64 = 0.5;

#[derive(Debug, Serialize, Deserialize)]
struct GridRow {
    x: i32,
    y: i32,
    ctidx: usize,
}

/// Immutable grid cell to tract table for one region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridIndex {
    cells: BTreeMap<GridCell, TractIndex>,
}

impl GridIndex {
    #[must_use]
    pub fn from_cells(cells: impl IntoIterator<Item = (GridCell, TractIndex)>) -> Self {
        Self {
            cells: cells.into_iter().collect(),
        }
    }

    /// Loads a precomputed `x,y,ctidx` table.
    ///
    /// # Errors
    ///
    /// Returns an error if the header does not match or any row is
    /// malformed. The table is machine generated, so a bad row means the
    /// artifact itself is broken.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GeoError> {
        let mut csv = csv::Reader::from_reader(reader);

        let headers = csv.headers()?.clone();
        if headers.iter().ne(HEADER) {
            return Err(GeoError::UnexpectedHeader {
                expected: HEADER.join(","),
                found: headers.iter().collect::<Vec<_>>().join(","),
            });
        }

        let mut cells = BTreeMap::new();
        for row in csv.deserialize() {
            let row: GridRow = row?;
            cells.insert(GridCell::new(row.y, row.x), TractIndex(row.ctidx));
        }

        log::info!("Loaded {} grid cells", cells.len());
        Ok(Self { cells })
    }

    /// Writes the table in the `x,y,ctidx` format, ordered by cell.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), GeoError> {
        let mut csv = csv::Writer::from_writer(writer);
        for (cell, tract) in &self.cells {
            csv.serialize(GridRow {
                x: cell.col,
                y: cell.row,
                ctidx: tract.0,
            })?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Resolves a `(lat, lon)` coordinate to its census tract.
    #[must_use]
    pub fn lookup(&self, lat: f64, lon: f64) -> Option<TractIndex> {
        self.lookup_cell(GridCell::from_lat_lon(lat, lon))
    }

    #[must_use]
    pub fn lookup_cell(&self, cell: GridCell) -> Option<TractIndex> {
        self.cells.get(&cell).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Derives the table from tract boundaries.
    ///
    /// Every integer cell inside a tract's scaled bounding box is assigned to
    /// that tract when more than half of the cell's area lies inside the
    /// tract polygon. When cells are claimed by several tracts the later
    /// tract wins.
    #[must_use]
    pub fn build<G: TractGeometry>(boundaries: &TractBoundaries<G>) -> Self {
        let cell_size = 1.0 / GRID_SCALE;
        let min_overlap = MIN_CELL_OVERLAP * cell_size * cell_size;
        let mut cells = BTreeMap::new();

        for tract in boundaries.iter() {
            let Some(geometry) = tract.geometry.as_ref() else {
                continue;
            };
            let Some((bounds, _)) = geometry.bounds_and_area() else {
                continue;
            };

            let west = scaled_floor(bounds.min_x);
            let south = scaled_floor(bounds.min_y);
            let east = scaled_ceil(bounds.max_x);
            let north = scaled_ceil(bounds.max_y);

            let before = cells.len();
            for y in south..north {
                for x in west..east {
                    let cell = Bounds::new(cell_edge(x), cell_edge(y), cell_edge(x + 1), cell_edge(y + 1));
                    if geometry.box_overlap_area(&cell) > min_overlap {
                        cells.insert(GridCell::new(y, x), tract.index);
                    }
                }
            }
            log::debug!(
                "Tract {} of {}: {} cells total (+{})",
                tract.index,
                boundaries.len(),
                cells.len(),
                cells.len() - before
            );
        }

        log::info!(
            "Built grid index with {} cells from {} tracts",
            cells.len(),
            boundaries.len()
        );
        Self { cells }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn scaled_floor(value: f64) -> i32 {
    (value * GRID_SCALE).floor() as i32
}

#[allow(clippy::cast_possible_truncation)]
fn scaled_ceil(value: f64) -> i32 {
    (value * GRID_SCALE).ceil() as i32
}
