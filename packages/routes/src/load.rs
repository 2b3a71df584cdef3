//! Routing CSV reader.
//!
//! Columns are located by header name. `polyline_points` holds a bracketed
//! list of `(lat, lon)` pairs, written either with tuple parentheses
//! (`[(40.1, -73.9), (40.2, -73.8)]`) or as nested lists.

use std::io::Read;

use route_equity_route_models::{LatLon, RoutePolyline, RouteSet};
use serde::Serialize;

use crate::RouteError;

/// Header names of the columns the loader needs.
#[derive(Debug, Clone)]
pub struct RouteColumns {
    pub id: String,
    pub polyline: String,
    pub travel_time: String,
}

impl Default for RouteColumns {
    fn default() -> Self {
        Self {
            id: "ID".to_string(),
            polyline: "polyline_points".to_string(),
            travel_time: "total_time_in_sec".to_string(),
        }
    }
}

/// Outcome counters for one CSV.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub rows: usize,
    pub loaded: usize,
    /// Rows skipped because a required field was missing or unparsable.
    pub failed: usize,
    /// Rows that replaced an earlier row with the same identifier.
    pub replaced: usize,
}

/// Parses a `polyline_points` field into vertices.
///
/// # Errors
///
/// Returns [`RouteError::InvalidPolyline`] if the field is not a list of
/// numeric pairs.
pub fn parse_polyline(raw: &str) -> Result<Vec<LatLon>, RouteError> {
    let as_json: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '(' => '[',
            ')' => ']',
            other => other,
        })
        .collect();

    let pairs: Vec<[f64; 2]> =
        serde_json::from_str(&as_json).map_err(|e| RouteError::InvalidPolyline {
            message: e.to_string(),
        })?;

    Ok(pairs
        .into_iter()
        .map(|[lat, lon]| LatLon::new(lat, lon))
        .collect())
}

/// Reads one algorithm's routes.
///
/// # Errors
///
/// Returns an error if the CSV cannot be read or a required column is
/// missing from the header. Individual bad rows are counted in the
/// [`LoadReport`] instead.
pub fn read_route_set<R: Read>(
    reader: R,
    label: &str,
    columns: &RouteColumns,
) -> Result<(RouteSet, LoadReport), RouteError> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| RouteError::MissingColumn {
                column: name.to_string(),
            })
    };
    let id_idx = position(&columns.id)?;
    let polyline_idx = position(&columns.polyline)?;
    let time_idx = position(&columns.travel_time)?;

    let mut set = RouteSet::new(label);
    let mut report = LoadReport::default();

    for row in csv.records() {
        let row = row?;
        report.rows += 1;

        let Some(route) = parse_row(&row, id_idx, polyline_idx, time_idx) else {
            log::debug!("{label}: skipping malformed row {}", report.rows);
            report.failed += 1;
            continue;
        };

        if set.insert(route).is_some() {
            report.replaced += 1;
        }
        report.loaded += 1;
    }

    log::info!(
        "{label}: {} routes loaded, {} failed, {} replaced",
        set.len(),
        report.failed,
        report.replaced
    );
    Ok((set, report))
}

fn parse_row(
    row: &csv::StringRecord,
    id_idx: usize,
    polyline_idx: usize,
    time_idx: usize,
) -> Option<RoutePolyline> {
    let id = row.get(id_idx).filter(|id| !id.is_empty())?;
    let time: f64 = row.get(time_idx)?.trim().parse().ok()?;
    let vertices = parse_polyline(row.get(polyline_idx)?).ok()?;
    Some(RoutePolyline::new(id.to_string(), vertices, time))
}
