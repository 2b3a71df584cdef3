//! Household median income per census tract.
//!
//! Parks, water, and other non-residential tracts usually have no income
//! figure. Such tracts take the mean of their intersecting neighbors'
//! reported values; a tract with no reporting neighbor stays
//! [`Hmi::Missing`] and is excluded downstream.

use std::io::Read;

use route_equity_geography_models::{Hmi, TractIndex};
use route_equity_spatial::{TractBoundaries, TractGeometry};
use serde::Serialize;

use crate::GeoError;
use crate::normalize::{COMPOSITE_SEPARATOR, Resolution, TractIdResolver};

/// One raw row of the income table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomeRecord {
    pub tract_id: String,
    pub raw_value: String,
}

/// Where the tract identifier and income value live in the income CSV.
#[derive(Debug, Clone)]
pub struct IncomeColumns {
    /// First identifier column.
    pub id_column: String,
    /// Number of consecutive columns, starting at `id_column`, joined into
    /// a composite identifier.
    pub id_span: usize,
    pub value_column: String,
}

impl Default for IncomeColumns {
    fn default() -> Self {
        Self {
            id_column: "ID".to_string(),
            id_span: 1,
            value_column: "HMI".to_string(),
        }
    }
}

/// Reads raw income rows. Rows too short to hold the configured columns
/// are skipped; the number skipped is returned alongside the records.
///
/// # Errors
///
/// Returns an error if the CSV cannot be read or a configured column is
/// absent from the header.
pub fn read_income_records<R: Read>(
    reader: R,
    columns: &IncomeColumns,
) -> Result<(Vec<IncomeRecord>, usize), GeoError> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| GeoError::MissingColumn {
                column: name.to_string(),
            })
    };
    let id_idx = position(&columns.id_column)?;
    let value_idx = position(&columns.value_column)?;
    let span = columns.id_span.max(1);

    let mut records = Vec::new();
    let mut skipped = 0;
    for row in csv.records() {
        let row = row?;
        let id_parts: Option<Vec<&str>> = (id_idx..id_idx + span).map(|i| row.get(i)).collect();
        match (id_parts, row.get(value_idx)) {
            (Some(parts), Some(value)) => records.push(IncomeRecord {
                tract_id: parts.join(COMPOSITE_SEPARATOR),
                raw_value: value.to_string(),
            }),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} short income rows");
    }
    Ok((records, skipped))
}

/// Counters describing how the income table was assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeBuildReport {
    pub records: usize,
    /// Records whose identifier matched no tract.
    pub unmatched: usize,
    /// Records matched only through the fallback prefix.
    pub prefixed_matches: usize,
    /// Tracts whose record was non-numeric or non-positive.
    pub invalid: usize,
    /// Invalid tracts filled from their neighbors.
    pub imputed: usize,
    /// Invalid tracts with no reporting neighbor.
    pub unimputable: usize,
    /// Tracts that never appeared in the income records.
    pub unreported: usize,
}

/// Immutable tract index to income table.
#[derive(Debug, Clone, PartialEq)]
pub struct CensusIncomeTable {
    values: Vec<Hmi>,
}

impl CensusIncomeTable {
    #[must_use]
    pub const fn from_values(values: Vec<Hmi>) -> Self {
        Self { values }
    }

    /// Income of a tract. Unknown tract indices are [`Hmi::Missing`].
    #[must_use]
    pub fn get(&self, tract: TractIndex) -> Hmi {
        self.values.get(tract.0).copied().unwrap_or(Hmi::Missing)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Joins income records to tract boundaries and imputes the gaps.
    ///
    /// When a tract has several records the last one wins. Imputation
    /// only ever averages values taken from the records, never other
    /// imputed values.
    #[must_use]
    pub fn build<G: TractGeometry>(
        records: &[IncomeRecord],
        boundaries: &TractBoundaries<G>,
        resolver: &TractIdResolver,
    ) -> (Self, IncomeBuildReport) {
        let mut report = IncomeBuildReport {
            records: records.len(),
            ..IncomeBuildReport::default()
        };
        let mut values: Vec<Option<Hmi>> = vec![None; boundaries.len()];

        for record in records {
            let Some(resolution) = resolver.resolve(&record.tract_id) else {
                log::debug!("No tract for income record '{}'", record.tract_id);
                report.unmatched += 1;
                continue;
            };
            if matches!(resolution, Resolution::Prefixed(_)) {
                report.prefixed_matches += 1;
            }
            if let Some(slot) = values.get_mut(resolution.index().0) {
                *slot = Some(Hmi::parse(&record.raw_value));
            }
        }

        let has_record: Vec<bool> = values.iter().map(Option::is_some).collect();
        report.unreported = has_record.iter().filter(|&&seen| !seen).count();
        let mut values: Vec<Hmi> = values
            .into_iter()
            .map(|value| value.unwrap_or(Hmi::Missing))
            .collect();

        let invalid: Vec<TractIndex> = boundaries
            .iter()
            .map(|tract| tract.index)
            .filter(|index| has_record[index.0] && values[index.0].is_missing())
            .collect();
        report.invalid = invalid.len();

        let imputations: Vec<(TractIndex, Option<f64>)> = invalid
            .iter()
            .map(|&index| {
                let neighbors: Vec<f64> = boundaries
                    .neighbors(index)
                    .into_iter()
                    .filter_map(|n| values[n.0].reported())
                    .collect();
                (index, mean(&neighbors))
            })
            .collect();

        for (index, imputed) in imputations {
            if let Some(value) = imputed {
                values[index.0] = Hmi::Imputed(value);
                report.imputed += 1;
            } else {
                log::debug!("Tract {index} has no neighbor with reported income");
                report.unimputable += 1;
            }
        }

        log::info!(
            "Income table: {} tracts, {} invalid, {} imputed, {} without usable neighbors, {} unmatched records",
            values.len(),
            report.invalid,
            report.imputed,
            report.unimputable,
            report.unmatched
        );

        (Self { values }, report)
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
