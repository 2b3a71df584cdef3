//! Compile-time registry of analysis regions.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! A region names its grid, income, and tract boundary files (relative to
//! the data directory) and how tract identifiers are spelled in each.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use route_equity_geography::grid::GridIndex;
use route_equity_geography::income::{
    CensusIncomeTable, IncomeBuildReport, IncomeColumns, read_income_records,
};
use route_equity_geography::normalize::{DEFAULT_FALLBACK_PREFIX, TractIdResolver};
use route_equity_spatial::TractBoundaries;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
const EXPECTED_REGION_COUNT: usize = 2;

const REGION_TOMLS: &[(&str, &str)] = &[
    ("sf", include_str!("../regions/sf.toml")),
    ("nyc", include_str!("../regions/nyc.toml")),
];

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("Failed to parse region '{name}': {source}")]
    Parse {
        name: String,
        source: toml::de::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown region '{0}'")]
    Unknown(String),
}

/// File locations and identifier conventions for one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub id: String,
    pub name: String,
    pub grid_path: PathBuf,
    pub census_path: PathBuf,
    pub tracts_path: PathBuf,
    /// Boundary properties joined with `|` to form a tract key.
    #[serde(default = "default_tract_id_properties")]
    pub tract_id_properties: Vec<String>,
    #[serde(default = "default_census_id_column")]
    pub census_id_column: String,
    /// Number of consecutive income columns forming the key.
    #[serde(default = "default_census_id_span")]
    pub census_id_span: usize,
    #[serde(default = "default_hmi_column")]
    pub hmi_column: String,
    /// Retried in front of income identifiers that match no tract. Empty
    /// disables the retry.
    #[serde(default = "default_fallback_prefix")]
    pub id_fallback_prefix: Option<String>,
}

fn default_tract_id_properties() -> Vec<String> {
    vec!["NAME".to_string()]
}

fn default_census_id_column() -> String {
    "ID".to_string()
}

const fn default_census_id_span() -> usize {
    1
}

fn default_hmi_column() -> String {
    "HMI".to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_fallback_prefix() -> Option<String> {
    Some(DEFAULT_FALLBACK_PREFIX.to_string())
}

impl RegionConfig {
    /// # Errors
    ///
    /// Returns an error if `content` is not a valid region definition.
    pub fn parse(name: &str, content: &str) -> Result<Self, RegionError> {
        toml::de::from_str(content).map_err(|source| RegionError::Parse {
            name: name.to_string(),
            source,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, RegionError> {
        Self::parse(&path.display().to_string(), &fs::read_to_string(path)?)
    }

    #[must_use]
    pub fn income_columns(&self) -> IncomeColumns {
        IncomeColumns {
            id_column: self.census_id_column.clone(),
            id_span: self.census_id_span,
            value_column: self.hmi_column.clone(),
        }
    }
}

/// Returns all registered regions.
///
/// # Errors
///
/// Returns an error if an embedded definition fails to parse.
pub fn all_regions() -> Result<Vec<RegionConfig>, RegionError> {
    REGION_TOMLS
        .iter()
        .map(|(name, content)| RegionConfig::parse(name, content))
        .collect()
}

/// Looks up a registered region by id.
///
/// # Errors
///
/// Returns an error if no registered region has this id.
pub fn find_region(id: &str) -> Result<RegionConfig, RegionError> {
    all_regions()?
        .into_iter()
        .find(|region| region.id == id)
        .ok_or_else(|| RegionError::Unknown(id.to_string()))
}

/// Loads the region's tract boundaries.
///
/// # Errors
///
/// Returns an error if the boundary file cannot be read or parsed.
pub fn load_tracts(
    region: &RegionConfig,
    data_dir: &Path,
) -> Result<TractBoundaries, Box<dyn std::error::Error>> {
    let path = data_dir.join(&region.tracts_path);
    log::info!("Loading tract boundaries from {}", path.display());
    let tracts = TractBoundaries::from_geojson(
        &fs::read_to_string(&path)?,
        &region.tract_id_properties,
    )?;
    log::info!("{} tracts", tracts.len());
    Ok(tracts)
}

/// Grid index and income table of a region, ready for attribution.
pub struct RegionData {
    pub grid: GridIndex,
    pub income: CensusIncomeTable,
}

/// Loads the grid table, boundaries, and income records of `region` and
/// builds the income table.
///
/// # Errors
///
/// Returns an error if any of the region's files cannot be read or parsed.
pub fn load_region_data(
    region: &RegionConfig,
    data_dir: &Path,
) -> Result<RegionData, Box<dyn std::error::Error>> {
    let grid_path = data_dir.join(&region.grid_path);
    log::info!("Loading grid from {}", grid_path.display());
    let grid = GridIndex::from_reader(File::open(&grid_path)?)?;
    log::info!("{} grid cells", grid.len());

    let tracts = load_tracts(region, data_dir)?;
    let resolver = TractIdResolver::new(tracts.id_lookup(), region.id_fallback_prefix.clone());

    let census_path = data_dir.join(&region.census_path);
    log::info!("Loading income records from {}", census_path.display());
    let (records, _short_rows) =
        read_income_records(File::open(&census_path)?, &region.income_columns())?;

    let (income, report) = CensusIncomeTable::build(&records, &tracts, &resolver);
    log::info!("{}", income_summary(&report));

    Ok(RegionData { grid, income })
}

fn income_summary(report: &IncomeBuildReport) -> String {
    format!(
        "Income: {} records ({} via prefix), {} unmatched, {} invalid, {} imputed, \
         {} still missing, {} tracts unreported",
        report.records,
        report.prefixed_matches,
        report.unmatched,
        report.invalid,
        report.imputed,
        report.unimputable,
        report.unreported
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn loads_all_regions() {
        let regions = all_regions().unwrap();
        assert_eq!(
            regions.len(),
            EXPECTED_REGION_COUNT,
            "Expected {EXPECTED_REGION_COUNT} regions, found {}. \
             Update EXPECTED_REGION_COUNT after adding/removing regions.",
            regions.len()
        );
    }

    #[test]
    fn region_ids_are_unique_and_match_registry_names() {
        let mut seen = BTreeSet::new();
        for ((name, _), region) in REGION_TOMLS.iter().zip(all_regions().unwrap()) {
            assert_eq!(*name, region.id);
            assert!(seen.insert(region.id.clone()), "Duplicate region {}", region.id);
        }
    }

    #[test]
    fn nyc_uses_composite_keys() {
        let nyc = find_region("nyc").unwrap();
        assert_eq!(nyc.tract_id_properties, vec!["COUNTYFP", "NAME"]);
        assert_eq!(nyc.income_columns().id_span, 2);
        assert_eq!(nyc.income_columns().id_column, "County");
    }

    #[test]
    fn omitted_fields_take_defaults() {
        let region = RegionConfig::parse(
            "custom",
            r#"
            id = "custom"
            name = "Custom"
            grid_path = "grid.csv"
            census_path = "census.csv"
            tracts_path = "tracts.geojson"
            "#,
        )
        .unwrap();

        assert_eq!(region.tract_id_properties, vec!["NAME"]);
        assert_eq!(region.census_id_span, 1);
        assert_eq!(region.hmi_column, "HMI");
        assert_eq!(region.id_fallback_prefix.as_deref(), Some("9"));
    }

    #[test]
    fn unknown_region_is_an_error() {
        assert!(matches!(
            find_region("atlantis"),
            Err(RegionError::Unknown(_))
        ));
    }

    #[test]
    fn income_summary_lists_every_counter() {
        let report = IncomeBuildReport {
            records: 10,
            unmatched: 1,
            prefixed_matches: 2,
            invalid: 3,
            imputed: 2,
            unimputable: 1,
            unreported: 4,
        };
        assert_eq!(
            income_summary(&report),
            "Income: 10 records (2 via prefix), 1 unmatched, 3 invalid, 2 imputed, \
             1 still missing, 4 tracts unreported"
        );
    }
}
