#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory census tract boundary index.
//!
//! Loads an ordered tract `FeatureCollection` (position = tract index),
//! builds an R-tree over tract envelopes, and answers the neighbor queries
//! used for income imputation. Geometry work goes through the
//! [`TractGeometry`] capability so the algorithms above this crate do not
//! depend on a particular geometry engine.

pub mod geometry;

use std::collections::BTreeMap;

use geo::MultiPolygon;
use geojson::{Feature, GeoJson};
use route_equity_geography_models::TractIndex;
use rstar::{AABB, RTree, RTreeObject};
use thiserror::Error;

pub use geometry::{Bounds, TractGeometry};

/// Errors that can occur while loading tract boundaries.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The input was not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The input parsed but was not a `FeatureCollection`.
    #[error("Expected a FeatureCollection of census tracts")]
    NotFeatureCollection,
}

/// A single census tract boundary.
#[derive(Debug, Clone)]
pub struct TractBoundary<G> {
    pub index: TractIndex,
    /// Identifier used to join income records (possibly composite).
    pub id: Option<String>,
    /// `None` when the source geometry was absent or unusable.
    pub geometry: Option<G>,
}

/// Tract envelope stored in the R-tree.
struct EnvelopeEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for EnvelopeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Ordered tract boundaries plus an envelope index over them.
pub struct TractBoundaries<G = MultiPolygon<f64>> {
    tracts: Vec<TractBoundary<G>>,
    envelopes: RTree<EnvelopeEntry>,
}

impl<G: TractGeometry> TractBoundaries<G> {
    /// Builds the index from `(id, geometry)` pairs in tract order.
    #[must_use]
    pub fn new(tracts: Vec<(Option<String>, Option<G>)>) -> Self {
        let tracts: Vec<TractBoundary<G>> = tracts
            .into_iter()
            .enumerate()
            .map(|(i, (id, geometry))| TractBoundary {
                index: TractIndex(i),
                id,
                geometry,
            })
            .collect();

        let entries = tracts
            .iter()
            .filter_map(|tract| {
                let (bounds, _) = tract.geometry.as_ref()?.bounds_and_area()?;
                Some(EnvelopeEntry {
                    index: tract.index.0,
                    envelope: envelope_of(&bounds),
                })
            })
            .collect();

        Self {
            tracts,
            envelopes: RTree::bulk_load(entries),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracts.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: TractIndex) -> Option<&TractBoundary<G>> {
        self.tracts.get(index.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TractBoundary<G>> {
        self.tracts.iter()
    }

    /// Tracts whose geometry intersects the given tract's geometry.
    ///
    /// The tract itself is never included. Returns an empty list when the
    /// tract has no geometry. Results are in tract order.
    #[must_use]
    pub fn neighbors(&self, index: TractIndex) -> Vec<TractIndex> {
        let Some(target) = self.get(index).and_then(|t| t.geometry.as_ref()) else {
            return Vec::new();
        };
        let Some((bounds, _)) = target.bounds_and_area() else {
            return Vec::new();
        };

        let mut found: Vec<TractIndex> = self
            .envelopes
            .locate_in_envelope_intersecting(&envelope_of(&bounds))
            .filter(|entry| entry.index != index.0)
            .filter(|entry| {
                self.tracts[entry.index]
                    .geometry
                    .as_ref()
                    .is_some_and(|other| other.intersects(target))
            })
            .map(|entry| TractIndex(entry.index))
            .collect();

        found.sort_unstable();
        found
    }

    /// Identifier to tract index. When two tracts share an identifier the
    /// later one wins.
    #[must_use]
    pub fn id_lookup(&self) -> BTreeMap<String, TractIndex> {
        self.tracts
            .iter()
            .filter_map(|t| t.id.clone().map(|id| (id, t.index)))
            .collect()
    }
}

impl TractBoundaries<MultiPolygon<f64>> {
    /// Parses a tract `FeatureCollection`.
    ///
    /// The tract identifier is built from `id_properties`, joined with `|`
    /// when there is more than one (e.g. `["COUNTYFP", "NAME"]`). Features
    /// with unusable geometry keep their position so later tract indices
    /// do not shift.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a `GeoJSON` `FeatureCollection`.
    pub fn from_geojson(input: &str, id_properties: &[String]) -> Result<Self, SpatialError> {
        let GeoJson::FeatureCollection(collection) = input.parse::<GeoJson>()? else {
            return Err(SpatialError::NotFeatureCollection);
        };

        let mut unusable = 0_usize;
        let tracts: Vec<_> = collection
            .features
            .into_iter()
            .map(|feature| {
                let id = composite_id(&feature, id_properties);
                let geometry = feature.geometry.and_then(to_multipolygon);
                if geometry.is_none() {
                    unusable += 1;
                }
                (id, geometry)
            })
            .collect();

        if unusable > 0 {
            log::warn!("{unusable} tract features have no usable polygon geometry");
        }
        log::info!("Loaded {} census tract boundaries", tracts.len());

        Ok(Self::new(tracts))
    }
}

/// Joins the requested feature properties into one identifier.
fn composite_id(feature: &Feature, id_properties: &[String]) -> Option<String> {
    let parts = id_properties
        .iter()
        .map(|key| match feature.property(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect::<Option<Vec<_>>>()?;

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("|"))
    }
}

/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

fn envelope_of(bounds: &Bounds) -> AABB<[f64; 2]> {
    AABB::from_corners([bounds.min_x, bounds.min_y], [bounds.max_x, bounds.max_y])
}
