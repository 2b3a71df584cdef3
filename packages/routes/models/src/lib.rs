#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Route polyline, directed segment, and route set types.
//!
//! A route set holds the output of one routing algorithm, keyed by a route
//! identifier shared across algorithms (one identifier per
//! origin-destination pair). Segments compare by exact coordinate value;
//! nothing is snapped, so nearly equal vertices from different sources stay
//! distinct.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A `(lat, lon)` vertex.
///
/// Equality, ordering, and hashing use the bit-level total order of `f64`
/// so vertices can key maps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Straight-line distance in decimal degrees, treating `(lon, lat)` as
    /// planar coordinates.
    #[must_use]
    pub fn planar_distance(&self, other: &Self) -> f64 {
        (other.lon - self.lon).hypot(other.lat - self.lat)
    }

    /// GeoJSON position order.
    #[must_use]
    pub const fn to_lon_lat(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

impl PartialEq for LatLon {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LatLon {}

impl PartialOrd for LatLon {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LatLon {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lat
            .total_cmp(&other.lat)
            .then_with(|| self.lon.total_cmp(&other.lon))
    }
}

impl Hash for LatLon {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lat.to_bits().hash(state);
        self.lon.to_bits().hash(state);
    }
}

/// A directed pair of consecutive route vertices.
///
/// `A -> B` and `B -> A` are different segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub from: LatLon,
    pub to: LatLon,
}

impl Segment {
    #[must_use]
    pub const fn new(from: LatLon, to: LatLon) -> Self {
        Self { from, to }
    }

    #[must_use]
    pub fn planar_length(&self) -> f64 {
        self.from.planar_distance(&self.to)
    }
}

/// One route returned by a routing algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePolyline {
    pub id: String,
    pub vertices: Vec<LatLon>,
    pub travel_time_secs: f64,
}

impl RoutePolyline {
    #[must_use]
    pub const fn new(id: String, vertices: Vec<LatLon>, travel_time_secs: f64) -> Self {
        Self {
            id,
            vertices,
            travel_time_secs,
        }
    }

    /// Directed segments in travel order, repeats included.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.vertices.windows(2).map(|w| Segment::new(w[0], w[1]))
    }

    /// Total planar length in decimal degrees.
    #[must_use]
    pub fn planar_length(&self) -> f64 {
        self.segments().map(|s| s.planar_length()).sum()
    }
}

/// Routes produced by one algorithm, keyed by route identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSet {
    pub label: String,
    routes: BTreeMap<String, RoutePolyline>,
}

impl RouteSet {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            routes: BTreeMap::new(),
        }
    }

    /// Adds a route, replacing any earlier route with the same identifier.
    pub fn insert(&mut self, route: RoutePolyline) -> Option<RoutePolyline> {
        self.routes.insert(route.id.clone(), route)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RoutePolyline> {
        self.routes.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &RoutePolyline> {
        self.routes.values()
    }
}

impl FromIterator<RoutePolyline> for RouteSet {
    fn from_iter<T: IntoIterator<Item = RoutePolyline>>(iter: T) -> Self {
        let mut set = Self::default();
        for route in iter {
            set.insert(route);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(id: &str, points: &[(f64, f64)]) -> RoutePolyline {
        RoutePolyline::new(
            id.to_string(),
            points.iter().map(|&(lat, lon)| LatLon::new(lat, lon)).collect(),
            60.0,
        )
    }

    #[test]
    fn segments_are_directed() {
        let a = LatLon::new(1.0, 2.0);
        let b = LatLon::new(1.5, 2.5);
        assert_ne!(Segment::new(a, b), Segment::new(b, a));
    }

    #[test]
    fn segments_follow_vertex_order() {
        let r = route("r", &[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]);
        let segments: Vec<Segment> = r.segments().collect();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].from, LatLon::new(0.0, 1.0));
        assert!((r.planar_length() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn single_vertex_route_has_no_segments() {
        assert_eq!(route("r", &[(0.0, 0.0)]).segments().count(), 0);
    }

    #[test]
    fn nearly_equal_vertices_stay_distinct() {
        assert_ne!(LatLon::new(40.0, -73.0), LatLon::new(40.000_000_1, -73.0));
    }

    #[test]
    fn positions_are_lon_lat() {
        assert_eq!(LatLon::new(37.77, -122.41).to_lon_lat(), [-122.41, 37.77]);
    }

    #[test]
    fn later_route_replaces_earlier() {
        let mut set = RouteSet::new("fastest");
        set.insert(route("1", &[(0.0, 0.0)]));
        let replaced = set.insert(route("1", &[(1.0, 1.0)]));
        assert!(replaced.is_some());
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("1").unwrap().vertices[0], LatLon::new(1.0, 1.0));
    }
}
