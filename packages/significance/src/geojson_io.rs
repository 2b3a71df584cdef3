//! `GeoJSON` exchange format for classified segments.
//!
//! One `LineString` feature per segment, coordinates in `[lon, lat]`
//! order, with integer properties `lb`, `ub`, `med` and boolean `sig`.

use std::collections::BTreeMap;
use std::io::Write;

use geo::LineString;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject};
use route_equity_route_models::{LatLon, Segment};

use crate::SignificanceError;
use crate::engine::SegmentStats;

/// Builds the feature collection, optionally keeping significant segments
/// only.
#[must_use]
pub fn to_feature_collection<'a>(
    segments: impl IntoIterator<Item = (&'a Segment, &'a SegmentStats)>,
    significant_only: bool,
) -> FeatureCollection {
    let features = segments
        .into_iter()
        .filter(|(_, stats)| !significant_only || stats.significant)
        .map(|(segment, stats)| segment_feature(segment, stats))
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Writes segments as a `FeatureCollection` and returns how many features
/// were written.
///
/// # Errors
///
/// Returns an error if serialization or the underlying write fails.
pub fn write_geojson<W: Write>(
    mut writer: W,
    segments: &BTreeMap<Segment, SegmentStats>,
    significant_only: bool,
) -> Result<usize, SignificanceError> {
    let collection = to_feature_collection(segments, significant_only);
    let written = collection.features.len();
    serde_json::to_writer(&mut writer, &collection)?;
    writer.flush()?;
    log::info!("Wrote {written} of {} segments", segments.len());
    Ok(written)
}

/// Parses a collection written by [`write_geojson`].
///
/// # Errors
///
/// * [`SignificanceError::GeoJson`] if the input is not valid `GeoJSON`
/// * [`SignificanceError::NotFeatureCollection`] for any other top-level
///   object
/// * [`SignificanceError::InvalidFeature`] if a feature is not a two-point
///   `LineString` with `lb`, `ub`, `med` and `sig` properties
pub fn read_geojson(input: &str) -> Result<BTreeMap<Segment, SegmentStats>, SignificanceError> {
    let GeoJson::FeatureCollection(collection) = input.parse::<GeoJson>()? else {
        return Err(SignificanceError::NotFeatureCollection);
    };

    let mut segments = BTreeMap::new();
    for (index, feature) in collection.features.iter().enumerate() {
        let invalid = |message: &str| SignificanceError::InvalidFeature {
            index,
            message: message.to_string(),
        };

        let segment = feature_segment(feature).ok_or_else(|| invalid("not a two-point LineString"))?;
        let stats = SegmentStats {
            lower_bound: integer_property(feature, "lb").ok_or_else(|| invalid("bad 'lb'"))?,
            upper_bound: integer_property(feature, "ub").ok_or_else(|| invalid("bad 'ub'"))?,
            median: integer_property(feature, "med").ok_or_else(|| invalid("bad 'med'"))?,
            significant: feature
                .property("sig")
                .and_then(serde_json::Value::as_bool)
                .ok_or_else(|| invalid("bad 'sig'"))?,
        };
        if segments.insert(segment, stats).is_some() {
            log::warn!("Segment feature {index} repeats an earlier segment");
        }
    }

    log::debug!("Read {} segments", segments.len());
    Ok(segments)
}

fn segment_feature(segment: &Segment, stats: &SegmentStats) -> Feature {
    let line = LineString::from(vec![segment.from.to_lon_lat(), segment.to.to_lon_lat()]);

    let mut properties = JsonObject::new();
    properties.insert("lb".to_string(), stats.lower_bound.into());
    properties.insert("ub".to_string(), stats.upper_bound.into());
    properties.insert("med".to_string(), stats.median.into());
    properties.insert("sig".to_string(), stats.significant.into());

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&line))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn feature_segment(feature: &Feature) -> Option<Segment> {
    let geometry = feature.geometry.clone()?;
    let line = LineString::<f64>::try_from(geometry.value).ok()?;
    match line.0.as_slice() {
        [from, to] => Some(Segment::new(
            LatLon::new(from.y, from.x),
            LatLon::new(to.y, to.x),
        )),
        _ => None,
    }
}

/// Integer property; whole-number floats are accepted too.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn integer_property(feature: &Feature, key: &str) -> Option<i64> {
    let value = feature.property(key)?;
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments() -> BTreeMap<Segment, SegmentStats> {
        let stats = |lower_bound, median, upper_bound| SegmentStats {
            median,
            lower_bound,
            upper_bound,
            significant: (lower_bound > 0 && upper_bound > 0)
                || (lower_bound < 0 && upper_bound < 0),
        };
        BTreeMap::from([
            (
                Segment::new(LatLon::new(37.77, -122.41), LatLon::new(37.78, -122.42)),
                stats(2, 5, 9),
            ),
            (
                Segment::new(LatLon::new(37.78, -122.42), LatLon::new(37.79, -122.42)),
                stats(-3, 0, 4),
            ),
            (
                Segment::new(LatLon::new(37.79, -122.42), LatLon::new(37.80, -122.43)),
                stats(-8, -6, -1),
            ),
        ])
    }

    #[test]
    fn writes_lon_lat_order_and_reads_back() {
        let segments = segments();
        let mut out = Vec::new();
        let written = write_geojson(&mut out, &segments, false).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(written, 3);
        assert!(text.contains("[-122.41,37.77]"));
        assert_eq!(read_geojson(&text).unwrap(), segments);
    }

    #[test]
    fn significant_only_drops_the_rest() {
        let segments = segments();
        let mut out = Vec::new();
        let written = write_geojson(&mut out, &segments, true).unwrap();
        let read = read_geojson(&String::from_utf8(out).unwrap()).unwrap();

        assert_eq!(written, 2);
        assert!(read.values().all(|stats| stats.significant));
    }

    #[test]
    fn reads_float_valued_counts() {
        let input = r#"{"type": "FeatureCollection", "features": [{"type": "Feature",
            "geometry": {"type": "LineString", "coordinates": [[-73.99, 40.73], [-73.98, 40.74]]},
            "properties": {"lb": 1.0, "ub": 4.0, "med": 2.0, "sig": true}}]}"#;

        let read = read_geojson(input).unwrap();
        let segment = Segment::new(LatLon::new(40.73, -73.99), LatLon::new(40.74, -73.98));
        assert_eq!(read[&segment].median, 2);
        assert!(read[&segment].significant);
    }

    #[test]
    fn rejects_features_without_statistics() {
        let input = r#"{"type": "FeatureCollection", "features": [{"type": "Feature",
            "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]},
            "properties": {"lb": 1, "ub": 4}}]}"#;

        assert!(matches!(
            read_geojson(input),
            Err(SignificanceError::InvalidFeature { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_other_geojson_objects() {
        let input = r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#;
        assert!(matches!(
            read_geojson(input),
            Err(SignificanceError::NotFeatureCollection)
        ));
    }
}
