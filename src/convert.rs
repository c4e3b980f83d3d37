//! GeoJSON input for loaders.
//!
//! Most URL-template loaders fetch GeoJSON. These helpers turn a parsed
//! `geojson::Feature` or a raw feature collection into [`Feature`]s. String
//! and numeric ids are kept; missing ids stay empty and are filled in when the
//! tile is indexed.

use crate::error::{Result, TileCacheError};
use crate::types::Feature;
use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use geojson::{GeoJson, Value, feature::Id};

impl Feature {
    /// Shorthand for [`feature_from_geojson`].
    pub fn from_geojson(feature: geojson::Feature) -> Result<Self> {
        feature_from_geojson(feature)
    }
}

/// Converts one GeoJSON feature.
pub fn feature_from_geojson(feature: geojson::Feature) -> Result<Feature> {
    let id = match feature.id {
        Some(Id::String(id)) => id,
        Some(Id::Number(id)) => id.to_string(),
        None => String::new(),
    };

    let geometry = feature
        .geometry
        .map(|geometry| geometry_from_value(&geometry.value))
        .transpose()?;

    Ok(Feature {
        id,
        geometry,
        properties: feature.properties.unwrap_or_default(),
    })
}

/// Parses a GeoJSON document. A bare geometry becomes one feature without id.
pub fn features_from_geojson_str(json: &str) -> Result<Vec<Feature>> {
    let geojson: GeoJson = json.parse()?;
    match geojson {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .map(feature_from_geojson)
            .collect(),
        GeoJson::Feature(feature) => Ok(vec![feature_from_geojson(feature)?]),
        GeoJson::Geometry(geometry) => Ok(vec![Feature::anonymous(geometry_from_value(
            &geometry.value,
        )?)]),
    }
}

fn coord(position: &[f64]) -> Result<Coord<f64>> {
    match position {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(TileCacheError::InvalidFeature(
            "position must have at least 2 coordinates".to_string(),
        )),
    }
}

fn line_string(positions: &[Vec<f64>]) -> Result<LineString<f64>> {
    positions
        .iter()
        .map(|position| coord(position))
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| line_string(ring));
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => LineString::new(Vec::new()),
    };
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn geometry_from_value(value: &Value) -> Result<Geometry<f64>> {
    let geometry = match value {
        Value::Point(position) => Geometry::Point(Point::from(coord(position)?)),
        Value::MultiPoint(positions) => Geometry::MultiPoint(MultiPoint::new(
            positions
                .iter()
                .map(|position| coord(position).map(Point::from))
                .collect::<Result<Vec<_>>>()?,
        )),
        Value::LineString(positions) => Geometry::LineString(line_string(positions)?),
        Value::MultiLineString(lines) => Geometry::MultiLineString(MultiLineString::new(
            lines
                .iter()
                .map(|line| line_string(line))
                .collect::<Result<Vec<_>>>()?,
        )),
        Value::Polygon(rings) => Geometry::Polygon(polygon(rings)?),
        Value::MultiPolygon(polygons) => Geometry::MultiPolygon(MultiPolygon::new(
            polygons
                .iter()
                .map(|rings| polygon(rings))
                .collect::<Result<Vec<_>>>()?,
        )),
        Value::GeometryCollection(geometries) => {
            Geometry::GeometryCollection(GeometryCollection::from(
                geometries
                    .iter()
                    .map(|geometry| geometry_from_value(&geometry.value))
                    .collect::<Result<Vec<_>>>()?,
            ))
        }
    };
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "park",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]]]
                },
                "properties": { "name": "Central" }
            },
            {
                "type": "Feature",
                "id": 42,
                "geometry": { "type": "Point", "coordinates": [1.5, 2.5, 10.0] },
                "properties": null
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": {}
            }
        ]
    }"#;

    #[test]
    fn test_collection_conversion() {
        let features = features_from_geojson_str(COLLECTION).unwrap();
        assert_eq!(features.len(), 3);

        assert_eq!(features[0].id, "park");
        assert_eq!(features[0].property("name"), Some(&serde_json::json!("Central")));
        assert!(matches!(features[0].geometry, Some(Geometry::Polygon(_))));

        assert_eq!(features[1].id, "42");
        assert_eq!(features[1].geometry, Some(Geometry::Point(Point::new(1.5, 2.5))));

        assert!(features[2].id.is_empty());
        assert!(features[2].geometry.is_none());
        assert!(features[2].bounds().is_none());
    }

    #[test]
    fn test_short_position_is_rejected() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": { "type": "Point", "coordinates": [1.0] }, "properties": {} }
            ]
        }"#;
        assert!(matches!(
            features_from_geojson_str(json),
            Err(TileCacheError::InvalidFeature(_))
        ));
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            features_from_geojson_str("not json"),
            Err(TileCacheError::InvalidFeature(_))
        ));
    }

    #[test]
    fn test_single_feature_and_bare_geometry() {
        let feature = r#"{ "type": "Feature", "id": "a", "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 1]] }, "properties": {} }"#;
        let features = features_from_geojson_str(feature).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, "a");

        let geometry = r#"{ "type": "MultiPoint", "coordinates": [[0, 0], [2, 3]] }"#;
        let features = features_from_geojson_str(geometry).unwrap();
        assert!(features[0].id.is_empty());
        let bounds = features[0].bounds().unwrap();
        assert_eq!(bounds.max(), geo::coord! { x: 2.0, y: 3.0 });
    }
}
