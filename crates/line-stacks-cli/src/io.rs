//! GeoJSON input and output of line features

use crate::CliError;
use geo::Coord;
use geojson::GeoJson;
use geojson::feature::Id;
use line_stacks::{Feature, FeatureCollection, GeometryType, Schema, StackError, Value};
use serde_json::{Map, Number, Value as JsonValue};
use std::io::{Read, Write};
use std::path::Path;

/// Path meaning stdin or stdout
const STDIO_PATH: &str = "-";

/// Read LineString features and infer their schema
pub fn read_features(path: &Path) -> Result<(Schema, Vec<Feature>), CliError> {
    let read_error = |source| CliError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut text = String::new();
    if path == Path::new(STDIO_PATH) {
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(read_error)?;
    } else {
        text = std::fs::read_to_string(path).map_err(read_error)?;
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| *s != STDIO_PATH)
        .unwrap_or("input");
    parse_features(name, &text)
}

/// Write the stacked lines as a GeoJSON FeatureCollection
pub fn write_features(collection: &FeatureCollection, path: &Path) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(&to_geojson(collection))?;
    let write_error = |source| CliError::Write {
        path: path.to_path_buf(),
        source,
    };
    if path == Path::new(STDIO_PATH) {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{text}").map_err(write_error)?;
    } else {
        std::fs::write(path, text).map_err(write_error)?;
    }
    Ok(())
}

pub fn parse_features(name: &str, text: &str) -> Result<(Schema, Vec<Feature>), CliError> {
    let features = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(CliError::InvalidInput(
                "expected a Feature or a FeatureCollection, found a bare geometry".to_string(),
            ));
        }
    };

    let mut lines = Vec::with_capacity(features.len());
    for (index, feature) in features.into_iter().enumerate() {
        let id = match &feature.id {
            Some(Id::String(s)) => s.clone(),
            Some(Id::Number(n)) => n.to_string(),
            None => index.to_string(),
        };
        let Some(geometry) = feature.geometry else {
            tracing::warn!("Skipping feature {id} without geometry");
            continue;
        };
        let coords = match geometry.value {
            geojson::Value::LineString(positions) => positions
                .iter()
                .map(|p| match p.as_slice() {
                    [x, y, ..] => Ok(Coord { x: *x, y: *y }),
                    _ => Err(CliError::InvalidInput(format!(
                        "feature {id} has a position with fewer than 2 values"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(StackError::InvalidGeometryType {
                    expected: GeometryType::LineString,
                    found: geometry_type(&other),
                }
                .into());
            }
        };

        let mut line = Feature::new(id, coords.into());
        for (key, value) in feature.properties.unwrap_or_default() {
            line.attributes.insert(key, from_json(value));
        }
        lines.push(line);
    }

    let schema = Schema::infer(name, &lines);
    tracing::info!(
        "Read {} line features with {} attributes",
        lines.len(),
        schema.attributes.len()
    );
    Ok((schema, lines))
}

pub fn to_geojson(collection: &FeatureCollection) -> GeoJson {
    let features = collection
        .features
        .iter()
        .map(|feature| {
            let positions = feature.geometry.0.iter().map(|c| vec![c.x, c.y]).collect();
            let properties: Map<String, JsonValue> = feature
                .attributes
                .iter()
                .map(|(key, value)| (key.clone(), to_json(value)))
                .collect();
            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::LineString(positions))),
                id: Some(Id::String(feature.id.clone())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    GeoJson::FeatureCollection(geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn geometry_type(value: &geojson::Value) -> GeometryType {
    match value {
        geojson::Value::LineString(_) => GeometryType::LineString,
        geojson::Value::MultiLineString(_) => GeometryType::MultiLineString,
        geojson::Value::Point(_) | geojson::Value::MultiPoint(_) => GeometryType::Point,
        geojson::Value::Polygon(_) | geojson::Value::MultiPolygon(_) => GeometryType::Polygon,
        geojson::Value::GeometryCollection(_) => GeometryType::Other,
    }
}

fn from_json(value: JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or(Value::Null, Value::Float),
        },
        JsonValue::String(s) => Value::String(s),
        // Nested values are kept as their JSON text
        other => Value::String(other.to_string()),
    }
}

fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(i) => JsonValue::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        Value::String(s) => JsonValue::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use line_stacks::AttributeType;

    const INPUT: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "a",
                "geometry": { "type": "LineString", "coordinates": [[0, 0], [10, 0]] },
                "properties": { "line": "S1", "order": 1, "invert": false, "extra": [1, 2] }
            },
            {
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[0, 0, 5], [10, 0, 5]] },
                "properties": { "line": "S2", "order": 2, "invert": null, "extra": null }
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": {}
            }
        ]
    }"#;

    #[test]
    fn test_parse_line_features() {
        let (schema, features) = parse_features("lines", INPUT).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id, "a");
        assert_eq!(features[1].id, "1");
        assert_eq!(features[1].geometry.0[1], Coord { x: 10.0, y: 0.0 });
        assert_eq!(features[0].attribute("order"), Some(&Value::Int(1)));
        assert_eq!(features[1].attribute("invert"), Some(&Value::Null));
        assert_eq!(
            features[0].attribute("extra"),
            Some(&Value::String("[1,2]".to_string()))
        );

        assert_eq!(schema.name, "lines");
        assert_eq!(
            schema.attribute("order").map(|d| d.attribute_type),
            Some(AttributeType::Int)
        );
        assert_eq!(
            schema.attribute("invert").map(|d| d.attribute_type),
            Some(AttributeType::Bool)
        );
    }

    #[test]
    fn test_non_line_geometry_is_rejected() {
        let input = r#"{
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [1, 2] },
            "properties": null
        }"#;
        assert!(matches!(
            parse_features("points", input),
            Err(CliError::Stack(StackError::InvalidGeometryType {
                found: GeometryType::Point,
                ..
            }))
        ));
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(
            parse_features("broken", "{ not json"),
            Err(CliError::GeoJson(_))
        ));
    }

    #[test]
    fn test_write_features() {
        let (schema, features) = parse_features("lines", INPUT).unwrap();
        let mut collection = FeatureCollection::new(schema);
        for feature in features {
            collection.push(feature.with_attribute("agg_count", 2i64));
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        write_features(&collection, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let (_, written) = parse_features("out", &text).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].id, "a");
        assert_eq!(written[0].attribute("agg_count"), Some(&Value::Int(2)));
        assert_eq!(written[0].geometry, collection.features[0].geometry);
    }
}
