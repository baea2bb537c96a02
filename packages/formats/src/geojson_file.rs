//! `GeoJSON` `FeatureCollection` documents.

use geojson::{Feature, JsonObject};
use map_tools_features::FeatureCollection;
use serde_json::Value;

use crate::FormatError;

/// Parses a `GeoJSON` document into a collection.
///
/// The document must be an object with a `features` array whose elements
/// are objects, and each feature's `properties` must be an object or
/// null. A feature whose `geometry` cannot be read is kept without
/// geometry so its properties still import.
///
/// # Errors
///
/// * If the text is not JSON
/// * If the `features` array is missing or holds non-object elements
/// * If a feature's `properties` is neither an object nor null
pub fn decode_geojson(text: &str) -> Result<FeatureCollection, FormatError> {
    let document: Value =
        serde_json::from_str(text).map_err(|e| FormatError::InvalidGeoJson(e.to_string()))?;

    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| FormatError::InvalidGeoJson("missing `features` array".to_string()))?;

    features
        .iter()
        .enumerate()
        .map(|(index, value)| decode_feature(index, value).map(Some))
        .collect::<Result<Vec<_>, _>>()
        .map(FeatureCollection::new)
}

fn decode_feature(index: usize, value: &Value) -> Result<Feature, FormatError> {
    let object = value.as_object().ok_or_else(|| {
        FormatError::InvalidGeoJson(format!("feature {index} is not an object"))
    })?;

    let properties: Option<JsonObject> = match object.get("properties") {
        None | Some(Value::Null) => None,
        Some(Value::Object(properties)) => Some(properties.clone()),
        Some(_) => {
            return Err(FormatError::InvalidGeoJson(format!(
                "feature {index} has non-object properties"
            )));
        }
    };

    let geometry = match object.get("geometry") {
        None | Some(Value::Null) => None,
        Some(geometry) => match serde_json::from_value::<geojson::Geometry>(geometry.clone()) {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                log::warn!("Feature {index}: unreadable geometry, importing without it: {e}");
                None
            }
        },
    };

    Ok(Feature {
        bbox: None,
        geometry,
        id: None,
        properties,
        foreign_members: None,
    })
}

/// Serializes `collection` as a standard `FeatureCollection`, dropping
/// empty slots.
///
/// # Errors
///
/// * If JSON serialization fails
pub fn encode_geojson(collection: &FeatureCollection) -> Result<String, FormatError> {
    Ok(serde_json::to_string(&collection.to_geojson())?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const TWO_STORES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [10.5, 20.25]}, "properties": {"name": "A"}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-3.0, 51.5]}, "properties": {"name": "B"}}
        ]
    }"#;

    #[test]
    fn decodes_features_in_order() {
        let collection = decode_geojson(TWO_STORES).unwrap();
        assert_eq!(collection.len(), 2);
        let names: Vec<&str> = collection
            .located()
            .map(|f| f.properties.as_ref().unwrap()["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(
            collection.slots()[0].as_ref().unwrap().geometry.as_ref().unwrap().value,
            geojson::Value::Point(vec![10.5, 20.25])
        );
    }

    #[test]
    fn structural_errors_are_invalid_geojson() {
        for text in [
            "not json",
            "[]",
            r#"{"type": "FeatureCollection"}"#,
            r#"{"features": {}}"#,
            r#"{"features": [1]}"#,
            r#"{"features": [{"properties": [1, 2]}]}"#,
        ] {
            assert!(
                matches!(decode_geojson(text), Err(FormatError::InvalidGeoJson(_))),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn unreadable_geometry_keeps_properties() {
        let text = r#"{"features": [{"geometry": {"type": "Blob"}, "properties": {"name": "x"}}]}"#;
        let collection = decode_geojson(text).unwrap();
        let feature = collection.slots()[0].as_ref().unwrap();
        assert!(feature.geometry.is_none());
        assert_eq!(feature.properties.as_ref().unwrap()["name"], json!("x"));
    }

    #[test]
    fn empty_collection_is_valid() {
        assert!(decode_geojson(r#"{"features": []}"#).unwrap().is_empty());
    }

    #[test]
    fn encode_drops_empty_slots() {
        let mut collection = decode_geojson(TWO_STORES).unwrap();
        collection.extend(FeatureCollection::new(vec![None]));
        let encoded: Value = serde_json::from_str(&encode_geojson(&collection).unwrap()).unwrap();
        assert_eq!(encoded["type"], json!("FeatureCollection"));
        assert_eq!(encoded["features"].as_array().unwrap().len(), 2);
        assert_eq!(encoded["features"][1]["properties"]["name"], json!("B"));
    }

    #[test]
    fn encoded_output_decodes_to_same_collection() {
        let collection = decode_geojson(TWO_STORES).unwrap();
        let again = decode_geojson(&encode_geojson(&collection).unwrap()).unwrap();
        assert_eq!(again, collection);
    }
}
