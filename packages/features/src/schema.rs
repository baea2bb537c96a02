//! Column proposal for tables created from a feature collection.

use std::collections::BTreeSet;

use map_tools_records_models::ImportField;
use map_tools_records_models::schema::{CACHE_FIELD, LOCATION_FIELD, column_name};

use crate::FeatureCollection;

/// Property keys across every feature, in first-seen order.
///
/// These are the choices offered for the name field.
#[must_use]
pub fn property_keys(collection: &FeatureCollection) -> Vec<String> {
    let mut seen = BTreeSet::new();
    collection
        .located()
        .filter_map(|feature| feature.properties.as_ref())
        .flat_map(|properties| properties.keys())
        .filter(|key| seen.insert(key.as_str()))
        .cloned()
        .collect()
}

/// Proposes the columns of a table that will hold `collection`.
///
/// Layout: the name field, one text column per remaining property key
/// (renamed where it collides with a reserved column, duplicates after
/// renaming collapsed), then `Location` and `Cache`.
#[must_use]
pub fn propose_import_fields(collection: &FeatureCollection, name_field: &str) -> Vec<ImportField> {
    let name_column = column_name(name_field).into_owned();

    let mut taken: BTreeSet<String> = [LOCATION_FIELD, CACHE_FIELD]
        .into_iter()
        .map(str::to_string)
        .collect();
    taken.insert(name_column.clone());

    let mut fields = vec![ImportField::text(name_column)];

    for key in property_keys(collection) {
        if key == name_field {
            continue;
        }
        let column = column_name(&key).into_owned();
        if taken.insert(column.clone()) {
            fields.push(ImportField::text(column));
        }
    }

    fields.push(ImportField::text(LOCATION_FIELD));
    fields.push(ImportField::text(CACHE_FIELD));

    fields
}

#[cfg(test)]
mod tests {
    use geojson::Feature;
    use serde_json::json;

    use super::*;

    fn with_properties(properties: serde_json::Value) -> Feature {
        let serde_json::Value::Object(properties) = properties else {
            panic!("fixture must be an object");
        };
        Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }

    fn names(fields: &[ImportField]) -> Vec<&str> {
        fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn keys_are_unioned_in_first_seen_order() {
        let collection = FeatureCollection::new(vec![
            Some(with_properties(json!({"b": 1, "a": 2}))),
            None,
            Some(with_properties(json!({"a": 3, "c": 4}))),
        ]);
        assert_eq!(property_keys(&collection), ["b", "a", "c"]);
    }

    #[test]
    fn schema_layout() {
        let collection = FeatureCollection::from_features([with_properties(
            json!({"id": 1, "NAME": "x", "location": "here", "Cache": "c"}),
        )]);
        let fields = propose_import_fields(&collection, "NAME");
        assert_eq!(
            names(&fields),
            ["NAME", "id", "Location_Orig", "Cache_Orig", "Location", "Cache"]
        );
        assert!(fields.iter().all(|f| f.kind == map_tools_records_models::FieldKind::Text));
    }

    #[test]
    fn both_location_spellings_collapse_to_one_column() {
        let collection = FeatureCollection::from_features([with_properties(
            json!({"name": "n", "Location": "a", "location": "b"}),
        )]);
        let fields = propose_import_fields(&collection, "name");
        assert_eq!(names(&fields), ["name", "Location_Orig", "Location", "Cache"]);
    }

    #[test]
    fn location_name_field_is_renamed() {
        let collection =
            FeatureCollection::from_features([with_properties(json!({"location": "a", "x": 1}))]);
        let fields = propose_import_fields(&collection, "location");
        assert_eq!(names(&fields), ["Location_Orig", "x", "Location", "Cache"]);
    }
}
