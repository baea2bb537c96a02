//! Record ↔ feature mapping.

use geojson::{Feature, JsonObject};
use map_tools_geometry::{RangePolicy, format, representative_point_geojson};
use map_tools_records_models::schema::{LOCATION_FIELD, NAME_PROPERTY, column_name, is_reserved};
use map_tools_records_models::{Record, RecordFields};
use serde_json::Value;

use crate::FeatureCollection;
use crate::location::{location_field, location_text};

/// Which record columns are copied into feature properties.
///
/// The record's display name is always written as the `name` property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldSelector {
    /// Only the display name.
    #[default]
    NameOnly,
    /// Every column except the reserved ones.
    All,
    /// The listed columns (e.g. the visible columns of a view).
    Only(Vec<String>),
}

impl FieldSelector {
    fn includes(&self, column: &str) -> bool {
        match self {
            Self::NameOnly => false,
            Self::All => true,
            Self::Only(columns) => columns.iter().any(|c| c == column),
        }
    }
}

/// Builds a point feature from a record's location column.
///
/// Returns `None` when the record has no location column or its value
/// cannot be parsed; that is a normal, filterable condition. `Location`,
/// `Cache`, and whichever column the location was read from never appear
/// in the properties. JSON scalars keep their type; arrays and objects are
/// stored as JSON text.
#[must_use]
pub fn record_to_feature(
    record: &Record,
    selector: &FieldSelector,
    policy: RangePolicy,
) -> Option<Feature> {
    let (source_column, value) = location_field(record)?;
    let coord = match map_tools_geometry::parse_with_policy(location_text(value)?, policy) {
        Ok(coord) => coord,
        Err(e) => {
            log::debug!("Skipping record {:?} ({}): {e}", record.name, record.id);
            return None;
        }
    };

    let mut properties = JsonObject::new();
    properties.insert(NAME_PROPERTY.to_string(), Value::String(record.name.clone()));

    for (column, value) in &record.fields {
        if is_reserved(column) || column == source_column || !selector.includes(column) {
            continue;
        }
        properties.insert(column.clone(), property_value(value));
    }

    Some(Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::Point(
            coord.to_position(),
        ))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Maps every record to a feature slot, keeping one slot per record.
#[must_use]
pub fn records_to_collection(
    records: &[Record],
    selector: &FieldSelector,
    policy: RangePolicy,
) -> FeatureCollection {
    records
        .iter()
        .map(|record| record_to_feature(record, selector, policy))
        .collect()
}

/// Flattens a feature into text columns for a new record.
///
/// The `name_field` property comes first, then every other property in
/// order. Keys that collide with reserved columns are renamed by
/// [`column_name`]; when two keys end up with the same column name (e.g.
/// `Location` and `location`) the first one wins. Objects and arrays become JSON text, other scalars
/// their textual form; nulls and empty strings are left out. The
/// `Location` column holds the representative point of the geometry, or
/// an empty string when the geometry is missing or unreadable.
#[must_use]
pub fn feature_to_record_fields(feature: &Feature, name_field: &str) -> RecordFields {
    let mut fields = RecordFields::new();

    if let Some(properties) = &feature.properties {
        if let Some(value) = properties.get(name_field) {
            insert_column(&mut fields, name_field, value);
        }
        for (key, value) in properties {
            if key != name_field {
                insert_column(&mut fields, key, value);
            }
        }
    }

    let location = feature
        .geometry
        .as_ref()
        .and_then(representative_point_geojson)
        .map_or_else(String::new, |coord| format(&coord));
    fields.insert(LOCATION_FIELD.to_string(), Value::String(location));

    fields
}

fn insert_column(fields: &mut RecordFields, key: &str, value: &Value) {
    let Some(text) = column_text(value) else {
        return;
    };
    let column = column_name(key);
    if fields.contains_key(column.as_ref()) {
        log::warn!("Dropping property {key:?}: column {column:?} is already taken");
        return;
    }
    fields.insert(column.into_owned(), Value::String(text));
}

fn property_value(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}

fn column_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
