//! Reading a record's location column.
//!
//! The codec in `map_tools_geometry` only understands `"<lat>,<lon>"`
//! text. Values coming out of a table need one pre-processing step first:
//! lookup columns hold an array of the looked-up values, of which the
//! first is used.

use map_tools_geometry::{Coordinate, RangePolicy, parse_with_policy};
use map_tools_records_models::Record;
use map_tools_records_models::schema::{LOCATION_FIELD, LOCATION_FIELD_FALLBACK};

/// Finds the location column of `record`, trying `Location` before the
/// lowercase fallback. Returns the column name alongside its value.
#[must_use]
pub fn location_field(record: &Record) -> Option<(&'static str, &serde_json::Value)> {
    [LOCATION_FIELD, LOCATION_FIELD_FALLBACK]
        .into_iter()
        .find_map(|name| record.field(name).map(|value| (name, value)))
}

/// Extracts location text from a raw column value.
///
/// Plain strings are returned as-is. Arrays (lookup columns) yield their
/// first element when it is a string. Anything else has no location text.
#[must_use]
pub fn location_text(value: &serde_json::Value) -> Option<&str> {
    match value {
        serde_json::Value::String(s) => Some(s.as_str()),
        serde_json::Value::Array(items) => items.first().and_then(serde_json::Value::as_str),
        _ => None,
    }
}

/// Reads and parses the location of `record`.
///
/// Missing or malformed locations are a normal condition and yield
/// `None`; the reason is logged at debug level.
#[must_use]
pub fn record_location(record: &Record, policy: RangePolicy) -> Option<Coordinate> {
    let (_, value) = location_field(record)?;
    let text = location_text(value)?;

    match parse_with_policy(text, policy) {
        Ok(coord) => Some(coord),
        Err(e) => {
            log::debug!("Record {:?} ({}) has no usable location: {e}", record.name, record.id);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(fields: serde_json::Value) -> Record {
        let serde_json::Value::Object(fields) = fields else {
            panic!("fixture must be an object");
        };
        Record::new("rec1", "Test", fields)
    }

    #[test]
    fn prefers_capitalized_column() {
        let r = record(json!({"location": "1,1", "Location": "2,2"}));
        assert_eq!(location_field(&r).map(|(name, _)| name), Some("Location"));
        assert_eq!(record_location(&r, RangePolicy::Strict), Some(Coordinate::new(2.0, 2.0)));
    }

    #[test]
    fn falls_back_to_lowercase_column() {
        let r = record(json!({"location": "3,4"}));
        assert_eq!(record_location(&r, RangePolicy::Strict), Some(Coordinate::new(3.0, 4.0)));
    }

    #[test]
    fn lookup_arrays_use_first_element() {
        let r = record(json!({"Location": ["5,6", "7,8"]}));
        assert_eq!(record_location(&r, RangePolicy::Strict), Some(Coordinate::new(5.0, 6.0)));
        assert_eq!(location_text(&json!([])), None);
        assert_eq!(location_text(&json!([1, 2])), None);
    }

    #[test]
    fn malformed_values_are_absorbed() {
        for value in [json!("1,2,3"), json!("nope"), json!(""), json!(12), json!(null)] {
            let r = record(json!({ "Location": value }));
            assert!(record_location(&r, RangePolicy::Strict).is_none());
        }
        assert!(record_location(&record(json!({})), RangePolicy::Strict).is_none());
    }
}
