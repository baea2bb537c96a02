#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record and field types shared across the map tools.
//!
//! A [`Record`] is the tabular side of the pipeline: an opaque id, a
//! display name, and an ordered set of named values. Records are owned by
//! whatever store backs the tables; the rest of the workspace only borrows
//! them for the duration of a read or write.
//!
//! Reserved field names (`Location`, `Cache`, ...) and the rename policy
//! for colliding property keys live in [`schema`].

pub mod schema;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Opaque record identifier assigned by the store.
pub type RecordId = String;

/// Ordered field-name to value mapping used when creating or updating
/// records.
pub type RecordFields = serde_json::Map<String, serde_json::Value>;

/// A single row of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Store-assigned identifier.
    pub id: RecordId,
    /// Human-readable name (the text of the table's primary field).
    pub name: String,
    /// Field values in table order.
    pub fields: RecordFields,
}

impl Record {
    /// Creates a record from its parts.
    #[must_use]
    pub fn new(id: impl Into<RecordId>, name: impl Into<String>, fields: RecordFields) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fields,
        }
    }

    /// Returns the raw value stored under `name`, if the field is set.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    /// Builder-style setter, mostly useful for fixtures.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// Column type of a table field.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldKind {
    /// Single line of text. Every imported column uses this kind.
    Text,
    /// Free-form text spanning multiple lines.
    MultilineText,
    /// Numeric value.
    Number,
    /// Links to records of another table, stored as `[{"id": ...}]`.
    Link,
}

/// A column proposed for, or read back from, a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportField {
    /// Column name, unique within the table.
    pub name: String,
    /// Column type.
    pub kind: FieldKind,
}

impl ImportField {
    /// Shorthand for a [`FieldKind::Text`] column.
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
        }
    }
}
