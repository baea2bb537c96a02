#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Access to the tables that records are read from and written to.
//!
//! The import, export and analysis crates only talk to storage through
//! the [`RecordStore`] trait. Every write they make is preceded by a
//! [`RecordStore::check_permission`] call, so a store can veto writes
//! (e.g. a read-only session) without the callers knowing why.
//!
//! [`MemoryStore`] is the bundled implementation: tables in memory,
//! optionally persisted to a JSON file after every write.

pub mod memory;
pub mod progress;

use std::fmt;

use async_trait::async_trait;
use map_tools_records_models::{ImportField, Record, RecordFields, RecordId};
use strum_macros::AsRefStr;

pub use memory::MemoryStore;
pub use progress::{LogProgress, NullProgress, ProgressCallback, null_progress};

/// Errors reported by a record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No table with this name.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// A table with this name already exists.
    #[error("Table already exists: {0}")]
    TableExists(String),

    /// No record with this id in the table.
    #[error("Record {record_id} not found in table {table}")]
    RecordNotFound {
        /// Table that was searched.
        table: String,
        /// Id that was not found.
        record_id: RecordId,
    },

    /// The table has no field with this name.
    #[error("Unknown field {field} in table {table}")]
    UnknownField {
        /// Table that was written to.
        table: String,
        /// Offending field name.
        field: String,
    },

    /// A field with this name already exists in the table.
    #[error("Field {field} already exists in table {table}")]
    FieldExists {
        /// Table that was altered.
        table: String,
        /// Offending field name.
        field: String,
    },

    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A write the caller is about to make, passed to
/// [`RecordStore::check_permission`].
#[derive(Debug, Clone, PartialEq, Eq, AsRefStr)]
pub enum WriteOperation {
    /// Create `table` with the given fields.
    CreateTable {
        /// Name of the new table.
        table: String,
        /// Its fields.
        fields: Vec<ImportField>,
    },
    /// Add `field` to `table`.
    CreateField {
        /// Table to alter.
        table: String,
        /// The new field.
        field: ImportField,
    },
    /// Insert `count` records into `table`.
    CreateRecords {
        /// Destination table.
        table: String,
        /// Number of records in the batch.
        count: usize,
    },
    /// Overwrite `fields` of one record.
    UpdateRecord {
        /// Table holding the record.
        table: String,
        /// Record to update.
        record_id: RecordId,
        /// Names of the fields being written.
        fields: Vec<String>,
    },
}

impl WriteOperation {
    /// Table the operation writes to.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable { table, .. }
            | Self::CreateField { table, .. }
            | Self::CreateRecords { table, .. }
            | Self::UpdateRecord { table, .. } => table,
        }
    }
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable { table, .. } => write!(f, "create table {table}"),
            Self::CreateField { table, field } => {
                write!(f, "create field {} in {table}", field.name)
            }
            Self::CreateRecords { table, count } => {
                write!(f, "create {count} records in {table}")
            }
            Self::UpdateRecord {
                table, record_id, ..
            } => write!(f, "update record {record_id} in {table}"),
        }
    }
}

/// Table storage the pipelines read from and write to.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Names of all tables.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    async fn table_names(&self) -> Result<Vec<String>, StoreError>;

    /// Fields of `table`, in table order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotFound`] for an unknown table.
    async fn table_fields(&self, table: &str) -> Result<Vec<ImportField>, StoreError>;

    /// All records of `table`, in table order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotFound`] for an unknown table.
    async fn records(&self, table: &str) -> Result<Vec<Record>, StoreError>;

    /// A single record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the table or record does not exist.
    async fn record(&self, table: &str, record_id: &str) -> Result<Record, StoreError>;

    /// Creates an empty table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableExists`] if the name is taken.
    async fn create_table(&self, table: &str, fields: &[ImportField]) -> Result<(), StoreError>;

    /// Adds a field to an existing table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the table is unknown or the field exists.
    async fn create_field(&self, table: &str, field: &ImportField) -> Result<(), StoreError>;

    /// Inserts a batch of records, returning their ids in batch order.
    /// Returns only after the whole batch is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the table is unknown or a record names an
    /// unknown field; nothing from the batch is written in that case.
    async fn create_records(
        &self,
        table: &str,
        records: Vec<RecordFields>,
    ) -> Result<Vec<RecordId>, StoreError>;

    /// Overwrites the given fields of one record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the table, record, or a field is unknown.
    async fn update_record(
        &self,
        table: &str,
        record_id: &str,
        fields: RecordFields,
    ) -> Result<(), StoreError>;

    /// Whether `operation` is currently allowed.
    async fn check_permission(&self, operation: &WriteOperation) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_display_names_target() {
        let op = WriteOperation::UpdateRecord {
            table: "Stores".to_string(),
            record_id: "rec1".to_string(),
            fields: vec!["Nearest".to_string()],
        };
        assert_eq!(op.to_string(), "update record rec1 in Stores");
        assert_eq!(op.table(), "Stores");
        let kind: &str = op.as_ref();
        assert_eq!(kind, "UpdateRecord");

        let op = WriteOperation::CreateRecords {
            table: "Parcels".to_string(),
            count: 50,
        };
        assert_eq!(op.to_string(), "create 50 records in Parcels");
    }
}
