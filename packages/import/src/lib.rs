#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Bulk import of a decoded feature collection into a new table.
//!
//! The collection is split into fixed-size chunks ([`planner::plan`]) and
//! written one `create_records` call at a time
//! ([`sequential::SequentialImport`]). Writes are never concurrent and the
//! first failure aborts the run without rolling back earlier chunks.

pub mod planner;
pub mod sequential;

use std::path::Path;

use map_tools_features::FeatureCollection;
use map_tools_features::schema::{property_keys, propose_import_fields};
use map_tools_records_models::RecordId;
use map_tools_store::{ProgressCallback, RecordStore, StoreError, WriteOperation};

pub use planner::{ChunkProgress, DEFAULT_CHUNK_SIZE, plan};
pub use sequential::SequentialImport;

/// Errors that abort an import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The file decoded to zero features.
    #[error("The file contains no features")]
    EmptyCollection,

    /// The chosen name field is not a property of any feature.
    #[error("Unknown name field {name:?}; available: {}", .available.join(", "))]
    UnknownNameField {
        /// Requested field.
        name: String,
        /// Property keys that could be used instead.
        available: Vec<String>,
    },

    /// The store refused a write.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A chunk could not be written. Earlier chunks remain in the store.
    #[error("Writing chunk {chunk} of {total} failed: {source}")]
    WriteFailure {
        /// 1-based index of the failed chunk.
        chunk: usize,
        /// Number of chunks in the run.
        total: usize,
        /// Underlying store error.
        source: StoreError,
    },

    /// Any other store error (e.g. the table already exists).
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parameters of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// Name of the table to create.
    pub table_name: String,
    /// Property whose value becomes the record name (first column).
    pub name_field: String,
    /// Slots per `create_records` call.
    pub chunk_size: usize,
}

impl ImportRequest {
    /// Request with the default chunk size.
    #[must_use]
    pub fn new(table_name: impl Into<String>, name_field: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            name_field: name_field.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Outcome of a completed import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Table that was written.
    pub table: String,
    /// Ids of the created records, in collection order.
    pub record_ids: Vec<RecordId>,
    /// Empty slots that were not written.
    pub skipped: usize,
    /// Chunks written.
    pub chunks: usize,
}

/// Table name used when none is given: the file stem.
#[must_use]
pub fn default_table_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map_or_else(|| "Imported features".to_string(), str::to_string)
}

/// Creates `request.table_name` from `collection` and imports every
/// feature.
///
/// # Errors
///
/// * If the collection is empty
/// * If the name field is not a property of any feature
/// * If the store denies creating the table or the records
/// * If creating the table or writing a chunk fails
pub async fn import_features(
    store: &dyn RecordStore,
    request: &ImportRequest,
    collection: FeatureCollection,
    progress: &dyn ProgressCallback,
) -> Result<ImportSummary, ImportError> {
    if collection.located_count() == 0 {
        return Err(ImportError::EmptyCollection);
    }

    let available = property_keys(&collection);
    if !available.contains(&request.name_field) {
        return Err(ImportError::UnknownNameField {
            name: request.name_field.clone(),
            available,
        });
    }

    let fields = propose_import_fields(&collection, &request.name_field);
    let operation = WriteOperation::CreateTable {
        table: request.table_name.clone(),
        fields: fields.clone(),
    };
    if !store.check_permission(&operation).await {
        return Err(ImportError::PermissionDenied(operation.to_string()));
    }
    store.create_table(&request.table_name, &fields).await?;

    log::info!(
        "Importing {} features into {} ({} fields, chunks of {})",
        collection.len(),
        request.table_name,
        fields.len(),
        request.chunk_size.max(1)
    );

    SequentialImport::new(
        store,
        &request.table_name,
        &request.name_field,
        collection,
        request.chunk_size,
    )
    .run(progress)
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use map_tools_features::Feature;
    use map_tools_records_models::{ImportField, Record, RecordFields};
    use map_tools_store::{MemoryStore, NullProgress};
    use serde_json::json;

    use super::*;

    /// Delegates to a [`MemoryStore`], failing the `fail_on`-th
    /// `create_records` call and denying operations named in `deny`.
    struct FlakyStore {
        inner: MemoryStore,
        fail_on: Option<usize>,
        deny: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_on: None,
                deny: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RecordStore for FlakyStore {
        async fn table_names(&self) -> Result<Vec<String>, StoreError> {
            self.inner.table_names().await
        }
        async fn table_fields(&self, table: &str) -> Result<Vec<ImportField>, StoreError> {
            self.inner.table_fields(table).await
        }
        async fn records(&self, table: &str) -> Result<Vec<Record>, StoreError> {
            self.inner.records(table).await
        }
        async fn record(&self, table: &str, record_id: &str) -> Result<Record, StoreError> {
            self.inner.record(table, record_id).await
        }
        async fn create_table(&self, table: &str, fields: &[ImportField]) -> Result<(), StoreError> {
            self.inner.create_table(table, fields).await
        }
        async fn create_field(&self, table: &str, field: &ImportField) -> Result<(), StoreError> {
            self.inner.create_field(table, field).await
        }
        async fn create_records(
            &self,
            table: &str,
            records: Vec<RecordFields>,
        ) -> Result<Vec<RecordId>, StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(call) {
                return Err(StoreError::Io(std::io::Error::other("rate limited")));
            }
            self.inner.create_records(table, records).await
        }
        async fn update_record(
            &self,
            table: &str,
            record_id: &str,
            fields: RecordFields,
        ) -> Result<(), StoreError> {
            self.inner.update_record(table, record_id, fields).await
        }
        async fn check_permission(&self, operation: &WriteOperation) -> bool {
            let name: &str = operation.as_ref();
            self.deny != Some(name)
        }
    }

    fn point_feature(i: usize) -> Feature {
        #[allow(clippy::cast_precision_loss)]
        let lon = i as f64 / 10.0;
        Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::Point(vec![lon, 1.0]))),
            id: None,
            properties: json!({"title": format!("site {i}"), "idx": i})
                .as_object()
                .cloned(),
            foreign_members: None,
        }
    }

    fn sites(n: usize) -> FeatureCollection {
        FeatureCollection::from_features((0..n).map(point_feature))
    }

    #[tokio::test]
    async fn imports_in_three_sequential_chunks() {
        let store = FlakyStore::new();
        let request = ImportRequest::new("Sites", "title");

        let summary = import_features(&store, &request, sites(120), &NullProgress)
            .await
            .unwrap();

        assert_eq!(summary.chunks, 3);
        assert_eq!(summary.record_ids.len(), 120);
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);

        let records = store.records("Sites").await.unwrap();
        assert_eq!(records[0].name, "site 0");
        assert_eq!(records[119].name, "site 119");
        assert_eq!(records[1].field("Location"), Some(&json!("1,0.1")));

        let fields: Vec<String> = store
            .table_fields("Sites")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(fields, ["title", "idx", "Location", "Cache"]);
    }

    #[tokio::test]
    async fn step_progress_reports_fractions() {
        let store = MemoryStore::new();
        store
            .create_table("Sites", &propose_import_fields(&sites(1), "title"))
            .await
            .unwrap();

        let mut import = SequentialImport::new(&store, "Sites", "title", sites(120), 50);
        let mut fractions = Vec::new();
        while let Some(step) = import.next_chunk().await {
            fractions.push(step.unwrap().fraction());
        }
        assert_eq!(fractions.len(), 3);
        assert!((fractions[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((fractions[2] - 1.0).abs() < 1e-12);
        assert!(import.progress().is_complete());
    }

    #[tokio::test]
    async fn failure_aborts_without_rollback() {
        let mut store = FlakyStore::new();
        store.fail_on = Some(2);
        let request = ImportRequest::new("Sites", "title");

        let err = import_features(&store, &request, sites(120), &NullProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::WriteFailure { chunk: 2, total: 3, .. }));

        assert_eq!(store.records("Sites").await.unwrap().len(), 50);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_run_yields_no_more_steps() {
        let mut store = FlakyStore::new();
        store.fail_on = Some(1);
        store
            .create_table("Sites", &propose_import_fields(&sites(1), "title"))
            .await
            .unwrap();

        let mut import = SequentialImport::new(&store, "Sites", "title", sites(60), 50);
        assert!(matches!(import.next_chunk().await, Some(Err(_))));
        assert!(import.next_chunk().await.is_none());
        assert_eq!(import.into_summary().chunks, 0);
    }

    #[tokio::test]
    async fn denied_table_creation_writes_nothing() {
        let mut store = FlakyStore::new();
        store.deny = Some("CreateTable");
        let request = ImportRequest::new("Sites", "title");

        let err = import_features(&store, &request, sites(3), &NullProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::PermissionDenied(_)));
        assert!(store.table_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn denied_record_creation_is_permission_error() {
        let mut store = FlakyStore::new();
        store.deny = Some("CreateRecords");
        let request = ImportRequest::new("Sites", "title");

        let err = import_features(&store, &request, sites(3), &NullProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::PermissionDenied(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_slots_are_counted_not_written() {
        let store = MemoryStore::new();
        let mut collection = sites(2);
        collection.extend(FeatureCollection::new(vec![None]));
        let request = ImportRequest::new("Sites", "title");

        let summary = import_features(&store, &request, collection, &NullProgress)
            .await
            .unwrap();
        assert_eq!(summary.record_ids.len(), 2);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn rejects_empty_collection_and_unknown_name_field() {
        let store = MemoryStore::new();

        let err = import_features(
            &store,
            &ImportRequest::new("T", "title"),
            FeatureCollection::default(),
            &NullProgress,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ImportError::EmptyCollection));

        let err = import_features(&store, &ImportRequest::new("T", "nope"), sites(2), &NullProgress)
            .await
            .unwrap_err();
        let ImportError::UnknownNameField { available, .. } = err else {
            panic!("expected UnknownNameField");
        };
        assert_eq!(available, ["title", "idx"]);
    }

    #[test]
    fn table_name_from_file_stem() {
        assert_eq!(default_table_name(Path::new("/tmp/parcels.zip")), "parcels");
        assert_eq!(default_table_name(Path::new("stores.geojson")), "stores");
        assert_eq!(default_table_name(Path::new("")), "Imported features");
    }
}
