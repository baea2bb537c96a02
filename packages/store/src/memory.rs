//! In-memory [`RecordStore`] with optional JSON file persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use map_tools_records_models::{ImportField, Record, RecordFields, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{RecordStore, StoreError, WriteOperation};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Table {
    fields: Vec<ImportField>,
    records: Vec<Record>,
}

impl Table {
    fn check_fields(&self, table: &str, fields: &RecordFields) -> Result<(), StoreError> {
        match fields
            .keys()
            .find(|key| !self.fields.iter().any(|f| &f.name == *key))
        {
            Some(field) => Err(StoreError::UnknownField {
                table: table.to_string(),
                field: field.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Display name of a record: the text of the table's first field.
    fn display_name(&self, fields: &RecordFields) -> String {
        self.fields
            .first()
            .and_then(|primary| fields.get(&primary.name))
            .map_or_else(String::new, |value| match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
    }
}

/// Tables held in memory.
///
/// When opened from a path, the whole store is rewritten to that file
/// after every successful write, so a batch that returned `Ok` survives a
/// later failure.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, Table>>,
    path: Option<PathBuf>,
    read_only: bool,
}

impl MemoryStore {
    /// Creates an empty, unpersisted store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the store persisted at `path`. A missing file is an empty
    /// store that will be created on the first write.
    ///
    /// # Errors
    ///
    /// * If the file exists but cannot be read
    /// * If the file is not a valid store document
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let tables = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No store at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            tables: RwLock::new(tables),
            path: Some(path),
            read_only: false,
        })
    }

    /// Denies every write permission when `read_only` is set.
    #[must_use]
    pub const fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, tables: &BTreeMap<String, Table>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(tables)?;
        tokio::fs::write(path, json).await?;

        log::debug!("Saved store to {}", path.display());
        Ok(())
    }
}

fn missing_table(table: &str) -> StoreError {
    StoreError::TableNotFound(table.to_string())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn table_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.tables.read().await.keys().cloned().collect())
    }

    async fn table_fields(&self, table: &str) -> Result<Vec<ImportField>, StoreError> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.fields.clone())
            .ok_or_else(|| missing_table(table))
    }

    async fn records(&self, table: &str) -> Result<Vec<Record>, StoreError> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.records.clone())
            .ok_or_else(|| missing_table(table))
    }

    async fn record(&self, table: &str, record_id: &str) -> Result<Record, StoreError> {
        let tables = self.tables.read().await;
        let t = tables.get(table).ok_or_else(|| missing_table(table))?;
        t.records
            .iter()
            .find(|r| r.id == record_id)
            .cloned()
            .ok_or_else(|| StoreError::RecordNotFound {
                table: table.to_string(),
                record_id: record_id.to_string(),
            })
    }

    async fn create_table(&self, table: &str, fields: &[ImportField]) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(table) {
            return Err(StoreError::TableExists(table.to_string()));
        }
        tables.insert(
            table.to_string(),
            Table {
                fields: fields.to_vec(),
                records: Vec::new(),
            },
        );
        log::info!("Created table {table} with {} fields", fields.len());
        self.persist(&tables).await
    }

    async fn create_field(&self, table: &str, field: &ImportField) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let t = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        if t.fields.iter().any(|f| f.name == field.name) {
            return Err(StoreError::FieldExists {
                table: table.to_string(),
                field: field.name.clone(),
            });
        }
        t.fields.push(field.clone());
        log::info!("Created field {} ({}) in {table}", field.name, field.kind);
        self.persist(&tables).await
    }

    async fn create_records(
        &self,
        table: &str,
        records: Vec<RecordFields>,
    ) -> Result<Vec<RecordId>, StoreError> {
        let mut tables = self.tables.write().await;
        let t = tables.get_mut(table).ok_or_else(|| missing_table(table))?;

        for fields in &records {
            t.check_fields(table, fields)?;
        }

        let mut ids = Vec::with_capacity(records.len());
        for fields in records {
            let id = format!("rec{}", uuid::Uuid::new_v4().simple());
            let name = t.display_name(&fields);
            t.records.push(Record::new(id.clone(), name, fields));
            ids.push(id);
        }

        self.persist(&tables).await?;
        Ok(ids)
    }

    async fn update_record(
        &self,
        table: &str,
        record_id: &str,
        fields: RecordFields,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let t = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        t.check_fields(table, &fields)?;

        let index = t
            .records
            .iter()
            .position(|r| r.id == record_id)
            .ok_or_else(|| StoreError::RecordNotFound {
                table: table.to_string(),
                record_id: record_id.to_string(),
            })?;

        let mut merged = t.records[index].fields.clone();
        merged.extend(fields);
        let name = t.display_name(&merged);

        let record = &mut t.records[index];
        record.fields = merged;
        record.name = name;

        self.persist(&tables).await
    }

    async fn check_permission(&self, operation: &WriteOperation) -> bool {
        if self.read_only {
            log::debug!("Denied in read-only store: {operation}");
        }
        !self.read_only
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> RecordFields {
        let Value::Object(map) = value else {
            panic!("fixture must be an object");
        };
        map
    }

    async fn stores_table(store: &MemoryStore) {
        store
            .create_table(
                "Stores",
                &[ImportField::text("Name"), ImportField::text("Location")],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn created_records_get_ids_and_names() {
        let store = MemoryStore::new();
        stores_table(&store).await;

        let ids = store
            .create_records(
                "Stores",
                vec![
                    fields(json!({"Name": "North", "Location": "1,2"})),
                    fields(json!({"Location": "3,4"})),
                ],
            )
            .await
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|id| id.starts_with("rec") && id.len() == 35));
        assert_ne!(ids[0], ids[1]);

        let records = store.records("Stores").await.unwrap();
        assert_eq!(records[0].name, "North");
        assert_eq!(records[1].name, "");
        assert_eq!(records[1].id, ids[1]);
    }

    #[tokio::test]
    async fn unknown_field_rejects_whole_batch() {
        let store = MemoryStore::new();
        stores_table(&store).await;

        let err = store
            .create_records(
                "Stores",
                vec![fields(json!({"Name": "ok"})), fields(json!({"Bogus": "x"}))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownField { ref field, .. } if field == "Bogus"));
        assert!(store.records("Stores").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryStore::new();
        stores_table(&store).await;
        store
            .create_field("Stores", &ImportField::text("Nearest"))
            .await
            .unwrap();
        let ids = store
            .create_records("Stores", vec![fields(json!({"Name": "A", "Location": "1,1"}))])
            .await
            .unwrap();

        store
            .update_record("Stores", &ids[0], fields(json!({"Nearest": [{"id": "recX"}]})))
            .await
            .unwrap();

        let record = store.record("Stores", &ids[0]).await.unwrap();
        assert_eq!(record.field("Location"), Some(&json!("1,1")));
        assert_eq!(record.field("Nearest"), Some(&json!([{"id": "recX"}])));

        assert!(matches!(
            store.update_record("Stores", "recNope", RecordFields::new()).await,
            Err(StoreError::RecordNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_table_and_field_are_errors() {
        let store = MemoryStore::new();
        stores_table(&store).await;
        assert!(matches!(
            store.create_table("Stores", &[]).await,
            Err(StoreError::TableExists(_))
        ));
        assert!(matches!(
            store.create_field("Stores", &ImportField::text("Name")).await,
            Err(StoreError::FieldExists { .. })
        ));
        assert!(matches!(
            store.records("Nope").await,
            Err(StoreError::TableNotFound(_))
        ));
    }

    #[tokio::test]
    async fn read_only_denies_writes() {
        let store = MemoryStore::new().with_read_only(true);
        let op = WriteOperation::CreateRecords {
            table: "Stores".to_string(),
            count: 1,
        };
        assert!(!store.check_permission(&op).await);
        assert!(MemoryStore::new().check_permission(&op).await);
    }

    #[tokio::test]
    async fn writes_are_persisted_and_reopened() {
        let tmp = std::env::temp_dir().join("map_tools_store_persist_test");
        let _ = std::fs::remove_dir_all(&tmp);
        let path = tmp.join("store.json");

        let store = MemoryStore::open(&path).await.unwrap();
        stores_table(&store).await;
        let ids = store
            .create_records("Stores", vec![fields(json!({"Name": "Kept"}))])
            .await
            .unwrap();
        drop(store);

        let reopened = MemoryStore::open(&path).await.unwrap();
        assert_eq!(reopened.table_names().await.unwrap(), ["Stores"]);
        let record = reopened.record("Stores", &ids[0]).await.unwrap();
        assert_eq!(record.name, "Kept");
        assert_eq!(
            reopened.table_fields("Stores").await.unwrap(),
            [ImportField::text("Name"), ImportField::text("Location")]
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn corrupt_file_is_json_error() {
        let tmp = std::env::temp_dir().join("map_tools_store_corrupt_test");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(MemoryStore::open(&path).await, Err(StoreError::Json(_))));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
