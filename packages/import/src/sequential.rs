//! Step-by-step chunk writer.

use map_tools_features::{Feature, FeatureCollection, feature_to_record_fields};
use map_tools_records_models::{RecordFields, RecordId};
use map_tools_store::{ProgressCallback, RecordStore, WriteOperation};

use crate::planner::{ChunkProgress, plan};
use crate::{ImportError, ImportSummary};

/// Writes a planned collection one chunk per [`next_chunk`] call.
///
/// Chunks are written strictly in order and never concurrently. The
/// first failure ends the run: chunks written before it stay in the
/// store, and every later call returns `None`. A caller that stops
/// calling [`next_chunk`] has cancelled the import after the last
/// completed chunk.
///
/// [`next_chunk`]: SequentialImport::next_chunk
pub struct SequentialImport<'a> {
    store: &'a dyn RecordStore,
    table: String,
    name_field: String,
    chunks: std::vec::IntoIter<Vec<Option<Feature>>>,
    progress: ChunkProgress,
    record_ids: Vec<RecordId>,
    skipped: usize,
    failed: bool,
}

impl<'a> SequentialImport<'a> {
    /// Plans `collection` into chunks of `chunk_size` slots bound for
    /// `table`. Empty slots take up room in a chunk but are not written.
    #[must_use]
    pub fn new(
        store: &'a dyn RecordStore,
        table: &str,
        name_field: &str,
        collection: FeatureCollection,
        chunk_size: usize,
    ) -> Self {
        let chunks = plan(collection.into_slots(), chunk_size);
        let total = chunks.len();

        Self {
            store,
            table: table.to_string(),
            name_field: name_field.to_string(),
            chunks: chunks.into_iter(),
            progress: ChunkProgress {
                completed: 0,
                total,
            },
            record_ids: Vec::new(),
            skipped: 0,
            failed: false,
        }
    }

    /// Progress so far.
    #[must_use]
    pub const fn progress(&self) -> ChunkProgress {
        self.progress
    }

    /// Writes the next chunk. Returns `None` once every chunk is written
    /// or after a failure.
    pub async fn next_chunk(&mut self) -> Option<Result<ChunkProgress, ImportError>> {
        if self.failed {
            return None;
        }
        let chunk = self.chunks.next()?;

        let result = self.write_chunk(chunk).await;
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }

    async fn write_chunk(&mut self, chunk: Vec<Option<Feature>>) -> Result<ChunkProgress, ImportError> {
        let slots = chunk.len();
        let rows: Vec<RecordFields> = chunk
            .iter()
            .flatten()
            .map(|feature| feature_to_record_fields(feature, &self.name_field))
            .collect();
        self.skipped += slots - rows.len();

        let number = self.progress.completed + 1;

        if !rows.is_empty() {
            let operation = WriteOperation::CreateRecords {
                table: self.table.clone(),
                count: rows.len(),
            };
            if !self.store.check_permission(&operation).await {
                return Err(ImportError::PermissionDenied(operation.to_string()));
            }

            let ids = self
                .store
                .create_records(&self.table, rows)
                .await
                .map_err(|source| ImportError::WriteFailure {
                    chunk: number,
                    total: self.progress.total,
                    source,
                })?;

            log::debug!(
                "Chunk {number}/{}: created {} records in {}",
                self.progress.total,
                ids.len(),
                self.table
            );
            self.record_ids.extend(ids);
        }

        self.progress.completed = number;
        Ok(self.progress)
    }

    /// Drives the import to completion, reporting each chunk.
    ///
    /// # Errors
    ///
    /// Returns the first chunk failure; earlier chunks stay written.
    pub async fn run(mut self, progress: &dyn ProgressCallback) -> Result<ImportSummary, ImportError> {
        progress.set_total(self.progress.total as u64);
        progress.set_message(format!("Importing into {}", self.table));

        while let Some(step) = self.next_chunk().await {
            let step = match step {
                Ok(step) => step,
                Err(e) => {
                    progress.finish(format!("Import into {} failed", self.table));
                    return Err(e);
                }
            };
            progress.set_position(step.completed as u64);
            progress.set_message(format!(
                "Importing into {} ({:.0}%)",
                self.table,
                step.fraction() * 100.0
            ));
        }

        let summary = self.into_summary();
        progress.finish(format!(
            "Imported {} records into {}",
            summary.record_ids.len(),
            summary.table
        ));
        Ok(summary)
    }

    /// What has been written so far.
    #[must_use]
    pub fn into_summary(self) -> ImportSummary {
        ImportSummary {
            table: self.table,
            record_ids: self.record_ids,
            skipped: self.skipped,
            chunks: self.progress.completed,
        }
    }
}
