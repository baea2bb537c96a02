#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Nearest-neighbor spatial join between two tables.
//!
//! For every record of the target table, the closest record of the input
//! table (by great-circle distance between their `Location` values) is
//! written into a link field of the target record. Targets are processed
//! one per [`NearestRun::next`] call and the run stops at the first
//! failure.

pub mod nearest;

use map_tools_geometry::RangePolicy;
use map_tools_records_models::{FieldKind, ImportField, RecordFields, RecordId};
use map_tools_store::{ProgressCallback, RecordStore, StoreError, WriteOperation};
use serde_json::json;

pub use nearest::{Candidate, MatchResult, NearestMatch, NearestMatcher};

/// Errors that abort a nearest-neighbor run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// No input record has a usable location.
    #[error("No nearest record found for {target_name:?} ({target_id})")]
    NoMatchFound {
        /// Target record id.
        target_id: RecordId,
        /// Target display name.
        target_name: String,
    },

    /// The store refused a write.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Writing a match back to a target failed.
    #[error("Updating {target_name:?} ({target_id}) failed: {source}")]
    WriteFailure {
        /// Target record id.
        target_id: RecordId,
        /// Target display name.
        target_name: String,
        /// Underlying store error.
        source: StoreError,
    },

    /// The link field does not exist on the target table.
    #[error("Table {table} has no field {field}")]
    UnknownField {
        /// Target table.
        table: String,
        /// Missing field.
        field: String,
    },

    /// Reading the tables failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parameters of a nearest-neighbor run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearestRequest {
    /// Table whose records receive a link.
    pub target_table: String,
    /// Table searched for the nearest record.
    pub input_table: String,
    /// Field of the target table that receives the link.
    pub link_field: String,
    /// Create `link_field` as a link field when the table lacks it.
    pub create_link_field: bool,
}

/// Totals of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NearestSummary {
    /// Targets that received a link.
    pub matched: usize,
    /// Targets without a location.
    pub skipped: usize,
}

/// Link-field value pointing at `record_id`.
#[must_use]
pub fn link_value(record_id: &str) -> serde_json::Value {
    json!([{ "id": record_id }])
}

/// Matches and writes back one target per [`next`] call.
///
/// [`next`]: NearestRun::next
pub struct NearestRun<'a> {
    store: &'a dyn RecordStore,
    table: String,
    link_field: String,
    matcher: NearestMatcher,
    targets: std::vec::IntoIter<Candidate>,
    total: usize,
    summary: NearestSummary,
    failed: bool,
}

impl<'a> NearestRun<'a> {
    /// Prepares a run that links each of `targets` (records of `table`)
    /// through `link_field`.
    #[must_use]
    pub fn new(
        store: &'a dyn RecordStore,
        table: &str,
        link_field: &str,
        matcher: NearestMatcher,
        targets: Vec<Candidate>,
    ) -> Self {
        Self {
            store,
            table: table.to_string(),
            link_field: link_field.to_string(),
            matcher,
            total: targets.len(),
            targets: targets.into_iter(),
            summary: NearestSummary::default(),
            failed: false,
        }
    }

    /// Number of target records.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Totals so far.
    #[must_use]
    pub const fn summary(&self) -> NearestSummary {
        self.summary
    }

    /// Processes the next target. Returns `None` when every target has
    /// been processed or after a failure.
    pub async fn next(&mut self) -> Option<Result<MatchResult, AnalysisError>> {
        if self.failed {
            return None;
        }
        let target = self.targets.next()?;

        let result = self.process(&target).await;
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }

    async fn process(&mut self, target: &Candidate) -> Result<MatchResult, AnalysisError> {
        let result = self.matcher.match_target(target)?;

        let Some(matched) = &result.matched else {
            self.summary.skipped += 1;
            return Ok(result);
        };

        let operation = WriteOperation::UpdateRecord {
            table: self.table.clone(),
            record_id: target.record_id.clone(),
            fields: vec![self.link_field.clone()],
        };
        if !self.store.check_permission(&operation).await {
            return Err(AnalysisError::PermissionDenied(operation.to_string()));
        }

        let mut fields = RecordFields::new();
        fields.insert(self.link_field.clone(), link_value(&matched.input_id));

        self.store
            .update_record(&self.table, &target.record_id, fields)
            .await
            .map_err(|source| AnalysisError::WriteFailure {
                target_id: target.record_id.clone(),
                target_name: target.name.clone(),
                source,
            })?;

        log::debug!(
            "{:?} -> {:?} ({:.0} m)",
            result.target_name,
            matched.input_name,
            matched.distance_m
        );
        self.summary.matched += 1;
        Ok(result)
    }
}

/// Links every record of `request.target_table` to its nearest record
/// in `request.input_table`.
///
/// # Errors
///
/// * If either table cannot be read
/// * If the link field is missing and `create_link_field` is not set
/// * If the store denies a write
/// * If a located target has no candidate, or writing it back fails
pub async fn run_nearest(
    store: &dyn RecordStore,
    request: &NearestRequest,
    policy: RangePolicy,
    progress: &dyn ProgressCallback,
) -> Result<NearestSummary, AnalysisError> {
    ensure_link_field(store, request).await?;

    let inputs: Vec<Candidate> = store
        .records(&request.input_table)
        .await?
        .iter()
        .map(|r| Candidate::from_record(r, policy))
        .collect();
    let targets: Vec<Candidate> = store
        .records(&request.target_table)
        .await?
        .iter()
        .map(|r| Candidate::from_record(r, policy))
        .collect();

    let matcher = if request.target_table == request.input_table {
        NearestMatcher::same_table(inputs)
    } else {
        NearestMatcher::new(inputs)
    };
    log::info!(
        "Matching {} targets in {} against {} located inputs in {}",
        targets.len(),
        request.target_table,
        matcher.located_inputs().count(),
        request.input_table
    );

    let mut run = NearestRun::new(
        store,
        &request.target_table,
        &request.link_field,
        matcher,
        targets,
    );
    progress.set_total(run.total() as u64);
    progress.set_message(format!("Linking {}", request.target_table));

    while let Some(step) = run.next().await {
        if let Err(e) = step {
            progress.finish(format!("Linking {} failed", request.target_table));
            return Err(e);
        }
        progress.inc(1);
    }

    let summary = run.summary();
    progress.finish(format!(
        "Linked {} records ({} without location)",
        summary.matched, summary.skipped
    ));
    Ok(summary)
}

async fn ensure_link_field(
    store: &dyn RecordStore,
    request: &NearestRequest,
) -> Result<(), AnalysisError> {
    let fields = store.table_fields(&request.target_table).await?;
    if fields.iter().any(|f| f.name == request.link_field) {
        return Ok(());
    }

    if !request.create_link_field {
        return Err(AnalysisError::UnknownField {
            table: request.target_table.clone(),
            field: request.link_field.clone(),
        });
    }

    let field = ImportField {
        name: request.link_field.clone(),
        kind: FieldKind::Link,
    };
    let operation = WriteOperation::CreateField {
        table: request.target_table.clone(),
        field: field.clone(),
    };
    if !store.check_permission(&operation).await {
        return Err(AnalysisError::PermissionDenied(operation.to_string()));
    }
    store.create_field(&request.target_table, &field).await?;
    Ok(())
}
