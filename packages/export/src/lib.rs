#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Table and record export.
//!
//! Reads records from a [`RecordStore`], turns every record with a usable
//! `Location` into a point feature and encodes the result as `GeoJSON` or
//! KML. Records without a location are left out of a table export; a
//! single-record export without one is an error.

use map_tools_features::location::record_location;
use map_tools_features::{FeatureCollection, FieldSelector, record_to_feature, records_to_collection};
use map_tools_formats::{FormatError, OutputFormat};
use map_tools_geometry::links::{geo_uri, google_maps_url, openstreetmap_url};
use map_tools_geometry::{Coordinate, RangePolicy};
use map_tools_records_models::RecordId;
use map_tools_records_models::schema::is_location_alias;
use map_tools_store::{RecordStore, StoreError};
use serde::Serialize;

/// Errors from exporting.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The table has no `Location` column.
    #[error("Table {0} has no Location field")]
    MissingLocationField(String),

    /// The record has no parseable location.
    #[error("Record {name:?} ({record_id}) has no usable location")]
    RecordWithoutLocation {
        /// Record id.
        record_id: RecordId,
        /// Record display name.
        name: String,
    },

    /// Reading from the store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Encoding the output failed.
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// An encoded document ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// `<basename>.<extension>`.
    pub file_name: String,
    /// Encoded document.
    pub content: String,
    /// MIME type of `content`.
    pub media_type: &'static str,
    /// Number of features written.
    pub features: usize,
}

/// Links that open a record's location in a map app.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapLinks {
    /// Record display name.
    pub name: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// `OpenStreetMap` web map.
    pub openstreetmap: String,
    /// Google Maps web map.
    pub google_maps: String,
    /// `geo:` URI.
    pub geo_uri: String,
}

impl MapLinks {
    fn new(name: String, coord: &Coordinate) -> Self {
        Self {
            name,
            latitude: coord.latitude,
            longitude: coord.longitude,
            openstreetmap: openstreetmap_url(coord),
            google_maps: google_maps_url(coord),
            geo_uri: geo_uri(coord),
        }
    }
}

/// Exports every located record of `table`.
///
/// `selector` picks the columns copied into feature properties besides
/// `name`. The file is named after the table.
///
/// # Errors
///
/// * [`ExportError::MissingLocationField`] if the table has no location column
/// * If the table cannot be read
/// * If encoding fails
pub async fn export_table(
    store: &dyn RecordStore,
    table: &str,
    format: OutputFormat,
    selector: &FieldSelector,
    policy: RangePolicy,
) -> Result<ExportFile, ExportError> {
    let fields = store.table_fields(table).await?;
    if !fields.iter().any(|f| is_location_alias(&f.name)) {
        return Err(ExportError::MissingLocationField(table.to_string()));
    }

    let records = store.records(table).await?;
    let collection = records_to_collection(&records, selector, policy);
    log::info!(
        "Exporting {} of {} records from {table} as {format}",
        collection.located_count(),
        records.len()
    );

    encode(&collection, format, table)
}

/// Exports a single record with only its name as a property.
///
/// # Errors
///
/// * [`ExportError::RecordWithoutLocation`] if the record has no usable location
/// * If the record cannot be read
/// * If encoding fails
pub async fn export_record(
    store: &dyn RecordStore,
    table: &str,
    record_id: &str,
    format: OutputFormat,
    policy: RangePolicy,
) -> Result<ExportFile, ExportError> {
    let record = store.record(table, record_id).await?;
    let feature = record_to_feature(&record, &FieldSelector::NameOnly, policy).ok_or_else(|| {
        ExportError::RecordWithoutLocation {
            record_id: record.id.clone(),
            name: record.name.clone(),
        }
    })?;

    let basename = if record.name.trim().is_empty() {
        record.id.as_str()
    } else {
        record.name.as_str()
    };
    encode(&FeatureCollection::from_features([feature]), format, basename)
}

/// Map links for one record's location.
///
/// # Errors
///
/// * [`ExportError::RecordWithoutLocation`] if the record has no usable location
/// * If the record cannot be read
pub async fn record_links(
    store: &dyn RecordStore,
    table: &str,
    record_id: &str,
    policy: RangePolicy,
) -> Result<MapLinks, ExportError> {
    let record = store.record(table, record_id).await?;
    let Some(coord) = record_location(&record, policy) else {
        return Err(ExportError::RecordWithoutLocation {
            record_id: record.id,
            name: record.name,
        });
    };
    Ok(MapLinks::new(record.name, &coord))
}

fn encode(
    collection: &FeatureCollection,
    format: OutputFormat,
    name: &str,
) -> Result<ExportFile, ExportError> {
    let content = format.encode(collection, name)?;
    Ok(ExportFile {
        file_name: format.file_name(&sanitize_file_name(name)),
        content,
        media_type: format.media_type(),
        features: collection.located_count(),
    })
}

/// Turns a table or record name into a safe file basename.
///
/// Path separators and other characters that are unsafe in file names
/// become `_`. Falls back to `export` when nothing usable remains.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').trim();

    if cleaned.is_empty() {
        "export".to_string()
    } else {
        cleaned.to_string()
    }
}
