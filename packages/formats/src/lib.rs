#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! File format adapters.
//!
//! Decoders turn an uploaded file (a zipped shapefile bundle or a
//! `GeoJSON` document) into a [`FeatureCollection`]; encoders turn a
//! collection back into `GeoJSON` or KML text. The decoders never touch
//! the record store, and the encoders never see records.

pub mod geojson_file;
pub mod kml;
pub mod shapefile_zip;

use std::path::Path;

use map_tools_features::FeatureCollection;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

pub use geojson_file::{decode_geojson, encode_geojson};
pub use kml::encode_kml;
pub use shapefile_zip::decode_shapefile_zip;

/// Errors from decoding or encoding files.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The document is not a `GeoJSON` feature collection.
    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    /// The archive is not a readable zipped shapefile bundle.
    #[error("Invalid shapefile: {0}")]
    InvalidShapefile(String),

    /// The file extension maps to no known decoder.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Reading the input file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Input file kinds, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum FileKind {
    /// Zipped shapefile bundle (`.zip`).
    Shapefile,
    /// `GeoJSON` document (`.geojson` or `.json`).
    GeoJson,
}

impl FileKind {
    /// Picks the decoder for `path` by its extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// * If the extension is missing or not one of `zip`, `geojson`, `json`
    pub fn from_path(path: &Path) -> Result<Self, FormatError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("zip") => Ok(Self::Shapefile),
            Some("geojson" | "json") => Ok(Self::GeoJson),
            _ => Err(FormatError::UnsupportedFileType(path.display().to_string())),
        }
    }
}

/// Output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// `GeoJSON` `FeatureCollection`.
    GeoJson,
    /// KML 2.2 document.
    Kml,
}

impl OutputFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::GeoJson => "geojson",
            Self::Kml => "kml",
        }
    }

    /// MIME type of the produced document.
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::GeoJson => "application/geo+json",
            Self::Kml => "application/vnd.google-earth.kml+xml",
        }
    }

    /// `<basename>.<extension>`.
    #[must_use]
    pub fn file_name(self, basename: &str) -> String {
        format!("{basename}.{}", self.extension())
    }

    /// Encodes `collection`. `document_name` becomes the KML document name
    /// and is ignored for `GeoJSON`.
    ///
    /// # Errors
    ///
    /// * If JSON serialization fails
    pub fn encode(
        self,
        collection: &FeatureCollection,
        document_name: &str,
    ) -> Result<String, FormatError> {
        match self {
            Self::GeoJson => encode_geojson(collection),
            Self::Kml => Ok(encode_kml(collection, document_name)),
        }
    }
}

/// Decodes raw file contents of the given kind.
///
/// # Errors
///
/// * If the contents are not a valid document of that kind
pub fn decode(kind: FileKind, bytes: &[u8]) -> Result<FeatureCollection, FormatError> {
    match kind {
        FileKind::Shapefile => decode_shapefile_zip(bytes),
        FileKind::GeoJson => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| FormatError::InvalidGeoJson(format!("not UTF-8: {e}")))?;
            decode_geojson(text)
        }
    }
}

/// Reads `path` and decodes it according to its extension.
///
/// # Errors
///
/// * If the extension is unsupported
/// * If the file cannot be read
/// * If the contents fail to decode
pub fn decode_file(path: &Path) -> Result<FeatureCollection, FormatError> {
    let kind = FileKind::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|e| FormatError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    log::info!(
        "Decoding {} ({kind}, {} bytes)",
        path.display(),
        bytes.len()
    );

    let collection = decode(kind, &bytes)?;

    log::info!(
        "Decoded {} features from {}",
        collection.len(),
        path.display()
    );

    Ok(collection)
}
