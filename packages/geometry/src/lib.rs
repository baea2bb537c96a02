#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry primitives for the map tools.
//!
//! * [`coordinate`] parses and formats the `"<lat>,<lon>"` text stored in
//!   `Location` columns.
//! * [`centroid`] reduces any geometry to a single representative point.
//! * [`distance`] computes great-circle distances between coordinates.
//! * [`links`] builds map URLs for a coordinate.

pub mod centroid;
pub mod coordinate;
pub mod distance;
pub mod links;

pub use centroid::{representative_point, representative_point_geojson};
pub use coordinate::{Coordinate, RangePolicy, format, parse, parse_with_policy};
pub use distance::haversine_distance;

use thiserror::Error;

/// A `Location` value that cannot be read as a coordinate.
///
/// Every variant is the same "malformed location" condition; callers that
/// map records to features absorb it and treat the record as unlocated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    /// The text did not split into exactly two comma-separated tokens.
    #[error("Malformed location {value:?}: expected 2 comma-separated values, found {tokens}")]
    Arity {
        /// The offending text.
        value: String,
        /// Number of tokens found.
        tokens: usize,
    },

    /// A token was not a finite number.
    #[error("Malformed location {value:?}: {token:?} is not a finite number")]
    Number {
        /// The offending text.
        value: String,
        /// The token that failed to parse.
        token: String,
    },

    /// The coordinate parsed but lies outside the valid degree ranges.
    #[error("Location out of range: latitude {latitude}, longitude {longitude}")]
    Range {
        /// Parsed latitude.
        latitude: f64,
        /// Parsed longitude.
        longitude: f64,
    },
}
