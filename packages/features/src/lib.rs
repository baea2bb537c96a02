#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Conversion between table records and `GeoJSON` features.
//!
//! The decode direction ([`mapper::feature_to_record_fields`]) turns file
//! features into flat text columns plus a `Location` column; the encode
//! direction ([`mapper::record_to_feature`]) reads the `Location` column
//! back into a point feature. [`schema`] proposes the columns of a table
//! created from a feature collection.

pub mod location;
pub mod mapper;
pub mod schema;

pub use geojson::Feature;
pub use mapper::{FieldSelector, feature_to_record_fields, record_to_feature, records_to_collection};

/// Ordered sequence of features where `None` marks an entry without a
/// usable location.
///
/// Slots are never compacted, so position `i` always corresponds to the
/// `i`-th source record or file feature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    features: Vec<Option<Feature>>,
}

impl FeatureCollection {
    /// Wraps an ordered list of slots.
    #[must_use]
    pub const fn new(features: Vec<Option<Feature>>) -> Self {
        Self { features }
    }

    /// Builds a collection where every slot is populated.
    #[must_use]
    pub fn from_features(features: impl IntoIterator<Item = Feature>) -> Self {
        features.into_iter().map(Some).collect()
    }

    /// Number of slots, including empty ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether there are no slots at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of populated slots.
    #[must_use]
    pub fn located_count(&self) -> usize {
        self.features.iter().flatten().count()
    }

    /// All slots in order.
    #[must_use]
    pub fn slots(&self) -> &[Option<Feature>] {
        &self.features
    }

    /// Consumes the collection, returning its slots.
    #[must_use]
    pub fn into_slots(self) -> Vec<Option<Feature>> {
        self.features
    }

    /// Iterates over populated slots only.
    pub fn located(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().flatten()
    }

    /// Appends every slot of `other`.
    pub fn extend(&mut self, other: Self) {
        self.features.extend(other.features);
    }

    /// Standard `GeoJSON` collection with empty slots dropped.
    #[must_use]
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        geojson::FeatureCollection {
            bbox: None,
            features: self.located().cloned().collect(),
            foreign_members: None,
        }
    }
}

impl FromIterator<Option<Feature>> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Option<Feature>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
