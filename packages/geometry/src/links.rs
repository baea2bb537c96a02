//! Map links for a single coordinate.

use crate::Coordinate;

/// Zoom level used for the web map links.
pub const DEFAULT_ZOOM: u8 = 12;

/// `OpenStreetMap` URL centred on `coord`.
#[must_use]
pub fn openstreetmap_url(coord: &Coordinate) -> String {
    format!(
        "https://www.openstreetmap.org/#map={DEFAULT_ZOOM}/{}/{}",
        coord.latitude, coord.longitude
    )
}

/// Google Maps URL centred on `coord`.
#[must_use]
pub fn google_maps_url(coord: &Coordinate) -> String {
    format!(
        "https://www.google.com/maps/@{},{},{DEFAULT_ZOOM}z",
        coord.latitude, coord.longitude
    )
}

/// RFC 5870 `geo:` URI, which phone map apps open directly.
#[must_use]
pub fn geo_uri(coord: &Coordinate) -> String {
    format!("geo:{},{}", coord.latitude, coord.longitude)
}
