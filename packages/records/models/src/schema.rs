//! Reserved field names and the rename policy for colliding keys.
//!
//! Tables produced by an import always end with a `Location` column
//! holding `"<lat>,<lon>"` text and an empty `Cache` column that the
//! downstream map visualization writes into. Property keys that would land
//! on either of those columns are renamed with [`RENAMED_SUFFIX`] instead
//! of being dropped.

use std::borrow::Cow;

/// Column holding the `"<lat>,<lon>"` location text.
pub const LOCATION_FIELD: &str = "Location";

/// Lowercase spelling accepted as a fallback when reading locations.
pub const LOCATION_FIELD_FALLBACK: &str = "location";

/// Column reserved for the map visualization's geocode cache.
pub const CACHE_FIELD: &str = "Cache";

/// Suffix appended to property keys that collide with a reserved column.
pub const RENAMED_SUFFIX: &str = "_Orig";

/// Where a collided `Location`/`location` property ends up.
pub const RENAMED_LOCATION_FIELD: &str = "Location_Orig";

/// Property key carrying a record's display name in exported features.
pub const NAME_PROPERTY: &str = "name";

/// Whether `name` is one of the spellings of the location column.
#[must_use]
pub fn is_location_alias(name: &str) -> bool {
    name == LOCATION_FIELD || name == LOCATION_FIELD_FALLBACK
}

/// Whether `name` is a column the pipeline owns and never copies into
/// feature properties.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    name == LOCATION_FIELD || name == CACHE_FIELD
}

/// Maps a feature property key to the column it is stored under.
///
/// Both spellings of the location column collapse onto
/// [`RENAMED_LOCATION_FIELD`]; `Cache` becomes `Cache_Orig`. Everything
/// else is returned unchanged.
#[must_use]
pub fn column_name(key: &str) -> Cow<'_, str> {
    if is_location_alias(key) {
        Cow::Borrowed(RENAMED_LOCATION_FIELD)
    } else if key == CACHE_FIELD {
        Cow::Owned(format!("{CACHE_FIELD}{RENAMED_SUFFIX}"))
    } else {
        Cow::Borrowed(key)
    }
}
