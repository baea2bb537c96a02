//! The `"<lat>,<lon>"` location codec.
//!
//! This is the interchange format between table columns and geometry.
//! Note the order: latitude first, unlike `GeoJSON` positions which are
//! `[lon, lat]`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::LocationError;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate without validating it.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are inside their degree ranges.
    #[must_use]
    pub fn is_in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// `GeoJSON` position (`[lon, lat]`).
    #[must_use]
    pub fn to_position(self) -> Vec<f64> {
        vec![self.longitude, self.latitude]
    }

    /// Reads a `GeoJSON` position. Returns `None` for fewer than two
    /// components or non-finite values.
    #[must_use]
    pub fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some(Self::new(*lat, *lon)),
            _ => None,
        }
    }
}

impl From<geo::Point<f64>> for Coordinate {
    fn from(point: geo::Point<f64>) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<Coordinate> for geo::Point<f64> {
    fn from(coord: Coordinate) -> Self {
        Self::new(coord.longitude, coord.latitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// How strictly degree ranges are enforced while parsing.
///
/// Numeric parseability is always required; only the range check is
/// optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Reject latitudes outside [-90, 90] and longitudes outside
    /// [-180, 180].
    #[default]
    Strict,
    /// Accept any finite pair, matching tables that were never range
    /// checked.
    Lenient,
}

/// Parses `"<lat>,<lon>"` with [`RangePolicy::Strict`].
///
/// # Errors
///
/// Returns [`LocationError`] if the text does not hold exactly two finite
/// numbers, or if they fall outside the valid degree ranges.
pub fn parse(text: &str) -> Result<Coordinate, LocationError> {
    parse_with_policy(text, RangePolicy::Strict)
}

/// Parses `"<lat>,<lon>"`. Whitespace around each token is ignored.
///
/// # Errors
///
/// Returns [`LocationError`] if the text does not hold exactly two finite
/// numbers, or (under [`RangePolicy::Strict`]) if they fall outside the
/// valid degree ranges.
pub fn parse_with_policy(text: &str, policy: RangePolicy) -> Result<Coordinate, LocationError> {
    let tokens: Vec<&str> = text.split(',').collect();
    let [lat, lon] = tokens.as_slice() else {
        return Err(LocationError::Arity {
            value: text.to_string(),
            tokens: tokens.len(),
        });
    };

    let coord = Coordinate::new(parse_token(text, lat)?, parse_token(text, lon)?);

    if policy == RangePolicy::Strict && !coord.is_in_range() {
        return Err(LocationError::Range {
            latitude: coord.latitude,
            longitude: coord.longitude,
        });
    }

    Ok(coord)
}

fn parse_token(text: &str, token: &str) -> Result<f64, LocationError> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LocationError::Number {
            value: text.to_string(),
            token: token.to_string(),
        })
}

/// Formats a coordinate as `"<lat>,<lon>"`.
///
/// Uses the shortest decimal representation that reads back to the same
/// `f64`, so [`parse`] of the result yields an identical coordinate.
#[must_use]
pub fn format(coord: &Coordinate) -> String {
    coord.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_pair() {
        let coord = parse("41.8781,-87.6298").unwrap();
        assert!((coord.latitude - 41.8781).abs() < f64::EPSILON);
        assert!((coord.longitude - -87.6298).abs() < f64::EPSILON);
    }

    #[test]
    fn tolerates_spaces_around_tokens() {
        let coord = parse(" 10.5 , 20.25 ").unwrap();
        assert_eq!(coord, Coordinate::new(10.5, 20.25));
    }

    #[test]
    fn format_parse_roundtrip_is_exact() {
        for coord in [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(-33.868_820, 151.209_296),
            Coordinate::new(0.1 + 0.2, -179.999_999_999),
            Coordinate::new(90.0, -180.0),
            Coordinate::new(1e-7, 2.5e-5),
        ] {
            assert_eq!(parse(&format(&coord)).unwrap(), coord);
        }
    }

    #[test]
    fn integers_format_without_decimal_point() {
        assert_eq!(format(&Coordinate::new(1.0, -2.0)), "1,-2");
    }

    #[test]
    fn rejects_wrong_arity() {
        for text in ["", "1", "1,2,3", "1;2"] {
            assert!(
                matches!(parse(text), Err(LocationError::Arity { .. })),
                "{text:?} should fail arity"
            );
        }
    }

    #[test]
    fn rejects_non_numeric_and_non_finite_tokens() {
        for text in ["abc,1", "1,", "1,NaN", "inf,2", "12abc,3"] {
            assert!(
                matches!(parse(text), Err(LocationError::Number { .. })),
                "{text:?} should fail number parsing"
            );
        }
    }

    #[test]
    fn strict_policy_rejects_out_of_range() {
        assert!(matches!(
            parse("200,10"),
            Err(LocationError::Range { latitude, .. }) if (latitude - 200.0).abs() < f64::EPSILON
        ));
        assert!(parse("10,181").is_err());
    }

    #[test]
    fn lenient_policy_accepts_out_of_range() {
        let coord = parse_with_policy("200,10", RangePolicy::Lenient).unwrap();
        assert!(!coord.is_in_range());
    }

    #[test]
    fn position_conversion_swaps_axes() {
        let coord = Coordinate::new(1.0, 2.0);
        assert_eq!(coord.to_position(), vec![2.0, 1.0]);
        assert_eq!(Coordinate::from_position(&[2.0, 1.0, 30.0]), Some(coord));
        assert_eq!(Coordinate::from_position(&[2.0]), None);
    }

    #[test]
    fn from_str_uses_strict_codec() {
        let coord: Coordinate = "5,6".parse().unwrap();
        assert_eq!(coord, Coordinate::new(5.0, 6.0));
        assert!("95,6".parse::<Coordinate>().is_err());
    }
}
