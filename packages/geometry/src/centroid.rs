//! Reduces arbitrary geometry to a single representative point.
//!
//! Points map to themselves. Everything else uses the area-weighted
//! centroid from [`geo::Centroid`] (holes subtracted, lines weighted by
//! length). The result only needs to be a visually sensible pin on a map,
//! not an exact geographic centroid.

use geo::{Area, Centroid, Coord, CoordsIter, Geometry, LineString};

use crate::Coordinate;

/// Returns the representative point of `geometry`.
///
/// Zero-area polygons (all vertices collinear or coincident) and
/// geometries whose centroid is undefined fall back to the plain average
/// of their vertices. Returns `None` only when there are no finite
/// vertices at all.
#[must_use]
pub fn representative_point(geometry: &Geometry<f64>) -> Option<Coordinate> {
    if let Geometry::Point(point) = geometry {
        let coord = Coordinate::from(*point);
        return is_finite(&coord).then_some(coord);
    }

    if is_polygonal(geometry) && geometry.unsigned_area() < f64::EPSILON {
        return vertex_average(geometry);
    }

    geometry
        .centroid()
        .map(Coordinate::from)
        .filter(is_finite)
        .or_else(|| vertex_average(geometry))
}

/// Same as [`representative_point`] for a `GeoJSON` geometry.
///
/// Geometry that cannot be converted (e.g. a polygon ring with too few
/// positions) yields `None`.
#[must_use]
pub fn representative_point_geojson(geometry: &geojson::Geometry) -> Option<Coordinate> {
    if !is_well_formed(&geometry.value) {
        log::debug!("Malformed geometry, no representative point");
        return None;
    }

    let geo_geom: Geometry<f64> = match geometry.clone().try_into() {
        Ok(g) => g,
        Err(e) => {
            log::debug!("Unreadable geometry, no representative point: {e}");
            return None;
        }
    };
    representative_point(&geo_geom)
}

/// Whether every position has at least two components and every polygon
/// has an exterior ring, which the `geo` conversion assumes.
fn is_well_formed(value: &geojson::Value) -> bool {
    fn positions_ok(positions: &[Vec<f64>]) -> bool {
        positions.iter().all(|p| p.len() >= 2)
    }
    fn polygon_ok(rings: &[Vec<Vec<f64>>]) -> bool {
        !rings.is_empty() && rings.iter().all(|ring| positions_ok(ring))
    }

    match value {
        geojson::Value::Point(p) => p.len() >= 2,
        geojson::Value::MultiPoint(ps) | geojson::Value::LineString(ps) => positions_ok(ps),
        geojson::Value::MultiLineString(lines) => lines.iter().all(|l| positions_ok(l)),
        geojson::Value::Polygon(rings) => polygon_ok(rings),
        geojson::Value::MultiPolygon(polygons) => polygons.iter().all(|p| polygon_ok(p)),
        geojson::Value::GeometryCollection(geometries) => {
            geometries.iter().all(|g| is_well_formed(&g.value))
        }
    }
}

const fn is_polygonal(geometry: &Geometry<f64>) -> bool {
    matches!(
        geometry,
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Rect(_) | Geometry::Triangle(_)
    )
}

fn is_finite(coord: &Coordinate) -> bool {
    coord.latitude.is_finite() && coord.longitude.is_finite()
}

/// Average of the geometry's vertices. Closed rings contribute each
/// vertex once.
fn vertex_average(geometry: &Geometry<f64>) -> Option<Coordinate> {
    let vertices: Vec<Coord<f64>> = match geometry {
        Geometry::Polygon(polygon) => ring_vertices(polygon.exterior()),
        Geometry::MultiPolygon(multi) => multi
            .iter()
            .flat_map(|polygon| ring_vertices(polygon.exterior()))
            .collect(),
        other => other.coords_iter().collect(),
    };

    let finite: Vec<&Coord<f64>> = vertices
        .iter()
        .filter(|c| c.x.is_finite() && c.y.is_finite())
        .collect();
    if finite.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = finite.len() as f64;
    let sum_x: f64 = finite.iter().map(|c| c.x).sum();
    let sum_y: f64 = finite.iter().map(|c| c.y).sum();

    Some(Coordinate::new(sum_y / n, sum_x / n))
}

fn ring_vertices(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let coords = &ring.0;
    let len = if coords.len() > 1 && ring.is_closed() {
        coords.len() - 1
    } else {
        coords.len()
    };
    coords[..len].to_vec()
}
