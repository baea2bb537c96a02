//! KML 2.2 output.
//!
//! Markup is generated directly. Each feature with usable geometry becomes
//! one `<Placemark>`; every property is written to `<ExtendedData>`.

use std::fmt::Write as _;

use geojson::{Feature, PointType, PolygonType, Value};
use map_tools_features::FeatureCollection;

/// Renders `collection` as a KML document named `document_name`.
///
/// Empty slots and features whose geometry is missing or has no
/// coordinates are skipped.
#[must_use]
pub fn encode_kml(collection: &FeatureCollection, document_name: &str) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n");
    xml.push_str("  <Document>\n");
    let _ = writeln!(xml, "    <name>{}</name>", escape_xml(document_name));

    let mut placemarks = 0usize;
    for feature in collection.located() {
        if let Some(geometry) = feature.geometry.as_ref().and_then(|g| geometry_markup(&g.value)) {
            write_placemark(&mut xml, feature, &geometry);
            placemarks += 1;
        }
    }

    xml.push_str("  </Document>\n");
    xml.push_str("</kml>\n");

    log::debug!(
        "Encoded {placemarks} placemarks from {} features",
        collection.len()
    );

    xml
}

fn write_placemark(xml: &mut String, feature: &Feature, geometry: &str) {
    xml.push_str("    <Placemark>\n");

    if let Some(properties) = &feature.properties {
        if let Some(name) = properties.get("name") {
            let _ = writeln!(xml, "      <name>{}</name>", escape_xml(&value_text(name)));
        }

        if !properties.is_empty() {
            xml.push_str("      <ExtendedData>\n");
            for (key, value) in properties {
                let _ = writeln!(
                    xml,
                    "        <Data name=\"{}\"><value>{}</value></Data>",
                    escape_xml(key),
                    escape_xml(&value_text(value))
                );
            }
            xml.push_str("      </ExtendedData>\n");
        }
    }

    let _ = writeln!(xml, "      {geometry}");
    xml.push_str("    </Placemark>\n");
}

/// Geometry element for `value`, or `None` when there is nothing to draw.
fn geometry_markup(value: &Value) -> Option<String> {
    match value {
        Value::Point(position) => point(position),
        Value::LineString(positions) => line_string(positions),
        Value::Polygon(rings) => polygon(rings),
        Value::MultiPoint(positions) => multi(positions.iter().map(point)),
        Value::MultiLineString(lines) => multi(lines.iter().map(|l| line_string(l))),
        Value::MultiPolygon(polygons) => multi(polygons.iter().map(polygon)),
        Value::GeometryCollection(geometries) => {
            multi(geometries.iter().map(|g| geometry_markup(&g.value)))
        }
    }
}

fn point(position: &PointType) -> Option<String> {
    Some(format!(
        "<Point><coordinates>{}</coordinates></Point>",
        coordinate(position)?
    ))
}

fn line_string(positions: &[PointType]) -> Option<String> {
    Some(format!(
        "<LineString><coordinates>{}</coordinates></LineString>",
        coordinates(positions)?
    ))
}

fn polygon(rings: &PolygonType) -> Option<String> {
    let (exterior, interiors) = rings.split_first()?;
    let mut markup = format!(
        "<Polygon><outerBoundaryIs><LinearRing><coordinates>{}</coordinates></LinearRing></outerBoundaryIs>",
        coordinates(exterior)?
    );
    for ring in interiors {
        if let Some(coords) = coordinates(ring) {
            let _ = write!(
                markup,
                "<innerBoundaryIs><LinearRing><coordinates>{coords}</coordinates></LinearRing></innerBoundaryIs>"
            );
        }
    }
    markup.push_str("</Polygon>");
    Some(markup)
}

fn multi(parts: impl Iterator<Item = Option<String>>) -> Option<String> {
    let parts: Vec<String> = parts.flatten().collect();
    if parts.is_empty() {
        return None;
    }
    Some(format!("<MultiGeometry>{}</MultiGeometry>", parts.concat()))
}

/// `lon,lat` of a position; altitude is dropped.
fn coordinate(position: &[f64]) -> Option<String> {
    match position {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some(format!("{lon},{lat}")),
        _ => None,
    }
}

fn coordinates(positions: &[PointType]) -> Option<String> {
    let coords: Vec<String> = positions.iter().filter_map(|p| coordinate(p)).collect();
    if coords.is_empty() {
        return None;
    }
    Some(coords.join(" "))
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn feature(value: Value, properties: serde_json::Value) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(value)),
            id: None,
            properties: properties.as_object().cloned(),
            foreign_members: None,
        }
    }

    fn placemark_count(xml: &str) -> usize {
        xml.matches("<Placemark>").count()
    }

    #[test]
    fn null_entries_are_skipped() {
        let collection = FeatureCollection::new(vec![
            Some(feature(Value::Point(vec![-87.6, 41.8]), json!({"name": "Depot"}))),
            None,
        ]);
        let xml = encode_kml(&collection, "Stores");
        assert_eq!(placemark_count(&xml), 1);
        assert!(xml.contains("<name>Stores</name>"));
        assert!(xml.contains("<name>Depot</name>"));
        assert!(xml.contains("<coordinates>-87.6,41.8</coordinates>"));
        assert!(xml.starts_with("<?xml"));
        assert!(xml.trim_end().ends_with("</kml>"));
    }

    #[test]
    fn degenerate_geometry_is_skipped() {
        let mut no_geometry = feature(Value::Point(vec![0.0, 0.0]), json!({"name": "x"}));
        no_geometry.geometry = None;
        let collection = FeatureCollection::from_features([
            no_geometry,
            feature(Value::Point(vec![1.0]), json!({})),
            feature(Value::Polygon(vec![]), json!({})),
            feature(Value::MultiPoint(vec![]), json!({})),
        ]);
        assert_eq!(placemark_count(&encode_kml(&collection, "d")), 0);
    }

    #[test]
    fn property_text_is_escaped() {
        let collection = FeatureCollection::from_features([feature(
            Value::Point(vec![0.0, 0.0]),
            json!({"name": "Fish & <Chips>", "note": "say \"hi\"", "count": 3}),
        )]);
        let xml = encode_kml(&collection, "A&B");
        assert!(xml.contains("<name>A&amp;B</name>"));
        assert!(xml.contains("<name>Fish &amp; &lt;Chips&gt;</name>"));
        assert!(xml.contains("<Data name=\"note\"><value>say &quot;hi&quot;</value></Data>"));
        assert!(xml.contains("<Data name=\"count\"><value>3</value></Data>"));
        assert!(!xml.contains("Fish & <"));
    }

    #[test]
    fn polygons_and_multi_geometry() {
        let square = vec![vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
        ]];
        let collection = FeatureCollection::from_features([
            feature(Value::Polygon(square.clone()), json!({"name": "p"})),
            feature(Value::MultiPolygon(vec![square.clone(), square]), json!({"name": "m"})),
            feature(
                Value::LineString(vec![vec![0.0, 0.0], vec![2.0, 2.0]]),
                json!({"name": "l"}),
            ),
        ]);
        let xml = encode_kml(&collection, "shapes");
        assert_eq!(placemark_count(&xml), 3);
        assert!(xml.contains("<outerBoundaryIs><LinearRing><coordinates>0,0 1,0 1,1 0,0</coordinates>"));
        assert_eq!(xml.matches("<MultiGeometry>").count(), 1);
        assert!(xml.contains("<LineString><coordinates>0,0 2,2</coordinates></LineString>"));
    }
}
