//! Zipped shapefile bundles.
//!
//! A bundle is a zip archive holding one or more layers. A layer is a
//! `.shp` entry with a `.dbf` entry of the same stem; `.shx` is not
//! needed since records are read in order. Layers are concatenated in
//! archive order. Coordinates are taken as-is: a layer whose `.prj` is a
//! projected system is imported anyway with a warning.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use geojson::{Feature, JsonObject};
use map_tools_features::FeatureCollection;
use serde_json::Value;
use shapefile::dbase::{Date, FieldValue};

use crate::FormatError;

/// Raw bytes of one layer's member files.
#[derive(Default)]
struct Layer {
    shp: Option<Vec<u8>>,
    dbf: Option<Vec<u8>>,
    prj: Option<String>,
}

/// Decodes a zipped shapefile bundle.
///
/// # Errors
///
/// * If the bytes are not a zip archive
/// * If the archive has no `.shp`/`.dbf` pair
/// * If a layer's shapes or attribute table cannot be read
pub fn decode_shapefile_zip(bytes: &[u8]) -> Result<FeatureCollection, FormatError> {
    let layers = read_layers(bytes)?;

    let mut collection = FeatureCollection::default();
    let mut found = false;

    for (stem, layer) in layers {
        let (Some(shp), Some(dbf)) = (layer.shp, layer.dbf) else {
            log::warn!("Skipping layer {stem}: needs both .shp and .dbf");
            continue;
        };
        found = true;

        if layer.prj.as_deref().is_some_and(is_projected) {
            log::warn!(
                "Layer {stem} uses a projected coordinate system; coordinates are not reprojected"
            );
        }

        let features = decode_layer(&stem, shp, dbf)?;
        log::info!("Layer {stem}: {} features", features.len());
        collection.extend(features);
    }

    if !found {
        return Err(FormatError::InvalidShapefile(
            "archive contains no .shp/.dbf pair".to_string(),
        ));
    }

    Ok(collection)
}

/// Groups archive entries by stem, in order of first appearance.
fn read_layers(bytes: &[u8]) -> Result<Vec<(String, Layer)>, FormatError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| FormatError::InvalidShapefile(format!("not a zip archive: {e}")))?;

    let mut order: BTreeMap<String, usize> = BTreeMap::new();
    let mut layers: Vec<(String, Layer)> = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| FormatError::InvalidShapefile(format!("corrupt zip entry {i}: {e}")))?;

        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let Some((stem, extension)) = name.rsplit_once('.') else {
            continue;
        };
        let extension = extension.to_ascii_lowercase();
        if !matches!(extension.as_str(), "shp" | "dbf" | "prj") {
            continue;
        }

        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| FormatError::InvalidShapefile(format!("reading {name}: {e}")))?;

        let index = *order.entry(stem.to_string()).or_insert_with(|| {
            layers.push((stem.to_string(), Layer::default()));
            layers.len() - 1
        });
        let layer = &mut layers[index].1;

        match extension.as_str() {
            "shp" => layer.shp = Some(data),
            "dbf" => layer.dbf = Some(data),
            _ => layer.prj = Some(String::from_utf8_lossy(&data).into_owned()),
        }
    }

    Ok(layers)
}

fn decode_layer(stem: &str, shp: Vec<u8>, dbf: Vec<u8>) -> Result<FeatureCollection, FormatError> {
    let invalid = |what: &str, e: &dyn std::fmt::Display| {
        FormatError::InvalidShapefile(format!("{stem}: {what}: {e}"))
    };

    let shape_reader =
        shapefile::ShapeReader::new(Cursor::new(shp)).map_err(|e| invalid("shapes", &e))?;
    let dbase_reader = shapefile::dbase::Reader::new(Cursor::new(dbf))
        .map_err(|e| invalid("attribute table", &e))?;

    let field_names: Vec<String> = dbase_reader
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();

    let mut reader = shapefile::Reader::new(shape_reader, dbase_reader);
    let mut features = Vec::new();

    for (index, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, mut record) = item.map_err(|e| invalid(&format!("record {index}"), &e))?;

        let mut properties = JsonObject::new();
        for name in &field_names {
            if let Some(value) = record.remove(name) {
                properties.insert(name.clone(), field_value(value));
            }
        }

        features.push(Some(Feature {
            bbox: None,
            geometry: shape_geometry(stem, index, shape),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }));
    }

    Ok(FeatureCollection::new(features))
}

fn shape_geometry(stem: &str, index: usize, shape: shapefile::Shape) -> Option<geojson::Geometry> {
    if matches!(shape, shapefile::Shape::NullShape) {
        return None;
    }
    match geo::Geometry::<f64>::try_from(shape) {
        Ok(geometry) => Some(geojson::Geometry::new(geojson::Value::from(&geometry))),
        Err(e) => {
            log::warn!("{stem}: record {index} has unreadable geometry: {e:?}");
            None
        }
    }
}

fn field_value(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => Value::String(s),
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) | FieldValue::Currency(n) => {
            number(n)
        }
        FieldValue::Float(Some(n)) => number(f64::from(n)),
        FieldValue::Integer(n) => Value::from(n),
        FieldValue::Logical(Some(b)) => Value::Bool(b),
        FieldValue::Date(Some(date)) => Value::String(iso_date(&date)),
        FieldValue::DateTime(date_time) => {
            let time = date_time.time();
            Value::String(format!(
                "{}T{:02}:{:02}:{:02}",
                iso_date(&date_time.date()),
                time.hours(),
                time.minutes(),
                time.seconds()
            ))
        }
        _ => Value::Null,
    }
}

/// `YYYY-MM-DD`.
fn iso_date(date: &Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Whole numbers become JSON integers so `42` does not turn into `42.0`.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
}

fn is_projected(prj: &str) -> bool {
    prj.trim_start().to_ascii_uppercase().starts_with("PROJCS")
}
