use crate::classify::normalize;
use crate::config::InputConfig;
use crate::types::{RegionGeometry, StatusRecord};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use geojson::{Feature, GeoJson};
use shapefile::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

pub fn load_status_table(input: &InputConfig) -> Result<Vec<StatusRecord>> {
    let file = File::open(&input.status_csv)
        .with_context(|| format!("Failed to open CSV file: {:?}", input.status_csv))?;
    let records = read_status_table(file, input)
        .with_context(|| format!("Failed to read CSV file: {:?}", input.status_csv))?;
    info!("Loaded {} status rows from {:?}", records.len(), input.status_csv);
    Ok(records)
}

fn read_status_table<R: std::io::Read>(
    reader: R,
    input: &InputConfig,
) -> Result<Vec<StatusRecord>> {
    let columns = &input.columns;
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let name_idx = position(&columns.region_name)
        .ok_or_else(|| anyhow!("Region column '{}' not found in CSV", columns.region_name))?;

    // The remaining columns are optional; a missing one reads as blank for every row.
    let optional = |name: &str| {
        let idx = position(name);
        if idx.is_none() {
            warn!("Column '{}' not found in CSV, treating it as blank", name);
        }
        idx
    };
    let assembly_idx = optional(&columns.assembly_status);
    let council_idx = optional(&columns.council_status);
    let website_idx = optional(&columns.council_website_note);
    let notes_idx = optional(&columns.notes);

    let mut records = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(|v| normalize(v).to_string())
                .unwrap_or_default()
        };

        let region_name = cell(Some(name_idx));
        if region_name.is_empty() {
            continue;
        }

        records.push(StatusRecord {
            region_name,
            assembly_status: cell(assembly_idx),
            council_status: cell(council_idx),
            council_website_note: cell(website_idx),
            notes: cell(notes_idx),
        });
    }

    Ok(records)
}

pub fn load_geometry(input: &InputConfig) -> Result<Vec<RegionGeometry>> {
    let path = &input.geometry;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input geometry file has no extension"))?;

    let regions = match extension.as_str() {
        "shp" => load_shapefile(path, &input.geometry_name_field)?,
        "json" | "geojson" => load_geojson(path, &input.geometry_name_field)?,
        "geojsonl" | "geojsons" | "jsonl" | "ndjson" => {
            load_geojson_lines(path, &input.geometry_name_field)?
        }
        _ => return Err(anyhow!("Unsupported geometry format: {}", extension)),
    };

    if regions.is_empty() {
        return Err(anyhow!("No named polygon features found in {:?}", path));
    }

    info!("Loaded {} region geometries from {:?}", regions.len(), path);
    Ok(regions)
}

fn load_shapefile(path: &Path, name_field: &str) -> Result<Vec<RegionGeometry>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut regions = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let name_value = record
            .get(name_field)
            .ok_or_else(|| anyhow!("Name field '{}' not found in Shapefile", name_field))?;

        let region_name = match name_value {
            shapefile::dbase::FieldValue::Character(Some(s)) => s.trim().to_string(),
            shapefile::dbase::FieldValue::Character(None) => continue,
            _ => return Err(anyhow!("Shapefile name field must be a string")),
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => {
                debug!("Skipping non-polygon shape for {}", region_name);
                continue;
            }
        };

        regions.push(RegionGeometry { region_name, geometry });
    }

    Ok(regions)
}

fn load_geojson(path: &Path, name_field: &str) -> Result<Vec<RegionGeometry>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let geojson = GeoJson::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse GeoJSON: {:?}", path))?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => return Err(anyhow!("GeoJSON must hold named features")),
    };

    let mut regions = Vec::new();
    for feature in features {
        if let Some(region) = feature_to_region(feature, name_field)? {
            regions.push(region);
        }
    }
    Ok(regions)
}

/// One GeoJSON feature per line; blank lines are ignored.
fn load_geojson_lines(path: &Path, name_field: &str) -> Result<Vec<RegionGeometry>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;

    let mut regions = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {:?}", path))?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = line_no + 1;
        let geojson: GeoJson = line
            .parse()
            .with_context(|| format!("Failed to parse GeoJSON on line {} of {:?}", line_no, path))?;
        let feature = match geojson {
            GeoJson::Feature(feature) => feature,
            _ => return Err(anyhow!("Line {} of {:?} is not a GeoJSON feature", line_no, path)),
        };
        if let Some(region) = feature_to_region(feature, name_field)? {
            regions.push(region);
        }
    }
    Ok(regions)
}

fn feature_to_region(feature: Feature, name_field: &str) -> Result<Option<RegionGeometry>> {
    let name_val = feature.properties.as_ref().and_then(|props| props.get(name_field));

    let region_name = match name_val {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => {
            debug!("Skipping feature without '{}'", name_field);
            return Ok(None);
        }
    };

    let geometry = match feature.geometry {
        Some(geometry) => {
            let converted: geo::Geometry<f64> = geometry
                .value
                .try_into()
                .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

            match converted {
                geo::Geometry::MultiPolygon(mp) => mp,
                geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                _ => {
                    warn!("Skipping non-polygon geometry for {}", region_name);
                    return Ok(None);
                }
            }
        }
        None => return Ok(None),
    };

    Ok(Some(RegionGeometry { region_name, geometry }))
}
