use crate::catalog::{builtin_pois, builtin_regions, Catalog};
use crate::config::InputConfig;
use crate::types::{PointOfInterest, Region};
use anyhow::{anyhow, Context, Result};
use geo::{MultiPolygon, Simplify};
use geojson::GeoJson;
use serde::{Deserialize, Serialize};
use shapefile::dbase::FieldValue;
use shapefile::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiRecord {
    pub province: String,
    pub place: String,
    pub lat: f64,
    pub lon: f64,
}

pub fn load_catalog(input: &InputConfig) -> Result<Catalog> {
    let regions = load_regions(input)?;

    let pois = match &input.pois {
        Some(path) => {
            let records = load_poi_csv(path)?;
            records_to_pois(&records)
        }
        None => builtin_pois(),
    };
    info!("Loaded {} points of interest", pois.len());

    let catalog =
        Catalog::new(regions, pois).context("Reference data failed integrity checks")?;
    let populated = catalog.populated_regions();
    for region in catalog.regions() {
        if !populated.contains(region.name.as_str()) {
            warn!(region = %region.name, "Region has no points of interest");
        }
    }
    info!(
        regions = catalog.regions().len(),
        boundaries = catalog.boundary_count(),
        pois = catalog.pois().len(),
        "Catalog ready"
    );
    Ok(catalog)
}

pub fn load_regions(input: &InputConfig) -> Result<Vec<Region>> {
    let mut regions = builtin_regions();
    if let Some(path) = &input.boundaries {
        let mut boundaries = load_boundaries(path, input)?;
        if let Some(tolerance) = input.simplify_tolerance {
            debug!(tolerance, "Simplifying boundaries");
            for geometry in boundaries.values_mut() {
                *geometry = geometry.simplify(&tolerance);
            }
        }
        attach_boundaries(&mut regions, boundaries);
    }
    Ok(regions)
}

pub fn attach_boundaries(
    regions: &mut [Region],
    mut boundaries: HashMap<String, MultiPolygon<f64>>,
) {
    for region in regions.iter_mut() {
        match boundaries.remove(&region.name) {
            Some(geometry) => region.geometry = Some(geometry),
            None => warn!(region = %region.name, "No boundary found for region"),
        }
    }
    for name in boundaries.keys() {
        warn!(boundary = %name, "Boundary does not match any known region, skipping");
    }
}

pub fn records_to_pois(records: &[PoiRecord]) -> Vec<PointOfInterest> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| PointOfInterest::new(i, &r.province, &r.place, r.lat, r.lon))
        .collect()
}

pub fn load_poi_csv(path: &Path) -> Result<Vec<PoiRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open POI file: {:?}", path))?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let record: PoiRecord =
            result.with_context(|| format!("Bad POI row {} in {:?}", line + 1, path))?;
        records.push(record);
    }
    Ok(records)
}

pub fn write_poi_csv(path: &Path, records: &[PoiRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create POI file: {:?}", path))?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Region name -> boundary, read from a GeoJSON file, a zip archive holding
/// one, or a Shapefile.
pub fn load_boundaries(
    path: &Path,
    input: &InputConfig,
) -> Result<HashMap<String, MultiPolygon<f64>>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Boundary file has no extension: {:?}", path))?;

    let boundaries = match extension.as_str() {
        "zip" => {
            let bytes = read_zip_entry(path, &input.boundaries_entry)?;
            let geojson = GeoJson::from_reader(bytes.as_slice())
                .with_context(|| format!("Failed to parse GeoJSON inside {:?}", path))?;
            boundaries_from_geojson(geojson, &input.name_column)?
        }
        "json" | "geojson" => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
            let geojson = GeoJson::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse GeoJSON file: {:?}", path))?;
            boundaries_from_geojson(geojson, &input.name_column)?
        }
        "shp" => boundaries_from_shapefile(path, &input.name_column)?,
        _ => return Err(anyhow!("Unsupported boundary format: {}", extension)),
    };

    info!("Loaded {} boundaries from {:?}", boundaries.len(), path);
    Ok(boundaries)
}

/// Reads one entry. If the exact name is missing, the first entry whose name
/// contains it (ignoring case) is used instead.
pub fn read_zip_entry(path: &Path, entry: &str) -> Result<Vec<u8>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open archive: {:?}", path))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read archive: {:?}", path))?;

    let names: Vec<String> = archive.file_names().map(String::from).collect();
    debug!(?names, "Archive entries");

    let name = if names.iter().any(|n| n == entry) {
        entry.to_string()
    } else {
        let needle = entry.to_lowercase();
        let similar = names
            .iter()
            .find(|n| n.to_lowercase().contains(&needle))
            .cloned()
            .ok_or_else(|| anyhow!("{} not found in {:?}", entry, path))?;
        warn!(requested = entry, found = %similar, "Using similarly named archive entry");
        similar
    };

    let mut zipped = archive
        .by_name(&name)
        .with_context(|| format!("Failed to open {} in {:?}", name, path))?;
    let mut bytes = Vec::new();
    zipped.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn boundaries_from_geojson(
    geojson: GeoJson,
    name_column: &str,
) -> Result<HashMap<String, MultiPolygon<f64>>> {
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("Boundary GeoJSON must be a FeatureCollection")),
    };
    debug!("Boundary features: {}", collection.features.len());

    let mut boundaries: HashMap<String, MultiPolygon<f64>> = HashMap::new();

    for feature in collection.features {
        let Some(name) = feature
            .properties
            .as_ref()
            .and_then(|props| feature_name(props, name_column))
        else {
            continue;
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let value: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;
                match value {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue, // Skip points/lines
                }
            }
            None => continue,
        };

        // A region split over several features becomes one multipolygon.
        boundaries
            .entry(name)
            .or_insert_with(|| MultiPolygon::new(Vec::new()))
            .0
            .extend(geometry.0);
    }

    Ok(boundaries)
}

/// The configured property, or else the first one whose key mentions a name
/// or province.
fn feature_name(props: &geojson::JsonObject, name_column: &str) -> Option<String> {
    let value = props.get(name_column).or_else(|| {
        props
            .iter()
            .find(|(key, _)| {
                let key = key.to_lowercase();
                key.contains("name") || key.contains("province")
            })
            .map(|(_, value)| value)
    })?;

    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn boundaries_from_shapefile(
    path: &Path,
    name_column: &str,
) -> Result<HashMap<String, MultiPolygon<f64>>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let column = shapefile_name_column(path, name_column)?;
    let mut boundaries: HashMap<String, MultiPolygon<f64>> = HashMap::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let name = match record.get(&column) {
            Some(FieldValue::Character(Some(s))) => s.trim().to_string(),
            Some(FieldValue::Character(None)) | None => continue,
            Some(_) => return Err(anyhow!("Shapefile name column '{}' must be a string", column)),
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
            _ => continue, // Skip non-polygon shapes
        };

        boundaries
            .entry(name)
            .or_insert_with(|| MultiPolygon::new(Vec::new()))
            .0
            .extend(geometry.0);
    }

    Ok(boundaries)
}

/// The configured column when the table has it, or else the first column
/// whose name mentions a name or province.
fn shapefile_name_column(path: &Path, name_column: &str) -> Result<String> {
    let dbf = path.with_extension("dbf");
    let table = shapefile::dbase::Reader::from_path(&dbf)
        .with_context(|| format!("Failed to open Shapefile attributes: {:?}", dbf))?;
    let columns: Vec<&str> = table.fields().iter().map(|field| field.name()).collect();

    if columns.contains(&name_column) {
        return Ok(name_column.to_string());
    }
    columns
        .iter()
        .find(|column| {
            let column = column.to_lowercase();
            column.contains("name") || column.contains("province")
        })
        .map(|column| column.to_string())
        .ok_or_else(|| anyhow!("No name column in Shapefile {:?} (wanted '{}')", path, name_column))
}
