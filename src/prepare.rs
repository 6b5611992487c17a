use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::data::{self, PoiRecord};
use crate::types::Region;
use anyhow::{anyhow, Context, Result};
use geo::algorithm::contains::Contains;
use geo::Point;
use geojson::GeoJson;
use rayon::prelude::*;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub position: Point<f64>,
}

impl Candidate {
    pub fn new(name: &str, lat: f64, lon: f64) -> Self {
        Self {
            name: name.to_string(),
            position: Point::new(lon, lat),
        }
    }
}

/// Builds the POI dataset from the configured candidate source and writes it
/// as CSV. Returns the number of rows written.
pub fn run(config: &AppConfig) -> Result<usize> {
    if config.input.boundaries.is_none() {
        return Err(anyhow!("input.boundaries must be set to prepare points of interest"));
    }
    let regions = data::load_regions(&config.input)?;
    let candidates = load_candidates(&config.prepare.candidates, &config.prepare.name_property)?;
    info!("Loaded {} candidate points", candidates.len());

    let records = match_notable_places(&regions, &candidates);

    // The output must be servable as-is.
    Catalog::new(regions, data::records_to_pois(&records))
        .context("Prepared points of interest failed integrity checks")?;

    data::write_poi_csv(&config.prepare.output, &records)?;
    info!(
        "Wrote {} points of interest to {:?}",
        records.len(),
        config.prepare.output
    );
    Ok(records.len())
}

/// Keeps candidates whose name contains a region's notable place (ignoring
/// case) and which lie strictly inside that region's boundary. Both checks
/// must pass. Output follows region order, then place order, then candidate
/// order.
pub fn match_notable_places(regions: &[Region], candidates: &[Candidate]) -> Vec<PoiRecord> {
    let lowered: Vec<String> = candidates.iter().map(|c| c.name.to_lowercase()).collect();

    let per_region: Vec<Vec<PoiRecord>> = regions
        .par_iter()
        .map(|region| {
            let Some(boundary) = &region.geometry else {
                warn!(region = %region.name, "No boundary, skipping region");
                return Vec::new();
            };

            let mut records = Vec::new();
            for place in &region.notable_places {
                let needle = place.to_lowercase();
                for (candidate, name) in candidates.iter().zip(&lowered) {
                    if name.contains(&needle) && boundary.contains(&candidate.position) {
                        records.push(PoiRecord {
                            province: region.name.clone(),
                            place: place.clone(),
                            lat: candidate.position.y(),
                            lon: candidate.position.x(),
                        });
                    }
                }
            }
            records
        })
        .collect();

    per_region.into_iter().flatten().collect()
}

pub fn load_candidates(path: &Path, name_property: &str) -> Result<Vec<Candidate>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open candidate file: {:?}", path))?;
    let geojson = GeoJson::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse candidate GeoJSON: {:?}", path))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("Candidate GeoJSON must be a FeatureCollection")),
    };

    let candidates = collection
        .features
        .into_iter()
        .filter_map(|feature| {
            let name = feature
                .properties
                .as_ref()?
                .get(name_property)?
                .as_str()?
                .to_string();
            match feature.geometry?.value {
                geojson::Value::Point(coords) if coords.len() >= 2 => {
                    Some(Candidate::new(&name, coords[1], coords[0]))
                }
                _ => None,
            }
        })
        .collect();

    Ok(candidates)
}
