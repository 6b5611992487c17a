use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A province or territory. The boundary is only present when one was loaded
/// from a boundary file; the built-in dataset ships centroids alone.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub centroid: Point<f64>,
    pub geometry: Option<MultiPolygon<f64>>,
    pub notable_places: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    /// `{region}_{place}_{index}`, where `index` is the POI's position in the
    /// whole collection.
    pub fn new(region: &str, place: &str, index: usize) -> Self {
        Self(format!("{region}_{place}_{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MarkerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MarkerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct PointOfInterest {
    pub marker_id: MarkerId,
    pub region: String,
    pub place: String,
    // x = longitude, y = latitude
    pub position: Point<f64>,
}

impl PointOfInterest {
    pub fn new(index: usize, region: &str, place: &str, lat: f64, lon: f64) -> Self {
        Self {
            marker_id: MarkerId::new(region, place, index),
            region: region.to_string(),
            place: place.to_string(),
            position: Point::new(lon, lat),
        }
    }

    pub fn lat(&self) -> f64 {
        self.position.y()
    }

    pub fn lon(&self) -> f64 {
        self.position.x()
    }
}

/// Marker color as decided by the toggle store. The palette turns it into a
/// concrete hex string for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Default,
    Highlighted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_id_joins_region_place_and_index() {
        let id = MarkerId::new("Ontario", "CN Tower", 0);
        assert_eq!(id.as_str(), "Ontario_CN Tower_0");
    }

    #[test]
    fn poi_position_is_lon_lat() {
        let poi = PointOfInterest::new(3, "Ontario", "CN Tower", 43.6426, -79.3871);
        assert_eq!(poi.lat(), 43.6426);
        assert_eq!(poi.lon(), -79.3871);
        assert_eq!(poi.marker_id.as_str(), "Ontario_CN Tower_3");
    }
}
