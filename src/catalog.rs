use crate::error::CatalogError;
use crate::types::{MarkerId, PointOfInterest, Region};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};
use std::collections::{HashMap, HashSet};

// Display centroids for the provinces and territories.
const REGION_CENTROIDS: &[(&str, f64, f64)] = &[
    ("Alberta", 53.9333, -116.5765),
    ("British Columbia", 53.7267, -127.6476),
    ("Manitoba", 53.7609, -98.8139),
    ("New Brunswick", 46.5653, -66.4619),
    ("Newfoundland and Labrador", 53.1355, -57.6604),
    ("Nova Scotia", 45.1679, -62.6779),
    ("Ontario", 51.2538, -85.3232),
    ("Prince Edward Island", 46.5107, -63.4168),
    ("Quebec", 52.9399, -73.5491),
    ("Saskatchewan", 52.9399, -106.4509),
    ("Northwest Territories", 64.8255, -124.8457),
    ("Nunavut", 70.2998, -83.1076),
    ("Yukon", 64.2823, -135.0),
];

// (region, place, lat, lon)
const NOTABLE_PLACES: &[(&str, &str, f64, f64)] = &[
    ("Alberta", "Banff NP", 51.1784, -115.5708),
    ("Alberta", "Jasper NP", 52.8738, -117.9610),
    ("Alberta", "Calgary Tower", 51.0447, -114.0719),
    ("Alberta", "Lake Louise", 51.4254, -116.1773),
    ("Alberta", "West Edmonton Mall", 53.5225, -113.6242),
    ("British Columbia", "Stanley Park", 49.3017, -123.1417),
    ("British Columbia", "Butchart Gardens", 48.5636, -123.4683),
    ("British Columbia", "Whistler", 50.1163, -122.9574),
    ("British Columbia", "Capilano Bridge", 49.3431, -123.1139),
    ("British Columbia", "Pacific Rim NP", 49.0064, -125.6581),
    ("Manitoba", "The Forks", 49.8865, -97.1307),
    ("Manitoba", "Riding Mountain NP", 50.6625, -100.0333),
    ("Manitoba", "Assiniboine Zoo", 49.8731, -97.2461),
    ("Manitoba", "Museum for Human Rights", 49.8891, -97.1309),
    ("Manitoba", "FortWhyte Alive", 49.8274, -97.2398),
    ("New Brunswick", "Bay of Fundy", 45.2336, -66.1150),
    ("New Brunswick", "Hopewell Rocks", 45.8261, -64.5706),
    ("New Brunswick", "Fundy NP", 45.5960, -65.0018),
    ("New Brunswick", "Reversing Falls", 45.2502, -66.0864),
    ("New Brunswick", "Kings Landing", 45.9960, -66.9060),
    ("Newfoundland and Labrador", "Gros Morne NP", 49.6022, -57.7564),
    ("Newfoundland and Labrador", "Signal Hill", 47.5705, -52.6819),
    ("Newfoundland and Labrador", "L'Anse aux Meadows", 51.5965, -55.5308),
    ("Newfoundland and Labrador", "Cape Spear", 47.5227, -52.6173),
    ("Newfoundland and Labrador", "Bonavista", 48.6583, -53.1127),
    ("Nova Scotia", "Peggy's Cove", 44.4948, -63.9189),
    ("Nova Scotia", "Cabot Trail", 46.7371, -60.3508),
    ("Nova Scotia", "Halifax Citadel", 44.6478, -63.5816),
    ("Nova Scotia", "Lunenburg", 44.3777, -64.3092),
    ("Nova Scotia", "Kejimkujik NP", 44.3800, -65.2175),
    ("Ontario", "CN Tower", 43.6426, -79.3871),
    ("Ontario", "Niagara Falls", 43.0962, -79.0716),
    ("Ontario", "Algonquin Park", 45.8333, -78.5000),
    ("Ontario", "Parliament Hill", 45.4235, -75.7000),
    ("Ontario", "Royal Ontario Museum", 43.6677, -79.3948),
    ("Prince Edward Island", "Green Gables", 46.4911, -63.3838),
    ("Prince Edward Island", "Cavindish Beach", 46.5011, -63.4187),
    ("Prince Edward Island", "Confederation Trail", 46.3335, -63.3008),
    ("Prince Edward Island", "PEI NP", 46.4127, -63.0878),
    ("Prince Edward Island", "Point Prim Lighthouse", 46.0477, -62.9975),
    ("Quebec", "Old Quebec", 46.8139, -71.2082),
    ("Quebec", "Mont-Tremblant", 46.1184, -74.5958),
    ("Quebec", "Montmorency Falls", 46.8855, -71.1510),
    ("Quebec", "Quebec City", 46.8139, -71.2080),
    ("Quebec", "Sainte-Anne-de-Beaupré", 47.0226, -70.9370),
    ("Saskatchewan", "Forestry Zoo", 52.1316, -106.6702),
    ("Saskatchewan", "Wanuskewin", 52.2163, -106.5931),
    ("Saskatchewan", "Prince Albert NP", 53.9837, -106.0173),
    ("Saskatchewan", "Wascana Centre", 50.4364, -104.6171),
    ("Saskatchewan", "RCMP Heritage Centre", 50.4359, -104.6615),
    ("Northwest Territories", "Nahanni NP", 61.5833, -125.5833),
    ("Northwest Territories", "Great Slave Lake", 62.0955, -114.3858),
    ("Northwest Territories", "Virginia Falls", 61.6031, -125.7744),
    ("Northwest Territories", "Yellowknife", 62.4540, -114.3718),
    ("Northwest Territories", "Wood Buffalo NP", 59.4675, -112.2124),
    ("Nunavut", "Auyuittuq NP", 67.8333, -65.0000),
    ("Nunavut", "Sylvia Grinnell Park", 63.7430, -68.5571),
    ("Nunavut", "Qaummaarviit Park", 63.7942, -68.5532),
    ("Nunavut", "Iqaluit", 63.7467, -68.5170),
    ("Nunavut", "Sirmilik NP", 72.9962, -81.2503),
    ("Yukon", "Kluane NP", 60.7500, -139.5000),
    ("Yukon", "Miles Canyon", 60.6599, -135.0262),
    ("Yukon", "SS Klondike", 60.7230, -135.0456),
    ("Yukon", "Whitehorse", 60.7197, -135.0522),
    ("Yukon", "Tombstone Park", 64.5167, -138.2167),
];

/// Built-in provinces and territories, each carrying its notable places in
/// reference order. No boundaries are attached.
pub fn builtin_regions() -> Vec<Region> {
    REGION_CENTROIDS
        .iter()
        .map(|&(name, lat, lon)| Region {
            name: name.to_string(),
            centroid: Point::new(lon, lat),
            geometry: None,
            notable_places: NOTABLE_PLACES
                .iter()
                .filter(|(region, ..)| *region == name)
                .map(|(_, place, ..)| place.to_string())
                .collect(),
        })
        .collect()
}

pub fn builtin_pois() -> Vec<PointOfInterest> {
    NOTABLE_PLACES
        .iter()
        .enumerate()
        .map(|(i, &(region, place, lat, lon))| PointOfInterest::new(i, region, place, lat, lon))
        .collect()
}

// Wrapper for RTree indexing of region boundaries
struct BoundaryIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for BoundaryIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct Catalog {
    regions: Vec<Region>,
    pois: Vec<PointOfInterest>,
    regions_by_name: HashMap<String, usize>,
    pois_by_marker: HashMap<MarkerId, usize>,
    tree: RTree<BoundaryIndex>,
}

impl Catalog {
    pub fn new(regions: Vec<Region>, pois: Vec<PointOfInterest>) -> Result<Self, CatalogError> {
        let mut regions_by_name = HashMap::with_capacity(regions.len());
        for (i, region) in regions.iter().enumerate() {
            if regions_by_name.insert(region.name.clone(), i).is_some() {
                return Err(CatalogError::DuplicateRegion(region.name.clone()));
            }
        }

        let mut pois_by_marker = HashMap::with_capacity(pois.len());
        for (i, poi) in pois.iter().enumerate() {
            let (lat, lon) = (poi.lat(), poi.lon());
            let valid = lat.is_finite()
                && lon.is_finite()
                && (-90.0..=90.0).contains(&lat)
                && (-180.0..=180.0).contains(&lon);
            if !valid {
                return Err(CatalogError::InvalidPosition {
                    marker: poi.marker_id.clone(),
                    lat,
                    lon,
                });
            }
            if !regions_by_name.contains_key(&poi.region) {
                return Err(CatalogError::OrphanedPoi {
                    marker: poi.marker_id.clone(),
                    region: poi.region.clone(),
                });
            }
            if pois_by_marker.insert(poi.marker_id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateMarker(poi.marker_id.clone()));
            }
        }

        let tree_items: Vec<BoundaryIndex> = regions
            .iter()
            .enumerate()
            .filter_map(|(i, region)| {
                let rect = region.geometry.as_ref()?.bounding_rect()?;
                Some(BoundaryIndex {
                    index: i,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();

        Ok(Self {
            regions,
            pois,
            regions_by_name,
            pois_by_marker,
            tree: RTree::bulk_load(tree_items),
        })
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(builtin_regions(), builtin_pois())
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn pois(&self) -> &[PointOfInterest] {
        &self.pois
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions_by_name.get(name).map(|&i| &self.regions[i])
    }

    pub fn poi(&self, marker_id: &MarkerId) -> Option<&PointOfInterest> {
        self.pois_by_marker.get(marker_id).map(|&i| &self.pois[i])
    }

    pub fn region_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.regions.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn boundary_count(&self) -> usize {
        self.tree.size()
    }

    /// The region whose boundary contains the point. Points on a boundary
    /// edge are not contained.
    pub fn region_at(&self, lat: f64, lon: f64) -> Option<&Region> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|candidate| self.regions.get(candidate.index))
            .find(|region| {
                region
                    .geometry
                    .as_ref()
                    .is_some_and(|geometry| geometry.contains(&point))
            })
    }

    pub fn populated_regions(&self) -> HashSet<&str> {
        self.pois.iter().map(|p| p.region.as_str()).collect()
    }
}
