use crate::catalog::Catalog;
use crate::selection::{visible_pois, SelectionState};
use crate::toggle::{color_for, ToggleState};
use crate::types::{Color, MarkerId};
use anyhow::{anyhow, Result};
use serde::Serialize;

const SELECTED_OPACITY: f32 = 0.8;
const UNSELECTED_OPACITY: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(hex: &str) -> Result<Self> {
        let digits = hex
            .strip_prefix('#')
            .ok_or_else(|| anyhow!("Color '{}' must start with '#'", hex))?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!("Color '{}' is not of the form #rrggbb", hex));
        }
        Ok(Self(format!("#{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Palette {
    pub highlighted: HexColor,
    pub default: HexColor,
    pub region_selected: HexColor,
    pub region_unselected: HexColor,
}

impl Palette {
    pub fn marker(&self, color: Color) -> &HexColor {
        match color {
            Color::Highlighted => &self.highlighted,
            Color::Default => &self.default,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionView {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub notable_places: String,
    pub selected: bool,
    pub fill: HexColor,
    pub opacity: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoiView {
    pub marker_id: MarkerId,
    pub region: String,
    pub place: String,
    pub lat: f64,
    pub lon: f64,
    pub color: Color,
    pub fill: HexColor,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderModel {
    pub highlighted_regions: Vec<String>,
    pub regions: Vec<RegionView>,
    pub visible_pois: Vec<PoiView>,
    pub selection_info: String,
    pub clicked_info: String,
}

pub fn render_model(
    catalog: &Catalog,
    selection: &SelectionState,
    toggles: &ToggleState,
    palette: &Palette,
) -> RenderModel {
    let regions = catalog
        .regions()
        .iter()
        .map(|region| {
            let selected = selection.contains(&region.name);
            RegionView {
                name: region.name.clone(),
                lat: region.centroid.y(),
                lon: region.centroid.x(),
                notable_places: region.notable_places.join(", "),
                selected,
                fill: if selected {
                    palette.region_selected.clone()
                } else {
                    palette.region_unselected.clone()
                },
                opacity: if selected {
                    SELECTED_OPACITY
                } else {
                    UNSELECTED_OPACITY
                },
            }
        })
        .collect();

    let visible_pois = visible_pois(selection, catalog.pois())
        .into_iter()
        .map(|poi| {
            let color = color_for(&poi.marker_id, toggles);
            PoiView {
                marker_id: poi.marker_id.clone(),
                region: poi.region.clone(),
                place: poi.place.clone(),
                lat: poi.lat(),
                lon: poi.lon(),
                color,
                fill: palette.marker(color).clone(),
            }
        })
        .collect();

    RenderModel {
        highlighted_regions: selection.sorted().into_iter().map(String::from).collect(),
        regions,
        visible_pois,
        selection_info: selection_info(selection),
        clicked_info: clicked_info(catalog, toggles),
    }
}

pub fn selection_info(selection: &SelectionState) -> String {
    if selection.is_empty() {
        return "Select provinces above to see their notable places.".to_string();
    }
    format!("Selected provinces: {}", selection.sorted().join(", "))
}

/// Toggled places that resolve to a known point of interest, in catalog order.
pub fn clicked_info(catalog: &Catalog, toggles: &ToggleState) -> String {
    let places: Vec<&str> = catalog
        .pois()
        .iter()
        .filter(|poi| toggles.contains(&poi.marker_id))
        .map(|poi| poi.place.as_str())
        .collect();

    if places.is_empty() {
        "Click on markers to see more information.".to_string()
    } else {
        format!("Selected places: {}", places.join(", "))
    }
}
