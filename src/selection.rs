use crate::types::PointOfInterest;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectionState(HashSet<String>);

impl SelectionState {
    pub fn contains(&self, region: &str) -> bool {
        self.0.contains(region)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.iter().collect();
        names.sort_unstable();
        names
    }
}

/// Replaces the selection wholesale. Unknown names are kept; they simply
/// never match a point of interest.
pub fn set_selection<I, S>(region_names: I) -> SelectionState
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    SelectionState(region_names.into_iter().map(Into::into).collect())
}

/// Points of interest in selected regions, in catalog order. An empty
/// selection shows nothing.
pub fn visible_pois<'a>(
    state: &SelectionState,
    all_pois: &'a [PointOfInterest],
) -> Vec<&'a PointOfInterest> {
    if state.is_empty() {
        return Vec::new();
    }
    all_pois
        .iter()
        .filter(|poi| state.contains(&poi.region))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_pois() -> Vec<PointOfInterest> {
        vec![
            PointOfInterest::new(0, "Ontario", "CN Tower", 43.6426, -79.3871),
            PointOfInterest::new(1, "Alberta", "Banff NP", 51.1784, -115.5708),
            PointOfInterest::new(2, "Ontario", "Niagara Falls", 43.0962, -79.0716),
            PointOfInterest::new(3, "Yukon", "Whitehorse", 60.7197, -135.0522),
        ]
    }

    #[test]
    fn ontario_selection_shows_only_ontario() {
        let pois = vec![
            PointOfInterest::new(0, "Ontario", "CN Tower", 43.6426, -79.3871),
            PointOfInterest::new(1, "Alberta", "Banff NP", 51.1784, -115.5708),
        ];
        let state = set_selection(["Ontario"]);
        let visible = visible_pois(&state, &pois);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].marker_id.as_str(), "Ontario_CN Tower_0");
    }

    #[test]
    fn empty_selection_shows_nothing() {
        let state = set_selection(Vec::<String>::new());
        assert!(state.is_empty());
        assert!(visible_pois(&state, &sample_pois()).is_empty());
        assert_eq!(state, SelectionState::default());
    }

    #[test]
    fn unknown_region_is_selected_but_matches_nothing() {
        let state = set_selection(["Atlantis"]);
        assert!(state.contains("Atlantis"));
        assert!(visible_pois(&state, &sample_pois()).is_empty());
    }

    #[test]
    fn duplicate_names_collapse() {
        let state = set_selection(["Ontario", "Ontario", "Yukon"]);
        assert_eq!(state.len(), 2);
        assert_eq!(state.sorted(), vec!["Ontario", "Yukon"]);
    }

    #[test]
    fn visible_pois_keep_catalog_order() {
        let pois = sample_pois();
        let state = set_selection(["Yukon", "Ontario"]);
        let places: Vec<&str> = visible_pois(&state, &pois)
            .iter()
            .map(|p| p.place.as_str())
            .collect();
        assert_eq!(places, vec!["CN Tower", "Niagara Falls", "Whitehorse"]);
    }

    const REGIONS: &[&str] = &["Ontario", "Alberta", "Yukon", "Quebec"];

    proptest! {
        #[test]
        fn selection_growth_is_monotonic(
            small in proptest::sample::subsequence(REGIONS, 0..=REGIONS.len()),
            extra in proptest::sample::subsequence(REGIONS, 0..=REGIONS.len()),
        ) {
            let pois = sample_pois();
            let r1 = set_selection(small.iter().copied());
            let r2 = set_selection(small.iter().chain(extra.iter()).copied());
            let bigger: HashSet<&str> = visible_pois(&r2, &pois)
                .iter()
                .map(|p| p.marker_id.as_str())
                .collect();
            for poi in visible_pois(&r1, &pois) {
                prop_assert!(bigger.contains(poi.marker_id.as_str()));
            }
        }

        #[test]
        fn every_visible_poi_is_in_a_selected_region(
            picked in proptest::sample::subsequence(REGIONS, 0..=REGIONS.len()),
        ) {
            let pois = sample_pois();
            let state = set_selection(picked.iter().copied());
            for poi in visible_pois(&state, &pois) {
                prop_assert!(state.contains(&poi.region));
            }
        }
    }
}
