use crate::types::{Color, MarkerId};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ToggleState(HashSet<MarkerId>);

impl ToggleState {
    pub fn contains(&self, marker_id: &MarkerId) -> bool {
        self.0.contains(marker_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Flips membership of `marker_id`. Ids that match no point of interest are
/// accepted like any other.
pub fn toggle(marker_id: MarkerId, mut state: ToggleState) -> ToggleState {
    if !state.0.remove(&marker_id) {
        state.0.insert(marker_id);
    }
    state
}

pub fn color_for(marker_id: &MarkerId, state: &ToggleState) -> Color {
    if state.contains(marker_id) {
        Color::Highlighted
    } else {
        Color::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn click_twice_restores_default() {
        let id = MarkerId::from("Ontario_CN Tower_0");
        let state = toggle(id.clone(), ToggleState::default());
        assert!(state.contains(&id));
        assert_eq!(color_for(&id, &state), Color::Highlighted);

        let state = toggle(id.clone(), state);
        assert!(state.is_empty());
        assert_eq!(color_for(&id, &state), Color::Default);
    }

    #[test]
    fn unknown_marker_is_added() {
        let id = MarkerId::from("Nonexistent_Place_99");
        let state = toggle(id.clone(), ToggleState::default());
        assert_eq!(state.len(), 1);
        assert!(state.contains(&id));
    }

    #[test]
    fn toggles_are_independent_per_marker() {
        let a = MarkerId::from("Ontario_CN Tower_0");
        let b = MarkerId::from("Alberta_Banff NP_1");
        let state = toggle(b.clone(), toggle(a.clone(), ToggleState::default()));
        let state = toggle(a.clone(), state);
        assert_eq!(color_for(&a, &state), Color::Default);
        assert_eq!(color_for(&b, &state), Color::Highlighted);
    }

    const MARKER_ID: &str = "[A-Za-z]{1,8}_[A-Za-z ]{1,8}_[0-9]{1,2}";

    fn arb_state_and_marker() -> impl Strategy<Value = (ToggleState, MarkerId)> {
        proptest::collection::vec(MARKER_ID, 0..8).prop_flat_map(|ids| {
            let fresh = MARKER_ID.prop_map(MarkerId::from).boxed();
            let marker = if ids.is_empty() {
                fresh
            } else {
                let toggled = proptest::sample::select(ids.clone()).prop_map(MarkerId::from);
                prop_oneof![toggled, fresh].boxed()
            };
            let state = ToggleState(ids.into_iter().map(MarkerId::from).collect());
            (Just(state), marker)
        })
    }

    proptest! {
        #[test]
        fn double_toggle_is_identity((state, marker) in arb_state_and_marker()) {
            let twice = toggle(marker.clone(), toggle(marker, state.clone()));
            prop_assert_eq!(twice, state);
        }

        #[test]
        fn highlighted_iff_member((state, marker) in arb_state_and_marker()) {
            let highlighted = color_for(&marker, &state) == Color::Highlighted;
            prop_assert_eq!(highlighted, state.contains(&marker));
        }

        #[test]
        fn toggling_a_member_removes_it((state, marker) in arb_state_and_marker()) {
            let was_member = state.contains(&marker);
            let before = state.len();
            let after = toggle(marker.clone(), state);
            prop_assert_eq!(after.contains(&marker), !was_member);
            if was_member {
                prop_assert_eq!(after.len(), before - 1);
            } else {
                prop_assert_eq!(after.len(), before + 1);
            }
        }
    }
}
