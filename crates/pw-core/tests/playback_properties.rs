//! Property-based tests for navigation and alert edge invariants.

use std::sync::Arc;

use proptest::prelude::*;
use pw_core::alert::{AlertEdge, AlertEdgeDetector};
use pw_core::replay::{scenarios::uniform_series, ReplayStore};
use pw_core::tier::{classify, TierKey};

#[derive(Debug, Clone)]
enum Nav {
    Seek(i64),
    Position(f64),
    Fraction(f64),
    Forward,
    Backward,
}

fn nav_strategy() -> impl Strategy<Value = Nav> {
    prop_oneof![
        any::<i64>().prop_map(Nav::Seek),
        (-1e6f64..1e6).prop_map(Nav::Position),
        (-2.0f64..3.0).prop_map(Nav::Fraction),
        Just(Nav::Forward),
        Just(Nav::Backward),
    ]
}

fn apply(store: &mut ReplayStore, nav: &Nav) {
    match *nav {
        Nav::Seek(t) => store.seek(t),
        Nav::Position(t) => store.seek_position(t),
        Nav::Fraction(f) => store.seek_by_fraction(f),
        Nav::Forward => store.step_forward(),
        Nav::Backward => store.step_backward(),
    };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn index_always_in_bounds(len in 1usize..64, navs in prop::collection::vec(nav_strategy(), 0..40)) {
        let mut store = ReplayStore::new();
        store.load(Arc::new(uniform_series(len, None).unwrap())).expect("valid series");
        for nav in &navs {
            apply(&mut store, nav);
            let index = store.current_index().expect("loaded");
            prop_assert!(index < len, "index {} out of bounds for {}", index, len);
            prop_assert_eq!(store.active_frame().map(|f| f.index), Some(index));
        }
    }

    #[test]
    fn seek_is_idempotent(len in 1usize..64, target in any::<i64>()) {
        let mut store = ReplayStore::new();
        store.load(Arc::new(uniform_series(len, None).unwrap())).expect("valid series");
        store.seek(target);
        let first = store.current_index();
        let change = store.seek(target).expect("loaded");
        prop_assert!(!change.moved());
        prop_assert_eq!(store.current_index(), first);
    }

    #[test]
    fn fraction_seek_matches_rounding(len in 1usize..200, fraction in 0.0f64..=1.0) {
        let mut store = ReplayStore::new();
        store.load(Arc::new(uniform_series(len, None).unwrap())).expect("valid series");
        store.seek_by_fraction(fraction);
        let expected = (fraction * (len - 1) as f64).round() as usize;
        prop_assert_eq!(store.current_index(), Some(expected));
    }

    #[test]
    fn fired_and_rearmed_alternate(threshold in 0usize..32, indices in prop::collection::vec(0usize..40, 1..80)) {
        let mut detector = AlertEdgeDetector::new(Some(threshold));
        let mut last_fired = None;
        for index in indices {
            match detector.observe(index) {
                Some(AlertEdge::Fired { index, .. }) => {
                    prop_assert!(index >= threshold);
                    prop_assert_ne!(last_fired, Some(true));
                    last_fired = Some(true);
                }
                Some(AlertEdge::Rearmed { index, .. }) => {
                    prop_assert!(index < threshold);
                    prop_assert_eq!(last_fired, Some(true));
                    last_fired = Some(false);
                }
                None => {}
            }
            prop_assert_eq!(detector.has_fired(), index >= threshold);
        }
    }

    #[test]
    fn classify_never_fails(label in ".{0,24}") {
        let display = classify(&label);
        prop_assert!(TierKey::ALL.contains(&display.key));
        prop_assert!(display.display_color.starts_with('#'));
    }
}
