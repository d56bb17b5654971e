//! Sweep Expansion Tests
//!
//! Cartesian product order, ranges, groups and nested select/create entries.

use pmsm_core::sweep::{expand, linspace, NestedSweep, SweepSpec, SweepValue};
use pmsm_core::{Params, SweepError, Value};
use proptest::prelude::*;

#[test]
fn empty_spec_yields_one_empty_combo() {
    let combos = expand(&SweepSpec::new()).unwrap();
    assert_eq!(combos.len(), 1);
    assert!(combos[0].is_empty());
}

#[test]
fn last_key_varies_fastest() {
    let spec = SweepSpec::new()
        .with("a", SweepValue::list([1.0, 2.0]))
        .with("b", SweepValue::list(["x", "y", "z"]));
    let combos = expand(&spec).unwrap();
    assert_eq!(combos.len(), 6);
    let pairs: Vec<(f64, String)> = combos
        .iter()
        .map(|c| (c.get_f64("a").unwrap(), c.get("b").unwrap().to_string()))
        .collect();
    assert_eq!(pairs[0], (1.0, "x".to_string()));
    assert_eq!(pairs[1], (1.0, "y".to_string()));
    assert_eq!(pairs[3], (2.0, "x".to_string()));
    assert_eq!(pairs[5], (2.0, "z".to_string()));
}

#[test]
fn range_includes_both_endpoints() {
    let values = linspace(0.0, 90.0, 270);
    assert_eq!(values.len(), 270);
    assert_eq!(values[0], 0.0);
    assert_eq!(values[269], 90.0);
    assert!(values.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn range_of_one_is_its_start() {
    assert_eq!(linspace(2.5, 7.0, 1), vec![2.5]);
    assert!(linspace(2.5, 7.0, 0).is_empty());
}

#[test]
fn zero_count_range_empties_the_sweep() {
    let spec = SweepSpec::new()
        .with("a", SweepValue::range(0.0, 1.0, 0))
        .with("b", 3.0);
    assert!(expand(&spec).unwrap().is_empty());
}

#[test]
fn non_finite_range_is_rejected() {
    let spec = SweepSpec::new().with("a", SweepValue::range(0.0, f64::NAN, 3));
    let err = expand(&spec).unwrap_err();
    assert!(matches!(err, SweepError::InvalidSpec { key, .. } if key == "a"));
}

#[test]
fn concat_appends_ranges_in_order() {
    let spec = SweepSpec::new().with(
        "ratio",
        SweepValue::Concat(vec![SweepValue::range(0.1, 0.3, 3), SweepValue::range(0.5, 0.9, 2)]),
    );
    let values: Vec<f64> = expand(&spec)
        .unwrap()
        .iter()
        .map(|c| c.get_f64("ratio").unwrap())
        .collect();
    assert_eq!(values.len(), 5);
    assert_eq!(values[0], 0.1);
    assert_eq!(values[2], 0.3);
    assert_eq!(values[3], 0.5);
    assert_eq!(values[4], 0.9);
}

#[test]
fn group_entries_are_merged_into_the_combo() {
    let spec = SweepSpec::new()
        .with("magnet_depth", SweepValue::list([1.0, 2.0]))
        .with(
            "machine",
            SweepValue::Group(Params::new().with("rpm", 1000.0).with("symmetry_factor", 4.0)),
        );
    let combos = expand(&spec).unwrap();
    assert_eq!(combos.len(), 2);
    for combo in &combos {
        assert!(!combo.contains_key("machine"));
        assert_eq!(combo.get_f64("rpm"), Some(1000.0));
        assert_eq!(combo.get_f64("symmetry_factor"), Some(4.0));
    }
}

#[test]
fn create_derives_electrical_and_mechanical_angles() {
    let positions = SweepSpec::new().with("deg", SweepValue::range(0.0, 90.0, 4));
    let pos = NestedSweep::create(positions, |combo| {
        let deg = combo.get_f64("deg")?;
        Some(Params::new().with("degel", 4.0 * deg).with("degmech", deg + 45.0))
    });
    let spec = SweepSpec::new().with("irms", 12.0).with("pos", pos);
    let combos = expand(&spec).unwrap();

    let angles: Vec<(f64, f64)> = combos
        .iter()
        .map(|c| (c.get_f64("degel").unwrap(), c.get_f64("degmech").unwrap()))
        .collect();
    assert_eq!(
        angles,
        vec![(0.0, 45.0), (120.0, 75.0), (240.0, 105.0), (360.0, 135.0)]
    );
    assert!(combos.iter().all(|c| !c.contains_key("deg") && !c.contains_key("pos")));
    assert!(combos.iter().all(|c| c.get_f64("irms") == Some(12.0)));
}

#[test]
fn create_drops_none_results() {
    let positions = SweepSpec::new().with("deg", SweepValue::list([0.0, 10.0, 20.0]));
    let pos = NestedSweep::create(positions, |combo| {
        let deg = combo.get_f64("deg")?;
        (deg != 10.0).then(|| Params::new().with("degmech", deg))
    });
    let combos = expand(&SweepSpec::new().with("pos", pos)).unwrap();
    assert_eq!(combos.len(), 2);
}

#[test]
fn select_filters_before_the_product() {
    let inner = SweepSpec::new()
        .with("x", SweepValue::list([1.0, 2.0, 3.0]))
        .with("y", SweepValue::list([1.0, 2.0, 3.0]));
    let below_diagonal = NestedSweep::select(inner, |c| c.get_f64("x") > c.get_f64("y"));
    let spec = SweepSpec::new()
        .with("shape", below_diagonal)
        .with("side", SweepValue::list(["A", "B"]));
    let combos = expand(&spec).unwrap();
    // 3 pairs with x > y, times two sides
    assert_eq!(combos.len(), 6);
    assert!(combos
        .iter()
        .all(|c| c.get_f64("x").unwrap() > c.get_f64("y").unwrap()));
    assert_eq!(combos[0].get("side"), Some(&Value::from("A")));
    assert_eq!(combos[1].get("side"), Some(&Value::from("B")));
}

#[test]
fn expansion_is_deterministic() {
    let spec = SweepSpec::new()
        .with("a", SweepValue::range(1.0, 3.0, 3))
        .with("b", SweepValue::list([true, false]));
    assert_eq!(expand(&spec).unwrap(), expand(&spec).unwrap());
}

proptest! {
    #[test]
    fn cardinality_is_product_of_key_lengths(counts in prop::collection::vec(0usize..5, 0..4)) {
        let mut spec = SweepSpec::new();
        for (i, count) in counts.iter().enumerate() {
            spec.insert(&format!("k{}", i), SweepValue::range(0.0, 1.0, *count));
        }
        let combos = expand(&spec).unwrap();
        let expected: usize = counts.iter().product();
        prop_assert_eq!(combos.len(), expected);
        for combo in &combos {
            prop_assert_eq!(combo.len(), counts.len());
        }
    }

    #[test]
    fn range_stays_within_bounds(start in -100.0f64..100.0, span in 0.0f64..50.0, count in 1usize..40) {
        let end = start + span;
        let values = linspace(start, end, count);
        prop_assert_eq!(values.len(), count);
        prop_assert_eq!(values[0], start);
        prop_assert_eq!(values[count - 1], if count == 1 { start } else { end });
        for v in values {
            prop_assert!(v >= start - 1e-9 && v <= end + 1e-9);
        }
    }
}
