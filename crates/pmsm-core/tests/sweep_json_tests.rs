//! Sweep JSON Tests
//!
//! Lowering of the declarative JSON sweep form into combos.

use pmsm_core::sweep::expand;
use pmsm_core::sweep_json::spec_from_str;
use pmsm_core::{SweepError, Value};

#[test]
fn json_range_and_scalar() {
    let spec = spec_from_str(r#"{"magnet_depth": [1, 3, 3], "rpm": 1000}"#).unwrap();
    let combos = expand(&spec).unwrap();
    assert_eq!(combos.len(), 3);
    let depths: Vec<f64> = combos.iter().map(|c| c.get_f64("magnet_depth").unwrap()).collect();
    assert_eq!(depths, vec![1.0, 2.0, 3.0]);
    assert!(combos.iter().all(|c| c.get("rpm") == Some(&Value::Int(1000))));
}

#[test]
fn json_values_list_keeps_strings() {
    let spec = spec_from_str(r#"{"halbach_side": {"values": ["A", "B"]}}"#).unwrap();
    let combos = expand(&spec).unwrap();
    let sides: Vec<&str> = combos
        .iter()
        .map(|c| c.get("halbach_side").and_then(Value::as_str).unwrap())
        .collect();
    assert_eq!(sides, vec!["A", "B"]);
}

#[test]
fn json_nested_ranges_concatenate() {
    let spec = spec_from_str(r#"{"ratio": [[0.1, 0.3, 3], [0.5, 0.9, 5]]}"#).unwrap();
    assert_eq!(expand(&spec).unwrap().len(), 8);
}

#[test]
fn json_two_element_array_is_a_list_of_scalars() {
    let spec = spec_from_str(r#"{"irms": [0, 16.97]}"#).unwrap();
    let combos = expand(&spec).unwrap();
    assert_eq!(combos.len(), 2);
    assert_eq!(combos[1].get_f64("irms"), Some(16.97));
}

#[test]
fn json_group_is_merged() {
    let spec = spec_from_str(r#"{"machine": {"rpm": 1000, "symmetry_factor": 4}}"#).unwrap();
    let combos = expand(&spec).unwrap();
    assert_eq!(combos.len(), 1);
    assert_eq!(combos[0].get_f64("rpm"), Some(1000.0));
    assert!(!combos[0].contains_key("machine"));
}

#[test]
fn json_create_derivation() {
    let raw = r#"{
        "pos": {
            "parameters": {"deg": [0, 90, 4]},
            "mode": "create",
            "func": {
                "degel": {"source": "deg", "scale": 4},
                "degmech": {"source": "deg", "offset": 45}
            }
        }
    }"#;
    let combos = expand(&spec_from_str(raw).unwrap()).unwrap();
    let angles: Vec<(f64, f64)> = combos
        .iter()
        .map(|c| (c.get_f64("degel").unwrap(), c.get_f64("degmech").unwrap()))
        .collect();
    assert_eq!(
        angles,
        vec![(0.0, 45.0), (120.0, 75.0), (240.0, 105.0), (360.0, 135.0)]
    );
}

#[test]
fn json_select_shorthand_applies_bounds() {
    let raw = r#"{
        "shape": {
            "parameters": {"ratio_inner": [0.2, 0.8, 4], "ratio_outer": [0.2, 0.8, 4]},
            "select": {"ratio_inner": {"max": 0.5}, "ratio_outer": {"min": 0.5}}
        }
    }"#;
    let combos = expand(&spec_from_str(raw).unwrap()).unwrap();
    // inner in {0.2, 0.4}, outer in {0.6, 0.8}
    assert_eq!(combos.len(), 4);
    assert!(combos.iter().all(|c| c.get_f64("ratio_inner").unwrap() <= 0.5));
    assert!(combos.iter().all(|c| c.get_f64("ratio_outer").unwrap() >= 0.5));
}

#[test]
fn json_select_by_equality() {
    let raw = r#"{
        "variant": {
            "parameters": {"halbach_side": {"values": ["A", "B"]}, "ratio": [0.2, 0.4, 2]},
            "select": {"halbach_side": "B"}
        }
    }"#;
    let combos = expand(&spec_from_str(raw).unwrap()).unwrap();
    assert_eq!(combos.len(), 2);
    assert!(combos.iter().all(|c| c.get("halbach_side") == Some(&Value::from("B"))));
}

#[test]
fn json_unknown_mode_is_rejected() {
    let raw = r#"{"pos": {"parameters": {"deg": [0, 90, 4]}, "mode": "merge", "func": {}}}"#;
    let err = spec_from_str(raw).unwrap_err();
    assert_eq!(err, SweepError::UnknownMode("merge".to_string()));
}

#[test]
fn json_fractional_count_is_rejected() {
    let err = spec_from_str(r#"{"magnet_depth": [1, 3, 2.5]}"#).unwrap_err();
    assert!(matches!(err, SweepError::InvalidSpec { key, .. } if key == "magnet_depth"));
}

#[test]
fn json_non_object_root_is_rejected() {
    assert!(spec_from_str("[1, 2, 3]").is_err());
    assert!(spec_from_str("not json").is_err());
}

#[test]
fn json_keys_keep_document_order() {
    let spec = spec_from_str(r#"{"b": [1, 2, 2], "a": [10, 20, 2]}"#).unwrap();
    let keys: Vec<&str> = spec.iter().map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["b", "a"]);

    let combos = expand(&spec).unwrap();
    let pairs: Vec<(f64, f64)> = combos
        .iter()
        .map(|c| (c.get_f64("b").unwrap(), c.get_f64("a").unwrap()))
        .collect();
    assert_eq!(pairs, vec![(1.0, 10.0), (1.0, 20.0), (2.0, 10.0), (2.0, 20.0)]);
    assert_eq!(combos[0].keys().collect::<Vec<_>>(), vec!["b", "a"]);
}

#[test]
fn json_huge_range_count_is_rejected() {
    let err = spec_from_str(r#"{"magnet_depth": [0, 1, 1e12]}"#).unwrap_err();
    assert!(matches!(
        err,
        SweepError::InvalidSpec { ref key, ref message } if key == "magnet_depth" && message.contains("limit")
    ));
}

#[test]
fn json_product_over_limit_is_rejected() {
    let raw = r#"{"a": [0, 1, 1000], "b": [0, 1, 1001]}"#;
    let spec = spec_from_str(raw).unwrap();
    let err = expand(&spec).unwrap_err();
    assert!(matches!(err, SweepError::InvalidSpec { ref key, .. } if key == "b"));
}
