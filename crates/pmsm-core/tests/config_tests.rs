use pmsm_core::cache::CachePolicy;
use pmsm_core::config::{check_sim_name, ProjectConfig, StudyKind};
use pmsm_core::error::ConfigError;
use pmsm_core::rotor::RotorKind;

#[test]
fn defaults_fill_missing_fields() {
    let config = ProjectConfig::from_json_str("{}").unwrap();
    assert_eq!(config.symmetry_factor, 4.0);
    assert_eq!(config.workers, 12);
    assert_eq!(config.cache_policy, CachePolicy::PathExists);
    assert_eq!(config.femm.executable, "femm");
    assert!(config.simulations.is_empty());
}

#[test]
fn simulations_keep_their_parameters() {
    let raw = r#"{
        "irms": 10,
        "rpm": 1500,
        "cache_policy": "fingerprint",
        "simulations": [
            {"name": "spm", "study": "sweep_1d", "rotor": "surface",
             "steps": {"magnet_depth": [1, 5, 9]}},
            {"name": "v", "study": "static", "rotor": "vshape",
             "params": {"magnet_depth": 2, "magnet_angle": 20}}
        ]
    }"#;
    let config = ProjectConfig::from_json_str(raw).unwrap();
    assert_eq!(config.irms, 10.0);
    assert_eq!(config.cache_policy, CachePolicy::Fingerprint);
    assert_eq!(config.simulations.len(), 2);
    assert_eq!(config.simulations[0].study, StudyKind::Sweep1d);
    assert_eq!(config.simulations[1].rotor, RotorKind::VShape);
    let keys: Vec<&str> = config.simulations[1].params.keys().collect();
    assert_eq!(keys, vec!["magnet_depth", "magnet_angle"]);
    assert!((config.peak_current() - 14.142135623730951).abs() < 1e-12);
}

#[test]
fn sweep_without_steps_is_rejected() {
    let raw = r#"{"simulations": [{"name": "s", "study": "sweep_2d", "rotor": "halbach"}]}"#;
    let err = ProjectConfig::from_json_str(raw).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("no steps")));
}

#[test]
fn duplicate_names_are_rejected() {
    let raw = r#"{"simulations": [
        {"name": "a", "study": "static", "rotor": "surface"},
        {"name": "a", "study": "moving", "rotor": "surface"}
    ]}"#;
    assert!(matches!(ProjectConfig::from_json_str(raw), Err(ConfigError::Invalid(_))));
}

#[test]
fn names_that_leave_the_project_are_rejected() {
    for name in ["../x", "a/b", "a\\b", "..", "."] {
        let raw = format!(
            r#"{{"simulations": [{{"name": {}, "study": "static", "rotor": "surface"}}]}}"#,
            serde_json::to_string(name).unwrap()
        );
        let err = ProjectConfig::from_json_str(&raw).unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid(ref msg) if msg.contains("plain directory name")),
            "{name}: {err}"
        );
    }
    assert!(check_sim_name("spm_v2.1").is_ok());
}

#[test]
fn zero_workers_is_rejected() {
    assert!(matches!(
        ProjectConfig::from_json_str(r#"{"workers": 0}"#),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn unknown_rotor_is_a_parse_error() {
    let raw = r#"{"simulations": [{"name": "a", "study": "static", "rotor": "ispoke"}]}"#;
    assert!(matches!(ProjectConfig::from_json_str(raw), Err(ConfigError::Parse(_))));
}

#[test]
fn load_resolves_paths_against_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.json");
    std::fs::write(&path, r#"{"stator_path": "stator.FEM", "project_dir": "out"}"#).unwrap();
    let config = ProjectConfig::load(&path).unwrap();
    assert_eq!(config.stator_path, dir.path().join("stator.FEM"));
    assert_eq!(config.results_dir("spm"), dir.path().join("out").join("sims").join("spm"));
    assert!(config.scratch_dir("spm").ends_with("tmp/sims/spm/spm_steps"));
}

#[test]
fn missing_file_reports_its_path() {
    let err = ProjectConfig::load(std::path::Path::new("/nonexistent/project.json")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/project.json"));
}
