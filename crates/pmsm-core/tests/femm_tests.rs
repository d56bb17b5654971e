//! FEMM Backend Tests
//!
//! Script generation and result parsing; no FEMM installation is needed.

use pmsm_core::error::SolverError;
use pmsm_core::femm::{debug_dump_session, parse_results, FemmBackend, FemmConfig};
use pmsm_core::solver::{Excitation, SolverBackend, SolverSession};
use pmsm_geometry::draw::draw_line;
use pmsm_geometry::session::{DrawingSession, SegmentProps};
use pmsm_geometry::Point;

fn open_session(dir: &std::path::Path, executable: &str) -> pmsm_core::femm::FemmSession {
    let template = dir.join("stator.FEM");
    std::fs::write(&template, b"[Format] = 4.0\n").unwrap();
    let backend = FemmBackend::new(FemmConfig {
        executable: executable.to_string(),
        timeout_secs: 5,
    });
    backend.open(&template, &dir.join("step_00000.fem")).unwrap()
}

#[test]
fn open_copies_the_template() {
    let dir = tempfile::tempdir().unwrap();
    open_session(dir.path(), "femm");
    let copied = std::fs::read(dir.path().join("step_00000.fem")).unwrap();
    assert_eq!(copied, b"[Format] = 4.0\n");
}

#[test]
fn open_without_template_fails() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FemmBackend::default();
    let err = backend
        .open(&dir.path().join("missing.FEM"), &dir.path().join("out.fem"))
        .unwrap_err();
    assert!(matches!(err, SolverError::TemplateNotFound { .. }));
}

#[test]
fn drawing_is_recorded_as_lua_calls() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(dir.path(), "femm");
    draw_line(
        &mut session,
        Point::new(0.0, 0.0),
        Point::new(1.0, 2.0),
        &SegmentProps::boundary("A0").with_group(5),
    );
    session.add_block_label(Point::new(0.5, 0.5));
    let script = session.pending_script();
    assert!(script.contains("mi_drawline(0, 0, 1, 2)"));
    assert!(script.contains("mi_setsegmentprop(\"A0\""));
    assert!(script.contains("mi_addblocklabel(0.5, 0.5)"));
    debug_dump_session(&session);
}

#[test]
fn solve_script_sets_currents_and_position() {
    let dir = tempfile::tempdir().unwrap();
    let session = open_session(dir.path(), "femm");
    let script = session.solve_script(&Excitation {
        irms: 10.0,
        degel: 0.0,
        degmech: 22.5,
    });
    assert!(script.starts_with("opendocument("));
    assert!(script.contains("mi_modifycircprop(\"A\", 1, 10)"));
    assert!(script.contains("mi_modifyboundprop(\"SlidingBand\", 10, 22.5)"));
    assert!(script.contains("mo_gapintegral(\"SlidingBand\", 0)"));
    for group in 11..=14 {
        assert!(script.contains(&format!("mo_groupselectblock({})", group)));
    }
    assert!(script.trim_end().ends_with("quit()"));
}

#[test]
fn phase_currents_are_spread_by_120_degrees() {
    let [a, b, c] = Excitation {
        irms: 2.0,
        degel: 0.0,
        degmech: 0.0,
    }
    .phase_currents();
    assert!((a - 2.0).abs() < 1e-12);
    assert!((b + 1.0).abs() < 1e-12);
    assert!((c + 1.0).abs() < 1e-12);
}

#[test]
fn missing_executable_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(dir.path(), "definitely-not-femm-on-this-host");
    let err = session
        .solve(&Excitation {
            irms: 0.0,
            degel: 0.0,
            degmech: 0.0,
        })
        .unwrap_err();
    assert!(matches!(err, SolverError::NotFound(_)));
    assert!(dir.path().join("step_00000.lua").exists());
}

#[test]
fn closed_session_refuses_to_solve() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(dir.path(), "femm");
    session.close();
    session.close();
    let err = session
        .solve(&Excitation {
            irms: 0.0,
            degel: 0.0,
            degmech: 0.0,
        })
        .unwrap_err();
    assert!(matches!(err, SolverError::Closed));
}

#[test]
fn results_file_is_parsed_in_order() {
    let out = parse_results("1.25 0.01 -0.02 0.03 42\n").unwrap();
    assert_eq!(out.torque_airgap, 1.25);
    assert_eq!(out.flux_a, 0.01);
    assert_eq!(out.flux_b, -0.02);
    assert_eq!(out.flux_c, 0.03);
    assert_eq!(out.magarea, 42.0);
}

#[test]
fn short_or_garbled_results_are_rejected() {
    assert!(matches!(parse_results("1 2 3"), Err(SolverError::BadOutput(_))));
    assert!(matches!(parse_results("1 2 x 4 5"), Err(SolverError::BadOutput(_))));
    assert!(matches!(parse_results(""), Err(SolverError::BadOutput(_))));
}
