//! In-memory solver used by the engine, cache and study tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pmsm_core::error::SolverError;
use pmsm_core::solver::{Excitation, SolveOutputs, SolverBackend, SolverSession};
use pmsm_geometry::rotors::{INNER_RADIUS, MAGNET_GROUPS, OUTER_RADIUS};
use pmsm_geometry::session::{ArcProps, BlockProps, SegmentProps, SelectMode};
use pmsm_geometry::{Document, DrawingSession, Point};

#[derive(Debug, Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub solves: AtomicUsize,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn solves(&self) -> usize {
        self.solves.load(Ordering::SeqCst)
    }
}

/// Opens sessions on a fresh quarter-rotor document. Opening the artifact
/// named `fail_artifact` fails.
#[derive(Debug, Default)]
pub struct MockBackend {
    pub counters: Arc<Counters>,
    pub fail_artifact: Option<String>,
}

impl MockBackend {
    pub fn failing_on(artifact_name: &str) -> Self {
        Self {
            counters: Arc::default(),
            fail_artifact: Some(artifact_name.to_string()),
        }
    }
}

impl SolverBackend for MockBackend {
    type Session = MockSession;

    fn open(&self, _template: &Path, artifact: &Path) -> Result<MockSession, SolverError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        let name = artifact.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if self.fail_artifact.as_deref() == Some(name) {
            return Err(SolverError::ExecutionFailed(format!("refusing {}", name)));
        }
        std::fs::write(artifact, b"mock")?;
        Ok(MockSession {
            doc: Document::quarter_rotor(OUTER_RADIUS, INNER_RADIUS),
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct MockSession {
    pub doc: Document,
    counters: Arc<Counters>,
}

/// Torque follows the current and position; flux follows the position.
pub fn mock_outputs(excitation: &Excitation, magnet_labels: usize) -> SolveOutputs {
    let mech = excitation.degmech.to_radians();
    SolveOutputs {
        torque_airgap: excitation.irms + excitation.degmech / 1000.0,
        flux_a: mech.sin(),
        flux_b: 0.0,
        flux_c: mech.cos(),
        magarea: magnet_labels as f64,
    }
}

impl SolverSession for MockSession {
    fn solve(&mut self, excitation: &Excitation) -> Result<SolveOutputs, SolverError> {
        self.counters.solves.fetch_add(1, Ordering::SeqCst);
        let magnets = MAGNET_GROUPS
            .iter()
            .map(|g| self.doc.labels_in_group(*g).count())
            .sum();
        Ok(mock_outputs(excitation, magnets))
    }

    fn close(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl DrawingSession for MockSession {
    fn add_node(&mut self, at: Point) {
        self.doc.add_node(at)
    }

    fn add_segment(&mut self, p1: Point, p2: Point) {
        self.doc.add_segment(p1, p2)
    }

    fn add_arc(&mut self, p1: Point, p2: Point, angle_deg: f64, max_segment_deg: f64) {
        self.doc.add_arc(p1, p2, angle_deg, max_segment_deg)
    }

    fn add_block_label(&mut self, at: Point) {
        self.doc.add_block_label(at)
    }

    fn clear_selected(&mut self) {
        self.doc.clear_selected()
    }

    fn select_segment(&mut self, near: Point) -> Option<Point> {
        self.doc.select_segment(near)
    }

    fn select_arc_segment(&mut self, near: Point) -> Option<Point> {
        self.doc.select_arc_segment(near)
    }

    fn select_node(&mut self, near: Point) -> Option<Point> {
        self.doc.select_node(near)
    }

    fn select_label(&mut self, near: Point) -> Option<Point> {
        self.doc.select_label(near)
    }

    fn select_rectangle(&mut self, corner_a: Point, corner_b: Point, mode: SelectMode) {
        self.doc.select_rectangle(corner_a, corner_b, mode)
    }

    fn set_segment_props(&mut self, props: &SegmentProps) {
        self.doc.set_segment_props(props)
    }

    fn set_arc_segment_props(&mut self, props: &ArcProps) {
        self.doc.set_arc_segment_props(props)
    }

    fn set_block_props(&mut self, props: &BlockProps) {
        self.doc.set_block_props(props)
    }

    fn move_rotate(&mut self, center: Point, angle_deg: f64) {
        self.doc.move_rotate(center, angle_deg)
    }

    fn delete_selected(&mut self) {
        self.doc.delete_selected()
    }
}
