//! Document Tests
//!
//! Coordinate-addressed selection and editing on the in-memory document.

use pmsm_geometry::document::{point_arc_distance, DrawingPrimitive};
use pmsm_geometry::draw::{draw_arc, draw_line};
use pmsm_geometry::session::{ArcProps, SegmentProps, SelectMode};
use pmsm_geometry::{Document, DrawingSession, Point};

fn two_parallel_segments() -> Document {
    let mut doc = Document::new();
    doc.add_segment(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
    doc.add_segment(Point::new(0.0, 1.0), Point::new(10.0, 1.0));
    doc
}

#[test]
fn find_segment_near_picks_closest_within_tolerance() {
    let doc = two_parallel_segments();
    assert_eq!(doc.find_segment_near(Point::new(5.0, 0.4), 1.0), Some(0));
    assert_eq!(doc.find_segment_near(Point::new(5.0, 0.6), 1.0), Some(1));
    assert_eq!(doc.find_segment_near(Point::new(5.0, 5.0), 1.0), None);
}

#[test]
fn find_segment_near_breaks_ties_toward_earliest() {
    let doc = two_parallel_segments();
    assert_eq!(doc.find_segment_near(Point::new(5.0, 0.5), 1.0), Some(0));
}

#[test]
fn shared_endpoints_merge_into_one_node() {
    let mut doc = Document::new();
    doc.add_segment(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
    doc.add_segment(Point::new(1.0, 0.0), Point::new(1.0, 1.0));
    assert_eq!(doc.nodes().len(), 3);
    assert_eq!(doc.segments()[0].end, doc.segments()[1].start);
}

#[test]
fn draw_line_tags_only_the_new_segment() {
    let mut doc = two_parallel_segments();
    draw_line(
        &mut doc,
        Point::new(0.0, 3.0),
        Point::new(10.0, 3.0),
        &SegmentProps::boundary("Outer").with_group(7),
    );
    assert_eq!(doc.segments()[0].props.boundary, None);
    assert_eq!(doc.segments()[1].props.boundary, None);
    assert_eq!(doc.segments()[2].props.boundary.as_deref(), Some("Outer"));
    assert_eq!(doc.segments()[2].props.group, 7);
}

#[test]
fn negative_arc_angle_swaps_endpoints() {
    let mut doc = Document::new();
    draw_arc(
        &mut doc,
        Point::new(0.0, 1.0),
        Point::new(1.0, 0.0),
        -90.0,
        &ArcProps::default().with_group(3),
    );
    let arc = &doc.arcs()[0];
    assert_eq!(doc.nodes()[arc.start].at, Point::new(1.0, 0.0));
    assert_eq!(arc.angle_deg, 90.0);
    assert_eq!(arc.props.group, 3);
}

#[test]
fn zero_arc_angle_draws_a_line() {
    let mut doc = Document::new();
    draw_arc(&mut doc, Point::new(0.0, 0.0), Point::new(2.0, 0.0), 0.0, &ArcProps::boundary("B"));
    assert!(doc.arcs().is_empty());
    assert_eq!(doc.segments().len(), 1);
    assert_eq!(doc.segments()[0].props.boundary.as_deref(), Some("B"));
}

#[test]
fn arc_distance_measures_to_the_curve() {
    let p1 = Point::new(1.0, 0.0);
    let p2 = Point::new(0.0, 1.0);
    let d = point_arc_distance(Point::polar(2.0, 45.0), p1, p2, 90.0);
    assert!((d - 1.0).abs() < 1e-12);
    // outside the sweep the nearest endpoint wins
    let d = point_arc_distance(Point::new(1.0, -1.0), p1, p2, 90.0);
    assert!((d - 1.0).abs() < 1e-12);
}

#[test]
fn rectangle_selection_then_rotation_moves_geometry() {
    let mut doc = Document::new();
    doc.add_segment(Point::new(1.0, -1.0), Point::new(2.0, -1.0));
    doc.add_segment(Point::new(5.0, 5.0), Point::new(6.0, 5.0));
    doc.add_block_label(Point::new(1.5, -1.0));

    doc.select_rectangle(Point::new(0.0, -2.0), Point::new(3.0, 0.0), SelectMode::All);
    doc.move_rotate(Point::ORIGIN, 90.0);
    doc.clear_selected();

    let (a, b) = doc.segment_endpoints(0).unwrap();
    assert!(a.approx_eq(Point::new(1.0, 1.0), 1e-12), "{:?}", a);
    assert!(b.approx_eq(Point::new(1.0, 2.0), 1e-12), "{:?}", b);
    let (c, _) = doc.segment_endpoints(1).unwrap();
    assert_eq!(c, Point::new(5.0, 5.0));
    assert!(doc.labels()[0].at.approx_eq(Point::new(1.0, 1.5), 1e-12));
}

#[test]
fn deleting_a_node_drops_attached_edges_and_remaps() {
    let mut doc = Document::new();
    doc.add_segment(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
    doc.add_segment(Point::new(2.0, 0.0), Point::new(3.0, 0.0));
    doc.select_node(Point::new(0.1, 0.0));
    doc.delete_selected();

    assert_eq!(doc.nodes().len(), 3);
    assert_eq!(doc.segments().len(), 1);
    let (a, b) = doc.segment_endpoints(0).unwrap();
    assert_eq!(a, Point::new(2.0, 0.0));
    assert_eq!(b, Point::new(3.0, 0.0));
}

#[test]
fn primitives_come_out_in_creation_order() {
    let mut doc = Document::new();
    doc.add_block_label(Point::new(0.5, 0.5));
    doc.add_arc(Point::new(1.0, 0.0), Point::new(0.0, 1.0), 90.0, 1.0);
    doc.add_segment(Point::new(0.0, 0.0), Point::new(1.0, 0.0));

    let kinds: Vec<&str> = doc
        .primitives()
        .iter()
        .map(|p| match p {
            DrawingPrimitive::Line { .. } => "line",
            DrawingPrimitive::Arc { .. } => "arc",
            DrawingPrimitive::Label { .. } => "label",
        })
        .collect();
    assert_eq!(kinds, vec!["label", "arc", "line"]);
}

#[test]
fn primitives_serialize_with_kind_tag() {
    let mut doc = Document::new();
    doc.add_segment(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
    let json = serde_json::to_value(doc.primitives()).unwrap();
    assert_eq!(json[0]["kind"], "line");
    assert_eq!(json[0]["p2"]["x"], 1.0);
}
