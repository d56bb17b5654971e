//! Composite drawing operations.
//!
//! Each operation creates entities on a [`DrawingSession`] and then attaches
//! properties by re-selecting at a coordinate known to lie on the new entity.

use crate::error::Result;
use crate::point::Point;
use crate::primitives::{arc_depth_from_points, arc_sagitta, normalize_angle, rectangle_corners};
use crate::session::{ArcProps, BlockProps, DrawingSession, SegmentProps, SelectMode};

/// Draws a segment and tags it. Returns the midpoint used for re-selection.
pub fn draw_line(session: &mut dyn DrawingSession, p1: Point, p2: Point, props: &SegmentProps) -> Point {
    let mid = p1.midpoint(p2);
    session.add_segment(p1, p2);
    session.clear_selected();
    session.select_segment(mid);
    session.set_segment_props(props);
    session.clear_selected();
    mid
}

/// Draws a counter-clockwise arc. A zero angle falls back to a straight
/// segment; a negative angle draws the same arc from `p2` to `p1`.
pub fn draw_arc(
    session: &mut dyn DrawingSession,
    p1: Point,
    p2: Point,
    angle_deg: f64,
    props: &ArcProps,
) -> Point {
    if angle_deg == 0.0 {
        let line = SegmentProps {
            boundary: props.boundary.clone(),
            group: props.group,
            ..SegmentProps::default()
        };
        return draw_line(session, p1, p2, &line);
    }
    let (start, end, angle) = if angle_deg < 0.0 {
        (p2, p1, -angle_deg)
    } else {
        (p1, p2, angle_deg)
    };
    session.add_arc(start, end, angle, props.max_segment_deg);
    session.clear_selected();
    let (_, mid) = arc_depth_from_points(start, end, angle);
    session.select_arc_segment(mid);
    session.set_arc_segment_props(props);
    session.clear_selected();
    mid
}

pub fn draw_label(session: &mut dyn DrawingSession, at: Point, props: &BlockProps) -> Point {
    session.add_block_label(at);
    session.clear_selected();
    session.select_label(at);
    session.set_block_props(props);
    session.clear_selected();
    at
}

/// Closed rectangle plus a label at its center. Returns the corners in
/// [`rectangle_corners`] order.
pub fn draw_rectangle(
    session: &mut dyn DrawingSession,
    center: Point,
    width: f64,
    height: f64,
    rotation_deg: f64,
    edges: &SegmentProps,
    block: &BlockProps,
) -> [Point; 4] {
    let corners = rectangle_corners(center, width, height, rotation_deg);
    for i in 0..4 {
        draw_line(session, corners[i], corners[(i + 1) % 4], edges);
    }
    draw_label(session, center, block);
    corners
}

/// Magnet sitting on the rotor surface, centred on the ray at `angle_deg`.
///
/// The magnet is drawn on the negative y axis, where its bottom edge is the
/// rotor arc, and rotated into place. Returns the sagitta of the arc under it.
pub fn draw_surface_magnet(
    session: &mut dyn DrawingSession,
    width: f64,
    height: f64,
    angle_deg: f64,
    surface_radius: f64,
    edges: &SegmentProps,
    block: &BlockProps,
) -> Result<f64> {
    let inset = arc_sagitta(surface_radius, width)?;
    let hw = width / 2.0;
    let base = -surface_radius + inset;
    let top = -surface_radius + height;
    draw_line(session, Point::new(-hw, base), Point::new(-hw, top), edges);
    draw_line(session, Point::new(hw, base), Point::new(hw, top), edges);
    draw_line(session, Point::new(-hw, top), Point::new(hw, top), edges);
    session.clear_selected();
    session.select_rectangle(Point::new(-hw, base), Point::new(hw, top), SelectMode::All);
    session.move_rotate(Point::ORIGIN, 90.0 + angle_deg);
    session.clear_selected();
    draw_label(session, Point::polar(surface_radius - height / 2.0, angle_deg), block);
    Ok(inset)
}

/// Closed rectangular magnet just below the rotor surface on the ray at
/// `angle_deg`. Returns the inset, i.e. the sagitta of the surface arc.
pub fn draw_buried_magnet(
    session: &mut dyn DrawingSession,
    width: f64,
    height: f64,
    angle_deg: f64,
    surface_radius: f64,
    edges: &SegmentProps,
    block: &BlockProps,
) -> Result<f64> {
    let inset = arc_sagitta(surface_radius, width)?;
    let hw = width / 2.0;
    let base = -surface_radius + inset;
    let top = -surface_radius + height + inset;
    draw_line(session, Point::new(-hw, base), Point::new(-hw, top), edges);
    draw_line(session, Point::new(hw, base), Point::new(hw, top), edges);
    draw_line(session, Point::new(-hw, top), Point::new(hw, top), edges);
    draw_line(session, Point::new(-hw, base), Point::new(hw, base), edges);
    session.clear_selected();
    session.select_rectangle(Point::new(-hw, base), Point::new(hw, top), SelectMode::All);
    session.move_rotate(Point::ORIGIN, 90.0 + angle_deg);
    session.clear_selected();
    draw_label(
        session,
        Point::polar(surface_radius - height / 2.0 - inset, angle_deg),
        block,
    );
    Ok(inset)
}

/// Annular magnet section between two radii, split into equal segments.
#[derive(Debug, Clone)]
pub struct TangentialMagnet {
    pub radius_inside: f64,
    pub radius_outside: f64,
    pub inside_from_deg: f64,
    pub inside_to_deg: f64,
    pub outside_from_deg: f64,
    pub outside_to_deg: f64,
    pub draw_first: bool,
    pub draw_last: bool,
    pub segments: u32,
    pub edges: SegmentProps,
    pub arcs: ArcProps,
    /// Material, group and base magnetization; each segment adds its own
    /// bisector angle to `magnetization_deg`.
    pub block: BlockProps,
}

impl TangentialMagnet {
    pub fn new(radius_inside: f64, radius_outside: f64, inside: (f64, f64), outside: (f64, f64)) -> Self {
        Self {
            radius_inside,
            radius_outside,
            inside_from_deg: inside.0,
            inside_to_deg: inside.1,
            outside_from_deg: outside.0,
            outside_to_deg: outside.1,
            draw_first: true,
            draw_last: true,
            segments: 1,
            edges: SegmentProps::default(),
            arcs: ArcProps::default(),
            block: BlockProps::default(),
        }
    }

    /// Sets the label properties and tags edges and arcs with the same group.
    pub fn with_block(mut self, block: BlockProps) -> Self {
        self.edges.group = block.group;
        self.arcs.group = block.group;
        self.block = block;
        self
    }

    pub fn with_segments(mut self, segments: u32) -> Self {
        self.segments = segments;
        self
    }

    pub fn with_ends(mut self, draw_first: bool, draw_last: bool) -> Self {
        self.draw_first = draw_first;
        self.draw_last = draw_last;
        self
    }
}

/// Draws a [`TangentialMagnet`] and returns the label positions, one per
/// segment.
///
/// Only the inner arc of each segment is drawn; the outer boundary is expected
/// to come from a neighbouring entity (the rotor surface or the next ring).
/// Radial separators between segments are hidden in post-processing.
pub fn draw_tangential_magnet(session: &mut dyn DrawingSession, magnet: &TangentialMagnet) -> Vec<Point> {
    let segments = magnet.segments.max(1);
    let n = f64::from(segments);
    let step_in = (magnet.inside_to_deg - magnet.inside_from_deg) / n;
    let step_out = (magnet.outside_to_deg - magnet.outside_from_deg) / n;

    let mut labels = Vec::with_capacity(segments as usize);
    for i in 0..segments {
        let k = f64::from(i);
        let p1_in = Point::polar(magnet.radius_inside, step_in * k + magnet.inside_from_deg);
        let p2_in = Point::polar(magnet.radius_inside, step_in * (k + 1.0) + magnet.inside_from_deg);
        let p1_out = Point::polar(magnet.radius_outside, step_out * k + magnet.outside_from_deg);
        let p2_out = Point::polar(magnet.radius_outside, step_out * (k + 1.0) + magnet.outside_from_deg);

        draw_arc(session, p1_in, p2_in, step_in, &magnet.arcs);
        if i > 0 || magnet.draw_first {
            let edges = magnet.edges.clone().with_hidden(i > 0);
            draw_line(session, p1_in, p1_out, &edges);
        }
        if i == segments - 1 && magnet.draw_last {
            draw_line(session, p2_in, p2_out, &magnet.edges);
        }

        let label_angle = k * (step_in + step_out) / 2.0
            + (step_in + step_out) / 4.0
            + (magnet.inside_from_deg + magnet.outside_from_deg) / 2.0;
        let at = p1_in + (p2_out - p1_in) / 2.0;
        let block = magnet
            .block
            .clone()
            .magnetized(normalize_angle(magnet.block.magnetization_deg + label_angle));
        labels.push(draw_label(session, at, &block));
    }
    labels
}
