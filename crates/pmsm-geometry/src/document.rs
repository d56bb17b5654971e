//! In-memory drawing document.
//!
//! Mirrors the solver's coordinate-addressed model closely enough to preview a
//! rotor, to check which entity a re-selection hits, and to test builders
//! without the solver. Segments are not split at crossings.

use serde::Serialize;

use crate::point::Point;
use crate::primitives::arc_depth_from_points;
use crate::session::{ArcProps, BlockProps, DrawingSession, SegmentProps, SelectMode};

/// Nodes closer than this are merged.
pub const DEFAULT_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub at: Point,
    #[serde(skip)]
    selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub seq: usize,
    pub start: usize,
    pub end: usize,
    pub props: SegmentProps,
    #[serde(skip)]
    selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArcSegment {
    pub seq: usize,
    pub start: usize,
    pub end: usize,
    pub angle_deg: f64,
    pub props: ArcProps,
    #[serde(skip)]
    selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockLabel {
    pub seq: usize,
    pub at: Point,
    pub props: BlockProps,
    #[serde(skip)]
    selected: bool,
}

/// One drawn entity, flattened for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawingPrimitive {
    Line {
        p1: Point,
        p2: Point,
        boundary: Option<String>,
        group: u32,
    },
    Arc {
        p1: Point,
        p2: Point,
        angle_deg: f64,
        boundary: Option<String>,
        group: u32,
    },
    Label {
        at: Point,
        material: Option<String>,
        magnetization_deg: f64,
        group: u32,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    nodes: Vec<Node>,
    segments: Vec<Segment>,
    arcs: Vec<ArcSegment>,
    labels: Vec<BlockLabel>,
    #[serde(skip)]
    tolerance: f64,
    #[serde(skip)]
    next_seq: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_TOLERANCE)
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            nodes: Vec::new(),
            segments: Vec::new(),
            arcs: Vec::new(),
            labels: Vec::new(),
            tolerance,
            next_seq: 0,
        }
    }

    /// Quarter rotor outline the builders expect to find in the template:
    /// radial edges, outer arc and inner (shaft) arc.
    pub fn quarter_rotor(outer_radius: f64, inner_radius: f64) -> Self {
        let mut doc = Self::new();
        doc.add_segment(Point::new(inner_radius, 0.0), Point::new(outer_radius, 0.0));
        doc.add_segment(Point::new(0.0, inner_radius), Point::new(0.0, outer_radius));
        doc.add_arc(
            Point::new(outer_radius, 0.0),
            Point::new(0.0, outer_radius),
            90.0,
            1.0,
        );
        doc.add_arc(
            Point::new(inner_radius, 0.0),
            Point::new(0.0, inner_radius),
            90.0,
            1.0,
        );
        doc
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn arcs(&self) -> &[ArcSegment] {
        &self.arcs
    }

    pub fn labels(&self) -> &[BlockLabel] {
        &self.labels
    }

    pub fn segment_endpoints(&self, index: usize) -> Option<(Point, Point)> {
        let seg = self.segments.get(index)?;
        Some((self.nodes[seg.start].at, self.nodes[seg.end].at))
    }

    pub fn labels_in_group(&self, group: u32) -> impl Iterator<Item = &BlockLabel> {
        self.labels.iter().filter(move |l| l.props.group == group)
    }

    /// Index of the segment closest to `point`, if its distance is within
    /// `tolerance`. Equal distances resolve to the earlier segment.
    pub fn find_segment_near(&self, point: Point, tolerance: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, seg) in self.segments.iter().enumerate() {
            let d = point_segment_distance(point, self.nodes[seg.start].at, self.nodes[seg.end].at);
            if d <= tolerance && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((idx, d));
            }
        }
        best.map(|(idx, _)| idx)
    }

    pub fn find_arc_near(&self, point: Point, tolerance: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, arc) in self.arcs.iter().enumerate() {
            let d = point_arc_distance(
                point,
                self.nodes[arc.start].at,
                self.nodes[arc.end].at,
                arc.angle_deg,
            );
            if d <= tolerance && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((idx, d));
            }
        }
        best.map(|(idx, _)| idx)
    }

    pub fn find_node_near(&self, point: Point, tolerance: f64) -> Option<usize> {
        nearest(self.nodes.iter().map(|n| n.at.distance(point)), tolerance)
    }

    pub fn find_label_near(&self, point: Point, tolerance: f64) -> Option<usize> {
        nearest(self.labels.iter().map(|l| l.at.distance(point)), tolerance)
    }

    /// All entities in creation order.
    pub fn primitives(&self) -> Vec<DrawingPrimitive> {
        let mut tagged: Vec<(usize, DrawingPrimitive)> = Vec::new();
        for seg in &self.segments {
            tagged.push((
                seg.seq,
                DrawingPrimitive::Line {
                    p1: self.nodes[seg.start].at,
                    p2: self.nodes[seg.end].at,
                    boundary: seg.props.boundary.clone(),
                    group: seg.props.group,
                },
            ));
        }
        for arc in &self.arcs {
            tagged.push((
                arc.seq,
                DrawingPrimitive::Arc {
                    p1: self.nodes[arc.start].at,
                    p2: self.nodes[arc.end].at,
                    angle_deg: arc.angle_deg,
                    boundary: arc.props.boundary.clone(),
                    group: arc.props.group,
                },
            ));
        }
        for label in &self.labels {
            tagged.push((
                label.seq,
                DrawingPrimitive::Label {
                    at: label.at,
                    material: label.props.material.clone(),
                    magnetization_deg: label.props.magnetization_deg,
                    group: label.props.group,
                },
            ));
        }
        tagged.sort_by_key(|(seq, _)| *seq);
        tagged.into_iter().map(|(_, p)| p).collect()
    }

    fn seq(&mut self) -> usize {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn node_index(&mut self, at: Point) -> usize {
        if let Some(idx) = self.find_node_near(at, self.tolerance) {
            return idx;
        }
        self.nodes.push(Node {
            at,
            selected: false,
        });
        self.nodes.len() - 1
    }

    fn arc_midpoint(&self, arc: &ArcSegment) -> Point {
        arc_depth_from_points(self.nodes[arc.start].at, self.nodes[arc.end].at, arc.angle_deg).1
    }
}

impl DrawingSession for Document {
    fn add_node(&mut self, at: Point) {
        self.node_index(at);
    }

    fn add_segment(&mut self, p1: Point, p2: Point) {
        let start = self.node_index(p1);
        let end = self.node_index(p2);
        if start == end {
            return;
        }
        let seq = self.seq();
        self.segments.push(Segment {
            seq,
            start,
            end,
            props: SegmentProps::default(),
            selected: false,
        });
    }

    fn add_arc(&mut self, p1: Point, p2: Point, angle_deg: f64, max_segment_deg: f64) {
        let start = self.node_index(p1);
        let end = self.node_index(p2);
        if start == end {
            return;
        }
        let seq = self.seq();
        self.arcs.push(ArcSegment {
            seq,
            start,
            end,
            angle_deg,
            props: ArcProps {
                max_segment_deg,
                ..ArcProps::default()
            },
            selected: false,
        });
    }

    fn add_block_label(&mut self, at: Point) {
        let seq = self.seq();
        self.labels.push(BlockLabel {
            seq,
            at,
            props: BlockProps::default(),
            selected: false,
        });
    }

    fn clear_selected(&mut self) {
        self.nodes.iter_mut().for_each(|n| n.selected = false);
        self.segments.iter_mut().for_each(|s| s.selected = false);
        self.arcs.iter_mut().for_each(|a| a.selected = false);
        self.labels.iter_mut().for_each(|l| l.selected = false);
    }

    fn select_segment(&mut self, near: Point) -> Option<Point> {
        let idx = self.find_segment_near(near, f64::INFINITY)?;
        self.segments[idx].selected = true;
        let seg = &self.segments[idx];
        Some(self.nodes[seg.start].at.midpoint(self.nodes[seg.end].at))
    }

    fn select_arc_segment(&mut self, near: Point) -> Option<Point> {
        let idx = self.find_arc_near(near, f64::INFINITY)?;
        self.arcs[idx].selected = true;
        Some(self.arc_midpoint(&self.arcs[idx]))
    }

    fn select_node(&mut self, near: Point) -> Option<Point> {
        let idx = self.find_node_near(near, f64::INFINITY)?;
        self.nodes[idx].selected = true;
        Some(self.nodes[idx].at)
    }

    fn select_label(&mut self, near: Point) -> Option<Point> {
        let idx = self.find_label_near(near, f64::INFINITY)?;
        self.labels[idx].selected = true;
        Some(self.labels[idx].at)
    }

    fn select_rectangle(&mut self, corner_a: Point, corner_b: Point, mode: SelectMode) {
        let lo = Point::new(corner_a.x.min(corner_b.x), corner_a.y.min(corner_b.y));
        let hi = Point::new(corner_a.x.max(corner_b.x), corner_a.y.max(corner_b.y));
        let tol = self.tolerance;
        let inside = |p: Point| {
            p.x >= lo.x - tol && p.x <= hi.x + tol && p.y >= lo.y - tol && p.y <= hi.y + tol
        };
        let all = mode == SelectMode::All;

        if all || mode == SelectMode::Nodes {
            for node in &mut self.nodes {
                if inside(node.at) {
                    node.selected = true;
                }
            }
        }
        if all || mode == SelectMode::Segments {
            for seg in &mut self.segments {
                if inside(self.nodes[seg.start].at) && inside(self.nodes[seg.end].at) {
                    seg.selected = true;
                }
            }
        }
        if all || mode == SelectMode::ArcSegments {
            let hits: Vec<usize> = self
                .arcs
                .iter()
                .enumerate()
                .filter(|(_, arc)| {
                    inside(self.nodes[arc.start].at)
                        && inside(self.nodes[arc.end].at)
                        && inside(self.arc_midpoint(arc))
                })
                .map(|(idx, _)| idx)
                .collect();
            for idx in hits {
                self.arcs[idx].selected = true;
            }
        }
        if all || mode == SelectMode::Labels {
            for label in &mut self.labels {
                if inside(label.at) {
                    label.selected = true;
                }
            }
        }
    }

    fn set_segment_props(&mut self, props: &SegmentProps) {
        for seg in self.segments.iter_mut().filter(|s| s.selected) {
            seg.props = props.clone();
        }
    }

    fn set_arc_segment_props(&mut self, props: &ArcProps) {
        for arc in self.arcs.iter_mut().filter(|a| a.selected) {
            arc.props = props.clone();
        }
    }

    fn set_block_props(&mut self, props: &BlockProps) {
        for label in self.labels.iter_mut().filter(|l| l.selected) {
            label.props = props.clone();
        }
    }

    fn move_rotate(&mut self, center: Point, angle_deg: f64) {
        let mut moving: Vec<bool> = self.nodes.iter().map(|n| n.selected).collect();
        for seg in self.segments.iter().filter(|s| s.selected) {
            moving[seg.start] = true;
            moving[seg.end] = true;
        }
        for arc in self.arcs.iter().filter(|a| a.selected) {
            moving[arc.start] = true;
            moving[arc.end] = true;
        }
        for (node, flag) in self.nodes.iter_mut().zip(moving) {
            if flag {
                node.at = node.at.rotate_about(center, angle_deg);
            }
        }
        for label in self.labels.iter_mut().filter(|l| l.selected) {
            label.at = label.at.rotate_about(center, angle_deg);
        }
    }

    fn delete_selected(&mut self) {
        let removed: Vec<bool> = self.nodes.iter().map(|n| n.selected).collect();
        self.segments
            .retain(|s| !s.selected && !removed[s.start] && !removed[s.end]);
        self.arcs
            .retain(|a| !a.selected && !removed[a.start] && !removed[a.end]);
        self.labels.retain(|l| !l.selected);

        let mut remap = vec![usize::MAX; self.nodes.len()];
        let mut kept = Vec::with_capacity(self.nodes.len());
        for (idx, node) in std::mem::take(&mut self.nodes).into_iter().enumerate() {
            if !removed[idx] {
                remap[idx] = kept.len();
                kept.push(node);
            }
        }
        self.nodes = kept;
        for seg in &mut self.segments {
            seg.start = remap[seg.start];
            seg.end = remap[seg.end];
        }
        for arc in &mut self.arcs {
            arc.start = remap[arc.start];
            arc.end = remap[arc.end];
        }
    }
}

fn nearest(distances: impl Iterator<Item = f64>, tolerance: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, d) in distances.enumerate() {
        if d <= tolerance && best.map_or(true, |(_, bd)| d < bd) {
            best = Some((idx, d));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Shortest distance from `p` to the segment `a`-`b`.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.dot(ab);
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Shortest distance from `p` to the counter-clockwise arc `p1` -> `p2`.
pub fn point_arc_distance(p: Point, p1: Point, p2: Point, angle_deg: f64) -> f64 {
    let chord = p1.distance(p2);
    let half = (angle_deg / 2.0).to_radians();
    if chord == 0.0 || half.sin() == 0.0 {
        return point_segment_distance(p, p1, p2);
    }
    let v = p2 - p1;
    let left = Point::new(-v.y, v.x) / chord;
    let center = p1.midpoint(p2) + left * (chord / 2.0 / half.tan());
    let radius = chord / 2.0 / half.sin();

    let start = (p1 - center).angle_deg();
    let rel = ((p - center).angle_deg() - start).rem_euclid(360.0);
    if rel <= angle_deg {
        ((p - center).norm() - radius).abs()
    } else {
        p.distance(p1).min(p.distance(p2))
    }
}
