//! The drawing surface a rotor builder writes into.
//!
//! The solver behind a session has no object handles: every entity is created
//! by coordinates and later re-selected by the coordinate closest to it. The
//! trait keeps that shape so a script-driven backend and the in-memory
//! [`Document`](crate::document::Document) behave the same way.

use serde::{Deserialize, Serialize};

use crate::point::Point;

/// Properties attached to a straight segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProps {
    pub boundary: Option<String>,
    /// Local mesh size, 0 lets the mesher decide.
    pub max_side: f64,
    pub automesh: bool,
    pub hidden: bool,
    pub group: u32,
}

impl Default for SegmentProps {
    fn default() -> Self {
        Self {
            boundary: None,
            max_side: 0.0,
            automesh: true,
            hidden: false,
            group: 0,
        }
    }
}

impl SegmentProps {
    pub fn boundary(name: &str) -> Self {
        Self {
            boundary: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group: u32) -> Self {
        self.group = group;
        self
    }

    pub fn with_max_side(mut self, max_side: f64) -> Self {
        self.max_side = max_side;
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

/// Properties attached to an arc segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcProps {
    /// Maximum angular length of one discretisation step, degrees.
    pub max_segment_deg: f64,
    pub boundary: Option<String>,
    pub hidden: bool,
    pub group: u32,
}

impl Default for ArcProps {
    fn default() -> Self {
        Self {
            max_segment_deg: 1.0,
            boundary: None,
            hidden: false,
            group: 0,
        }
    }
}

impl ArcProps {
    pub fn boundary(name: &str) -> Self {
        Self {
            boundary: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group: u32) -> Self {
        self.group = group;
        self
    }
}

/// Properties of a block label, i.e. the material region the label sits in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockProps {
    pub material: Option<String>,
    pub automesh: bool,
    pub mesh_size: f64,
    pub circuit: Option<String>,
    /// Magnetization direction, degrees from +x.
    pub magnetization_deg: f64,
    pub group: u32,
    pub turns: i32,
}

impl Default for BlockProps {
    fn default() -> Self {
        Self {
            material: None,
            automesh: true,
            mesh_size: 0.0,
            circuit: None,
            magnetization_deg: 0.0,
            group: 0,
            turns: 0,
        }
    }
}

impl BlockProps {
    pub fn material(name: &str) -> Self {
        Self {
            material: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn magnetized(mut self, direction_deg: f64) -> Self {
        self.magnetization_deg = direction_deg;
        self
    }

    pub fn with_group(mut self, group: u32) -> Self {
        self.group = group;
        self
    }
}

/// Which entity kinds a rectangle selection picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectMode {
    Nodes,
    Segments,
    Labels,
    ArcSegments,
    All,
}

impl SelectMode {
    /// Edit-mode code used by the solver's scripting API.
    pub fn code(self) -> u8 {
        match self {
            SelectMode::Nodes => 0,
            SelectMode::Segments => 1,
            SelectMode::Labels => 2,
            SelectMode::ArcSegments => 3,
            SelectMode::All => 4,
        }
    }
}

/// Coordinate-addressed drawing surface.
///
/// `select_*` calls pick the entity closest to the given point and return its
/// reference coordinate (segment or arc midpoint, node or label position), or
/// `None` when the document holds no entity of that kind.
pub trait DrawingSession {
    fn add_node(&mut self, at: Point);
    fn add_segment(&mut self, p1: Point, p2: Point);
    /// Counter-clockwise arc from `p1` to `p2` spanning `angle_deg` (> 0).
    fn add_arc(&mut self, p1: Point, p2: Point, angle_deg: f64, max_segment_deg: f64);
    fn add_block_label(&mut self, at: Point);

    fn clear_selected(&mut self);
    fn select_segment(&mut self, near: Point) -> Option<Point>;
    fn select_arc_segment(&mut self, near: Point) -> Option<Point>;
    fn select_node(&mut self, near: Point) -> Option<Point>;
    fn select_label(&mut self, near: Point) -> Option<Point>;
    fn select_rectangle(&mut self, corner_a: Point, corner_b: Point, mode: SelectMode);

    fn set_segment_props(&mut self, props: &SegmentProps);
    fn set_arc_segment_props(&mut self, props: &ArcProps);
    fn set_block_props(&mut self, props: &BlockProps);

    /// Rotates the current selection about `center`.
    fn move_rotate(&mut self, center: Point, angle_deg: f64);
    fn delete_selected(&mut self);
}
