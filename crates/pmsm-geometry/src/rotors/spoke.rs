use serde::{Deserialize, Serialize};

use super::{iron_label, magnet_block, RotorBuilder, RotorOutput, RotorRadii};
use crate::draw::{draw_label, draw_line};
use crate::error::Result;
use crate::point::Point;
use crate::primitives::{arc_sagitta, Bounds};
use crate::session::{DrawingSession, SegmentProps, SelectMode};

pub const PERIODIC_BOUNDARY: &str = "PeriodicRotor02";

/// Radial (spoke) magnets between the shaft and the rotor surface.
///
/// The quarter holds two half magnets on the axes and one full magnet on the
/// 45 degree diagonal. The shaft arc is replaced by periodic edges running
/// down to the magnet ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpokeRotor {
    pub magnet_depth: f64,
    #[serde(default)]
    pub radii: RotorRadii,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpokeOutput {
    /// Radial length of a magnet.
    pub magnet_length: f64,
    /// Tangential thickness of a magnet.
    pub magnet_depth: f64,
}

impl RotorOutput for SpokeOutput {
    fn outputs(&self) -> Vec<(&'static str, f64)> {
        vec![("magnet_width", self.magnet_length), ("magnet_depth", self.magnet_depth)]
    }
}

impl SpokeRotor {
    pub fn depth_bounds(radii: &RotorRadii) -> Bounds {
        Bounds::new(0.1, 2.0 * 22.5_f64.to_radians().sin() * radii.inner)
    }
}

impl RotorBuilder for SpokeRotor {
    type Output = SpokeOutput;

    fn build(&self, session: &mut dyn DrawingSession) -> Result<SpokeOutput> {
        let ro = self.radii.outer;
        let ri = self.radii.inner;
        let w = Self::depth_bounds(&self.radii).clamp(self.magnet_depth);
        let hw = w / 2.0;
        let inset_out = arc_sagitta(ro, w)?;
        let inset_in = arc_sagitta(ri, w)?;
        let length = ro - ri + inset_in;
        let start = ri - inset_in;
        let end = ro - inset_out;
        let plain = SegmentProps::default();

        // half magnet along +x
        draw_line(session, Point::new(start, hw), Point::new(end, hw), &plain);
        draw_line(session, Point::new(start, 0.0), Point::new(start, hw), &plain);
        draw_label(session, Point::new(ro - hw, w / 4.0), &magnet_block(11, -90.0));

        // half magnet along +y
        draw_line(session, Point::new(hw, start), Point::new(hw, end), &plain);
        draw_line(session, Point::new(0.0, start), Point::new(hw, start), &plain);
        draw_label(session, Point::new(w / 4.0, ro - hw), &magnet_block(12, 0.0));

        // full magnet, drawn on -y and turned onto the diagonal
        draw_line(session, Point::new(hw, -start), Point::new(hw, -end), &plain);
        draw_line(session, Point::new(-hw, -start), Point::new(-hw, -end), &plain);
        draw_line(session, Point::new(-hw, -start), Point::new(hw, -start), &plain);
        session.clear_selected();
        session.select_rectangle(Point::new(-hw, -start), Point::new(hw, -end), SelectMode::All);
        session.move_rotate(Point::ORIGIN, 135.0);
        let mid = (ro - ri) / 2.0 + ri;
        draw_label(session, Point::polar(mid, 45.0), &magnet_block(13, 135.0));

        session.clear_selected();
        for angle in [0.0, 45.0, 90.0] {
            session.select_arc_segment(Point::polar(ri, angle));
        }
        session.select_node(Point::new(0.0, ri));
        session.select_node(Point::new(ri, 0.0));
        session.delete_selected();

        let periodic = SegmentProps::boundary(PERIODIC_BOUNDARY);
        draw_line(session, Point::new(start, 0.0), Point::new(ro, 0.0), &periodic);
        draw_line(session, Point::new(0.0, start), Point::new(0.0, ro), &periodic);

        iron_label(session, Point::polar(mid, 22.5));
        iron_label(session, Point::polar(mid, 67.5));

        Ok(SpokeOutput {
            magnet_length: length,
            magnet_depth: w,
        })
    }
}
