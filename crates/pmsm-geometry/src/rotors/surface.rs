use serde::{Deserialize, Serialize};

use super::{iron_label, magnet_block, RotorBuilder, RotorOutput, RotorRadii, SURFACE_MAGNET_GAP_DEG};
use crate::draw::draw_surface_magnet;
use crate::error::Result;
use crate::point::Point;
use crate::primitives::{arc_depth_from_points, magnet_width_for_depth, Bounds};
use crate::session::{DrawingSession, SegmentProps};

/// Two flat magnets glued onto the rotor surface per 45 degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRotor {
    pub magnet_depth: f64,
    #[serde(default)]
    pub radii: RotorRadii,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceOutput {
    pub magnet_width: f64,
    pub magnet_depth: f64,
}

impl RotorOutput for SurfaceOutput {
    fn outputs(&self) -> Vec<(&'static str, f64)> {
        vec![("magnet_width", self.magnet_width), ("magnet_depth", self.magnet_depth)]
    }
}

impl SurfaceRotor {
    pub fn span_deg() -> f64 {
        45.0 - SURFACE_MAGNET_GAP_DEG
    }

    /// The lower bound keeps the magnet deeper than the arc it sits on.
    pub fn depth_bounds(radii: &RotorRadii) -> Bounds {
        let r = radii.outer;
        let span = Self::span_deg();
        let (arc_depth, _) = arc_depth_from_points(Point::new(r, 0.0), Point::polar(r, span), span);
        Bounds::new(0.1 + arc_depth, r / 2.0)
    }
}

impl RotorBuilder for SurfaceRotor {
    type Output = SurfaceOutput;

    fn build(&self, session: &mut dyn DrawingSession) -> Result<SurfaceOutput> {
        let r = self.radii.outer;
        let depth = Self::depth_bounds(&self.radii).clamp(self.magnet_depth);
        let span = Self::span_deg();
        let width = magnet_width_for_depth(r, depth, span);
        let edges = SegmentProps::default().with_group(11);
        draw_surface_magnet(session, width, depth, 22.5, r, &edges, &magnet_block(11, -180.0 + span / 2.0))?;
        let edges = SegmentProps::default().with_group(12);
        draw_surface_magnet(session, width, depth, 67.5, r, &edges, &magnet_block(12, 45.0 + span / 2.0))?;
        iron_label(session, Point::new(r / 2.0, r / 2.0));
        Ok(SurfaceOutput {
            magnet_width: width,
            magnet_depth: depth,
        })
    }
}
