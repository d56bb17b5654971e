use serde::{Deserialize, Serialize};

use super::{iron_label, magnet_block, RotorBuilder, RotorOutput, RotorRadii, SURFACE_MAGNET_GAP_DEG};
use crate::draw::draw_buried_magnet;
use crate::error::Result;
use crate::point::Point;
use crate::primitives::{magnet_width_for_depth, Bounds};
use crate::session::{DrawingSession, SegmentProps};

/// Surface-magnet layout pushed below the rotor surface, leaving an iron
/// bridge above each magnet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuriedRotor {
    pub magnet_depth: f64,
    #[serde(default)]
    pub radii: RotorRadii,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuriedOutput {
    pub magnet_width: f64,
    pub magnet_depth: f64,
}

impl RotorOutput for BuriedOutput {
    fn outputs(&self) -> Vec<(&'static str, f64)> {
        vec![("magnet_width", self.magnet_width), ("magnet_depth", self.magnet_depth)]
    }
}

impl BuriedRotor {
    pub fn depth_bounds(radii: &RotorRadii) -> Bounds {
        Bounds::new(0.1, radii.outer / 2.0)
    }
}

impl RotorBuilder for BuriedRotor {
    type Output = BuriedOutput;

    fn build(&self, session: &mut dyn DrawingSession) -> Result<BuriedOutput> {
        let r = self.radii.outer;
        let depth = Self::depth_bounds(&self.radii).clamp(self.magnet_depth);
        let span = 45.0 - SURFACE_MAGNET_GAP_DEG;
        let width = magnet_width_for_depth(r, depth, span);

        let edges = SegmentProps::default().with_group(11);
        let inset = draw_buried_magnet(session, width, depth, 22.5, r, &edges, &magnet_block(11, -180.0 + span / 2.0))?;
        let edges = SegmentProps::default().with_group(12);
        draw_buried_magnet(session, width, depth, 67.5, r, &edges, &magnet_block(12, 45.0 + span / 2.0))?;

        // bridges
        iron_label(session, Point::polar(r - inset / 2.0, 22.5));
        iron_label(session, Point::polar(r - inset / 2.0, 67.5));
        iron_label(session, Point::new(r / 2.0, r / 2.0));

        Ok(BuriedOutput {
            magnet_width: width,
            magnet_depth: depth,
        })
    }
}
