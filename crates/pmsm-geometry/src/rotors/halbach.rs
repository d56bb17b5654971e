use serde::{Deserialize, Serialize};

use super::{iron_label, magnet_block, segment_count, HalbachSide, RotorBuilder, RotorOutput, RotorRadii};
use crate::draw::{draw_tangential_magnet, TangentialMagnet};
use crate::error::Result;
use crate::point::Point;
use crate::primitives::Bounds;
use crate::session::{DrawingSession, SegmentProps};

pub const PERIODIC_BOUNDARY: &str = "PeriodicRotor05";

const DEPTH_BOUNDS: Bounds = Bounds::new(0.1, 5.0);
const RATIO_BOUNDS: Bounds = Bounds::new(0.01, 0.99);

/// Ring of five tangential magnet sections per 90 degrees: half quadrature,
/// straight, quadrature, straight, half quadrature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalbachRotor {
    pub magnet_depth: f64,
    /// Share of each pole pitch taken by the quadrature magnet.
    pub ratio: f64,
    #[serde(default)]
    pub side: HalbachSide,
    #[serde(default)]
    pub radii: RotorRadii,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HalbachOutput {
    pub magnet_depth: f64,
    pub ratio: f64,
}

impl RotorOutput for HalbachOutput {
    fn outputs(&self) -> Vec<(&'static str, f64)> {
        vec![("angle", 0.0), ("x", self.magnet_depth), ("y", self.ratio)]
    }
}

impl HalbachRotor {
    /// Magnets never reach past the shaft.
    pub fn depth_bounds(radii: &RotorRadii) -> Bounds {
        Bounds::new(DEPTH_BOUNDS.min, DEPTH_BOUNDS.max.min(radii.outer - radii.inner))
    }

    pub fn ratio_bounds() -> Bounds {
        RATIO_BOUNDS
    }
}

impl RotorBuilder for HalbachRotor {
    type Output = HalbachOutput;

    fn build(&self, session: &mut dyn DrawingSession) -> Result<HalbachOutput> {
        let ro = self.radii.outer;
        let depth = Self::depth_bounds(&self.radii).clamp(self.magnet_depth);
        let ratio = RATIO_BOUNDS.clamp(self.ratio);
        let ha = self.side.angle();

        let pole = 90.0 / 2.0;
        let quer = pole * ratio;
        let straight = pole - quer;
        let segs_quer = segment_count(quer);
        let segs_half = segs_quer / 2;
        let segs_straight = segment_count(straight);

        let rin = ro - depth;
        let sections = [
            (0.0, quer / 2.0, segs_half, -ha, false, 11),
            (quer / 2.0, quer / 2.0 + straight, segs_straight, 180.0, true, 12),
            (quer / 2.0 + straight, quer * 1.5 + straight, segs_quer, ha, false, 13),
            (quer * 1.5 + straight, quer * 1.5 + 2.0 * straight, segs_straight, 0.0, true, 14),
            (quer * 1.5 + 2.0 * straight, quer * 2.0 + 2.0 * straight, segs_half, -ha, false, 11),
        ];
        for (from, to, segments, magdir, closed, group) in sections {
            let magnet = TangentialMagnet::new(rin, ro, (from, to), (from, to))
                .with_segments(segments)
                .with_ends(closed, closed)
                .with_block(magnet_block(group, magdir));
            draw_tangential_magnet(session, &magnet);
        }

        let hlf = (ro - depth - self.radii.inner) / 2.0 + self.radii.inner;
        iron_label(session, Point::polar(hlf, 45.0));

        session.clear_selected();
        session.select_segment(Point::new(0.0, ro - depth / 2.0));
        session.select_segment(Point::new(ro - depth / 2.0, 0.0));
        session.set_segment_props(&SegmentProps::boundary(PERIODIC_BOUNDARY).with_group(5));

        Ok(HalbachOutput {
            magnet_depth: depth,
            ratio,
        })
    }
}
