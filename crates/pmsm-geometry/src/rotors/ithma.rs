use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::{iron_label, magnet_block, segment_count, HalbachSide, RotorBuilder, RotorOutput, RotorRadii};
use crate::draw::{draw_tangential_magnet, TangentialMagnet};
use crate::error::Result;
use crate::point::Point;
use crate::primitives::Bounds;
use crate::session::{DrawingSession, SegmentProps};

pub const PERIODIC_BOUNDARY: &str = "PeriodicRotor05";
pub const POLE_COUNT: f64 = 8.0;

const DEPTH_BOUNDS: Bounds = Bounds::new(0.1, 5.0);
const RATIO_BOUNDS: Bounds = Bounds::new(0.01, 0.89);
const EDGE_RATIO_BOUNDS: Bounds = Bounds::new(0.01, 0.99);
const ANGLE_BOUNDS: Bounds = Bounds::new(-89.0, 89.0);

/// How the trapezoid of the quadrature magnets is specified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum IthmaShape {
    /// Quadrature share of the pole pitch at the inner and outer radius.
    Ratios { ratio_inner: f64, ratio_outer: f64 },
    /// Mean share and the flank angle against the radial direction.
    Angle { ratio: f64, angle: f64 },
}

/// Halbach ring whose quadrature magnets are trapezoids instead of annular
/// sectors, giving inclined flanks between neighbouring magnets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IthmaRotor {
    pub magnet_depth: f64,
    pub shape: IthmaShape,
    /// Tilt of the quadrature magnetization; derived from the shape if absent.
    #[serde(default)]
    pub magangle: Option<f64>,
    #[serde(default)]
    pub side: HalbachSide,
    #[serde(default)]
    pub radii: RotorRadii,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IthmaOutput {
    pub ratio_inner: f64,
    pub ratio_outer: f64,
    pub ratio: f64,
    pub angle: f64,
    pub magangle: f64,
}

impl RotorOutput for IthmaOutput {
    fn outputs(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("ratio_inner", self.ratio_inner),
            ("ratio_outer", self.ratio_outer),
            ("ratio", self.ratio),
            ("angle", self.angle),
            ("magangle", self.magangle),
            ("x", self.angle),
            ("y", self.magangle),
        ]
    }
}

impl IthmaRotor {
    /// Magnets never reach past the shaft.
    pub fn depth_bounds(radii: &RotorRadii) -> Bounds {
        Bounds::new(DEPTH_BOUNDS.min, DEPTH_BOUNDS.max.min(radii.outer - radii.inner))
    }

    /// Resolves the shape into `(ratio_inner, ratio_outer, ratio, angle)`.
    ///
    /// The transform keeps the magnet area: the mean ratio is fixed and the
    /// inner and outer ratios move apart by the tangential offset a flank of
    /// `angle` produces across the rotor's radial extent.
    pub fn resolve_shape(&self) -> (f64, f64, f64, f64) {
        let mid = self.radii.mid();
        let dradius = (self.radii.outer - self.radii.inner).abs();
        let pitch = 2.0 * PI * mid / POLE_COUNT;
        match self.shape {
            IthmaShape::Angle { ratio, angle } => {
                let ratio = RATIO_BOUNDS.clamp(ratio);
                let angle = ANGLE_BOUNDS.clamp(angle);
                let dr = dradius / pitch / (90.0 - angle).to_radians().tan();
                let inner = EDGE_RATIO_BOUNDS.clamp(ratio + dr / 2.0);
                let outer = EDGE_RATIO_BOUNDS.clamp(ratio - dr / 2.0);
                (inner, outer, ratio, angle)
            }
            IthmaShape::Ratios {
                ratio_inner,
                ratio_outer,
            } => {
                let inner = EDGE_RATIO_BOUNDS.clamp(ratio_inner);
                let outer = EDGE_RATIO_BOUNDS.clamp(ratio_outer);
                let dratio = (outer - inner).abs();
                let ratio = (inner + outer) / 2.0;
                let flank = if dratio == 0.0 {
                    0.0
                } else {
                    90.0 - (dradius / (pitch * dratio)).atan().to_degrees()
                };
                let sign = if inner > outer { 1.0 } else { -1.0 };
                (inner, outer, ratio, sign * flank)
            }
        }
    }
}

impl RotorBuilder for IthmaRotor {
    type Output = IthmaOutput;

    fn build(&self, session: &mut dyn DrawingSession) -> Result<IthmaOutput> {
        let ro = self.radii.outer;
        let depth = Self::depth_bounds(&self.radii).clamp(self.magnet_depth);
        let (ratio_inner, ratio_outer, ratio, angle) = self.resolve_shape();
        let ha = self.side.angle();

        let pole = 90.0 / 2.0;
        let qo = pole * ratio_outer;
        let so = pole - qo;
        let qi = pole * ratio_inner;
        let si = pole - qi;

        let magangle = match self.magangle {
            Some(value) => value,
            None => {
                let p1 = Point::new(ro - depth / 2.0, 0.0);
                let p2 = Point::polar(ro - depth * 3.0 / 4.0, -(qi + qo) / 4.0);
                let d = p1 - p2;
                let tilt = d.x.abs().atan2(d.y.abs()).to_degrees();
                match self.side {
                    HalbachSide::A => tilt,
                    HalbachSide::B => -tilt,
                }
            }
        };

        let segs_quer = segment_count(qi.max(qo));
        let segs_half = segs_quer / 2;
        let segs_straight = segment_count(si.max(so));

        let rin = ro - depth;
        let sections = [
            ((0.0, qi / 2.0), (0.0, qo / 2.0), segs_half, -ha - magangle, (false, false), 11),
            ((qi / 2.0, qi / 2.0 + si), (qo / 2.0, qo / 2.0 + so), segs_straight, 180.0, (true, true), 12),
            ((qi / 2.0 + si, pole), (qo / 2.0 + so, pole), segs_half, ha + magangle, (false, true), 13),
            ((pole, qi * 1.5 + si), (pole, qo * 1.5 + so), segs_half, ha - magangle, (false, false), 13),
            (
                (qi * 1.5 + si, qi * 1.5 + 2.0 * si),
                (qo * 1.5 + so, qo * 1.5 + 2.0 * so),
                segs_straight,
                0.0,
                (true, true),
                14,
            ),
            (
                (qi * 1.5 + 2.0 * si, qi * 2.0 + 2.0 * si),
                (qo * 1.5 + 2.0 * so, qo * 2.0 + 2.0 * so),
                segs_half,
                -ha + magangle,
                (false, false),
                11,
            ),
        ];
        for (inside, outside, segments, magdir, (first, last), group) in sections {
            let magnet = TangentialMagnet::new(rin, ro, inside, outside)
                .with_segments(segments)
                .with_ends(first, last)
                .with_block(magnet_block(group, magdir));
            draw_tangential_magnet(session, &magnet);
        }

        let hlf = (ro - depth - self.radii.inner) / 2.0 + self.radii.inner;
        iron_label(session, Point::polar(hlf, 45.0));

        session.clear_selected();
        session.select_segment(Point::new(0.0, ro - depth / 2.0));
        session.select_segment(Point::new(ro - depth / 2.0, 0.0));
        session.set_segment_props(&SegmentProps::boundary(PERIODIC_BOUNDARY).with_group(5));

        Ok(IthmaOutput {
            ratio_inner,
            ratio_outer,
            ratio,
            angle,
            magangle,
        })
    }
}
