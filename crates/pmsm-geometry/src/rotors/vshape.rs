use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use super::{magnet_block, RotorBuilder, RotorOutput, RotorRadii, AIR_MATERIAL, IRON_MATERIAL};
use crate::draw::{draw_label, draw_line, draw_rectangle};
use crate::error::{GeometryError, Result};
use crate::point::Point;
use crate::primitives::{normalize_angle, Bounds};
use crate::session::{BlockProps, DrawingSession, SegmentProps};

pub const DEFAULT_ANGLE_MARGIN: f64 = 0.5;
pub const PERIODIC_BOUNDARY: &str = "PeriodicRotor04";

const DEPTH_BOUNDS: Bounds = Bounds::new(0.1, 3.0);
const TILT_BOUNDS: Bounds = Bounds::new(-50.0, 50.0);

/// A rectangular magnet wedged into an angular sector of the rotor.
#[derive(Debug, Clone, PartialEq)]
pub struct TiltedMagnet {
    /// Extent of the magnet along its own axis, solved so the outer corner
    /// touches the sector edge.
    pub height: f64,
    /// Corners in `rectangle_corners` order.
    pub corners: [Point; 4],
}

/// Places a `width`-thick magnet in the sector `from_deg..to_deg`, tilted by
/// `tilt_deg` from the sector bisector, with its outer corner on `radius`.
///
/// The shape is solved in a frame where the sector starts on +x: the magnet's
/// first edge meets the x axis at distance `c` (law of sines on the triangle
/// origin / edge foot / outer corner), then the height follows from whichever
/// corner reaches the far sector edge first. Negative tilts are mirrored about
/// the bisector. `reversed` flips the magnetization by 180 degrees.
pub fn place_tilted_magnet(
    session: &mut dyn DrawingSession,
    from_deg: f64,
    to_deg: f64,
    width: f64,
    tilt_deg: f64,
    reversed: bool,
    radius: f64,
    group: u32,
) -> Result<TiltedMagnet> {
    let tilt_deg = TILT_BOUNDS.clamp(tilt_deg);
    let span_deg = to_deg - from_deg;
    let span = span_deg.to_radians();
    let tilt = (tilt_deg.abs() + span_deg / 2.0).to_radians();

    let a = width;
    let b = radius;
    let beta = PI - tilt;
    let sin_alpha = a * tilt.sin() / b;
    if !(-1.0..=1.0).contains(&sin_alpha) {
        return Err(GeometryError::MagnetDoesNotFit {
            width,
            tilt_deg,
            radius,
        });
    }
    let alpha = sin_alpha.asin();
    let gamma = PI - alpha - beta;
    let c = (a * a + b * b - 2.0 * a * b * gamma.cos()).sqrt();

    let p1 = Point::new(c, 0.0);
    let p2 = p1 + Point::new(a * tilt.cos(), a * tilt.sin());
    let (height, p3) = if tilt.abs() < span {
        let a1 = span;
        let a2 = beta - FRAC_PI_2;
        let a3 = PI - a1 - a2;
        let height = c * a1.sin() / a3.sin();
        let r2 = (height * height + c * c - 2.0 * height * c * a2.cos()).sqrt();
        let p4 = Point::new(r2 * span.cos(), r2 * span.sin());
        (height, p2 + p4 - p1)
    } else {
        let a1 = span - alpha;
        let a2 = FRAC_PI_2 - gamma;
        let a3 = PI - a1 - a2;
        let height = b * a1.sin() / a3.sin();
        let r2 = (height * height + b * b - 2.0 * height * b * a2.cos()).sqrt();
        (height, Point::new(r2 * span.cos(), r2 * span.sin()))
    };
    if !height.is_finite() || !p3.x.is_finite() || !p3.y.is_finite() {
        return Err(GeometryError::Degenerate(format!(
            "tilted magnet in sector {from_deg}..{to_deg} deg has no finite height"
        )));
    }

    let mut center = p1 + (p3 - p1) / 2.0;
    if tilt_deg < 0.0 {
        center = center.mirror(span_deg / 2.0);
    }
    let center = center.rotate(from_deg);

    let axis_deg = tilt_deg + from_deg + span_deg / 2.0;
    let magnetization = normalize_angle(if reversed { axis_deg - 180.0 } else { axis_deg });
    let corners = draw_rectangle(
        session,
        center,
        width,
        height,
        axis_deg,
        &SegmentProps::default().with_group(group),
        &magnet_block(group, magnetization),
    );
    Ok(TiltedMagnet { height, corners })
}

/// Two V-shaped pairs of buried magnets per 90 degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VShapeRotor {
    pub magnet_depth: f64,
    pub magnet_angle: f64,
    #[serde(default = "default_margin")]
    pub angle_margin: f64,
    #[serde(default)]
    pub radii: RotorRadii,
}

fn default_margin() -> f64 {
    DEFAULT_ANGLE_MARGIN
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VShapeOutput {
    pub magnet_width: f64,
    pub magnet_depth: f64,
    pub magnet_angle: f64,
}

impl RotorOutput for VShapeOutput {
    fn outputs(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("magnet_width", self.magnet_width),
            ("x", self.magnet_depth),
            ("y", self.magnet_angle),
        ]
    }
}

impl VShapeRotor {
    pub fn depth_bounds() -> Bounds {
        DEPTH_BOUNDS
    }

    pub fn angle_bounds() -> Bounds {
        TILT_BOUNDS
    }
}

impl RotorBuilder for VShapeRotor {
    type Output = VShapeOutput;

    fn build(&self, session: &mut dyn DrawingSession) -> Result<VShapeOutput> {
        let ro = self.radii.outer;
        let ri = self.radii.inner;
        let width = DEPTH_BOUNDS.clamp(self.magnet_depth);
        let tilt = TILT_BOUNDS.clamp(self.magnet_angle);
        let m = self.angle_margin / 2.0;
        let q = 90.0 / 4.0;

        let m1 = place_tilted_magnet(session, m, q - m, width, tilt, true, ro, 11)?;
        let m2 = place_tilted_magnet(session, q + m, 2.0 * q - m, width, -tilt, true, ro, 12)?;
        let m3 = place_tilted_magnet(session, 2.0 * q + m, 3.0 * q - m, width, tilt, false, ro, 13)?;
        let m4 = place_tilted_magnet(session, 3.0 * q + m, 4.0 * q - m, width, -tilt, false, ro, 14)?;

        let [_, p1, p5, p6] = m1.corners;
        let [p9, _, p2, p12] = m2.corners;
        let [_, p3, p10, p11] = m3.corners;
        let [p7, p8, p4, p34] = m4.corners;

        let plain = SegmentProps::default();
        draw_line(session, p1, p2, &plain);
        draw_line(session, p3, p4, &plain);

        let air = BlockProps::material(AIR_MATERIAL);
        for pocket in [
            (p1 + p2 + p12) / 3.0,
            (p3 + p4 + p34) / 3.0,
            (p5 + p6 + Point::new(ro, 0.0)) / 3.0,
            (p7 + p8 + Point::new(0.0, ro)) / 3.0,
            (p9 + p10 + p11) / 3.0,
        ] {
            draw_label(session, pocket, &air);
        }

        let iron = BlockProps::material(IRON_MATERIAL);
        draw_label(session, Point::polar(ro - 0.1, 22.5), &iron);
        draw_label(session, Point::polar(ro - 0.1, 67.5), &iron);
        draw_label(session, Point::polar((ro - ri) / 2.0 + ri, 45.0), &iron);

        session.clear_selected();
        session.select_segment(Point::new(0.0, ro - 0.01));
        session.select_segment(Point::new(ro - 0.01, 0.0));
        session.set_segment_props(&SegmentProps::boundary(PERIODIC_BOUNDARY).with_max_side(1.0));
        session.clear_selected();

        Ok(VShapeOutput {
            magnet_width: m1.height,
            magnet_depth: width,
            magnet_angle: tilt,
        })
    }
}
