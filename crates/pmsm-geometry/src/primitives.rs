//! Closed-form arc and rectangle geometry shared by all rotor builders.

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};
use crate::point::Point;

/// Inclusive validity range for one builder parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamps into `[min, max]`. NaN clamps to `min`.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() || value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Depth of the circular segment cut off by `chord` on a circle of `radius`.
pub fn arc_sagitta(radius: f64, chord: f64) -> Result<f64> {
    let half = chord / 2.0;
    let rest = radius * radius - half * half;
    if rest < 0.0 || radius <= 0.0 {
        return Err(GeometryError::ChordExceedsDiameter { radius, chord });
    }
    Ok(radius - rest.sqrt())
}

/// Sagitta of the arc from `p1` to `p2` spanning `angle_deg`, and the point on
/// the arc above the chord midpoint.
///
/// The offset direction is `(v.y, -v.x)` for `v = p2 - p1`, which is the
/// outward side for counter-clockwise arcs.
pub fn arc_depth_from_points(p1: Point, p2: Point, angle_deg: f64) -> (f64, Point) {
    let mid = p1.midpoint(p2);
    let chord = p1.distance(p2);
    if chord == 0.0 {
        return (0.0, mid);
    }
    let depth = chord / 2.0 * (angle_deg.to_radians() / 4.0).tan();
    let v = p2 - p1;
    let normal = Point::new(v.y, -v.x) / chord * depth;
    (depth, mid + normal)
}

/// `atan(chord / (radius - sagitta))` in degrees.
pub fn arc_included_angle(radius: f64, chord: f64) -> Result<f64> {
    let apothem = radius - arc_sagitta(radius, chord)?;
    Ok((chord / apothem).atan().to_degrees())
}

/// Inverse of [`arc_included_angle`] for a fixed radius.
pub fn chord_from_included_angle(radius: f64, angle_deg: f64) -> f64 {
    let t = angle_deg.to_radians().tan();
    radius * t / (1.0 + t * t / 4.0).sqrt()
}

/// Corners of a `width` x `height` rectangle centred on `center` and rotated by
/// `rotation_deg`.
///
/// Order: `(+w/2, +h/2)`, `(-w/2, +h/2)`, `(-w/2, -h/2)`, `(+w/2, -h/2)` in the
/// rectangle's own frame. Callers name corners by this index.
pub fn rectangle_corners(center: Point, width: f64, height: f64, rotation_deg: f64) -> [Point; 4] {
    let hw = width / 2.0;
    let hh = height / 2.0;
    [
        Point::new(hw, hh),
        Point::new(-hw, hh),
        Point::new(-hw, -hh),
        Point::new(hw, -hh),
    ]
    .map(|corner| corner.rotate(rotation_deg) + center)
}

/// Wraps an angle into (-180, 180].
pub fn normalize_angle(angle_deg: f64) -> f64 {
    let wrapped = angle_deg.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Width of a flat magnet of radial `depth` whose outer corners sit on
/// `outer_radius` at +-`span_deg / 2` around its axis.
pub fn magnet_width_for_depth(outer_radius: f64, depth: f64, span_deg: f64) -> f64 {
    let half = (span_deg / 2.0).to_radians();
    let h1 = outer_radius / half.cos();
    let h2 = depth / half.cos();
    let h3 = h1 - h2;
    2.0 * h3 * half.sin()
}
