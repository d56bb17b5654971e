//! Rotor geometry builders.
//!
//! Every builder draws one quarter of an 8-pole rotor (two magnets per 45
//! degrees) into a session that already holds the rotor outline, and returns
//! the values it derived or clamped so they can be merged into a result row.

mod buried;
mod halbach;
mod ithma;
mod spoke;
mod surface;
mod vshape;

pub use buried::{BuriedOutput, BuriedRotor};
pub use halbach::{HalbachOutput, HalbachRotor};
pub use ithma::{IthmaOutput, IthmaRotor, IthmaShape};
pub use spoke::{SpokeOutput, SpokeRotor};
pub use surface::{SurfaceOutput, SurfaceRotor};
pub use vshape::{place_tilted_magnet, TiltedMagnet, VShapeOutput, VShapeRotor, DEFAULT_ANGLE_MARGIN};

use serde::{Deserialize, Serialize};

use crate::draw::draw_label;
use crate::error::Result;
use crate::point::Point;
use crate::session::{BlockProps, DrawingSession};

pub const OUTER_RADIUS: f64 = 16.1;
pub const INNER_RADIUS: f64 = 5.0;

pub const MAGNET_MATERIAL: &str = "N28UH";
pub const IRON_MATERIAL: &str = "50JN400";
pub const AIR_MATERIAL: &str = "Air";

pub const IRON_GROUP: u32 = 5;
/// Block groups of the magnets; the solver integrates magnet area over these.
pub const MAGNET_GROUPS: [u32; 4] = [11, 12, 13, 14];

/// Angular resolution for splitting tangential magnets, degrees per segment.
pub const ANGLE_PRECISION_DEG: f64 = 300.0;

/// Gap left between adjacent surface magnets, degrees.
pub const SURFACE_MAGNET_GAP_DEG: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotorRadii {
    pub outer: f64,
    pub inner: f64,
}

impl Default for RotorRadii {
    fn default() -> Self {
        Self {
            outer: OUTER_RADIUS,
            inner: INNER_RADIUS,
        }
    }
}

impl RotorRadii {
    pub fn mid(&self) -> f64 {
        (self.outer + self.inner) / 2.0
    }
}

/// Which way the quadrature magnets of a Halbach array point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HalbachSide {
    #[default]
    A,
    B,
}

impl HalbachSide {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "A" | "a" => Some(HalbachSide::A),
            "B" | "b" => Some(HalbachSide::B),
            _ => None,
        }
    }

    /// Magnetization offset of the quadrature magnets.
    pub fn angle(self) -> f64 {
        match self {
            HalbachSide::A => 90.0,
            HalbachSide::B => -90.0,
        }
    }
}

/// Named scalar outputs of a builder, in a fixed order.
pub trait RotorOutput {
    fn outputs(&self) -> Vec<(&'static str, f64)>;
}

pub trait RotorBuilder {
    type Output: RotorOutput;

    /// Clamps the configuration and draws the rotor.
    fn build(&self, session: &mut dyn DrawingSession) -> Result<Self::Output>;
}

pub(crate) fn magnet_block(group: u32, magnetization_deg: f64) -> BlockProps {
    BlockProps::material(MAGNET_MATERIAL)
        .magnetized(magnetization_deg)
        .with_group(group)
}

pub(crate) fn iron_label(session: &mut dyn DrawingSession, at: Point) {
    draw_label(session, at, &BlockProps::material(IRON_MATERIAL).with_group(IRON_GROUP));
}

/// Segments needed to cover `span_deg` at [`ANGLE_PRECISION_DEG`].
pub(crate) fn segment_count(span_deg: f64) -> u32 {
    (span_deg / ANGLE_PRECISION_DEG) as u32
}
