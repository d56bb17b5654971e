//! Dispatch from a parameter map to a typed rotor builder.

use serde::{Deserialize, Serialize};

use pmsm_geometry::rotors::{
    BuriedRotor, HalbachRotor, HalbachSide, IthmaRotor, IthmaShape, RotorBuilder, RotorOutput,
    RotorRadii, SpokeRotor, SurfaceRotor, VShapeRotor, DEFAULT_ANGLE_MARGIN,
};
use pmsm_geometry::DrawingSession;

use crate::error::TaskError;
use crate::value::{Params, Value};

/// Smallest shaft radius, mm.
pub const MIN_INNER_RADIUS: f64 = 1.0;
/// Smallest outer radius every rotor kind fits in, mm.
pub const MIN_OUTER_RADIUS: f64 = 4.0;
/// Smallest radial distance between shaft and outer edge, mm.
pub const MIN_RING_WIDTH: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotorKind {
    #[serde(rename = "surface")]
    Surface,
    #[serde(rename = "buried")]
    Buried,
    #[serde(rename = "spoke")]
    Spoke,
    #[serde(rename = "vshape")]
    VShape,
    #[serde(rename = "ithma")]
    Ithma,
    #[serde(rename = "halbach")]
    Halbach,
}

impl RotorKind {
    pub const ALL: [RotorKind; 6] = [
        RotorKind::Surface,
        RotorKind::Buried,
        RotorKind::Spoke,
        RotorKind::VShape,
        RotorKind::Ithma,
        RotorKind::Halbach,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RotorKind::Surface => "surface",
            RotorKind::Buried => "buried",
            RotorKind::Spoke => "spoke",
            RotorKind::VShape => "vshape",
            RotorKind::Ithma => "ithma",
            RotorKind::Halbach => "halbach",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "surface" | "initial" => Some(RotorKind::Surface),
            "buried" | "burried" => Some(RotorKind::Buried),
            "spoke" => Some(RotorKind::Spoke),
            "vshape" | "v" | "vera" => Some(RotorKind::VShape),
            "ithma" => Some(RotorKind::Ithma),
            "halbach" => Some(RotorKind::Halbach),
            _ => None,
        }
    }

    /// Builds the rotor described by `params` into `session` and returns the
    /// builder's derived values.
    ///
    /// All parameters are read and checked before anything is drawn, so a
    /// missing key leaves the session untouched.
    pub fn build(self, params: &Params, session: &mut dyn DrawingSession) -> Result<Params, TaskError> {
        let radii = radii(params)?;
        let outputs = match self {
            RotorKind::Surface => {
                let rotor = SurfaceRotor {
                    magnet_depth: required_f64(params, "magnet_depth")?,
                    radii,
                };
                rotor.build(session)?.outputs()
            }
            RotorKind::Buried => {
                let rotor = BuriedRotor {
                    magnet_depth: required_f64(params, "magnet_depth")?,
                    radii,
                };
                rotor.build(session)?.outputs()
            }
            RotorKind::Spoke => {
                let rotor = SpokeRotor {
                    magnet_depth: required_f64(params, "magnet_depth")?,
                    radii,
                };
                rotor.build(session)?.outputs()
            }
            RotorKind::VShape => {
                let rotor = VShapeRotor {
                    magnet_depth: required_f64(params, "magnet_depth")?,
                    magnet_angle: required_f64(params, "magnet_angle")?,
                    angle_margin: optional_f64(params, "angle_margin")?.unwrap_or(DEFAULT_ANGLE_MARGIN),
                    radii,
                };
                rotor.build(session)?.outputs()
            }
            RotorKind::Ithma => {
                let magnet_depth = required_f64(params, "magnet_depth")?;
                let shape = if flag(params, "create_by_angle")? {
                    IthmaShape::Angle {
                        ratio: required_f64(params, "ratio")?,
                        angle: required_f64(params, "angle")?,
                    }
                } else {
                    IthmaShape::Ratios {
                        ratio_inner: required_f64(params, "ratio_inner")?,
                        ratio_outer: required_f64(params, "ratio_outer")?,
                    }
                };
                let rotor = IthmaRotor {
                    magnet_depth,
                    shape,
                    magangle: optional_f64(params, "magangle")?,
                    side: side(params),
                    radii,
                };
                rotor.build(session)?.outputs()
            }
            RotorKind::Halbach => {
                let rotor = HalbachRotor {
                    magnet_depth: required_f64(params, "magnet_depth")?,
                    ratio: required_f64(params, "ratio")?,
                    side: side(params),
                    radii,
                };
                rotor.build(session)?.outputs()
            }
        };

        let mut derived = Params::new();
        for (key, value) in outputs {
            derived.insert(key, value);
        }
        Ok(derived)
    }
}

fn required_f64(params: &Params, key: &str) -> Result<f64, TaskError> {
    optional_f64(params, key)?.ok_or_else(|| TaskError::MissingParameter(key.to_string()))
}

fn optional_f64(params: &Params, key: &str) -> Result<Option<f64>, TaskError> {
    match params.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| TaskError::InvalidParameter {
                key: key.to_string(),
                message: format!("expected a number, got {value}"),
            }),
    }
}

fn flag(params: &Params, key: &str) -> Result<bool, TaskError> {
    match params.get(key) {
        None => Ok(false),
        Some(Value::Bool(v)) => Ok(*v),
        Some(other) => other.as_f64().map(|v| v != 0.0).ok_or_else(|| TaskError::InvalidParameter {
            key: key.to_string(),
            message: format!("expected a bool, got {other}"),
        }),
    }
}

/// `A` when absent or `"A"`; any other value selects `B`.
fn side(params: &Params) -> HalbachSide {
    match params.get("halbach_side") {
        None => HalbachSide::A,
        Some(value) => match value.as_str().and_then(HalbachSide::parse) {
            Some(HalbachSide::A) => HalbachSide::A,
            _ => HalbachSide::B,
        },
    }
}

fn radii(params: &Params) -> Result<RotorRadii, TaskError> {
    let defaults = RotorRadii::default();
    let outer = optional_f64(params, "outer_radius")?.unwrap_or(defaults.outer);
    let inner = optional_f64(params, "inner_radius")?.unwrap_or(defaults.inner);
    if !inner.is_finite() || inner < MIN_INNER_RADIUS {
        return Err(TaskError::InvalidParameter {
            key: "inner_radius".to_string(),
            message: format!("must be at least {MIN_INNER_RADIUS}, got {inner}"),
        });
    }
    if !outer.is_finite() || outer < MIN_OUTER_RADIUS {
        return Err(TaskError::InvalidParameter {
            key: "outer_radius".to_string(),
            message: format!("must be at least {MIN_OUTER_RADIUS}, got {outer}"),
        });
    }
    if outer - inner < MIN_RING_WIDTH {
        return Err(TaskError::InvalidParameter {
            key: "outer_radius".to_string(),
            message: format!("must exceed inner_radius {inner} by at least {MIN_RING_WIDTH}, got {outer}"),
        });
    }
    Ok(RotorRadii { outer, inner })
}
