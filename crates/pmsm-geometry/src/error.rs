use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeometryError {
    #[error("chord {chord} exceeds the diameter of radius {radius}")]
    ChordExceedsDiameter { radius: f64, chord: f64 },

    #[error("magnet of width {width} does not fit at tilt {tilt_deg} deg inside radius {radius}")]
    MagnetDoesNotFit {
        width: f64,
        tilt_deg: f64,
        radius: f64,
    },

    #[error("degenerate construction: {0}")]
    Degenerate(String),
}

pub type Result<T> = std::result::Result<T, GeometryError>;
