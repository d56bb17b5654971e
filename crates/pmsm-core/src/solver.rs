use std::f64::consts::PI;
use std::path::Path;

use pmsm_geometry::DrawingSession;

use crate::error::{SolverError, TaskError};
use crate::value::Params;

/// One electrical / mechanical operating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Excitation {
    /// Phase current amplitude.
    pub irms: f64,
    /// Electrical angle, degrees.
    pub degel: f64,
    /// Mechanical rotor position, degrees.
    pub degmech: f64,
}

impl Excitation {
    pub fn from_params(params: &Params) -> Result<Self, TaskError> {
        let get = |key: &str| {
            params
                .get_f64(key)
                .ok_or_else(|| TaskError::MissingParameter(key.to_string()))
        };
        Ok(Self {
            irms: get("irms")?,
            degel: get("degel")?,
            degmech: get("degmech")?,
        })
    }

    /// Currents of phases A, B and C.
    pub fn phase_currents(&self) -> [f64; 3] {
        let el = self.degel.to_radians();
        [
            self.irms * el.cos(),
            self.irms * (el + 2.0 * PI / 3.0).cos(),
            self.irms * (el - 2.0 * PI / 3.0).cos(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolveOutputs {
    pub torque_airgap: f64,
    pub flux_a: f64,
    pub flux_b: f64,
    pub flux_c: f64,
    pub magarea: f64,
}

impl SolveOutputs {
    pub fn write_into(&self, row: &mut Params) {
        row.insert("magarea", self.magarea);
        row.insert("torque_airgap", self.torque_airgap);
        row.insert("flux_a", self.flux_a);
        row.insert("flux_b", self.flux_b);
        row.insert("flux_c", self.flux_c);
    }
}

/// A document opened in the solver. Geometry is drawn through the
/// [`DrawingSession`] half; `solve` meshes and solves the current state.
pub trait SolverSession: DrawingSession {
    fn solve(&mut self, excitation: &Excitation) -> Result<SolveOutputs, SolverError>;
    /// Releases the session. Safe to call more than once.
    fn close(&mut self);
}

pub trait SolverBackend: Sync {
    type Session: SolverSession;

    /// Opens a fresh session on a copy of `template` stored at `artifact`.
    fn open(&self, template: &Path, artifact: &Path) -> Result<Self::Session, SolverError>;
}
