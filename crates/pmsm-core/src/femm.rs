//! FEMM backend.
//!
//! FEMM is driven through its Lua console: a session accumulates `mi_*`
//! drawing calls, and every solve writes one script that opens the artifact,
//! replays pending drawing, saves, sets the excitation, solves and writes the
//! queried integrals to a results file, which is parsed afterwards.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use pmsm_geometry::rotors::MAGNET_GROUPS;
use pmsm_geometry::session::{ArcProps, BlockProps, DrawingSession, SegmentProps, SelectMode};
use pmsm_geometry::Point;

use crate::error::SolverError;
use crate::solver::{Excitation, SolveOutputs, SolverBackend, SolverSession};

pub const SLIDING_BAND: &str = "SlidingBand";
const NONE_PROP: &str = "<None>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FemmConfig {
    /// FEMM executable (default: "femm" in PATH).
    pub executable: String,
    /// Timeout for one solve, in seconds.
    pub timeout_secs: u64,
}

impl Default for FemmConfig {
    fn default() -> Self {
        Self {
            executable: "femm".to_string(),
            timeout_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FemmBackend {
    pub config: FemmConfig,
}

impl FemmBackend {
    pub fn new(config: FemmConfig) -> Self {
        Self { config }
    }
}

impl SolverBackend for FemmBackend {
    type Session = FemmSession;

    fn open(&self, template: &Path, artifact: &Path) -> Result<FemmSession, SolverError> {
        if !template.exists() {
            return Err(SolverError::TemplateNotFound {
                path: template.to_path_buf(),
            });
        }
        fs::copy(template, artifact)?;
        Ok(FemmSession {
            config: self.config.clone(),
            artifact: artifact.to_path_buf(),
            pending: String::new(),
            closed: false,
        })
    }
}

#[derive(Debug)]
pub struct FemmSession {
    config: FemmConfig,
    artifact: PathBuf,
    pending: String,
    closed: bool,
}

impl FemmSession {
    /// Drawing calls not yet flushed into the artifact.
    pub fn pending_script(&self) -> &str {
        &self.pending
    }

    fn script_path(&self) -> PathBuf {
        self.artifact.with_extension("lua")
    }

    fn results_path(&self) -> PathBuf {
        self.artifact.with_extension("out")
    }

    fn emit(&mut self, line: String) {
        self.pending.push_str(&line);
        self.pending.push('\n');
    }

    /// Full script for one solve at `excitation`.
    pub fn solve_script(&self, excitation: &Excitation) -> String {
        let artifact = lua_path(&self.artifact);
        let results = lua_path(&self.results_path());
        let [ia, ib, ic] = excitation.phase_currents();

        let mut out = String::new();
        out.push_str(&format!("opendocument({})\n", lua_str(&artifact)));
        out.push_str(&self.pending);
        out.push_str(&format!("mi_saveas({})\n", lua_str(&artifact)));
        out.push_str(&format!("mi_modifycircprop(\"A\", 1, {})\n", ia));
        out.push_str(&format!("mi_modifycircprop(\"B\", 1, {})\n", ib));
        out.push_str(&format!("mi_modifycircprop(\"C\", 1, {})\n", ic));
        out.push_str(&format!(
            "mi_modifyboundprop({}, 10, {})\n",
            lua_str(SLIDING_BAND),
            excitation.degmech
        ));
        out.push_str("mi_smartmesh(0)\n");
        out.push_str("mi_analyze(1)\n");
        out.push_str("mi_loadsolution()\n");
        out.push_str("mo_smoothoff()\n");
        out.push_str(&format!("torque = mo_gapintegral({}, 0)\n", lua_str(SLIDING_BAND)));
        out.push_str("mo_clearblock()\n");
        for group in MAGNET_GROUPS {
            out.push_str(&format!("mo_groupselectblock({})\n", group));
        }
        out.push_str("magarea = mo_blockintegral(5)\n");
        out.push_str("_, _, flux_a = mo_getcircuitproperties(\"A\")\n");
        out.push_str("_, _, flux_b = mo_getcircuitproperties(\"B\")\n");
        out.push_str("_, _, flux_c = mo_getcircuitproperties(\"C\")\n");
        out.push_str("mo_close()\n");
        out.push_str(&format!("handle = openfile({}, \"w\")\n", lua_str(&results)));
        out.push_str(
            "write(handle, torque, \" \", flux_a, \" \", flux_b, \" \", flux_c, \" \", magarea, \"\\n\")\n",
        );
        out.push_str("closefile(handle)\n");
        out.push_str("mi_close()\n");
        out.push_str("quit()\n");
        out
    }
}

impl DrawingSession for FemmSession {
    fn add_node(&mut self, at: Point) {
        self.emit(format!("mi_addnode({}, {})", at.x, at.y));
    }

    fn add_segment(&mut self, p1: Point, p2: Point) {
        self.emit(format!("mi_drawline({}, {}, {}, {})", p1.x, p1.y, p2.x, p2.y));
    }

    fn add_arc(&mut self, p1: Point, p2: Point, angle_deg: f64, max_segment_deg: f64) {
        self.emit(format!(
            "mi_drawarc({}, {}, {}, {}, {}, {})",
            p1.x, p1.y, p2.x, p2.y, angle_deg, max_segment_deg
        ));
    }

    fn add_block_label(&mut self, at: Point) {
        self.emit(format!("mi_addblocklabel({}, {})", at.x, at.y));
    }

    fn clear_selected(&mut self) {
        self.emit("mi_clearselected()".to_string());
    }

    fn select_segment(&mut self, near: Point) -> Option<Point> {
        self.emit(format!("mi_selectsegment({}, {})", near.x, near.y));
        Some(near)
    }

    fn select_arc_segment(&mut self, near: Point) -> Option<Point> {
        self.emit(format!("mi_selectarcsegment({}, {})", near.x, near.y));
        Some(near)
    }

    fn select_node(&mut self, near: Point) -> Option<Point> {
        self.emit(format!("mi_selectnode({}, {})", near.x, near.y));
        Some(near)
    }

    fn select_label(&mut self, near: Point) -> Option<Point> {
        self.emit(format!("mi_selectlabel({}, {})", near.x, near.y));
        Some(near)
    }

    fn select_rectangle(&mut self, corner_a: Point, corner_b: Point, mode: SelectMode) {
        self.emit(format!(
            "mi_selectrectangle({}, {}, {}, {}, {})",
            corner_a.x,
            corner_a.y,
            corner_b.x,
            corner_b.y,
            mode.code()
        ));
    }

    fn set_segment_props(&mut self, props: &SegmentProps) {
        self.emit(format!(
            "mi_setsegmentprop({}, {}, {}, {}, {})",
            lua_prop(props.boundary.as_deref()),
            props.max_side,
            u8::from(props.automesh),
            u8::from(props.hidden),
            props.group
        ));
    }

    fn set_arc_segment_props(&mut self, props: &ArcProps) {
        self.emit(format!(
            "mi_setarcsegmentprop({}, {}, {}, {})",
            props.max_segment_deg,
            lua_prop(props.boundary.as_deref()),
            u8::from(props.hidden),
            props.group
        ));
    }

    fn set_block_props(&mut self, props: &BlockProps) {
        self.emit(format!(
            "mi_setblockprop({}, {}, {}, {}, {}, {}, {})",
            lua_prop(props.material.as_deref()),
            u8::from(props.automesh),
            props.mesh_size,
            lua_prop(props.circuit.as_deref()),
            props.magnetization_deg,
            props.group,
            props.turns
        ));
    }

    fn move_rotate(&mut self, center: Point, angle_deg: f64) {
        self.emit(format!("mi_moverotate({}, {}, {})", center.x, center.y, angle_deg));
    }

    fn delete_selected(&mut self) {
        self.emit("mi_deleteselected()".to_string());
    }
}

impl SolverSession for FemmSession {
    fn solve(&mut self, excitation: &Excitation) -> Result<SolveOutputs, SolverError> {
        if self.closed {
            return Err(SolverError::Closed);
        }
        let script_path = self.script_path();
        let results_path = self.results_path();
        fs::write(&script_path, self.solve_script(excitation))?;
        if results_path.exists() {
            fs::remove_file(&results_path)?;
        }

        let child = Command::new(&self.config.executable)
            .arg(format!("-lua-script={}", script_path.display()))
            .arg("-windowhide")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SolverError::NotFound(format!("{}: {}", self.config.executable, e)))?;
        let output = wait_with_timeout(child, Duration::from_secs(self.config.timeout_secs))?;
        if !output.status.success() {
            return Err(SolverError::ExecutionFailed(format!(
                "femm exited with {}\nstderr: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let raw = fs::read_to_string(&results_path)
            .map_err(|e| SolverError::BadOutput(format!("failed to read {}: {}", results_path.display(), e)))?;
        let outputs = parse_results(&raw)?;
        // drawing is now part of the saved artifact
        self.pending.clear();
        Ok(outputs)
    }

    fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
    }
}

/// Parses `torque flux_a flux_b flux_c magarea` from the results file.
pub fn parse_results(raw: &str) -> Result<SolveOutputs, SolverError> {
    let values = raw
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| SolverError::BadOutput(format!("not a number: '{}'", token)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let &[torque_airgap, flux_a, flux_b, flux_c, magarea] = values.as_slice() else {
        return Err(SolverError::BadOutput(format!(
            "expected 5 values, got {}",
            values.len()
        )));
    };
    Ok(SolveOutputs {
        torque_airgap,
        flux_a,
        flux_b,
        flux_c,
        magarea,
    })
}

fn lua_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

fn lua_str(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for ch in raw.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

fn lua_prop(name: Option<&str>) -> String {
    lua_str(name.unwrap_or(NONE_PROP))
}

fn wait_with_timeout(mut child: std::process::Child, timeout: Duration) -> Result<Output, SolverError> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(100);

    loop {
        match child.try_wait() {
            Ok(Some(_)) => return child.wait_with_output().map_err(SolverError::Io),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SolverError::Timeout(timeout.as_secs()));
                }
                std::thread::sleep(poll_interval);
            }
            Err(e) => return Err(SolverError::ExecutionFailed(e.to_string())),
        }
    }
}

pub fn debug_dump_session(session: &FemmSession) {
    println!(
        "femm: artifact={} pending_lines={} closed={}",
        session.artifact.display(),
        session.pending.lines().count(),
        session.closed
    );
}
