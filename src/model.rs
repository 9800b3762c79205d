use crate::tables::PolarRow;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_OUTPUT_ROOT: &str = "Data";
pub const DEFAULT_ITERATIONS: u32 = 100;

/// Where the airfoil geometry comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirfoilSource {
    /// NACA designation generated by XFOIL itself, e.g. `0012`
    Naca(String),
    /// Coordinate file in XFOIL's plain format
    File(PathBuf),
}

/// Immutable parameters of one XFOIL invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub source: AirfoilSource,
    /// Zero selects an inviscid run
    pub reynolds: f64,
    pub iterations: u32,
    pub output_root: PathBuf,
    pub headless: bool,
}

impl RunConfig {
    pub fn new(source: AirfoilSource) -> Self {
        Self {
            source,
            reynolds: 0.0,
            iterations: DEFAULT_ITERATIONS,
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            headless: true,
        }
    }
}

/// One polar to compute: a session from geometry load through quit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolarJob {
    pub config: RunConfig,
    pub alfas: Vec<f64>,
    pub save_cp: bool,
    pub overwrite: bool,
    /// Re-panel the geometry before analysis (helps rough shapes, can destabilise smooth ones)
    pub pane: bool,
    /// Extra top-menu commands queued verbatim after the geometry is loaded
    #[serde(default)]
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputFile {
    pub path: PathBuf,
    pub exists: bool,
    /// Data rows this run added, when the file could be read
    #[serde(default)]
    pub rows: Option<usize>,
}

/// Manifest of a finished run, written as JSON next to the polar file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default)]
    pub timestamp_utc: String,
    pub airfoil: String,
    pub source: AirfoilSource,
    pub reynolds: f64,
    pub iterations: u32,
    pub alfas: Vec<f64>,
    pub executable: PathBuf,
    pub exit_code: Option<i32>,
    pub script_lines: usize,
    pub geometry: Option<OutputFile>,
    pub polar: OutputFile,
    #[serde(default)]
    pub surface_pressure: Vec<OutputFile>,
    /// Angles present in the polar file
    #[serde(default)]
    pub converged: Vec<f64>,
    /// Requested angles XFOIL did not write to the polar
    #[serde(default)]
    pub unconverged: Vec<f64>,
    /// Polar table as XFOIL wrote it
    #[serde(default)]
    pub polar_rows: Vec<PolarRow>,
    #[serde(default)]
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum RunEvent {
    JobStarted {
        index: usize,
        total: usize,
        airfoil: String,
    },
    ScriptBuilt {
        airfoil: String,
        lines: Vec<String>,
    },
    XfoilExited {
        airfoil: String,
        code: Option<i32>,
    },
    Info(InfoEvent),
    RunCompleted {
        result: Box<RunResult>,
    },
}

/// Structured info events emitted by the orchestrator and consumed by the CLI layer.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    Message(String),
    Executable { path: PathBuf },
    JobFailed { airfoil: String, error: String },
}

impl InfoEvent {
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::Executable { path } => format!("Using XFOIL at {}", path.display()),
            InfoEvent::JobFailed { airfoil, error } => {
                format!("{} failed: {}", airfoil, error)
            }
        }
    }
}
