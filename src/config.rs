//! Batch file and user settings.
//!
//! A TOML file with an `[xfoil]` section (where and how to run XFOIL), a
//! `[defaults]` section (per-run parameters) and any number of `[[run]]`
//! entries. The per-user file in the config directory is read for its
//! settings only; runs come from a file passed explicitly.
//!
//! A run may give its coordinates inline (`name` + `points`). Those are
//! written to `<output_dir>/inputs/<name>.dat` when the batch is resolved,
//! so the session can `load` and validate them like any other file.

use crate::model::{AirfoilSource, PolarJob, RunConfig, DEFAULT_ITERATIONS, DEFAULT_OUTPUT_ROOT};
use crate::tables::{self, GeometryPoint};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchFile {
    pub xfoil: XfoilSettings,
    pub defaults: RunDefaults,
    #[serde(rename = "run")]
    pub runs: Vec<RunSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XfoilSettings {
    /// Executable; platform default when unset
    pub path: Option<PathBuf>,
    pub headless: bool,
    /// Hide XFOIL's console output
    pub quiet: bool,
    pub output_dir: PathBuf,
    pub auto_save: bool,
}

impl Default for XfoilSettings {
    fn default() -> Self {
        Self {
            path: None,
            headless: true,
            quiet: true,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            auto_save: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDefaults {
    pub reynolds: f64,
    pub iterations: u32,
    pub save_cp: bool,
    pub overwrite: bool,
    pub pane: bool,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            reynolds: 0.0,
            iterations: DEFAULT_ITERATIONS,
            save_cp: true,
            overwrite: true,
            pane: false,
        }
    }
}

/// One `[[run]]` entry. Unset fields fall back to `[defaults]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSpec {
    pub naca: Option<String>,
    pub file: Option<PathBuf>,
    /// Airfoil name for inline `points`
    pub name: Option<String>,
    /// Inline coordinates as `[x, z]` pairs, in XFOIL's surface order
    pub points: Option<Vec<[f64; 2]>>,
    pub alfas: Vec<f64>,
    pub reynolds: Option<f64>,
    pub iterations: Option<u32>,
    pub save_cp: Option<bool>,
    pub overwrite: Option<bool>,
    pub pane: Option<bool>,
    /// Raw top-menu commands run after geometry load (e.g. `ppar` tweaks)
    #[serde(default)]
    pub commands: Vec<String>,
}

impl RunSpec {
    fn source(&self, inputs: &Path) -> Result<AirfoilSource> {
        match (&self.naca, &self.file, &self.points) {
            (Some(digits), None, None) => Ok(AirfoilSource::Naca(digits.clone())),
            (None, Some(path), None) => Ok(AirfoilSource::File(path.clone())),
            (None, None, Some(points)) => {
                let Some(name) = self.name.as_deref() else {
                    bail!("'points' needs a 'name'");
                };
                if name.is_empty() || name.contains(['.', '/', '\\']) {
                    bail!("invalid airfoil name {:?}", name);
                }
                let points: Vec<GeometryPoint> =
                    points.iter().map(|&[x, z]| GeometryPoint { x, z }).collect();
                let path = inputs.join(format!("{}.dat", name));
                tables::write_geometry(&path, &points)?;
                Ok(AirfoilSource::File(path))
            }
            (None, None, None) => bail!("missing airfoil: set 'naca', 'file' or 'points'"),
            _ => bail!("set only one of 'naca', 'file' or 'points'"),
        }
    }
}

impl BatchFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Per-user settings file, if one exists.
    pub fn load_user() -> Result<Option<Self>> {
        match user_config_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading user settings");
                let mut file = Self::load(&path)?;
                file.runs.clear();
                Ok(Some(file))
            }
            _ => Ok(None),
        }
    }

    /// Resolve every `[[run]]` into a job, applying defaults.
    pub fn jobs(&self) -> Result<Vec<PolarJob>> {
        self.runs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                self.job_for(spec)
                    .with_context(|| format!("run #{}", i + 1))
            })
            .collect()
    }

    fn job_for(&self, spec: &RunSpec) -> Result<PolarJob> {
        if spec.alfas.is_empty() {
            bail!("'alfas' must list at least one angle of attack");
        }
        let d = &self.defaults;
        let inputs = self.xfoil.output_dir.join("inputs");
        let mut config = RunConfig::new(spec.source(&inputs)?);
        config.reynolds = spec.reynolds.unwrap_or(d.reynolds);
        config.iterations = spec.iterations.unwrap_or(d.iterations);
        config.output_root = self.xfoil.output_dir.clone();
        config.headless = self.xfoil.headless;
        Ok(PolarJob {
            config,
            alfas: spec.alfas.clone(),
            save_cp: spec.save_cp.unwrap_or(d.save_cp),
            overwrite: spec.overwrite.unwrap_or(d.overwrite),
            pane: spec.pane.unwrap_or(d.pane),
            commands: spec.commands.clone(),
        })
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("xfoil-runner").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BATCH: &str = r#"
[xfoil]
path = "/opt/xfoil/bin/xfoil"
quiet = false
output_dir = "results"

[defaults]
reynolds = 2e5
iterations = 150

[[run]]
naca = "0012"
alfas = [0, 5, 10]

[[run]]
file = "foils/s1223.dat"
alfas = [4]
reynolds = 0
save_cp = false
commands = ["ppar", "n 200", "", ""]
"#;

    #[test]
    fn test_parse_batch_applies_defaults() {
        let batch = BatchFile::parse(BATCH).unwrap();
        assert_eq!(batch.xfoil.path, Some(PathBuf::from("/opt/xfoil/bin/xfoil")));
        assert!(batch.xfoil.headless);
        assert!(!batch.xfoil.quiet);

        let jobs = batch.jobs().unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].config.source, AirfoilSource::Naca("0012".into()));
        assert_eq!(jobs[0].config.reynolds, 2e5);
        assert_eq!(jobs[0].config.iterations, 150);
        assert_eq!(jobs[0].config.output_root, PathBuf::from("results"));
        assert_eq!(jobs[0].alfas, vec![0.0, 5.0, 10.0]);
        assert!(jobs[0].save_cp);

        assert_eq!(
            jobs[1].config.source,
            AirfoilSource::File(PathBuf::from("foils/s1223.dat"))
        );
        assert_eq!(jobs[1].config.reynolds, 0.0);
        assert!(!jobs[1].save_cp);
        assert!(jobs[1].overwrite);
        assert_eq!(jobs[1].commands, vec!["ppar", "n 200", "", ""]);
        assert!(jobs[0].commands.is_empty());
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let batch = BatchFile::parse("").unwrap();
        assert!(batch.runs.is_empty());
        assert_eq!(batch.xfoil.output_dir, PathBuf::from("Data"));
        assert_eq!(batch.defaults.iterations, 100);
    }

    #[test]
    fn test_run_needs_exactly_one_airfoil() {
        let both = "[[run]]\nnaca = \"0012\"\nfile = \"a.dat\"\nalfas = [1]\n";
        let err = BatchFile::parse(both).unwrap().jobs().unwrap_err();
        assert!(format!("{err:#}").contains("run #1"));

        let neither = "[[run]]\nalfas = [1]\n";
        assert!(BatchFile::parse(neither).unwrap().jobs().is_err());

        let no_angles = "[[run]]\nnaca = \"0012\"\nalfas = []\n";
        assert!(BatchFile::parse(no_angles).unwrap().jobs().is_err());
    }

    #[test]
    fn test_inline_points_become_a_geometry_file() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("results");
        let text = format!(
            "[xfoil]\noutput_dir = {:?}\n\n[[run]]\nname = \"wedge\"\npoints = [[1.0, 0.0], [0.0, 0.05], [1.0, -0.0]]\nalfas = [2]\n",
            out.to_str().unwrap()
        );
        let jobs = BatchFile::parse(&text).unwrap().jobs().unwrap();
        let path = out.join("inputs").join("wedge.dat");
        assert_eq!(jobs[0].config.source, AirfoilSource::File(path.clone()));
        let points = tables::read_geometry(&path).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1], GeometryPoint { x: 0.0, z: 0.05 });

        let unnamed = "[[run]]\npoints = [[1.0, 0.0], [0.0, 0.0]]\nalfas = [0]\n";
        let err = BatchFile::parse(unnamed).unwrap().jobs().unwrap_err();
        assert!(format!("{err:#}").contains("needs a 'name'"));

        let dotted = format!(
            "[xfoil]\noutput_dir = {:?}\n\n[[run]]\nname = \"a.b\"\npoints = [[1.0, 0.0]]\nalfas = [0]\n",
            out.to_str().unwrap()
        );
        assert!(BatchFile::parse(&dotted).unwrap().jobs().is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("batch.toml");
        std::fs::write(&path, BATCH).unwrap();
        assert_eq!(BatchFile::load(&path).unwrap().runs.len(), 2);

        let err = BatchFile::load(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("nope.toml"));
    }

    #[test]
    fn test_user_config_path() {
        if let Some(path) = user_config_path() {
            assert!(path.ends_with("xfoil-runner/config.toml"));
        }
    }
}
