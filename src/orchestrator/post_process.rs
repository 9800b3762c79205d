//! Post-run processing utilities.
//!
//! Checks which expected output files XFOIL produced, reads the polar to see
//! which angles converged, and writes the run manifest.
//!
//! XFOIL appends to an existing polar and rewrites Cp files in place, so the
//! state of those files is captured before the flush and only what changed
//! afterwards counts for this run.

use crate::engine::Session;
use crate::model::{OutputFile, RunResult};
use crate::storage;
use crate::tables::{self, PolarRow};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Polar angles are printed with three decimals.
const ALPHA_TOLERANCE: f64 = 5e-4;

/// Result of post-run processing, ready for presentation layers.
pub(crate) struct ProcessedRun {
    pub result: RunResult,
    pub history_path: Option<PathBuf>,
}

/// Output files as they were on disk before XFOIL ran.
#[derive(Debug, Clone, Default)]
pub(crate) struct OutputSnapshot {
    /// Rows already in the polar file
    polar_rows: usize,
    /// Modification time of each Cp file, in `session.alfas()` order
    pressure_modified: Vec<Option<SystemTime>>,
}

impl OutputSnapshot {
    pub(crate) fn capture(session: &Session) -> Self {
        let naming = session.naming();
        let polar_rows = naming
            .polar(session.alfas())
            .ok()
            .and_then(|p| tables::read_polar(&p).ok())
            .map_or(0, |rows| rows.len());
        let pressure_modified = session
            .alfas()
            .iter()
            .map(|a| modified(&naming.surface_pressure(*a)))
            .collect();
        Self {
            polar_rows,
            pressure_modified,
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Existence plus parsed row count of one expected output file.
fn output_file<T>(path: PathBuf, read: fn(&Path) -> Result<Vec<T>>) -> OutputFile {
    let exists = path.is_file();
    let rows = if exists {
        read(&path).map(|r| r.len()).ok()
    } else {
        None
    };
    OutputFile { path, exists, rows }
}

/// Like `output_file`, but a file left untouched since `before` counts as missing.
fn fresh_output_file<T>(
    path: PathBuf,
    before: Option<SystemTime>,
    read: fn(&Path) -> Result<Vec<T>>,
) -> OutputFile {
    if before.is_some() && modified(&path) == before {
        return OutputFile {
            path,
            exists: false,
            rows: None,
        };
    }
    output_file(path, read)
}

/// Split requested angles into those found in the polar and those missing.
fn split_converged(requested: &[f64], rows: &[PolarRow]) -> (Vec<f64>, Vec<f64>) {
    requested
        .iter()
        .copied()
        .partition(|alfa| rows.iter().any(|r| (r.alpha - alfa).abs() < ALPHA_TOLERANCE))
}

pub(crate) fn process_run(
    session: &Session,
    before: &OutputSnapshot,
    save_cp: bool,
    exit_code: Option<i32>,
    auto_save: bool,
) -> Result<ProcessedRun> {
    let naming = session.naming();
    let alfas = session.alfas().to_vec();
    let polar_path = naming.polar(&alfas).context("session ran no polar")?;
    let polar_rows: Vec<PolarRow> = match tables::read_polar(&polar_path) {
        Ok(rows) => rows.into_iter().skip(before.polar_rows).collect(),
        Err(e) => {
            tracing::debug!("no polar rows: {e:#}");
            Vec::new()
        }
    };
    let (converged, unconverged) = split_converged(&alfas, &polar_rows);
    if !unconverged.is_empty() {
        tracing::warn!(
            airfoil = naming.name(),
            ?unconverged,
            "angles missing from polar (not converged?)"
        );
    }

    let surface_pressure = if save_cp {
        alfas
            .iter()
            .enumerate()
            .map(|(i, a)| {
                fresh_output_file(
                    naming.surface_pressure(*a),
                    before.pressure_modified.get(i).copied().flatten(),
                    tables::read_surface_pressure,
                )
            })
            .collect()
    } else {
        Vec::new()
    };

    let cfg = session.config();
    let mut result = RunResult {
        timestamp_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        airfoil: naming.name().to_string(),
        source: cfg.source.clone(),
        reynolds: cfg.reynolds,
        iterations: cfg.iterations,
        alfas: alfas.clone(),
        executable: session.executable().to_path_buf(),
        exit_code,
        script_lines: session.script().len(),
        geometry: session
            .saved_geometry()
            .then(|| output_file(naming.geometry(), tables::read_geometry)),
        polar: OutputFile {
            rows: polar_path.is_file().then_some(polar_rows.len()),
            exists: polar_path.is_file(),
            path: polar_path,
        },
        surface_pressure,
        converged,
        unconverged,
        polar_rows,
        manifest: None,
    };

    let manifest = naming.manifest(&alfas)?;
    result.manifest = Some(manifest.clone());
    storage::export_json(&manifest, &result).context("failed to write run manifest")?;

    let history_path = if auto_save {
        match storage::save_run(&result) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!("auto-save failed: {e:#}");
                None
            }
        }
    } else {
        None
    };

    Ok(ProcessedRun {
        result,
        history_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AirfoilSource, RunConfig};
    use tempfile::TempDir;

    const HEADER: &str = "\n\n\n\n\n\n\n\n\n\n   alpha    CL        CD       CDp       CM     Top_Xtr  Bot_Xtr\n  ------ -------- --------- --------- -------- -------- --------\n";

    fn session(root: &Path) -> Session {
        let mut cfg = RunConfig::new(AirfoilSource::Naca("2412".into()));
        cfg.output_root = root.to_path_buf();
        cfg.reynolds = 1e6;
        Session::new(cfg, PathBuf::from("xfoil")).unwrap()
    }

    #[test]
    fn test_manifest_reports_unconverged_angles() {
        let tmp = TempDir::new().unwrap();
        let mut s = session(tmp.path());
        s.save_geometry(true).unwrap();
        let polar = s.run_polar(&[0.0, 4.0, 8.0], true, true).unwrap();
        s.terminate().unwrap();
        let before = OutputSnapshot::capture(&s);

        let body = "   0.000   0.2400   0.00600   0.00100  -0.0530   0.6000   0.9900\n   8.000   1.1000   0.01200   0.00500  -0.0400   0.0500   1.0000\n";
        std::fs::write(&polar, format!("{}{}", HEADER, body)).unwrap();
        std::fs::write(s.naming().surface_pressure(0.0), "#x Cp\n 1.0 0.2\n 0.0 -1.0\n").unwrap();

        let processed = process_run(&s, &before, true, Some(0), false).unwrap();
        let r = processed.result;
        assert_eq!(r.converged, vec![0.0, 8.0]);
        assert_eq!(r.unconverged, vec![4.0]);
        assert!(r.polar.exists);
        assert_eq!(r.surface_pressure.len(), 3);
        assert!(r.surface_pressure[0].exists);
        assert_eq!(r.surface_pressure[0].rows, Some(2));
        assert_eq!(r.polar.rows, Some(2));
        assert_eq!(r.polar_rows[1].cl, 1.1);
        assert!(!r.surface_pressure[1].exists);
        assert!(r.geometry.as_ref().map(|g| !g.exists).unwrap_or(false));
        assert!(processed.history_path.is_none());

        let manifest = r.manifest.unwrap();
        assert_eq!(manifest, polar.with_extension("json"));
        let saved: RunResult =
            serde_json::from_slice(&std::fs::read(&manifest).unwrap()).unwrap();
        assert_eq!(saved.unconverged, vec![4.0]);
        assert_eq!(saved.exit_code, Some(0));
    }

    #[test]
    fn test_missing_polar_means_nothing_converged() {
        let tmp = TempDir::new().unwrap();
        let mut s = session(tmp.path());
        s.run_polar(&[1.0, 2.0], false, true).unwrap();

        let before = OutputSnapshot::capture(&s);
        let r = process_run(&s, &before, false, None, false).unwrap().result;
        assert!(!r.polar.exists);
        assert!(r.converged.is_empty());
        assert_eq!(r.unconverged, vec![1.0, 2.0]);
        assert!(r.surface_pressure.is_empty());
        assert!(r.geometry.is_none());
    }

    #[test]
    fn test_session_without_polar_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let s = session(tmp.path());
        let before = OutputSnapshot::capture(&s);
        assert!(process_run(&s, &before, false, None, false).is_err());
    }

    #[test]
    fn test_appended_polar_counts_only_new_rows() {
        let tmp = TempDir::new().unwrap();
        let stale = "   0.000   0.2400   0.00600   0.00100  -0.0530   0.6000   0.9900\n   5.000   0.8000   0.00800   0.00200  -0.0500   0.3000   0.9900\n  10.000   1.2000   0.01300   0.00600  -0.0400   0.0500   1.0000\n";
        let alfas = [0.0, 5.0, 10.0];

        let mut s = session(tmp.path());
        let polar = s.naming().polar(&alfas).unwrap();
        std::fs::write(&polar, format!("{}{}", HEADER, stale)).unwrap();
        let cp = s.naming().surface_pressure(5.0);
        std::fs::write(&cp, "#x Cp\n 1.0 0.2\n").unwrap();
        let old = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        std::fs::File::options()
            .write(true)
            .open(&cp)
            .unwrap()
            .set_modified(old)
            .unwrap();

        s.run_polar(&alfas, true, false).unwrap();
        s.terminate().unwrap();
        let before = OutputSnapshot::capture(&s);

        // XFOIL wrote nothing new
        let r = process_run(&s, &before, true, Some(0), false).unwrap().result;
        assert!(r.converged.is_empty());
        assert_eq!(r.unconverged, alfas.to_vec());
        assert!(r.polar_rows.is_empty());
        assert_eq!(r.polar.rows, Some(0));
        assert!(!r.surface_pressure[1].exists);

        // XFOIL appended one angle and rewrote its Cp file
        let appended = "   5.000   0.8100   0.00810   0.00210  -0.0500   0.3000   0.9900\n";
        std::fs::write(&polar, format!("{}{}{}", HEADER, stale, appended)).unwrap();
        std::fs::write(&cp, "#x Cp\n 1.0 0.2\n 0.0 -1.0\n").unwrap();
        let r = process_run(&s, &before, true, Some(0), false).unwrap().result;
        assert_eq!(r.converged, vec![5.0]);
        assert_eq!(r.unconverged, vec![0.0, 10.0]);
        assert_eq!(r.polar_rows.len(), 1);
        assert_eq!(r.polar_rows[0].cl, 0.81);
        assert!(r.surface_pressure[1].exists);
        assert_eq!(r.surface_pressure[1].rows, Some(2));
    }
}
