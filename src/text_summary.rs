//! Text summary builder for CLI output.
//!
//! One block per run: parameters, convergence, and where the files landed.

use crate::engine::naming::{format_reynolds, polar_angle_tag};
use crate::model::RunResult;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn join_angles(alfas: &[f64]) -> String {
    alfas
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn build_text_summary(results: &[RunResult]) -> TextSummary {
    let mut lines = Vec::new();

    for r in results {
        let range = polar_angle_tag(&r.alfas).unwrap_or_else(|_| "-".into());
        lines.push(format!(
            "{}  Re {}  {}  iter {}",
            r.airfoil,
            format_reynolds(r.reynolds),
            range,
            r.iterations
        ));
        if !r.timestamp_utc.is_empty() {
            lines.push(format!("  Run:        {}", r.timestamp_utc));
        }
        lines.push(format!(
            "  Converged:  {}/{}",
            r.converged.len(),
            r.alfas.len()
        ));
        if !r.unconverged.is_empty() {
            lines.push(format!(
                "  Missing:    {} (raise --iter or check the geometry)",
                join_angles(&r.unconverged)
            ));
        }
        let polar_state = if r.polar.exists { "" } else { " (not written)" };
        lines.push(format!("  Polar:      {}{}", r.polar.path.display(), polar_state));
        if let Some(geom) = r.geometry.as_ref() {
            let state = if geom.exists { "" } else { " (not written)" };
            lines.push(format!("  Geometry:   {}{}", geom.path.display(), state));
        }
        if !r.surface_pressure.is_empty() {
            let written = r.surface_pressure.iter().filter(|f| f.exists).count();
            lines.push(format!(
                "  Cp files:   {}/{} written",
                written,
                r.surface_pressure.len()
            ));
        }
        if let Some(code) = r.exit_code.filter(|c| *c != 0) {
            lines.push(format!("  XFOIL exit code {}", code));
        }
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AirfoilSource, OutputFile};
    use std::path::PathBuf;

    #[test]
    fn test_summary_lists_missing_angles() {
        let r = RunResult {
            timestamp_utc: String::new(),
            airfoil: "s1223".into(),
            source: AirfoilSource::File(PathBuf::from("Data/s1223.dat")),
            reynolds: 2e5,
            iterations: 30,
            alfas: vec![0.0, 10.0],
            executable: PathBuf::from("xfoil"),
            exit_code: Some(0),
            script_lines: 18,
            geometry: None,
            polar: OutputFile {
                path: PathBuf::from("Data/s1223/s1223_polar_Re2.00e+05a0.0-10.0.dat"),
                exists: true,
                rows: None,
            },
            surface_pressure: vec![
                OutputFile { path: PathBuf::from("a"), exists: true, rows: Some(160) },
                OutputFile { path: PathBuf::from("b"), exists: false, rows: None },
            ],
            converged: vec![0.0],
            unconverged: vec![10.0],
            polar_rows: Vec::new(),
            manifest: None,
        };

        let lines = build_text_summary(&[r]).lines;
        assert_eq!(lines[0], "s1223  Re 2.00e+05  a0.0-10.0  iter 30");
        assert!(lines.contains(&"  Converged:  1/2".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("  Missing:    10 ")));
        assert!(lines.contains(&"  Cp files:   1/2 written".to_string()));
        assert!(!lines.iter().any(|l| l.contains("exit code")));
    }
}
