//! Readers for XFOIL's whitespace-separated output files, and a writer for
//! coordinate files it can `load`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Header lines XFOIL writes before the first polar row.
const POLAR_HEADER_LINES: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryPoint {
    pub x: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressurePoint {
    pub x: f64,
    /// Only present in the Windows build's output
    pub y: Option<f64>,
    pub cp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarRow {
    pub alpha: f64,
    pub cl: f64,
    pub cd: f64,
    pub cdp: f64,
    pub cm: f64,
    pub top_xtr: f64,
    pub bot_xtr: f64,
}

fn parse_rows(contents: &str, skip: usize, columns: usize) -> Result<Vec<Vec<f64>>> {
    contents
        .lines()
        .enumerate()
        .skip(skip)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            let values = line
                .split_whitespace()
                .take(columns)
                .map(|v| v.parse::<f64>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("line {}: not numeric: {:?}", idx + 1, line))?;
            if values.len() < columns {
                anyhow::bail!(
                    "line {}: expected {} columns, found {}",
                    idx + 1,
                    columns,
                    values.len()
                );
            }
            Ok(values)
        })
        .collect()
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

pub fn parse_geometry(contents: &str) -> Result<Vec<GeometryPoint>> {
    Ok(parse_rows(contents, 1, 2)?
        .into_iter()
        .map(|r| GeometryPoint { x: r[0], z: r[1] })
        .collect())
}

pub fn read_geometry(path: &Path) -> Result<Vec<GeometryPoint>> {
    parse_geometry(&read(path)?).with_context(|| format!("parse geometry {}", path.display()))
}

/// Plain coordinate file: a `foil` title line, then x and z in left-aligned
/// 14-wide columns with seven decimals, indented by four spaces.
pub fn format_geometry(points: &[GeometryPoint]) -> String {
    let mut out = String::from("foil\n");
    for p in points {
        let _ = writeln!(out, "    {:<14.7}{:<14.7}", p.x, p.z);
    }
    out
}

pub fn write_geometry(path: &Path, points: &[GeometryPoint]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    std::fs::write(path, format_geometry(points))
        .with_context(|| format!("write {}", path.display()))
}

/// `with_y` selects the three-column layout (3 header lines) of the Windows build.
pub fn parse_surface_pressure(contents: &str, with_y: bool) -> Result<Vec<PressurePoint>> {
    let rows = if with_y {
        parse_rows(contents, 3, 3)?
            .into_iter()
            .map(|r| PressurePoint {
                x: r[0],
                y: Some(r[1]),
                cp: r[2],
            })
            .collect()
    } else {
        parse_rows(contents, 1, 2)?
            .into_iter()
            .map(|r| PressurePoint {
                x: r[0],
                y: None,
                cp: r[1],
            })
            .collect()
    };
    Ok(rows)
}

pub fn read_surface_pressure(path: &Path) -> Result<Vec<PressurePoint>> {
    parse_surface_pressure(&read(path)?, cfg!(windows))
        .with_context(|| format!("parse surface pressure {}", path.display()))
}

pub fn parse_polar(contents: &str) -> Result<Vec<PolarRow>> {
    Ok(parse_rows(contents, POLAR_HEADER_LINES, 7)?
        .into_iter()
        .map(|r| PolarRow {
            alpha: r[0],
            cl: r[1],
            cd: r[2],
            cdp: r[3],
            cm: r[4],
            top_xtr: r[5],
            bot_xtr: r[6],
        })
        .collect())
}

pub fn read_polar(path: &Path) -> Result<Vec<PolarRow>> {
    parse_polar(&read(path)?).with_context(|| format!("parse polar {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const POLAR: &str = "
       XFOIL         Version 6.99

 Calculated polar for: NACA 0012

 1 1 Reynolds number fixed          Mach number fixed

 xtrf =   1.000 (top)        1.000 (bottom)
 Mach =   0.000     Re =     0.200 e 6     Ncrit =   9.000

   alpha    CL        CD       CDp       CM     Top_Xtr  Bot_Xtr
  ------ -------- --------- --------- -------- -------- --------
   0.000   0.0000   0.00998   0.00232   0.0000   0.6231   0.6231
   5.000   0.5541   0.01102   0.00385   0.0043   0.2964   0.9036
";

    #[test]
    fn test_parse_polar_skips_header() {
        let rows = parse_polar(POLAR).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].alpha, 5.0);
        assert_eq!(rows[1].cl, 0.5541);
        assert_eq!(rows[1].bot_xtr, 0.9036);
    }

    #[test]
    fn test_parse_polar_header_only() {
        let header: String = POLAR.lines().take(POLAR_HEADER_LINES).collect::<Vec<_>>().join("\n");
        assert!(parse_polar(&header).unwrap().is_empty());
    }

    #[test]
    fn test_parse_surface_pressure_layouts() {
        let two = "#    x        Cp\n  1.00000   0.2000\n  0.50000  -0.3100\n";
        let rows = parse_surface_pressure(two, false).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].cp, -0.31);
        assert_eq!(rows[1].y, None);

        let three = "title\n\n#  x  y  Cp\n 1.0 0.0 0.2\n";
        let rows = parse_surface_pressure(three, true).unwrap();
        assert_eq!(rows, vec![PressurePoint { x: 1.0, y: Some(0.0), cp: 0.2 }]);
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let err = parse_geometry("foil\n1.0 0.0\n0.5 abc\n").unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"));

        let err = parse_geometry("foil\n1.0\n").unwrap_err();
        assert!(format!("{:#}", err).contains("expected 2 columns"));
    }

    #[test]
    fn test_read_geometry_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("flat.dat");
        std::fs::write(
            &path,
            "foil\n    1.0000000     0.0000000     \n    0.5000000     -0.0125000    \n",
        )
        .unwrap();
        let points = read_geometry(&path).unwrap();
        assert_eq!(points[1], GeometryPoint { x: 0.5, z: -0.0125 });

        let err = read_geometry(&tmp.path().join("none.dat")).unwrap_err();
        assert!(format!("{:#}", err).contains("none.dat"));
    }

    #[test]
    fn test_geometry_file_layout() {
        let points = [
            GeometryPoint { x: 1.0, z: 0.0 },
            GeometryPoint { x: 0.5, z: -0.0125 },
        ];
        assert_eq!(
            format_geometry(&points),
            "foil\n    1.0000000     0.0000000     \n    0.5000000     -0.0125000    \n"
        );
    }

    #[test]
    fn test_written_geometry_reads_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("inputs").join("plate.dat");
        let points = vec![
            GeometryPoint { x: 1.0, z: 0.00126 },
            GeometryPoint { x: 0.25, z: 0.0595 },
            GeometryPoint { x: 0.0, z: 0.0 },
            GeometryPoint { x: 0.25, z: -0.0595 },
            GeometryPoint { x: 1.0, z: -0.00126 },
        ];
        write_geometry(&path, &points).unwrap();
        assert_eq!(read_geometry(&path).unwrap(), points);
    }
}
