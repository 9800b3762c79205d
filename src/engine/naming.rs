//! Output file naming.
//!
//! Reynolds number and angle(s) are embedded in file names so runs with
//! different parameters coexist, while identical re-runs land on the same
//! files (which is what the overwrite/skip policy keys on).

use crate::engine::{Error, Result};
use crate::model::AirfoilSource;
use std::path::{Path, PathBuf};

/// Name used for the output subdirectory and as every file name prefix.
pub fn airfoil_name(source: &AirfoilSource) -> String {
    match source {
        AirfoilSource::Naca(digits) => format!("naca{}", digits),
        AirfoilSource::File(path) => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match file_name.split('.').next() {
                Some(stem) if !stem.is_empty() => stem.to_string(),
                _ => file_name,
            }
        }
    }
}

/// Scientific notation with two decimals and a signed two-digit exponent (`2.00e+05`).
pub fn format_reynolds(re: f64) -> String {
    let raw = format!("{:.2e}", re);
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => raw,
    }
}

/// Angle tag for a polar file: `a<first>-<last>` for a sweep, `a<value>` otherwise.
///
/// Angles are not sorted; the first and last entries are used as given.
pub fn polar_angle_tag(alfas: &[f64]) -> Result<String> {
    match alfas {
        [] => Err(Error::NoAngles),
        [single] => Ok(format!("a{:.2}", single)),
        [first, .., last] => Ok(format!("a{:.1}-{:.1}", first, last)),
    }
}

/// Resolves output paths for one airfoil at one Reynolds number.
#[derive(Debug, Clone, PartialEq)]
pub struct Naming {
    output_dir: PathBuf,
    name: String,
    reynolds: f64,
}

impl Naming {
    pub fn new(output_dir: impl Into<PathBuf>, name: impl Into<String>, reynolds: f64) -> Self {
        Self {
            output_dir: output_dir.into(),
            name: name.into(),
            reynolds,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> PathBuf {
        self.output_dir.join(format!("{}.dat", self.name))
    }

    /// Per-case pressure file. Always the single-value form, also inside a sweep.
    pub fn surface_pressure(&self, alfa: f64) -> PathBuf {
        self.output_dir.join(format!(
            "{}_surfCP_Re{}a{:.1}.dat",
            self.name,
            format_reynolds(self.reynolds),
            alfa
        ))
    }

    pub fn polar(&self, alfas: &[f64]) -> Result<PathBuf> {
        Ok(self.output_dir.join(format!("{}.dat", self.polar_stem(alfas)?)))
    }

    /// Run manifest written next to the polar file.
    pub fn manifest(&self, alfas: &[f64]) -> Result<PathBuf> {
        Ok(self.output_dir.join(format!("{}.json", self.polar_stem(alfas)?)))
    }

    fn polar_stem(&self, alfas: &[f64]) -> Result<String> {
        Ok(format!(
            "{}_polar_Re{}{}",
            self.name,
            format_reynolds(self.reynolds),
            polar_angle_tag(alfas)?
        ))
    }
}
