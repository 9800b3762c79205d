mod error;
pub mod locator;
pub mod naming;
pub mod script;

pub use error::{Error, Result};

use crate::model::{AirfoilSource, RunConfig};
use naming::Naming;
use script::{Command, Script};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;

/// Menu levels unwound by `terminate`, deepest expected nesting (oper > pacc prompts).
const MENU_DEPTH: usize = 4;

/// XFOIL's modal state as implied by the commands queued so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Top,
    Oper,
    /// `quit` queued; only `flush` is allowed
    Closed,
    /// Script already handed to XFOIL
    Flushed,
}

/// One XFOIL invocation, built up command by command and run once.
#[derive(Debug)]
pub struct Session {
    cfg: RunConfig,
    executable: PathBuf,
    naming: Naming,
    script: Script,
    menu: Menu,
    alfas: Vec<f64>,
    saved_geometry: bool,
}

impl Session {
    /// Validate the geometry source, create the output directory and queue
    /// the top-level block (graphics off, geometry load).
    pub fn new(cfg: RunConfig, executable: PathBuf) -> Result<Self> {
        let session = Self::preview(cfg, executable)?;
        std::fs::create_dir_all(session.naming.output_dir())?;
        Ok(session)
    }

    /// Same as `new` without creating the output directory. Used for dry runs.
    pub fn preview(cfg: RunConfig, executable: PathBuf) -> Result<Self> {
        if cfg.iterations == 0 {
            return Err(Error::InvalidIterations);
        }
        validate_source(&cfg.source)?;

        let name = naming::airfoil_name(&cfg.source);
        let output_dir = cfg.output_root.join(&name);

        let mut script = Script::new();
        if cfg.headless {
            script.extend([Command::PlotOptions, Command::GraphicsOff, Command::Blank]);
        }
        script.push(match &cfg.source {
            AirfoilSource::Naca(digits) => Command::Naca(digits.clone()),
            AirfoilSource::File(path) => Command::Load(path.clone()),
        });

        tracing::debug!(airfoil = %name, dir = %output_dir.display(), "session initialised");
        Ok(Self {
            naming: Naming::new(output_dir, name, cfg.reynolds),
            cfg,
            executable,
            script,
            menu: Menu::Top,
            alfas: Vec::new(),
            saved_geometry: false,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Angles of the most recent polar (naming input for post-processing).
    pub fn alfas(&self) -> &[f64] {
        &self.alfas
    }

    /// Whether a geometry `save` was queued.
    pub fn saved_geometry(&self) -> bool {
        self.saved_geometry
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Queue a command verbatim. The caller is responsible for its menu context.
    pub fn push_raw(&mut self, line: impl Into<String>) -> Result<()> {
        self.ensure_open()?;
        self.script.push(Command::Raw(line.into()));
        Ok(())
    }

    /// Re-panel the loaded geometry. Top menu only.
    pub fn pane(&mut self) -> Result<()> {
        self.expect_menu(Menu::Top, "pane", "top")?;
        self.script.push(Command::Pane);
        Ok(())
    }

    /// Queue a geometry save unless the file is already on disk and `overwrite` is off.
    pub fn save_geometry(&mut self, overwrite: bool) -> Result<()> {
        self.expect_menu(Menu::Top, "save", "top")?;
        let path = self.naming.geometry();
        if overwrite || !path.is_file() {
            self.script.push(Command::Save(path));
            self.saved_geometry = true;
        } else {
            tracing::debug!(path = %path.display(), "geometry already saved, skipping");
        }
        Ok(())
    }

    /// Enter `oper`, set viscosity (if any) and then the iteration cap.
    pub fn enter_analysis_menu(&mut self) -> Result<()> {
        self.expect_menu(Menu::Top, "oper", "top")?;
        self.script.push(Command::Oper);
        if self.cfg.reynolds != 0.0 {
            self.script.push(Command::Visc(self.cfg.reynolds));
        }
        self.script.push(Command::Iter(self.cfg.iterations));
        self.menu = Menu::Oper;
        Ok(())
    }

    pub fn run_single_case(&mut self, alfa: f64, save_cp: bool) -> Result<()> {
        self.expect_menu(Menu::Oper, "alfa", "oper")?;
        self.script.push(Command::Alfa(alfa));
        if save_cp {
            self.script
                .push(Command::Cpwr(self.naming.surface_pressure(alfa)));
        }
        Ok(())
    }

    /// Run every angle in order inside one polar accumulation bracket.
    ///
    /// With `overwrite`, an existing polar file is deleted now: XFOIL only appends.
    pub fn run_polar(&mut self, alfas: &[f64], save_cp: bool, overwrite: bool) -> Result<PathBuf> {
        self.ensure_open()?;
        let polar = self.naming.polar(alfas)?;
        if self.menu == Menu::Top {
            self.enter_analysis_menu()?;
        }

        if overwrite && polar.is_file() {
            tracing::info!(path = %polar.display(), "removing previous polar");
            std::fs::remove_file(&polar)?;
        }

        self.alfas = alfas.to_vec();
        self.script.extend([
            Command::Pacc,
            Command::PolarFile(polar.clone()),
            Command::Blank,
        ]);
        for &alfa in alfas {
            self.run_single_case(alfa, save_cp)?;
        }
        self.script.push(Command::Pacc);
        Ok(polar)
    }

    /// Back out to the top menu and quit. Last builder call before `flush`.
    pub fn terminate(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.script
            .extend(std::iter::repeat(Command::Blank).take(MENU_DEPTH));
        self.script.push(Command::Quit);
        self.menu = Menu::Closed;
        Ok(())
    }

    /// Launch XFOIL, write the whole script to its stdin in one go and wait.
    ///
    /// Returns `None` when there was nothing to send (empty or already flushed).
    /// XFOIL's own failures are invisible here; inspect the output files.
    pub async fn flush(&mut self, quiet: bool) -> Result<Option<ExitStatus>> {
        if self.menu == Menu::Flushed || self.script.is_empty() {
            return Ok(None);
        }
        let payload = self.script.render();
        self.menu = Menu::Flushed;

        let mut child = tokio::process::Command::new(&self.executable)
            .stdin(Stdio::piped())
            .stdout(if quiet {
                Stdio::null()
            } else {
                Stdio::inherit()
            })
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| Error::Spawn {
                path: self.executable.clone(),
                source,
            })?;

        tracing::info!(
            airfoil = %self.naming.name(),
            dir = %self.naming.output_dir().display(),
            lines = self.script.len(),
            "running XFOIL"
        );
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                // XFOIL quitting early closes the pipe; its exit status still tells the story.
                tracing::warn!("XFOIL stopped reading input: {}", e);
            }
            // Dropping stdin closes the stream so XFOIL sees EOF.
        }

        let status = child.wait().await?;
        if !status.success() {
            tracing::warn!(?status, "XFOIL exited unsuccessfully");
        }
        Ok(Some(status))
    }

    fn ensure_open(&self) -> Result<()> {
        match self.menu {
            Menu::Closed | Menu::Flushed => Err(Error::SessionClosed),
            _ => Ok(()),
        }
    }

    fn expect_menu(&self, menu: Menu, command: &'static str, expected: &'static str) -> Result<()> {
        self.ensure_open()?;
        if self.menu == menu {
            Ok(())
        } else {
            Err(Error::WrongMenu { command, expected })
        }
    }
}

fn validate_source(source: &AirfoilSource) -> Result<()> {
    match source {
        AirfoilSource::Naca(digits) => {
            let valid = matches!(digits.len(), 4 | 5) && digits.chars().all(|c| c.is_ascii_digit());
            if valid {
                Ok(())
            } else {
                Err(Error::InvalidNaca(digits.clone()))
            }
        }
        AirfoilSource::File(path) => {
            if !path.is_file() {
                return Err(Error::GeometryMissing(path.clone()));
            }
            // Bytes, not text: coordinate files are not always UTF-8.
            let bytes = std::fs::read(path)?;
            if line_count(&bytes) < 2 {
                return Err(Error::GeometryEmpty(path.clone()));
            }
            Ok(())
        }
    }
}

fn line_count(bytes: &[u8]) -> usize {
    let pieces = bytes.split(|b| *b == b'\n').count();
    pieces - usize::from(bytes.is_empty() || bytes.ends_with(b"\n"))
}
