use crate::config::{BatchFile, RunSpec};
use crate::engine::locator::PlatformLocator;
use crate::model::{PolarJob, RunEvent, RunResult};
use crate::orchestrator::{run_batch, BatchOptions};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "xfoil-runner",
    version,
    about = "Run XFOIL airfoil polars in batch, without its interactive menus"
)]
pub struct Cli {
    /// NACA 4- or 5-digit designation to analyse (e.g. 0012)
    #[arg(long, conflicts_with = "file")]
    pub naca: Option<String>,

    /// Airfoil coordinate file to analyse
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Angles of attack in degrees, in the order to run them (comma separated or repeated)
    #[arg(long = "alfa", value_delimiter = ',', allow_hyphen_values = true)]
    pub alfas: Vec<f64>,

    /// Reynolds number (0 for inviscid); applies to every run, including config entries
    #[arg(long = "re")]
    pub reynolds: Option<f64>,

    /// Iteration cap per angle of attack; applies to every run
    #[arg(long = "iter")]
    pub iterations: Option<u32>,

    /// Batch file with [xfoil], [defaults] and [[run]] sections
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to the XFOIL executable
    #[arg(long, env = "XFOIL_PATH")]
    pub xfoil: Option<PathBuf>,

    /// Root directory for results (one subdirectory per airfoil)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Do not write per-angle surface pressure files
    #[arg(long)]
    pub no_cp: bool,

    /// Append to existing polar files and keep existing geometry files
    #[arg(long)]
    pub no_overwrite: bool,

    /// Re-panel the geometry before running
    #[arg(long)]
    pub pane: bool,

    /// Extra XFOIL top-menu command to run after loading the geometry (repeatable)
    #[arg(long = "cmd", value_name = "LINE", allow_hyphen_values = true)]
    pub commands: Vec<String>,

    /// Let XFOIL open its graphics window
    #[arg(long)]
    pub no_headless: bool,

    /// Show XFOIL's own console output
    #[arg(long)]
    pub show_xfoil: bool,

    /// Print the command scripts and exit without running XFOIL
    #[arg(long)]
    pub dry_run: bool,

    /// Print JSON results instead of the text summary
    #[arg(long)]
    pub json: bool,

    /// Suppress all output except errors
    #[arg(long, conflicts_with_all = ["json", "verbose"])]
    pub silent: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Export all run results as a JSON array
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Use --auto-save true or --auto-save false to override the settings file
    #[arg(long, action = clap::ArgAction::Set)]
    pub auto_save: Option<bool>,

    /// List the N most recent saved runs and exit
    #[arg(long, value_name = "N")]
    pub history: Option<usize>,
}

impl Cli {
    /// Airfoil given directly on the command line, as a batch entry.
    fn run_spec(&self) -> Option<RunSpec> {
        if self.naca.is_none() && self.file.is_none() {
            return None;
        }
        Some(RunSpec {
            naca: self.naca.clone(),
            file: self.file.clone(),
            alfas: if self.alfas.is_empty() {
                vec![0.0]
            } else {
                self.alfas.clone()
            },
            commands: self.commands.clone(),
            ..Default::default()
        })
    }
}

/// Merge settings file(s) and flags into the batch to run. Flags win.
pub fn build_batch(args: &Cli) -> Result<BatchFile> {
    let mut batch = match args.config.as_deref() {
        Some(path) => BatchFile::load(path)?,
        None => BatchFile::load_user()
            .context("failed to read user settings")?
            .unwrap_or_default(),
    };

    if let Some(path) = &args.xfoil {
        batch.xfoil.path = Some(path.clone());
    }
    if let Some(dir) = &args.output_dir {
        batch.xfoil.output_dir = dir.clone();
    }
    if args.no_headless {
        batch.xfoil.headless = false;
    }
    if args.show_xfoil {
        batch.xfoil.quiet = false;
    }
    if let Some(auto_save) = args.auto_save {
        batch.xfoil.auto_save = auto_save;
    }

    let d = &mut batch.defaults;
    if let Some(re) = args.reynolds {
        d.reynolds = re;
    }
    if let Some(iter) = args.iterations {
        d.iterations = iter;
    }
    if args.no_cp {
        d.save_cp = false;
    }
    if args.no_overwrite {
        d.overwrite = false;
    }
    if args.pane {
        d.pane = true;
    }
    // A flag also beats values set on individual [[run]] entries.
    for run in &mut batch.runs {
        if args.reynolds.is_some() {
            run.reynolds = None;
        }
        if args.iterations.is_some() {
            run.iterations = None;
        }
        if args.no_cp {
            run.save_cp = None;
        }
        if args.no_overwrite {
            run.overwrite = None;
        }
        if args.pane {
            run.pane = None;
        }
    }

    if let Some(spec) = args.run_spec() {
        batch.runs.push(spec);
    }
    Ok(batch)
}

pub async fn run(args: Cli) -> Result<()> {
    if let Some(n) = args.history {
        return print_history(n);
    }

    let batch = build_batch(&args)?;
    let jobs: Vec<PolarJob> = batch.jobs()?;
    if jobs.is_empty() {
        anyhow::bail!("nothing to run: pass --naca, --file or --config with [[run]] entries");
    }
    tracing::info!(jobs = jobs.len(), "starting batch");

    let opts = BatchOptions {
        quiet: batch.xfoil.quiet,
        auto_save: batch.xfoil.auto_save,
        dry_run: args.dry_run,
    };
    let locator = PlatformLocator::new(batch.xfoil.path.clone());

    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<RunEvent>();
    let handle = tokio::spawn(async move { run_batch(jobs, &locator, opts, evt_tx).await });

    while let Some(ev) = evt_rx.recv().await {
        if args.silent {
            continue;
        }
        match ev {
            RunEvent::JobStarted {
                index,
                total,
                airfoil,
            } => {
                let _ = out_tx.send(OutputLine::Stderr(format!(
                    "== [{}/{}] {} ==",
                    index + 1,
                    total,
                    airfoil
                )));
            }
            RunEvent::ScriptBuilt { airfoil, lines } => {
                if args.dry_run {
                    let _ = out_tx.send(OutputLine::Stdout(format!("# {}", airfoil)));
                    for line in lines {
                        let _ = out_tx.send(OutputLine::Stdout(line));
                    }
                }
            }
            RunEvent::XfoilExited { airfoil, code } => {
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                let _ = out_tx.send(OutputLine::Stderr(format!(
                    "{}: XFOIL exited ({})",
                    airfoil, code
                )));
            }
            RunEvent::Info(info) => {
                let _ = out_tx.send(OutputLine::Stderr(info.to_message()));
            }
            RunEvent::RunCompleted { result } => {
                let _ = out_tx.send(OutputLine::Stderr(format!(
                    "{}: {}/{} angles converged",
                    result.airfoil,
                    result.converged.len(),
                    result.alfas.len()
                )));
            }
        }
    }

    let results = handle.await.context("batch task failed")??;

    handle_exports(&args, &results)?;
    if !args.silent && !args.dry_run {
        if args.json {
            let out = serde_json::to_string_pretty(&results)?;
            let _ = out_tx.send(OutputLine::Stdout(out));
        } else {
            for line in crate::text_summary::build_text_summary(&results).lines {
                let _ = out_tx.send(OutputLine::Stdout(line));
            }
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

fn print_history(limit: usize) -> Result<()> {
    let runs = crate::storage::load_recent(limit).context("failed to load run history")?;
    if runs.is_empty() {
        println!("No saved runs.");
    }
    for line in crate::text_summary::build_text_summary(&runs).lines {
        println!("{}", line);
    }
    Ok(())
}

fn handle_exports(args: &Cli, results: &[RunResult]) -> Result<()> {
    if let Some(p) = args.export_json.as_deref() {
        let data = serde_json::to_vec_pretty(results)?;
        std::fs::write(p, data).with_context(|| format!("write {}", p.display()))?;
    }
    Ok(())
}
