//! Run lifecycle controller.
//!
//! Runs polar jobs one after another and emits events for presentation layers.

use crate::engine::locator::ExecutableLocator;
use crate::engine::{self, Session};
use crate::model::{InfoEvent, PolarJob, RunEvent, RunResult};
use crate::orchestrator::{process_run, OutputSnapshot};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BatchOptions {
    /// Discard XFOIL's own console output
    pub quiet: bool,
    /// Copy every manifest into the history directory
    pub auto_save: bool,
    /// Build and report scripts without launching XFOIL or touching existing outputs
    pub dry_run: bool,
}

/// Queue the full command sequence for one polar job: geometry, polar, quit.
///
/// With `dry_run` nothing on disk changes: the output directory is not
/// created and a stale polar is not deleted. The queued commands are the same.
pub(crate) fn build_session(
    job: &PolarJob,
    executable: PathBuf,
    dry_run: bool,
) -> engine::Result<Session> {
    let mut session = if dry_run {
        Session::preview(job.config.clone(), executable)?
    } else {
        Session::new(job.config.clone(), executable)?
    };
    if job.pane {
        session.pane()?;
    }
    for cmd in &job.commands {
        session.push_raw(cmd.as_str())?;
    }
    session.save_geometry(job.overwrite)?;
    session.run_polar(&job.alfas, job.save_cp, job.overwrite && !dry_run)?;
    session.terminate()?;
    Ok(session)
}

async fn run_job(
    job: &PolarJob,
    executable: PathBuf,
    opts: BatchOptions,
    event_tx: &UnboundedSender<RunEvent>,
) -> engine::Result<Option<RunResult>> {
    let mut session = build_session(job, executable, opts.dry_run)?;
    let airfoil = session.naming().name().to_string();
    let _ = event_tx.send(RunEvent::ScriptBuilt {
        airfoil: airfoil.clone(),
        lines: session.script().lines(),
    });
    if opts.dry_run {
        return Ok(None);
    }

    let before = OutputSnapshot::capture(&session);
    let status = session.flush(opts.quiet).await?;
    let code = status.and_then(|s| s.code());
    let _ = event_tx.send(RunEvent::XfoilExited {
        airfoil: airfoil.clone(),
        code,
    });

    match process_run(&session, &before, job.save_cp, code, opts.auto_save) {
        Ok(processed) => {
            if let Some(p) = processed.history_path {
                let _ = event_tx.send(RunEvent::Info(InfoEvent::Message(format!(
                    "Saved: {}",
                    p.display()
                ))));
            }
            Ok(Some(processed.result))
        }
        Err(e) => {
            let _ = event_tx.send(RunEvent::Info(InfoEvent::JobFailed {
                airfoil,
                error: format!("{e:#}"),
            }));
            Ok(None)
        }
    }
}

/// Run every job in order. A job with bad input is reported and skipped;
/// a missing or unlaunchable executable stops the batch.
pub(crate) async fn run_batch(
    jobs: Vec<PolarJob>,
    locator: &dyn ExecutableLocator,
    opts: BatchOptions,
    event_tx: UnboundedSender<RunEvent>,
) -> Result<Vec<RunResult>> {
    let executable = match locator.locate() {
        Ok(path) => path,
        Err(e) if opts.dry_run => {
            tracing::warn!("{e}; continuing dry run");
            PathBuf::from("xfoil")
        }
        Err(e) => return Err(e).context("cannot run XFOIL"),
    };
    let _ = event_tx.send(RunEvent::Info(InfoEvent::Executable {
        path: executable.clone(),
    }));

    let total = jobs.len();
    let mut results = Vec::with_capacity(total);
    for (index, job) in jobs.iter().enumerate() {
        let airfoil = engine::naming::airfoil_name(&job.config.source);
        let _ = event_tx.send(RunEvent::JobStarted {
            index,
            total,
            airfoil: airfoil.clone(),
        });

        match run_job(job, executable.clone(), opts, &event_tx).await {
            Ok(Some(result)) => {
                let _ = event_tx.send(RunEvent::RunCompleted {
                    result: Box::new(result.clone()),
                });
                results.push(result);
            }
            Ok(None) => {}
            Err(e) if e.is_fatal() => {
                return Err(e).with_context(|| format!("{} aborted the batch", airfoil));
            }
            Err(e) => {
                tracing::error!(%airfoil, "{e}");
                let _ = event_tx.send(RunEvent::Info(InfoEvent::JobFailed {
                    airfoil,
                    error: e.to_string(),
                }));
            }
        }
    }
    Ok(results)
}
