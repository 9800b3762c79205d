//! Run manifests on disk: next to the polar, and in a per-user history directory.

use crate::model::RunResult;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub fn history_dir() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .context("no local data directory for this user")?;
    Ok(base.join("xfoil-runner").join("history"))
}

pub fn export_json(path: &Path, result: &RunResult) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    let data = serde_json::to_vec_pretty(result)?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// File name used in the history directory: timestamp first so names sort chronologically.
fn history_file_name(result: &RunResult) -> String {
    let stamp = result.timestamp_utc.replace(':', "-");
    let stem = result
        .polar
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| result.airfoil.clone());
    format!("{}_{}.json", stamp, stem)
}

pub fn save_run(result: &RunResult) -> Result<PathBuf> {
    save_run_in(&history_dir()?, result)
}

pub fn save_run_in(dir: &Path, result: &RunResult) -> Result<PathBuf> {
    let path = dir.join(history_file_name(result));
    export_json(&path, result)?;
    Ok(path)
}

pub fn load_recent(limit: usize) -> Result<Vec<RunResult>> {
    load_recent_in(&history_dir()?, limit)
}

/// Newest first. Unreadable entries are skipped.
pub fn load_recent_in(dir: &Path, limit: usize) -> Result<Vec<RunResult>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("read {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    files.sort();
    files.reverse();

    let mut out = Vec::new();
    for path in files {
        if out.len() >= limit {
            break;
        }
        match std::fs::read(&path)
            .map_err(anyhow::Error::from)
            .and_then(|data| serde_json::from_slice::<RunResult>(&data).map_err(Into::into))
        {
            Ok(run) => out.push(run),
            Err(e) => tracing::debug!(path = %path.display(), "skipping history entry: {e:#}"),
        }
    }
    Ok(out)
}
