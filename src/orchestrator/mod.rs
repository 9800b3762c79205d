//! Batch orchestration.
//!
//! This module owns the run lifecycle of each polar job (build, flush) and the
//! post-run processing that turns XFOIL's output files into a manifest. The CLI
//! layer calls into this module and only renders the events it emits.

mod controller;
mod post_process;

pub(crate) use controller::{run_batch, BatchOptions};
pub(crate) use post_process::{process_run, OutputSnapshot};
