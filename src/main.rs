mod cli;
mod config;
mod engine;
mod model;
mod orchestrator;
mod storage;
mod tables;
mod text_summary;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_logging(args: &cli::Cli) {
    let default_level = if args.silent {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Configuration errors end the run with a boxed banner on stderr.
fn error_banner(text: &str) -> String {
    let rule = "*".repeat(68);
    format!("\n\n{rule}\nxfoil-runner error: {text}\n{rule}\n\n")
}

#[tokio::main]
async fn main() {
    let args = cli::Cli::parse();
    init_logging(&args);

    if let Err(e) = cli::run(args).await {
        eprint!("{}", error_banner(&format!("{e:#}")));
        std::process::exit(1);
    }
}
