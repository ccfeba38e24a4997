//! pm - Personal Manager
//!
//! Routes `shell`, `task` and `time` to their handlers. The exit code of
//! `pm shell` is the exit code of the command it ran.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pm::cli::{self, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so a command's stdout passes through untouched
    let filter = if cli.verbose {
        EnvFilter::new("pm=debug,pm_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let code = cli::run(cli)?;
    std::process::exit(code);
}
