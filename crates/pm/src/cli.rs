//! CLI definition and terminal-facing handlers

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use pm_core::{Config, OutputMode, Paths};

use crate::error::PmError;
use crate::router::{usage, Handlers, Router};
use crate::shell::{ShellExecutor, ShellRequest};
use crate::stubs::{task_notice, time_notice};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// pm - Personal Manager
#[derive(Parser)]
#[command(name = "pm")]
#[command(version = VERSION)]
#[command(about = "Personal Manager - CLI task and project organizer")]
#[command(disable_help_subcommand = true)]
#[command(after_help = "\
SUBCOMMANDS:
    shell <cmd> [args...]   Run a program directly, no shell interpretation
    shell \"<cmd string>\"    Run a line through the host shell (pipes, redirection)
    task [list|add]         Task management (taskwarrior, not yet integrated)
    time [start|stop|summary]
                            Time tracking (timewarrior, not yet integrated)

EXIT CODES:
    shell mirrors the command's exit code
    2    usage error
    124  command timed out (--timeout)
    126  command could not be executed
    127  command not found")]
pub struct Cli {
    /// Config file (default: ~/.config/pm/config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Kill shell commands that run longer than this
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Buffer command output and print it once the command exits
    #[arg(long)]
    pub capture: bool,

    /// Debug logging to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// Load the config file and apply command-line overrides
    pub fn config(&self) -> Result<Config> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| Paths::new().config_file());
        let mut config = Config::load(&path)?;

        if let Some(secs) = self.timeout {
            config.timeout_secs = Some(secs);
        }
        if self.capture {
            config.output = OutputMode::Capture;
        }

        Ok(config)
    }
}

/// Handlers that talk to the user's terminal
pub struct TerminalHandlers {
    executor: ShellExecutor,
}

impl TerminalHandlers {
    pub fn new(executor: ShellExecutor) -> Self {
        Self { executor }
    }
}

impl Handlers for TerminalHandlers {
    fn shell(&mut self, args: &[String]) -> Result<i32, PmError> {
        let request = ShellRequest::from_args(args)?;
        let result = self.executor.execute(&request)?;

        if self.executor.output_mode() == OutputMode::Capture {
            if let Err(err) = relay(io::stdout().lock(), &result.stdout) {
                warn!(%err, "failed to write captured stdout");
            }
            if let Err(err) = relay(io::stderr().lock(), &result.stderr) {
                warn!(%err, "failed to write captured stderr");
            }
        }

        if result.interrupted && !result.succeeded() {
            eprintln!();
            eprintln!("Operation cancelled by user");
        }

        Ok(result.exit_code)
    }

    fn task(&mut self, args: &[String]) -> Result<i32, PmError> {
        info!(?args, "task placeholder");
        println!("{}", task_notice(args));
        Ok(0)
    }

    fn time(&mut self, args: &[String]) -> Result<i32, PmError> {
        info!(?args, "time placeholder");
        println!("{}", time_notice(args));
        Ok(0)
    }
}

/// Write captured output; a reader that went away is not an error
fn relay(mut out: impl Write, bytes: &[u8]) -> io::Result<()> {
    match out.write_all(bytes).and_then(|()| out.flush()) {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
            debug!("output reader closed early");
            Ok(())
        }
        other => other,
    }
}

/// Run the CLI, returning the process exit code
pub fn run(cli: Cli) -> Result<i32> {
    let config = cli.config()?;
    let executor = ShellExecutor::new(&config).context("Failed to start process runtime")?;
    let mut router = Router::new(TerminalHandlers::new(executor));

    match router.run(cli.args) {
        Ok(code) => Ok(code),
        Err(err) => {
            report(&err);
            Ok(err.exit_code())
        }
    }
}

fn report(err: &PmError) {
    eprintln!("{} {}", "error:".red(), err);

    if err.is_usage() {
        eprintln!();
        eprint!("{}", usage());
        eprintln!("Run {} for options", "pm --help".bold());
    }
}
