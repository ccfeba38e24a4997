//! Command router
//!
//! Maps the first positional argument to exactly one handler and forwards
//! the rest of the arguments to it untouched.

use tracing::debug;

use crate::error::PmError;

/// Top-level subcommands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subcommand {
    Shell,
    Task,
    Time,
}

/// Subcommand metadata
#[derive(Debug, Clone)]
pub struct SubcommandInfo {
    pub subcommand: Subcommand,
    pub description: &'static str,
    pub examples: &'static [&'static str],
}

impl SubcommandInfo {
    const fn new(
        subcommand: Subcommand,
        description: &'static str,
        examples: &'static [&'static str],
    ) -> Self {
        Self {
            subcommand,
            description,
            examples,
        }
    }
}

/// All subcommands, in the order usage lists them
pub const SUBCOMMANDS: &[SubcommandInfo] = &[
    SubcommandInfo::new(
        Subcommand::Shell,
        "Execute a shell command",
        &["pm shell ls -la", "pm shell \"git status | head\""],
    ),
    SubcommandInfo::new(
        Subcommand::Task,
        "Task management (taskwarrior, not yet integrated)",
        &["pm task list"],
    ),
    SubcommandInfo::new(
        Subcommand::Time,
        "Time tracking (timewarrior, not yet integrated)",
        &["pm time summary"],
    ),
];

impl Subcommand {
    /// Exact, case-sensitive lookup
    pub fn from_name(name: &str) -> Option<Self> {
        SUBCOMMANDS
            .iter()
            .map(|info| info.subcommand)
            .find(|subcommand| subcommand.as_str() == name)
    }

    /// Name typed on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shell => "shell",
            Self::Task => "task",
            Self::Time => "time",
        }
    }
}

/// A parsed request: which subcommand, and its arguments verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    subcommand: Subcommand,
    arguments: Vec<String>,
}

impl Invocation {
    /// Parse the arguments that follow the program name
    pub fn parse(args: Vec<String>) -> Result<Self, PmError> {
        let mut args = args.into_iter();

        let first = args
            .next()
            .ok_or_else(|| PmError::Usage("missing subcommand".to_string()))?;

        let subcommand = Subcommand::from_name(&first)
            .ok_or_else(|| PmError::Usage(format!("unknown subcommand: {}", first)))?;

        Ok(Self {
            subcommand,
            arguments: args.collect(),
        })
    }

    pub fn subcommand(&self) -> Subcommand {
        self.subcommand
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

/// One handler per subcommand
///
/// Each returns the exit code the process should finish with.
pub trait Handlers {
    fn shell(&mut self, args: &[String]) -> Result<i32, PmError>;
    fn task(&mut self, args: &[String]) -> Result<i32, PmError>;
    fn time(&mut self, args: &[String]) -> Result<i32, PmError>;
}

pub struct Router<H> {
    handlers: H,
}

impl<H: Handlers> Router<H> {
    pub fn new(handlers: H) -> Self {
        Self { handlers }
    }

    /// Parse raw arguments and run the matching handler
    pub fn run(&mut self, args: Vec<String>) -> Result<i32, PmError> {
        let invocation = Invocation::parse(args)?;
        self.dispatch(&invocation)
    }

    pub fn dispatch(&mut self, invocation: &Invocation) -> Result<i32, PmError> {
        debug!(
            subcommand = invocation.subcommand.as_str(),
            args = ?invocation.arguments,
            "dispatching"
        );

        let args = invocation.arguments();
        match invocation.subcommand {
            Subcommand::Shell => self.handlers.shell(args),
            Subcommand::Task => self.handlers.task(args),
            Subcommand::Time => self.handlers.time(args),
        }
    }

    pub fn handlers(&self) -> &H {
        &self.handlers
    }
}

/// Usage summary listing every subcommand
pub fn usage() -> String {
    let mut text = String::from("Usage: pm [OPTIONS] <SUBCOMMAND> [ARGS...]\n\nSubcommands:\n");
    for info in SUBCOMMANDS {
        text.push_str(&format!(
            "    {:8} {}\n",
            info.subcommand.as_str(),
            info.description
        ));
    }
    text.push_str("\nExamples:\n");
    for example in SUBCOMMANDS.iter().flat_map(|info| info.examples) {
        text.push_str(&format!("    {}\n", example));
    }
    text
}
