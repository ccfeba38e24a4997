//! pm - Personal Manager
//!
//! A command router in front of a shell passthrough. `task` and `time`
//! are placeholders until taskwarrior and timewarrior are wired in.

pub mod cli;
pub mod error;
pub mod router;
pub mod shell;
pub mod stubs;

pub use error::PmError;
pub use router::{Handlers, Invocation, Router, Subcommand};
pub use shell::{ExecutionResult, ShellExecutor, ShellRequest};
