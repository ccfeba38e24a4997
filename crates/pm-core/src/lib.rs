//! pm-core - Shared functionality for the Personal Manager CLI
//!
//! Holds the pieces that do not depend on how a command is run:
//! where files live and what the user configured.

pub mod config;
pub mod paths;

pub use config::{Config, OutputMode};
pub use paths::Paths;
