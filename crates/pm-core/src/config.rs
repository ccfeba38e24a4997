//! Configuration management for pm
//!
//! The configuration is read once at startup and handed to the router.
//! Every field has a default, so a missing file or a partial file is fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How a child process's output reaches the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Child shares the terminal's stdout/stderr
    #[default]
    Inherit,
    /// Output is buffered and printed after the child exits
    Capture,
}

/// Global pm configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Shell used for string-form commands (defaults to `sh`, or `cmd` on Windows)
    #[serde(default)]
    pub shell: Option<String>,

    /// Kill shell commands that run longer than this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Output handling for shell commands
    #[serde(default)]
    pub output: OutputMode,
}

impl Config {
    /// Load config from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Configured timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
