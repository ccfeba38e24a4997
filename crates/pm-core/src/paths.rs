//! Standard paths used by pm

use std::path::PathBuf;

/// Standard pm paths
pub struct Paths {
    /// Config directory (~/.config/pm)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("pm");

        Self { config }
    }

    /// Default location of the configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }
}
