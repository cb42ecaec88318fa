//! Configuration loading for vis.
//!
//! Holds defaults for the experiment fields a command line may leave out,
//! interval label style, and the log filter.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, key by key):
//! 1. `/etc/vis/config.toml` (system)
//! 2. `~/.config/vis/config.toml` (user)
//! 3. `./vis.toml` (local override), or the path given with `--config`
//! 4. Environment variables (`VIS_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [analysis]
//! offset_interval = 0.5
//! repeats = "keep"
//!
//! [experiment]
//! ngram_n = 3
//! top_k = 20
//! sort = "frequency"
//! sort_order = "descending"
//!
//! [labels]
//! quality = true
//! size = "compound"
//! direction = "descending"
//! horizontal = false
//!
//! [logging]
//! log_level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{AnalysisConfig, ExperimentConfig, LabelsConfig, LoggingConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete vis configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub experiment: ExperimentConfig,

    #[serde(default)]
    pub labels: LabelsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VisConfig {
    /// Load configuration from all sources, with `config_path` in place of
    /// `./vis.toml`, and report which files and variables were used.
    pub fn load_with_sources_from(config_path: Option<&Path>) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = VisConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            config = loader::load_from_file(config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Built by hand so section order and comments stay stable
        let mut output = String::new();

        output.push_str("# vis configuration\n\n");

        output.push_str("[analysis]\n");
        output.push_str(&format!(
            "offset_interval = {:?}\n",
            self.analysis.offset_interval
        ));
        output.push_str(&format!("repeats = \"{}\"\n", self.analysis.repeats));

        output.push_str("\n[experiment]\n");
        output.push_str(&format!("ngram_n = {}\n", self.experiment.ngram_n));
        output.push_str(&format!("top_k = {}\n", self.experiment.top_k));
        output.push_str(&format!("sort = \"{}\"\n", self.experiment.sort));
        output.push_str(&format!("sort_order = \"{}\"\n", self.experiment.sort_order));

        output.push_str("\n[labels]\n");
        output.push_str(&format!("quality = {}\n", self.labels.quality));
        output.push_str(&format!("size = \"{}\"\n", self.labels.size));
        output.push_str(&format!("direction = \"{}\"\n", self.labels.direction));
        output.push_str(&format!("horizontal = {}\n", self.labels.horizontal));

        output.push_str("\n[logging]\n");
        output.push_str(&format!("log_level = \"{}\"\n", self.logging.log_level));

        output
    }
}
