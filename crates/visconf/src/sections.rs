//! Config sections and their compiled defaults.

use serde::{Deserialize, Serialize};

/// Accepted values for `labels.size`.
pub const SIZE_VALUES: &[&str] = &["simple", "compound"];

/// Accepted values for `labels.direction`.
pub const DIRECTION_VALUES: &[&str] = &["always", "descending", "never"];

/// Accepted values for `experiment.sort`.
pub const SORT_VALUES: &[&str] = &["frequency", "label"];

/// Accepted values for `experiment.sort_order`.
pub const SORT_ORDER_VALUES: &[&str] = &["ascending", "descending"];

/// Accepted values for `analysis.repeats`.
pub const REPEATS_VALUES: &[&str] = &["keep", "collapse"];

/// Sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Offset interval in quarter lengths.
    /// Default: 1.0 (every quarter note)
    #[serde(default = "AnalysisConfig::default_offset_interval")]
    pub offset_interval: f64,

    /// One of [`REPEATS_VALUES`]. Default: keep
    #[serde(default = "AnalysisConfig::default_repeats")]
    pub repeats: String,
}

impl AnalysisConfig {
    fn default_offset_interval() -> f64 {
        1.0
    }

    fn default_repeats() -> String {
        "keep".to_string()
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            offset_interval: Self::default_offset_interval(),
            repeats: Self::default_repeats(),
        }
    }
}

/// Defaults for fields the command line leaves out.
///
/// They are only applied where the chosen object kind and display mode
/// enable them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Default: 2
    #[serde(default = "ExperimentConfig::default_ngram_n")]
    pub ngram_n: usize,

    /// Default: 10
    #[serde(default = "ExperimentConfig::default_top_k")]
    pub top_k: usize,

    /// One of [`SORT_VALUES`]. Default: frequency
    #[serde(default = "ExperimentConfig::default_sort")]
    pub sort: String,

    /// One of [`SORT_ORDER_VALUES`]. Default: descending
    #[serde(default = "ExperimentConfig::default_sort_order")]
    pub sort_order: String,
}

impl ExperimentConfig {
    fn default_ngram_n() -> usize {
        2
    }

    fn default_top_k() -> usize {
        10
    }

    fn default_sort() -> String {
        "frequency".to_string()
    }

    fn default_sort_order() -> String {
        "descending".to_string()
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            ngram_n: Self::default_ngram_n(),
            top_k: Self::default_top_k(),
            sort: Self::default_sort(),
            sort_order: Self::default_sort_order(),
        }
    }
}

/// How interval labels are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelsConfig {
    /// Print interval quality (`m3` rather than `3`). Default: true
    #[serde(default = "LabelsConfig::default_quality")]
    pub quality: bool,

    /// One of [`SIZE_VALUES`]. Default: compound
    #[serde(default = "LabelsConfig::default_size")]
    pub size: String,

    /// One of [`DIRECTION_VALUES`]. Default: descending
    #[serde(default = "LabelsConfig::default_direction")]
    pub direction: String,

    /// Interleave lowest-voice motion in n-gram labels. Default: false
    #[serde(default)]
    pub horizontal: bool,
}

impl LabelsConfig {
    fn default_quality() -> bool {
        true
    }

    fn default_size() -> String {
        "compound".to_string()
    }

    fn default_direction() -> String {
        "descending".to_string()
    }
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            quality: Self::default_quality(),
            size: Self::default_size(),
            direction: Self::default_direction(),
            horizontal: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive. Default: info
    #[serde(default = "LoggingConfig::default_log_level")]
    pub log_level: String,
}

impl LoggingConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
