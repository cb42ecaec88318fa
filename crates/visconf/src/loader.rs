//! Config file discovery, loading, and environment variable overlay.

use crate::sections::{DIRECTION_VALUES, REPEATS_VALUES, SIZE_VALUES, SORT_ORDER_VALUES, SORT_VALUES};
use crate::{ConfigError, VisConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in load order (system, user, local).
///
/// A CLI path replaces the local `./vis.toml` and has `~/` and `$VAR`
/// expanded. It is returned even when it does not exist, so that loading
/// reports the missing file instead of quietly falling back to defaults.
/// The other locations are only returned when they exist.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/vis/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("vis/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        files.push(expand_path(&path.to_string_lossy()));
        return files;
    }

    let local = PathBuf::from("vis.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load a TOML file on top of `base`. Keys the file does not name keep
/// their value from `base`.
pub fn load_from_file(base: VisConfig, path: &Path) -> Result<VisConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    overlay_toml(base, &contents, path)
}

/// Parse a TOML string over compiled defaults.
pub fn parse_toml(contents: &str, path: &Path) -> Result<VisConfig, ConfigError> {
    overlay_toml(VisConfig::default(), contents, path)
}

fn overlay_toml(mut config: VisConfig, contents: &str, path: &Path) -> Result<VisConfig, ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let invalid = |key: &str, expected: &str| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("{key}: expected {expected}"),
    };

    if let Some(analysis) = table.get("analysis").and_then(|v| v.as_table()) {
        if let Some(v) = analysis.get("offset_interval") {
            let interval = v
                .as_float()
                .or_else(|| v.as_integer().map(|i| i as f64))
                .filter(|f| f.is_finite() && *f > 0.0)
                .ok_or_else(|| invalid("analysis.offset_interval", "a positive number"))?;
            config.analysis.offset_interval = interval;
        }
        if let Some(v) = analysis.get("repeats") {
            config.analysis.repeats = one_of(v, REPEATS_VALUES)
                .ok_or_else(|| invalid("analysis.repeats", REPEATS_VALUES.join(" | ").as_str()))?;
        }
    }

    if let Some(experiment) = table.get("experiment").and_then(|v| v.as_table()) {
        if let Some(v) = experiment.get("ngram_n") {
            config.experiment.ngram_n = positive(v).ok_or_else(|| invalid("experiment.ngram_n", "an integer >= 1"))?;
        }
        if let Some(v) = experiment.get("top_k") {
            config.experiment.top_k = positive(v).ok_or_else(|| invalid("experiment.top_k", "an integer >= 1"))?;
        }
        if let Some(v) = experiment.get("sort") {
            config.experiment.sort = one_of(v, SORT_VALUES)
                .ok_or_else(|| invalid("experiment.sort", SORT_VALUES.join(" | ").as_str()))?;
        }
        if let Some(v) = experiment.get("sort_order") {
            config.experiment.sort_order = one_of(v, SORT_ORDER_VALUES)
                .ok_or_else(|| invalid("experiment.sort_order", SORT_ORDER_VALUES.join(" | ").as_str()))?;
        }
    }

    if let Some(labels) = table.get("labels").and_then(|v| v.as_table()) {
        if let Some(v) = labels.get("quality") {
            config.labels.quality = v.as_bool().ok_or_else(|| invalid("labels.quality", "true or false"))?;
        }
        if let Some(v) = labels.get("size") {
            config.labels.size =
                one_of(v, SIZE_VALUES).ok_or_else(|| invalid("labels.size", SIZE_VALUES.join(" | ").as_str()))?;
        }
        if let Some(v) = labels.get("direction") {
            config.labels.direction = one_of(v, DIRECTION_VALUES)
                .ok_or_else(|| invalid("labels.direction", DIRECTION_VALUES.join(" | ").as_str()))?;
        }
        if let Some(v) = labels.get("horizontal") {
            config.labels.horizontal =
                v.as_bool().ok_or_else(|| invalid("labels.horizontal", "true or false"))?;
        }
    }

    if let Some(logging) = table.get("logging").and_then(|v| v.as_table()) {
        if let Some(v) = logging.get("log_level").and_then(|v| v.as_str()) {
            config.logging.log_level = v.to_string();
        }
    }

    Ok(config)
}

fn positive(value: &toml::Value) -> Option<usize> {
    value
        .as_integer()
        .filter(|i| *i >= 1)
        .and_then(|i| usize::try_from(i).ok())
}

fn one_of(value: &toml::Value, allowed: &[&str]) -> Option<String> {
    let s = value.as_str()?.to_lowercase();
    allowed.contains(&s.as_str()).then_some(s)
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut VisConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from any variable lookup. Values that do not parse are
/// ignored and not recorded as overrides.
pub fn apply_overrides_from(
    config: &mut VisConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let mut record = |key: &str| sources.env_overrides.push(key.to_string());

    if let Some(v) = lookup("VIS_LOG_LEVEL") {
        config.logging.log_level = v;
        record("VIS_LOG_LEVEL");
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.logging.log_level = v;
        record("RUST_LOG");
    }

    if let Some(v) = lookup("VIS_OFFSET_INTERVAL") {
        if let Ok(interval) = v.parse::<f64>() {
            if interval.is_finite() && interval > 0.0 {
                config.analysis.offset_interval = interval;
                record("VIS_OFFSET_INTERVAL");
            }
        }
    }
    if let Some(v) = lookup("VIS_REPEATS") {
        let v = v.to_lowercase();
        if REPEATS_VALUES.contains(&v.as_str()) {
            config.analysis.repeats = v;
            record("VIS_REPEATS");
        }
    }
    if let Some(v) = lookup("VIS_TOP_K") {
        if let Some(k) = v.parse::<usize>().ok().filter(|k| *k >= 1) {
            config.experiment.top_k = k;
            record("VIS_TOP_K");
        }
    }
    if let Some(v) = lookup("VIS_NGRAM_N") {
        if let Some(n) = v.parse::<usize>().ok().filter(|n| *n >= 1) {
            config.experiment.ngram_n = n;
            record("VIS_NGRAM_N");
        }
    }

    if let Some(v) = lookup("VIS_SORT_ORDER") {
        let v = v.to_lowercase();
        if SORT_ORDER_VALUES.contains(&v.as_str()) {
            config.experiment.sort_order = v;
            record("VIS_SORT_ORDER");
        }
    }

    if let Some(v) = lookup("VIS_LABEL_QUALITY") {
        if let Ok(quality) = v.parse::<bool>() {
            config.labels.quality = quality;
            record("VIS_LABEL_QUALITY");
        }
    }
    if let Some(v) = lookup("VIS_LABEL_SIZE") {
        let v = v.to_lowercase();
        if SIZE_VALUES.contains(&v.as_str()) {
            config.labels.size = v;
            record("VIS_LABEL_SIZE");
        }
    }
    if let Some(v) = lookup("VIS_LABEL_DIRECTION") {
        let v = v.to_lowercase();
        if DIRECTION_VALUES.contains(&v.as_str()) {
            config.labels.direction = v;
            record("VIS_LABEL_DIRECTION");
        }
    }
}

/// Expand `~/` and a leading `$VAR` in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
        return PathBuf::from(path);
    }

    if let Some(stripped) = path.strip_prefix('$') {
        let (var_name, rest) = match stripped.find('/') {
            Some(slash) => (&stripped[..slash], Some(&stripped[slash + 1..])),
            None => (stripped, None),
        };
        return match (env::var(var_name), rest) {
            (Ok(value), Some(rest)) => PathBuf::from(value).join(rest),
            (Ok(value), None) => PathBuf::from(value),
            (Err(_), _) => PathBuf::from(path),
        };
    }

    PathBuf::from(path)
}
