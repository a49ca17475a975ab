//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `HC_*`
//! environment variables, and merging configurations with proper precedence
//! rules. Command-line options are applied on top by the caller.

use crate::error::HandleCheckError;
use crate::types::{ScanMode, DEFAULT_FAST_LIMIT, MAX_CONCURRENCY, MAX_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration loaded from TOML files.
///
/// ```toml
/// [defaults]
/// concurrency = 40
/// timeout = "8s"
/// mode = "full"
/// catalog = "~/sherlock/data.json"
///
/// [output]
/// format = "json"
/// pretty = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for scan options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Output formatting preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Default concurrency level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Default timeout (as string, e.g., "5s", "30s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// "fast" or "full"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Number of sites checked in fast mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast_limit: Option<usize>,

    /// Path to the site catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    /// Emit progress every N completions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_every: Option<usize>,

    /// Emit progress every 1/N of the scan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_fraction: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// "text", "json" or "csv"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Sort found profiles by site name before printing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<bool>,

    /// Colored, aligned text output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty: Option<bool>,
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Directory searched for local config files
    local_dir: PathBuf,
    /// Home directory, for global config files
    home_dir: Option<PathBuf>,
    /// XDG config base directory
    xdg_config_dir: Option<PathBuf>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a configuration manager rooted at the current directory and
    /// the user's home.
    pub fn new() -> Self {
        let home_dir = env::var_os("HOME").map(PathBuf::from);
        let xdg_config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| home_dir.as_ref().map(|home| home.join(".config")));

        Self {
            local_dir: PathBuf::from("."),
            home_dir,
            xdg_config_dir,
        }
    }

    /// Create a configuration manager over explicit directories.
    pub fn with_dirs<P: Into<PathBuf>>(
        local_dir: P,
        home_dir: Option<PathBuf>,
        xdg_config_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            local_dir: local_dir.into(),
            home_dir,
            xdg_config_dir,
        }
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if parsing fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, HandleCheckError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(HandleCheckError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            HandleCheckError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            HandleCheckError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the global file in the home directory,
    /// then a local file in the working directory. A discovered file that
    /// fails to load is reported and skipped.
    pub fn discover_and_load(&self) -> Result<FileConfig, HandleCheckError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring configuration file"),
            }
        }

        if loaded_files.len() > 1 {
            info!(
                files = ?loaded_files,
                "multiple config files found; later files take precedence"
            );
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["handle-check.toml", ".handle-check.toml"]
            .iter()
            .map(|candidate| self.local_dir.join(candidate))
            .find(|path| path.exists())
    }

    /// Get the global configuration file path.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = self.home_dir.as_ref()?;
        [".handle-check.toml", "handle-check.toml"]
            .iter()
            .map(|candidate| home.join(candidate))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let path = self
            .xdg_config_dir
            .as_ref()?
            .join("handle-check")
            .join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower_defaults), Some(higher_defaults)) => Some(DefaultsConfig {
                    concurrency: higher_defaults.concurrency.or(lower_defaults.concurrency),
                    timeout: higher_defaults.timeout.or(lower_defaults.timeout),
                    mode: higher_defaults.mode.or(lower_defaults.mode),
                    fast_limit: higher_defaults.fast_limit.or(lower_defaults.fast_limit),
                    catalog: higher_defaults.catalog.or(lower_defaults.catalog),
                    // The two cadence settings replace each other as a pair.
                    progress_every: if higher_defaults.progress_fraction.is_some() {
                        higher_defaults.progress_every
                    } else {
                        higher_defaults
                            .progress_every
                            .or(lower_defaults.progress_every)
                    },
                    progress_fraction: if higher_defaults.progress_every.is_some() {
                        higher_defaults.progress_fraction
                    } else {
                        higher_defaults
                            .progress_fraction
                            .or(lower_defaults.progress_fraction)
                    },
                    user_agent: higher_defaults.user_agent.or(lower_defaults.user_agent),
                }),
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            output: match (lower.output, higher.output) {
                (Some(lower_output), Some(higher_output)) => Some(OutputConfig {
                    format: higher_output.format.or(lower_output.format),
                    sort: higher_output.sort.or(lower_output.sort),
                    pretty: higher_output.pretty.or(lower_output.pretty),
                }),
                (lower_output, higher_output) => higher_output.or(lower_output),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), HandleCheckError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > MAX_CONCURRENCY {
                    return Err(HandleCheckError::config(
                        "Concurrency must be between 1 and 100",
                    ));
                }
            }

            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(HandleCheckError::config(format!(
                        "Invalid timeout format '{}'. Use format like '5s', '30s', '2m', at most 60m",
                        timeout_str
                    )));
                }
            }

            if let Some(mode) = &defaults.mode {
                if parse_mode(mode, DEFAULT_FAST_LIMIT).is_none() {
                    return Err(HandleCheckError::config(format!(
                        "Invalid mode '{}'. Use 'fast' or 'full'",
                        mode
                    )));
                }
            }

            if defaults.fast_limit == Some(0) {
                return Err(HandleCheckError::config("fast_limit must be at least 1"));
            }

            if defaults.progress_every == Some(0) || defaults.progress_fraction == Some(0) {
                return Err(HandleCheckError::config(
                    "Progress settings must be at least 1",
                ));
            }

            if defaults.progress_every.is_some() && defaults.progress_fraction.is_some() {
                return Err(HandleCheckError::config(
                    "Cannot specify both 'progress_every' and 'progress_fraction' in defaults",
                ));
            }
        }

        if let Some(format) = config.output.as_ref().and_then(|o| o.format.as_deref()) {
            if !matches!(format, "text" | "json" | "csv") {
                return Err(HandleCheckError::config(format!(
                    "Invalid output format '{}'. Use 'text', 'json' or 'csv'",
                    format
                )));
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via `HC_*`
/// environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub timeout: Option<String>,
    pub mode: Option<String>,
    pub fast_limit: Option<usize>,
    pub catalog: Option<String>,
    pub progress_every: Option<usize>,
    pub config: Option<String>,
    pub json: Option<bool>,
    pub csv: Option<bool>,
    pub pretty: Option<bool>,
}

impl EnvConfig {
    /// Check if output format conflicts exist (JSON and CSV both set).
    pub fn has_output_format_conflict(&self) -> bool {
        matches!((self.json, self.csv), (Some(true), Some(true)))
    }
}

/// Load configuration from environment variables.
///
/// Parses all `HC_*` environment variables. Invalid values are logged as
/// warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    env_config_from(|key| env::var(key).ok())
}

/// Build an [`EnvConfig`] from any variable lookup.
pub fn env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    // HC_CONCURRENCY - probes in flight
    if let Some(val) = lookup("HC_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if (1..=MAX_CONCURRENCY).contains(&concurrency) => {
                debug!("using HC_CONCURRENCY={}", concurrency);
                env_config.concurrency = Some(concurrency);
            }
            _ => warn!("invalid HC_CONCURRENCY='{}', must be 1-100", val),
        }
    }

    if let Some(val) = lookup("HC_TIMEOUT") {
        if parse_timeout_string(&val).is_some() {
            debug!("using HC_TIMEOUT={}", val);
            env_config.timeout = Some(val);
        } else {
            warn!("invalid HC_TIMEOUT='{}', use format like '5s', '30s', '2m'", val);
        }
    }

    if let Some(val) = lookup("HC_MODE") {
        if parse_mode(&val, DEFAULT_FAST_LIMIT).is_some() {
            debug!("using HC_MODE={}", val);
            env_config.mode = Some(val);
        } else {
            warn!("invalid HC_MODE='{}', use fast or full", val);
        }
    }

    env_config.fast_limit = positive_var(&lookup, "HC_FAST_LIMIT");
    env_config.progress_every = positive_var(&lookup, "HC_PROGRESS_EVERY");
    env_config.catalog = path_var(&lookup, "HC_CATALOG");
    env_config.config = path_var(&lookup, "HC_CONFIG");
    env_config.json = bool_var(&lookup, "HC_JSON");
    env_config.csv = bool_var(&lookup, "HC_CSV");
    env_config.pretty = bool_var(&lookup, "HC_PRETTY");

    env_config
}

fn positive_var<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<usize> {
    let val = lookup(key)?;
    match val.trim().parse::<usize>() {
        Ok(n) if n > 0 => {
            debug!("using {}={}", key, n);
            Some(n)
        }
        _ => {
            warn!("invalid {}='{}', must be a positive number", key, val);
            None
        }
    }
}

fn path_var<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    let val = lookup(key)?;
    if val.trim().is_empty() {
        return None;
    }
    debug!("using {}={}", key, val);
    Some(val)
}

fn bool_var<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<bool> {
    let val = lookup(key)?;
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            warn!("invalid {}='{}', use true/false", key, val);
            None
        }
    }
}

/// Parse a timeout string like "500ms", "5s", "2m" or a bare number of
/// seconds.
///
/// Zero and anything above one hour are rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let timeout = if let Some(ms) = timeout_str.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        timeout_str.parse::<u64>().ok().map(Duration::from_secs)
    };

    timeout.filter(|d| !d.is_zero() && *d <= MAX_TIMEOUT)
}

/// Parse a mode name ("fast" or "full").
pub fn parse_mode(mode: &str, fast_limit: usize) -> Option<ScanMode> {
    match mode.trim().to_lowercase().as_str() {
        "fast" => Some(ScanMode::Fast { limit: fast_limit }),
        "full" => Some(ScanMode::Full),
        _ => None,
    }
}
