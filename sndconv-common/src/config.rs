//! Bootstrap configuration loading
//!
//! sndconv reads a small TOML file for logging and conversion defaults.
//! Every field has a built-in default, so a missing file (or a missing
//! section) never prevents a conversion from running.
//!
//! # Config File Resolution
//!
//! 1. Command-line argument (highest priority)
//! 2. `SNDCONV_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/sndconv/config.toml` on Linux)
//! 4. Built-in defaults (no file)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SNDCONV_CONFIG";

/// Output file used when neither the CLI nor the config names one
pub const DEFAULT_OUTPUT_FILE: &str = "result.wav";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Conversion defaults (optional)
    #[serde(default)]
    pub conversion: ConversionConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Conversion defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionConfig {
    /// Output path used when the caller does not supply one
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Drain the resampler delay line at end of stream
    #[serde(default = "default_flush_resampler")]
    pub flush_resampler: bool,

    /// Input frames handed to the resampler per call
    #[serde(default = "default_resampler_chunk_frames")]
    pub resampler_chunk_frames: usize,

    /// Frames per packet when reading raw WAV data
    #[serde(default = "default_wav_read_frames")]
    pub wav_read_frames: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            flush_resampler: default_flush_resampler(),
            resampler_chunk_frames: default_resampler_chunk_frames(),
            wav_read_frames: default_wav_read_frames(),
        }
    }
}

impl ConversionConfig {
    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.resampler_chunk_frames == 0 {
            return Err(Error::Config(
                "conversion.resampler_chunk_frames must be greater than zero".to_string(),
            ));
        }
        if self.wav_read_frames == 0 {
            return Err(Error::Config(
                "conversion.wav_read_frames must be greater than zero".to_string(),
            ));
        }
        if self.output.as_os_str().is_empty() {
            return Err(Error::Config("conversion.output must not be empty".to_string()));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILE)
}

fn default_flush_resampler() -> bool {
    true
}

fn default_resampler_chunk_frames() -> usize {
    512
}

fn default_wav_read_frames() -> usize {
    4096
}

/// Resolve which config file to read, if any
///
/// An explicit path (CLI or environment) is returned even when it does not
/// exist so that the loader can warn about it. The platform default is only
/// returned when the file is present.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    let user_config = dirs::config_dir().map(|d| d.join("sndconv").join("config.toml"))?;
    if user_config.exists() {
        Some(user_config)
    } else {
        None
    }
}

/// Load the bootstrap config
///
/// - `None` → built-in defaults
/// - missing file → warning + built-in defaults
/// - unreadable or malformed file → error
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        debug!("No config file, using built-in defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content).map_err(|source| Error::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    config.conversion.validate()?;

    debug!(path = %path.display(), "Loaded config file");
    Ok(config)
}
