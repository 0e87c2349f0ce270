//! Bootstrap configuration and root folder resolution
//!
//! Configuration comes from a TOML file whose every field has a compiled
//! default. A missing file is not an error: the service logs a warning and
//! starts with defaults. A file that exists but does not parse is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::detection::DetectionPolicy;
use crate::model::DEFAULT_IMAGE_URL;
use crate::{Error, Result};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "FACETAG_ROOT_FOLDER";

/// File name of the persisted event state inside the root folder
pub const EVENT_DATA_FILE: &str = "event.json";

/// File name of the file-backed tag list inside the root folder
pub const TAG_DATA_FILE: &str = "tags.json";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP server port
    pub port: u16,

    /// Address the HTTP server binds to
    pub bind_address: String,

    /// Folder holding persisted data (optional, see [`resolve_root_folder`])
    pub root_folder: Option<PathBuf>,

    /// Photo reference used until one is saved
    pub default_image_url: String,

    pub logging: LoggingConfig,

    pub detection: DetectionConfig,

    pub tags: TagsConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: 5790,
            bind_address: "127.0.0.1".to_string(),
            root_folder: None,
            default_image_url: DEFAULT_IMAGE_URL.to_string(),
            logging: LoggingConfig::default(),
            detection: DetectionConfig::default(),
            tags: TagsConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins if set
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Face detection configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Model file for the built-in engine; detection is disabled without it
    pub model_path: Option<PathBuf>,

    /// Longest image edge handed to the engine (0 = unlimited)
    pub input_size: u32,

    pub score_threshold: f64,

    /// Threshold for the single retry after an empty first pass
    pub retry_score_threshold: f64,

    /// Seconds before a detection attempt is abandoned
    pub timeout_secs: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let policy = DetectionPolicy::default();
        Self {
            model_path: None,
            input_size: policy.input_size_hint,
            score_threshold: policy.score_threshold,
            retry_score_threshold: policy.retry_score_threshold,
            timeout_secs: policy.timeout.as_secs(),
        }
    }
}

impl DetectionConfig {
    pub fn policy(&self) -> DetectionPolicy {
        DetectionPolicy {
            input_size_hint: self.input_size,
            score_threshold: self.score_threshold,
            retry_score_threshold: self.retry_score_threshold,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Tag list storage configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TagsConfig {
    pub backend: TagBackend,
}

/// Where the self-serve tag list lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagBackend {
    /// Process memory; lost on restart
    #[default]
    Memory,
    /// `tags.json` in the root folder
    File,
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or from the platform default location
    ///
    /// A missing file yields the compiled defaults with a warning.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => {
                    warn!("No config file found, using compiled defaults");
                    return Ok(Self::default());
                }
            },
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let config = Self::from_toml_str(&content)?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using compiled defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.default_image_url.trim().is_empty() {
            return Err(Error::Config("default_image_url must not be empty".to_string()));
        }
        let d = &self.detection;
        if !d.score_threshold.is_finite() || !d.retry_score_threshold.is_finite() {
            return Err(Error::Config("detection thresholds must be finite".to_string()));
        }
        if d.retry_score_threshold > d.score_threshold {
            warn!(
                "detection.retry_score_threshold ({}) is above score_threshold ({}); the retry cannot find more faces",
                d.retry_score_threshold, d.score_threshold
            );
        }
        if d.timeout_secs == 0 {
            return Err(Error::Config("detection.timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

/// First existing config file among the platform locations
///
/// `~/.config/facetag/config.toml`, then `/etc/facetag/config.toml` on Linux.
fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("facetag").join("config.toml"));
    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/facetag/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }
    None
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `FACETAG_ROOT_FOLDER` environment variable
/// 3. TOML `root_folder`
/// 4. OS-dependent default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("facetag"))
        .unwrap_or_else(|| PathBuf::from("./facetag_data"))
}

/// Path of the persisted event state
pub fn event_data_path(root_folder: &Path) -> PathBuf {
    root_folder.join(EVENT_DATA_FILE)
}

/// Path of the file-backed tag list
pub fn tag_data_path(root_folder: &Path) -> PathBuf {
    root_folder.join(TAG_DATA_FILE)
}
