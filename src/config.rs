//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the platform config directory, or the file given with
//!    `--config`
//! 3. Environment variables prefixed with `CHECKSIZE_` (e.g.
//!    `CHECKSIZE_IO_THREADS=4`)
//! 4. Command-line flags, applied by the caller
//!
//! # Example
//!
//! ```toml
//! io_threads = 4
//! skip_hidden = true
//! media_only = true
//! min_size = 1024
//! ignore_patterns = ["*.tmp", "cache/"]
//! ```

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scanner::WalkerConfig;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "CHECKSIZE_";

/// Every key the config file understands.
pub const KNOWN_KEYS: &[&str] = &[
    "io_threads",
    "follow_symlinks",
    "skip_hidden",
    "min_size",
    "max_size",
    "ignore_patterns",
    "media_only",
    "progress",
];

/// Errors raised while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or had the wrong type.
    #[error("Invalid configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// The merged values are inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Buckets resolved concurrently.
    pub io_threads: usize,
    /// Follow symbolic links during discovery.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,
    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,
    /// Gitignore-style patterns to skip.
    pub ignore_patterns: Vec<String>,
    /// Only keep photo, audio and video files.
    pub media_only: bool,
    /// Draw progress bars.
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io_threads: 1,
            follow_symlinks: false,
            skip_hidden: false,
            min_size: None,
            max_size: None,
            ignore_patterns: Vec::new(),
            media_only: false,
            progress: true,
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// With `explicit` set, that file must exist. Otherwise the platform
    /// default is used when present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a layer is malformed or the result fails
    /// [`validate`](Self::validate).
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };

        if let Some(ref path) = file {
            log::debug!("Loading config from {}", path.display());
            warn_unknown_keys(path);
        }

        let config: Config = Self::figment(file.as_deref())
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// The figment behind [`load`](Self::load), without validation.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Check values that serde alone cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.io_threads == 0 {
            return Err(ConfigError::Invalid(
                "io_threads must be at least 1".to_string(),
            ));
        }
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min > max {
                return Err(ConfigError::Invalid(format!(
                    "min_size ({min}) is larger than max_size ({max})"
                )));
            }
        }
        Ok(())
    }

    /// Default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "checksize", "checksize")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Discovery settings derived from this configuration.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            follow_symlinks: self.follow_symlinks,
            skip_hidden: self.skip_hidden,
            min_size: self.min_size,
            max_size: self.max_size,
            ignore_patterns: self.ignore_patterns.clone(),
            media_only: self.media_only,
        }
    }
}

/// Closest known key to `key`, if any is reasonably close.
#[must_use]
pub fn suggest_key(key: &str) -> Option<&'static str> {
    KNOWN_KEYS
        .iter()
        .map(|known| (*known, strsim::jaro_winkler(key, known)))
        .filter(|(_, score)| *score > 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(known, _)| known)
}

/// Top-level keys in `content` that the config does not know.
///
/// # Errors
///
/// Returns the TOML parse error if `content` is not valid TOML.
pub fn unknown_keys(content: &str) -> Result<Vec<String>, toml::de::Error> {
    let table: toml::Table = content.parse()?;
    Ok(table
        .keys()
        .filter(|key| !KNOWN_KEYS.contains(&key.as_str()))
        .cloned()
        .collect())
}

fn warn_unknown_keys(path: &Path) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };
    // Parse errors surface from figment with better context.
    let Ok(unknown) = unknown_keys(&content) else {
        return;
    };
    for key in unknown {
        match suggest_key(&key) {
            Some(known) => log::warn!(
                "Unknown config key '{}' in {} (did you mean '{}'?)",
                key,
                path.display(),
                known
            ),
            None => log::warn!("Unknown config key '{}' in {}", key, path.display()),
        }
    }
}
