//! `map_tools.toml` settings with environment overrides.
//!
//! ```toml
//! store_path = "data/store.json"
//! chunk_size = 50
//! validate_ranges = true
//! read_only = false
//! ```
//!
//! Precedence, lowest first: built-in defaults, the TOML file,
//! `MAP_TOOLS_STORE` / `MAP_TOOLS_CHUNK_SIZE`, command-line flags.

use std::path::{Path, PathBuf};

use map_tools_geometry::RangePolicy;
use map_tools_import::DEFAULT_CHUNK_SIZE;
use serde::Deserialize;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "map_tools.toml";

/// Store file used when nothing else is configured.
pub const DEFAULT_STORE_FILE: &str = "map_tools_store.json";

/// Environment variable overriding [`Config::store_path`].
pub const STORE_ENV: &str = "MAP_TOOLS_STORE";

/// Environment variable overriding [`Config::chunk_size`].
pub const CHUNK_SIZE_ENV: &str = "MAP_TOOLS_CHUNK_SIZE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`Config`].
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    /// An override variable holds an unusable value.
    #[error("Invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// JSON file backing the record store.
    pub store_path: PathBuf,
    /// Slots per import chunk.
    pub chunk_size: usize,
    /// Reject locations outside [-90, 90] x [-180, 180].
    pub validate_ranges: bool,
    /// Deny every write.
    pub read_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_FILE),
            chunk_size: DEFAULT_CHUNK_SIZE,
            validate_ranges: true,
            read_only: false,
        }
    }
}

impl Config {
    /// Parses TOML text. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// * If the text is not valid TOML or has unknown keys
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::de::from_str(text)
    }

    /// Loads `path`, or [`DEFAULT_CONFIG_FILE`] when `path` is `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    ///
    /// # Errors
    ///
    /// * If the file exists but cannot be read or parsed
    /// * If an explicitly given file does not exist
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.is_some();
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No {DEFAULT_CONFIG_FILE}, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Applies [`STORE_ENV`] and [`CHUNK_SIZE_ENV`] as read through
    /// `lookup`. Empty values are ignored.
    ///
    /// # Errors
    ///
    /// * If the chunk size variable is not a positive integer
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(path) = var(STORE_ENV) {
            self.store_path = PathBuf::from(path);
        }
        if let Some(value) = var(CHUNK_SIZE_ENV) {
            self.chunk_size = value
                .trim()
                .parse()
                .ok()
                .filter(|&size| size > 0)
                .ok_or(ConfigError::InvalidEnv {
                    name: CHUNK_SIZE_ENV,
                    value,
                })?;
        }
        Ok(self)
    }

    /// Location range policy implied by `validate_ranges`.
    #[must_use]
    pub const fn range_policy(&self) -> RangePolicy {
        if self.validate_ranges {
            RangePolicy::Strict
        } else {
            RangePolicy::Lenient
        }
    }
}
