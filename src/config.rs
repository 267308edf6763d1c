//! Configuration for the cairn binary.
//!
//! Loaded from TOML. Every field has a default so an empty or missing file
//! yields a working configuration; CLI flags override what the file says.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use cairn_core::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "cairn.toml";

/// Log filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration for cairn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CairnConfig {
    /// Default log filter, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory holding one status file per cluster.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Whether passes write statuses and fingerprints back.
    #[serde(default = "default_update_status")]
    pub update_status: bool,

    /// Timeout for the admin API transport. Unset keeps the step defaults.
    #[serde(default)]
    pub transport_timeout_secs: Option<u64>,
}

impl Default for CairnConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            state_dir: default_state_dir(),
            update_status: default_update_status(),
            transport_timeout_secs: None,
        }
    }
}

impl CairnConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns error if the document does not parse or fails validation.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::file_read_failed(path, e.to_string()))?;
        Self::from_toml(&contents)
    }

    /// Load the configuration for this invocation.
    ///
    /// An explicit path is loaded as given. Without one, `cairn.toml` in the
    /// working directory is used when present, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if the selected file cannot be read, parsed or validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Settle the outcome of [`CairnConfig::load`].
    ///
    /// A failed explicit file is fatal. A broken implicit `cairn.toml` is
    /// logged and replaced by defaults, so call this once logging is up.
    ///
    /// # Errors
    ///
    /// Returns the load error when the file was given explicitly.
    pub fn resolve(loaded: Result<Self>, explicit: bool) -> Result<Self> {
        if explicit {
            loaded
        } else {
            Ok(loaded.into_option_logged().unwrap_or_default())
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            return Err(Error::invalid_config("log_level", "must not be empty"));
        }

        if self.state_dir.as_os_str().is_empty() {
            return Err(Error::invalid_config("state_dir", "must not be empty"));
        }

        if self.transport_timeout_secs == Some(0) {
            return Err(Error::invalid_config(
                "transport_timeout_secs",
                "must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Admin API transport timeout, if configured.
    #[must_use]
    pub fn transport_timeout(&self) -> Option<Duration> {
        self.transport_timeout_secs.map(Duration::from_secs)
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".cairn/state")
}

fn default_update_status() -> bool {
    true
}
