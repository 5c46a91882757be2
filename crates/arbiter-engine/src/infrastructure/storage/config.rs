//! TOML-based configuration files for native hosts.
//!
//! A config file holds a *patch*: only the keys the user wants to change.
//! Everything else keeps its default.  Example:
//!
//! ```toml
//! deadzone = 0.2
//! sensitivity = 14
//! devicePreference = "last-connected"
//!
//! [buttonMap]
//! confirm = 0
//! cancel = 1
//! ```
//!
//! # Validation
//!
//! [`parse_config`] checks the patch against the default configuration before
//! returning it, so a file with `deadzone = 4` is rejected at load time
//! rather than when the engine is built.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use arbiter_core::{ArbiterConfig, ConfigError, ConfigPatch};
use thiserror::Error;
use tracing::debug;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The patch could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The TOML parsed but a value is out of range.
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Parses and validates a TOML config patch.
///
/// # Errors
///
/// Returns [`ConfigFileError::Parse`] for malformed TOML or unknown
/// `devicePreference` values, and [`ConfigFileError::Invalid`] if the patch
/// would produce an invalid configuration.
pub fn parse_config(text: &str) -> Result<ConfigPatch, ConfigFileError> {
    let patch: ConfigPatch = toml::from_str(text)?;
    ArbiterConfig::default().merged(&patch)?;
    Ok(patch)
}

/// Loads a config patch from `path`, returning an empty patch if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigFileError::Io`] for file-system errors other than "not
/// found", plus anything [`parse_config`] reports.
pub fn load_config(path: &Path) -> Result<ConfigPatch, ConfigFileError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let patch = parse_config(&content)?;
            debug!(path = %path.display(), "loaded config file");
            Ok(patch)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file; using defaults");
            Ok(ConfigPatch::default())
        }
        Err(e) => Err(ConfigFileError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `patch` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigFileError::Io`] for file-system failures or
/// [`ConfigFileError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, patch: &ConfigPatch) -> Result<(), ConfigFileError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigFileError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(patch)?;
    std::fs::write(path, content).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
