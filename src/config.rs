//! Module to hold all user-configurable parameters of the replay tool.  These are read from
//! `snipsync.toml` in the working directory, if it exists.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use snipsync::settle::DEFAULT_MAX_SWEEPS;

/// The file which [`Config::load_default`] reads
pub const DEFAULT_CONFIG_PATH: &str = "snipsync.toml";

/// The configuration of the replay tool.  Every field can be omitted from the TOML file.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Log messages less severe than this are dropped
    pub log_level: log::LevelFilter,
    /// How many sweeps the settle pass may take after each edit
    pub max_settle_sweeps: usize,
    /// Check the tree's invariants after every edit, and stop at the first violation
    pub check_invariants: bool,
    /// Write the snippet's initial text into the buffer before replaying the edits
    pub materialize: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: log::LevelFilter::Info,
            max_settle_sweeps: DEFAULT_MAX_SWEEPS,
            check_invariants: true,
            materialize: true,
        }
    }
}

impl Config {
    /// Loads [`DEFAULT_CONFIG_PATH`] if it exists, falling back on the default `Config`
    pub fn load_default() -> Result<Self, LoadError> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load_toml_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_toml_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let toml_string =
            std::fs::read_to_string(path).map_err(|e| LoadError::Io(path.to_owned(), e))?;
        Self::from_toml(&toml_string)
    }

    pub fn from_toml(s: &str) -> Result<Self, LoadError> {
        toml::from_str(s).map_err(LoadError::Parse)
    }
}

#[derive(Debug)]
pub enum LoadError {
    Io(PathBuf, std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(path, e) => write!(f, "Couldn't read {}: {}", path.display(), e),
            LoadError::Parse(e) => write!(f, "Invalid config: {}", e),
        }
    }
}

impl std::error::Error for LoadError {}
