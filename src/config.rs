//! On-disk configuration.
//!
//! ```toml
//! [ranking]
//! scoped = true
//! bounds = { min = -8388607, max = 8388607 }
//!
//! [database]
//! path = "tasks.db"
//! table = "ranked_records"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rank::RankOptions;
use crate::storage::DEFAULT_TABLE;
use crate::types::RankError;

/// Parsed `config.toml`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    /// `[ranking]`: bounds and scoping.
    pub ranking: RankOptions,
    /// `[database]`: where records live.
    pub database: DatabaseSection,
}

/// The `[database]` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SQLite file used when no `--db` is given.
    pub path: Option<PathBuf>,
    /// Table holding the ranked records.
    pub table: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl RankerConfig {
    /// Loads the configuration.
    ///
    /// An explicit path must exist. Without one the default location is
    /// tried, and a missing file there yields the defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => read_file(&path),
            None => match default_config_path() {
                Some(path) if path.exists() => read_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parses a configuration held in memory.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }
}

fn read_file(path: &Path) -> Result<RankerConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Failure to load `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// File that was parsed, or `<inline>`.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

impl From<ConfigError> for RankError {
    fn from(err: ConfigError) -> Self {
        RankError::Config(err.to_string())
    }
}

/// `<config dir>/ranker/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("ranker").join("config.toml"))
}
