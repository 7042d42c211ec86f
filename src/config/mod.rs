use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::api::{QueryParameters, SearchCategory};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Defaults for the command line, read from TOML.
///
/// ```toml
/// category = "nearby"
/// encode_query = false
///
/// [params]
/// location = "-33.8670522,151.1957362"
/// radius = "1500"
/// ```
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub category: Option<SearchCategory>,
    #[serde(default)]
    pub params: QueryParameters,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub encode_query: bool,
    #[serde(default)]
    pub pretty: bool,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub verbose: bool,
}

impl FileConfig {
    /// First config found in the search locations that parses, plus the
    /// errors from files skipped on the way.
    ///
    /// Runs before logging is set up, so skipped files are returned rather than logged.
    pub fn load() -> (Option<Self>, Vec<ConfigError>) {
        Self::load_first(&get_config_paths())
    }

    fn load_first(paths: &[PathBuf]) -> (Option<Self>, Vec<ConfigError>) {
        let mut skipped = Vec::new();

        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::from_path(path) {
                Ok(config) => return (Some(config), skipped),
                Err(e) => skipped.push(e),
            }
        }
        (None, skipped)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("placesfetch.toml"));
    paths.push(PathBuf::from(".placesfetch.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("placesfetch").join("config.toml"));
        paths.push(config_dir.join("placesfetch.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".placesfetch.toml"));
        paths.push(home.join(".config").join("placesfetch").join("config.toml"));
    }

    paths
}
