//! Configuration handling for twtfeeds
//!
//! The TOML config file doubles as the durable feed registry: its `[feeds]`
//! table is rewritten on every registration.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{FeedsError, Result};
use crate::registry::{Feeds, RegistryStore};

/// twtfeeds configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding feed text, avatars and media
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Timeout for fetching a feed during registration, in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    /// Registered feeds
    #[serde(default)]
    pub feeds: Feeds,
}

fn default_root() -> PathBuf {
    PathBuf::from("./data")
}

fn default_fetch_timeout() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: default_root(),
            fetch_timeout: default_fetch_timeout(),
            feeds: Feeds::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents)
                .map_err(|e| FeedsError::Config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(FeedsError::Config(format!("{}: {}", path.display(), e))),
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| FeedsError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| FeedsError::Config(e.to_string()))
    }

    /// Write the configuration so that readers see either the old or new file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = self.to_toml()?;
        write_atomic(path, contents.as_bytes())
            .map_err(|e| FeedsError::Persistence(format!("{}: {}", path.display(), e)))
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Registry store that rewrites the `[feeds]` table of a config file
#[derive(Debug, Clone)]
pub struct ConfigFileStore {
    path: PathBuf,
    base: Config,
}

impl ConfigFileStore {
    /// `base` supplies the non-registry settings written alongside the feeds
    pub fn new(path: impl Into<PathBuf>, base: Config) -> Self {
        Self {
            path: path.into(),
            base,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for ConfigFileStore {
    fn load(&self) -> Result<Feeds> {
        Ok(Config::load(&self.path)?.feeds)
    }

    fn save(&self, feeds: &Feeds) -> Result<()> {
        let config = Config {
            feeds: feeds.clone(),
            ..self.base.clone()
        };
        config.save(&self.path)
    }
}
