use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use directories_next::ProjectDirs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub port: u16,
    /// Honor the `x-test-now-ms` header on reads.
    #[serde(default)]
    pub test_mode: bool,
    pub storage: Storage,
    pub limits: Limits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub kind: StorageKind,
    #[serde(default)]
    pub file: FileStorage,
    pub remote: Option<RemoteStorage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileStorage {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteStorage {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    File,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    pub max_upload_size: usize,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        source.parse()
    }
}

impl std::str::FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(source: &str) -> anyhow::Result<Self> {
        toml::from_str(source).context("failed to deserialize config")
    }
}

impl FileStorage {
    /// The configured path, or `pastes.json` in the platform data directory.
    pub fn path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("", "", "tempbin")
            .ok_or_else(|| anyhow!("could not determine a data directory"))?;
        Ok(dirs.data_dir().join("pastes.json"))
    }
}
