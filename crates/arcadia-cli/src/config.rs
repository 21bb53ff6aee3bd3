use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arcadia_playlist::{DEFAULT_PLAYLIST_CAPACITY, PLAYLIST_EXTENSION};
use arcadia_tasks::ScanSettings;
use serde::{Deserialize, Serialize};

const APP_DIR_NAME: &str = "Arcadia";
const CONFIG_FILE: &str = "arcadia.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArcadiaConfig {
    #[serde(default = "default_playlist_dir")]
    pub playlist_dir: PathBuf,
    #[serde(default = "default_playlist_extension")]
    pub playlist_extension: String,
    #[serde(default = "default_playlist_capacity")]
    pub playlist_capacity: usize,
    #[serde(default)]
    pub core_registry: Option<PathBuf>,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_frontend")]
    pub frontend: PathBuf,
}

fn default_playlist_dir() -> PathBuf {
    config_dir()
        .map(|dir| dir.join("playlists"))
        .unwrap_or_else(|| PathBuf::from("playlists"))
}

fn default_playlist_extension() -> String {
    PLAYLIST_EXTENSION.to_string()
}

fn default_playlist_capacity() -> usize {
    DEFAULT_PLAYLIST_CAPACITY
}

fn default_workers() -> usize {
    1
}

fn default_frontend() -> PathBuf {
    PathBuf::from("retroarch")
}

impl Default for ArcadiaConfig {
    fn default() -> Self {
        Self {
            playlist_dir: default_playlist_dir(),
            playlist_extension: default_playlist_extension(),
            playlist_capacity: default_playlist_capacity(),
            core_registry: None,
            workers: default_workers(),
            frontend: default_frontend(),
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME))
}

pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

impl ArcadiaConfig {
    /// Reads `path`, or the default location when `None`. A missing or
    /// malformed file yields the defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) => path,
                None => return Self::default(),
            },
        };
        let Ok(data) = fs::read_to_string(&path) else {
            return Self::default();
        };
        match serde_json::from_str(&data) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(%err, path = %path.display(), "ignoring malformed config");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("create config directory")?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, json).with_context(|| format!("write config {}", path.display()))
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            playlist_dir: self.playlist_dir.clone(),
            playlist_extension: self.playlist_extension.clone(),
            playlist_capacity: self.playlist_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arcadia.json");
        fs::write(&path, r#"{ "playlist_dir": "/srv/playlists", "workers": 2 }"#).unwrap();
        let config = ArcadiaConfig::load(Some(path.as_path()));
        assert_eq!(config.playlist_dir, PathBuf::from("/srv/playlists"));
        assert_eq!(config.workers, 2);
        assert_eq!(config.playlist_extension, ".lpl");
        assert_eq!(config.playlist_capacity, 99_999);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arcadia.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(ArcadiaConfig::load(Some(path.as_path())), ArcadiaConfig::default());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/arcadia.json");
        let config = ArcadiaConfig {
            core_registry: Some(PathBuf::from("/etc/arcadia/cores.json")),
            ..ArcadiaConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ArcadiaConfig::load(Some(path.as_path())), config);
    }
}
