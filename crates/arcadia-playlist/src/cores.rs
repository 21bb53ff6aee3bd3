use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_DIR_NAME: &str = "Arcadia";
const REGISTRY_FILE: &str = "cores.json";

/// A registered content engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoreInfo {
    pub name: String,
    pub path: PathBuf,
}

impl CoreInfo {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Source of registered cores.
pub trait CoreRegistry: Send + Sync {
    fn cores(&self) -> Vec<CoreInfo>;

    /// Executable path of the core named exactly `name`, if registered.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.cores()
            .into_iter()
            .find(|core| core.name == name)
            .map(|core| core.path)
    }
}

impl CoreRegistry for Vec<CoreInfo> {
    fn cores(&self) -> Vec<CoreInfo> {
        self.clone()
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read core registry: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse core registry: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no configuration directory available")]
    NoConfigDir,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    cores: Vec<CoreInfo>,
}

/// Core registry persisted as JSON.
#[derive(Debug)]
pub struct JsonCoreRegistry {
    path: PathBuf,
    cores: RwLock<Vec<CoreInfo>>,
}

impl JsonCoreRegistry {
    pub fn load_default() -> Result<Self, RegistryError> {
        Self::load_from_path(Self::default_path()?)
    }

    pub fn load_from_path(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let cores = read_registry_file(&path)?;
        Ok(Self {
            path,
            cores: RwLock::new(cores),
        })
    }

    pub fn default_path() -> Result<PathBuf, RegistryError> {
        let mut dir = dirs::config_dir().ok_or(RegistryError::NoConfigDir)?;
        dir.push(APP_DIR_NAME);
        dir.push(REGISTRY_FILE);
        Ok(dir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the registered cores and persists them.
    pub fn set_cores(&self, cores: Vec<CoreInfo>) -> Result<(), RegistryError> {
        {
            let mut guard = self.cores.write();
            *guard = cores.clone();
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&RegistryFile { cores })?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl CoreRegistry for JsonCoreRegistry {
    fn cores(&self) -> Vec<CoreInfo> {
        self.cores.read().clone()
    }
}

fn read_registry_file(path: &Path) -> Result<Vec<CoreInfo>, RegistryError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path)?;
    let file: RegistryFile = serde_json::from_str(&raw)?;
    Ok(file.cores)
}
