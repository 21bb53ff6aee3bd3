use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

/// Default file suffix of playlist files.
pub const PLAYLIST_EXTENSION: &str = ".lpl";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("playlist directory {} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to list {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

type ReleaseHook = Box<dyn FnOnce(usize) + Send>;

/// Ordered listing of playlist paths owned by a running scan.
///
/// Dropping the catalog releases it; an optional release hook observes that
/// release exactly once.
pub struct Catalog {
    paths: Vec<PathBuf>,
    on_release: Option<ReleaseHook>,
}

impl Catalog {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            on_release: None,
        }
    }

    pub fn with_release_hook(
        paths: Vec<PathBuf>,
        hook: impl FnOnce(usize) + Send + 'static,
    ) -> Self {
        Self {
            paths,
            on_release: Some(Box::new(hook)),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Releases the catalog now rather than at end of scope.
    pub fn release(self) {}
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("paths", &self.paths)
            .field("has_release_hook", &self.on_release.is_some())
            .finish()
    }
}

impl Drop for Catalog {
    fn drop(&mut self) {
        tracing::trace!(entries = self.paths.len(), "releasing playlist catalog");
        if let Some(hook) = self.on_release.take() {
            hook(self.paths.len());
        }
    }
}

/// Lists the playlist files found in a directory.
pub trait CatalogLister: Send + Sync {
    fn list(&self, dir: &Path) -> Result<Catalog, CatalogError>;
}

/// Flat directory listing sorted by file name. Directories are listed too;
/// callers filter by suffix.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirCatalogLister;

impl CatalogLister for DirCatalogLister {
    fn list(&self, dir: &Path) -> Result<Catalog, CatalogError> {
        if !dir.exists() {
            return Err(CatalogError::Missing(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(CatalogError::NotADirectory(dir.to_path_buf()));
        }
        let mut paths = Vec::new();
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|source| CatalogError::Walk {
                path: dir.to_path_buf(),
                source,
            })?;
            paths.push(entry.into_path());
        }
        Ok(Catalog::new(paths))
    }
}

/// Returns true when `path` carries the playlist `extension` (e.g. `.lpl`).
pub fn has_playlist_extension(path: &Path, extension: &str) -> bool {
    path.as_os_str()
        .as_encoded_bytes()
        .ends_with(extension.as_bytes())
}
