use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entry::PlaylistEntry;

/// Default number of entries read from a single playlist.
pub const DEFAULT_PLAYLIST_CAPACITY: usize = 99_999;

const PLAYLIST_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("failed to read playlist {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse playlist {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode playlist {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write playlist {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PlaylistFile {
    #[serde(default)]
    version: String,
    #[serde(default)]
    items: Vec<PlaylistEntry>,
}

/// An opened playlist. Entries keep the order they were stored in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    path: PathBuf,
    entries: Vec<PlaylistEntry>,
}

impl Playlist {
    pub fn new(path: impl Into<PathBuf>, entries: Vec<PlaylistEntry>) -> Self {
        Self {
            path: path.into(),
            entries,
        }
    }

    /// Parses playlist JSON, keeping at most `capacity` entries.
    pub fn from_slice(
        path: impl Into<PathBuf>,
        data: &[u8],
        capacity: usize,
    ) -> Result<Self, PlaylistError> {
        let path = path.into();
        let mut file: PlaylistFile = match serde_json::from_slice(data) {
            Ok(file) => file,
            Err(source) => return Err(PlaylistError::Parse { path, source }),
        };
        file.items.truncate(capacity);
        Ok(Self {
            path,
            entries: file.items,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self) -> Result<(), PlaylistError> {
        let file = PlaylistFile {
            version: PLAYLIST_VERSION.to_string(),
            items: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|source| PlaylistError::Encode {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(|source| PlaylistError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Opens playlists by path.
pub trait PlaylistStore: Send + Sync {
    fn open(&self, path: &Path, capacity: usize) -> Result<Playlist, PlaylistError>;
}

/// Reads playlists stored as JSON documents on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPlaylistStore;

impl PlaylistStore for JsonPlaylistStore {
    fn open(&self, path: &Path, capacity: usize) -> Result<Playlist, PlaylistError> {
        let raw = fs::read(path).map_err(|source| PlaylistError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Playlist::from_slice(path, &raw, capacity)
    }
}

/// Entry point for fuzzing the playlist parser.
pub fn fuzz_parse_playlist(data: &[u8]) {
    if let Ok(playlist) = Playlist::from_slice("fuzz.lpl", data, DEFAULT_PLAYLIST_CAPACITY) {
        for entry in playlist.entries() {
            let _ = entry.matches_key("00000000|crc");
        }
    }
}
