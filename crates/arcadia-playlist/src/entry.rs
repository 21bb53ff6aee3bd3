use serde::{Deserialize, Serialize};

use crate::Crc32;

/// A single content item recorded in a playlist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub path: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_name: Option<String>,
    /// Checksum key in the on-disk form, e.g. `ABCD1234|crc`.
    #[serde(rename = "crc32", default)]
    pub checksum_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
}

impl PlaylistEntry {
    pub fn new(path: impl Into<String>, checksum: Crc32) -> Self {
        Self::with_key(path, checksum.key())
    }

    pub fn with_key(path: impl Into<String>, checksum_key: impl Into<String>) -> Self {
        let path = path.into();
        let label = std::path::Path::new(&path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            label,
            core_path: None,
            core_name: None,
            checksum_key: checksum_key.into(),
            db_name: None,
        }
    }

    /// Exact byte comparison; keys are never normalised.
    pub fn matches_key(&self, key: &str) -> bool {
        self.checksum_key == key
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn entry_uses_playlist_field_names() {
        let entry = PlaylistEntry::new("/games/a.rom", Crc32(0xABCD1234));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["crc32"], "ABCD1234|crc");
        assert_eq!(json["label"], "a");
        assert!(json.get("core_name").is_none());
    }

    #[test]
    fn key_match_is_case_sensitive() {
        let entry = PlaylistEntry::with_key("/games/a.rom", "abcd1234|crc");
        assert!(!entry.matches_key(&Crc32(0xABCD1234).key()));
        assert!(entry.matches_key("abcd1234|crc"));
    }
}
