use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Literal suffix that playlists append to the hex digits of a checksum.
pub const CHECKSUM_KEY_SUFFIX: &str = "|crc";

/// 32-bit content checksum as stored in playlist entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crc32(pub u32);

impl Crc32 {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Canonical key used by playlists: eight uppercase hex digits followed by `|crc`.
    pub fn key(self) -> String {
        format!("{:08X}{CHECKSUM_KEY_SUFFIX}", self.0)
    }

    pub fn of_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut hasher = crc32fast::Hasher::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let read = reader.read(&mut buf)?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(Self(hasher.finalize()))
    }

    pub fn of_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::of_reader(BufReader::new(file))
    }
}

impl From<u32> for Crc32 {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Crc32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChecksumParseError {
    #[error("checksum is empty")]
    Empty,
    #[error("checksum `{0}` is not a 32-bit hex value")]
    Invalid(String),
}

impl FromStr for Crc32 {
    type Err = ChecksumParseError;

    /// Accepts `ABCD1234`, `0xabcd1234` and the playlist form `ABCD1234|crc`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_suffix(CHECKSUM_KEY_SUFFIX)
            .unwrap_or(trimmed);
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);
        if digits.is_empty() {
            return Err(ChecksumParseError::Empty);
        }
        if digits.len() > 8 {
            return Err(ChecksumParseError::Invalid(value.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| ChecksumParseError::Invalid(value.to_string()))
    }
}
