use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::io;

/// Compression applied to fallback files; each mode contributes a filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    #[default]
    None,
    Zstandard,
}

impl CompressionMode {
    pub fn file_extension(self) -> &'static str {
        match self {
            CompressionMode::None => "",
            CompressionMode::Zstandard => ".zst",
        }
    }

    /// Whether this build can produce the mode (zstd is behind a cargo feature).
    pub fn is_available(self) -> bool {
        match self {
            CompressionMode::None => true,
            CompressionMode::Zstandard => cfg!(feature = "zstd"),
        }
    }

    pub fn compress(self, input: &[u8]) -> io::Result<Cow<'_, [u8]>> {
        match self {
            CompressionMode::None => Ok(Cow::Borrowed(input)),
            CompressionMode::Zstandard => zstd_compress(input).map(Cow::Owned),
        }
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMode::None => write!(f, "none"),
            CompressionMode::Zstandard => write!(f, "zstandard"),
        }
    }
}

#[cfg(feature = "zstd")]
fn zstd_compress(input: &[u8]) -> io::Result<Vec<u8>> {
    zstd::bulk::compress(input, zstd::DEFAULT_COMPRESSION_LEVEL)
}

#[cfg(not(feature = "zstd"))]
fn zstd_compress(_input: &[u8]) -> io::Result<Vec<u8>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "built without the zstd feature",
    ))
}
