use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{create_partition_path, CompressionMode, FallbackError, FallbackWriter};

const TEMP_SUFFIX: &str = ".part";

/// Writes fallback files beneath a local base directory.
#[derive(Debug, Clone)]
pub struct LocalPathFallbackWriter {
    base_path: PathBuf,
    compression: CompressionMode,
}

impl LocalPathFallbackWriter {
    /// Fails fast unless `base_path` is an accessible directory and `compression` is built in.
    pub fn new(base_path: &Path, compression: CompressionMode) -> Result<Self, FallbackError> {
        if !base_path.is_dir() || !is_readable_and_writable(base_path) {
            return Err(FallbackError::InaccessibleBase {
                path: base_path.to_path_buf(),
            });
        }
        if !compression.is_available() {
            return Err(FallbackError::CompressionUnavailable(compression));
        }
        Ok(Self {
            base_path: base_path.to_path_buf(),
            compression,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn file_name(&self, fetch_time: DateTime<Utc>) -> String {
        format!(
            "{}.json{}",
            fetch_time.timestamp(),
            self.compression.file_extension()
        )
    }
}

impl FallbackWriter for LocalPathFallbackWriter {
    fn write(
        &self,
        partition_keys: &[(&str, &str)],
        fetch_time: DateTime<Utc>,
        data: &[u8],
    ) -> Result<(), FallbackError> {
        let dir = create_partition_path(&self.base_path, partition_keys);
        fs::create_dir_all(&dir).map_err(|source| FallbackError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let payload = self
            .compression
            .compress(data)
            .map_err(|source| FallbackError::Compress {
                mode: self.compression,
                source,
            })?;

        let path = dir.join(self.file_name(fetch_time));
        let temp = temp_path(&path);
        if let Err(source) = write_then_rename(&temp, &path, &payload) {
            let _ = fs::remove_file(&temp);
            return Err(FallbackError::Write { path, source });
        }

        tracing::debug!(path = %path.display(), bytes = payload.len(), "wrote fallback file");
        Ok(())
    }
}

/// Sibling of `path` holding a file that is still being written.
fn temp_path(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(TEMP_SUFFIX);
    PathBuf::from(p)
}

/// Only complete files ever carry the final name.
fn write_then_rename(temp: &Path, path: &Path, payload: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(temp)?;
    file.write_all(payload)?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp, path)
}

#[cfg(unix)]
fn is_readable_and_writable(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) == 0 }
}

#[cfg(not(unix))]
fn is_readable_and_writable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}
