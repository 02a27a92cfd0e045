//! Last-resort local persistence for fetch results the primary sink rejected.
//!
//! Files land under `<base>/<key>=<value>/.../<epoch-seconds>.json[.ext]`,
//! mirroring the primary table's partitioning so they can be reconciled
//! later. Write failures are returned to the caller, never swallowed.

mod compression;
mod local;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::FallbackConfig;

pub use compression::CompressionMode;
pub use local::LocalPathFallbackWriter;

/// Destination for serialized rows when the primary sink fails.
pub trait FallbackWriter: Send + Sync {
    /// Write `data` under the partition described by the ordered `partition_keys`.
    fn write(
        &self,
        partition_keys: &[(&str, &str)],
        fetch_time: DateTime<Utc>,
        data: &[u8],
    ) -> Result<(), FallbackError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error("{} must be a directory that is readable and writable", path.display())]
    InaccessibleBase { path: PathBuf },
    #[error("fallback is enabled but no base_path is configured")]
    MissingBasePath,
    #[error("compression mode {0} is not available in this build")]
    CompressionUnavailable(CompressionMode),
    #[error("failed to create partition directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to compress fallback payload with {mode}")]
    Compress {
        mode: CompressionMode,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write fallback file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Used when fallback is disabled: logs and drops the data.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardingFallbackWriter;

impl FallbackWriter for DiscardingFallbackWriter {
    fn write(
        &self,
        _partition_keys: &[(&str, &str)],
        fetch_time: DateTime<Utc>,
        data: &[u8],
    ) -> Result<(), FallbackError> {
        tracing::warn!(
            bytes = data.len(),
            "discarding fetch at {} as fallback writer is not configured",
            fetch_time
        );
        Ok(())
    }
}

/// Build the writer described by `[fallback]`, validating the base directory up front.
pub fn from_config(cfg: &FallbackConfig) -> Result<Arc<dyn FallbackWriter>, FallbackError> {
    if !cfg.enabled {
        tracing::warn!("fallback writer disabled; results rejected by the database will be lost");
        return Ok(Arc::new(DiscardingFallbackWriter));
    }
    let base = cfg.base_path.as_ref().ok_or(FallbackError::MissingBasePath)?;
    let writer = LocalPathFallbackWriter::new(base, cfg.compression)?;
    tracing::info!(
        base = %base.display(),
        compression = %cfg.compression,
        "fallback writer ready"
    );
    Ok(Arc::new(writer))
}

/// Append one `key=form-urlencoded(value)` segment per partition key, in order.
pub fn create_partition_path(base: &Path, partition_keys: &[(&str, &str)]) -> PathBuf {
    partition_keys.iter().fold(base.to_path_buf(), |path, (k, v)| {
        let encoded: String = url::form_urlencoded::byte_serialize(v.as_bytes()).collect();
        path.join(format!("{}={}", k, encoded))
    })
}
