pub mod delimited;
pub mod http;
pub mod json;

use refdata_core::config::SourceConfig;
use refdata_core::{RefDataError, Result};
use std::path::Path;
use tracing::info;

/// Raw payload bytes for one source, either downloaded or read from the
/// configured local file fallback.
pub struct SourcePayload {
    pub bytes: Vec<u8>,
    /// SHA-256 of the payload, hex-encoded. Only set for downloads.
    pub sha256: Option<String>,
}

/// Resolve a source to its payload bytes.
///
/// `offline` forces the file fallback even when a URL is configured. A
/// failed download does not fall back silently; the operator chose the
/// endpoint and should see it break.
pub async fn acquire(
    source_id: &str,
    source: &SourceConfig,
    offline: bool,
    max_bytes: u64,
    kind: http::PayloadKind,
) -> Result<SourcePayload> {
    if !offline {
        if let Some(url) = &source.url {
            let fetched = http::fetch(url, max_bytes, kind).await?;
            info!(source_id, url, bytes = fetched.bytes.len(), "downloaded source payload");
            return Ok(SourcePayload { bytes: fetched.bytes, sha256: Some(fetched.sha256) });
        }
    }

    let path = source.file.as_deref().ok_or_else(|| RefDataError::Source {
        message: format!("source '{}' has neither url nor file configured", source_id),
    })?;
    let bytes = read_local(path)?;
    info!(source_id, path = %path.display(), bytes = bytes.len(), "read source payload from file");
    Ok(SourcePayload { bytes, sha256: None })
}

fn read_local(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| RefDataError::Source {
        message: format!("failed to read '{}': {}", path.display(), e),
    })
}
