use refdata_core::{RefDataError, Result};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use sha2::{Digest, Sha256};
use std::time::Instant;
use tracing::info;

/// What shape of payload a source endpoint is expected to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Delimited,
    Json,
}

impl PayloadKind {
    /// Acceptable base content types per kind. `octet-stream` stays on
    /// both lists because the regulator's download portals routinely
    /// mislabel their files.
    fn allowed_types(&self) -> &'static [&'static str] {
        match self {
            PayloadKind::Delimited => &[
                "text/csv",
                "text/plain",
                "application/csv",
                "application/octet-stream",
            ],
            PayloadKind::Json => &["application/json", "text/json", "application/octet-stream"],
        }
    }

    fn accepts(&self, content_type: &str) -> bool {
        // Strip parameters ("text/csv; charset=ISO-8859-1")
        let base = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        self.allowed_types().contains(&base.as_str())
    }
}

pub struct FetchedPayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub sha256: String,
}

/// Download one source payload.
///
/// Reference-data endpoints occasionally sit behind picky CDNs, so the
/// request carries a desktop User-Agent. The payload size is checked
/// against the configured ceiling both from the header and after the
/// body arrives, and the response content type must match the kind the
/// source is declared to serve (a mislabeled endpoint usually means an
/// HTML error page, not data).
pub async fn fetch(url: &str, max_bytes: u64, kind: PayloadKind) -> Result<FetchedPayload> {
    let client = reqwest::Client::new();
    let t0 = Instant::now();
    let resp = client
        .get(url)
        .header(
            "User-Agent",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36",
        )
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(RefDataError::Source {
            message: format!("GET {} returned status {}", url, status),
        });
    }

    let headers = resp.headers().clone();
    let content_length: Option<u64> = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok());
    if let Some(len) = content_length {
        if len > max_bytes {
            return Err(RefDataError::Source {
                message: format!("payload too large: {} > {} bytes", len, max_bytes),
            });
        }
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    if !kind.accepts(&content_type) {
        return Err(RefDataError::Source {
            message: format!(
                "GET {} returned content type '{}', expected one of {:?}",
                url,
                content_type,
                kind.allowed_types()
            ),
        });
    }

    let bytes = resp.bytes().await?.to_vec();
    if bytes.len() as u64 > max_bytes {
        return Err(RefDataError::Source {
            message: format!("payload too large: {} > {} bytes", bytes.len(), max_bytes),
        });
    }

    let sha256 = hex::encode(Sha256::digest(&bytes));

    info!(
        url,
        status = status.as_u16(),
        size = bytes.len(),
        content_type,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "fetched payload"
    );

    Ok(FetchedPayload { bytes, content_type, sha256 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_check_ignores_parameters_and_case() {
        assert!(PayloadKind::Delimited.accepts("text/csv; charset=ISO-8859-1"));
        assert!(PayloadKind::Delimited.accepts("Text/Plain"));
        assert!(PayloadKind::Json.accepts("application/json"));
    }

    #[test]
    fn mislabeled_endpoints_are_rejected_per_kind() {
        assert!(!PayloadKind::Delimited.accepts("text/html"));
        assert!(!PayloadKind::Json.accepts("text/csv"));
        // Portals that skip the header entirely still pass
        assert!(PayloadKind::Delimited.accepts("application/octet-stream"));
        assert!(PayloadKind::Json.accepts("application/octet-stream"));
    }
}
