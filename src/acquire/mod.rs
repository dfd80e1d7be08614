//! Image acquisition pipeline.
//!
//! Resolves a caller-supplied reference (URL or local path) into a
//! size-bounded byte payload plus a MIME type derived from the path
//! extension.  Each request is independent: the pipeline holds no mutable
//! state, so any number of acquisitions may run concurrently against the
//! same [`Limits`] and client.

pub mod download;
pub mod format;
pub mod local;
pub mod safety;

use std::path::PathBuf;

use tracing::info;
use url::Url;

use crate::config::Limits;
use crate::error::{Result, VisionError};

/// A classified image reference.
#[derive(Debug, Clone)]
pub enum ImageReference {
    Url(Url),
    LocalPath(PathBuf),
}

impl ImageReference {
    /// Classify a raw reference string.
    ///
    /// A string is a URL only if it parses and its scheme is http or https;
    /// anything else — including URL parse failures — is treated as a local
    /// path.  Classification never fails.
    pub fn classify(reference: &str) -> Self {
        match Url::parse(reference) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Url(url),
            _ => Self::LocalPath(PathBuf::from(reference)),
        }
    }
}

/// Image bytes plus the MIME type derived from the reference's extension.
/// Consumed once per request; never cached.
#[derive(Debug, Clone)]
pub struct AcquiredImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

/// Resolve a reference into image bytes.
///
/// URLs go through the SSRF guard and the extension check before any
/// network traffic, then the bounded downloader.  Local paths are
/// existence-probed, extension-checked, size-checked via metadata, and read.
/// On success `bytes.len() <= limits.max_bytes` always holds.
pub async fn acquire(
    reference: &str,
    limits: &Limits,
    client: &reqwest::Client,
) -> Result<AcquiredImage> {
    match ImageReference::classify(reference) {
        ImageReference::Url(url) => {
            if !safety::is_safe_url(&url) {
                return Err(VisionError::Validation(format!(
                    "unsupported or unsafe URL: {url}"
                )));
            }

            // Check the extension before spending bandwidth on the body.
            let mime_type = format::validate(url.path())?;

            info!(url = %url, "downloading image");
            let bytes = download::download(client, &url, limits).await?;

            Ok(AcquiredImage { bytes, mime_type })
        }
        ImageReference::LocalPath(path) => {
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(VisionError::NotFound(path.display().to_string()));
            }

            // Format check runs before the read so a wrong extension never
            // costs more than the existence probe.
            let mime_type = format::validate(&path.to_string_lossy())?;

            info!(path = %path.display(), "reading local image");
            let bytes = local::load(&path, limits).await?;

            Ok(AcquiredImage { bytes, mime_type })
        }
    }
}
