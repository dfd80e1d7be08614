//! Bounded HTTP(S) image download.
//!
//! Redirects are followed manually (the client is built with redirects
//! disabled) so every hop can be re-checked against the SSRF guard, and the
//! chain is capped.  The body is streamed and accumulation stops as soon as
//! the size cap is crossed, so a server that omits or lies about
//! `Content-Length` cannot make us buffer more than the cap plus one chunk.

use futures::StreamExt;
use reqwest::StatusCode;
use reqwest::header::LOCATION;
use tracing::debug;
use url::Url;

use crate::config::Limits;
use crate::error::{Result, VisionError};
use super::safety::is_safe_url;

/// Maximum redirect hops before giving up.
pub const MAX_REDIRECTS: usize = 5;

/// Build the HTTP client used for image downloads.  Redirect following is
/// disabled so [`download`] controls every hop.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| VisionError::Config(format!("failed to create HTTP client: {e}")))
}

/// Download `url`, enforcing the size cap and wall-clock timeout.
pub async fn download(client: &reqwest::Client, url: &Url, limits: &Limits) -> Result<Vec<u8>> {
    let fut = fetch(client, url.clone(), limits, is_safe_url);
    match tokio::time::timeout(limits.timeout(), fut).await {
        Ok(result) => result,
        // Dropping the in-flight future closes the connection.
        Err(_) => Err(VisionError::Timeout(limits.timeout_ms)),
    }
}

/// Fetch with manual redirect following.  `allow_hop` vets every redirect
/// target before it is requested; production callers pass [`is_safe_url`].
async fn fetch(
    client: &reqwest::Client,
    mut url: Url,
    limits: &Limits,
    allow_hop: impl Fn(&Url) -> bool,
) -> Result<Vec<u8>> {
    for _ in 0..=MAX_REDIRECTS {
        let resp = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| VisionError::Transport(format!("request failed: {e}")))?;

        let status = resp.status();

        if status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND {
            let location = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    VisionError::Transport(format!("HTTP {status} without a Location header"))
                })?;

            // Relative Location values resolve against the current URL.
            let next = url.join(location).map_err(|e| {
                VisionError::Transport(format!("invalid redirect target {location:?}: {e}"))
            })?;

            if !allow_hop(&next) {
                return Err(VisionError::Validation(format!(
                    "redirect to unsafe URL refused: {next}"
                )));
            }

            debug!(from = %url, to = %next, "following redirect");
            url = next;
            continue;
        }

        if !status.is_success() {
            return Err(VisionError::Transport(format!("HTTP {status}")));
        }

        // Reject on the declared size before reading any body bytes.
        if let Some(len) = resp.content_length() {
            if len > limits.max_bytes {
                return Err(VisionError::TooLarge(format!(
                    "declared size {len} bytes (limit {} bytes)",
                    limits.max_bytes
                )));
            }
        }

        return read_bounded(resp, limits).await;
    }

    Err(VisionError::Transport(format!(
        "too many redirects (limit {MAX_REDIRECTS})"
    )))
}

/// Accumulate the body, aborting once the cumulative size crosses the cap.
async fn read_bounded(resp: reqwest::Response, limits: &Limits) -> Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let mut stream = resp.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| VisionError::Transport(format!("read error: {e}")))?;

        if (buf.len() + chunk.len()) as u64 > limits.max_bytes {
            // Dropping the stream closes the connection before the error
            // reaches the caller.
            return Err(VisionError::TooLarge(format!(
                "streamed size exceeds {} bytes",
                limits.max_bytes
            )));
        }

        buf.extend_from_slice(&chunk);
    }

    debug!(bytes = buf.len(), "download complete");
    Ok(buf)
}
