//! Image format allow-list and MIME derivation.
//!
//! The MIME type is always derived from the path extension, never from a
//! server-declared content type — a lying `Content-Type` header must not be
//! able to smuggle a different media type to the vision API.

use crate::error::{Result, VisionError};

/// File extensions accepted by the pipeline, lowercase, without the dot.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Validate the extension of a path component and derive its MIME type.
///
/// For URLs the caller must pass `Url::path()` so query strings and
/// fragments never reach the extension check.
pub fn validate(path: &str) -> Result<&'static str> {
    let ext = extension_of(path);

    match ext.as_deref() {
        Some(e) if ALLOWED_EXTENSIONS.contains(&e) => Ok(mime_for(e)),
        _ => Err(VisionError::Validation(format!(
            "unsupported image format ({}), supported: {}",
            ext.as_deref().unwrap_or("no extension"),
            ALLOWED_EXTENSIONS.join(", ")
        ))),
    }
}

/// Lowercase extension of the final path component, if any.
fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit(['/', '\\']).next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        // Dotfiles like ".png" have no stem and no real extension.
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Fixed extension → MIME table.  Kept in lockstep with
/// [`ALLOWED_EXTENSIONS`]; the jpeg fallback is unreachable as long as that
/// holds, but stays so an added extension can never yield a bogus MIME.
fn mime_for(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}
