//! Local image file loading.

use std::path::Path;

use crate::config::Limits;
use crate::error::{Result, VisionError};

/// Read a local image file, checking the size via metadata before touching
/// the contents.
pub async fn load(path: &Path, limits: &Limits) -> Result<Vec<u8>> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|_| VisionError::NotFound(path.display().to_string()))?;

    if meta.len() > limits.max_bytes {
        return Err(VisionError::TooLarge(format!(
            "{} is {} bytes (limit {} bytes)",
            path.display(),
            meta.len(),
            limits.max_bytes
        )));
    }

    tokio::fs::read(path).await.map_err(VisionError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = load(Path::new("/tmp/kimi-vision-does-not-exist.jpg"), &Limits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::NotFound(_)), "got {err}");
    }

    #[tokio::test]
    async fn reads_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let bytes = load(&path, &Limits::default()).await.unwrap();
        assert_eq!(bytes, b"not really a png");
    }

    #[tokio::test]
    async fn unreadable_path_is_io_error() {
        // A directory passes the metadata probe but fails the read, which
        // must surface as an IO error rather than anything network-flavored.
        let dir = tempfile::tempdir().unwrap();

        let err = load(dir.path(), &Limits::default()).await.unwrap_err();
        assert!(matches!(err, VisionError::Io(_)), "got {err}");
    }

    #[tokio::test]
    async fn oversized_file_rejected_by_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, vec![0u8; 200]).unwrap();

        let limits = Limits {
            max_bytes: 100,
            timeout_ms: 30_000,
        };
        let err = load(&path, &limits).await.unwrap_err();
        assert!(matches!(err, VisionError::TooLarge(_)), "got {err}");
    }
}
