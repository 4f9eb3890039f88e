use std::path::{Path, PathBuf};

use anyhow::Context;
use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

/// An uploaded image as received from the client.
pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Writes the image under `dir` with a random name and returns its path.
pub async fn save_image(dir: &Path, img: UploadItem) -> anyhow::Result<PathBuf> {
    anyhow::ensure!(!img.body.is_empty(), "empty image");

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("create upload dir {}", dir.display()))?;

    let ext = ext_from_mime(&img.content_type).unwrap_or("bin");
    let path = dir.join(format!("{}.{}", Uuid::new_v4(), ext));
    tokio::fs::write(&path, &img.body)
        .await
        .with_context(|| format!("write image {}", path.display()))?;

    debug!(path = %path.display(), bytes = img.body.len(), "image stored");
    Ok(path)
}

/// Best-effort removal of an image whose product write failed.
pub async fn discard_image(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(error = %e, path = %path.display(), "failed to remove orphaned image");
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}
