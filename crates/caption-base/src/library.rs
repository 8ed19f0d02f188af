use crate::{sort_targets, ImageRef};
use std::path::Path;

/// List the supported images directly inside `dir`, in display order.
pub async fn list_images(dir: impl AsRef<Path>) -> std::io::Result<Vec<ImageRef>> {
    let mut entries = tokio::fs::read_dir(dir.as_ref()).await?;
    let mut images = vec![];

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if ImageRef::is_supported(&path) {
            images.push(ImageRef::from(path));
        }
    }

    tracing::debug!("{} images found in {}", images.len(), dir.as_ref().display());

    Ok(sort_targets(images))
}
