use crate::{ImageRef, SidecarResult};
use async_trait::async_trait;

/// Where captions are persisted.
#[async_trait]
pub trait SidecarStore: Send + Sync {
    /// Write `caption` for `target`, overwriting any existing content.
    async fn save(&self, target: &ImageRef, caption: &str) -> SidecarResult<()>;

    /// Read the caption of `target`, empty if none was saved yet.
    async fn load(&self, target: &ImageRef) -> SidecarResult<String>;
}

/// Plain UTF-8 text files next to the images.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSidecarStore;

#[async_trait]
impl SidecarStore for FsSidecarStore {
    async fn save(&self, target: &ImageRef, caption: &str) -> SidecarResult<()> {
        let path = target.sidecar_path();
        tokio::fs::write(&path, caption.as_bytes()).await?;
        tracing::debug!("caption saved: {}", path.display());
        Ok(())
    }

    async fn load(&self, target: &ImageRef) -> SidecarResult<String> {
        match tokio::fs::read(target.sidecar_path()).await {
            Ok(bytes) => Ok(String::from_utf8(bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::SidecarError;

    #[test_log::test(tokio::test)]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = ImageRef::new(dir.path().join("cat.png"));
        let store = FsSidecarStore;

        assert_eq!(store.load(&image).await.expect("load"), "");

        store.save(&image, "a cat, sleeping").await.expect("save");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("cat.txt")).expect("read"),
            "a cat, sleeping"
        );

        store.save(&image, "a dog").await.expect("overwrite");
        assert_eq!(store.load(&image).await.expect("load"), "a dog");
    }

    #[test_log::test(tokio::test)]
    async fn test_load_invalid_utf8() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = ImageRef::new(dir.path().join("cat.png"));
        std::fs::write(dir.path().join("cat.txt"), [0xff, 0xfe, 0xfd]).expect("write");

        assert!(matches!(
            FsSidecarStore.load(&image).await,
            Err(SidecarError::Utf8(_))
        ));
    }

    #[test_log::test(tokio::test)]
    async fn test_save_into_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = ImageRef::new(dir.path().join("missing").join("cat.png"));

        assert!(matches!(
            FsSidecarStore.save(&image, "a cat").await,
            Err(SidecarError::Io(_))
        ));
    }
}
