use crate::{CaptionNormalizer, ImageRef, SidecarResult, SidecarStore};

/// The editable caption of the image currently shown.
///
/// Every edit is normalized again, which is a no-op for text that already is.
#[derive(Debug, Clone)]
pub struct CaptionBuffer {
    target: ImageRef,
    text: String,
    saved: String,
    normalizer: CaptionNormalizer,
}

impl CaptionBuffer {
    pub async fn load(
        target: ImageRef,
        store: &dyn SidecarStore,
        normalizer: CaptionNormalizer,
    ) -> SidecarResult<Self> {
        let saved = store.load(&target).await?;
        Ok(Self {
            target,
            text: saved.clone(),
            saved,
            normalizer,
        })
    }

    pub fn target(&self) -> &ImageRef {
        &self.target
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, raw: &str) {
        self.text = self.normalizer.normalize(raw);
    }

    pub fn is_dirty(&self) -> bool {
        self.text != self.saved
    }

    pub async fn save(&mut self, store: &dyn SidecarStore) -> SidecarResult<()> {
        store.save(&self.target, &self.text).await?;
        self.saved = self.text.clone();
        Ok(())
    }
}
