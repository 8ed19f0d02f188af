use ai::ImageCaptionModel;
use caption_base::{CaptionNormalizer, SidecarStore};
use std::sync::Arc;

/// Everything a run reads when it starts.
#[derive(Clone)]
pub struct CaptionBaseCtx {
    image_caption: Arc<dyn ImageCaptionModel>,
    sidecar: Arc<dyn SidecarStore>,
    normalizer: CaptionNormalizer,
    api_key: String,
    model: String,
    prompt: Option<String>,
}

impl CaptionBaseCtx {
    pub fn new(image_caption: Arc<dyn ImageCaptionModel>, sidecar: Arc<dyn SidecarStore>) -> Self {
        Self {
            image_caption,
            sidecar,
            normalizer: CaptionNormalizer::default(),
            api_key: String::new(),
            model: String::new(),
            prompt: None,
        }
    }

    pub fn with_credentials(mut self, api_key: &str, model: &str) -> Self {
        self.api_key = api_key.to_string();
        self.model = model.to_string();
        self
    }

    pub fn with_normalizer(mut self, normalizer: CaptionNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn image_caption(&self) -> &dyn ImageCaptionModel {
        self.image_caption.as_ref()
    }

    pub fn sidecar(&self) -> &dyn SidecarStore {
        self.sidecar.as_ref()
    }

    pub fn normalizer(&self) -> &CaptionNormalizer {
        &self.normalizer
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }
}

impl std::fmt::Debug for CaptionBaseCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionBaseCtx")
            .field("model", &self.model)
            .field("api_key_set", &!self.api_key.is_empty())
            .field("prompt", &self.prompt)
            .finish()
    }
}
