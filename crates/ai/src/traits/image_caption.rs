use crate::CaptionResult;
use async_trait::async_trait;

pub const DEFAULT_CAPTION_PROMPT: &str = r#"Describe this image as a caption for an image training dataset. Focus on the subject, its attributes, the setting, the composition and the style. Use short descriptive phrases instead of full sentences. Do not mention that this is an image or a photo. Limit your response to no more than 50 words."#;

#[derive(Debug, Clone)]
pub struct ImageCaptionInput {
    pub image: Vec<u8>,
    pub prompt: Option<String>,
}

impl ImageCaptionInput {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or(DEFAULT_CAPTION_PROMPT)
    }
}

pub type ImageCaptionOutput = String;

/// A backend able to describe one image.
///
/// The credential and model identifier are opaque to callers and passed
/// through on every call, so one client can serve runs with different settings.
#[async_trait]
pub trait ImageCaptionModel: Send + Sync {
    async fn describe(
        &self,
        input: ImageCaptionInput,
        credential: &str,
        model: &str,
    ) -> CaptionResult<ImageCaptionOutput>;
}
