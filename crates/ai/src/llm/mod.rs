pub mod openai;

/// One part of a multi-part user message.
#[derive(Debug, Clone)]
pub enum LLMUserMessage {
    Text(String),
    ImageUrl(String),
}

#[derive(Debug, Clone)]
pub struct LLMInferenceParams {
    pub temperature: f64,
    pub seed: Option<u64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<usize>,
}

impl Default for LLMInferenceParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            seed: None,
            top_p: Some(0.9),
            max_tokens: Some(300),
        }
    }
}
