use thiserror::Error;

pub type CaptionResult<T> = std::result::Result<T, CaptionError>;

/// Failures of a single describe call. None of them is fatal to a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptionError {
    #[error("failed to load image data: {0}")]
    ImageRead(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    ResponseParse(String),
}

impl CaptionError {
    /// Human readable text shown and persisted in place of a caption.
    pub fn placeholder(&self) -> String {
        match self {
            Self::ImageRead(_) => "Failed to load image data.".to_string(),
            Self::Transport(e) => format!("Error: {}", e),
            Self::ResponseParse(e) => format!("Error: {}", e),
        }
    }
}

impl From<reqwest::Error> for CaptionError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for CaptionError {
    fn from(e: serde_json::Error) -> Self {
        Self::ResponseParse(e.to_string())
    }
}

#[test]
fn test_placeholder() {
    assert_eq!(
        CaptionError::ImageRead("permission denied".into()).placeholder(),
        "Failed to load image data."
    );
    assert_eq!(
        CaptionError::Transport("connection refused".into()).placeholder(),
        "Error: connection refused"
    );
}
