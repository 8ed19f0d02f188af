use thiserror::Error;

pub type SidecarResult<T> = std::result::Result<T, SidecarError>;

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("sidecar io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
