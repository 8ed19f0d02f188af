use thiserror::Error;

/// Reasons a run is refused. The current state is left untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRunError {
    #[error("a captioning run is already in progress")]
    AlreadyRunning,

    #[error("no image selected")]
    EmptyTargetSet,

    #[error("api key is not set")]
    MissingCredential,
}
