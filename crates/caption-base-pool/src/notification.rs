use caption_base::ImageRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum CaptionStatus {
    Init,
    Started,
    Finished,
    Error,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct CaptionNotification {
    pub target: ImageRef,
    /// position of `target` in the run
    pub index: usize,
    pub total: usize,
    pub status: CaptionStatus,
    /// run progress once this notification was emitted
    pub progress: f64,
    pub message: Option<String>,
}
