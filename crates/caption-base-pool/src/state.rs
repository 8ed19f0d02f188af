use caption_base::ImageRef;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// An item whose caption could not be generated or saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionFailure {
    pub target: ImageRef,
    pub message: String,
}

/// State of the latest captioning run, as seen by observers.
///
/// Only the pool mutates it; observers get snapshots.
#[derive(Debug, Clone, Default)]
pub struct CaptionJobState {
    ordered_targets: Vec<ImageRef>,
    current_index: usize,
    current_target: Option<ImageRef>,
    phase: RunPhase,
    prepend_text: String,
    append_text: String,
    failed: Vec<CaptionFailure>,
}

impl CaptionJobState {
    pub(crate) fn start(
        ordered_targets: Vec<ImageRef>,
        prepend_text: &str,
        append_text: &str,
    ) -> Self {
        Self {
            ordered_targets,
            current_index: 0,
            current_target: None,
            phase: RunPhase::Running,
            prepend_text: prepend_text.to_string(),
            append_text: append_text.to_string(),
            failed: vec![],
        }
    }

    pub(crate) fn show(&mut self, target: &ImageRef) {
        self.current_target = Some(target.clone());
    }

    pub(crate) fn advance(&mut self, failure: Option<CaptionFailure>) {
        if let Some(failure) = failure {
            self.failed.push(failure);
        }
        self.current_index = (self.current_index + 1).min(self.ordered_targets.len());
    }

    /// Ends the run once every item went through `advance`.
    pub(crate) fn complete(&mut self) {
        if self.phase == RunPhase::Running && self.current_index == self.ordered_targets.len() {
            self.phase = RunPhase::Completed;
        }
    }

    pub(crate) fn cancel(&mut self) {
        if self.phase == RunPhase::Running {
            self.phase = RunPhase::Cancelled;
        }
    }

    pub fn ordered_targets(&self) -> &[ImageRef] {
        &self.ordered_targets
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The image being captioned, or the last one that was.
    pub fn current_target(&self) -> Option<&ImageRef> {
        self.current_target.as_ref()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    pub fn prepend_text(&self) -> &str {
        &self.prepend_text
    }

    pub fn append_text(&self) -> &str {
        &self.append_text
    }

    pub fn failed(&self) -> &[CaptionFailure] {
        &self.failed
    }

    pub fn total(&self) -> usize {
        self.ordered_targets.len()
    }

    /// `current_index / total`, 0.0 before any run.
    pub fn progress(&self) -> f64 {
        if self.ordered_targets.is_empty() {
            return 0.0;
        }
        self.current_index as f64 / self.ordered_targets.len() as f64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_progress() {
        let state = CaptionJobState::default();
        assert_eq!(state.progress(), 0.0);
        assert_eq!(state.phase(), RunPhase::Idle);
        assert!(!state.is_running());

        let targets = ["a.png", "b.png", "c.png", "d.png"].map(ImageRef::new).to_vec();
        let mut state = CaptionJobState::start(targets, "", "");
        assert!(state.is_running());
        assert_eq!(state.progress(), 0.0);

        state.advance(None);
        assert_eq!(state.progress(), 0.25);
        state.advance(Some(CaptionFailure {
            target: ImageRef::new("b.png"),
            message: "Error: timeout".into(),
        }));
        state.advance(None);
        assert_eq!(state.progress(), 0.75);
        assert!(state.is_running());

        state.advance(None);
        assert_eq!(state.progress(), 1.0);
        // the run task flips the phase after its last notification
        assert!(state.is_running());
        state.complete();
        assert_eq!(state.phase(), RunPhase::Completed);
        assert_eq!(state.failed().len(), 1);

        // completion is terminal
        state.advance(None);
        state.cancel();
        assert_eq!(state.current_index(), 4);
        assert_eq!(state.phase(), RunPhase::Completed);
    }

    #[test]
    fn test_complete_requires_every_item() {
        let targets = ["a.png", "b.png"].map(ImageRef::new).to_vec();
        let mut state = CaptionJobState::start(targets, "", "");
        state.advance(None);
        state.complete();
        assert!(state.is_running());

        state.advance(None);
        state.complete();
        assert_eq!(state.phase(), RunPhase::Completed);
    }

    #[test]
    fn test_cancel_keeps_progress() {
        let targets = ["a.png", "b.png"].map(ImageRef::new).to_vec();
        let mut state = CaptionJobState::start(targets, "", "");
        state.advance(None);
        state.cancel();
        assert_eq!(state.phase(), RunPhase::Cancelled);
        assert!(!state.is_running());
        assert_eq!(state.progress(), 0.5);
    }
}
