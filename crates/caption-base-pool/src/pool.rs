use crate::{
    CaptionBaseCtx, CaptionFailure, CaptionJobState, CaptionNotification, CaptionStatus,
    StartRunError,
};
use ai::{CaptionError, CaptionResult, ImageCaptionInput};
use caption_base::{sort_targets, ImageRef};
use std::sync::{Arc, Mutex, RwLock};
use tokio::{
    runtime::Handle,
    sync::{mpsc, watch},
};
use tokio_util::sync::CancellationToken;

/// Captions a set of images one after another.
///
/// At most one run is active at a time. Items are processed strictly in
/// order: the next image is only sent to the model once the caption of the
/// previous one has been saved.
#[derive(Clone)]
pub struct CaptionPool {
    ctx: Arc<RwLock<CaptionBaseCtx>>,
    state: Arc<watch::Sender<CaptionJobState>>,
    cancel_token: Arc<Mutex<CancellationToken>>,
    notifier: Option<mpsc::Sender<CaptionNotification>>,
    handle: Handle,
}

struct RunContext {
    ctx: CaptionBaseCtx,
    state: Arc<watch::Sender<CaptionJobState>>,
    cancel_token: CancellationToken,
    notifier: Option<mpsc::Sender<CaptionNotification>>,
}

impl CaptionPool {
    /// Create a pool bound to the current tokio runtime.
    pub fn new(ctx: CaptionBaseCtx) -> anyhow::Result<Self> {
        let handle = Handle::try_current()?;
        let (state, _) = watch::channel(CaptionJobState::default());

        Ok(Self {
            ctx: Arc::new(RwLock::new(ctx)),
            state: Arc::new(state),
            cancel_token: Arc::new(Mutex::new(CancellationToken::new())),
            notifier: None,
            handle,
        })
    }

    /// Receive a notification for every item of every run.
    pub fn with_notifier(mut self, notifier: mpsc::Sender<CaptionNotification>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Replace the context used by the next run. A running one keeps its own.
    pub fn set_ctx(&self, ctx: CaptionBaseCtx) {
        let mut current = self.ctx.write().unwrap_or_else(|e| e.into_inner());
        *current = ctx;
    }

    /// Start captioning `targets`, sorted by file name.
    ///
    /// Returns as soon as the run is scheduled. Callers are expected to have
    /// asked the user for confirmation when more than one image is selected.
    pub fn start_run(
        &self,
        targets: impl IntoIterator<Item = ImageRef>,
        prepend_text: &str,
        append_text: &str,
    ) -> Result<(), StartRunError> {
        let ctx = self.ctx.read().unwrap_or_else(|e| e.into_inner()).clone();
        let targets = sort_targets(targets);
        let cancel_token = CancellationToken::new();

        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            if state.is_running() {
                result = Err(StartRunError::AlreadyRunning);
                return false;
            }
            if targets.is_empty() {
                result = Err(StartRunError::EmptyTargetSet);
                return false;
            }
            if ctx.api_key().is_empty() {
                result = Err(StartRunError::MissingCredential);
                return false;
            }

            *state = CaptionJobState::start(targets.clone(), prepend_text, append_text);
            *self.cancel_token.lock().unwrap_or_else(|e| e.into_inner()) = cancel_token.clone();
            true
        });

        if let Err(e) = result {
            tracing::warn!("caption run rejected: {}", e);
            return Err(e);
        }

        tracing::info!("caption run started with {} images", targets.len());

        let run = RunContext {
            ctx,
            state: self.state.clone(),
            cancel_token,
            notifier: self.notifier.clone(),
        };
        self.handle.spawn(async move {
            run.run().await;
        });

        Ok(())
    }

    /// Stop the active run. The image in flight is dropped without being
    /// saved, images already captioned keep their captions.
    ///
    /// Returns `false` when nothing was running.
    pub fn cancel(&self) -> bool {
        if !self.state.borrow().is_running() {
            return false;
        }
        self.cancel_token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel();
        true
    }

    pub fn current_progress(&self) -> f64 {
        self.state.borrow().progress()
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().is_running()
    }

    pub fn snapshot(&self) -> CaptionJobState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CaptionJobState> {
        self.state.subscribe()
    }

    /// Wait until no run is active and return the final state.
    pub async fn wait(&self) -> CaptionJobState {
        let mut rx = self.state.subscribe();
        let finished = rx
            .wait_for(|state| !state.is_running())
            .await
            .map(|state| state.clone());
        // the sender lives as long as `self`
        finished.unwrap_or_else(|_| self.snapshot())
    }
}

impl RunContext {
    async fn run(self) {
        let (targets, prepend_text, append_text) = {
            let state = self.state.borrow();
            (
                state.ordered_targets().to_vec(),
                state.prepend_text().to_string(),
                state.append_text().to_string(),
            )
        };
        let total = targets.len();

        for (index, target) in targets.iter().enumerate() {
            self.notify(target, index, total, CaptionStatus::Init, None)
                .await;
        }

        for (index, target) in targets.iter().enumerate() {
            if self.cancel_token.is_cancelled() {
                self.cancel_remaining(&targets[index..], index, total).await;
                return;
            }

            self.state.send_modify(|state| state.show(target));
            tracing::debug!("captioning {} ({}/{})", target, index + 1, total);
            self.notify(target, index, total, CaptionStatus::Started, None)
                .await;

            let generated = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => None,
                result = self.generate_caption(target) => Some(result),
            };

            let Some(generated) = generated else {
                tracing::info!("caption run cancelled at {}", target);
                self.cancel_remaining(&targets[index..], index, total).await;
                return;
            };

            let (caption, mut failure) = match generated {
                Ok(raw) => (
                    format!(
                        "{}{}{}",
                        prepend_text,
                        self.ctx.normalizer().normalize(&raw),
                        append_text
                    ),
                    None,
                ),
                Err(e) => {
                    tracing::error!("failed to caption {}: {}", target, e);
                    (e.placeholder(), Some(e.to_string()))
                }
            };

            if let Err(e) = self.ctx.sidecar().save(target, &caption).await {
                tracing::error!("failed to save caption of {}: {}", target, e);
                failure = Some(e.to_string());
            }

            let failure = failure.map(|message| CaptionFailure {
                target: target.clone(),
                message,
            });
            let status = match &failure {
                Some(_) => CaptionStatus::Error,
                None => CaptionStatus::Finished,
            };
            let message = failure.as_ref().map(|v| v.message.clone());

            self.state.send_modify(|state| state.advance(failure));
            self.notify(target, index, total, status, message).await;
        }

        // last, so a finished run has nothing left to send
        self.state.send_modify(|state| state.complete());
        tracing::info!("caption run finished");
    }

    async fn generate_caption(&self, target: &ImageRef) -> CaptionResult<String> {
        let image = tokio::fs::read(target.path())
            .await
            .map_err(|e| CaptionError::ImageRead(e.to_string()))?;

        let input =
            ImageCaptionInput::new(image).with_prompt(self.ctx.prompt().map(|v| v.to_string()));

        self.ctx
            .image_caption()
            .describe(input, self.ctx.api_key(), self.ctx.model())
            .await
    }

    async fn cancel_remaining(&self, remaining: &[ImageRef], offset: usize, total: usize) {
        for (index, target) in remaining.iter().enumerate() {
            self.notify(target, offset + index, total, CaptionStatus::Cancelled, None)
                .await;
        }
        self.state.send_modify(|state| state.cancel());
    }

    async fn notify(
        &self,
        target: &ImageRef,
        index: usize,
        total: usize,
        status: CaptionStatus,
        message: Option<String>,
    ) {
        if let Some(tx) = &self.notifier {
            let notification = CaptionNotification {
                target: target.clone(),
                index,
                total,
                status,
                progress: self.state.borrow().progress(),
                message,
            };
            if tx.send(notification).await.is_err() {
                tracing::error!("Failed to send caption {} notification", status);
            }
        }
    }
}
