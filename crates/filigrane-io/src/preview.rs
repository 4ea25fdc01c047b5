//! Cancellable, sequence-gated preview rendering.
//!
//! Every [`PreviewScheduler::request`] takes the next sequence number,
//! cancels the previous task's token, and hands an immutable
//! [`PreviewTask`] to a blocking worker thread. When a task finishes,
//! its result is published only if its sequence number is still the
//! latest one issued; anything older is dropped. The check and the
//! publish happen together inside the watch channel's write lock, and
//! requests take their sequence number and swap the cancellation token
//! under the same lock, so no stale frame can land after a newer one.
//!
//! Cancellation is cooperative: a renderer may poll the token and bail
//! out early, but correctness only relies on the publish gate.

use std::sync::{Arc, Mutex, PoisonError};

use filigrane_pipeline::{RenderError, RgbaImage, Settings};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::render::WatermarkRenderer;
use crate::source::SourceImage;

/// One render request: a snapshot of everything the render reads.
#[derive(Debug, Clone)]
pub struct PreviewTask {
    pub sequence: u64,
    pub settings: Settings,
    pub source: Arc<SourceImage>,
}

/// Produces preview frames. Called on a blocking worker thread.
pub trait PreviewRenderer: Send + Sync + 'static {
    /// Render `task`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Cancelled`] when giving up because `cancel`
    /// fired, or any other [`RenderError`] when the render fails.
    fn render(&self, task: &PreviewTask, cancel: &CancellationToken) -> Result<RgbaImage, RenderError>;
}

impl PreviewRenderer for WatermarkRenderer {
    fn render(&self, task: &PreviewTask, cancel: &CancellationToken) -> Result<RgbaImage, RenderError> {
        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        // Previews are drawn at base resolution; export sizing is skipped.
        let composition = Self::render(self, &task.source, &task.settings.watermark, None)?;
        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        Ok(composition.image)
    }
}

/// Where the preview stream currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewStatus {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// The latest request is still rendering.
    Rendering,
    /// The latest request's frame is on display.
    Published,
    /// The latest request failed; the previous frame stays on display.
    Failed,
}

/// What observers of the preview see.
#[derive(Debug, Clone, Default)]
pub struct PreviewState {
    /// Latest sequence number issued.
    pub sequence: u64,
    /// Sequence number of the frame on display.
    pub published: Option<u64>,
    pub status: PreviewStatus,
    pub frame: Option<Arc<RgbaImage>>,
    /// Message of the latest failure, cleared by the next publish.
    pub error: Option<String>,
}

/// How a single task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The frame was put on display.
    Published,
    /// A newer request was issued first; the result was dropped.
    Discarded,
    /// The task was still current but failed. The message is also in
    /// [`PreviewState::error`].
    Failed(String),
}

/// Handle on a dispatched task.
#[derive(Debug)]
pub struct PendingPreview {
    sequence: u64,
    handle: JoinHandle<TaskOutcome>,
}

impl PendingPreview {
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Wait for the task to finish.
    pub async fn outcome(self) -> TaskOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => TaskOutcome::Failed(format!("preview task aborted: {e}")),
        }
    }
}

/// Dispatches preview renders and publishes the latest one.
pub struct PreviewScheduler<R> {
    renderer: Arc<R>,
    runtime: Handle,
    state: Arc<watch::Sender<PreviewState>>,
    current: Mutex<CancellationToken>,
}

impl<R> std::fmt::Debug for PreviewScheduler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewScheduler")
            .field("sequence", &self.state.borrow().sequence)
            .finish_non_exhaustive()
    }
}

impl<R: PreviewRenderer> PreviewScheduler<R> {
    /// A scheduler running renders on `runtime`'s blocking pool.
    #[must_use]
    pub fn new(renderer: R, runtime: Handle) -> Self {
        let (state, _) = watch::channel(PreviewState::default());
        Self {
            renderer: Arc::new(renderer),
            runtime,
            state: Arc::new(state),
            current: Mutex::new(CancellationToken::new()),
        }
    }

    /// Observe published frames and status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PreviewState> {
        self.state.subscribe()
    }

    /// The current state.
    #[must_use]
    pub fn snapshot(&self) -> PreviewState {
        self.state.borrow().clone()
    }

    /// Request a preview of `source` under `settings`. Never blocks on
    /// the render.
    pub fn request(&self, settings: Settings, source: Arc<SourceImage>) -> PendingPreview {
        let token = CancellationToken::new();
        let mut sequence = 0;
        // The token swap shares the sequence bump's lock, so the live token
        // always belongs to the highest sequence issued.
        self.state.send_modify(|state| {
            state.sequence += 1;
            state.status = PreviewStatus::Rendering;
            sequence = state.sequence;
            let previous = std::mem::replace(
                &mut *self.current.lock().unwrap_or_else(PoisonError::into_inner),
                token.clone(),
            );
            previous.cancel();
        });

        let task = PreviewTask {
            sequence,
            settings,
            source,
        };
        tracing::debug!(sequence, "Preview requested");

        let renderer = Arc::clone(&self.renderer);
        let state = Arc::clone(&self.state);
        let handle = self.runtime.spawn_blocking(move || {
            let result = renderer.render(&task, &token);
            publish(&state, task.sequence, result)
        });
        PendingPreview { sequence, handle }
    }
}

/// Apply a finished task's result if it is still the latest.
fn publish(
    state: &watch::Sender<PreviewState>,
    sequence: u64,
    result: Result<RgbaImage, RenderError>,
) -> TaskOutcome {
    let mut outcome = TaskOutcome::Discarded;
    state.send_if_modified(|current| {
        if current.sequence != sequence {
            return false;
        }
        match &result {
            Ok(_) | Err(RenderError::Cancelled) => {}
            Err(e) => {
                current.status = PreviewStatus::Failed;
                current.error = Some(e.to_string());
                outcome = TaskOutcome::Failed(e.to_string());
                return true;
            }
        }
        let Ok(frame) = result else {
            return false;
        };
        current.status = PreviewStatus::Published;
        current.published = Some(sequence);
        current.frame = Some(Arc::new(frame));
        current.error = None;
        outcome = TaskOutcome::Published;
        true
    });

    match &outcome {
        TaskOutcome::Published => tracing::debug!(sequence, "Preview published"),
        TaskOutcome::Discarded => tracing::trace!(sequence, "Stale preview discarded"),
        TaskOutcome::Failed(error) => tracing::warn!(sequence, %error, "Preview render failed, keeping last frame"),
    }
    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::mpsc;

    use filigrane_pipeline::BlockRasterizer;

    use super::*;

    /// Renders a 1x1 frame whose red channel is the task's sequence
    /// number, but only once the test releases that sequence.
    #[derive(Default)]
    struct GateRenderer {
        gates: Mutex<HashMap<u64, mpsc::Receiver<Result<(), String>>>>,
    }

    impl GateRenderer {
        fn gate(&self, sequence: u64) -> mpsc::Sender<Result<(), String>> {
            let (tx, rx) = mpsc::channel();
            self.gates.lock().unwrap().insert(sequence, rx);
            tx
        }
    }

    impl PreviewRenderer for GateRenderer {
        fn render(&self, task: &PreviewTask, _cancel: &CancellationToken) -> Result<RgbaImage, RenderError> {
            let rx = self.gates.lock().unwrap().remove(&task.sequence).unwrap();
            match rx.recv().unwrap() {
                Ok(()) => Ok(RgbaImage::from_pixel(
                    1,
                    1,
                    image::Rgba([u8::try_from(task.sequence).unwrap(), 0, 0, 255]),
                )),
                Err(message) => Err(RenderError::FontUnavailable(message)),
            }
        }
    }

    fn source() -> Arc<SourceImage> {
        Arc::new(SourceImage::from_image("p.png", RgbaImage::new(4, 4), None))
    }

    fn frame_sequence(state: &PreviewState) -> Option<u8> {
        state.frame.as_ref().map(|f| f.get_pixel(0, 0)[0])
    }

    /// Issue `n` requests, release them in `order`, and return each
    /// sequence's outcome plus the final state.
    async fn run_permutation(n: u64, order: &[u64]) -> (HashMap<u64, TaskOutcome>, PreviewState) {
        let scheduler = PreviewScheduler::new(GateRenderer::default(), Handle::current());
        let mut gates = HashMap::new();
        let mut pending = HashMap::new();
        for sequence in 1..=n {
            gates.insert(sequence, scheduler.renderer.gate(sequence));
            let p = scheduler.request(Settings::default(), source());
            assert_eq!(p.sequence(), sequence);
            pending.insert(sequence, p);
        }

        let mut outcomes = HashMap::new();
        for sequence in order {
            gates[sequence].send(Ok(())).unwrap();
            let outcome = pending.remove(sequence).unwrap().outcome().await;
            outcomes.insert(*sequence, outcome);
        }
        (outcomes, scheduler.snapshot())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn latest_request_wins_under_any_completion_order() {
        let orders: [&[u64]; 5] = [
            &[1, 2, 3, 4, 5],
            &[5, 4, 3, 2, 1],
            &[3, 1, 5, 2, 4],
            &[2, 5, 1, 4, 3],
            &[4, 3, 5, 1, 2],
        ];
        for order in orders {
            let (outcomes, state) = run_permutation(5, order).await;
            assert_eq!(outcomes[&5], TaskOutcome::Published, "order {order:?}");
            for sequence in 1..5 {
                assert_eq!(outcomes[&sequence], TaskOutcome::Discarded, "order {order:?}");
            }
            assert_eq!(state.sequence, 5);
            assert_eq!(state.published, Some(5));
            assert_eq!(state.status, PreviewStatus::Published);
            assert_eq!(frame_sequence(&state), Some(5));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn superseded_request_is_cancelled() {
        struct Spy(Mutex<Vec<CancellationToken>>);
        impl PreviewRenderer for Spy {
            fn render(&self, _task: &PreviewTask, cancel: &CancellationToken) -> Result<RgbaImage, RenderError> {
                self.0.lock().unwrap().push(cancel.clone());
                Ok(RgbaImage::new(1, 1))
            }
        }

        let scheduler = PreviewScheduler::new(Spy(Mutex::new(Vec::new())), Handle::current());
        let first = scheduler.request(Settings::default(), source());
        first.outcome().await;
        let second = scheduler.request(Settings::default(), source());
        second.outcome().await;

        let tokens = scheduler.renderer.0.lock().unwrap();
        assert!(tokens[0].is_cancelled());
        assert!(!tokens[1].is_cancelled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn only_the_newest_of_concurrent_requests_stays_live() {
        struct Spy(Mutex<HashMap<u64, CancellationToken>>);
        impl PreviewRenderer for Spy {
            fn render(&self, task: &PreviewTask, cancel: &CancellationToken) -> Result<RgbaImage, RenderError> {
                self.0.lock().unwrap().insert(task.sequence, cancel.clone());
                Ok(RgbaImage::new(1, 1))
            }
        }

        let scheduler = PreviewScheduler::new(Spy(Mutex::new(HashMap::new())), Handle::current());
        let pending: Vec<PendingPreview> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        (0..5)
                            .map(|_| scheduler.request(Settings::default(), source()))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers.into_iter().flat_map(|w| w.join().unwrap()).collect()
        });
        for p in pending {
            p.outcome().await;
        }

        let state = scheduler.snapshot();
        assert_eq!(state.sequence, 20);
        let tokens = scheduler.renderer.0.lock().unwrap();
        assert_eq!(tokens.len(), 20);
        for (sequence, token) in tokens.iter() {
            assert_eq!(token.is_cancelled(), *sequence != 20, "sequence {sequence}");
        }
        assert_eq!(state.published, Some(20));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_render_keeps_the_last_frame() {
        let scheduler = PreviewScheduler::new(GateRenderer::default(), Handle::current());

        let gate = scheduler.renderer.gate(1);
        let first = scheduler.request(Settings::default(), source());
        gate.send(Ok(())).unwrap();
        assert_eq!(first.outcome().await, TaskOutcome::Published);

        let gate = scheduler.renderer.gate(2);
        let second = scheduler.request(Settings::default(), source());
        gate.send(Err("boom".into())).unwrap();
        assert!(matches!(second.outcome().await, TaskOutcome::Failed(_)));

        let state = scheduler.snapshot();
        assert_eq!(state.status, PreviewStatus::Failed);
        assert_eq!(state.published, Some(1));
        assert_eq!(frame_sequence(&state), Some(1));
        assert!(state.error.unwrap().contains("boom"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stale_failure_does_not_touch_state() {
        let scheduler = PreviewScheduler::new(GateRenderer::default(), Handle::current());
        let gate_1 = scheduler.renderer.gate(1);
        let gate_2 = scheduler.renderer.gate(2);
        let first = scheduler.request(Settings::default(), source());
        let second = scheduler.request(Settings::default(), source());

        gate_2.send(Ok(())).unwrap();
        assert_eq!(second.outcome().await, TaskOutcome::Published);
        gate_1.send(Err("late".into())).unwrap();
        assert_eq!(first.outcome().await, TaskOutcome::Discarded);

        let state = scheduler.snapshot();
        assert_eq!(state.status, PreviewStatus::Published);
        assert!(state.error.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn subscribers_see_status_transitions() {
        let scheduler = PreviewScheduler::new(GateRenderer::default(), Handle::current());
        let mut rx = scheduler.subscribe();
        assert_eq!(rx.borrow().status, PreviewStatus::Idle);

        let gate = scheduler.renderer.gate(1);
        let pending = scheduler.request(Settings::default(), source());
        assert_eq!(rx.borrow_and_update().status, PreviewStatus::Rendering);

        gate.send(Ok(())).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().status, PreviewStatus::Published);
        assert_eq!(pending.outcome().await, TaskOutcome::Published);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn watermark_renderer_previews_at_base_size() {
        let renderer = WatermarkRenderer::new(Arc::new(BlockRasterizer));
        let scheduler = PreviewScheduler::new(renderer, Handle::current());
        let mut settings = Settings::default();
        settings.watermark.text.content = "preview".into();
        settings.export.sizing.scale_percent = 50;

        let source = Arc::new(SourceImage::from_image(
            "p.png",
            RgbaImage::from_pixel(160, 120, image::Rgba([10, 10, 10, 255])),
            None,
        ));
        let outcome = scheduler.request(settings, source).outcome().await;
        assert_eq!(outcome, TaskOutcome::Published);
        let frame = scheduler.snapshot().frame.unwrap();
        assert_eq!(frame.dimensions(), (160, 120));
    }

    #[test]
    fn cancelled_token_short_circuits_the_watermark_renderer() {
        let renderer = WatermarkRenderer::new(Arc::new(BlockRasterizer));
        let token = CancellationToken::new();
        token.cancel();
        let task = PreviewTask {
            sequence: 1,
            settings: Settings::default(),
            source: source(),
        };
        let result = PreviewRenderer::render(&renderer, &task, &token);
        assert!(matches!(result, Err(RenderError::Cancelled)));
    }
}
