//! Progress Reporter
//!
//! Explicit progress sink passed down the call chain. Emission is serialized
//! behind one lock so `completedUnits` never goes backwards, even when phases
//! finish concurrently.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use recap_core::{AnalysisProgress, ProgressEventKind};

pub type ProgressCallback = Arc<dyn Fn(AnalysisProgress) + Send + Sync>;

enum ProgressSink {
    Channel(mpsc::UnboundedSender<AnalysisProgress>),
    Callback(ProgressCallback),
    Silent,
}

impl ProgressSink {
    fn emit(&self, event: AnalysisProgress) {
        match self {
            // A dropped receiver means nobody is listening; the analysis goes on.
            ProgressSink::Channel(tx) => {
                let _ = tx.send(event);
            }
            ProgressSink::Callback(callback) => callback(event),
            ProgressSink::Silent => {}
        }
    }
}

/// How a phase ended, as far as the listener is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEnd {
    Completed,
    /// Failed; the merge goes on without it
    Substituted,
    /// Failed with nothing to fall back on
    Failed,
}

#[derive(Debug, Default)]
struct ProgressState {
    completed: u32,
    total: u32,
}

#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<ProgressSink>,
    state: Arc<Mutex<ProgressState>>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter").finish_non_exhaustive()
    }
}

impl ProgressReporter {
    fn with_sink(sink: ProgressSink) -> Self {
        Self {
            sink: Arc::new(sink),
            state: Arc::new(Mutex::new(ProgressState::default())),
        }
    }

    /// Reporter plus the receiving end of its event stream.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AnalysisProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::with_sink(ProgressSink::Channel(tx)), rx)
    }

    pub fn from_callback<F>(callback: F) -> Self
    where
        F: Fn(AnalysisProgress) + Send + Sync + 'static,
    {
        Self::with_sink(ProgressSink::Callback(Arc::new(callback)))
    }

    pub fn silent() -> Self {
        Self::with_sink(ProgressSink::Silent)
    }

    /// Fix the unit count for this run. Called once, before the first phase.
    pub async fn start(&self, total_units: u32) {
        let mut state = self.state.lock().await;
        state.completed = 0;
        state.total = total_units;
    }

    pub async fn phase_started(&self, phase_id: &str, title: &str) {
        let state = self.state.lock().await;
        self.sink.emit(
            AnalysisProgress::new(
                ProgressEventKind::PhaseStarted,
                state.completed,
                state.total,
                format!("{} started", title),
            )
            .with_phase(phase_id),
        );
    }

    pub async fn phase_finished(&self, phase_id: &str, title: &str, end: PhaseEnd) {
        let mut state = self.state.lock().await;
        state.completed = (state.completed + 1).min(state.total);
        let (kind, message) = match end {
            PhaseEnd::Completed => (ProgressEventKind::PhaseCompleted, format!("{} completed", title)),
            PhaseEnd::Substituted => (
                ProgressEventKind::PhaseFailed,
                format!("{} failed, continuing with a placeholder", title),
            ),
            PhaseEnd::Failed => (ProgressEventKind::PhaseFailed, format!("{} failed", title)),
        };
        debug!(
            "Progress {}/{}: {}",
            state.completed, state.total, message
        );
        self.sink.emit(
            AnalysisProgress::new(kind, state.completed, state.total, message).with_phase(phase_id),
        );
    }

    pub async fn evaluating(&self) {
        let state = self.state.lock().await;
        self.sink.emit(AnalysisProgress::new(
            ProgressEventKind::Evaluating,
            state.completed,
            state.total,
            "Evaluating result quality",
        ));
    }

    pub async fn finished(&self, message: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.completed = state.total;
        self.sink.emit(AnalysisProgress::new(
            ProgressEventKind::Finished,
            state.completed,
            state.total,
            message,
        ));
    }

    pub async fn cancelled(&self) {
        let state = self.state.lock().await;
        self.sink.emit(AnalysisProgress::new(
            ProgressEventKind::Cancelled,
            state.completed,
            state.total,
            "Analysis cancelled",
        ));
    }

    pub async fn completed_units(&self) -> u32 {
        self.state.lock().await.completed
    }
}
