use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{error, info};

use super::interface::{ScorerProvider, SpeechScorer};

/// Lifecycle of the acoustic model
#[derive(Clone)]
pub enum ModelState {
    Unloaded,
    Loading,
    Ready(Arc<dyn SpeechScorer>),
    /// Last load attempt failed; the next access tries again
    Failed(String),
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::Unloaded => write!(f, "Unloaded"),
            ModelState::Loading => write!(f, "Loading"),
            ModelState::Ready(scorer) => write!(f, "Ready({})", scorer.name()),
            ModelState::Failed(cause) => write!(f, "Failed({})", cause),
        }
    }
}

/// Owns the scorer for the lifetime of the service and loads it lazily.
///
/// Only one load attempt runs at a time. Callers that queued behind an
/// attempt take its outcome rather than starting another one.
pub struct ModelLoader {
    provider: Arc<dyn ScorerProvider>,
    state: RwLock<ModelState>,
    load_lock: Mutex<()>,
    attempts: AtomicU64,
}

impl ModelLoader {
    pub fn new(provider: Arc<dyn ScorerProvider>) -> Self {
        Self {
            provider,
            state: RwLock::new(ModelState::Unloaded),
            load_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn provider(&self) -> &dyn ScorerProvider {
        self.provider.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state.read(), ModelState::Ready(_))
    }

    pub fn state(&self) -> ModelState {
        self.state.read().clone()
    }

    /// The loaded scorer, if the model is ready
    pub fn scorer(&self) -> Option<Arc<dyn SpeechScorer>> {
        match &*self.state.read() {
            ModelState::Ready(scorer) => Some(Arc::clone(scorer)),
            _ => None,
        }
    }

    /// Cause of the most recent failed load
    pub fn last_error(&self) -> Option<String> {
        match &*self.state.read() {
            ModelState::Failed(cause) => Some(cause.clone()),
            _ => None,
        }
    }

    /// Load the model unless it is already loaded. Returns whether it is ready.
    pub async fn ensure_ready(&self) -> bool {
        if self.is_ready() {
            return true;
        }

        let seen_attempts = self.attempts.load(Ordering::Acquire);
        let _guard = self.load_lock.lock().await;

        // Someone else ran an attempt while we were waiting
        if self.attempts.load(Ordering::Acquire) != seen_attempts || self.is_ready() {
            return self.is_ready();
        }

        *self.state.write() = ModelState::Loading;
        info!("Loading speech model: {}", self.provider.model_name());

        let outcome = self.provider.load().await;
        self.attempts.fetch_add(1, Ordering::AcqRel);

        match outcome {
            Ok(scorer) => {
                info!("Speech model loaded: {}", scorer.name());
                *self.state.write() = ModelState::Ready(scorer);
                true
            }
            Err(e) => {
                error!("Speech model failed to load: {:#}", e);
                *self.state.write() = ModelState::Failed(format!("{:#}", e));
                false
            }
        }
    }
}
