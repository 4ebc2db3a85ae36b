//! In-process change notifications.
//!
//! The store publishes on every write and the upload orchestration publishes
//! progress; SSE subscribers react to these instead of re-reading on a timer.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AppEvent {
    #[serde(rename_all = "camelCase")]
    SetsChanged { set_id: String },
    #[serde(rename_all = "camelCase")]
    WordsChanged { set_id: String },
    #[serde(rename_all = "camelCase")]
    UploadProgress {
        upload_id: String,
        percent: f64,
        stage: String,
    },
}

impl AppEvent {
    /// SSE event name.
    pub fn event_type(&self) -> &'static str {
        match self {
            AppEvent::SetsChanged { .. } => "setsChanged",
            AppEvent::WordsChanged { .. } => "wordsChanged",
            AppEvent::UploadProgress { .. } => "uploadProgress",
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Publishes to current subscribers. Having none is not an error.
    pub fn publish(&self, event: AppEvent) {
        if self.tx.send(event).is_err() {
            trace!("No event subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
