use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::enrichment::WordEnricher;
use crate::events::EventBus;
use crate::ingest::image::VisionExtractor;
use crate::store::RecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    /// Definition, audio and image enrichment. Default: `AiWordEnricher`.
    pub enricher: Arc<dyn WordEnricher>,
    /// Image-to-text for photo uploads. Default: the `LlmClient`.
    pub vision: Arc<dyn VisionExtractor>,
    pub identity: Arc<dyn IdentityProvider>,
    pub events: EventBus,
}
