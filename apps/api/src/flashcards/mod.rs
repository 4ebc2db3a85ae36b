// Set/Word orchestration: ties ingestion, enrichment and the record store
// together behind the HTTP handlers.

pub mod handlers;
pub mod intake;
pub mod sets;
pub mod words;
