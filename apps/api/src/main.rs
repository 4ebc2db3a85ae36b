mod auth;
mod config;
mod enrichment;
mod errors;
mod events;
mod flashcards;
mod ids;
mod ingest;
mod languages;
mod llm_client;
mod media_client;
mod models;
mod routes;
mod state;
mod store;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::RemoteIdentityProvider;
use crate::config::{Config, StoreLocation};
use crate::enrichment::dictionary::DictionaryClient;
use crate::enrichment::AiWordEnricher;
use crate::events::EventBus;
use crate::llm_client::LlmClient;
use crate::media_client::{AssetStore, MediaClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::backend::{FileKv, KvBackend, MemoryKv, RedisKv};
use crate::store::RecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Memora API v{}", env!("CARGO_PKG_VERSION"));

    // Record store
    let events = EventBus::new();
    let kv = open_store(config.store_location()).await?;
    let store = RecordStore::new(kv, events.clone());

    // Initialize S3 / MinIO for generated audio and images
    let s3 = build_s3_client(&config).await;
    let assets = AssetStore::new(s3, config.s3_bucket.clone(), config.s3_public_url.clone());
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize AI clients
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let media = MediaClient::new(config.openai_api_key.clone(), assets)?;
    let dictionary = DictionaryClient::new(config.dictionary_api_url.clone())?;

    let enricher = Arc::new(AiWordEnricher::new(
        dictionary,
        llm.clone(),
        media,
        config.default_definition_language.clone(),
    ));
    let identity = Arc::new(RemoteIdentityProvider::new(
        config.identity_userinfo_url.clone(),
    )?);

    // Build app state
    let state = AppState {
        store,
        enricher,
        vision: Arc::new(llm),
        identity,
        events,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web client's host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn open_store(location: StoreLocation) -> Result<Arc<dyn KvBackend>> {
    let kv: Arc<dyn KvBackend> = match location {
        StoreLocation::Redis(url) => Arc::new(RedisKv::connect(&url).await?),
        StoreLocation::Directory(dir) => Arc::new(FileKv::open(dir).await?),
        StoreLocation::Memory => {
            info!("Using in-memory store; records are lost on restart");
            Arc::new(MemoryKv::new())
        }
    };
    Ok(kv)
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "memora-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
