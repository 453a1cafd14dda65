mod analysis;
mod assessment;
mod config;
mod db;
mod errors;
mod intake;
mod llm_client;
mod models;
mod report;
mod routes;
mod state;
mod voice;

use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::ClaudeAnalysisAdapter;
use crate::assessment::{Orchestrator, PgSessionStore};
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::report::PdfReportRenderer;
use crate::routes::build_router;
use crate::state::AppState;
use crate::voice::ElevenLabsVoice;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cadence API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Wire the orchestrator: store, analysis adapter, and report renderer are
    // constructor-injected so tests can swap in fakes.
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(PgSessionStore::new(pool.clone())),
        Arc::new(ClaudeAnalysisAdapter::new(llm)),
        Arc::new(PdfReportRenderer::new(s3.clone(), config.s3_bucket.clone())),
    ));

    // Voice gateway (TTS/STT)
    let voice = Arc::new(ElevenLabsVoice::new(
        config.elevenlabs_api_key.clone(),
        config.elevenlabs_voice_id.clone(),
    ));

    // Build app state
    let state = AppState {
        db: pool,
        s3,
        config: config.clone(),
        orchestrator,
        voice,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "cadence-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
