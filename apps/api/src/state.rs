use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::assessment::Orchestrator;
use crate::config::Config;
use crate::voice::VoiceGateway;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// The orchestrator carries its own collaborators (store, analysis adapter,
/// report renderer) injected at construction; nothing here is process-global.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub config: Config,
    pub orchestrator: Arc<Orchestrator>,
    pub voice: Arc<dyn VoiceGateway>,
}
