use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::export::PdfCompiler;
use crate::history::SessionRegistry;
use crate::llm_client::TextGenerator;
use crate::persistence::DraftStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Archive for exported PDFs.
    pub s3: S3Client,
    pub llm: Arc<dyn TextGenerator>,
    pub compiler: Arc<dyn PdfCompiler>,
    /// Local draft storage, backed by Redis.
    pub drafts: DraftStore,
    pub sessions: SessionRegistry,
    pub config: Config,
}
