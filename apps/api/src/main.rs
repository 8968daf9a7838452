mod assist;
mod config;
mod db;
mod document;
mod errors;
mod export;
mod history;
mod llm_client;
mod models;
mod persistence;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::export::LatexCompiler;
use crate::history::session::run_autosave;
use crate::history::SessionRegistry;
use crate::llm_client::LlmClient;
use crate::persistence::{DraftStore, RedisStorage};
use crate::routes::build_router;
use crate::state::AppState;

/// How often editor sessions are checked for due history records and drafts.
const AUTOSAVE_TICK: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Vitae API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL: saved resumes
    let db = create_pool(&config.database_url).await?;

    // Redis: editor drafts
    let redis = redis::Client::open(config.redis_url.clone())?;
    let drafts = DraftStore::new(Arc::new(RedisStorage::new(redis)));
    info!("Redis draft storage initialized");

    // S3 / MinIO: exported PDF archive
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let compiler = LatexCompiler::new(config.latex_program.clone(), config.latex_timeout);
    info!(
        "PDF export via {} (timeout {}s)",
        config.latex_program,
        config.latex_timeout.as_secs()
    );

    let sessions = SessionRegistry::new(config.editor_settings());
    tokio::spawn(run_autosave(sessions.clone(), drafts.clone(), AUTOSAVE_TICK));

    let state = AppState {
        db,
        s3,
        llm: Arc::new(llm),
        compiler: Arc::new(compiler),
        drafts,
        sessions,
        config: config.clone(),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict origins once the web client has a fixed host
    );

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
        "vitae-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
