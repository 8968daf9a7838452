use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assist::import::{parse_pdf, validate_upload, ImportOutcome};
use crate::assist::rewrite::{rewrite_bullet, RewrittenBullet};
use crate::document::{Edit, IdGenerator};
use crate::errors::AppError;
use crate::history::SessionRegistry;
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";

#[derive(Deserialize)]
pub struct RewriteRequest {
    pub bullet: String,
    pub job_description: Option<String>,
}

#[derive(Deserialize)]
pub struct ImportQuery {
    /// Apply the imported document to this editor session as one undoable edit.
    pub session_id: Option<Uuid>,
}

/// POST /api/v1/assist/rewrite
pub async fn handle_rewrite(
    State(state): State<AppState>,
    Json(req): Json<RewriteRequest>,
) -> Result<Json<RewrittenBullet>, AppError> {
    let rewritten =
        rewrite_bullet(state.llm.as_ref(), &req.bullet, req.job_description.as_deref()).await?;
    Ok(Json(rewritten))
}

fn upload_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("invalid upload: {}", e.body_text()))
    }
}

/// POST /api/v1/assist/import
pub async fn handle_import(
    State(state): State<AppState>,
    Query(params): Query<ImportQuery>,
    mut multipart: Multipart,
) -> Result<Json<ImportOutcome>, AppError> {
    if let Some(session_id) = params.session_id {
        if !state.sessions.contains(session_id).await {
            return Err(AppError::NotFound(format!(
                "Editor session {session_id} not found"
            )));
        }
    }

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(upload_error)?;
        upload = Some((filename, content_type, data));
        break;
    }

    let (filename, content_type, data) = upload.ok_or_else(|| {
        AppError::Validation(format!("multipart field '{UPLOAD_FIELD}' is required"))
    })?;
    validate_upload(
        filename.as_deref(),
        content_type.as_deref(),
        &data,
        state.config.max_upload_bytes,
    )?;
    info!(
        "Importing PDF {} ({} bytes)",
        filename.as_deref().unwrap_or("<unnamed>"),
        data.len()
    );

    let outcome = parse_pdf(state.llm.as_ref(), data, &mut IdGenerator::new()).await;

    if let Some(session_id) = params.session_id {
        apply_to_session(&state.sessions, session_id, &outcome).await?;
    }

    Ok(Json(outcome))
}

/// Replaces the session's document with an imported one as a single undoable
/// edit. A fallback document is never applied; the session keeps its content.
async fn apply_to_session(
    sessions: &SessionRegistry,
    session_id: Uuid,
    outcome: &ImportOutcome,
) -> Result<bool, AppError> {
    if outcome.fallback {
        warn!("Import fell back; leaving session {session_id} untouched");
        return Ok(false);
    }

    let edit = Edit::Replace {
        document: outcome.document.clone(),
        description: Some("Imported from PDF".to_string()),
    };
    let now = Instant::now();
    sessions
        .with_session(session_id, |s| {
            s.editor.dispatch(&edit, now);
        })
        .await
        .map(|_| true)
        .ok_or_else(|| AppError::NotFound(format!("Editor session {session_id} not found")))
}
