use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::document::{Document, IdGenerator};
use crate::errors::AppError;
use crate::history::handlers::live_document;
use crate::models::resume::{ResumeRow, ResumeSummaryRow, DEFAULT_TEMPLATE_ID};
use crate::persistence::repository::{self, NewResume, ResumeChanges};
use crate::state::AppState;

const DEFAULT_TITLE: &str = "Untitled Resume";

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct CreateResumeRequest {
    pub user_id: Uuid,
    pub title: Option<String>,
    pub template_id: Option<String>,
    /// Starts from a seeded document when absent.
    pub content: Option<Document>,
}

#[derive(Deserialize)]
pub struct UpdateResumeRequest {
    pub title: Option<String>,
    pub template_id: Option<String>,
    pub content: Option<Document>,
}

#[derive(Deserialize)]
pub struct SaveSessionRequest {
    pub user_id: Uuid,
    pub title: Option<String>,
}

fn resume_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Resume {id} not found"))
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    Ok(())
}

/// Content arriving from a client may lack ids on new entries.
fn with_ids(mut doc: Document) -> Document {
    let mut ids = IdGenerator::new();
    doc.assign_missing_ids(&mut ids);
    doc
}

/// POST /api/v1/resumes
pub async fn handle_create_resume(
    State(state): State<AppState>,
    Json(req): Json<CreateResumeRequest>,
) -> Result<(StatusCode, Json<ResumeRow>), AppError> {
    let title = req.title.as_deref().unwrap_or(DEFAULT_TITLE);
    validate_title(title)?;
    let content = match req.content {
        Some(doc) => with_ids(doc),
        None => Document::seeded(&mut IdGenerator::new()),
    };

    let row = repository::create_resume(
        &state.db,
        NewResume {
            user_id: req.user_id,
            title,
            template_id: req.template_id.as_deref().unwrap_or(DEFAULT_TEMPLATE_ID),
            content: &content,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<ResumeSummaryRow>>, AppError> {
    let rows = repository::list_resumes(&state.db, params.user_id).await?;
    Ok(Json(rows))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ResumeRow>, AppError> {
    repository::get_resume(&state.db, id, params.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| resume_not_found(id))
}

/// PUT /api/v1/resumes/:id
pub async fn handle_update_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
    Json(req): Json<UpdateResumeRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    if let Some(title) = &req.title {
        validate_title(title)?;
    }
    let content = req.content.map(with_ids);
    let changes = ResumeChanges {
        title: req.title.as_deref(),
        template_id: req.template_id.as_deref(),
        content: content.as_ref(),
    };
    repository::update_resume(&state.db, id, params.user_id, changes)
        .await?
        .map(Json)
        .ok_or_else(|| resume_not_found(id))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    if repository::delete_resume(&state.db, id, params.user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(resume_not_found(id))
    }
}

/// POST /api/v1/editor/sessions/:id/save
///
/// Writes the session's live document to the remote store, creating the
/// record on first save. The draft is refreshed so it points at the record.
pub async fn handle_save_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SaveSessionRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    if let Some(title) = &req.title {
        validate_title(title)?;
    }
    let (document, resume_id) = live_document(&state, session_id).await?;

    let existing = match resume_id {
        Some(id) => {
            let changes = ResumeChanges {
                title: req.title.as_deref(),
                template_id: None,
                content: Some(&document),
            };
            repository::update_resume(&state.db, id, req.user_id, changes).await?
        }
        None => None,
    };

    let row = match existing {
        Some(row) => row,
        None => {
            repository::create_resume(
                &state.db,
                NewResume {
                    user_id: req.user_id,
                    title: req.title.as_deref().unwrap_or(DEFAULT_TITLE),
                    template_id: DEFAULT_TEMPLATE_ID,
                    content: &document,
                },
            )
            .await?
        }
    };

    state
        .sessions
        .with_session(session_id, |s| s.resume_id = Some(row.id))
        .await;
    state
        .drafts
        .save(session_id, &document, Some(row.id))
        .await?;
    info!("Session {session_id} saved to resume {}", row.id);
    Ok(Json(row))
}
