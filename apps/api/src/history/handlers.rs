use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::document::{Document, Edit, IdGenerator};
use crate::errors::AppError;
use crate::history::editor::Editor;
use crate::history::log::EventSummary;
use crate::history::session::{Session, SessionSnapshot};
use crate::persistence::repository;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionRequest {
    /// Reopen a previous session: its in-memory editor or its stored draft.
    pub session_id: Option<Uuid>,
    /// Load a saved resume when there is no draft to restore.
    pub resume_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub cursor: usize,
    pub can_undo: bool,
    pub can_redo: bool,
    /// Field edits still waiting for a pause in typing.
    pub pending_edits: usize,
    pub events: Vec<EventSummary>,
}

fn session_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Editor session {id} not found"))
}

/// POST /api/v1/editor/sessions
///
/// Restores in order: a live session, a stored draft, a saved resume, and
/// finally a seeded document.
pub async fn handle_open_session(
    State(state): State<AppState>,
    body: Option<Json<OpenSessionRequest>>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let session_id = req.session_id.unwrap_or_else(Uuid::new_v4);
    let settings = state.sessions.settings();

    if let Some(snapshot) = state
        .sessions
        .with_session(session_id, |s| s.snapshot(session_id))
        .await
    {
        return Ok(Json(snapshot));
    }

    let (document, resume_id) = match state.drafts.load(session_id).await {
        Some(draft) => {
            info!("Restored draft for session {session_id} (saved {})", draft.saved_at);
            (Some(draft.current_state), draft.resume_id)
        }
        None => match (req.resume_id, req.user_id) {
            (Some(resume_id), Some(user_id)) => {
                let row = repository::get_resume(&state.db, resume_id, user_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
                (Some(row.content.0), Some(resume_id))
            }
            (Some(resume_id), None) => {
                return Err(AppError::Validation(format!(
                    "user_id is required to open resume {resume_id}"
                )))
            }
            _ => (None, None),
        },
    };

    let editor = match document {
        Some(mut doc) => {
            let mut ids = IdGenerator::new();
            doc.assign_missing_ids(&mut ids);
            Editor::new(doc, ids, settings)
        }
        None => Editor::seeded(settings),
    };

    let session = Session::new(editor, resume_id);
    let snapshot = session.snapshot(session_id);
    state.sessions.insert(session_id, session).await;
    Ok(Json(snapshot))
}

/// GET /api/v1/editor/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    state
        .sessions
        .with_session(id, |s| s.snapshot(id))
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(id))
}

/// POST /api/v1/editor/sessions/:id/edits
pub async fn handle_apply_edit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(edit): Json<Edit>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let now = Instant::now();
    state
        .sessions
        .with_session(id, |s| {
            s.editor.dispatch(&edit, now);
            s.snapshot(id)
        })
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(id))
}

/// POST /api/v1/editor/sessions/:id/undo
pub async fn handle_undo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let now = Instant::now();
    state
        .sessions
        .with_session(id, |s| {
            if !s.editor.undo(now) {
                info!("Session {id}: nothing to undo");
            }
            s.snapshot(id)
        })
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(id))
}

/// POST /api/v1/editor/sessions/:id/redo
pub async fn handle_redo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let now = Instant::now();
    state
        .sessions
        .with_session(id, |s| {
            if !s.editor.redo(now) {
                info!("Session {id}: nothing to redo");
            }
            s.snapshot(id)
        })
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(id))
}

/// POST /api/v1/editor/sessions/:id/clear
///
/// Starts over from a seeded document and removes the stored draft.
pub async fn handle_clear(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let now = Instant::now();
    let snapshot = state
        .sessions
        .with_session(id, |s| {
            s.editor.reset(now);
            s.snapshot(id)
        })
        .await
        .ok_or_else(|| session_not_found(id))?;
    state.drafts.clear(id).await?;
    Ok(Json(snapshot))
}

/// GET /api/v1/editor/sessions/:id/history
pub async fn handle_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, AppError> {
    state
        .sessions
        .with_session(id, |s| {
            let history = s.editor.history();
            HistoryResponse {
                cursor: history.cursor(),
                can_undo: s.editor.can_undo(),
                can_redo: s.editor.can_redo(),
                pending_edits: s.editor.pending_edits(),
                events: history.summaries(),
            }
        })
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(id))
}

/// DELETE /api/v1/editor/sessions/:id
///
/// Flushes pending history, writes a final draft and drops the session. The
/// session stays open when the draft cannot be written.
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    match state.sessions.close(id, &state.drafts).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(session_not_found(id)),
        Err(e) => {
            warn!("Failed to write final draft for session {id}; keeping it open: {e}");
            Err(e.into())
        }
    }
}

/// Current live document of a session, for handlers outside this module.
pub async fn live_document(
    state: &AppState,
    id: Uuid,
) -> Result<(Document, Option<Uuid>), AppError> {
    state
        .sessions
        .with_session(id, |s| (s.editor.document().clone(), s.resume_id))
        .await
        .ok_or_else(|| session_not_found(id))
}
