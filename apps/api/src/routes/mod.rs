pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::assist::handlers as assist;
use crate::export::handlers as export;
use crate::history::handlers as editor;
use crate::persistence::handlers as resumes;
use crate::state::AppState;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Editor sessions
        .route("/api/v1/editor/sessions", post(editor::handle_open_session))
        .route(
            "/api/v1/editor/sessions/:id",
            get(editor::handle_get_session).delete(editor::handle_close_session),
        )
        .route(
            "/api/v1/editor/sessions/:id/edits",
            post(editor::handle_apply_edit),
        )
        .route("/api/v1/editor/sessions/:id/undo", post(editor::handle_undo))
        .route("/api/v1/editor/sessions/:id/redo", post(editor::handle_redo))
        .route(
            "/api/v1/editor/sessions/:id/clear",
            post(editor::handle_clear),
        )
        .route(
            "/api/v1/editor/sessions/:id/history",
            get(editor::handle_history),
        )
        .route(
            "/api/v1/editor/sessions/:id/save",
            post(resumes::handle_save_session),
        )
        // Saved resumes
        .route(
            "/api/v1/resumes",
            get(resumes::handle_list_resumes).post(resumes::handle_create_resume),
        )
        .route(
            "/api/v1/resumes/:id",
            get(resumes::handle_get_resume)
                .put(resumes::handle_update_resume)
                .delete(resumes::handle_delete_resume),
        )
        .route(
            "/api/v1/resumes/:id/export",
            post(export::handle_export_saved),
        )
        // Export
        .route("/api/v1/export/pdf", post(export::handle_export_pdf))
        .route("/api/v1/export/latex", post(export::handle_export_latex))
        // AI assist
        .route("/api/v1/assist/rewrite", post(assist::handle_rewrite))
        .route(
            "/api/v1/assist/import",
            post(assist::handle_import).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .with_state(state)
}
