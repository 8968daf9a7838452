use aws_sdk_s3::primitives::ByteStream;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::document::Document;
use crate::errors::AppError;
use crate::export::compiler::{CompileError, PdfCompiler};
use crate::export::latex::{render_latex, ExportOptions};
use crate::persistence::repository;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ExportRequest {
    pub document: Document,
    #[serde(default)]
    pub options: ExportOptions,
}

#[derive(Serialize)]
pub struct LatexResponse {
    pub latex: String,
}

#[derive(Deserialize)]
pub struct SavedExportQuery {
    pub user_id: Uuid,
}

#[derive(Default, Deserialize)]
pub struct SavedExportRequest {
    #[serde(default)]
    pub options: ExportOptions,
}

/// Download name derived from the person's name.
fn pdf_filename(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "resume.pdf".to_string()
    } else {
        format!("{stem}_resume.pdf")
    }
}

fn pdf_response(pdf: Bytes, name: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", pdf_filename(name)),
            ),
        ],
        pdf,
    )
        .into_response()
}

/// Renders and compiles in one step.
pub async fn export_pdf(
    compiler: &dyn PdfCompiler,
    document: &Document,
    options: &ExportOptions,
) -> Result<Bytes, CompileError> {
    let latex = render_latex(document, options);
    compiler.compile(&latex).await
}

/// POST /api/v1/export/latex
pub async fn handle_export_latex(
    Json(req): Json<ExportRequest>,
) -> Result<Json<LatexResponse>, AppError> {
    Ok(Json(LatexResponse {
        latex: render_latex(&req.document, &req.options),
    }))
}

/// POST /api/v1/export/pdf
pub async fn handle_export_pdf(
    State(state): State<AppState>,
    Json(req): Json<ExportRequest>,
) -> Result<Response, AppError> {
    let pdf = export_pdf(state.compiler.as_ref(), &req.document, &req.options).await?;
    Ok(pdf_response(pdf, &req.document.name))
}

/// POST /api/v1/resumes/:id/export
///
/// Renders a saved resume, records the LaTeX source on the record and keeps
/// a copy of the PDF in object storage.
pub async fn handle_export_saved(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<SavedExportQuery>,
    body: Option<Json<SavedExportRequest>>,
) -> Result<Response, AppError> {
    let options = body.map(|Json(b)| b.options).unwrap_or_default();
    let row = repository::get_resume(&state.db, id, params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;

    let document = row.content.0;
    let latex = render_latex(&document, &options);
    repository::store_latex(&state.db, id, params.user_id, &latex).await?;

    let pdf = state.compiler.compile(&latex).await?;
    archive_pdf(&state, params.user_id, id, pdf.clone()).await;
    Ok(pdf_response(pdf, &document.name))
}

/// Uploads the PDF next to the record. Failures are logged only; the caller
/// already has the PDF.
async fn archive_pdf(state: &AppState, user_id: Uuid, resume_id: Uuid, pdf: Bytes) {
    let s3_key = format!("resumes/{user_id}/{resume_id}.pdf");
    let result = state
        .s3
        .put_object()
        .bucket(&state.config.s3_bucket)
        .key(&s3_key)
        .body(ByteStream::from(pdf))
        .content_type("application/pdf")
        .send()
        .await;

    match result {
        Ok(_) => info!(
            "Archived resume PDF to s3://{}/{}",
            state.config.s3_bucket, s3_key
        ),
        Err(e) => warn!("S3 archive of {s3_key} failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Records the source it was given; fails when `log` is set.
    #[derive(Default)]
    struct FakeCompiler {
        sources: Mutex<Vec<String>>,
        log: Option<String>,
    }

    #[async_trait]
    impl PdfCompiler for FakeCompiler {
        async fn compile(&self, source: &str) -> Result<Bytes, CompileError> {
            self.sources.lock().unwrap().push(source.to_string());
            match &self.log {
                Some(log) => Err(CompileError::Failed {
                    exit_code: Some(1),
                    log_tail: log.clone(),
                }),
                None => Ok(Bytes::from_static(b"%PDF-1.5 fake")),
            }
        }
    }

    #[tokio::test]
    async fn test_export_pdf_compiles_rendered_source() {
        let compiler = FakeCompiler::default();
        let document: Document = serde_json::from_str(r#"{"name": "Ada & Co"}"#).unwrap();
        let pdf = export_pdf(&compiler, &document, &ExportOptions::default())
            .await
            .unwrap();

        assert!(pdf.starts_with(b"%PDF-"));
        let sources = compiler.sources.lock().unwrap();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].contains(r"Ada \& Co"));
    }

    #[tokio::test]
    async fn test_export_pdf_failure_becomes_unprocessable() {
        let compiler = FakeCompiler {
            log: Some("! LaTeX Error: File `fontawesome5.sty' not found.".to_string()),
            ..Default::default()
        };
        let err = export_pdf(&compiler, &Document::default(), &ExportOptions::default())
            .await
            .unwrap_err();
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_pdf_filename_from_name() {
        assert_eq!(pdf_filename("Ada Lovelace"), "Ada_Lovelace_resume.pdf");
        assert_eq!(pdf_filename("  "), "resume.pdf");
        assert_eq!(pdf_filename("\"quoted\""), "quoted_resume.pdf");
    }

    #[test]
    fn test_export_request_defaults_options() {
        let req: ExportRequest = serde_json::from_str(r#"{"document": {"name": "Ada"}}"#).unwrap();
        assert_eq!(req.options, ExportOptions::default());
        assert_eq!(req.document.name, "Ada");
    }

    #[test]
    fn test_pdf_response_headers() {
        let response = pdf_response(Bytes::from_static(b"%PDF-1.5"), "Ada");
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Ada_resume.pdf\""
        );
    }
}
