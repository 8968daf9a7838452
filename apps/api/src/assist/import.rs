//! PDF import: uploaded resume → structured `Document`.
//!
//! Text is pulled out of the PDF locally and handed to the model for
//! structuring. Import never fails once the upload itself is acceptable: any
//! extraction, model or parse problem yields a seeded document with
//! `fallback` set.

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::assist::prompts::{build_import_prompt, import_system};
use crate::document::{Document, IdGenerator};
use crate::errors::AppError;
use crate::llm_client::{parse_lenient_json, LlmError, TextGenerator};

const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Serialize)]
pub struct ImportOutcome {
    pub document: Document,
    /// True when the document is the seeded default rather than parsed content.
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("text extraction failed: {0}")]
    Extract(String),

    #[error("no text found in PDF")]
    NoText,

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("model returned an empty document")]
    EmptyDocument,
}

/// Checks an upload before anything expensive happens to it.
pub fn validate_upload(
    filename: Option<&str>,
    content_type: Option<&str>,
    data: &[u8],
    max_bytes: usize,
) -> Result<(), AppError> {
    if data.is_empty() {
        return Err(AppError::Validation("uploaded file is empty".to_string()));
    }
    if data.len() > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "file is {} bytes; the limit is {max_bytes}",
            data.len()
        )));
    }

    let named_pdf = filename
        .map(|f| f.to_ascii_lowercase().ends_with(".pdf"))
        .unwrap_or(false);
    let typed_pdf = content_type
        .map(|ct| ct.eq_ignore_ascii_case(PDF_CONTENT_TYPE))
        .unwrap_or(false);
    if !named_pdf && !typed_pdf {
        return Err(AppError::UnsupportedMediaType(
            "only PDF files can be imported".to_string(),
        ));
    }
    if !data.starts_with(PDF_MAGIC) {
        return Err(AppError::UnsupportedMediaType(
            "file does not look like a PDF".to_string(),
        ));
    }
    Ok(())
}

/// Imports a validated PDF. Always returns a document.
pub async fn parse_pdf(
    llm: &dyn TextGenerator,
    data: Bytes,
    ids: &mut IdGenerator,
) -> ImportOutcome {
    match extract_text(data).await {
        Ok(text) => import_text(llm, &text, ids).await,
        Err(e) => fallback(e, ids),
    }
}

/// Structures already-extracted resume text. Always returns a document.
pub async fn import_text(
    llm: &dyn TextGenerator,
    text: &str,
    ids: &mut IdGenerator,
) -> ImportOutcome {
    match document_from_text(llm, text, ids).await {
        Ok(document) => ImportOutcome {
            document,
            fallback: false,
            reason: None,
        },
        Err(e) => fallback(e, ids),
    }
}

fn fallback(e: ImportError, ids: &mut IdGenerator) -> ImportOutcome {
    warn!("PDF import fell back to a seeded document: {e}");
    ImportOutcome {
        document: Document::seeded(ids),
        fallback: true,
        reason: Some(e.to_string()),
    }
}

async fn extract_text(data: Bytes) -> Result<String, ImportError> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
        .await
        .map_err(|e| ImportError::Extract(e.to_string()))?
        .map_err(|e| ImportError::Extract(e.to_string()))?;

    if text.trim().is_empty() {
        return Err(ImportError::NoText);
    }
    info!("Extracted {} chars of text from PDF", text.len());
    Ok(text)
}

/// Structures plain resume text with the model and gives every item an id.
async fn document_from_text(
    llm: &dyn TextGenerator,
    text: &str,
    ids: &mut IdGenerator,
) -> Result<Document, ImportError> {
    let raw = llm
        .generate(&build_import_prompt(text), &import_system())
        .await?;
    let mut document: Document = parse_lenient_json(&raw)?;
    if document == Document::default() {
        return Err(ImportError::EmptyDocument);
    }

    document.assign_missing_ids(ids);
    Ok(document)
}
