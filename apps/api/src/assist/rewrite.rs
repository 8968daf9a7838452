use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assist::prompts::{build_rewrite_prompt, rewrite_system};
use crate::errors::AppError;
use crate::llm_client::{parse_lenient_json, TextGenerator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewrittenBullet {
    pub bullet: String,
}

/// Asks the model for a stronger version of one bullet point.
pub async fn rewrite_bullet(
    llm: &dyn TextGenerator,
    bullet: &str,
    job_description: Option<&str>,
) -> Result<RewrittenBullet, AppError> {
    let bullet = bullet.trim();
    if bullet.is_empty() {
        return Err(AppError::Validation("bullet cannot be empty".to_string()));
    }

    let prompt = build_rewrite_prompt(bullet, job_description);
    let raw = llm
        .generate(&prompt, &rewrite_system())
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    let rewritten: RewrittenBullet = parse_lenient_json(&raw).map_err(|e| {
        warn!("Unusable rewrite output: {e}");
        AppError::Llm(e.to_string())
    })?;

    let text = rewritten.bullet.trim();
    if text.is_empty() {
        return Err(AppError::Llm("model returned an empty bullet".to_string()));
    }

    info!(
        "Rewrote bullet ({} → {} chars)",
        bullet.chars().count(),
        text.chars().count()
    );
    Ok(RewrittenBullet {
        bullet: text.to_string(),
    })
}
