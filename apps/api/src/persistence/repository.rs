//! Remote document store: saved resumes in PostgreSQL.
//!
//! Every query is scoped by the owning user id; a resume that exists but
//! belongs to someone else behaves exactly like a missing one.

use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::document::Document;
use crate::models::resume::{ResumeRow, ResumeSummaryRow};

pub struct NewResume<'a> {
    pub user_id: Uuid,
    pub title: &'a str,
    pub template_id: &'a str,
    pub content: &'a Document,
}

/// Fields left as `None` keep their stored value.
#[derive(Default)]
pub struct ResumeChanges<'a> {
    pub title: Option<&'a str>,
    pub template_id: Option<&'a str>,
    pub content: Option<&'a Document>,
}

pub async fn create_resume(pool: &PgPool, new: NewResume<'_>) -> Result<ResumeRow, sqlx::Error> {
    let row = sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes (user_id, title, template_id, content)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(new.user_id)
    .bind(new.title)
    .bind(new.template_id)
    .bind(Json(new.content))
    .fetch_one(pool)
    .await?;

    info!("Created resume {} for user {}", row.id, row.user_id);
    Ok(row)
}

pub async fn get_resume(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<ResumeRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Most recently updated first.
pub async fn list_resumes(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ResumeSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeSummaryRow>(
        r#"
        SELECT id, template_id, title, created_at, updated_at
        FROM resumes
        WHERE user_id = $1
        ORDER BY updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn update_resume(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    changes: ResumeChanges<'_>,
) -> Result<Option<ResumeRow>, sqlx::Error> {
    let row = sqlx::query_as::<_, ResumeRow>(
        r#"
        UPDATE resumes
        SET title = COALESCE($3, title),
            template_id = COALESCE($4, template_id),
            content = COALESCE($5, content),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(changes.title)
    .bind(changes.template_id)
    .bind(changes.content.map(Json))
    .fetch_optional(pool)
    .await?;

    if row.is_some() {
        info!("Updated resume {id} for user {user_id}");
    }
    Ok(row)
}

/// Stores the LaTeX source last rendered for a resume. Returns `false` when
/// the resume does not exist for this user.
pub async fn store_latex(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    latex: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE resumes SET latex_content = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .bind(latex)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_resume(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM resumes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
        info!("Deleted resume {id} for user {user_id}");
    }
    Ok(deleted)
}
