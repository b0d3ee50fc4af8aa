//! Public access to admin surveys through share tokens.

use crate::db;
use crate::domain::models::{Survey, SurveyDetail};
use crate::error::AppError;
use crate::tokens::generate_token;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ShareInfo {
    pub share_url: String,
    pub share_token: String,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareChange {
    Unchanged { token: String, is_public: bool },
    Write { token: String, is_public: bool },
}

/// Decides the next share state. A token is minted only when none exists and is
/// never replaced afterwards; a fresh token makes the survey public unless a
/// visibility was asked for.
pub fn plan_share(current_token: Option<&str>, current_public: bool, requested: Option<bool>) -> ShareChange {
    match (current_token, requested) {
        (None, requested) => ShareChange::Write {
            token: generate_token(),
            is_public: requested.unwrap_or(true),
        },
        (Some(token), Some(wanted)) if wanted != current_public => ShareChange::Write {
            token: token.to_string(),
            is_public: wanted,
        },
        (Some(token), _) => ShareChange::Unchanged {
            token: token.to_string(),
            is_public: current_public,
        },
    }
}

pub fn share_url(base_url: &str, token: &str) -> String {
    format!("{}/survey/public/{}", base_url.trim_end_matches('/'), token)
}

async fn apply_share(
    pool: &PgPool,
    base_url: &str,
    survey_id: Uuid,
    requested: Option<bool>,
) -> Result<ShareInfo, AppError> {
    let mut tx = pool.begin().await?;
    let survey = db::lock_survey(&mut tx, survey_id)
        .await?
        .ok_or(AppError::NotFound("survey"))?;

    let (token, is_public) = match plan_share(survey.share_token.as_deref(), survey.is_public, requested) {
        ShareChange::Unchanged { token, is_public } => (token, is_public),
        ShareChange::Write { token, is_public } => {
            let updated: Survey = db::set_share_state(&mut tx, survey_id, &token, is_public).await?;
            tracing::info!("Survey {} share state: public={}", updated.id, updated.is_public);
            (token, is_public)
        }
    };
    tx.commit().await?;

    Ok(ShareInfo {
        share_url: share_url(base_url, &token),
        share_token: token,
        is_public,
    })
}

/// Idempotent: repeated calls return the same token.
pub async fn issue_share_token(pool: &PgPool, base_url: &str, survey_id: Uuid) -> Result<ShareInfo, AppError> {
    apply_share(pool, base_url, survey_id, None).await
}

pub async fn toggle_visibility(
    pool: &PgPool,
    base_url: &str,
    survey_id: Uuid,
    is_public: bool,
) -> Result<ShareInfo, AppError> {
    apply_share(pool, base_url, survey_id, Some(is_public)).await
}

pub const NOT_SHARED: &str = "Survey is not publicly shared";

/// A shared survey is readable only while it is both public and active.
pub fn ensure_shareable(survey: &Survey) -> Result<(), AppError> {
    if !survey.is_public {
        return Err(AppError::Forbidden(NOT_SHARED));
    }
    if !survey.is_active {
        return Err(AppError::Forbidden(super::lifecycle::SURVEY_INACTIVE));
    }
    Ok(())
}

/// Loads a shared survey for anonymous respondents.
pub async fn resolve_share_token(pool: &PgPool, token: &str) -> Result<SurveyDetail, AppError> {
    let survey = db::find_survey_by_share_token(pool, token.trim())
        .await?
        .ok_or(AppError::NotFound("survey"))?;
    ensure_shareable(&survey)?;

    let mut conn = pool.acquire().await?;
    let questions = db::load_questions(&mut conn, survey.id).await?;
    Ok(SurveyDetail { survey, questions })
}
