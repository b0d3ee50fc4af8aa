//! Response lifecycle: issue a pending response, resolve it by token, and lock it
//! on submission. Every state change happens inside one transaction.

use crate::db::{self, alumni::NewAlumniSurvey, Respondent};
use crate::domain::answers::{validate_positional, validate_submission, PositionalAnswer, SubmittedAnswer};
use crate::domain::models::{
    AdminContext, AlumniSurvey, Answer, QuestionSet, ResponseItem, ResponseStatus, ResponseWithItems, Survey,
};
use crate::domain::scoring::compute_score;
use crate::error::{AppError, FieldErrors};
use crate::tokens::{generate_token, looks_like_token};
use sqlx::PgPool;
use uuid::Uuid;

pub const ALREADY_COMPLETED: &str = "This survey has already been completed";
pub const SURVEY_INACTIVE: &str = "Survey is not active";

/// Only pending responses accept answers.
pub fn ensure_pending(status: ResponseStatus) -> Result<(), AppError> {
    match status {
        ResponseStatus::Pending => Ok(()),
        ResponseStatus::Completed => Err(AppError::AlreadyCompleted(ALREADY_COMPLETED)),
    }
}

pub fn ensure_accepting(survey: &Survey) -> Result<(), AppError> {
    if survey.is_active {
        Ok(())
    } else {
        Err(AppError::Forbidden(SURVEY_INACTIVE))
    }
}

/// Creates a pending alumni response with a fresh token, stamped with the issuing admin.
pub async fn create_alumni_response(
    pool: &PgPool,
    admin: &AdminContext,
    new: &NewAlumniSurvey,
) -> Result<AlumniSurvey, AppError> {
    let set = db::alumni::find_question_set(pool, new.question_set_id)
        .await?
        .ok_or(AppError::NotFound("question set"))?;
    if !set.is_published {
        return Err(AppError::Validation(FieldErrors::single(
            "question_set_id",
            "The selected question set is not published.",
        )));
    }

    let token = generate_token();
    let survey = db::alumni::insert_alumni_survey(pool, new, &token, &admin.name).await?;
    tracing::info!(
        "Alumni survey {} issued by {} for {}",
        survey.id,
        admin.admin_id,
        survey.alumni_nim
    );
    Ok(survey)
}

/// Looks up a pending response. Unknown and malformed tokens are `NotFound`.
pub async fn resolve_by_token(pool: &PgPool, token: &str) -> Result<AlumniSurvey, AppError> {
    let token = token.trim();
    if !looks_like_token(token) {
        return Err(AppError::NotFound("survey"));
    }
    let survey = db::alumni::find_by_token(pool, token)
        .await?
        .ok_or(AppError::NotFound("survey"))?;
    ensure_pending(survey.status)?;
    Ok(survey)
}

/// Pending response plus the questionnaire it must be answered against.
pub async fn load_form(pool: &PgPool, token: &str) -> Result<(AlumniSurvey, QuestionSet), AppError> {
    let survey = resolve_by_token(pool, token).await?;
    let set = db::alumni::find_question_set(pool, survey.question_set_id)
        .await?
        .ok_or(AppError::NotFound("question set"))?;
    Ok((survey, set))
}

/// Validates and locks an alumni response. Of two racing submissions for one token,
/// the second waits on the row lock and then sees `AlreadyCompleted`.
pub async fn submit_by_token(
    pool: &PgPool,
    token: &str,
    answers: &[PositionalAnswer],
) -> Result<AlumniSurvey, AppError> {
    let token = token.trim();
    if !looks_like_token(token) {
        return Err(AppError::NotFound("survey"));
    }

    let mut tx = pool.begin().await?;

    let survey = db::alumni::lock_by_token(&mut tx, token)
        .await?
        .ok_or(AppError::NotFound("survey"))?;
    ensure_pending(survey.status)?;

    let set = db::alumni::find_question_set(&mut *tx, survey.question_set_id)
        .await?
        .ok_or(AppError::NotFound("question set"))?;

    let accepted = validate_positional(set.items(), answers).map_err(AppError::Validation)?;
    let score = compute_score(accepted.iter().map(|a| &a.answer));

    let completed = db::alumni::complete(&mut tx, survey.id, accepted, score)
        .await?
        .ok_or(AppError::AlreadyCompleted(ALREADY_COMPLETED))?;

    tx.commit().await?;
    tracing::info!("Alumni survey {} completed with score {}", completed.id, score);
    Ok(completed)
}

/// Records a completed response to an admin survey. Validation, the response row,
/// and its items all land in one transaction or not at all.
pub async fn submit_survey_response(
    pool: &PgPool,
    survey_id: Uuid,
    respondent: &Respondent,
    answers: &[SubmittedAnswer],
) -> Result<ResponseWithItems, AppError> {
    let mut tx = pool.begin().await?;

    let survey = db::find_survey(&mut *tx, survey_id)
        .await?
        .ok_or(AppError::NotFound("survey"))?;
    ensure_accepting(&survey)?;

    let questions = db::load_questions(&mut tx, survey_id).await?;
    let accepted = validate_submission(&questions, answers).map_err(AppError::Validation)?;
    let score = compute_score(accepted.iter().map(|a| &a.answer));

    let response = db::insert_completed_response(&mut tx, survey_id, respondent, score).await?;

    let mut items: Vec<ResponseItem> = Vec::with_capacity(accepted.len());
    for answered in &accepted {
        let (option_id, value) = match &answered.answer {
            Answer::Choice { option_id } => (Some(*option_id), None),
            Answer::Scale { value } => (None, Some(value.to_string())),
            Answer::Text { value } => (None, Some(value.clone())),
        };
        let item =
            db::insert_response_item(&mut tx, response.id, answered.question, option_id, value.as_deref()).await?;
        items.push(item);
    }

    tx.commit().await?;
    tracing::info!(
        "Response {} recorded for survey {} ({} answers)",
        response.id,
        survey_id,
        items.len()
    );
    Ok(ResponseWithItems { response, items })
}
