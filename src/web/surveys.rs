use crate::db::{self, QuestionFields, Respondent, SurveyFields};
use crate::domain::answers::SubmittedAnswer;
use crate::domain::models::{QuestionType, QuestionWithOptions, SurveyDetail};
use crate::domain::reconcile::SubmittedOption;
use crate::domain::statistics::{aggregate_statistics, StatisticsReport};
use crate::error::{AppError, FieldErrors};
use crate::export::{survey_csv, CSV_CONTENT_TYPE};
use crate::services::{gateway, lifecycle, questionnaire};
use crate::state::SharedState;
use crate::web::session::AdminSession;
use crate::web::{limited, ok, ok_message, paginated, ApiResponse, Page};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PER_PAGE: i64 = 15;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct SurveyPayload {
    #[validate(length(max = 255))]
    pub label: Option<String>,
    #[validate(length(min = 1, max = 255, message = "The title field is required and must not exceed 255 characters."))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[validate(length(max = 255))]
    pub kepada: Option<String>,
    #[validate(length(max = 255))]
    pub dari: Option<String>,
}

impl SurveyPayload {
    fn into_fields(self, default_dari: &str) -> SurveyFields {
        SurveyFields {
            label: self.label,
            title: self.title.trim().to_string(),
            description: self.description,
            is_active: self.is_active,
            kepada: self.kepada,
            dari: self.dari.or_else(|| Some(default_dari.to_string())),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuestionPayload {
    #[validate(length(max = 255))]
    pub label: Option<String>,
    #[validate(length(min = 1, message = "The question field is required."))]
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: String,
    #[serde(default)]
    pub required: bool,
    pub order: Option<i32>,
    pub options: Option<Vec<SubmittedOption>>,
}

impl QuestionPayload {
    fn fields(&self) -> Result<QuestionFields, AppError> {
        self.validate()?;
        let question_type = QuestionType::try_from(self.question_type.as_str()).map_err(|_| {
            AppError::Validation(FieldErrors::single("type", "The selected type is invalid."))
        })?;
        Ok(QuestionFields {
            label: self.label.clone(),
            question: self.question.trim().to_string(),
            question_type,
            required: self.required,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitPayload {
    #[validate(length(max = 255))]
    pub respondent_name: Option<String>,
    #[validate(email, length(max = 255))]
    pub respondent_email: Option<String>,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct SharePayload {
    pub is_public: Option<bool>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/surveys", get(list_surveys).post(create_survey))
        .route("/surveys/:id", get(show_survey).put(update_survey).delete(delete_survey))
        .route("/surveys/:id/questions", post(add_question))
        .route("/questions/:id", put(update_question).delete(delete_question))
        .route(
            "/surveys/:id/responses",
            get(list_responses).merge(limited(&state, post(submit_response))),
        )
        .route("/surveys/:id/statistics", get(statistics))
        .route("/surveys/:id/export", get(export_csv))
        .route("/surveys/:id/share", post(share))
        .route("/surveys/public/:token", limited(&state, get(show_public)))
        // Target of the issued share URL.
        .route("/survey/public/:token", limited(&state, get(show_public)))
        .with_state(state)
}

async fn list_surveys(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::new(query.page, query.per_page, DEFAULT_PER_PAGE);
    let (rows, total) = db::list_surveys(&state.pool, query.q.as_deref(), page.limit(), page.offset()).await?;
    Ok(paginated(rows, page.pagination(total)))
}

async fn create_survey(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Json(payload): Json<SurveyPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let fields = payload.into_fields(&admin.name);
    let survey = db::insert_survey(&state.pool, &fields, admin.admin_id).await?;
    tracing::info!("Survey {} created by {}", survey.id, admin.admin_id);
    Ok((StatusCode::CREATED, ok_message("Survey created successfully", survey)))
}

async fn show_survey(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SurveyDetail>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let detail = db::survey_detail(&mut conn, id)
        .await?
        .ok_or(AppError::NotFound("survey"))?;
    Ok(ok(detail))
}

async fn update_survey(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SurveyPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let fields = payload.into_fields(&admin.name);
    let survey = db::update_survey(&state.pool, id, &fields)
        .await?
        .ok_or(AppError::NotFound("survey"))?;
    Ok(ok_message("Survey updated successfully", survey))
}

async fn delete_survey(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    questionnaire::delete_survey(&state.pool, id).await?;
    Ok(ok_message("Survey deleted successfully", Value::Null))
}

async fn add_question(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Path(survey_id): Path<Uuid>,
    Json(payload): Json<QuestionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let fields = payload.fields()?;
    let options = payload.options.unwrap_or_default();
    let question: QuestionWithOptions =
        questionnaire::add_question(&state.pool, survey_id, &fields, payload.order, &options).await?;
    Ok((StatusCode::CREATED, ok_message("Question added successfully", question)))
}

async fn update_question(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Path(question_id): Path<Uuid>,
    Json(payload): Json<QuestionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let fields = payload.fields()?;
    let question = questionnaire::update_question(
        &state.pool,
        question_id,
        &fields,
        payload.order,
        payload.options.as_deref(),
    )
    .await?;
    Ok(ok_message("Question updated successfully", question))
}

async fn delete_question(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Path(question_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    questionnaire::delete_question(&state.pool, question_id).await?;
    Ok(ok_message("Question deleted successfully", Value::Null))
}

/// Public. A signed-in admin is recorded as the respondent's user.
async fn submit_response(
    admin: Option<AdminSession>,
    State(state): State<SharedState>,
    Path(survey_id): Path<Uuid>,
    Json(payload): Json<SubmitPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let respondent = Respondent {
        user_id: admin.map(|AdminSession(a)| a.admin_id),
        name: payload.respondent_name,
        email: payload.respondent_email,
    };
    let response =
        lifecycle::submit_survey_response(&state.pool, survey_id, &respondent, &payload.answers).await?;
    Ok((StatusCode::CREATED, ok_message("Response submitted successfully", response)))
}

async fn list_responses(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Path(survey_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::new(query.page, query.per_page, DEFAULT_PER_PAGE);
    let mut conn = state.pool.acquire().await?;
    db::find_survey(&mut *conn, survey_id)
        .await?
        .ok_or(AppError::NotFound("survey"))?;
    let (rows, total) = db::list_responses(&mut conn, survey_id, page.limit(), page.offset()).await?;
    Ok(paginated(rows, page.pagination(total)))
}

async fn statistics(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Path(survey_id): Path<Uuid>,
) -> Result<Json<ApiResponse<StatisticsReport>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let detail = db::survey_detail(&mut conn, survey_id)
        .await?
        .ok_or(AppError::NotFound("survey"))?;
    let responses = db::completed_responses(&mut conn, survey_id).await?;
    Ok(ok(aggregate_statistics(&detail, &responses)))
}

async fn export_csv(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Path(survey_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let mut conn = state.pool.acquire().await?;
    let detail = db::survey_detail(&mut conn, survey_id)
        .await?
        .ok_or(AppError::NotFound("survey"))?;
    let bytes = survey_csv::format_csv(&detail)?;
    let disposition = format!("attachment; filename=\"{}\"", survey_csv::filename(survey_id));
    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        bytes,
    )
        .into_response())
}

async fn share(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Path(survey_id): Path<Uuid>,
    payload: Option<Json<SharePayload>>,
) -> Result<impl IntoResponse, AppError> {
    let requested = payload.and_then(|Json(p)| p.is_public);
    let info = match requested {
        Some(is_public) => gateway::toggle_visibility(&state.pool, &state.public_base_url, survey_id, is_public).await?,
        None => gateway::issue_share_token(&state.pool, &state.public_base_url, survey_id).await?,
    };
    Ok(ok(info))
}

async fn show_public(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<SurveyDetail>>, AppError> {
    let detail = gateway::resolve_share_token(&state.pool, &token).await?;
    Ok(ok(detail))
}
