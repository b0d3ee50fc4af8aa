//! Admin pages of the alumni survey: issue invitations, browse responses, export
//! the report, and maintain question sets. Mounted under `/app`.

use crate::db::alumni::{self as alumni_db, AlumniFilter, NewAlumniSurvey};
use crate::domain::models::{AlumniSurvey, QuestionSet, QuestionSetItem, QuestionType};
use crate::domain::scoring::{compute_max_score, satisfaction, Classification, Satisfaction};
use crate::domain::statistics::{classification_of, dashboard, DashboardStats, ReportLayout};
use crate::error::{AppError, FieldErrors};
use crate::export::{alumni_report, XLSX_CONTENT_TYPE};
use crate::services::lifecycle;
use crate::state::SharedState;
use crate::web::alumni::form_path;
use crate::web::session::AdminSession;
use crate::web::{ok, ok_message, ApiResponse, Page, Pagination};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PER_PAGE: i64 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexQuery {
    pub search: Option<String>,
    pub prodi: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AlumniRow {
    #[serde(flatten)]
    pub survey: AlumniSurvey,
    pub token: String,
    pub max_score: i64,
    pub classification: Classification,
    /// Only for completed responses.
    pub satisfaction: Option<Satisfaction>,
}

/// A freshly issued invitation, with the link the evaluator opens.
#[derive(Debug, Serialize)]
pub struct IssuedSurvey {
    #[serde(flatten)]
    pub survey: AlumniSurvey,
    pub token: String,
    pub form_path: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionSetOption {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct IndexPage {
    pub surveys: Vec<AlumniRow>,
    pub pagination: Pagination,
    pub question_sets: Vec<QuestionSetOption>,
    pub study_programs: Vec<String>,
    pub statistics: DashboardStats,
    pub search: String,
    pub prodi: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StorePayload {
    #[validate(length(min = 1, max = 255))]
    pub evaluator_name: String,
    #[validate(length(min = 1, max = 255))]
    pub company_name: String,
    #[validate(length(min = 1, max = 255))]
    pub company_level: String,
    #[validate(length(min = 1, max = 255))]
    pub evaluator_position: String,
    #[validate(length(min = 1, max = 255))]
    pub alumni_name: String,
    #[validate(length(min = 1, max = 50))]
    pub alumni_nim: String,
    pub alumni_photo: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub study_program: String,
    #[validate(length(min = 1))]
    pub graduation_year: String,
    #[validate(length(min = 1))]
    pub work_period: String,
    pub question_set_id: Uuid,
}

impl From<StorePayload> for NewAlumniSurvey {
    fn from(p: StorePayload) -> Self {
        NewAlumniSurvey {
            evaluator_name: p.evaluator_name.trim().to_string(),
            company_name: p.company_name.trim().to_string(),
            company_level: p.company_level.trim().to_string(),
            evaluator_position: p.evaluator_position.trim().to_string(),
            alumni_name: p.alumni_name.trim().to_string(),
            alumni_nim: p.alumni_nim.trim().to_string(),
            alumni_photo: p.alumni_photo.filter(|path| !path.trim().is_empty()),
            study_program: p.study_program.trim().to_string(),
            graduation_year: p.graduation_year.trim().to_string(),
            work_period: p.work_period.trim().to_string(),
            question_set_id: p.question_set_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeletePayload {
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub question_set: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuestionSetPayload {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, message = "At least one question is required."))]
    pub questions: Vec<QuestionSetItem>,
    #[serde(default)]
    pub is_published: bool,
}

impl QuestionSetPayload {
    /// Alumni questionnaires only carry scale and free-text items.
    fn items(&self) -> Result<Vec<QuestionSetItem>, AppError> {
        self.validate()?;
        let mut errors = FieldErrors::new();
        for (idx, item) in self.questions.iter().enumerate() {
            if item.text.trim().is_empty() {
                errors.add(format!("questions.{idx}.text"), "The question text is required.");
            }
            if !matches!(item.question_type, QuestionType::Scale | QuestionType::Text) {
                errors.add(format!("questions.{idx}.type"), "Only skala and teks questions are allowed.");
            }
        }
        errors.into_result()?;
        Ok(self
            .questions
            .iter()
            .map(|item| QuestionSetItem {
                text: item.text.trim().to_string(),
                question_type: item.question_type,
                required: item.required,
            })
            .collect())
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/user-survey", get(index))
        .route("/user-survey/store", post(store))
        .route("/user-survey/delete", post(destroy))
        .route("/user-survey/export", get(export))
        .route("/question-sets", get(list_question_sets).post(create_question_set))
        .with_state(state)
}

fn max_scores(sets: &[QuestionSet]) -> HashMap<Uuid, i64> {
    sets.iter()
        .map(|set| {
            let max = compute_max_score(set.items().iter().map(|i| i.question_type));
            (set.id, max)
        })
        .collect()
}

fn to_row(survey: AlumniSurvey, max_scores: &HashMap<Uuid, i64>) -> AlumniRow {
    let max_score = max_scores.get(&survey.question_set_id).copied().unwrap_or(0);
    let satisfaction = survey
        .status
        .is_completed()
        .then(|| satisfaction(survey.total_score, max_score));
    AlumniRow {
        token: survey.token.clone(),
        classification: classification_of(&survey),
        max_score,
        satisfaction,
        survey,
    }
}

async fn index(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<ApiResponse<IndexPage>>, AppError> {
    let page = Page::new(query.page, query.per_page, DEFAULT_PER_PAGE);
    let prodi = query.prodi.unwrap_or_else(|| "all".to_string());
    let filter = AlumniFilter {
        search: query.search.clone(),
        study_program: (prodi != "all").then(|| prodi.clone()),
    };

    let sets = alumni_db::list_question_sets(&state.pool, false).await?;
    let maxima = max_scores(&sets);

    let (rows, total) = alumni_db::list_alumni(&state.pool, &filter, page.limit(), page.offset()).await?;
    let everything = alumni_db::all_alumni(&state.pool).await?;
    let statistics = dashboard(
        everything
            .iter()
            .map(|s| (s, maxima.get(&s.question_set_id).copied().unwrap_or(0))),
    );

    Ok(ok(IndexPage {
        surveys: rows.into_iter().map(|s| to_row(s, &maxima)).collect(),
        pagination: page.pagination(total),
        question_sets: sets
            .into_iter()
            .filter(|s| s.is_published)
            .map(|s| QuestionSetOption { id: s.id, title: s.title })
            .collect(),
        study_programs: alumni_db::study_programs(&state.pool).await?,
        statistics,
        search: query.search.unwrap_or_default(),
        prodi,
    }))
}

async fn store(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Json(payload): Json<StorePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let survey = lifecycle::create_alumni_response(&state.pool, &admin, &payload.into()).await?;
    let issued = IssuedSurvey {
        token: survey.token.clone(),
        form_path: form_path(&survey.token),
        survey,
    };
    Ok((StatusCode::CREATED, ok_message("Survey berhasil dibuat.", issued)))
}

async fn destroy(
    AdminSession(admin): AdminSession,
    State(state): State<SharedState>,
    Json(payload): Json<DeletePayload>,
) -> Result<impl IntoResponse, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::Validation(FieldErrors::single("ids", "The ids field is required.")));
    }
    let deleted = alumni_db::delete_alumni(&state.pool, &payload.ids).await?;
    tracing::info!("{} alumni surveys deleted by {}", deleted, admin.admin_id);
    Ok(ok_message("Data survey berhasil dihapus.", serde_json::json!({ "deleted": deleted })))
}

async fn export(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let mut responses = alumni_db::all_alumni(&state.pool).await?;
    let layout = match query.question_set {
        Some(id) => {
            let set = alumni_db::find_question_set(&state.pool, id)
                .await?
                .ok_or(AppError::NotFound("question set"))?;
            responses.retain(|r| r.question_set_id == id);
            ReportLayout::from_question_set(set.items())
        }
        None => ReportLayout::default_alumni(),
    };

    let bytes = alumni_report::format_spreadsheet(&layout, &responses)?;
    let disposition = format!("attachment; filename=\"{}\"", alumni_report::filename(Utc::now()));
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, "max-age=0".to_string()),
        ],
        bytes,
    )
        .into_response())
}

async fn list_question_sets(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let sets = alumni_db::list_question_sets(&state.pool, false).await?;
    Ok(ok(sets))
}

async fn create_question_set(
    AdminSession(_admin): AdminSession,
    State(state): State<SharedState>,
    Json(payload): Json<QuestionSetPayload>,
) -> Result<impl IntoResponse, AppError> {
    let items = payload.items()?;
    let set = alumni_db::insert_question_set(&state.pool, payload.title.trim(), items, payload.is_published).await?;
    tracing::info!("Question set {} created", set.id);
    Ok((StatusCode::CREATED, ok_message("Soal berhasil disimpan.", set)))
}
