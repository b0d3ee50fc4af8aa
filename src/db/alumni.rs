use crate::domain::models::{AlumniAnswer, AlumniSurvey, QuestionSet, QuestionSetItem};
use anyhow::Result;
use sqlx::types::Json;
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

const ALUMNI_COLUMNS: &str = r#"
    id, evaluator_name, company_name, company_level, evaluator_position, alumni_name,
    alumni_nim, alumni_photo, study_program, graduation_year, work_period, created_by,
    question_set_id, token, status, answers, total_score, submitted_at, created_at, updated_at
"#;

const QUESTION_SET_COLUMNS: &str = "id, title, questions, is_published, created_at, updated_at";

/// Invitee metadata captured when an administrator issues a survey link.
#[derive(Debug, Clone)]
pub struct NewAlumniSurvey {
    pub evaluator_name: String,
    pub company_name: String,
    pub company_level: String,
    pub evaluator_position: String,
    pub alumni_name: String,
    pub alumni_nim: String,
    pub alumni_photo: Option<String>,
    pub study_program: String,
    pub graduation_year: String,
    pub work_period: String,
    pub question_set_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct AlumniFilter {
    pub search: Option<String>,
    pub study_program: Option<String>,
}

// ---------------------------------------------------------------------------
// Question sets
// ---------------------------------------------------------------------------

pub async fn insert_question_set(
    pool: &PgPool,
    title: &str,
    items: Vec<QuestionSetItem>,
    is_published: bool,
) -> Result<QuestionSet> {
    let set = sqlx::query_as::<_, QuestionSet>(&format!(
        r#"
        INSERT INTO question_sets (id, title, questions, is_published)
        VALUES ($1, $2, $3, $4)
        RETURNING {QUESTION_SET_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(title)
    .bind(Json(items))
    .bind(is_published)
    .fetch_one(pool)
    .await?;
    Ok(set)
}

pub async fn list_question_sets(pool: &PgPool, published_only: bool) -> Result<Vec<QuestionSet>> {
    let sets = sqlx::query_as::<_, QuestionSet>(&format!(
        r#"
        SELECT {QUESTION_SET_COLUMNS}
        FROM question_sets
        WHERE NOT $1 OR is_published
        ORDER BY created_at DESC
        "#
    ))
    .bind(published_only)
    .fetch_all(pool)
    .await?;
    Ok(sets)
}

pub async fn find_question_set<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<QuestionSet>> {
    let set = sqlx::query_as::<_, QuestionSet>(&format!(
        "SELECT {QUESTION_SET_COLUMNS} FROM question_sets WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(set)
}

// ---------------------------------------------------------------------------
// Alumni responses
// ---------------------------------------------------------------------------

pub async fn insert_alumni_survey(
    pool: &PgPool,
    new: &NewAlumniSurvey,
    token: &str,
    created_by: &str,
) -> Result<AlumniSurvey> {
    let survey = sqlx::query_as::<_, AlumniSurvey>(&format!(
        r#"
        INSERT INTO alumni_surveys (
            id, evaluator_name, company_name, company_level, evaluator_position, alumni_name,
            alumni_nim, alumni_photo, study_program, graduation_year, work_period, created_by,
            question_set_id, token, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, 'pending')
        RETURNING {ALUMNI_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&new.evaluator_name)
    .bind(&new.company_name)
    .bind(&new.company_level)
    .bind(&new.evaluator_position)
    .bind(&new.alumni_name)
    .bind(&new.alumni_nim)
    .bind(&new.alumni_photo)
    .bind(&new.study_program)
    .bind(&new.graduation_year)
    .bind(&new.work_period)
    .bind(created_by)
    .bind(new.question_set_id)
    .bind(token)
    .fetch_one(pool)
    .await?;
    Ok(survey)
}

pub async fn find_by_token<'e>(db: impl PgExecutor<'e>, token: &str) -> Result<Option<AlumniSurvey>> {
    let survey = sqlx::query_as::<_, AlumniSurvey>(&format!(
        "SELECT {ALUMNI_COLUMNS} FROM alumni_surveys WHERE token = $1"
    ))
    .bind(token)
    .fetch_optional(db)
    .await?;
    Ok(survey)
}

/// Same as [`find_by_token`] but holds a row lock until the transaction ends, so two
/// submissions with one token serialise here.
pub async fn lock_by_token(conn: &mut PgConnection, token: &str) -> Result<Option<AlumniSurvey>> {
    let survey = sqlx::query_as::<_, AlumniSurvey>(&format!(
        "SELECT {ALUMNI_COLUMNS} FROM alumni_surveys WHERE token = $1 FOR UPDATE"
    ))
    .bind(token)
    .fetch_optional(conn)
    .await?;
    Ok(survey)
}

/// Returns `None` when the row was no longer pending.
pub async fn complete(
    conn: &mut PgConnection,
    id: Uuid,
    answers: Vec<AlumniAnswer>,
    total_score: i64,
) -> Result<Option<AlumniSurvey>> {
    let survey = sqlx::query_as::<_, AlumniSurvey>(&format!(
        r#"
        UPDATE alumni_surveys
        SET answers = $2, total_score = $3, status = 'completed',
            submitted_at = now(), updated_at = now()
        WHERE id = $1 AND status = 'pending'
        RETURNING {ALUMNI_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(Json(answers))
    .bind(total_score)
    .fetch_optional(conn)
    .await?;
    Ok(survey)
}

pub async fn list_alumni(
    pool: &PgPool,
    filter: &AlumniFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<AlumniSurvey>, i64)> {
    let pattern = super::like_pattern(filter.search.as_deref());
    let program = filter
        .study_program
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let rows = sqlx::query_as::<_, AlumniSurvey>(&format!(
        r#"
        SELECT {ALUMNI_COLUMNS}
        FROM alumni_surveys
        WHERE ($1::text IS NULL
               OR evaluator_name ILIKE $1 OR company_name ILIKE $1
               OR alumni_name ILIKE $1 OR alumni_nim ILIKE $1)
          AND ($2::text IS NULL OR study_program = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(&pattern)
    .bind(program)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM alumni_surveys
        WHERE ($1::text IS NULL
               OR evaluator_name ILIKE $1 OR company_name ILIKE $1
               OR alumni_name ILIKE $1 OR alumni_nim ILIKE $1)
          AND ($2::text IS NULL OR study_program = $2)
        "#,
    )
    .bind(&pattern)
    .bind(program)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

/// Every response, newest first. Feeds the dashboard and the spreadsheet export.
pub async fn all_alumni(pool: &PgPool) -> Result<Vec<AlumniSurvey>> {
    let rows = sqlx::query_as::<_, AlumniSurvey>(&format!(
        "SELECT {ALUMNI_COLUMNS} FROM alumni_surveys ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn study_programs(pool: &PgPool) -> Result<Vec<String>> {
    let programs = sqlx::query_scalar(
        r#"
        SELECT DISTINCT study_program
        FROM alumni_surveys
        WHERE study_program <> ''
        ORDER BY study_program
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(programs)
}

pub async fn delete_alumni(pool: &PgPool, ids: &[Uuid]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query("DELETE FROM alumni_surveys WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
