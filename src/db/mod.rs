//! Admin survey builder persistence. Multi-statement writes take a `&mut PgConnection`
//! so callers can run them inside one transaction.
pub mod alumni;
pub mod content;

use crate::domain::models::{
    Question, QuestionOption, QuestionType, QuestionWithOptions, ResponseItem, ResponseWithItems,
    Survey, SurveyDetail, SurveyListItem, SurveyResponse,
};
use crate::domain::reconcile::OptionWrite;
use anyhow::Result;
use sqlx::{PgConnection, PgExecutor, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

const SURVEY_COLUMNS: &str = r#"
    s.id, s.label, s.title, s.description, s.is_active, s.is_public, s.share_token,
    s.kepada, s.dari, s.created_by, s.created_at, s.updated_at
"#;

const RESPONSE_COLUMNS: &str = r#"
    id, survey_id, user_id, respondent_name, respondent_email, token, status,
    total_score, submitted_at, created_at
"#;

/// `%term%` for ILIKE, or `None` when the search box is empty.
pub fn like_pattern(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| format!("%{}%", t.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")))
}

#[derive(Debug, Clone)]
pub struct SurveyFields {
    pub label: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub kepada: Option<String>,
    pub dari: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuestionFields {
    pub label: Option<String>,
    pub question: String,
    pub question_type: QuestionType,
    pub required: bool,
}

// ---------------------------------------------------------------------------
// Surveys
// ---------------------------------------------------------------------------

pub async fn list_surveys(
    pool: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<SurveyListItem>, i64)> {
    let pattern = like_pattern(search);

    let rows = sqlx::query_as::<_, SurveyListItem>(&format!(
        r#"
        SELECT {SURVEY_COLUMNS},
               (SELECT COUNT(*) FROM questions q WHERE q.survey_id = s.id) AS questions_count
        FROM surveys s
        WHERE $1::text IS NULL
           OR s.title ILIKE $1 OR s.label ILIKE $1 OR s.kepada ILIKE $1 OR s.dari ILIKE $1
        ORDER BY s.created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM surveys s
        WHERE $1::text IS NULL
           OR s.title ILIKE $1 OR s.label ILIKE $1 OR s.kepada ILIKE $1 OR s.dari ILIKE $1
        "#,
    )
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub async fn find_survey<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Survey>> {
    let survey = sqlx::query_as::<_, Survey>(&format!("SELECT {SURVEY_COLUMNS} FROM surveys s WHERE s.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(survey)
}

pub async fn find_survey_by_share_token<'e>(db: impl PgExecutor<'e>, token: &str) -> Result<Option<Survey>> {
    let survey = sqlx::query_as::<_, Survey>(&format!(
        "SELECT {SURVEY_COLUMNS} FROM surveys s WHERE s.share_token = $1"
    ))
    .bind(token)
    .fetch_optional(db)
    .await?;
    Ok(survey)
}

/// Locks the survey row for the rest of the transaction.
pub async fn lock_survey(conn: &mut PgConnection, id: Uuid) -> Result<Option<Survey>> {
    let survey = sqlx::query_as::<_, Survey>(&format!(
        "SELECT {SURVEY_COLUMNS} FROM surveys s WHERE s.id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(survey)
}

pub async fn insert_survey(pool: &PgPool, fields: &SurveyFields, created_by: Uuid) -> Result<Survey> {
    let survey = sqlx::query_as::<_, Survey>(
        r#"
        INSERT INTO surveys AS s (id, label, title, description, is_active, kepada, dari, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING s.*
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&fields.label)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.is_active)
    .bind(&fields.kepada)
    .bind(&fields.dari)
    .bind(created_by)
    .fetch_one(pool)
    .await?;
    Ok(survey)
}

pub async fn update_survey(pool: &PgPool, id: Uuid, fields: &SurveyFields) -> Result<Option<Survey>> {
    let survey = sqlx::query_as::<_, Survey>(
        r#"
        UPDATE surveys AS s
        SET label = $2, title = $3, description = $4, is_active = $5,
            kepada = $6, dari = $7, updated_at = now()
        WHERE s.id = $1
        RETURNING s.*
        "#,
    )
    .bind(id)
    .bind(&fields.label)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.is_active)
    .bind(&fields.kepada)
    .bind(&fields.dari)
    .fetch_optional(pool)
    .await?;
    Ok(survey)
}

/// Questions, options, responses and response items go with it through FK cascades.
pub async fn delete_survey(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM surveys WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_share_state(
    conn: &mut PgConnection,
    id: Uuid,
    share_token: &str,
    is_public: bool,
) -> Result<Survey> {
    let survey = sqlx::query_as::<_, Survey>(
        r#"
        UPDATE surveys AS s
        SET share_token = $2, is_public = $3, updated_at = now()
        WHERE s.id = $1
        RETURNING s.*
        "#,
    )
    .bind(id)
    .bind(share_token)
    .bind(is_public)
    .fetch_one(conn)
    .await?;
    Ok(survey)
}

// ---------------------------------------------------------------------------
// Questions & options
// ---------------------------------------------------------------------------

pub async fn load_questions(conn: &mut PgConnection, survey_id: Uuid) -> Result<Vec<QuestionWithOptions>> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, survey_id, label, question, type, required, "order"
        FROM questions
        WHERE survey_id = $1
        ORDER BY "order", created_at
        "#,
    )
    .bind(survey_id)
    .fetch_all(&mut *conn)
    .await?;

    let options = sqlx::query_as::<_, QuestionOption>(
        r#"
        SELECT o.id, o.question_id, o.label, o.value, o."order"
        FROM options o
        JOIN questions q ON q.id = o.question_id
        WHERE q.survey_id = $1
        ORDER BY o."order"
        "#,
    )
    .bind(survey_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        grouped.entry(option.question_id).or_default().push(option);
    }

    Ok(questions
        .into_iter()
        .map(|question| {
            let options = grouped.remove(&question.id).unwrap_or_default();
            QuestionWithOptions { question, options }
        })
        .collect())
}

pub async fn survey_detail(conn: &mut PgConnection, id: Uuid) -> Result<Option<SurveyDetail>> {
    let Some(survey) = find_survey(&mut *conn, id).await? else {
        return Ok(None);
    };
    let questions = load_questions(conn, id).await?;
    Ok(Some(SurveyDetail { survey, questions }))
}

pub async fn next_question_order(conn: &mut PgConnection, survey_id: Uuid) -> Result<i32> {
    let max: Option<i32> = sqlx::query_scalar(r#"SELECT MAX("order") FROM questions WHERE survey_id = $1"#)
        .bind(survey_id)
        .fetch_one(conn)
        .await?;
    Ok(max.map(|m| m + 1).unwrap_or(0))
}

pub async fn insert_question(
    conn: &mut PgConnection,
    survey_id: Uuid,
    fields: &QuestionFields,
    order: i32,
) -> Result<Question> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (id, survey_id, label, question, type, required, "order")
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, survey_id, label, question, type, required, "order"
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(survey_id)
    .bind(&fields.label)
    .bind(&fields.question)
    .bind(fields.question_type)
    .bind(fields.required)
    .bind(order)
    .fetch_one(conn)
    .await?;
    Ok(question)
}

pub async fn lock_question(conn: &mut PgConnection, id: Uuid) -> Result<Option<Question>> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, survey_id, label, question, type, required, "order"
        FROM questions
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(question)
}

pub async fn update_question(
    conn: &mut PgConnection,
    id: Uuid,
    fields: &QuestionFields,
    order: i32,
) -> Result<Question> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        UPDATE questions
        SET label = $2, question = $3, type = $4, required = $5, "order" = $6, updated_at = now()
        WHERE id = $1
        RETURNING id, survey_id, label, question, type, required, "order"
        "#,
    )
    .bind(id)
    .bind(&fields.label)
    .bind(&fields.question)
    .bind(fields.question_type)
    .bind(fields.required)
    .bind(order)
    .fetch_one(conn)
    .await?;
    Ok(question)
}

/// Options and the response items that reference the question cascade.
pub async fn delete_question(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn option_ids(conn: &mut PgConnection, question_id: Uuid) -> Result<Vec<Uuid>> {
    let ids = sqlx::query_scalar(r#"SELECT id FROM options WHERE question_id = $1 ORDER BY "order""#)
        .bind(question_id)
        .fetch_all(conn)
        .await?;
    Ok(ids)
}

pub async fn insert_option(conn: &mut PgConnection, question_id: Uuid, write: &OptionWrite) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO options (id, question_id, label, value, "order")
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(question_id)
    .bind(&write.label)
    .bind(&write.value)
    .bind(write.order)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_option(conn: &mut PgConnection, id: Uuid, write: &OptionWrite) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE options
        SET label = $2, value = $3, "order" = $4, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&write.label)
    .bind(&write.value)
    .bind(write.order)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_options(conn: &mut PgConnection, ids: &[Uuid]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query("DELETE FROM options WHERE id = ANY($1)")
        .bind(ids)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Respondent {
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
}

pub async fn insert_completed_response(
    conn: &mut PgConnection,
    survey_id: Uuid,
    respondent: &Respondent,
    total_score: i64,
) -> Result<SurveyResponse> {
    let response = sqlx::query_as::<_, SurveyResponse>(&format!(
        r#"
        INSERT INTO survey_responses
            (id, survey_id, user_id, respondent_name, respondent_email, status, total_score, submitted_at)
        VALUES ($1, $2, $3, $4, $5, 'completed', $6, now())
        RETURNING {RESPONSE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(survey_id)
    .bind(respondent.user_id)
    .bind(&respondent.name)
    .bind(&respondent.email)
    .bind(total_score)
    .fetch_one(conn)
    .await?;
    Ok(response)
}

pub async fn insert_response_item(
    conn: &mut PgConnection,
    response_id: Uuid,
    question_id: Uuid,
    option_id: Option<Uuid>,
    value: Option<&str>,
) -> Result<ResponseItem> {
    let item = sqlx::query_as::<_, ResponseItem>(
        r#"
        INSERT INTO response_items (id, response_id, question_id, option_id, value)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, response_id, question_id, option_id, value
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(response_id)
    .bind(question_id)
    .bind(option_id)
    .bind(value)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

async fn attach_items(conn: &mut PgConnection, responses: Vec<SurveyResponse>) -> Result<Vec<ResponseWithItems>> {
    let ids: Vec<Uuid> = responses.iter().map(|r| r.id).collect();
    let items = sqlx::query_as::<_, ResponseItem>(
        r#"
        SELECT id, response_id, question_id, option_id, value
        FROM response_items
        WHERE response_id = ANY($1)
        ORDER BY created_at
        "#,
    )
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<ResponseItem>> = HashMap::new();
    for item in items {
        grouped.entry(item.response_id).or_default().push(item);
    }
    Ok(responses
        .into_iter()
        .map(|response| {
            let items = grouped.remove(&response.id).unwrap_or_default();
            ResponseWithItems { response, items }
        })
        .collect())
}

/// Newest submissions first, with their answer items.
pub async fn list_responses(
    conn: &mut PgConnection,
    survey_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<ResponseWithItems>, i64)> {
    let responses = sqlx::query_as::<_, SurveyResponse>(&format!(
        r#"
        SELECT {RESPONSE_COLUMNS}
        FROM survey_responses
        WHERE survey_id = $1
        ORDER BY submitted_at DESC NULLS LAST, created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(survey_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM survey_responses WHERE survey_id = $1")
        .bind(survey_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok((attach_items(conn, responses).await?, total))
}

pub async fn completed_responses(conn: &mut PgConnection, survey_id: Uuid) -> Result<Vec<ResponseWithItems>> {
    let responses = sqlx::query_as::<_, SurveyResponse>(&format!(
        r#"
        SELECT {RESPONSE_COLUMNS}
        FROM survey_responses
        WHERE survey_id = $1 AND status = 'completed'
        "#
    ))
    .bind(survey_id)
    .fetch_all(&mut *conn)
    .await?;
    attach_items(conn, responses).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(None), None);
        assert_eq!(like_pattern(Some("   ")), None);
        assert_eq!(like_pattern(Some(" alumni ")), Some("%alumni%".to_string()));
        assert_eq!(like_pattern(Some("50%_off")), Some("%50\\%\\_off%".to_string()));
    }
}
