//! Question and option writes for the admin survey builder.

use crate::db::{self, QuestionFields};
use crate::domain::models::{QuestionType, QuestionWithOptions};
use crate::domain::reconcile::{option_writes, plan_options, SubmittedOption};
use crate::error::{AppError, FieldErrors};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

fn reject_options_for_text(question_type: QuestionType, options: &[SubmittedOption]) -> Result<(), AppError> {
    if !question_type.allows_options() && !options.is_empty() {
        return Err(AppError::Validation(FieldErrors::single(
            "options",
            "Free-text questions cannot have options.",
        )));
    }
    Ok(())
}

async fn reload(conn: &mut PgConnection, survey_id: Uuid, question_id: Uuid) -> Result<QuestionWithOptions, AppError> {
    db::load_questions(conn, survey_id)
        .await?
        .into_iter()
        .find(|q| q.question.id == question_id)
        .ok_or(AppError::NotFound("question"))
}

/// Appends a question (or places it at `order`) together with its options.
pub async fn add_question(
    pool: &PgPool,
    survey_id: Uuid,
    fields: &QuestionFields,
    order: Option<i32>,
    options: &[SubmittedOption],
) -> Result<QuestionWithOptions, AppError> {
    reject_options_for_text(fields.question_type, options)?;
    let writes = option_writes(options).map_err(AppError::Validation)?;

    let mut tx = pool.begin().await?;
    db::lock_survey(&mut tx, survey_id)
        .await?
        .ok_or(AppError::NotFound("survey"))?;

    let order = match order {
        Some(order) => order,
        None => db::next_question_order(&mut tx, survey_id).await?,
    };
    let question = db::insert_question(&mut tx, survey_id, fields, order).await?;
    for write in &writes {
        db::insert_option(&mut tx, question.id, write).await?;
    }

    let created = reload(&mut tx, survey_id, question.id).await?;
    tx.commit().await?;
    tracing::info!("Question {} added to survey {}", question.id, survey_id);
    Ok(created)
}

/// Updates a question. When `options` is given, the stored options are reconciled
/// against it; when absent they are left alone.
pub async fn update_question(
    pool: &PgPool,
    question_id: Uuid,
    fields: &QuestionFields,
    order: Option<i32>,
    options: Option<&[SubmittedOption]>,
) -> Result<QuestionWithOptions, AppError> {
    if let Some(options) = options {
        reject_options_for_text(fields.question_type, options)?;
    }

    let mut tx = pool.begin().await?;
    let current = db::lock_question(&mut tx, question_id)
        .await?
        .ok_or(AppError::NotFound("question"))?;

    let question =
        db::update_question(&mut tx, question_id, fields, order.unwrap_or(current.order)).await?;

    let existing = db::option_ids(&mut tx, question_id).await?;
    let submitted: &[SubmittedOption] = match options {
        Some(options) => options,
        // A question switched to free text drops the options it had.
        None if !fields.question_type.allows_options() => &[],
        None => {
            let updated = reload(&mut tx, question.survey_id, question_id).await?;
            tx.commit().await?;
            return Ok(updated);
        }
    };

    let plan = plan_options(&existing, submitted).map_err(AppError::Validation)?;
    db::delete_options(&mut tx, &plan.delete).await?;
    for write in &plan.update {
        if let Some(id) = write.id {
            db::update_option(&mut tx, id, write).await?;
        }
    }
    for write in &plan.create {
        db::insert_option(&mut tx, question_id, write).await?;
    }

    let updated = reload(&mut tx, question.survey_id, question_id).await?;
    tx.commit().await?;
    tracing::info!(
        "Question {} updated: {} options created, {} updated, {} deleted",
        question_id,
        plan.create.len(),
        plan.update.len(),
        plan.delete.len()
    );
    Ok(updated)
}

/// Options and answers to the question disappear with it.
pub async fn delete_question(pool: &PgPool, question_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    if !db::delete_question(&mut tx, question_id).await? {
        return Err(AppError::NotFound("question"));
    }
    tx.commit().await?;
    tracing::info!("Question {} deleted", question_id);
    Ok(())
}

/// Questions, options, responses and their items go with the survey.
pub async fn delete_survey(pool: &PgPool, survey_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    if !db::delete_survey(&mut tx, survey_id).await? {
        return Err(AppError::NotFound("survey"));
    }
    tx.commit().await?;
    tracing::info!("Survey {} deleted", survey_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Respondent, SurveyFields};
    use crate::domain::answers::SubmittedAnswer;
    use crate::services::lifecycle::submit_survey_response;

    async fn count(pool: &PgPool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn deleting_a_survey_leaves_no_orphans(pool: PgPool) {
        let fields = SurveyFields {
            label: Some("Layanan".to_string()),
            title: "Survey Layanan".to_string(),
            description: None,
            is_active: true,
            kepada: None,
            dari: None,
        };
        let survey = db::insert_survey(&pool, &fields, Uuid::new_v4()).await.unwrap();
        let question = add_question(
            &pool,
            survey.id,
            &QuestionFields {
                label: None,
                question: "Puas dengan layanan?".to_string(),
                question_type: QuestionType::Single,
                required: true,
            },
            None,
            &[
                SubmittedOption { id: None, label: "Ya".to_string(), value: None },
                SubmittedOption { id: None, label: "Tidak".to_string(), value: None },
            ],
        )
        .await
        .unwrap();

        let respondent = Respondent { user_id: None, name: Some("Tamu".to_string()), email: None };
        let answer = SubmittedAnswer {
            question_id: question.question.id,
            option_id: Some(question.options[0].id),
            value: None,
        };
        submit_survey_response(&pool, survey.id, &respondent, &[answer]).await.unwrap();
        assert_eq!(count(&pool, "response_items").await, 1);

        delete_survey(&pool, survey.id).await.unwrap();

        for table in ["surveys", "questions", "options", "survey_responses", "response_items"] {
            assert_eq!(count(&pool, table).await, 0, "{table} kept rows");
        }
        assert!(matches!(delete_survey(&pool, survey.id).await, Err(AppError::NotFound("survey"))));
    }
}
