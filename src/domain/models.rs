use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Single,
    Multiple,
    TrueFalse,
    #[serde(alias = "skala")]
    Scale,
    #[serde(alias = "teks")]
    Text,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Single => "single",
            QuestionType::Multiple => "multiple",
            QuestionType::TrueFalse => "true_false",
            QuestionType::Scale => "scale",
            QuestionType::Text => "text",
        }
    }

    /// Choice questions are answered by picking one of their options.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::Single | QuestionType::Multiple | QuestionType::TrueFalse)
    }

    pub fn allows_options(&self) -> bool {
        !matches!(self, QuestionType::Text)
    }
}

impl TryFrom<&str> for QuestionType {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "single" => Ok(QuestionType::Single),
            "multiple" => Ok(QuestionType::Multiple),
            "true_false" => Ok(QuestionType::TrueFalse),
            "scale" | "skala" => Ok(QuestionType::Scale),
            "text" | "teks" => Ok(QuestionType::Text),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Pending,
    Completed,
}

impl ResponseStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, ResponseStatus::Completed)
    }
}

/// One validated answer. The shape is fixed by the owning question's type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Answer {
    #[serde(alias = "skala")]
    Scale { value: i64 },
    Choice { option_id: Uuid },
    #[serde(alias = "teks")]
    Text { value: String },
}

impl Answer {
    pub fn scale_value(&self) -> Option<i64> {
        match self {
            Answer::Scale { value } => Some(*value),
            _ => None,
        }
    }

    pub fn text_value(&self) -> Option<&str> {
        match self {
            Answer::Text { value } => Some(value.as_str()),
            _ => None,
        }
    }
}

/// An answer tied to the question it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion<K> {
    pub question: K,
    #[serde(flatten)]
    pub answer: Answer,
}

/// The verified administrator behind a request. Passed explicitly into every
/// operation that stamps authorship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContext {
    pub admin_id: Uuid,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Admin survey builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Survey {
    pub id: Uuid,
    pub label: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_public: bool,
    pub share_token: Option<String>,
    pub kepada: Option<String>,
    pub dari: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SurveyListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub survey: Survey,
    pub questions_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub label: Option<String>,
    pub question: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub required: bool,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuestionOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub label: String,
    pub value: String,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

impl QuestionWithOptions {
    pub fn option(&self, option_id: Uuid) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyDetail {
    #[serde(flatten)]
    pub survey: Survey,
    pub questions: Vec<QuestionWithOptions>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SurveyResponse {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub user_id: Option<Uuid>,
    pub respondent_name: Option<String>,
    pub respondent_email: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub status: ResponseStatus,
    pub total_score: i64,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ResponseItem {
    pub id: Uuid,
    pub response_id: Uuid,
    pub question_id: Uuid,
    pub option_id: Option<Uuid>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseWithItems {
    #[serde(flatten)]
    pub response: SurveyResponse,
    pub items: Vec<ResponseItem>,
}

// ---------------------------------------------------------------------------
// Alumni satisfaction survey
// ---------------------------------------------------------------------------

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSetItem {
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default = "default_required")]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuestionSet {
    pub id: Uuid,
    pub title: String,
    pub questions: Json<Vec<QuestionSetItem>>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuestionSet {
    pub fn items(&self) -> &[QuestionSetItem] {
        &self.questions.0
    }
}

/// Stored alumni answer: position in the question set plus the question text at submit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlumniAnswer {
    pub position: usize,
    pub question: String,
    #[serde(flatten)]
    pub answer: Answer,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AlumniSurvey {
    pub id: Uuid,
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
    pub created_by: String,
    pub question_set_id: Uuid,
    #[serde(skip_serializing)]
    pub token: String,
    pub status: ResponseStatus,
    pub answers: Option<Json<Vec<AlumniAnswer>>>,
    pub total_score: i64,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlumniSurvey {
    pub fn answers(&self) -> &[AlumniAnswer] {
        self.answers.as_ref().map(|a| a.0.as_slice()).unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Content administration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    pub is_published: bool,
    pub user_id: Option<Uuid>,
    pub attachment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NewsStatus {
    Draft,
    Published,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub status: NewsStatus,
    pub body: String,
    pub image: Option<String>,
    pub published_on: NaiveDate,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub expired_date: NaiveDate,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_type_accepts_alumni_aliases() {
        assert_eq!(QuestionType::try_from("skala"), Ok(QuestionType::Scale));
        assert_eq!(QuestionType::try_from(" Teks "), Ok(QuestionType::Text));
        assert_eq!(QuestionType::try_from("true_false"), Ok(QuestionType::TrueFalse));
        assert!(QuestionType::try_from("essay").is_err());

        let item: QuestionSetItem =
            serde_json::from_str(r#"{"text":"Etika dan Moral","type":"skala"}"#).unwrap();
        assert_eq!(item.question_type, QuestionType::Scale);
        assert!(item.required);
    }

    #[test]
    fn choice_types_and_options() {
        assert!(QuestionType::TrueFalse.is_choice());
        assert!(!QuestionType::Scale.is_choice());
        assert!(QuestionType::Scale.allows_options());
        assert!(!QuestionType::Text.allows_options());
    }

    #[test]
    fn answers_are_tagged_by_type() {
        let answers: Vec<Answer> = serde_json::from_str(
            r#"[{"type":"scale","value":4},{"type":"text","value":"ok"},{"type":"skala","value":5}]"#,
        )
        .unwrap();
        assert_eq!(answers[0], Answer::Scale { value: 4 });
        assert_eq!(answers[1].text_value(), Some("ok"));
        assert_eq!(answers[2].scale_value(), Some(5));

        let stored = AlumniAnswer {
            position: 2,
            question: "Saran".to_string(),
            answer: Answer::Text { value: "Lebih aktif".to_string() },
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["position"], 2);
        let back: AlumniAnswer = serde_json::from_value(json).unwrap();
        assert_eq!(back, stored);
    }
}
