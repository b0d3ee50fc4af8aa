//! CSV dump of a survey's questions and options.

use crate::domain::models::SurveyDetail;
use anyhow::{Context, Result};
use uuid::Uuid;

/// UTF-8 byte order mark so spreadsheet tools pick the right encoding.
pub const BOM: &[u8] = b"\xEF\xBB\xBF";

pub const COLUMNS: [&str; 7] = [
    "question_id",
    "question",
    "type",
    "required",
    "option_id",
    "option_label",
    "option_value",
];

pub fn filename(survey_id: Uuid) -> String {
    format!("survey_{survey_id}.csv")
}

/// One row per question-option pair; questions without options get one row with
/// blank option fields.
pub fn format_csv(detail: &SurveyDetail) -> Result<Vec<u8>> {
    let mut buffer = BOM.to_vec();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        writer.write_record(COLUMNS)?;

        for q in &detail.questions {
            let question_id = q.question.id.to_string();
            let required = if q.question.required { "1" } else { "0" };
            let kind = q.question.question_type.as_str();

            if q.options.is_empty() {
                writer.write_record([
                    question_id.as_str(),
                    q.question.question.as_str(),
                    kind,
                    required,
                    "",
                    "",
                    "",
                ])?;
                continue;
            }

            for option in &q.options {
                let option_id = option.id.to_string();
                writer.write_record([
                    question_id.as_str(),
                    q.question.question.as_str(),
                    kind,
                    required,
                    option_id.as_str(),
                    option.label.as_str(),
                    option.value.as_str(),
                ])?;
            }
        }

        writer.flush().context("Failed to flush survey CSV")?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        Question, QuestionOption, QuestionType, QuestionWithOptions, Survey,
    };
    use chrono::Utc;

    fn detail() -> SurveyDetail {
        let now = Utc::now();
        let survey_id = Uuid::new_v4();
        let choice_id = Uuid::new_v4();
        let option = |label: &str, order: i32| QuestionOption {
            id: Uuid::new_v4(),
            question_id: choice_id,
            label: label.to_string(),
            value: label.to_lowercase(),
            order,
        };
        SurveyDetail {
            survey: Survey {
                id: survey_id,
                label: Some("SKM".to_string()),
                title: "Survei Kepuasan".to_string(),
                description: None,
                is_active: true,
                is_public: false,
                share_token: None,
                kepada: None,
                dari: None,
                created_by: None,
                created_at: now,
                updated_at: now,
            },
            questions: vec![
                QuestionWithOptions {
                    question: Question {
                        id: choice_id,
                        survey_id,
                        label: None,
                        question: "Apakah layanan, secara umum, memuaskan?".to_string(),
                        question_type: QuestionType::Single,
                        required: true,
                        order: 0,
                    },
                    options: vec![option("Ya", 0), option("Tidak", 1)],
                },
                QuestionWithOptions {
                    question: Question {
                        id: Uuid::new_v4(),
                        survey_id,
                        label: None,
                        question: "Saran".to_string(),
                        question_type: QuestionType::Text,
                        required: false,
                        order: 1,
                    },
                    options: vec![],
                },
            ],
        }
    }

    #[test]
    fn starts_with_bom_and_header() {
        let bytes = format_csv(&detail()).unwrap();
        assert!(bytes.starts_with(BOM));
        let text = std::str::from_utf8(&bytes[BOM.len()..]).unwrap();
        assert!(text.starts_with("question_id,question,type,required,option_id,option_label,option_value\n"));
    }

    #[test]
    fn rows_read_back_per_option() {
        let detail = detail();
        let bytes = format_csv(&detail).unwrap();

        let mut reader = csv::Reader::from_reader(&bytes[BOM.len()..]);
        let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][1], "Apakah layanan, secara umum, memuaskan?");
        assert_eq!(&rows[0][2], "single");
        assert_eq!(&rows[0][3], "1");
        assert_eq!(&rows[0][5], "Ya");
        assert_eq!(&rows[1][6], "tidak");
        assert_eq!(&rows[2][2], "text");
        assert_eq!(&rows[2][3], "0");
        assert_eq!(&rows[2][4], "");
    }

    #[test]
    fn filename_uses_survey_id() {
        assert_eq!(filename(Uuid::nil()), "survey_00000000-0000-0000-0000-000000000000.csv");
    }
}
