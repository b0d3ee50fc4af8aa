//! Turns raw submitted answers into typed [`Answer`]s, checked against the
//! questions they claim to answer.

use crate::domain::models::{
    AlumniAnswer, Answer, AnsweredQuestion, QuestionSetItem, QuestionType, QuestionWithOptions,
};
use crate::domain::scoring::{is_valid_scale_value, SCALE_MAX, SCALE_MIN};
use crate::error::FieldErrors;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Answer as posted to the admin survey submission endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    #[serde(default)]
    pub option_id: Option<Uuid>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Answer as posted by the alumni form: positional, with a loosely typed value.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionalAnswer {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Longest free-text answer accepted, in characters.
pub const MAX_TEXT_ANSWER_CHARS: usize = 5_000;

fn exceeds_text_limit(text: &str) -> bool {
    text.chars().count() > MAX_TEXT_ANSWER_CHARS
}

fn text_length_message() -> String {
    format!("The answer may not be longer than {} characters.", MAX_TEXT_ANSWER_CHARS)
}

fn scale_range_message() -> String {
    format!("The value must be a whole number between {} and {}.", SCALE_MIN, SCALE_MAX)
}

/// Validates answers for an admin survey. Every referenced question must belong to
/// `questions`, every option to its question, and every required question needs a
/// non-empty answer.
pub fn validate_submission(
    questions: &[QuestionWithOptions],
    submitted: &[SubmittedAnswer],
) -> Result<Vec<AnsweredQuestion<Uuid>>, FieldErrors> {
    let mut errors = FieldErrors::new();
    if submitted.is_empty() {
        errors.add("answers", "At least one answer is required.");
    }

    let by_id: HashMap<Uuid, &QuestionWithOptions> =
        questions.iter().map(|q| (q.question.id, q)).collect();

    let mut accepted: Vec<AnsweredQuestion<Uuid>> = Vec::with_capacity(submitted.len());
    let mut answered: HashSet<Uuid> = HashSet::new();
    let mut chosen: HashSet<(Uuid, Uuid)> = HashSet::new();

    for (idx, raw) in submitted.iter().enumerate() {
        let Some(question) = by_id.get(&raw.question_id) else {
            errors.add(
                format!("answers.{idx}.question_id"),
                "The selected question is invalid.",
            );
            continue;
        };

        let value = raw
            .value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let answer = match question.question.question_type {
            qtype if qtype.is_choice() => {
                let option_id = match raw.option_id {
                    Some(id) => Some(id),
                    // Accept the option's value or label when no id is sent.
                    None => value.and_then(|v| {
                        question
                            .options
                            .iter()
                            .find(|o| o.value == v || o.label == v)
                            .map(|o| o.id)
                    }),
                };
                match option_id {
                    None if value.is_some() => {
                        errors.add(
                            format!("answers.{idx}.option_id"),
                            "The selected option is invalid.",
                        );
                        continue;
                    }
                    None => continue,
                    Some(option_id) => {
                        if question.option(option_id).is_none() {
                            errors.add(
                                format!("answers.{idx}.option_id"),
                                "The selected option does not belong to this question.",
                            );
                            continue;
                        }
                        if !chosen.insert((question.question.id, option_id)) {
                            errors.add(
                                format!("answers.{idx}.option_id"),
                                "The same option was selected twice.",
                            );
                            continue;
                        }
                        if qtype != QuestionType::Multiple && answered.contains(&question.question.id) {
                            errors.add(
                                format!("answers.{idx}.option_id"),
                                "Only one option may be selected for this question.",
                            );
                            continue;
                        }
                        Answer::Choice { option_id }
                    }
                }
            }
            QuestionType::Scale => {
                let raw_value = match (raw.option_id, value) {
                    (Some(option_id), _) => match question.option(option_id) {
                        Some(option) => Some(option.value.trim()),
                        None => {
                            errors.add(
                                format!("answers.{idx}.option_id"),
                                "The selected option does not belong to this question.",
                            );
                            continue;
                        }
                    },
                    (None, value) => value,
                };
                let Some(raw_value) = raw_value else {
                    continue;
                };
                if answered.contains(&question.question.id) {
                    errors.add(
                        format!("answers.{idx}.question_id"),
                        "This question was answered more than once.",
                    );
                    continue;
                }
                match raw_value.parse::<i64>() {
                    Ok(v) if is_valid_scale_value(v) => Answer::Scale { value: v },
                    _ => {
                        errors.add(format!("answers.{idx}.value"), scale_range_message());
                        continue;
                    }
                }
            }
            _ => {
                if raw.option_id.is_some() {
                    errors.add(
                        format!("answers.{idx}.option_id"),
                        "Free-text questions do not take options.",
                    );
                    continue;
                }
                let Some(text) = value else {
                    continue;
                };
                if answered.contains(&question.question.id) {
                    errors.add(
                        format!("answers.{idx}.question_id"),
                        "This question was answered more than once.",
                    );
                    continue;
                }
                if exceeds_text_limit(text) {
                    errors.add(format!("answers.{idx}.value"), text_length_message());
                    continue;
                }
                Answer::Text { value: text.to_string() }
            }
        };

        answered.insert(question.question.id);
        accepted.push(AnsweredQuestion {
            question: question.question.id,
            answer,
        });
    }

    let mut missing = false;
    for question in questions.iter().filter(|q| q.question.required) {
        if !answered.contains(&question.question.id) {
            missing = true;
            errors.add(
                format!("questions.{}", question.question.id),
                "This question is required.",
            );
        }
    }
    if missing {
        errors.add("answers", "Please answer all required questions");
    }

    if errors.is_empty() {
        Ok(accepted)
    } else {
        Err(errors)
    }
}

/// Validates a positional alumni answer list against its question set.
pub fn validate_positional(
    items: &[QuestionSetItem],
    submitted: &[PositionalAnswer],
) -> Result<Vec<AlumniAnswer>, FieldErrors> {
    let mut errors = FieldErrors::new();
    if submitted.len() > items.len() {
        errors.add("answers", "More answers were submitted than there are questions.");
    }

    let mut accepted = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let raw = submitted.get(idx);

        if let Some(kind) = raw.and_then(|r| r.kind.as_deref()) {
            if QuestionType::try_from(kind) != Ok(item.question_type) {
                errors.add(
                    format!("answers.{idx}.type"),
                    format!("Expected a {} answer.", item.question_type.as_str()),
                );
                continue;
            }
        }

        let value = raw.and_then(|r| loose_string(&r.value));
        let Some(value) = value else {
            if item.required {
                errors.add(format!("answers.{idx}"), "This question is required.");
            }
            continue;
        };

        let answer = match item.question_type {
            QuestionType::Scale => match value.parse::<i64>() {
                Ok(v) if is_valid_scale_value(v) => Answer::Scale { value: v },
                _ => {
                    errors.add(format!("answers.{idx}.value"), scale_range_message());
                    continue;
                }
            },
            QuestionType::Text if exceeds_text_limit(&value) => {
                errors.add(format!("answers.{idx}.value"), text_length_message());
                continue;
            }
            QuestionType::Text => Answer::Text { value },
            other => {
                errors.add(
                    format!("answers.{idx}.type"),
                    format!("{} questions are not supported here.", other.as_str()),
                );
                continue;
            }
        };

        accepted.push(AlumniAnswer {
            position: idx,
            question: item.text.clone(),
            answer,
        });
    }

    if errors.is_empty() {
        Ok(accepted)
    } else {
        Err(errors)
    }
}

/// Strings, numbers and booleans become trimmed text; null and blanks are "no answer".
fn loose_string(value: &serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Question, QuestionOption};
    use serde_json::json;

    fn question(qtype: QuestionType, required: bool, options: &[&str]) -> QuestionWithOptions {
        let id = Uuid::new_v4();
        QuestionWithOptions {
            question: Question {
                id,
                survey_id: Uuid::nil(),
                label: None,
                question: format!("{} question", qtype.as_str()),
                question_type: qtype,
                required,
                order: 0,
            },
            options: options
                .iter()
                .enumerate()
                .map(|(i, label)| QuestionOption {
                    id: Uuid::new_v4(),
                    question_id: id,
                    label: label.to_string(),
                    value: label.to_string(),
                    order: i as i32,
                })
                .collect(),
        }
    }

    fn answer(question_id: Uuid, option_id: Option<Uuid>, value: Option<&str>) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id,
            option_id,
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn accepts_complete_submission() {
        let single = question(QuestionType::Single, true, &["Yes", "No"]);
        let multi = question(QuestionType::Multiple, false, &["A", "B", "C"]);
        let scale = question(QuestionType::Scale, true, &[]);
        let text = question(QuestionType::Text, false, &[]);

        let submitted = vec![
            answer(single.question.id, Some(single.options[0].id), None),
            answer(multi.question.id, Some(multi.options[0].id), None),
            answer(multi.question.id, Some(multi.options[2].id), None),
            answer(scale.question.id, None, Some(" 4 ")),
            answer(text.question.id, None, Some("Great work")),
        ];
        let questions = vec![single, multi, scale, text];

        let accepted = validate_submission(&questions, &submitted).unwrap();
        assert_eq!(accepted.len(), 5);
        assert_eq!(accepted[3].answer, Answer::Scale { value: 4 });
        assert_eq!(accepted[4].answer.text_value(), Some("Great work"));
    }

    #[test]
    fn choice_answer_resolves_option_by_value() {
        let tf = question(QuestionType::TrueFalse, true, &["true", "false"]);
        let submitted = vec![answer(tf.question.id, None, Some("false"))];
        let accepted = validate_submission(std::slice::from_ref(&tf), &submitted).unwrap();
        assert_eq!(accepted[0].answer, Answer::Choice { option_id: tf.options[1].id });
    }

    #[test]
    fn rejects_missing_required_answers() {
        let required = question(QuestionType::Text, true, &[]);
        let optional = question(QuestionType::Text, false, &[]);
        let submitted = vec![
            answer(optional.question.id, None, Some("only this")),
            answer(required.question.id, None, Some("   ")),
        ];
        let questions = vec![required.clone(), optional];

        let errors = validate_submission(&questions, &submitted).unwrap_err();
        assert!(errors.contains("answers"));
        assert!(errors.contains(&format!("questions.{}", required.question.id)));
    }

    #[test]
    fn rejects_foreign_options_and_unknown_questions() {
        let first = question(QuestionType::Single, false, &["A"]);
        let second = question(QuestionType::Single, false, &["B"]);
        let submitted = vec![
            answer(first.question.id, Some(second.options[0].id), None),
            answer(Uuid::new_v4(), None, Some("x")),
        ];
        let errors = validate_submission(&[first, second], &submitted).unwrap_err();
        assert!(errors.contains("answers.0.option_id"));
        assert!(errors.contains("answers.1.question_id"));
    }

    #[test]
    fn single_choice_takes_one_option() {
        let single = question(QuestionType::Single, false, &["A", "B"]);
        let submitted = vec![
            answer(single.question.id, Some(single.options[0].id), None),
            answer(single.question.id, Some(single.options[1].id), None),
        ];
        let errors = validate_submission(&[single], &submitted).unwrap_err();
        assert!(errors.contains("answers.1.option_id"));
    }

    #[test]
    fn scale_values_must_be_in_range() {
        let scale = question(QuestionType::Scale, false, &[]);
        for bad in ["0", "6", "four", "3.5"] {
            let submitted = vec![answer(scale.question.id, None, Some(bad))];
            let errors = validate_submission(std::slice::from_ref(&scale), &submitted).unwrap_err();
            assert!(errors.contains("answers.0.value"), "{bad} should be rejected");
        }
    }

    #[test]
    fn scale_question_takes_one_answer() {
        let scale = question(QuestionType::Scale, true, &[]);
        let submitted: Vec<SubmittedAnswer> = (0..20)
            .map(|_| answer(scale.question.id, None, Some("5")))
            .collect();

        let errors = validate_submission(std::slice::from_ref(&scale), &submitted).unwrap_err();
        assert!(!errors.contains("answers.0.question_id"));
        assert!(errors.contains("answers.1.question_id"));
        assert!(errors.contains("answers.19.question_id"));
    }

    #[test]
    fn accepted_scale_answers_stay_within_max_score() {
        let first = question(QuestionType::Scale, true, &[]);
        let second = question(QuestionType::Scale, false, &[]);
        let submitted = vec![
            answer(first.question.id, None, Some("5")),
            answer(second.question.id, None, Some("5")),
        ];
        let questions = vec![first, second];

        let accepted = validate_submission(&questions, &submitted).unwrap();
        let answers: Vec<Answer> = accepted.into_iter().map(|a| a.answer).collect();
        assert_eq!(crate::domain::scoring::compute_score(&answers), 10);
    }

    #[test]
    fn overlong_text_answer_is_rejected() {
        let text = question(QuestionType::Text, false, &[]);
        let long = "a".repeat(MAX_TEXT_ANSWER_CHARS + 1);
        let submitted = vec![answer(text.question.id, None, Some(&long))];
        let errors = validate_submission(std::slice::from_ref(&text), &submitted).unwrap_err();
        assert!(errors.contains("answers.0.value"));

        let at_limit = "a".repeat(MAX_TEXT_ANSWER_CHARS);
        let submitted = vec![answer(text.question.id, None, Some(&at_limit))];
        assert!(validate_submission(&[text], &submitted).is_ok());
    }

    #[test]
    fn empty_submission_is_rejected() {
        let errors = validate_submission(&[], &[]).unwrap_err();
        assert!(errors.contains("answers"));
    }

    fn alumni_items() -> Vec<QuestionSetItem> {
        serde_json::from_value(json!([
            { "text": "Etika dan Moral", "type": "skala" },
            { "text": "Keahlian dalam Bidang TI", "type": "skala" },
            { "text": "Saran", "type": "teks" },
            { "text": "Komentar", "type": "teks", "required": false }
        ]))
        .unwrap()
    }

    #[test]
    fn positional_answers_accept_string_scores() {
        let submitted: Vec<PositionalAnswer> = serde_json::from_value(json!([
            { "type": "skala", "value": "4" },
            { "type": "skala", "value": 5 },
            { "type": "teks", "value": "Pertahankan" },
            { "type": "teks", "value": null }
        ]))
        .unwrap();

        let accepted = validate_positional(&alumni_items(), &submitted).unwrap();
        assert_eq!(accepted.len(), 3);
        assert_eq!(accepted[0].answer, Answer::Scale { value: 4 });
        assert_eq!(accepted[1].question, "Keahlian dalam Bidang TI");
        assert_eq!(accepted[2].position, 2);
    }

    #[test]
    fn positional_answers_report_each_problem() {
        let submitted: Vec<PositionalAnswer> = serde_json::from_value(json!([
            { "type": "teks", "value": "salah tipe" },
            { "type": "skala", "value": "9" },
            { "type": "teks", "value": "" }
        ]))
        .unwrap();

        let errors = validate_positional(&alumni_items(), &submitted).unwrap_err();
        assert!(errors.contains("answers.0.type"));
        assert!(errors.contains("answers.1.value"));
        assert!(errors.contains("answers.2"));
        assert!(!errors.contains("answers.3"));
    }

    #[test]
    fn positional_text_answers_are_capped() {
        let submitted: Vec<PositionalAnswer> = serde_json::from_value(json!([
            { "type": "skala", "value": 4 },
            { "type": "skala", "value": 4 },
            { "type": "teks", "value": "x".repeat(40_000) }
        ]))
        .unwrap();

        let errors = validate_positional(&alumni_items(), &submitted).unwrap_err();
        assert!(errors.contains("answers.2.value"));
    }
}
