use crate::domain::models::{Answer, QuestionType, ResponseStatus};
use serde::Serialize;

pub const SCALE_MIN: i64 = 1;
/// Ceiling of every scale question.
pub const SCALE_MAX: i64 = 5;

/// Dashboard threshold: a response is "Puas" at 60 % of its maximum score or more.
pub const SATISFIED_PERCENTAGE: f64 = 60.0;

pub fn is_valid_scale_value(value: i64) -> bool {
    (SCALE_MIN..=SCALE_MAX).contains(&value)
}

/// Sum of every valid scale answer. Other answer kinds and out-of-range values add nothing.
pub fn compute_score<'a, I>(answers: I) -> i64
where
    I: IntoIterator<Item = &'a Answer>,
{
    answers
        .into_iter()
        .filter_map(Answer::scale_value)
        .filter(|v| is_valid_scale_value(*v))
        .sum()
}

pub fn compute_max_score<I>(question_types: I) -> i64
where
    I: IntoIterator<Item = QuestionType>,
{
    question_types
        .into_iter()
        .filter(|t| *t == QuestionType::Scale)
        .count() as i64
        * SCALE_MAX
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Classification {
    #[serde(rename = "Sangat Baik")]
    SangatBaik,
    #[serde(rename = "Baik")]
    Baik,
    #[serde(rename = "Cukup")]
    Cukup,
    #[serde(rename = "Kurang Baik")]
    KurangBaik,
    #[serde(rename = "Belum")]
    Belum,
}

impl Classification {
    /// Categories a completed response can land in, best first.
    pub const GRADED: [Classification; 4] = [
        Classification::SangatBaik,
        Classification::Baik,
        Classification::Cukup,
        Classification::KurangBaik,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Classification::SangatBaik => "Sangat Baik",
            Classification::Baik => "Baik",
            Classification::Cukup => "Cukup",
            Classification::KurangBaik => "Kurang Baik",
            Classification::Belum => "Belum",
        }
    }

    /// Total-score thresholds of the alumni report.
    pub fn from_total(score: i64) -> Self {
        if score <= 10 {
            Classification::KurangBaik
        } else if score <= 15 {
            Classification::Cukup
        } else if score <= 20 {
            Classification::Baik
        } else {
            Classification::SangatBaik
        }
    }

    /// Bucket of a single scale answer in the per-aspect table.
    pub fn from_scale_value(value: i64) -> Self {
        match value {
            5 => Classification::SangatBaik,
            4 => Classification::Baik,
            3 => Classification::Cukup,
            _ => Classification::KurangBaik,
        }
    }
}

/// Report classification of a response. Completed responses go through
/// [`Classification::from_total`], whose thresholds are absolute, so no max score is
/// taken here; pending responses are always `Belum`.
pub fn classify(score: i64, status: ResponseStatus) -> Classification {
    if status.is_completed() {
        Classification::from_total(score)
    } else {
        Classification::Belum
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Satisfaction {
    #[serde(rename = "Puas")]
    Puas,
    #[serde(rename = "Tidak Puas")]
    TidakPuas,
}

impl Satisfaction {
    pub fn label(&self) -> &'static str {
        match self {
            Satisfaction::Puas => "Puas",
            Satisfaction::TidakPuas => "Tidak Puas",
        }
    }
}

/// Dashboard satisfaction rule. Separate from [`classify`]; the dashboard and the
/// exported report bucket responses differently.
pub fn satisfaction(score: i64, max_score: i64) -> Satisfaction {
    if max_score <= 0 {
        return Satisfaction::TidakPuas;
    }
    let percentage = score as f64 / max_score as f64 * 100.0;
    if percentage >= SATISFIED_PERCENTAGE {
        Satisfaction::Puas
    } else {
        Satisfaction::TidakPuas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_sums_scale_answers_only() {
        let answers: Vec<Answer> = serde_json::from_str(
            r#"[{"type":"scale","value":4},{"type":"text","value":"ok"},{"type":"scale","value":5}]"#,
        )
        .unwrap();
        assert_eq!(compute_score(&answers), 9);
    }

    #[test]
    fn score_ignores_out_of_range_values() {
        let answers = vec![
            Answer::Scale { value: 7 },
            Answer::Scale { value: -2 },
            Answer::Scale { value: 3 },
            Answer::Choice { option_id: uuid::Uuid::nil() },
        ];
        assert_eq!(compute_score(&answers), 3);
        assert_eq!(compute_score(&Vec::<Answer>::new()), 0);
    }

    #[test]
    fn max_score_counts_scale_questions() {
        let types = [
            QuestionType::Scale,
            QuestionType::Text,
            QuestionType::Scale,
            QuestionType::Single,
        ];
        assert_eq!(compute_max_score(types), 10);
        assert_eq!(compute_max_score([QuestionType::Text]), 0);
    }

    #[test]
    fn classification_thresholds() {
        let done = ResponseStatus::Completed;
        assert_eq!(classify(9, done), Classification::KurangBaik);
        assert_eq!(classify(10, done), Classification::KurangBaik);
        assert_eq!(classify(11, done), Classification::Cukup);
        assert_eq!(classify(15, done), Classification::Cukup);
        assert_eq!(classify(16, done), Classification::Baik);
        assert_eq!(classify(20, done), Classification::Baik);
        assert_eq!(classify(25, done), Classification::SangatBaik);
    }

    #[test]
    fn pending_is_always_belum() {
        for score in [0, 9, 16, 25] {
            assert_eq!(classify(score, ResponseStatus::Pending), Classification::Belum);
        }
    }

    #[test]
    fn scale_value_buckets() {
        assert_eq!(Classification::from_scale_value(5), Classification::SangatBaik);
        assert_eq!(Classification::from_scale_value(4), Classification::Baik);
        assert_eq!(Classification::from_scale_value(3), Classification::Cukup);
        assert_eq!(Classification::from_scale_value(2), Classification::KurangBaik);
        assert_eq!(Classification::from_scale_value(1), Classification::KurangBaik);
    }

    #[test]
    fn satisfaction_uses_percentage_of_max() {
        assert_eq!(satisfaction(15, 25), Satisfaction::Puas);
        assert_eq!(satisfaction(14, 25), Satisfaction::TidakPuas);
        assert_eq!(satisfaction(6, 10), Satisfaction::Puas);
        assert_eq!(satisfaction(10, 0), Satisfaction::TidakPuas);
    }

    #[test]
    fn the_two_rules_can_disagree() {
        // 9 of 10 is "Puas" on the dashboard but "Kurang Baik" in the report.
        assert_eq!(satisfaction(9, 10), Satisfaction::Puas);
        assert_eq!(classify(9, ResponseStatus::Completed), Classification::KurangBaik);
    }
}
