//! Read-only aggregates over loaded responses. Everything here is recomputed per
//! request from already-fetched rows.

use crate::domain::models::{
    AlumniSurvey, QuestionSetItem, QuestionType, ResponseWithItems, SurveyDetail,
};
use crate::domain::scoring::{classify, satisfaction, Classification, Satisfaction};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Aspect columns of the alumni report when no question set is chosen.
pub const DEFAULT_ASPECTS: [&str; 5] = [
    "Etika dan Moral",
    "Keahlian dalam Bidang TI",
    "Kemampuan Bahasa Inggris",
    "Kemampuan Bekerja Sama",
    "Kemampuan Pengembangan Diri",
];

pub const DEFAULT_TEXT_COLUMNS: [&str; 2] = ["Saran", "Komentar"];

/// Rounds to two decimals, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn percentage(count: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(count as f64 / total as f64 * 100.0)
}

// ---------------------------------------------------------------------------
// Admin survey statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct OptionStat {
    pub option_id: Uuid,
    pub label: String,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionStat {
    pub question_id: Uuid,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub total_answers: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionStat>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyHeadline {
    pub id: Uuid,
    pub title: String,
    pub total_responses: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub survey: SurveyHeadline,
    pub statistics: Vec<QuestionStat>,
}

pub fn aggregate_statistics(detail: &SurveyDetail, responses: &[ResponseWithItems]) -> StatisticsReport {
    let completed: Vec<&ResponseWithItems> = responses
        .iter()
        .filter(|r| r.response.status.is_completed() && r.response.survey_id == detail.survey.id)
        .collect();
    let total_responses = completed.len() as i64;

    let mut option_counts: HashMap<(Uuid, Uuid), i64> = HashMap::new();
    let mut literal_answers: HashMap<Uuid, Vec<String>> = HashMap::new();
    for item in completed.iter().flat_map(|r| r.items.iter()) {
        if let Some(option_id) = item.option_id {
            *option_counts.entry((item.question_id, option_id)).or_default() += 1;
        }
        if let Some(value) = &item.value {
            literal_answers
                .entry(item.question_id)
                .or_default()
                .push(value.clone());
        }
    }

    let statistics = detail
        .questions
        .iter()
        .map(|q| {
            let question = &q.question;
            if question.question_type.is_choice() {
                let options: Vec<OptionStat> = q
                    .options
                    .iter()
                    .map(|o| {
                        let count = option_counts.get(&(question.id, o.id)).copied().unwrap_or(0);
                        OptionStat {
                            option_id: o.id,
                            label: o.label.clone(),
                            count,
                            percentage: percentage(count, total_responses),
                        }
                    })
                    .collect();
                QuestionStat {
                    question_id: question.id,
                    question: question.question.clone(),
                    question_type: question.question_type,
                    total_answers: options.iter().map(|o| o.count).sum(),
                    options: Some(options),
                    answers: None,
                }
            } else {
                let answers = literal_answers.get(&question.id).cloned().unwrap_or_default();
                QuestionStat {
                    question_id: question.id,
                    question: question.question.clone(),
                    question_type: question.question_type,
                    total_answers: answers.len() as i64,
                    options: None,
                    answers: Some(answers),
                }
            }
        })
        .collect();

    StatisticsReport {
        survey: SurveyHeadline {
            id: detail.survey.id,
            title: detail.survey.title.clone(),
            total_responses,
        },
        statistics,
    }
}

// ---------------------------------------------------------------------------
// Alumni report
// ---------------------------------------------------------------------------

/// Which scale answers feed which aspect column, and which text answers feed which
/// text column. Answers are matched by their order within a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLayout {
    pub aspects: Vec<String>,
    pub text_columns: Vec<String>,
}

impl ReportLayout {
    pub fn default_alumni() -> Self {
        Self {
            aspects: DEFAULT_ASPECTS.iter().map(|s| s.to_string()).collect(),
            text_columns: DEFAULT_TEXT_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_question_set(items: &[QuestionSetItem]) -> Self {
        let pick = |kind: QuestionType| {
            items
                .iter()
                .filter(|i| i.question_type == kind)
                .map(|i| i.text.clone())
                .collect::<Vec<_>>()
        };
        Self {
            aspects: pick(QuestionType::Scale),
            text_columns: pick(QuestionType::Text),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    #[serde(rename = "Sangat Baik")]
    pub sangat_baik: i64,
    #[serde(rename = "Baik")]
    pub baik: i64,
    #[serde(rename = "Cukup")]
    pub cukup: i64,
    #[serde(rename = "Kurang Baik")]
    pub kurang_baik: i64,
}

impl CategoryCounts {
    pub fn add(&mut self, category: Classification) {
        match category {
            Classification::SangatBaik => self.sangat_baik += 1,
            Classification::Baik => self.baik += 1,
            Classification::Cukup => self.cukup += 1,
            Classification::KurangBaik => self.kurang_baik += 1,
            Classification::Belum => {}
        }
    }

    pub fn get(&self, category: Classification) -> i64 {
        match category {
            Classification::SangatBaik => self.sangat_baik,
            Classification::Baik => self.baik,
            Classification::Cukup => self.cukup,
            Classification::KurangBaik => self.kurang_baik,
            Classification::Belum => 0,
        }
    }

    pub fn total(&self) -> i64 {
        self.sangat_baik + self.baik + self.cukup + self.kurang_baik
    }

    fn merge(&mut self, other: &CategoryCounts) {
        self.sangat_baik += other.sangat_baik;
        self.baik += other.baik;
        self.cukup += other.cukup;
        self.kurang_baik += other.kurang_baik;
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
    #[serde(flatten)]
    pub counts: CategoryCounts,
    #[serde(rename = "Belum")]
    pub belum: i64,
}

impl ClassificationSummary {
    pub fn completed(&self) -> i64 {
        self.counts.total()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AspectBreakdown {
    pub aspect: String,
    #[serde(flatten)]
    pub counts: CategoryCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlumniReport {
    pub summary: ClassificationSummary,
    pub aspects: Vec<AspectBreakdown>,
    pub aspect_totals: CategoryCounts,
}

/// Scale values of a response in answer order.
pub fn scale_values(response: &AlumniSurvey) -> Vec<i64> {
    response
        .answers()
        .iter()
        .filter_map(|a| a.answer.scale_value())
        .collect()
}

/// Free-text values of a response in answer order.
pub fn text_values(response: &AlumniSurvey) -> Vec<&str> {
    response
        .answers()
        .iter()
        .filter_map(|a| a.answer.text_value())
        .collect()
}

pub fn classification_of(response: &AlumniSurvey) -> Classification {
    classify(response.total_score, response.status)
}

pub fn alumni_report(layout: &ReportLayout, responses: &[AlumniSurvey]) -> AlumniReport {
    let mut summary = ClassificationSummary::default();
    let mut aspects: Vec<AspectBreakdown> = layout
        .aspects
        .iter()
        .map(|aspect| AspectBreakdown {
            aspect: aspect.clone(),
            counts: CategoryCounts::default(),
        })
        .collect();

    for response in responses {
        match classification_of(response) {
            Classification::Belum => summary.belum += 1,
            category => summary.counts.add(category),
        }

        if !response.status.is_completed() {
            continue;
        }
        for (breakdown, value) in aspects.iter_mut().zip(scale_values(response)) {
            breakdown.counts.add(Classification::from_scale_value(value));
        }
    }

    let mut aspect_totals = CategoryCounts::default();
    for breakdown in &aspects {
        aspect_totals.merge(&breakdown.counts);
    }

    AlumniReport {
        summary,
        aspects,
        aspect_totals,
    }
}

// ---------------------------------------------------------------------------
// Alumni dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramSatisfaction {
    pub name: String,
    #[serde(rename = "Puas")]
    pub puas: i64,
    #[serde(rename = "Tidak Puas")]
    pub tidak_puas: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonutSlice {
    pub name: &'static str,
    pub value: i64,
    pub fill: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    #[serde(rename = "barData")]
    pub bar_data: Vec<ProgramSatisfaction>,
    #[serde(rename = "donutData")]
    pub donut_data: Vec<DonutSlice>,
}

/// Satisfaction per study program over completed responses, each paired with the
/// maximum score of its question set.
pub fn dashboard<'a, I>(entries: I) -> DashboardStats
where
    I: IntoIterator<Item = (&'a AlumniSurvey, i64)>,
{
    let mut programs: Vec<ProgramSatisfaction> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let (mut puas, mut tidak_puas) = (0i64, 0i64);

    for (response, max_score) in entries {
        if !response.status.is_completed() {
            continue;
        }
        let verdict = satisfaction(response.total_score, max_score);

        let name = match response.study_program.trim() {
            "" => "Lainnya".to_string(),
            other => other.to_string(),
        };
        let slot = *index.entry(name.clone()).or_insert_with(|| {
            programs.push(ProgramSatisfaction {
                name,
                puas: 0,
                tidak_puas: 0,
            });
            programs.len() - 1
        });

        match verdict {
            Satisfaction::Puas => {
                puas += 1;
                programs[slot].puas += 1;
            }
            Satisfaction::TidakPuas => {
                tidak_puas += 1;
                programs[slot].tidak_puas += 1;
            }
        }
    }

    DashboardStats {
        bar_data: programs,
        donut_data: vec![
            DonutSlice {
                name: Satisfaction::Puas.label(),
                value: puas,
                fill: "#22c55e",
            },
            DonutSlice {
                name: Satisfaction::TidakPuas.label(),
                value: tidak_puas,
                fill: "#ef4444",
            },
        ],
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{alumni, items};
    use super::*;
    use crate::domain::models::{
        Question, QuestionOption, QuestionWithOptions, ResponseItem, ResponseStatus, Survey,
        SurveyResponse,
    };
    use crate::domain::scoring::compute_max_score;
    use chrono::Utc;

    fn survey_detail(questions: Vec<QuestionWithOptions>) -> SurveyDetail {
        let now = Utc::now();
        SurveyDetail {
            survey: Survey {
                id: Uuid::nil(),
                label: None,
                title: "Kepuasan Layanan".to_string(),
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
            questions,
        }
    }

    fn question(qtype: QuestionType, labels: &[&str]) -> QuestionWithOptions {
        let id = Uuid::new_v4();
        QuestionWithOptions {
            question: Question {
                id,
                survey_id: Uuid::nil(),
                label: None,
                question: "Q".to_string(),
                question_type: qtype,
                required: false,
                order: 0,
            },
            options: labels
                .iter()
                .enumerate()
                .map(|(i, l)| QuestionOption {
                    id: Uuid::new_v4(),
                    question_id: id,
                    label: l.to_string(),
                    value: l.to_string(),
                    order: i as i32,
                })
                .collect(),
        }
    }

    fn response(items: Vec<(Uuid, Option<Uuid>, Option<&str>)>, status: ResponseStatus) -> ResponseWithItems {
        let id = Uuid::new_v4();
        ResponseWithItems {
            response: SurveyResponse {
                id,
                survey_id: Uuid::nil(),
                user_id: None,
                respondent_name: None,
                respondent_email: None,
                token: None,
                status,
                total_score: 0,
                submitted_at: Some(Utc::now()),
                created_at: Utc::now(),
            },
            items: items
                .into_iter()
                .map(|(question_id, option_id, value)| ResponseItem {
                    id: Uuid::new_v4(),
                    response_id: id,
                    question_id,
                    option_id,
                    value: value.map(str::to_string),
                })
                .collect(),
        }
    }

    #[test]
    fn rounding_is_half_up_to_two_places() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(1, 8), 12.5);
        assert_eq!(percentage(5, 0), 0.0);
    }

    #[test]
    fn choice_percentages_sum_to_one_hundred() {
        let q = question(QuestionType::Single, &["A", "B", "C"]);
        let (qid, a, b, c) = (q.question.id, q.options[0].id, q.options[1].id, q.options[2].id);
        let detail = survey_detail(vec![q]);
        let responses = vec![
            response(vec![(qid, Some(a), None)], ResponseStatus::Completed),
            response(vec![(qid, Some(b), None)], ResponseStatus::Completed),
            response(vec![(qid, Some(c), None)], ResponseStatus::Completed),
        ];

        let report = aggregate_statistics(&detail, &responses);
        assert_eq!(report.survey.total_responses, 3);
        let options = report.statistics[0].options.as_ref().unwrap();
        let sum: f64 = options.iter().map(|o| o.percentage).sum();
        assert!((sum - 100.0).abs() <= 0.05, "sum was {sum}");
        assert_eq!(report.statistics[0].total_answers, 3);
    }

    #[test]
    fn zero_responses_give_zero_percentages() {
        let detail = survey_detail(vec![question(QuestionType::Multiple, &["A", "B"])]);
        let report = aggregate_statistics(&detail, &[]);
        assert_eq!(report.survey.total_responses, 0);
        for option in report.statistics[0].options.as_ref().unwrap() {
            assert_eq!(option.count, 0);
            assert_eq!(option.percentage, 0.0);
        }
    }

    #[test]
    fn text_and_scale_questions_list_literal_answers() {
        let text = question(QuestionType::Text, &[]);
        let scale = question(QuestionType::Scale, &[]);
        let (tid, sid) = (text.question.id, scale.question.id);
        let detail = survey_detail(vec![text, scale]);
        let responses = vec![
            response(vec![(tid, None, Some("Bagus")), (sid, None, Some("4"))], ResponseStatus::Completed),
            response(vec![(sid, None, Some("5"))], ResponseStatus::Completed),
            response(vec![(tid, None, Some("draft"))], ResponseStatus::Pending),
        ];

        let report = aggregate_statistics(&detail, &responses);
        assert_eq!(report.survey.total_responses, 2);
        assert_eq!(report.statistics[0].answers.as_deref(), Some(&["Bagus".to_string()][..]));
        assert_eq!(report.statistics[1].total_answers, 2);
        assert!(report.statistics[1].options.is_none());
    }

    #[test]
    fn layout_follows_question_set() {
        let set = items(&[
            ("Etika", QuestionType::Scale),
            ("Saran", QuestionType::Text),
            ("Kerja Sama", QuestionType::Scale),
        ]);
        let layout = ReportLayout::from_question_set(&set);
        assert_eq!(layout.aspects, vec!["Etika", "Kerja Sama"]);
        assert_eq!(layout.text_columns, vec!["Saran"]);
        assert_eq!(ReportLayout::default_alumni().aspects.len(), 5);
    }

    #[test]
    fn scenario_two_completed_one_pending() {
        let set = items(&[
            ("Etika", QuestionType::Scale),
            ("Keahlian", QuestionType::Scale),
            ("Saran", QuestionType::Text),
        ]);
        assert_eq!(compute_max_score(set.iter().map(|i| i.question_type)), 10);

        let layout = ReportLayout::from_question_set(&set);
        let responses = vec![
            alumni("TI", ResponseStatus::Completed, &[1, 2], &["-"]),
            alumni("TI", ResponseStatus::Completed, &[3, 5], &["ok"]),
            alumni("SI", ResponseStatus::Pending, &[5, 5], &[]),
        ];
        assert_eq!(responses[0].total_score, 3);
        assert_eq!(responses[1].total_score, 8);

        let report = alumni_report(&layout, &responses);
        assert_eq!(report.summary.completed(), 2);
        assert_eq!(report.summary.belum, 1);
        assert_eq!(report.summary.counts.kurang_baik, 2);
        assert_eq!(classification_of(&responses[2]), Classification::Belum);

        // Per-aspect buckets only see completed responses.
        assert_eq!(report.aspects[0].counts.kurang_baik, 1);
        assert_eq!(report.aspects[0].counts.cukup, 1);
        assert_eq!(report.aspects[1].counts.kurang_baik, 1);
        assert_eq!(report.aspects[1].counts.sangat_baik, 1);
        assert_eq!(report.aspect_totals.total(), 4);
    }

    #[test]
    fn report_summary_counts_every_category() {
        let layout = ReportLayout::default_alumni();
        let responses = vec![
            alumni("TI", ResponseStatus::Completed, &[5, 5, 5, 5, 5], &["a", "b"]),
            alumni("TI", ResponseStatus::Completed, &[4, 4, 4, 4, 4], &[]),
            alumni("TI", ResponseStatus::Completed, &[3, 3, 3, 3, 3], &[]),
            alumni("TI", ResponseStatus::Completed, &[2, 2, 2, 2, 2], &[]),
        ];
        let report = alumni_report(&layout, &responses);
        assert_eq!(report.summary.counts.sangat_baik, 1);
        assert_eq!(report.summary.counts.baik, 1);
        assert_eq!(report.summary.counts.cukup, 1);
        assert_eq!(report.summary.counts.kurang_baik, 1);
        for aspect in &report.aspects {
            assert_eq!(aspect.counts.total(), 4);
        }
        assert_eq!(report.aspect_totals.total(), 20);
    }

    #[test]
    fn dashboard_buckets_by_program() {
        let responses = vec![
            alumni("Teknik Informatika", ResponseStatus::Completed, &[5, 5], &[]),
            alumni("Teknik Informatika", ResponseStatus::Completed, &[1, 2], &[]),
            alumni("", ResponseStatus::Completed, &[3, 3], &[]),
            alumni("Sistem Informasi", ResponseStatus::Pending, &[], &[]),
        ];

        let stats = dashboard(responses.iter().map(|r| (r, 10)));
        assert_eq!(stats.bar_data.len(), 2);
        assert_eq!(stats.bar_data[0].name, "Teknik Informatika");
        assert_eq!((stats.bar_data[0].puas, stats.bar_data[0].tidak_puas), (1, 1));
        assert_eq!(stats.bar_data[1].name, "Lainnya");
        assert_eq!(stats.bar_data[1].puas, 1);
        assert_eq!(stats.donut_data[0].value, 2);
        assert_eq!(stats.donut_data[1].value, 1);
    }
}
