// src/models/submission.rs

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::LESSON_ONLY_EXAM_ID;
use crate::models::exam::Question;

/// Review workflow state of a submission. Serialized with the exact strings
/// stored by the legacy documents, including the Japanese stage names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Written answers awaiting headquarters review.
    Submitted,
    /// Headquarters review in progress.
    #[serde(rename = "本部採点中")]
    HqGrading,
    /// Headquarters grade recorded, awaiting the personnel office.
    #[serde(rename = "人事確認中")]
    PendingPersonnel,
    /// Awaiting the lesson review stage (video or scheduled observation).
    #[serde(rename = "授業審査待ち")]
    AwaitingLessonReview,
    #[serde(rename = "合格")]
    Passed,
    #[serde(rename = "不合格")]
    Failed,
}

impl SubmissionStatus {
    /// Localized name shown in lists and CSV exports. `Submitted` displays
    /// as 本部採点中: the distinction only matters to the state machine.
    pub fn display_name(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted | SubmissionStatus::HqGrading => "本部採点中",
            SubmissionStatus::PendingPersonnel => "人事確認中",
            SubmissionStatus::AwaitingLessonReview => "授業審査待ち",
            SubmissionStatus::Passed => "合格",
            SubmissionStatus::Failed => "不合格",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalOutcome {
    Passed,
    Failed,
}

/// Pass/fail mark for one lesson-review checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LessonItemOutcome {
    Passed,
    Failed,
    NotSelected,
}

/// An answer value is a single text or an ordered list of texts. The wire
/// shape is untagged; [`AnswerValue::coerce_for`] resolves the final shape
/// from the question's declared type, never from the runtime shape alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    MultiText(Vec<String>),
}

impl AnswerValue {
    /// Non-empty, trimmed answer texts.
    pub fn texts(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            AnswerValue::Text(s) => vec![s.as_str()],
            AnswerValue::MultiText(list) => list.iter().map(String::as_str).collect(),
        };
        raw.iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Resolves the stored shape from the question's declaration: questions
    /// expecting multiple answer slots always store a list, everything else
    /// stores a single text (the first list element when a list arrived).
    pub fn coerce_for(self, question: &Question) -> AnswerValue {
        if question.expects_multiple_answers() {
            match self {
                AnswerValue::Text(s) => AnswerValue::MultiText(vec![s]),
                multi @ AnswerValue::MultiText(_) => multi,
            }
        } else {
            match self {
                text @ AnswerValue::Text(_) => text,
                AnswerValue::MultiText(list) => {
                    AnswerValue::Text(list.into_iter().next().unwrap_or_default())
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub value: AnswerValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_answers: Option<Vec<Answer>>,
}

impl Answer {
    pub fn sub_answer(&self, sub_question_id: &str) -> Option<&Answer> {
        self.sub_answers
            .as_ref()?
            .iter()
            .find(|a| a.question_id == sub_question_id)
    }
}

/// A recorded review: either a written-answer grade (per-question scores and
/// justifications) or a lesson-video judgement (per-item pass/fail map).
/// The two maps are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub score: i64,
    pub justification: String,
    pub reviewer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<HashMap<String, i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_justifications: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_review_items: Option<HashMap<String, LessonItemOutcome>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default)]
    pub id: String,
    /// Exam id, or [`LESSON_ONLY_EXAM_ID`] when the examinee submitted a
    /// lesson video URL directly without a written exam.
    pub exam_id: String,
    pub examinee_id: String,
    pub examinee_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examinee_headquarters: Option<String>,
    /// Set once at creation, immutable thereafter.
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub answers: Vec<Answer>,
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hq_grade: Option<Grade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_grade: Option<Grade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_outcome: Option<FinalOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_review_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_review_date1: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_review_date2: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_review_school_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_review_classroom_name: Option<String>,
    /// Whether the result has been communicated to the examinee. Independent
    /// of the review workflow.
    #[serde(default)]
    pub result_communicated: bool,
}

impl Submission {
    pub fn is_lesson_only(&self) -> bool {
        self.exam_id == LESSON_ONLY_EXAM_ID
    }

    pub fn answer(&self, question_id: &str) -> Option<&Answer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }
}

static EMPLOYEE_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{8}$").unwrap());

pub fn validate_employee_id(employee_id: &str) -> Result<(), validator::ValidationError> {
    if !EMPLOYEE_ID_RE.is_match(employee_id) {
        return Err(validator::ValidationError::new("employee_id_must_be_8_digits"));
    }
    Ok(())
}

/// DTO for an examinee finishing a written exam.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmissionRequest {
    #[validate(length(min = 1))]
    pub exam_id: String,
    #[validate(custom(function = validate_employee_id))]
    pub examinee_id: String,
    #[validate(length(min = 1, max = 100))]
    pub examinee_name: String,
    #[serde(default)]
    pub examinee_headquarters: Option<String>,
    pub answers: Vec<Answer>,
}

/// DTO for a direct lesson-video submission (no written exam).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LessonOnlySubmissionRequest {
    #[validate(custom(function = validate_employee_id))]
    pub employee_id: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub headquarters: String,
    #[validate(url)]
    pub lesson_review_url: String,
}

/// DTO for the examinee portal attaching a lesson video URL after a written
/// pass on a UrlSubmission exam.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttachLessonUrlRequest {
    #[validate(url)]
    pub lesson_review_url: String,
}

/// DTO shared by headquarters and personnel-office review submits.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    #[serde(default)]
    pub justification: String,
    /// Per-question scores keyed by question id (written reviews).
    #[serde(default)]
    pub scores: HashMap<String, i64>,
    #[serde(default)]
    pub question_justifications: Option<HashMap<String, String>>,
    /// Explicit pass/fail (personnel office); omitted means "use the
    /// suggested outcome" for written reviews.
    #[serde(default)]
    pub final_outcome: Option<FinalOutcome>,
    #[serde(default)]
    pub lesson_review_date1: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lesson_review_date2: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lesson_review_school_name: Option<String>,
    #[serde(default)]
    pub lesson_review_classroom_name: Option<String>,
    /// Checklist marks (lesson-video reviews).
    #[serde(default)]
    pub lesson_review_items: Option<HashMap<String, LessonItemOutcome>>,
}
