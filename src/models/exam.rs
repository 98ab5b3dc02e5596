// src/models/exam.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Publication lifecycle of an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamStatus {
    Draft,
    Published,
    Archived,
}

/// Whether passing the written exam gates a lesson review stage.
///
/// The `Standard`/`Promotion` aliases are legacy values still present in old
/// documents; they are normalized here, at the store boundary, so business
/// logic only ever sees the two canonical variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamType {
    #[serde(alias = "Standard")]
    WrittenOnly,
    #[serde(alias = "Promotion")]
    WrittenAndInterview,
}

/// How the lesson review stage is entered after a written pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LessonReviewType {
    /// Headquarters proposes observation date(s) and a location.
    DateSubmission,
    /// The examinee submits a lesson video URL from their portal.
    UrlSubmission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    Descriptive,
    FillInTheBlank,
    Selection,
}

/// A model answer is a single string, or an ordered list when multiple
/// blanks/answers are expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelAnswer {
    One(String),
    Many(Vec<String>),
}

impl ModelAnswer {
    /// Non-empty, trimmed model answer texts.
    pub fn texts(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            ModelAnswer::One(s) => vec![s.as_str()],
            ModelAnswer::Many(list) => list.iter().map(String::as_str).collect(),
        };
        raw.iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// One exam question. Sub-questions reuse this shape but never nest further.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Stable id, assigned once at exam creation.
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub points: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_answer: Option<ModelAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading_criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_questions: Option<Vec<Question>>,
    /// Descriptive questions expecting several answer slots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_answers: Option<u32>,
}

impl Question {
    /// Maximum score this question can receive: the sum of sub-question
    /// points when sub-questions exist (the top-level value is advisory in
    /// that case), otherwise the question's own points.
    pub fn effective_points(&self) -> i64 {
        match &self.sub_questions {
            Some(subs) if !subs.is_empty() => subs.iter().map(|s| s.points).sum(),
            _ => self.points,
        }
    }

    pub fn model_answer_texts(&self) -> Vec<String> {
        self.model_answer
            .as_ref()
            .map(ModelAnswer::texts)
            .unwrap_or_default()
    }

    /// True when an answer expects an ordered list of texts rather than a
    /// single text, per the declared question shape.
    pub fn expects_multiple_answers(&self) -> bool {
        self.question_type == QuestionType::FillInTheBlank
            || self.number_of_answers.is_some_and(|n| n > 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    #[serde(default)]
    pub id: String,
    pub title: String,
    /// Duration in minutes.
    pub duration: i64,
    pub total_points: i64,
    pub status: ExamStatus,
    #[serde(rename = "type")]
    pub exam_type: ExamType,
    /// Meaningful only when `exam_type` is `WrittenAndInterview`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_review_type: Option<LessonReviewType>,
    pub questions: Vec<Question>,
}

impl Exam {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Sum of per-question effective points, which `total_points` must equal.
    pub fn questions_points_sum(&self) -> i64 {
        self.questions.iter().map(Question::effective_points).sum()
    }
}

/// Question shape served to examinees: grading material stripped.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_questions: Option<Vec<PublicQuestion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_answers: Option<u32>,
}

impl From<Question> for PublicQuestion {
    fn from(question: Question) -> Self {
        PublicQuestion {
            id: question.id,
            text: question.text,
            question_type: question.question_type,
            points: question.points,
            time_limit: question.time_limit,
            options: question.options,
            sub_questions: question
                .sub_questions
                .map(|subs| subs.into_iter().map(PublicQuestion::from).collect()),
            number_of_answers: question.number_of_answers,
        }
    }
}

/// Exam shape served to examinees. `modelAnswer` and `gradingCriteria` never
/// leave the server through this type.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicExam {
    pub id: String,
    pub title: String,
    pub duration: i64,
    pub total_points: i64,
    pub status: ExamStatus,
    #[serde(rename = "type")]
    pub exam_type: ExamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_review_type: Option<LessonReviewType>,
    pub questions: Vec<PublicQuestion>,
}

impl From<Exam> for PublicExam {
    fn from(exam: Exam) -> Self {
        PublicExam {
            id: exam.id,
            title: exam.title,
            duration: exam.duration,
            total_points: exam.total_points,
            status: exam.status,
            exam_type: exam.exam_type,
            lesson_review_type: exam.lesson_review_type,
            questions: exam.questions.into_iter().map(PublicQuestion::from).collect(),
        }
    }
}

/// DTO for creating or replacing an exam (admin).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 1, max = 600))]
    pub duration: i64,
    pub total_points: i64,
    pub status: ExamStatus,
    #[serde(rename = "type")]
    pub exam_type: ExamType,
    #[serde(default)]
    pub lesson_review_type: Option<LessonReviewType>,
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<Question>,
}

fn validate_questions(questions: &[Question]) -> Result<(), validator::ValidationError> {
    if questions.is_empty() {
        return Err(validator::ValidationError::new("questions_cannot_be_empty"));
    }
    for q in questions {
        if q.text.trim().is_empty() {
            return Err(validator::ValidationError::new("question_text_empty"));
        }
        if q.points < 0 {
            return Err(validator::ValidationError::new("question_points_negative"));
        }
        if let Some(subs) = &q.sub_questions {
            for sub in subs {
                if sub.sub_questions.as_ref().is_some_and(|s| !s.is_empty()) {
                    return Err(validator::ValidationError::new("sub_questions_nested"));
                }
                if sub.points < 0 {
                    return Err(validator::ValidationError::new("question_points_negative"));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_exam_types_normalize_to_canonical_variants() {
        let standard: ExamType = serde_json::from_str("\"Standard\"").unwrap();
        assert_eq!(standard, ExamType::WrittenOnly);

        let promotion: ExamType = serde_json::from_str("\"Promotion\"").unwrap();
        assert_eq!(promotion, ExamType::WrittenAndInterview);

        // Canonical values round-trip unchanged.
        let written: ExamType = serde_json::from_str("\"WrittenOnly\"").unwrap();
        assert_eq!(serde_json::to_string(&written).unwrap(), "\"WrittenOnly\"");
    }

    #[test]
    fn effective_points_prefers_sub_question_sum() {
        let sub = |points| Question {
            id: "s".into(),
            text: "sub".into(),
            question_type: QuestionType::Descriptive,
            points,
            time_limit: None,
            options: None,
            model_answer: None,
            grading_criteria: None,
            sub_questions: None,
            number_of_answers: None,
        };
        let mut question = sub(10);
        assert_eq!(question.effective_points(), 10);

        question.sub_questions = Some(vec![sub(4), sub(7)]);
        assert_eq!(question.effective_points(), 11);
    }
}
