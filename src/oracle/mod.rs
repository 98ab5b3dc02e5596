// src/oracle/mod.rs
//
// The scoring oracle: an external AI grading service that, given a question,
// its model answers/criteria, and the examinee's answer texts, returns an
// integer score in [0, points] and a textual justification.

pub mod chat;

pub use chat::ChatCompletionOracle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Sub-question context passed inline with its parent question.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubQuestionContext {
    pub text: String,
    pub points: i64,
    pub model_answers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grading_criteria: Option<String>,
    pub answer_texts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeAnswerRequest {
    pub question_text: String,
    pub model_answers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grading_criteria: Option<String>,
    pub answer_texts: Vec<String>,
    /// Maximum score; the sum of sub-question points when sub-questions are
    /// present.
    pub points: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_questions: Vec<SubQuestionContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradeAnswerResponse {
    pub score: i64,
    pub justification: String,
}

#[async_trait]
pub trait ScoringOracle: Send + Sync {
    async fn grade_answer(
        &self,
        request: &GradeAnswerRequest,
    ) -> Result<GradeAnswerResponse, AppError>;
}
