// src/review/grading.rs
//
// The AI bulk-grading pass. One scoring-oracle call per gradable question,
// fanned out concurrently and joined before anything is reported; a
// per-question failure skips that question and never fails the pass.

use futures::future::join_all;
use serde::Serialize;

use crate::models::exam::{Exam, Question};
use crate::models::submission::{Answer, Submission};
use crate::oracle::{GradeAnswerRequest, ScoringOracle, SubQuestionContext};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionGradeResult {
    pub question_id: String,
    pub score: i64,
    pub justification: String,
}

#[derive(Debug, Default)]
pub struct BulkGradeOutcome {
    pub graded: Vec<QuestionGradeResult>,
    /// Questions left unscored: no answer, no model answer, or an oracle
    /// failure. A deliberate skip, not an error.
    pub skipped: Vec<String>,
}

impl BulkGradeOutcome {
    pub fn message(&self) -> &'static str {
        if self.graded.is_empty() {
            "採点対象の問題がありませんでした。"
        } else {
            "AI一括採点が完了しました。"
        }
    }
}

/// Builds the oracle request for one top-level question, or `None` when the
/// question is not gradable (no non-empty answer text or no non-empty model
/// answer). Sub-question context is passed inline.
fn build_request(question: &Question, answer: Option<&Answer>) -> Option<GradeAnswerRequest> {
    let answer = answer?;
    let answer_texts = answer.value.texts();
    let model_answers = question.model_answer_texts();

    let sub_questions: Vec<SubQuestionContext> = question
        .sub_questions
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|sub| SubQuestionContext {
            text: sub.text.clone(),
            points: sub.points,
            model_answers: sub.model_answer_texts(),
            grading_criteria: sub.grading_criteria.clone(),
            answer_texts: answer
                .sub_answer(&sub.id)
                .map(|a| a.value.texts())
                .unwrap_or_default(),
        })
        .collect();

    let has_answer = !answer_texts.is_empty()
        || sub_questions.iter().any(|s| !s.answer_texts.is_empty());
    let has_model_answer = !model_answers.is_empty()
        || sub_questions.iter().any(|s| !s.model_answers.is_empty());
    if !has_answer || !has_model_answer {
        return None;
    }

    Some(GradeAnswerRequest {
        question_text: question.text.clone(),
        model_answers,
        grading_criteria: question.grading_criteria.clone(),
        answer_texts,
        points: question.effective_points(),
        sub_questions,
    })
}

/// Runs the bulk pass to completion: there is no cancellation, and all
/// per-question futures are joined before the outcome is assembled.
pub async fn bulk_grade(
    oracle: &dyn ScoringOracle,
    exam: &Exam,
    submission: &Submission,
) -> BulkGradeOutcome {
    let mut outcome = BulkGradeOutcome::default();
    let mut tasks = Vec::new();

    for question in &exam.questions {
        match build_request(question, submission.answer(&question.id)) {
            Some(request) => {
                let question_id = question.id.clone();
                let max = question.effective_points();
                tasks.push(async move {
                    let result = oracle.grade_answer(&request).await;
                    (question_id, max, result)
                });
            }
            None => outcome.skipped.push(question.id.clone()),
        }
    }

    for (question_id, max, result) in join_all(tasks).await {
        match result {
            Ok(graded) if (0..=max).contains(&graded.score) => {
                outcome.graded.push(QuestionGradeResult {
                    question_id,
                    score: graded.score,
                    justification: graded.justification,
                });
            }
            Ok(graded) => {
                tracing::warn!(
                    "Oracle score {} for question '{}' is outside [0, {}]; skipping",
                    graded.score,
                    question_id,
                    max
                );
                outcome.skipped.push(question_id);
            }
            Err(e) => {
                tracing::warn!("Oracle failed for question '{}': {}", question_id, e);
                outcome.skipped.push(question_id);
            }
        }
    }

    outcome
}
