// src/review/aggregate.rs

use std::collections::HashMap;

use crate::config::PASS_MARK;
use crate::error::AppError;
use crate::models::exam::Exam;
use crate::models::submission::FinalOutcome;

/// Total score of a per-question score map. Questions with no entered score
/// contribute 0; re-aggregating the same map is idempotent.
pub fn total_score(scores: &HashMap<String, i64>) -> i64 {
    scores.values().sum()
}

/// Rejects score maps referencing unknown questions or exceeding a
/// question's effective points (sub-question sums when present).
pub fn validate_scores(exam: &Exam, scores: &HashMap<String, i64>) -> Result<(), AppError> {
    for (question_id, score) in scores {
        let question = exam.question(question_id).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown question id '{}'", question_id))
        })?;
        let max = question.effective_points();
        if *score < 0 || *score > max {
            return Err(AppError::BadRequest(format!(
                "Score {} for question '{}' is outside [0, {}]",
                score, question_id, max
            )));
        }
    }
    Ok(())
}

/// Advisory pass/fail suggestion used until the personnel office explicitly
/// picks an outcome.
pub fn suggested_outcome(total: i64) -> FinalOutcome {
    if total >= PASS_MARK {
        FinalOutcome::Passed
    } else {
        FinalOutcome::Failed
    }
}
