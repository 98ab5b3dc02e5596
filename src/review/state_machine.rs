// src/review/state_machine.rs
//
// Owns the status transitions of a submission. Review submits are expressed
// as pure functions from (exam, submission, request) to a partial document
// update; persisting the update is the caller's job. Re-submitting a role's
// review overwrites that role's grade and recomputes the status from the
// same rules, so every transition is idempotent under re-submission.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::PASS_MARK;
use crate::error::AppError;
use crate::models::exam::{Exam, ExamType, LessonReviewType};
use crate::models::submission::{
    FinalOutcome, Grade, Submission, SubmissionStatus, SubmitReviewRequest,
};
use crate::review::aggregate::{suggested_outcome, total_score, validate_scores};
use crate::review::lesson::resolve_item_marks;

/// What a reviewer is judging: written answers or a lesson video/observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewKind {
    Written,
    LessonVideo,
}

/// Partial submission document produced by a review submit. Serialized with
/// absent fields skipped so the store's merge semantics leave everything
/// else untouched.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubmissionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hq_grade: Option<Grade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub po_grade: Option<Grade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_outcome: Option<FinalOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_review_date1: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_review_date2: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_review_school_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_review_classroom_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_review_url: Option<String>,
}

/// What kind of review headquarters may perform at the current status, or an
/// error when the submission is not awaiting headquarters at all.
pub fn hq_review_kind(submission: &Submission) -> Result<ReviewKind, AppError> {
    match submission.status {
        SubmissionStatus::Submitted | SubmissionStatus::HqGrading => Ok(ReviewKind::Written),
        SubmissionStatus::AwaitingLessonReview => Ok(ReviewKind::LessonVideo),
        other => Err(AppError::BadRequest(format!(
            "Submission is not awaiting headquarters review (status: {})",
            other.display_name()
        ))),
    }
}

/// Whether the personnel office is confirming a written grade or a lesson
/// judgement. Derived from the stored headquarters grade, never from caller
/// flags.
pub fn po_review_kind(submission: &Submission) -> ReviewKind {
    let hq_judged_lesson = submission
        .hq_grade
        .as_ref()
        .is_some_and(|g| g.lesson_review_items.is_some());
    if submission.is_lesson_only() || hq_judged_lesson {
        ReviewKind::LessonVideo
    } else {
        ReviewKind::Written
    }
}

/// Headquarters review submit. Persists `hqGrade`; the new status is always
/// 人事確認中. For a written review on a date-submission exam with a passing
/// working total, the proposed first observation date is a hard precondition.
pub fn apply_hq_review(
    exam: Option<&Exam>,
    submission: &Submission,
    request: &SubmitReviewRequest,
    reviewer_name: &str,
) -> Result<SubmissionUpdate, AppError> {
    let kind = hq_review_kind(submission)?;
    let mut update = SubmissionUpdate::default();

    match kind {
        ReviewKind::Written => {
            let exam = exam.ok_or_else(|| {
                AppError::NotFound(format!("Exam '{}' not found", submission.exam_id))
            })?;
            validate_scores(exam, &request.scores)?;
            let total = total_score(&request.scores);

            if exam.exam_type == ExamType::WrittenAndInterview
                && exam.lesson_review_type == Some(LessonReviewType::DateSubmission)
                && total >= PASS_MARK
            {
                if request.lesson_review_date1.is_none() {
                    return Err(AppError::BadRequest(
                        "授業審査の第一希望日時を入力してください。".to_string(),
                    ));
                }
                update.lesson_review_date1 = request.lesson_review_date1;
                update.lesson_review_date2 = request.lesson_review_date2;
                update.lesson_review_school_name = request.lesson_review_school_name.clone();
                update.lesson_review_classroom_name =
                    request.lesson_review_classroom_name.clone();
            }

            update.hq_grade = Some(Grade {
                score: total,
                justification: request.justification.clone(),
                reviewer: reviewer_name.to_string(),
                scores: Some(request.scores.clone()),
                question_justifications: request.question_justifications.clone(),
                lesson_review_items: None,
            });
        }
        ReviewKind::LessonVideo => {
            let title = exam.map(|e| e.title.as_str()).unwrap_or("");
            update.hq_grade = Some(Grade {
                score: 0,
                justification: request.justification.clone(),
                reviewer: reviewer_name.to_string(),
                scores: None,
                question_justifications: None,
                lesson_review_items: Some(resolve_item_marks(
                    title,
                    request.lesson_review_items.as_ref(),
                )),
            });
        }
    }

    update.status = Some(SubmissionStatus::PendingPersonnel);
    Ok(update)
}

/// Personnel-office review submit: persists `poGrade` and the final outcome,
/// and computes the terminal or lesson-gating status.
pub fn apply_po_review(
    exam: Option<&Exam>,
    submission: &Submission,
    request: &SubmitReviewRequest,
    reviewer_name: &str,
) -> Result<SubmissionUpdate, AppError> {
    match submission.status {
        SubmissionStatus::PendingPersonnel
        | SubmissionStatus::Passed
        | SubmissionStatus::Failed => {}
        other => {
            return Err(AppError::BadRequest(format!(
                "Submission is not awaiting personnel-office review (status: {})",
                other.display_name()
            )));
        }
    }

    let mut update = SubmissionUpdate::default();

    match po_review_kind(submission) {
        ReviewKind::LessonVideo => {
            let outcome = request.final_outcome.ok_or_else(|| {
                AppError::BadRequest("A final outcome is required for a lesson review".to_string())
            })?;
            let title = exam.map(|e| e.title.as_str()).unwrap_or("");

            update.po_grade = Some(Grade {
                score: 0,
                justification: request.justification.clone(),
                reviewer: reviewer_name.to_string(),
                scores: None,
                question_justifications: None,
                lesson_review_items: Some(resolve_item_marks(
                    title,
                    request.lesson_review_items.as_ref(),
                )),
            });
            update.final_outcome = Some(outcome);
            update.status = Some(match outcome {
                FinalOutcome::Passed => SubmissionStatus::Passed,
                FinalOutcome::Failed => SubmissionStatus::Failed,
            });
        }
        ReviewKind::Written => {
            let exam = exam.ok_or_else(|| {
                AppError::NotFound(format!("Exam '{}' not found", submission.exam_id))
            })?;
            validate_scores(exam, &request.scores)?;
            let total = total_score(&request.scores);
            let outcome = request
                .final_outcome
                .unwrap_or_else(|| suggested_outcome(total));

            update.po_grade = Some(Grade {
                score: total,
                justification: request.justification.clone(),
                reviewer: reviewer_name.to_string(),
                scores: Some(request.scores.clone()),
                question_justifications: request.question_justifications.clone(),
                lesson_review_items: None,
            });
            update.final_score = Some(total);
            update.final_outcome = Some(outcome);

            update.status = Some(match outcome {
                FinalOutcome::Failed => SubmissionStatus::Failed,
                FinalOutcome::Passed => match (exam.exam_type, exam.lesson_review_type) {
                    (ExamType::WrittenAndInterview, Some(LessonReviewType::DateSubmission)) => {
                        SubmissionStatus::AwaitingLessonReview
                    }
                    // UrlSubmission: passed, and the examinee's portal now
                    // accepts a lesson video URL for this submission.
                    (ExamType::WrittenAndInterview, _) => SubmissionStatus::Passed,
                    (ExamType::WrittenOnly, _) => SubmissionStatus::Passed,
                },
            });
        }
    }

    Ok(update)
}
