// src/handlers/review.rs
//
// Reviewer-facing endpoints: the submission list, the AI bulk-grading pass,
// and the headquarters / personnel-office review submits. Access control is
// role plus headquarters affiliation; the personnel-office route is gated to
// the system administrator at the router.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::exam::Exam,
    models::headquarters::same_headquarters,
    models::submission::{
        Grade, Submission, SubmissionStatus, SubmitReviewRequest,
    },
    models::user::UserRole,
    oracle::ScoringOracle,
    review::aggregate::suggested_outcome,
    review::grading::bulk_grade,
    review::state_machine::{
        ReviewKind, SubmissionUpdate, apply_hq_review, apply_po_review, hq_review_kind,
        po_review_kind,
    },
    store::{self, DocumentStore, collections},
    utils::html::clean_text,
    utils::jwt::Claims,
};

/// Reviewer name recorded on automated draft grades.
const AI_DRAFT_REVIEWER: &str = "AI採点ドラフト";

/// Whether this reviewer may see the submission. Administrators see
/// everything; a headquarters administrator sees their own headquarters
/// under the fuzzy-name rule; examinees see nothing here.
fn can_access(claims: &Claims, submission: &Submission) -> bool {
    match claims.role {
        UserRole::SystemAdministrator => true,
        UserRole::HqAdministrator => {
            let Some(own) = claims.headquarters.as_deref() else {
                return false;
            };
            submission
                .examinee_headquarters
                .as_deref()
                .is_some_and(|hq| same_headquarters(own, hq))
        }
        UserRole::Examinee => false,
    }
}

fn require_access(claims: &Claims, submission: &Submission) -> Result<(), AppError> {
    if can_access(claims, submission) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "この提出を閲覧する権限がありません。".to_string(),
        ))
    }
}

async fn load_submission(
    store: &dyn DocumentStore,
    id: &str,
) -> Result<Submission, AppError> {
    store::fetch_one(store, collections::SUBMISSIONS, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission '{}' not found", id)))
}

/// The exam backing a submission, or `None` for a lesson-only submission
/// (which has no written exam at all).
async fn load_exam(
    store: &dyn DocumentStore,
    submission: &Submission,
) -> Result<Option<Exam>, AppError> {
    if submission.is_lesson_only() {
        return Ok(None);
    }
    store::fetch_one(store, collections::EXAMS, &submission.exam_id).await
}

fn sanitize_request(mut request: SubmitReviewRequest) -> SubmitReviewRequest {
    request.justification = clean_text(&request.justification);
    request.question_justifications = request.question_justifications.map(|map| {
        map.into_iter()
            .map(|(id, text)| (id, clean_text(&text)))
            .collect()
    });
    request.lesson_review_school_name =
        request.lesson_review_school_name.map(|s| clean_text(&s));
    request.lesson_review_classroom_name =
        request.lesson_review_classroom_name.map(|s| clean_text(&s));
    request
}

/// Lists submissions the reviewer may see, newest first.
pub async fn list_submissions(
    State(store): State<Arc<dyn DocumentStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let mut submissions: Vec<Submission> =
        store::fetch_all(store.as_ref(), collections::SUBMISSIONS).await?;
    submissions.retain(|s| can_access(&claims, s));
    submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    Ok(Json(submissions))
}

/// One submission for the review screen. While the personnel office has not
/// decided, a written submission carries a `suggestedOutcome` computed from
/// the headquarters total against the pass mark.
pub async fn get_submission(
    State(store): State<Arc<dyn DocumentStore>>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let submission = load_submission(store.as_ref(), &submission_id).await?;
    require_access(&claims, &submission)?;

    let mut body = serde_json::to_value(&submission)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if submission.final_outcome.is_none()
        && po_review_kind(&submission) == ReviewKind::Written
        && let Some(grade) = &submission.hq_grade
        && let serde_json::Value::Object(map) = &mut body
    {
        map.insert(
            "suggestedOutcome".to_string(),
            serde_json::to_value(suggested_outcome(grade.score))
                .map_err(|e| AppError::InternalServerError(e.to_string()))?,
        );
    }
    Ok(Json(body))
}

/// Runs the AI bulk-grading pass over every gradable question and, when at
/// least one question was graded, persists the result as a draft
/// headquarters grade. The draft never advances the workflow past 本部採点中;
/// a reviewer still has to submit.
pub async fn ai_grade_submission(
    State(store): State<Arc<dyn DocumentStore>>,
    State(oracle): State<Arc<dyn ScoringOracle>>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let submission = load_submission(store.as_ref(), &submission_id).await?;
    require_access(&claims, &submission)?;

    if hq_review_kind(&submission)? != ReviewKind::Written {
        return Err(AppError::BadRequest(
            "AI採点は筆記試験の提出にのみ実行できます。".to_string(),
        ));
    }
    let exam = load_exam(store.as_ref(), &submission).await?.ok_or_else(|| {
        AppError::NotFound(format!("Exam '{}' not found", submission.exam_id))
    })?;

    let outcome = bulk_grade(oracle.as_ref(), &exam, &submission).await;

    if !outcome.graded.is_empty() {
        // AI results overlay whatever draft scores already exist, so a
        // partial manual pass is not thrown away.
        let mut scores: HashMap<String, i64> = submission
            .hq_grade
            .as_ref()
            .and_then(|g| g.scores.clone())
            .unwrap_or_default();
        let mut justifications: HashMap<String, String> = submission
            .hq_grade
            .as_ref()
            .and_then(|g| g.question_justifications.clone())
            .unwrap_or_default();
        for result in &outcome.graded {
            scores.insert(result.question_id.clone(), result.score);
            justifications.insert(result.question_id.clone(), result.justification.clone());
        }

        let update = SubmissionUpdate {
            status: Some(SubmissionStatus::HqGrading),
            hq_grade: Some(Grade {
                score: scores.values().sum(),
                justification: submission
                    .hq_grade
                    .as_ref()
                    .map(|g| g.justification.clone())
                    .unwrap_or_default(),
                reviewer: AI_DRAFT_REVIEWER.to_string(),
                scores: Some(scores),
                question_justifications: Some(justifications),
                lesson_review_items: None,
            }),
            ..Default::default()
        };
        persist_update(store.as_ref(), &submission_id, &update).await?;
    }

    Ok(Json(json!({
        "message": outcome.message(),
        "graded": outcome.graded,
        "skipped": outcome.skipped,
    })))
}

async fn persist_update(
    store: &dyn DocumentStore,
    submission_id: &str,
    update: &SubmissionUpdate,
) -> Result<(), AppError> {
    let patch = serde_json::to_value(update)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    store
        .update_merge(collections::SUBMISSIONS, submission_id, patch)
        .await
}

/// Headquarters review submit. Moves the submission to 人事確認中.
pub async fn submit_hq_review(
    State(store): State<Arc<dyn DocumentStore>>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<String>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let submission = load_submission(store.as_ref(), &submission_id).await?;
    require_access(&claims, &submission)?;

    let exam = load_exam(store.as_ref(), &submission).await?;
    let request = sanitize_request(payload);
    let update = apply_hq_review(exam.as_ref(), &submission, &request, &claims.name)?;
    persist_update(store.as_ref(), &submission_id, &update).await?;

    tracing::info!(
        "HQ review recorded for submission '{}' by '{}'",
        submission_id,
        claims.name
    );
    Ok(Json(json!({
        "message": "本部審査を登録しました。",
        "status": update.status,
    })))
}

/// Personnel-office review submit. The router restricts this to the system
/// administrator.
pub async fn submit_po_review(
    State(store): State<Arc<dyn DocumentStore>>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<String>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let submission = load_submission(store.as_ref(), &submission_id).await?;

    let exam = load_exam(store.as_ref(), &submission).await?;
    let request = sanitize_request(payload);
    let update = apply_po_review(exam.as_ref(), &submission, &request, &claims.name)?;
    persist_update(store.as_ref(), &submission_id, &update).await?;

    tracing::info!(
        "PO review recorded for submission '{}' by '{}'",
        submission_id,
        claims.name
    );
    Ok(Json(json!({
        "message": "人事室審査を登録しました。",
        "status": update.status,
    })))
}
