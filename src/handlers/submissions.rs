// src/handlers/submissions.rs
//
// Examinee-facing submission intake: finishing a written exam, submitting a
// lesson video directly, and attaching a video URL after a written pass.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    config::LESSON_ONLY_EXAM_ID,
    error::AppError,
    models::exam::{Exam, ExamStatus, LessonReviewType},
    models::submission::{
        Answer, AnswerValue, AttachLessonUrlRequest, CreateSubmissionRequest,
        LessonOnlySubmissionRequest, Submission, SubmissionStatus,
    },
    store::{self, DocumentStore, collections},
    utils::html::clean_text,
};

fn sanitize_value(value: AnswerValue) -> AnswerValue {
    match value {
        AnswerValue::Text(s) => AnswerValue::Text(clean_text(&s)),
        AnswerValue::MultiText(list) => {
            AnswerValue::MultiText(list.iter().map(|s| clean_text(s)).collect())
        }
    }
}

/// Coerces each answer to the shape its question declares and sanitizes the
/// free text. Answers referencing unknown question ids are dropped.
fn normalize_answers(exam: &Exam, answers: Vec<Answer>) -> Vec<Answer> {
    answers
        .into_iter()
        .filter_map(|answer| {
            let question = exam.question(&answer.question_id)?;
            let sub_answers = answer.sub_answers.map(|subs| {
                subs.into_iter()
                    .filter_map(|sub| {
                        let sub_question = question
                            .sub_questions
                            .as_ref()?
                            .iter()
                            .find(|q| q.id == sub.question_id)?;
                        Some(Answer {
                            question_id: sub.question_id,
                            value: sanitize_value(sub.value.coerce_for(sub_question)),
                            sub_answers: None,
                        })
                    })
                    .collect()
            });
            Some(Answer {
                question_id: answer.question_id,
                value: sanitize_value(answer.value.coerce_for(question)),
                sub_answers,
            })
        })
        .collect()
}

/// Creates a submission when an examinee finishes a written exam.
/// `submittedAt` is set here, once, and never changes afterwards.
pub async fn create_submission(
    State(store): State<Arc<dyn DocumentStore>>,
    Json(payload): Json<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let exam: Exam = store::fetch_one(store.as_ref(), collections::EXAMS, &payload.exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam '{}' not found", payload.exam_id)))?;
    if exam.status != ExamStatus::Published {
        return Err(AppError::BadRequest(
            "Exam is not open for submissions".to_string(),
        ));
    }

    let submission = Submission {
        id: String::new(),
        exam_id: payload.exam_id,
        examinee_id: payload.examinee_id,
        examinee_name: clean_text(&payload.examinee_name),
        examinee_headquarters: payload.examinee_headquarters,
        submitted_at: Utc::now(),
        answers: normalize_answers(&exam, payload.answers),
        status: SubmissionStatus::Submitted,
        hq_grade: None,
        po_grade: None,
        final_score: None,
        final_outcome: None,
        lesson_review_url: None,
        lesson_review_date1: None,
        lesson_review_date2: None,
        lesson_review_school_name: None,
        lesson_review_classroom_name: None,
        result_communicated: false,
    };

    let body = store::to_document(&submission)?;
    let id = store.insert(collections::SUBMISSIONS, body).await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Creates a lesson-video-only submission (no written exam). It starts
/// directly in 授業審査待ち and is judged by headquarters, then the
/// personnel office.
pub async fn create_lesson_only_submission(
    State(store): State<Arc<dyn DocumentStore>>,
    Json(payload): Json<LessonOnlySubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let submission = Submission {
        id: String::new(),
        exam_id: LESSON_ONLY_EXAM_ID.to_string(),
        examinee_id: payload.employee_id,
        examinee_name: clean_text(&payload.name),
        examinee_headquarters: Some(payload.headquarters),
        submitted_at: Utc::now(),
        answers: vec![],
        status: SubmissionStatus::AwaitingLessonReview,
        hq_grade: None,
        po_grade: None,
        final_score: None,
        final_outcome: None,
        lesson_review_url: Some(payload.lesson_review_url),
        lesson_review_date1: None,
        lesson_review_date2: None,
        lesson_review_school_name: None,
        lesson_review_classroom_name: None,
        result_communicated: false,
    };

    let body = store::to_document(&submission)?;
    let id = store.insert(collections::SUBMISSIONS, body).await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Attaches a lesson video URL from the examinee portal. Accepted only while
/// the submission is in the awaiting-URL condition: a written pass on a
/// UrlSubmission exam with no URL yet. Attaching the URL hands the
/// submission to headquarters for the lesson review.
pub async fn attach_lesson_url(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(submission_id): Path<String>,
    Json(payload): Json<AttachLessonUrlRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let submission: Submission =
        store::fetch_one(store.as_ref(), collections::SUBMISSIONS, &submission_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Submission '{}' not found", submission_id))
            })?;

    let exam: Option<Exam> = if submission.is_lesson_only() {
        None
    } else {
        store::fetch_one(store.as_ref(), collections::EXAMS, &submission.exam_id).await?
    };

    let url_submission_exam = exam
        .as_ref()
        .is_some_and(|e| e.lesson_review_type == Some(LessonReviewType::UrlSubmission));
    let awaiting_url = url_submission_exam
        && submission.lesson_review_url.is_none()
        && matches!(
            submission.status,
            SubmissionStatus::Passed | SubmissionStatus::AwaitingLessonReview
        );

    if !awaiting_url {
        return Err(AppError::BadRequest(
            "この試験はURL提出の対象外か、既に提出済みです。".to_string(),
        ));
    }

    store
        .update_merge(
            collections::SUBMISSIONS,
            &submission_id,
            json!({
                "lessonReviewUrl": payload.lesson_review_url,
                "status": SubmissionStatus::AwaitingLessonReview,
            }),
        )
        .await?;

    Ok(Json(json!({ "message": "授業審査の動画URLを提出しました。" })))
}
