// src/handlers/exams.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::exam::{Exam, ExamStatus, PublicExam},
    store::{self, DocumentStore, collections},
};

/// Lists exams an examinee can take (published only, grading material
/// stripped).
pub async fn list_published_exams(
    State(store): State<Arc<dyn DocumentStore>>,
) -> Result<impl IntoResponse, AppError> {
    let exams: Vec<Exam> = store::fetch_all(store.as_ref(), collections::EXAMS).await?;
    let published: Vec<PublicExam> = exams
        .into_iter()
        .filter(|e| e.status == ExamStatus::Published)
        .map(PublicExam::from)
        .collect();
    Ok(Json(published))
}

/// Fetches one exam for the exam-taking view. Model answers and grading
/// criteria stay server-side; reviewers read the full document through the
/// admin API instead.
pub async fn get_exam(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam: Exam = store::fetch_one(store.as_ref(), collections::EXAMS, &exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam '{}' not found", exam_id)))?;
    Ok(Json(PublicExam::from(exam)))
}
