// src/handlers/admin.rs
//
// Administrator-only management surface: exam CRUD, user and headquarters
// management, submission maintenance, and the CSV export. The router layers
// `admin_middleware` over all of these.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::exam::{Exam, Question, UpsertExamRequest},
    models::headquarters::{CreateHeadquartersRequest, Headquarters},
    models::submission::Submission,
    models::user::{CreateUserRequest, PublicUser, UpdateUserRequest, User},
    store::{self, DocumentStore, collections},
    utils::csv::submissions_csv,
    utils::hash::hash_password,
};

// ---------------------------------------------------------------------------
// Exams
// ---------------------------------------------------------------------------

/// Assigns a stable uuid to every question (and sub-question) that arrived
/// without one. Ids already present are kept so grades keyed by question id
/// survive exam edits.
fn assign_question_ids(questions: &mut [Question]) {
    for question in questions {
        if question.id.is_empty() {
            question.id = Uuid::new_v4().to_string();
        }
        if let Some(subs) = &mut question.sub_questions {
            for sub in subs {
                if sub.id.is_empty() {
                    sub.id = Uuid::new_v4().to_string();
                }
            }
        }
    }
}

fn exam_from_request(id: String, payload: UpsertExamRequest) -> Result<Exam, AppError> {
    let mut exam = Exam {
        id,
        title: payload.title,
        duration: payload.duration,
        total_points: payload.total_points,
        status: payload.status,
        exam_type: payload.exam_type,
        lesson_review_type: payload.lesson_review_type,
        questions: payload.questions,
    };
    assign_question_ids(&mut exam.questions);

    let sum = exam.questions_points_sum();
    if exam.total_points != sum {
        return Err(AppError::BadRequest(format!(
            "totalPoints ({}) must equal the sum of question points ({})",
            exam.total_points, sum
        )));
    }
    Ok(exam)
}

pub async fn list_exams(
    State(store): State<Arc<dyn DocumentStore>>,
) -> Result<impl IntoResponse, AppError> {
    let exams: Vec<Exam> = store::fetch_all(store.as_ref(), collections::EXAMS).await?;
    Ok(Json(exams))
}

pub async fn create_exam(
    State(store): State<Arc<dyn DocumentStore>>,
    Json(payload): Json<UpsertExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let exam = exam_from_request(String::new(), payload)?;
    let body = store::to_document(&exam)?;
    let id = store.insert(collections::EXAMS, body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn update_exam(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(exam_id): Path<String>,
    Json(payload): Json<UpsertExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let _existing: Exam = store::fetch_one(store.as_ref(), collections::EXAMS, &exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam '{}' not found", exam_id)))?;

    let exam = exam_from_request(exam_id.clone(), payload)?;
    let body = store::to_document(&exam)?;
    // Full replace in one write: questions may have been removed, which a
    // merge would keep, and a failed write must leave the prior exam intact.
    store.replace(collections::EXAMS, &exam_id, body).await?;
    Ok(Json(json!({ "id": exam_id })))
}

pub async fn delete_exam(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store.delete(collections::EXAMS, &exam_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub async fn list_users(
    State(store): State<Arc<dyn DocumentStore>>,
) -> Result<impl IntoResponse, AppError> {
    let users: Vec<User> = store::fetch_all(store.as_ref(), collections::USERS).await?;
    let public: Vec<PublicUser> = users.into_iter().map(PublicUser::from).collect();
    Ok(Json(public))
}

pub async fn create_user(
    State(store): State<Arc<dyn DocumentStore>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let users: Vec<User> = store::fetch_all(store.as_ref(), collections::USERS).await?;
    if users.iter().any(|u| u.employee_id == payload.employee_id) {
        return Err(AppError::Conflict(format!(
            "Employee id '{}' is already registered",
            payload.employee_id
        )));
    }

    let password = payload
        .password
        .as_deref()
        .map(hash_password)
        .transpose()?;

    let user = User {
        id: String::new(),
        name: payload.name,
        employee_id: payload.employee_id,
        role: payload.role,
        headquarters: payload.headquarters,
        password,
    };
    let body = store::to_document(&user)?;
    let id = store.insert(collections::USERS, body).await?;

    let created = PublicUser::from(User { id, ..user });
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_user(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let _existing: User = store::fetch_one(store.as_ref(), collections::USERS, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", user_id)))?;

    let password = payload
        .password
        .as_deref()
        .map(hash_password)
        .transpose()?;

    let patch = json!({
        "name": payload.name,
        "role": payload.role,
        "headquarters": payload.headquarters,
        "password": password,
    });
    store.update_merge(collections::USERS, &user_id, patch).await?;

    let updated: User = store::fetch_one(store.as_ref(), collections::USERS, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", user_id)))?;
    Ok(Json(PublicUser::from(updated)))
}

pub async fn delete_user(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store.delete(collections::USERS, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Headquarters
// ---------------------------------------------------------------------------

pub async fn list_headquarters(
    State(store): State<Arc<dyn DocumentStore>>,
) -> Result<impl IntoResponse, AppError> {
    let headquarters: Vec<Headquarters> =
        store::fetch_all(store.as_ref(), collections::HEADQUARTERS).await?;
    Ok(Json(headquarters))
}

pub async fn create_headquarters(
    State(store): State<Arc<dyn DocumentStore>>,
    Json(payload): Json<CreateHeadquartersRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let headquarters = Headquarters {
        code: payload.code.clone(),
        name: payload.name,
    };
    let body = store::to_document(&headquarters)?;
    store
        .insert_with_id(collections::HEADQUARTERS, &payload.code, body)
        .await?;
    Ok((StatusCode::CREATED, Json(headquarters)))
}

pub async fn delete_headquarters(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store.delete(collections::HEADQUARTERS, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Submission maintenance
// ---------------------------------------------------------------------------

pub async fn delete_submission(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(submission_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store.delete(collections::SUBMISSIONS, &submission_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultCommunicatedRequest {
    pub result_communicated: bool,
}

/// Marks whether the result has been communicated to the examinee. A bare
/// bookkeeping flag: it never touches the workflow status.
pub async fn set_result_communicated(
    State(store): State<Arc<dyn DocumentStore>>,
    Path(submission_id): Path<String>,
    Json(payload): Json<ResultCommunicatedRequest>,
) -> Result<impl IntoResponse, AppError> {
    let _existing: Submission =
        store::fetch_one(store.as_ref(), collections::SUBMISSIONS, &submission_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Submission '{}' not found", submission_id))
            })?;

    store
        .update_merge(
            collections::SUBMISSIONS,
            &submission_id,
            json!({ "resultCommunicated": payload.result_communicated }),
        )
        .await?;
    Ok(Json(json!({ "resultCommunicated": payload.result_communicated })))
}

/// Exports the whole submission list as CSV, newest first.
pub async fn export_submissions(
    State(store): State<Arc<dyn DocumentStore>>,
) -> Result<impl IntoResponse, AppError> {
    let exams: Vec<Exam> = store::fetch_all(store.as_ref(), collections::EXAMS).await?;
    let mut submissions: Vec<Submission> =
        store::fetch_all(store.as_ref(), collections::SUBMISSIONS).await?;
    submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

    let csv = submissions_csv(&exams, &submissions);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"submissions.csv\"",
            ),
        ],
        csv,
    ))
}
