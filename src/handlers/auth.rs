// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, User},
    store::{self, DocumentStore, collections},
    utils::{hash::verify_password, jwt::sign_jwt},
};

/// Authenticates a reviewer and returns a JWT token.
///
/// Looks the user up by employee id and verifies the Argon2 password hash.
/// The signed token carries the full reviewer context (name, role,
/// headquarters) so handlers never read identity from ambient state.
pub async fn login(
    State(store): State<Arc<dyn DocumentStore>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let users: Vec<User> = store::fetch_all(store.as_ref(), collections::USERS).await?;
    let user = users
        .into_iter()
        .find(|u| u.employee_id == payload.employee_id)
        .ok_or_else(|| AppError::AuthError("User not found".to_string()))?;

    let password_hash = user
        .password
        .as_deref()
        .ok_or_else(|| AppError::AuthError("Password login is not enabled".to_string()))?;

    if !verify_password(&payload.password, password_hash)? {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let token = sign_jwt(&user, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "name": user.name,
        "role": user.role,
    })))
}
