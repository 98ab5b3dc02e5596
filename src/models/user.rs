// src/models/user.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::submission::validate_employee_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Final-authority actor; the only role allowed to record the
    /// personnel-office grade.
    SystemAdministrator,
    /// Regional headquarters reviewer (first review stage).
    HqAdministrator,
    Examinee,
}

/// Represents a document in the 'users' collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub employee_id: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headquarters: Option<String>,
    /// Argon2 password hash. Present in the stored document; never exposed
    /// through the API (responses use `PublicUser`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// API-facing user shape, without the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub employee_id: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headquarters: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            name: user.name,
            employee_id: user.employee_id,
            role: user.role,
            headquarters: user.headquarters,
        }
    }
}

/// DTO for creating a new user (admin).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(custom(function = validate_employee_id))]
    pub employee_id: String,
    pub role: UserRole,
    #[serde(default)]
    pub headquarters: Option<String>,
    #[validate(length(min = 4, max = 128))]
    pub password: Option<String>,
}

/// DTO for updating an existing user (admin). Omitted fields are untouched.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub role: Option<UserRole>,
    #[serde(default)]
    pub headquarters: Option<String>,
    #[validate(length(min = 4, max = 128))]
    pub password: Option<String>,
}

/// DTO for reviewer login.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(custom(function = validate_employee_id))]
    pub employee_id: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
