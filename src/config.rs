// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Working total at or above this mark suggests a Passed outcome.
pub const PASS_MARK: i64 = 80;

/// Sentinel exam id for submissions that carry only a lesson video URL
/// and never went through a written exam.
pub const LESSON_ONLY_EXAM_ID: &str = "lesson-review-only";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_employee_id: Option<String>,
    pub admin_password: Option<String>,
    // --- Scoring oracle (OpenAI-compatible chat completions) ---
    pub oracle_api_base_url: String,
    pub oracle_api_key: String,
    pub oracle_model_name: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:exam_admin.db".to_string());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8 * 3600);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_employee_id: env::var("ADMIN_EMPLOYEE_ID").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            oracle_api_base_url: env::var("ORACLE_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            oracle_api_key: env::var("ORACLE_API_KEY").unwrap_or_default(),
            oracle_model_name: env::var("ORACLE_MODEL_NAME")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        }
    }
}
