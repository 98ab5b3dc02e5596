// src/routes.rs

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{admin, auth, exams, review, submissions};
use crate::state::AppState;
use crate::utils::jwt::{admin_middleware, auth_middleware};

/// Builds the application router.
///
/// Three surfaces: the public examinee API, the authenticated review API,
/// and the admin API (authenticated and restricted to the system
/// administrator).
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/exams", get(exams::list_published_exams))
        .route("/api/exams/{id}", get(exams::get_exam))
        .route("/api/submissions", post(submissions::create_submission))
        .route(
            "/api/submissions/lesson-only",
            post(submissions::create_lesson_only_submission),
        )
        .route(
            "/api/submissions/{id}/lesson-url",
            post(submissions::attach_lesson_url),
        );

    let review_routes = Router::new()
        .route("/api/review/submissions", get(review::list_submissions))
        .route("/api/review/submissions/{id}", get(review::get_submission))
        .route(
            "/api/review/submissions/{id}/ai-grade",
            post(review::ai_grade_submission),
        )
        .route(
            "/api/review/submissions/{id}/hq",
            post(review::submit_hq_review),
        );

    // The personnel-office grade is the final authority; admin only.
    let po_routes = Router::new()
        .route(
            "/api/review/submissions/{id}/po",
            post(review::submit_po_review),
        )
        .route_layer(middleware::from_fn(admin_middleware));

    let admin_routes = Router::new()
        .route("/api/admin/exams", get(admin::list_exams).post(admin::create_exam))
        .route(
            "/api/admin/exams/{id}",
            put(admin::update_exam).delete(admin::delete_exam),
        )
        .route(
            "/api/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route(
            "/api/admin/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route(
            "/api/admin/headquarters",
            get(admin::list_headquarters).post(admin::create_headquarters),
        )
        .route(
            "/api/admin/headquarters/{code}",
            delete(admin::delete_headquarters),
        )
        .route(
            "/api/admin/submissions/{id}",
            delete(admin::delete_submission),
        )
        .route(
            "/api/admin/submissions/{id}/result-communicated",
            put(admin::set_result_communicated),
        )
        .route(
            "/api/admin/submissions/export",
            get(admin::export_submissions),
        )
        .route_layer(middleware::from_fn(admin_middleware));

    let protected_routes = review_routes
        .merge(po_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
