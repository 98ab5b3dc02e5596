// tests/review_flow_tests.rs

use std::sync::Arc;

use async_trait::async_trait;
use exam_admin::{
    config::Config,
    error::AppError,
    models::user::{User, UserRole},
    oracle::{GradeAnswerRequest, GradeAnswerResponse, ScoringOracle},
    routes,
    state::AppState,
    store::{self, DocumentStore, MemoryStore, collections},
    utils::hash::hash_password,
};

/// Scripted oracle for tests: scores every request at half its points.
struct HalfPointsOracle;

#[async_trait]
impl ScoringOracle for HalfPointsOracle {
    async fn grade_answer(
        &self,
        request: &GradeAnswerRequest,
    ) -> Result<GradeAnswerResponse, AppError> {
        Ok(GradeAnswerResponse {
            score: request.points / 2,
            justification: "半分一致".to_string(),
        })
    }
}

struct TestApp {
    address: String,
    store: Arc<dyn DocumentStore>,
    client: reqwest::Client,
}

/// Spawns the app on a random port with an in-memory store and the scripted
/// oracle. Returns the base URL and the store handle for direct seeding.
async fn spawn_app() -> TestApp {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_employee_id: None,
        admin_password: None,
        oracle_api_base_url: "http://127.0.0.1:1".to_string(),
        oracle_api_key: String::new(),
        oracle_model_name: "test".to_string(),
    };

    let state = AppState {
        store: store.clone(),
        oracle: Arc::new(HalfPointsOracle),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        store,
        client: reqwest::Client::new(),
    }
}

async fn seed_user(
    app: &TestApp,
    employee_id: &str,
    name: &str,
    role: UserRole,
    headquarters: Option<&str>,
) {
    let user = User {
        id: String::new(),
        name: name.to_string(),
        employee_id: employee_id.to_string(),
        role,
        headquarters: headquarters.map(str::to_string),
        password: Some(hash_password("password123").unwrap()),
    };
    let body = store::to_document(&user).unwrap();
    app.store.insert(collections::USERS, body).await.unwrap();
}

async fn login(app: &TestApp, employee_id: &str) -> String {
    let response = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({
            "employeeId": employee_id,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200, "login must succeed");
    let body: serde_json::Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Two descriptive questions worth 50 points each; q2 has no model answer.
async fn seed_exam(app: &TestApp, id: &str, exam_type: &str, lesson_review_type: Option<&str>) {
    let mut exam = serde_json::json!({
        "title": "昇格試験",
        "duration": 60,
        "totalPoints": 100,
        "status": "Published",
        "type": exam_type,
        "questions": [
            {"id": "q1", "text": "問1", "type": "descriptive", "points": 50, "modelAnswer": "模範解答"},
            {"id": "q2", "text": "問2", "type": "descriptive", "points": 50}
        ]
    });
    if let Some(lrt) = lesson_review_type {
        exam["lessonReviewType"] = serde_json::json!(lrt);
    }
    app.store
        .insert_with_id(collections::EXAMS, id, exam)
        .await
        .unwrap();
}

async fn submit_exam(app: &TestApp, exam_id: &str, headquarters: &str) -> String {
    let response = app
        .client
        .post(format!("{}/api/submissions", app.address))
        .json(&serde_json::json!({
            "examId": exam_id,
            "examineeId": "12345678",
            "examineeName": "山田 太郎",
            "examineeHeadquarters": headquarters,
            "answers": [
                {"questionId": "q1", "value": "回答1"},
                {"questionId": "q2", "value": "回答2"}
            ]
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn get_submission(app: &TestApp, token: &str, id: &str) -> serde_json::Value {
    let response = app
        .client
        .get(format!("{}/api/review/submissions/{}", app.address, id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn written_flow_hq_then_po_pass() {
    // Arrange
    let app = spawn_app().await;
    seed_user(&app, "00000001", "システム管理者", UserRole::SystemAdministrator, None).await;
    seed_user(&app, "00000002", "山田 花子", UserRole::HqAdministrator, Some("浜松本部")).await;
    seed_exam(&app, "exam-1", "WrittenOnly", None).await;
    let submission_id = submit_exam(&app, "exam-1", "浜松採点").await;

    let hq_token = login(&app, "00000002").await;
    let admin_token = login(&app, "00000001").await;

    // Act: headquarters grades the written answers.
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/hq",
            app.address, submission_id
        ))
        .bearer_auth(&hq_token)
        .json(&serde_json::json!({
            "justification": "よく書けている",
            "scores": {"q1": 45, "q2": 40}
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert: 人事確認中, suggestion visible to the personnel office.
    assert_eq!(response.status().as_u16(), 200);
    let body = get_submission(&app, &admin_token, &submission_id).await;
    assert_eq!(body["status"], "人事確認中");
    assert_eq!(body["hqGrade"]["score"], 85);
    assert_eq!(body["hqGrade"]["reviewer"], "山田 花子");
    assert_eq!(body["suggestedOutcome"], "Passed");

    // Act: the personnel office confirms without an explicit outcome.
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/po",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({
            "justification": "確認済み",
            "scores": {"q1": 45, "q2": 40}
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert: passed, with the final score recorded.
    assert_eq!(response.status().as_u16(), 200);
    let body = get_submission(&app, &admin_token, &submission_id).await;
    assert_eq!(body["status"], "合格");
    assert_eq!(body["finalScore"], 85);
    assert_eq!(body["finalOutcome"], "Passed");
}

#[tokio::test]
async fn po_can_override_a_passing_total_to_failed() {
    // Arrange
    let app = spawn_app().await;
    seed_user(&app, "00000001", "システム管理者", UserRole::SystemAdministrator, None).await;
    seed_exam(&app, "exam-1", "WrittenOnly", None).await;
    let submission_id = submit_exam(&app, "exam-1", "浜松本部").await;
    let admin_token = login(&app, "00000001").await;

    app.client
        .post(format!(
            "{}/api/review/submissions/{}/hq",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({"scores": {"q1": 50, "q2": 45}}))
        .send()
        .await
        .unwrap();

    // Act: explicit Failed despite a total of 95.
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/po",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({
            "scores": {"q1": 50, "q2": 45},
            "finalOutcome": "Failed"
        }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body = get_submission(&app, &admin_token, &submission_id).await;
    assert_eq!(body["status"], "不合格");
    assert_eq!(body["finalScore"], 95);
}

#[tokio::test]
async fn hq_administrator_cannot_submit_the_po_review() {
    // Arrange
    let app = spawn_app().await;
    seed_user(&app, "00000002", "山田 花子", UserRole::HqAdministrator, Some("浜松本部")).await;
    seed_exam(&app, "exam-1", "WrittenOnly", None).await;
    let submission_id = submit_exam(&app, "exam-1", "浜松本部").await;
    let hq_token = login(&app, "00000002").await;

    // Act
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/po",
            app.address, submission_id
        ))
        .bearer_auth(&hq_token)
        .json(&serde_json::json!({"scores": {"q1": 50}}))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn hq_administrator_sees_only_their_headquarters() {
    // Arrange
    let app = spawn_app().await;
    seed_user(&app, "00000002", "山田 花子", UserRole::HqAdministrator, Some("浜松本部")).await;
    seed_exam(&app, "exam-1", "WrittenOnly", None).await;
    // Spelling variant of the same headquarters, plus a different one.
    let own = submit_exam(&app, "exam-1", "浜松採点").await;
    let other = submit_exam(&app, "exam-1", "静岡本部").await;
    let hq_token = login(&app, "00000002").await;

    // Act
    let response = app
        .client
        .get(format!("{}/api/review/submissions", app.address))
        .bearer_auth(&hq_token)
        .send()
        .await
        .unwrap();

    // Assert: the fuzzy-matched submission is visible, the other is not.
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&own.as_str()));
    assert!(!ids.contains(&other.as_str()));

    // Direct access to the foreign submission is forbidden.
    let response = app
        .client
        .get(format!("{}/api/review/submissions/{}", app.address, other))
        .bearer_auth(&hq_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn ai_grade_persists_a_draft_hq_grade() {
    // Arrange
    let app = spawn_app().await;
    seed_user(&app, "00000001", "システム管理者", UserRole::SystemAdministrator, None).await;
    seed_exam(&app, "exam-1", "WrittenOnly", None).await;
    let submission_id = submit_exam(&app, "exam-1", "浜松本部").await;
    let admin_token = login(&app, "00000001").await;

    // Act
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/ai-grade",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();

    // Assert: q1 graded (half of 50), q2 skipped (no model answer).
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "AI一括採点が完了しました。");
    assert_eq!(body["graded"].as_array().unwrap().len(), 1);
    assert_eq!(body["graded"][0]["score"], 25);
    assert_eq!(body["skipped"], serde_json::json!(["q2"]));

    // The draft is persisted but the workflow has not advanced.
    let submission = get_submission(&app, &admin_token, &submission_id).await;
    assert_eq!(submission["status"], "本部採点中");
    assert_eq!(submission["hqGrade"]["reviewer"], "AI採点ドラフト");
    assert_eq!(submission["hqGrade"]["scores"]["q1"], 25);
}

#[tokio::test]
async fn ai_grade_with_nothing_gradable_is_a_notice() {
    // Arrange: answers present only for q2, which has no model answer.
    let app = spawn_app().await;
    seed_user(&app, "00000001", "システム管理者", UserRole::SystemAdministrator, None).await;
    seed_exam(&app, "exam-1", "WrittenOnly", None).await;
    let response = app
        .client
        .post(format!("{}/api/submissions", app.address))
        .json(&serde_json::json!({
            "examId": "exam-1",
            "examineeId": "12345678",
            "examineeName": "山田 太郎",
            "answers": [{"questionId": "q2", "value": "回答2"}]
        }))
        .send()
        .await
        .unwrap();
    let submission_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let admin_token = login(&app, "00000001").await;

    // Act
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/ai-grade",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();

    // Assert: notice, and no draft grade was written.
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "採点対象の問題がありませんでした。");
    let submission = get_submission(&app, &admin_token, &submission_id).await;
    assert!(submission.get("hqGrade").is_none());
}

#[tokio::test]
async fn date_submission_pass_requires_a_first_preferred_date() {
    // Arrange
    let app = spawn_app().await;
    seed_user(&app, "00000001", "システム管理者", UserRole::SystemAdministrator, None).await;
    seed_exam(&app, "exam-1", "WrittenAndInterview", Some("DateSubmission")).await;
    let submission_id = submit_exam(&app, "exam-1", "浜松本部").await;
    let admin_token = login(&app, "00000001").await;

    // Act: passing total without a date.
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/hq",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({"scores": {"q1": 50, "q2": 40}}))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 400);

    // With the date the submit goes through and the pass awaits the lesson.
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/hq",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({
            "scores": {"q1": 50, "q2": 40},
            "lessonReviewDate1": "2026-09-01T01:00:00Z",
            "lessonReviewSchoolName": "浜松校"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/po",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({
            "scores": {"q1": 50, "q2": 40},
            "finalOutcome": "Passed"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let submission = get_submission(&app, &admin_token, &submission_id).await;
    assert_eq!(submission["status"], "授業審査待ち");
    assert_eq!(submission["lessonReviewSchoolName"], "浜松校");
}

#[tokio::test]
async fn score_above_question_points_is_rejected() {
    // Arrange
    let app = spawn_app().await;
    seed_user(&app, "00000001", "システム管理者", UserRole::SystemAdministrator, None).await;
    seed_exam(&app, "exam-1", "WrittenOnly", None).await;
    let submission_id = submit_exam(&app, "exam-1", "浜松本部").await;
    let admin_token = login(&app, "00000001").await;

    // Act
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/hq",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({"scores": {"q1": 51}}))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn url_submission_pass_gates_the_lesson_url() {
    // Arrange
    let app = spawn_app().await;
    seed_user(&app, "00000001", "システム管理者", UserRole::SystemAdministrator, None).await;
    seed_exam(&app, "exam-1", "WrittenAndInterview", Some("UrlSubmission")).await;
    let submission_id = submit_exam(&app, "exam-1", "浜松本部").await;
    let admin_token = login(&app, "00000001").await;

    // Attaching before the written pass is rejected.
    let response = app
        .client
        .post(format!(
            "{}/api/submissions/{}/lesson-url",
            app.address, submission_id
        ))
        .json(&serde_json::json!({"lessonReviewUrl": "https://example.com/v"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Written pass through both reviews.
    app.client
        .post(format!(
            "{}/api/review/submissions/{}/hq",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({"scores": {"q1": 45, "q2": 40}}))
        .send()
        .await
        .unwrap();
    app.client
        .post(format!(
            "{}/api/review/submissions/{}/po",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({
            "scores": {"q1": 45, "q2": 40},
            "finalOutcome": "Passed"
        }))
        .send()
        .await
        .unwrap();

    // Act: attach the URL, which hands the submission back to headquarters.
    let response = app
        .client
        .post(format!(
            "{}/api/submissions/{}/lesson-url",
            app.address, submission_id
        ))
        .json(&serde_json::json!({"lessonReviewUrl": "https://example.com/v"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let submission = get_submission(&app, &admin_token, &submission_id).await;
    assert_eq!(submission["status"], "授業審査待ち");
    assert_eq!(submission["lessonReviewUrl"], "https://example.com/v");

    // A second attach is rejected.
    let response = app
        .client
        .post(format!(
            "{}/api/submissions/{}/lesson-url",
            app.address, submission_id
        ))
        .json(&serde_json::json!({"lessonReviewUrl": "https://example.com/other"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Act: headquarters judges the submitted video with the checklist.
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/hq",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({
            "justification": "板書が弱い",
            "lessonReviewItems": {"規律": "Passed", "板書": "Failed"}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let submission = get_submission(&app, &admin_token, &submission_id).await;
    assert_eq!(submission["status"], "人事確認中");
    assert_eq!(submission["hqGrade"]["lessonReviewItems"]["板書"], "Failed");

    // Act: the personnel office finalizes the lesson review.
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/po",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({"finalOutcome": "Passed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let submission = get_submission(&app, &admin_token, &submission_id).await;
    assert_eq!(submission["status"], "合格");
    assert_eq!(submission["finalOutcome"], "Passed");
    // The written score from the earlier stage is untouched.
    assert_eq!(submission["finalScore"], 85);
}

#[tokio::test]
async fn lesson_only_flow_checklist_then_final_outcome() {
    // Arrange
    let app = spawn_app().await;
    seed_user(&app, "00000001", "システム管理者", UserRole::SystemAdministrator, None).await;
    let response = app
        .client
        .post(format!("{}/api/submissions/lesson-only", app.address))
        .json(&serde_json::json!({
            "employeeId": "12345678",
            "name": "山田 太郎",
            "headquarters": "浜松本部",
            "lessonReviewUrl": "https://example.com/lesson"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let submission_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let admin_token = login(&app, "00000001").await;

    let submission = get_submission(&app, &admin_token, &submission_id).await;
    assert_eq!(submission["status"], "授業審査待ち");

    // Act: headquarters judges the video with the checklist.
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/hq",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({
            "justification": "規律は良い",
            "lessonReviewItems": {"規律": "Passed", "板書": "Failed"}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let submission = get_submission(&app, &admin_token, &submission_id).await;
    assert_eq!(submission["status"], "人事確認中");
    assert_eq!(submission["hqGrade"]["lessonReviewItems"]["規律"], "Passed");
    // Unmarked checklist items default to NotSelected.
    assert_eq!(
        submission["hqGrade"]["lessonReviewItems"]["声・表情"],
        "NotSelected"
    );

    // A lesson judgement needs an explicit outcome.
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/po",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({"justification": "確認"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Act: the personnel office passes the lesson.
    let response = app
        .client
        .post(format!(
            "{}/api/review/submissions/{}/po",
            app.address, submission_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({"finalOutcome": "Passed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let submission = get_submission(&app, &admin_token, &submission_id).await;
    assert_eq!(submission["status"], "合格");
    assert!(submission.get("finalScore").is_none());
}

#[tokio::test]
async fn review_routes_require_authentication() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .client
        .get(format!("{}/api/review/submissions", app.address))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 401);
}
