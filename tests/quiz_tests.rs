// tests/quiz_tests.rs

use assessment_backend::{config::Config, routes, state::AppState, utils::jwt::sign_jwt};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL and the pool, so tests can seed collaborator tables.
async fn spawn_app() -> (String, SqlitePool) {
    // Single-connection in-memory SQLite: the whole suite runs without an
    // external database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
    };

    let state = AppState::new(pool.clone(), config);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

async fn seed_course(pool: &SqlitePool, course_id: i64, students: &[i64]) {
    sqlx::query("INSERT INTO courses (id, title) VALUES (?, ?)")
        .bind(course_id)
        .bind("Seeded course")
        .execute(pool)
        .await
        .unwrap();

    for student_id in students {
        sqlx::query("INSERT INTO enrollments (course_id, student_id) VALUES (?, ?)")
            .bind(course_id)
            .bind(student_id)
            .execute(pool)
            .await
            .unwrap();
    }
}

fn token(id: i64, role: &str) -> String {
    sign_jwt(id, role, JWT_SECRET, 600).unwrap()
}

fn quiz_payload(course_id: i64) -> serde_json::Value {
    serde_json::json!({
        "course_id": course_id,
        "title": "Checkpoint quiz",
        "description": "End of week checkpoint",
        "questions": [
            {"text": "1 + 1 = ?", "options": ["2", "3", "4"], "correct_option_index": 0, "points": 1},
            {"text": "Capital of France?", "options": ["Lyon", "Paris", "Nice"], "correct_option_index": 1, "points": 2},
            {"text": "Largest planet?", "options": ["Mars", "Venus", "Jupiter"], "correct_option_index": 2, "points": 1}
        ],
        "duration_minutes": 30,
        "passing_score_percent": 60
    })
}

const INSTRUCTOR: i64 = 500;
const STUDENT: i64 = 10;

#[tokio::test]
async fn create_quiz_works_and_snapshots_roster() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    seed_course(&pool, 1, &[10, 11, 12]).await;

    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&quiz_payload(1))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    let quiz: serde_json::Value = response.json().await.unwrap();

    assert_eq!(quiz["instructor_id"], INSTRUCTOR);
    assert_eq!(quiz["students"], serde_json::json!([10, 11, 12]));
    // Server-side question ids, 1..=n.
    assert_eq!(quiz["questions"][0]["id"], 1);
    assert_eq!(quiz["questions"][2]["id"], 3);
    assert_eq!(quiz["active"], true);
}

#[tokio::test]
async fn create_quiz_unknown_course_is_404() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&quiz_payload(99))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn create_quiz_rejects_invalid_question_bank() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    seed_course(&pool, 1, &[10]).await;

    // Single-option question
    let mut payload = quiz_payload(1);
    payload["questions"][0]["options"] = serde_json::json!(["only one"]);

    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Answer index out of range
    let mut payload = quiz_payload(1);
    payload["questions"][1]["correct_option_index"] = serde_json::json!(7);

    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Empty bank
    let mut payload = quiz_payload(1);
    payload["questions"] = serde_json::json!([]);

    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn quiz_routes_enforce_auth_and_role() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    seed_course(&pool, 1, &[10]).await;

    // No token at all
    let response = client
        .post(format!("{}/api/quizzes", address))
        .json(&quiz_payload(1))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Student role cannot create quizzes
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token(STUDENT, "student"))
        .json(&quiz_payload(1))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn get_quiz_hides_answers_from_students() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    seed_course(&pool, 1, &[10]).await;

    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&quiz_payload(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();

    // Student view: overview only, no question bank, no answer key.
    let body: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(token(STUDENT, "student"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["question_count"], 3);
    assert!(body.get("questions").is_none());
    assert!(!body.to_string().contains("correct_option_index"));

    // Owner view keeps the full definition.
    let body: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["questions"][1]["correct_option_index"], 1);
}

#[tokio::test]
async fn list_quizzes_filters_by_course() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    seed_course(&pool, 1, &[10]).await;
    seed_course(&pool, 2, &[11]).await;

    for course_id in [1, 1, 2] {
        client
            .post(format!("{}/api/quizzes", address))
            .bearer_auth(token(INSTRUCTOR, "instructor"))
            .json(&quiz_payload(course_id))
            .send()
            .await
            .unwrap();
    }

    let listed: Vec<serde_json::Value> = client
        .get(format!("{}/api/quizzes?course_id=1", address))
        .bearer_auth(token(STUDENT, "student"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|q| q["course_id"] == 1));
}

/// Submits an attempt for STUDENT so the quiz gains graded work.
async fn submit_one_attempt(address: &str, client: &reqwest::Client, quiz_id: i64) {
    let start = client
        .post(format!("{}/api/quizzes/{}/start", address, quiz_id))
        .bearer_auth(token(STUDENT, "student"))
        .send()
        .await
        .unwrap();
    assert_eq!(start.status().as_u16(), 200);

    let submit = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .bearer_auth(token(STUDENT, "student"))
        .json(&serde_json::json!({
            "responses": [{"question_id": 1, "selected_option_index": 0}]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(submit.status().as_u16(), 200);
}

#[tokio::test]
async fn update_quiz_structural_fields_freeze_after_submission() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    seed_course(&pool, 1, &[STUDENT]).await;

    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&quiz_payload(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();

    // Before any submitted attempt, structural edits go through.
    let response = client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&serde_json::json!({"duration_minutes": 45}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    submit_one_attempt(&address, &client, quiz_id).await;

    // Now the question bank is frozen.
    let response = client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&serde_json::json!({
            "questions": [
                {"text": "Replacement?", "options": ["a", "b"], "correct_option_index": 0}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "FROZEN_BY_ATTEMPTS");

    // A change to the restricted field set still succeeds.
    let response = client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&serde_json::json!({"active": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["active"], false);
}

#[tokio::test]
async fn update_quiz_rejects_non_owner() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    seed_course(&pool, 1, &[STUDENT]).await;

    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&quiz_payload(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();

    let response = client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(token(INSTRUCTOR + 1, "instructor"))
        .json(&serde_json::json!({"title": "Hijacked"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn delete_quiz_guards_submitted_attempts() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    seed_course(&pool, 1, &[STUDENT]).await;

    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&quiz_payload(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();

    submit_one_attempt(&address, &client, quiz_id).await;

    let response = client
        .delete(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "HAS_SUBMITTED_ATTEMPTS");
}

#[tokio::test]
async fn delete_quiz_cascades_unsubmitted_attempts() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    seed_course(&pool, 1, &[STUDENT]).await;

    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&quiz_payload(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();

    // Start but never submit: an abandoned session.
    let start = client
        .post(format!("{}/api/quizzes/{}/start", address, quiz_id))
        .bearer_auth(token(STUDENT, "student"))
        .send()
        .await
        .unwrap();
    assert_eq!(start.status().as_u16(), 200);

    let response = client
        .delete(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE quiz_id = ?")
            .bind(quiz_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn assign_students_merges_and_dedups() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    seed_course(&pool, 1, &[10, 11]).await;

    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&quiz_payload(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();

    // Roster snapshot is stale on purpose; reassignment is explicit.
    let response = client
        .post(format!("{}/api/quizzes/{}/students", address, quiz_id))
        .bearer_auth(token(INSTRUCTOR, "instructor"))
        .json(&serde_json::json!({"student_ids": [11, 12, 12]}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["students"], serde_json::json!([10, 11, 12]));
}
