// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{
        AssignStudentsRequest, CreateQuizRequest, Question, QuestionInput, Quiz, QuizOverview,
        UpdateQuizRequest,
    },
    state::AppState,
    utils::{html::clean_html, jwt::Claims},
};

const QUIZ_COLUMNS: &str = "id, course_id, instructor_id, title, description, \
     questions, duration_minutes, passing_score_percent, start_at, end_at, \
     shuffle_questions, students, active, created_at, updated_at";

/// Fetches a quiz row by id, or `NotFound`.
pub async fn fetch_quiz(pool: &SqlitePool, id: i64) -> Result<Quiz, AppError> {
    let sql = format!("SELECT {} FROM quizzes WHERE id = ?", QUIZ_COLUMNS);
    sqlx::query_as::<_, Quiz>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch quiz {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// True if any submitted attempt exists for the quiz. Structural edits and
/// deletion hinge on this.
pub async fn has_submitted_attempts(pool: &SqlitePool, quiz_id: i64) -> Result<bool, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attempts WHERE quiz_id = ? AND is_submitted = 1",
    )
    .bind(quiz_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Sanitizes client questions and assigns server-side ids (1..=n).
fn build_question_bank(inputs: Vec<QuestionInput>) -> Vec<Question> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(i, q)| Question {
            id: (i + 1) as i64,
            text: clean_html(&q.text),
            options: q.options.iter().map(|o| clean_html(o)).collect(),
            correct_option_index: q.correct_option_index,
            points: q.points,
        })
        .collect()
}

/// Creates a new quiz.
///
/// * The owning instructor comes from the caller's claims.
/// * The enrolled roster is snapshotted from the course service here, once;
///   later course changes do not propagate (see assign_students).
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let roster = state
        .roster
        .get_enrolled_student_ids(payload.course_id)
        .await?;

    let questions = build_question_bank(payload.questions);
    let start_at = payload.start_at.unwrap_or_else(Utc::now);
    let instructor_id = claims.user_id();

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO quizzes
        (course_id, instructor_id, title, description, questions, duration_minutes,
         passing_score_percent, start_at, end_at, shuffle_questions, students, active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)
        RETURNING id
        "#,
    )
    .bind(payload.course_id)
    .bind(instructor_id)
    .bind(clean_html(&payload.title))
    .bind(clean_html(&payload.description))
    .bind(SqlJson(questions))
    .bind(payload.duration_minutes)
    .bind(payload.passing_score_percent)
    .bind(start_at)
    .bind(payload.end_at)
    .bind(payload.shuffle_questions)
    .bind(SqlJson(roster))
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let quiz = fetch_quiz(&state.pool, id).await?;

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Optional filters for the quiz list.
#[derive(Debug, Deserialize)]
pub struct ListQuizzesQuery {
    pub course_id: Option<i64>,
    pub instructor_id: Option<i64>,
    pub active: Option<bool>,
}

/// Lists quizzes as overview DTOs (no question bank, no roster).
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    Query(params): Query<ListQuizzesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM quizzes WHERE 1 = 1", QUIZ_COLUMNS));

    if let Some(course_id) = params.course_id {
        builder.push(" AND course_id = ");
        builder.push_bind(course_id);
    }

    if let Some(instructor_id) = params.instructor_id {
        builder.push(" AND instructor_id = ");
        builder.push_bind(instructor_id);
    }

    if let Some(active) = params.active {
        builder.push(" AND active = ");
        builder.push_bind(active);
    }

    builder.push(" ORDER BY id DESC");

    let quizzes: Vec<Quiz> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list quizzes: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let overviews: Vec<QuizOverview> = quizzes.iter().map(QuizOverview::from).collect();

    Ok(Json(overviews))
}

/// Fetches a single quiz.
///
/// The owning instructor receives the full definition, answer key included.
/// Everyone else gets the overview DTO; the correct option indexes are never
/// sent to students.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;

    if claims.role == "instructor" && claims.user_id() == quiz.instructor_id {
        return Ok(Json(quiz).into_response());
    }

    Ok(Json(QuizOverview::from(&quiz)).into_response())
}

/// Updates a quiz.
///
/// Once any submitted attempt exists, only `title`, `description`, `active`
/// and `end_at` may change; the rest of the definition is frozen because
/// changing it would silently invalidate graded work.
pub async fn update_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let quiz = fetch_quiz(&pool, id).await?;

    if quiz.instructor_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "Only the owning instructor can update this quiz".to_string(),
        ));
    }

    if payload.touches_structural_fields() && has_submitted_attempts(&pool, id).await? {
        return Err(AppError::FrozenByAttempts);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE quizzes SET ");
    let mut separated = builder.separated(", ");
    let mut dirty = false;

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(clean_html(&title));
        dirty = true;
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_html(&description));
        dirty = true;
    }

    if let Some(active) = payload.active {
        separated.push("active = ");
        separated.push_bind_unseparated(active);
        dirty = true;
    }

    if let Some(end_at) = payload.end_at {
        separated.push("end_at = ");
        separated.push_bind_unseparated(end_at);
        dirty = true;
    }

    if let Some(questions) = payload.questions {
        separated.push("questions = ");
        separated.push_bind_unseparated(SqlJson(build_question_bank(questions)));
        dirty = true;
    }

    if let Some(duration_minutes) = payload.duration_minutes {
        separated.push("duration_minutes = ");
        separated.push_bind_unseparated(duration_minutes);
        dirty = true;
    }

    if let Some(passing_score_percent) = payload.passing_score_percent {
        separated.push("passing_score_percent = ");
        separated.push_bind_unseparated(passing_score_percent);
        dirty = true;
    }

    if let Some(start_at) = payload.start_at {
        separated.push("start_at = ");
        separated.push_bind_unseparated(start_at);
        dirty = true;
    }

    if let Some(shuffle_questions) = payload.shuffle_questions {
        separated.push("shuffle_questions = ");
        separated.push_bind_unseparated(shuffle_questions);
        dirty = true;
    }

    if !dirty {
        return Ok(Json(quiz));
    }

    separated.push("updated_at = ");
    separated.push_bind_unseparated(Utc::now());

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update quiz {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    let updated = fetch_quiz(&pool, id).await?;

    Ok(Json(updated))
}

/// Deletes a quiz.
///
/// Rejected outright when submitted attempts exist; graded work is never
/// deleted. Otherwise abandoned (unsubmitted) attempt rows for the quiz are
/// cascaded away in the same transaction.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;

    if quiz.instructor_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "Only the owning instructor can delete this quiz".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let submitted = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attempts WHERE quiz_id = ? AND is_submitted = 1",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if submitted > 0 {
        return Err(AppError::HasSubmittedAttempts);
    }

    sqlx::query("DELETE FROM attempts WHERE quiz_id = ? AND is_submitted = 0")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Explicitly reassigns students to a quiz.
///
/// The roster snapshot is deliberately stale; this is the one operation that
/// widens it. Incoming ids are merged and deduplicated.
pub async fn assign_students(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<AssignStudentsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;

    if quiz.instructor_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "Only the owning instructor can assign students".to_string(),
        ));
    }

    let mut students = quiz.students.0.clone();
    for student_id in payload.student_ids {
        if !students.contains(&student_id) {
            students.push(student_id);
        }
    }

    sqlx::query("UPDATE quizzes SET students = ?, updated_at = ? WHERE id = ?")
        .bind(SqlJson(students))
        .bind(Utc::now())
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to assign students to quiz {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    let updated = fetch_quiz(&pool, id).await?;

    Ok(Json(updated))
}
