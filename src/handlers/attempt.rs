// src/handlers/attempt.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use sqlx::{SqlitePool, types::Json as SqlJson};

use crate::{
    error::AppError,
    models::{
        attempt::{
            Attempt, AttemptHistoryEntry, AttemptResult, QuestionResponse, ResponseInput,
            StartAttemptResponse, SubmitAttemptRequest,
        },
        quiz::{Question, Quiz, StudentQuestion},
    },
    utils::jwt::Claims,
};

use super::quiz::fetch_quiz;

const ATTEMPT_COLUMNS: &str = "id, quiz_id, student_id, started_at, is_submitted, responses, \
     score, total_possible_score, percentage_score, passed, time_spent_seconds, submitted_at";

async fn fetch_attempt(
    pool: &SqlitePool,
    quiz_id: i64,
    student_id: i64,
) -> Result<Option<Attempt>, AppError> {
    let sql = format!(
        "SELECT {} FROM attempts WHERE quiz_id = ? AND student_id = ?",
        ATTEMPT_COLUMNS
    );
    let attempt = sqlx::query_as::<_, Attempt>(&sql)
        .bind(quiz_id)
        .bind(student_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to fetch attempt for quiz {} student {}: {:?}",
                quiz_id,
                student_id,
                e
            );
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(attempt)
}

/// Grades a set of responses against the quiz's question bank.
///
/// Responses referring to questions outside this quiz are ignored rather than
/// failing the submission; when a question is answered more than once the
/// last response wins. The total is the sum over ALL questions in the quiz,
/// so unanswered questions count against the denominator.
fn grade(questions: &[Question], responses: &[ResponseInput]) -> (Vec<QuestionResponse>, i64, i64) {
    let mut selected: HashMap<i64, i64> = HashMap::new();
    for r in responses {
        selected.insert(r.question_id, r.selected_option_index);
    }

    let mut graded = Vec::new();
    let mut score = 0;
    let mut total_possible = 0;

    for question in questions {
        total_possible += question.points;

        if let Some(&index) = selected.get(&question.id) {
            let is_correct = index == question.correct_option_index;
            if is_correct {
                score += question.points;
            }
            graded.push(QuestionResponse {
                question_id: question.id,
                selected_option_index: index,
                is_correct,
            });
        }
    }

    (graded, score, total_possible)
}

/// Integer percentage, rounded half-up. Zero when the quiz is worth nothing.
fn percentage(score: i64, total_possible: i64) -> i64 {
    if total_possible == 0 {
        return 0;
    }
    ((100 * score) as f64 / total_possible as f64).round() as i64
}

/// Seconds between start and now, clamped to the allotted duration. A late
/// submission is still graded; the clamp caps what it can report.
fn clamped_time_spent(
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
    duration_minutes: i64,
) -> i64 {
    let elapsed = (now - started_at).num_seconds().max(0);
    elapsed.min(duration_minutes * 60)
}

/// The question set as sent to a student: answer key stripped, order
/// shuffled per call when the quiz asks for it. The order is never persisted;
/// grading is keyed by question id, so this is safe.
fn questions_for_student(quiz: &Quiz) -> Vec<StudentQuestion> {
    let mut questions: Vec<StudentQuestion> =
        quiz.questions.iter().map(StudentQuestion::from).collect();

    if quiz.shuffle_questions {
        questions.shuffle(&mut rand::thread_rng());
    }

    questions
}

/// Starts (or resumes) the caller's attempt at a quiz.
///
/// Preconditions are checked in order, first failure wins: quiz exists and is
/// active, the availability window is open, the caller is in the roster
/// snapshot, and no submitted attempt exists yet. An unsubmitted attempt is
/// reused as-is, which makes this endpoint safe to retry after a dropped
/// connection.
///
/// The insert runs against the store's UNIQUE (quiz_id, student_id)
/// constraint with ON CONFLICT DO NOTHING, then re-reads; two concurrent
/// starts produce one row and the loser observes the winner's.
pub async fn start_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, quiz_id).await?;
    let student_id = claims.user_id();
    let now = Utc::now();

    if !quiz.active {
        return Err(AppError::QuizDisabled);
    }

    if now < quiz.start_at {
        return Err(AppError::NotYetAvailable);
    }

    if let Some(end_at) = quiz.end_at {
        if now > end_at {
            return Err(AppError::WindowClosed);
        }
    }

    if !quiz.is_enrolled(student_id) {
        return Err(AppError::NotEnrolled);
    }

    if let Some(existing) = fetch_attempt(&pool, quiz_id, student_id).await? {
        if let Some(result) = existing.result() {
            return Err(AppError::AlreadyCompleted(Box::new(result)));
        }
    }

    sqlx::query(
        r#"
        INSERT INTO attempts (quiz_id, student_id, started_at)
        VALUES (?, ?, ?)
        ON CONFLICT (quiz_id, student_id) DO NOTHING
        "#,
    )
    .bind(quiz_id)
    .bind(student_id)
    .bind(now)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert attempt: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    // Re-read: either our fresh row or the one a racing start/submit won with.
    let attempt = fetch_attempt(&pool, quiz_id, student_id)
        .await?
        .ok_or_else(|| AppError::InternalServerError("Attempt row vanished".to_string()))?;

    if let Some(result) = attempt.result() {
        return Err(AppError::AlreadyCompleted(Box::new(result)));
    }

    Ok(Json(StartAttemptResponse {
        attempt_id: attempt.id,
        started_at: attempt.started_at,
        duration_minutes: quiz.duration_minutes,
        questions: questions_for_student(&quiz),
    }))
}

/// Grades and finalizes the caller's in-progress attempt.
///
/// The write is a single update guarded by `is_submitted = 0`, so two racing
/// submits cannot both succeed; the loser is told ALREADY_SUBMITTED and the
/// persisted score never changes after the first success.
pub async fn submit_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, quiz_id).await?;
    let student_id = claims.user_id();

    let attempt = fetch_attempt(&pool, quiz_id, student_id)
        .await?
        .ok_or(AppError::NoActiveAttempt)?;

    if attempt.is_submitted {
        return Err(AppError::AlreadySubmitted);
    }

    let now = Utc::now();
    let time_spent = clamped_time_spent(attempt.started_at, now, quiz.duration_minutes);

    let (graded, score, total_possible) = grade(&quiz.questions, &payload.responses);
    let percentage_score = percentage(score, total_possible);
    let passed = percentage_score >= quiz.passing_score_percent;

    let result = sqlx::query(
        r#"
        UPDATE attempts
        SET is_submitted = 1,
            responses = ?,
            score = ?,
            total_possible_score = ?,
            percentage_score = ?,
            passed = ?,
            time_spent_seconds = ?,
            submitted_at = ?
        WHERE id = ? AND is_submitted = 0
        "#,
    )
    .bind(SqlJson(graded))
    .bind(score)
    .bind(total_possible)
    .bind(percentage_score)
    .bind(passed)
    .bind(time_spent)
    .bind(now)
    .bind(attempt.id)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to finalize attempt {}: {:?}", attempt.id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    // A racing submit got there first; its grade stands.
    if result.rows_affected() == 0 {
        return Err(AppError::AlreadySubmitted);
    }

    Ok(Json(AttemptResult {
        score,
        total_possible_score: total_possible,
        percentage_score,
        passed,
        time_spent_seconds: time_spent,
    }))
}

/// Lists the caller's attempt history across quizzes, newest first.
pub async fn list_my_attempts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = sqlx::query_as::<_, AttemptHistoryEntry>(
        r#"
        SELECT
            a.id AS attempt_id,
            a.quiz_id,
            q.title AS quiz_title,
            a.started_at,
            a.is_submitted,
            a.percentage_score,
            a.passed,
            a.submitted_at
        FROM attempts a
        JOIN quizzes q ON q.id = a.quiz_id
        WHERE a.student_id = ?
        ORDER BY a.started_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list attempts: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(attempts))
}
