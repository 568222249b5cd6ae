// src/handlers/results.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        attempt::Attempt,
        results::{QuizStats, ResultsSummary, StudentResult},
    },
    utils::jwt::Claims,
};

use super::quiz::fetch_quiz;

/// Builds the instructor-facing summary from the roster snapshot and the
/// submitted attempts. Pure projection; students whose attempt is still in
/// progress are reported as not attempted.
fn summarize(roster: &[i64], submitted: &[Attempt]) -> ResultsSummary {
    let total_attempted = submitted.len() as i64;

    let average_score_percent = if submitted.is_empty() {
        0.0
    } else {
        let sum: i64 = submitted.iter().map(|a| a.percentage_score.unwrap_or(0)).sum();
        sum as f64 / total_attempted as f64
    };

    let pass_rate_percent = if submitted.is_empty() {
        0.0
    } else {
        let passed = submitted.iter().filter(|a| a.passed.unwrap_or(false)).count();
        100.0 * passed as f64 / total_attempted as f64
    };

    let student_results = submitted
        .iter()
        .map(|a| StudentResult {
            student_id: a.student_id,
            score: a.score.unwrap_or(0),
            total_possible_score: a.total_possible_score.unwrap_or(0),
            percentage_score: a.percentage_score.unwrap_or(0),
            passed: a.passed.unwrap_or(false),
            time_spent_seconds: a.time_spent_seconds.unwrap_or(0),
            submitted_at: a.submitted_at,
        })
        .collect();

    let not_attempted = roster
        .iter()
        .copied()
        .filter(|student_id| !submitted.iter().any(|a| a.student_id == *student_id))
        .collect();

    ResultsSummary {
        quiz_stats: QuizStats {
            total_students: roster.len() as i64,
            total_attempted,
            average_score_percent,
            pass_rate_percent,
        },
        student_results,
        not_attempted,
    }
}

/// Aggregate results for a quiz: completion, average score, pass rate, plus
/// the enrolled students who never submitted. Owner-only, read-only.
pub async fn get_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, quiz_id).await?;

    if quiz.instructor_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "Only the owning instructor can view results".to_string(),
        ));
    }

    let submitted = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, quiz_id, student_id, started_at, is_submitted, responses,
               score, total_possible_score, percentage_score, passed,
               time_spent_seconds, submitted_at
        FROM attempts
        WHERE quiz_id = ? AND is_submitted = 1
        ORDER BY student_id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch attempts for quiz {}: {:?}", quiz_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(summarize(&quiz.students, &submitted)))
}
