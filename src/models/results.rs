// src/models/results.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Aggregate statistics over a quiz's submitted attempts.
#[derive(Debug, Serialize)]
pub struct QuizStats {
    pub total_students: i64,
    pub total_attempted: i64,
    pub average_score_percent: f64,
    pub pass_rate_percent: f64,
}

/// Per-student outcome of a submitted attempt.
#[derive(Debug, Serialize)]
pub struct StudentResult {
    pub student_id: i64,
    pub score: i64,
    pub total_possible_score: i64,
    pub percentage_score: i64,
    pub passed: bool,
    pub time_spent_seconds: i64,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Instructor-facing results projection. Derived on read, never persisted;
/// students with only an in-progress attempt are reported as not attempted.
#[derive(Debug, Serialize)]
pub struct ResultsSummary {
    pub quiz_stats: QuizStats,
    pub student_results: Vec<StudentResult>,
    pub not_attempted: Vec<i64>,
}
