// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

use crate::models::quiz::StudentQuestion;

/// Represents the 'attempts' table: the authoritative per-student, per-quiz
/// attempt record. The store enforces UNIQUE (quiz_id, student_id); the only
/// writers are the start insert and the guarded submit update.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub quiz_id: i64,
    pub student_id: i64,

    /// Set once, on the first successful start.
    pub started_at: DateTime<Utc>,

    pub is_submitted: bool,

    /// Graded responses; populated only at submission.
    pub responses: Option<Json<Vec<QuestionResponse>>>,

    pub score: Option<i64>,
    pub total_possible_score: Option<i64>,
    pub percentage_score: Option<i64>,
    pub passed: Option<bool>,

    /// Wall-clock seconds between start and submit, clamped to the allotted
    /// duration.
    pub time_spent_seconds: Option<i64>,

    pub submitted_at: Option<DateTime<Utc>>,
}

impl Attempt {
    /// The graded outcome of a submitted attempt, or None while in progress.
    pub fn result(&self) -> Option<AttemptResult> {
        if !self.is_submitted {
            return None;
        }
        Some(AttemptResult {
            score: self.score.unwrap_or(0),
            total_possible_score: self.total_possible_score.unwrap_or(0),
            percentage_score: self.percentage_score.unwrap_or(0),
            passed: self.passed.unwrap_or(false),
            time_spent_seconds: self.time_spent_seconds.unwrap_or(0),
        })
    }
}

/// One graded answer inside an attempt's `responses` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question_id: i64,
    pub selected_option_index: i64,
    pub is_correct: bool,
}

/// DTO for one answer in a submit payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseInput {
    pub question_id: i64,
    pub selected_option_index: i64,
}

/// DTO for submitting an attempt. An empty list is legal: unanswered
/// questions simply score zero.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    #[serde(default)]
    pub responses: Vec<ResponseInput>,
}

/// The graded outcome returned by submit, and echoed back inside
/// ALREADY_COMPLETED rejections so the client can render the prior result
/// without another round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResult {
    pub score: i64,
    pub total_possible_score: i64,
    pub percentage_score: i64,
    pub passed: bool,
    pub time_spent_seconds: i64,
}

/// DTO returned by a successful (or idempotently repeated) start call.
#[derive(Debug, Serialize)]
pub struct StartAttemptResponse {
    pub attempt_id: i64,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub questions: Vec<StudentQuestion>,
}

/// A row in a student's own attempt history, joined with quiz metadata.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptHistoryEntry {
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub started_at: DateTime<Utc>,
    pub is_submitted: bool,
    pub percentage_score: Option<i64>,
    pub passed: Option<bool>,
    pub submitted_at: Option<DateTime<Utc>>,
}
