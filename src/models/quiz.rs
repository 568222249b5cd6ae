// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// A single question inside a quiz.
///
/// Questions live embedded in the quiz row as a JSON array; ids are assigned
/// server-side (1..=n) when the bank is created or replaced, and grading is
/// keyed by them rather than by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
    pub correct_option_index: i64,
    #[serde(default = "default_points")]
    pub points: i64,
}

fn default_points() -> i64 {
    1
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,

    /// Owning instructor; results and mutations are gated on this.
    pub instructor_id: i64,

    pub title: String,
    pub description: String,

    /// The question bank, including answers. Only ever serialized whole for
    /// the owning instructor; students get `StudentQuestion`.
    pub questions: Json<Vec<Question>>,

    pub duration_minutes: i64,
    pub passing_score_percent: i64,

    /// Availability window. `end_at` is optional (open-ended quiz).
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,

    pub shuffle_questions: bool,

    /// Roster snapshot captured from the course service at creation time.
    /// Not refreshed when the course roster later changes.
    pub students: Json<Vec<i64>>,

    pub active: bool,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Quiz {
    pub fn is_enrolled(&self, student_id: i64) -> bool {
        self.students.contains(&student_id)
    }
}

/// DTO for sending a question to a student (excludes the answer key).
#[derive(Debug, Serialize)]
pub struct StudentQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
    pub points: i64,
}

impl From<&Question> for StudentQuestion {
    fn from(q: &Question) -> Self {
        StudentQuestion {
            id: q.id,
            text: q.text.clone(),
            options: q.options.clone(),
            points: q.points,
        }
    }
}

/// Quiz metadata without the question bank or roster, as shown to students
/// and in list views.
#[derive(Debug, Serialize)]
pub struct QuizOverview {
    pub id: i64,
    pub course_id: i64,
    pub instructor_id: i64,
    pub title: String,
    pub description: String,
    pub question_count: usize,
    pub duration_minutes: i64,
    pub passing_score_percent: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl From<&Quiz> for QuizOverview {
    fn from(quiz: &Quiz) -> Self {
        QuizOverview {
            id: quiz.id,
            course_id: quiz.course_id,
            instructor_id: quiz.instructor_id,
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            question_count: quiz.questions.len(),
            duration_minutes: quiz.duration_minutes,
            passing_score_percent: quiz.passing_score_percent,
            start_at: quiz.start_at,
            end_at: quiz.end_at,
            active: quiz.active,
        }
    }
}

/// DTO for a question in a create/replace payload. Ids are not accepted from
/// the client; they are assigned when the bank is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionInput {
    pub text: String,
    pub options: Vec<String>,
    pub correct_option_index: i64,
    #[serde(default = "default_points")]
    pub points: i64,
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    pub course_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<QuestionInput>,
    #[validate(range(min = 1, max = 1440))]
    #[serde(default = "default_duration")]
    pub duration_minutes: i64,
    #[validate(range(min = 0, max = 100))]
    #[serde(default = "default_passing_score")]
    pub passing_score_percent: i64,
    /// Defaults to "now" when omitted.
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shuffle_questions: bool,
}

fn default_duration() -> i64 {
    30
}

fn default_passing_score() -> i64 {
    60
}

/// Validates a question bank: at least one question, every question with at
/// least two options, an in-range answer index and a positive point value.
pub fn validate_questions(questions: &[QuestionInput]) -> Result<(), validator::ValidationError> {
    if questions.is_empty() {
        return Err(validator::ValidationError::new("questions_cannot_be_empty"));
    }
    for q in questions {
        if q.text.trim().is_empty() {
            return Err(validator::ValidationError::new("question_text_empty"));
        }
        if q.options.len() < 2 {
            return Err(validator::ValidationError::new("too_few_options"));
        }
        if q.correct_option_index < 0 || q.correct_option_index as usize >= q.options.len() {
            return Err(validator::ValidationError::new("answer_index_out_of_range"));
        }
        if q.points < 1 {
            return Err(validator::ValidationError::new("points_must_be_positive"));
        }
    }
    Ok(())
}

/// DTO for updating a quiz. Fields are optional; structural fields are
/// rejected once a submitted attempt exists.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub active: Option<bool>,
    pub end_at: Option<DateTime<Utc>>,

    // Structural fields, frozen by submitted attempts.
    #[validate(custom(function = validate_questions))]
    pub questions: Option<Vec<QuestionInput>>,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: Option<i64>,
    #[validate(range(min = 0, max = 100))]
    pub passing_score_percent: Option<i64>,
    pub start_at: Option<DateTime<Utc>>,
    pub shuffle_questions: Option<bool>,
}

impl UpdateQuizRequest {
    /// True when the patch touches a field that is frozen once any submitted
    /// attempt exists for the quiz.
    pub fn touches_structural_fields(&self) -> bool {
        self.questions.is_some()
            || self.duration_minutes.is_some()
            || self.passing_score_percent.is_some()
            || self.start_at.is_some()
            || self.shuffle_questions.is_some()
    }
}

/// DTO for explicitly reassigning students to a quiz after creation.
#[derive(Debug, Deserialize)]
pub struct AssignStudentsRequest {
    pub student_ids: Vec<i64>,
}
