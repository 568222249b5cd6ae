// src/roster.rs

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::AppError;

/// The course/roster service this engine depends on. Course management is an
/// external collaborator; the engine only reads the enrolled-student set,
/// once, when a quiz is created.
#[async_trait]
pub trait CourseDirectory: Send + Sync {
    /// Returns the ids of students enrolled in the course, or `NotFound` if
    /// the course does not exist.
    async fn get_enrolled_student_ids(&self, course_id: i64) -> Result<Vec<i64>, AppError>;
}

/// Directory backed by the collaborator-owned `courses` / `enrollments`
/// tables in the shared store.
pub struct SqlCourseDirectory {
    pool: SqlitePool,
}

impl SqlCourseDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        SqlCourseDirectory { pool }
    }
}

#[async_trait]
impl CourseDirectory for SqlCourseDirectory {
    async fn get_enrolled_student_ids(&self, course_id: i64) -> Result<Vec<i64>, AppError> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM courses WHERE id = ?")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to look up course {}: {:?}", course_id, e);
                AppError::InternalServerError(e.to_string())
            })?;

        if exists.is_none() {
            return Err(AppError::NotFound("Course not found".to_string()));
        }

        let students = sqlx::query_scalar::<_, i64>(
            "SELECT student_id FROM enrollments WHERE course_id = ? ORDER BY student_id",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch roster for course {}: {:?}", course_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(students)
    }
}
