use crate::config::Config;
use crate::roster::{CourseDirectory, SqlCourseDirectory};
use axum::extract::FromRef;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,

    /// External course/roster collaborator. Queried once per quiz creation to
    /// snapshot the enrolled students.
    pub roster: Arc<dyn CourseDirectory>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let roster = Arc::new(SqlCourseDirectory::new(pool.clone()));
        AppState {
            pool,
            config,
            roster,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
