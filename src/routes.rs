// src/routes.rs

use axum::{
    Router, http::Method,
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, quiz, results},
    state::AppState,
    utils::jwt::{auth_middleware, instructor_middleware},
};

/// Assembles the main application router.
///
/// * Student-facing routes sit directly under /api; instructor routes get the
///   role middleware on top of authentication.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, roster collaborator).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let instructor_routes = Router::new()
        .route("/", post(quiz::create_quiz))
        .route(
            "/{id}",
            axum::routing::put(quiz::update_quiz).delete(quiz::delete_quiz),
        )
        .route("/{id}/students", post(quiz::assign_students))
        .route("/{id}/results", get(results::get_results))
        // Role check runs after authentication (layers apply outside in).
        .layer(middleware::from_fn(instructor_middleware));

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/{id}", get(quiz::get_quiz))
        .route("/{id}/start", post(attempt::start_attempt))
        .route("/{id}/submit", post(attempt::submit_attempt))
        .merge(instructor_routes);

    let attempt_routes = Router::new().route("/", get(attempt::list_my_attempts));

    Router::new()
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/attempts", attempt_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
