// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{achievements, progress, quiz},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Quiz session, course progress and earned-achievement routes require a
///   valid bearer token; the catalog is public.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (progress store, session registry, config).
pub fn create_router(state: AppState) -> Router {
    let origins: [axum::http::HeaderValue; 2] = [
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

    let quiz_routes = Router::new()
        .route(
            "/{quiz_id}/session",
            post(quiz::start_session).get(quiz::session_view),
        )
        .route("/{quiz_id}/session/answer", post(quiz::select_answer))
        .route("/{quiz_id}/session/advance", post(quiz::advance))
        .route("/{quiz_id}/session/pause", post(quiz::pause))
        .route("/{quiz_id}/session/resume", post(quiz::resume))
        .route("/{quiz_id}/session/submit", post(quiz::submit))
        .route("/{quiz_id}/session/breakdown", get(quiz::breakdown))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    let course_routes = Router::new()
        .route("/{course_id}/progress", get(progress::get_progress))
        .route(
            "/{course_id}/lessons/{lesson_index}/unlocked",
            get(progress::lesson_unlocked),
        )
        .route(
            "/{course_id}/lessons/{lesson_index}/complete",
            post(progress::complete_lesson),
        )
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    let achievement_routes = Router::new()
        .route("/", get(achievements::catalog))
        .merge(
            Router::new()
                .route("/earned", get(achievements::earned))
                .layer(middleware::from_fn_with_state(
                    state.config.clone(),
                    auth_middleware,
                )),
        );

    Router::new()
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/courses", course_routes)
        .nest("/api/achievements", achievement_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
