// src/routes.rs

use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{admin, auth, course, progress, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, courses, lessons, quizzes, me, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store and configuration).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([
            header::HeaderValue::from_static("http://localhost:3000"),
            header::HeaderValue::from_static("http://127.0.0.1:3000"),
        ]))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let course_routes = Router::new()
        .route("/", get(course::list_courses))
        .route("/{id}", get(course::get_course))
        // Protected course routes
        .merge(
            Router::new()
                .route("/{id}/enroll", post(course::enroll))
                .route("/{id}/drop", post(course::drop_enrollment))
                .layer(auth_layer.clone()),
        );

    let lesson_routes = Router::new()
        .route("/complete", post(progress::complete_lesson))
        .layer(auth_layer.clone());

    let quiz_routes = Router::new()
        .route("/{id}/leaderboard", get(quiz::leaderboard))
        // Protected quiz routes
        .merge(
            Router::new()
                .route("/lock-status/{course_id}", get(quiz::lock_status))
                .route("/{id}/questions", get(quiz::get_questions))
                .route("/{id}/submit", post(quiz::submit))
                .layer(auth_layer.clone()),
        );

    let me_routes = Router::new()
        .route("/enrollments", get(course::my_enrollments))
        .route("/attempts", get(quiz::my_attempts))
        .layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route("/users", post(admin::create_user))
        .layer(middleware::from_fn(admin_middleware))
        .merge(
            Router::new()
                .route("/courses", post(admin::create_course))
                .route("/quizzes", post(admin::create_quiz))
                .route("/quizzes/{id}/marks", get(admin::quiz_marks))
                .layer(middleware::from_fn(staff_middleware)),
        )
        // Double middleware protection: Auth first, then role check
        .layer(auth_layer);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/courses", course_routes)
        .nest("/api/lessons", lesson_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/me", me_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
