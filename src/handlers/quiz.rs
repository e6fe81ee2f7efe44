// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    config::Config,
    error::AppError,
    models::quiz::{LeaderboardParams, SubmitQuizRequest},
    services::{gate, grading},
    state::DynStore,
    utils::{json::AppJson, jwt::Claims},
};

const DEFAULT_LEADERBOARD_SIZE: i64 = 10;
const MAX_LEADERBOARD_SIZE: i64 = 50;

/// Lock status of the quiz attached to a course.
///
/// A missing enrollment is reported as 404 on this endpoint.
pub async fn lock_status(
    State(store): State<DynStore>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let status = gate::get_lock_status(
        store.as_ref(),
        config.quiz_unlock_threshold,
        student_id,
        course_id,
    )
    .await
    .map_err(|e| e.not_enrolled_as(StatusCode::NOT_FOUND))?;

    Ok(Json(status))
}

/// Returns the quiz questions without the answer key.
pub async fn get_questions(
    State(store): State<DynStore>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let questions = grading::get_questions(
        store.as_ref(),
        config.quiz_unlock_threshold,
        claims.user_id()?,
        quiz_id,
    )
    .await?;

    Ok(Json(questions))
}

/// Grades and records the caller's answers.
pub async fn submit(
    State(store): State<DynStore>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    AppJson(req): AppJson<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = grading::submit(
        store.as_ref(),
        config.quiz_unlock_threshold,
        claims.user_id()?,
        quiz_id,
        &req.answers,
    )
    .await?;

    Ok(Json(result))
}

/// The caller's graded attempts, newest first.
pub async fn my_attempts(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = store.list_student_attempts(claims.user_id()?).await?;
    Ok(Json(attempts))
}

/// Top attempts for a quiz.
pub async fn leaderboard(
    State(store): State<DynStore>,
    Path(quiz_id): Path<i64>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    if store.find_quiz(quiz_id).await?.is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let limit = params
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
        .clamp(1, MAX_LEADERBOARD_SIZE);
    let entries = store.leaderboard(quiz_id, limit).await?;

    Ok(Json(entries))
}
