// src/handlers/progress.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError, models::enrollment::CompleteLessonRequest, services::progress,
    state::DynStore,
    utils::{json::AppJson, jwt::Claims},
};

/// Marks a lesson as completed for the caller.
///
/// A missing enrollment is reported as 400 on this endpoint.
pub async fn complete_lesson(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<CompleteLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let student_id = claims.user_id()?;

    let result = progress::complete_lesson(store.as_ref(), student_id, &req)
        .await
        .map_err(|e| e.not_enrolled_as(StatusCode::BAD_REQUEST))?;

    Ok(Json(result))
}
