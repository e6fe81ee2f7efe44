// src/handlers/course.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{error::AppError, state::DynStore, utils::jwt::Claims};

/// Lists the course catalog.
pub async fn list_courses(State(store): State<DynStore>) -> Result<impl IntoResponse, AppError> {
    let courses = store.list_courses().await?;
    Ok(Json(courses))
}

/// Returns one course with its ordered lessons.
pub async fn get_course(
    State(store): State<DynStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = store
        .find_course(id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;
    Ok(Json(course))
}

/// Enrolls the caller in a course.
pub async fn enroll(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let enrollment = store.enroll(student_id, course_id).await?;

    tracing::info!(student_id, course_id, "Student enrolled");

    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// Drops the caller's enrollment. Progress is kept and restored on re-enrolling.
pub async fn drop_enrollment(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let enrollment = store
        .drop_enrollment(student_id, course_id)
        .await
        .map_err(|e| e.not_enrolled_as(StatusCode::NOT_FOUND))?;

    tracing::info!(student_id, course_id, "Enrollment dropped");

    Ok(Json(enrollment))
}

/// Lists the caller's enrollments with progress and quiz state.
pub async fn my_enrollments(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let enrollments = store.list_enrollments(claims.user_id()?).await?;
    Ok(Json(enrollments))
}
