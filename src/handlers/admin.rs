// src/handlers/admin.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        course::{Course, CreateCourseRequest, NewCourse},
        quiz::{CreateQuizRequest, NewQuiz, Question, QuizOption},
        user::{AdminCreateUserRequest, NewUser, ROLE_ADMIN},
    },
    state::DynStore,
    utils::{hash::hash_password, html::clean_html, json::AppJson, jwt::Claims},
};

/// Creates a user with an explicit role.
/// Admin only.
pub async fn create_user(
    State(store): State<DynStore>,
    AppJson(payload): AppJson<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;
    let user = store
        .create_user(NewUser {
            username: payload.username,
            password: hashed_password,
            role: payload.role,
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "User created by admin");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Creates a course with its ordered lessons. The caller becomes its instructor.
/// Instructor or admin.
pub async fn create_course(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let course = store
        .create_course(NewCourse {
            title: clean_html(&payload.title),
            description: payload.description.as_deref().map(clean_html),
            thumbnail_url: payload.thumbnail_url,
            instructor_id: claims.user_id()?,
            quiz_unlock_threshold: payload.quiz_unlock_threshold,
            lessons: payload.lessons.iter().map(|t| clean_html(t)).collect(),
        })
        .await?;

    tracing::info!(course_id = course.course.id, lessons = course.lessons.len(), "Course created");

    Ok((StatusCode::CREATED, Json(course)))
}

/// Authors the quiz of a course.
/// Admins, or the instructor who owns the course.
pub async fn create_quiz(
    State(store): State<DynStore>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let course = store
        .find_course(payload.course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    ensure_course_owner(&claims, &course.course)?;

    if let Some(lesson_id) = payload.lesson_id {
        if !course.lessons.iter().any(|l| l.id == lesson_id) {
            return Err(AppError::BadRequest(format!(
                "Lesson {} does not belong to course {}",
                lesson_id, payload.course_id
            )));
        }
    }

    let questions = payload
        .questions
        .iter()
        .map(|q| Question {
            question: clean_html(&q.question),
            options: q
                .options
                .iter()
                .map(|o| QuizOption {
                    text: clean_html(&o.text),
                    is_correct: o.is_correct,
                })
                .collect(),
            marks: q.marks,
        })
        .collect();

    let quiz = store
        .create_quiz(NewQuiz {
            course_id: payload.course_id,
            lesson_id: payload.lesson_id,
            title: clean_html(&payload.title),
            questions,
            total_marks: payload.total_marks,
            passing_percentage: payload
                .passing_percentage
                .unwrap_or(config.quiz_passing_percentage),
            duration_minutes: payload.duration_minutes,
        })
        .await?;

    tracing::info!(quiz_id = quiz.id, course_id = quiz.course_id, "Quiz created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": quiz.id,
            "courseId": quiz.course_id,
            "totalMarks": quiz.total_marks(),
            "passingPercentage": quiz.passing_percentage,
        })),
    ))
}

/// Quiz-centric view of recorded attempts.
/// Admins, or the instructor who owns the quiz's course.
pub async fn quiz_marks(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;
    let course = store
        .find_course(quiz.course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    ensure_course_owner(&claims, &course.course)?;

    let marks = store.list_quiz_marks(quiz_id).await?;
    Ok(Json(marks))
}

/// Admins pass; instructors only for courses they own.
fn ensure_course_owner(claims: &Claims, course: &Course) -> Result<(), AppError> {
    if claims.role != ROLE_ADMIN && course.instructor_id != claims.user_id()? {
        return Err(AppError::Forbidden(
            "Only the course instructor can manage its quiz".to_string(),
        ));
    }
    Ok(())
}
