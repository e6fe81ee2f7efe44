// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Rejections produced by the quiz workflow (progress tracking, lock gate, grading).
///
/// Every variant has a stable machine-readable code so clients can map it to
/// an inline UI state instead of parsing the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    NotEnrolled,
    LessonNotInCourse { lesson_id: i64, course_id: i64 },
    AlreadyCompleted { lesson_id: i64 },
    NoQuizForCourse { course_id: i64 },
    QuizNotFound { quiz_id: i64 },
    CourseNotFound { course_id: i64 },
    /// Course completion is below the unlock threshold.
    Locked { current: i32, required: i32 },
    AlreadySubmitted { quiz_id: i64 },
    InvalidAnswer(String),
}

impl QuizError {
    pub fn code(&self) -> &'static str {
        match self {
            QuizError::NotEnrolled => "NOT_ENROLLED",
            QuizError::LessonNotInCourse { .. } => "LESSON_NOT_IN_COURSE",
            QuizError::AlreadyCompleted { .. } => "ALREADY_COMPLETED",
            QuizError::NoQuizForCourse { .. } => "NO_QUIZ_FOR_COURSE",
            QuizError::QuizNotFound { .. } => "QUIZ_NOT_FOUND",
            QuizError::CourseNotFound { .. } => "COURSE_NOT_FOUND",
            QuizError::Locked { .. } => "LOCKED",
            QuizError::AlreadySubmitted { .. } => "ALREADY_SUBMITTED",
            QuizError::InvalidAnswer(_) => "INVALID_ANSWER",
        }
    }

    /// Status used unless an endpoint re-targets it.
    pub fn default_status(&self) -> StatusCode {
        match self {
            QuizError::NotEnrolled | QuizError::Locked { .. } => StatusCode::FORBIDDEN,
            QuizError::LessonNotInCourse { .. }
            | QuizError::AlreadyCompleted { .. }
            | QuizError::InvalidAnswer(_) => StatusCode::BAD_REQUEST,
            QuizError::NoQuizForCourse { .. }
            | QuizError::QuizNotFound { .. }
            | QuizError::CourseNotFound { .. } => StatusCode::NOT_FOUND,
            QuizError::AlreadySubmitted { .. } => StatusCode::CONFLICT,
        }
    }
}

impl fmt::Display for QuizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizError::NotEnrolled => write!(f, "You are not enrolled in this course"),
            QuizError::LessonNotInCourse { lesson_id, course_id } => {
                write!(f, "Lesson {} does not belong to course {}", lesson_id, course_id)
            }
            QuizError::AlreadyCompleted { lesson_id } => {
                write!(f, "Lesson {} is already completed", lesson_id)
            }
            QuizError::NoQuizForCourse { course_id } => {
                write!(f, "No quiz available for course {}", course_id)
            }
            QuizError::QuizNotFound { quiz_id } => write!(f, "Quiz {} not found", quiz_id),
            QuizError::CourseNotFound { course_id } => write!(f, "Course {} not found", course_id),
            QuizError::Locked { current, required } => write!(
                f,
                "Quiz is locked. Complete {}% of the course to unlock it (current: {}%)",
                required, current
            ),
            QuizError::AlreadySubmitted { quiz_id } => {
                write!(f, "Quiz {} has already been submitted", quiz_id)
            }
            QuizError::InvalidAnswer(msg) => write!(f, "Invalid answer: {}", msg),
        }
    }
}

impl std::error::Error for QuizError {}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (authenticated, wrong role)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username)
    Conflict(String),

    /// Quiz workflow rejection with the status it is reported under.
    Quiz(QuizError, StatusCode),
}

impl AppError {
    /// Reports a `NotEnrolled` rejection under `status`; other errors pass through.
    pub fn not_enrolled_as(self, status: StatusCode) -> Self {
        match self {
            AppError::Quiz(QuizError::NotEnrolled, _) => AppError::Quiz(QuizError::NotEnrolled, status),
            other => other,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        let status = err.default_status();
        AppError::Quiz(err, status)
    }
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    "INTERNAL",
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED"),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, "FORBIDDEN"),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, "CONFLICT"),
            AppError::Quiz(err, status) => {
                let mut body = json!({
                    "error": err.to_string(),
                    "code": err.code(),
                });
                if let QuizError::Locked { current, required } = err {
                    body["currentPerformance"] = json!(current);
                    body["requiredPerformance"] = json!(required);
                }
                return (status, Json(body)).into_response();
            }
        };
        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
