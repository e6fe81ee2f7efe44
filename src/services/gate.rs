// src/services/gate.rs

//! Quiz Lock Gate. Every decision is re-derived from persisted enrollment
//! state; a client-side "unlocked" flag is never accepted.

use crate::{
    error::{AppError, QuizError},
    models::{
        course::Course,
        enrollment::Enrollment,
        quiz::{LockStatus, Quiz, QuizAttempt},
    },
    store::Store,
};

/// Completion needed to unlock the quiz of `course`.
pub fn required_performance(course: &Course, default_threshold: i32) -> i32 {
    course
        .quiz_unlock_threshold
        .unwrap_or(default_threshold)
        .clamp(0, 100)
}

pub fn is_unlocked(completion_percentage: i32, required: i32) -> bool {
    completion_percentage >= required
}

/// Fails with `Locked` unless the enrollment has reached `required`.
pub fn ensure_unlocked(enrollment: &Enrollment, required: i32) -> Result<(), QuizError> {
    if is_unlocked(enrollment.completion_percentage, required) {
        Ok(())
    } else {
        Err(QuizError::Locked {
            current: enrollment.completion_percentage,
            required,
        })
    }
}

/// Builds the status object. An existing attempt is always surfaced,
/// whatever the current lock state.
pub fn evaluate(
    quiz_id: i64,
    enrollment: &Enrollment,
    required: i32,
    attempt: Option<&QuizAttempt>,
) -> LockStatus {
    let unlocked = is_unlocked(enrollment.completion_percentage, required);
    let quiz_taken = attempt.is_some() || enrollment.quiz_taken;

    LockStatus {
        quiz_id,
        is_locked: !unlocked,
        is_unlocked: unlocked,
        course_performance: enrollment.completion_percentage,
        required_performance: required,
        quiz_taken,
        marks: attempt.map(|a| a.marks).or(enrollment.quiz_marks),
        percentage: attempt.map(|a| a.percentage).or(enrollment.quiz_percentage),
        status: attempt.map(|a| a.status),
    }
}

async fn active_enrollment(
    store: &dyn Store,
    student_id: i64,
    course_id: i64,
) -> Result<Enrollment, AppError> {
    store
        .find_enrollment(student_id, course_id)
        .await?
        .filter(Enrollment::is_active)
        .ok_or_else(|| QuizError::NotEnrolled.into())
}

/// `getLockStatus`: read-only view of the quiz state for one student and course.
pub async fn get_lock_status(
    store: &dyn Store,
    default_threshold: i32,
    student_id: i64,
    course_id: i64,
) -> Result<LockStatus, AppError> {
    let enrollment = active_enrollment(store, student_id, course_id).await?;

    let quiz = store
        .find_quiz_for_course(course_id)
        .await?
        .ok_or(QuizError::NoQuizForCourse { course_id })?;

    let course = store
        .find_course(course_id)
        .await?
        .ok_or(QuizError::CourseNotFound { course_id })?;

    let required = required_performance(&course.course, default_threshold);
    let attempt = store.find_attempt(quiz.id, student_id).await?;

    Ok(evaluate(quiz.id, &enrollment, required, attempt.as_ref()))
}

/// Resolves quiz, course and enrollment for a privileged quiz call and
/// checks eligibility. Used by both question retrieval and submission.
pub async fn authorize_quiz_access(
    store: &dyn Store,
    default_threshold: i32,
    student_id: i64,
    quiz_id: i64,
) -> Result<(Quiz, Enrollment), AppError> {
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or(QuizError::QuizNotFound { quiz_id })?;

    let enrollment = active_enrollment(store, student_id, quiz.course_id).await?;

    let course = store
        .find_course(quiz.course_id)
        .await?
        .ok_or(QuizError::CourseNotFound {
            course_id: quiz.course_id,
        })?;

    let required = required_performance(&course.course, default_threshold);
    if let Err(err) = ensure_unlocked(&enrollment, required) {
        tracing::warn!(student_id, quiz_id, "Rejected access to locked quiz");
        return Err(err.into());
    }

    Ok((quiz, enrollment))
}
