// src/services/progress.rs

//! Enrollment Progress Tracker: the single source of truth for how much of a
//! course a student has finished.

use crate::{
    error::{AppError, QuizError},
    models::enrollment::{CompleteLessonRequest, Enrollment, LessonProgress},
    store::Store,
};

/// Percentage of `total` lessons covered by `completed`, rounded half up.
pub fn completion_percentage(completed: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    let pct = (completed as f64 * 100.0 / total as f64).round() as i32;
    pct.clamp(0, 100)
}

/// Applies one lesson completion to `enrollment` in place.
///
/// Stores call this inside their locked read-modify-write so the lesson set,
/// the derived percentage and the hours move together.
pub fn apply_completion(
    enrollment: &mut Enrollment,
    course_lesson_ids: &[i64],
    lesson_id: i64,
    hours_spent: f64,
) -> Result<(), QuizError> {
    if !enrollment.is_active() {
        return Err(QuizError::NotEnrolled);
    }
    if !course_lesson_ids.contains(&lesson_id) {
        return Err(QuizError::LessonNotInCourse {
            lesson_id,
            course_id: enrollment.course_id,
        });
    }
    if enrollment.completed_lesson_ids.contains(&lesson_id) {
        return Err(QuizError::AlreadyCompleted { lesson_id });
    }

    enrollment.completed_lesson_ids.push(lesson_id);

    let completed = enrollment
        .completed_lesson_ids
        .iter()
        .filter(|id| course_lesson_ids.contains(id))
        .count();
    let pct = completion_percentage(completed, course_lesson_ids.len());
    // Lessons added to a course later must not pull progress back down.
    enrollment.completion_percentage = enrollment.completion_percentage.max(pct);
    enrollment.hours_spent += hours_spent.max(0.0);

    Ok(())
}

/// `completeLesson`: records a finished lesson for the calling student.
pub async fn complete_lesson(
    store: &dyn Store,
    student_id: i64,
    req: &CompleteLessonRequest,
) -> Result<LessonProgress, AppError> {
    let progress = store
        .complete_lesson(student_id, req.course_id, req.lesson_id, req.hours_spent)
        .await?;

    tracing::info!(
        student_id,
        course_id = req.course_id,
        lesson_id = req.lesson_id,
        completion = progress.completion_percentage,
        "Lesson completed"
    );

    Ok(progress)
}
