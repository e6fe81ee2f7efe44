// src/models/enrollment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const ENROLLMENT_ACTIVE: &str = "active";
pub const ENROLLMENT_DROPPED: &str = "dropped";

/// Represents the 'enrollments' table: one student's progress in one course.
///
/// `completion_percentage` only grows through lesson completion, and
/// `quiz_taken` never reverts once a graded attempt is recorded.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,

    /// 'active' or 'dropped'. Enrollments are never hard-deleted.
    pub status: String,

    /// 0..=100, derived from `completed_lesson_ids`.
    pub completion_percentage: i32,
    pub completed_lesson_ids: Vec<i64>,
    pub hours_spent: f64,

    pub quiz_taken: bool,
    pub quiz_marks: Option<i32>,
    pub quiz_percentage: Option<i32>,

    pub enrolled_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Enrollment {
    pub fn is_active(&self) -> bool {
        self.status == ENROLLMENT_ACTIVE
    }
}

/// DTO for marking a lesson as completed.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonRequest {
    pub lesson_id: i64,
    pub course_id: i64,
    #[validate(range(min = 0.0, max = 24.0, message = "hoursSpent must be between 0 and 24."))]
    #[serde(default)]
    pub hours_spent: f64,
}

/// Result of a lesson completion, for dashboard display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub message: String,
    pub completion_percentage: i32,
    /// Hours accumulated on this enrollment.
    pub hours_spent: f64,
    /// Hours accumulated across every enrollment of the student.
    pub total_hours_learned: f64,
}
