// src/store/mod.rs

//! Persistence seam. Handlers and services only see `dyn Store`.
//!
//! Mutations that derive state from a read (`complete_lesson`,
//! `record_attempt`) are single atomic read-modify-write operations in every
//! implementation.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        course::{Course, CourseDetail, NewCourse},
        enrollment::{Enrollment, LessonProgress},
        quiz::{LeaderboardEntry, NewAttempt, NewQuiz, Quiz, QuizAttempt, StudentMark},
        user::{NewUser, User},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, new: NewUser) -> Result<User, AppError>;
    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn create_course(&self, new: NewCourse) -> Result<CourseDetail, AppError>;
    async fn list_courses(&self) -> Result<Vec<Course>, AppError>;
    async fn find_course(&self, id: i64) -> Result<Option<CourseDetail>, AppError>;

    /// Fails with `Conflict` when the student is already actively enrolled.
    /// A dropped enrollment is reactivated with its progress intact.
    async fn enroll(&self, student_id: i64, course_id: i64) -> Result<Enrollment, AppError>;
    /// Soft-drops an active enrollment. Fails with `NotEnrolled` otherwise.
    async fn drop_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Enrollment, AppError>;
    async fn find_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Option<Enrollment>, AppError>;
    async fn list_enrollments(&self, student_id: i64) -> Result<Vec<Enrollment>, AppError>;

    /// Adds the lesson to the enrollment, recomputes the completion
    /// percentage and accumulates hours on the enrollment and the student,
    /// all in one atomic unit.
    async fn complete_lesson(
        &self,
        student_id: i64,
        course_id: i64,
        lesson_id: i64,
        hours_spent: f64,
    ) -> Result<LessonProgress, AppError>;

    /// Fails with `Conflict` when the course already has a quiz.
    async fn create_quiz(&self, new: NewQuiz) -> Result<Quiz, AppError>;
    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError>;
    async fn find_quiz_for_course(&self, course_id: i64) -> Result<Option<Quiz>, AppError>;

    /// Records a graded attempt and marks the enrollment as taken.
    /// Fails with `AlreadySubmitted` if the enrollment already has one.
    async fn record_attempt(&self, new: NewAttempt) -> Result<QuizAttempt, AppError>;
    async fn find_attempt(
        &self,
        quiz_id: i64,
        student_id: i64,
    ) -> Result<Option<QuizAttempt>, AppError>;
    async fn list_quiz_marks(&self, quiz_id: i64) -> Result<Vec<StudentMark>, AppError>;
    async fn list_student_attempts(&self, student_id: i64) -> Result<Vec<QuizAttempt>, AppError>;
    /// Best attempts first, earliest submission breaking ties.
    async fn leaderboard(&self, quiz_id: i64, limit: i64)
    -> Result<Vec<LeaderboardEntry>, AppError>;
}
