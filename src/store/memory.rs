// src/store/memory.rs

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, QuizError},
    models::{
        course::{Course, CourseDetail, Lesson, NewCourse},
        enrollment::{ENROLLMENT_ACTIVE, ENROLLMENT_DROPPED, Enrollment, LessonProgress},
        quiz::{LeaderboardEntry, NewAttempt, NewQuiz, Quiz, QuizAttempt, StudentMark},
        user::{NewUser, User},
    },
    services::progress,
    store::Store,
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: Vec<User>,
    courses: Vec<Course>,
    lessons: Vec<Lesson>,
    enrollments: Vec<Enrollment>,
    quizzes: Vec<Quiz>,
    attempts: Vec<QuizAttempt>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn course_detail(&self, course: &Course) -> CourseDetail {
        let mut lessons: Vec<Lesson> = self
            .lessons
            .iter()
            .filter(|l| l.course_id == course.id)
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.position);
        CourseDetail {
            course: course.clone(),
            lessons,
        }
    }

    fn username(&self, user_id: i64) -> String {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }
}

/// In-process store. Every operation runs under one lock, which makes each
/// read-modify-write atomic. Used by tests and by local runs without a database.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.username == new.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                new.username
            )));
        }
        let user = User {
            id: inner.next_id(),
            username: new.username,
            password: new.password,
            role: new.role,
            total_hours_learned: 0.0,
            created_at: Some(Utc::now()),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_course(&self, new: NewCourse) -> Result<CourseDetail, AppError> {
        let mut inner = self.inner.write().await;
        let course = Course {
            id: inner.next_id(),
            title: new.title,
            description: new.description,
            thumbnail_url: new.thumbnail_url,
            instructor_id: new.instructor_id,
            quiz_unlock_threshold: new.quiz_unlock_threshold,
            created_at: Some(Utc::now()),
        };
        for (position, title) in new.lessons.into_iter().enumerate() {
            let lesson = Lesson {
                id: inner.next_id(),
                course_id: course.id,
                title,
                position: position as i32 + 1,
            };
            inner.lessons.push(lesson);
        }
        inner.courses.push(course.clone());
        Ok(inner.course_detail(&course))
    }

    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.courses.clone())
    }

    async fn find_course(&self, id: i64) -> Result<Option<CourseDetail>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .courses
            .iter()
            .find(|c| c.id == id)
            .map(|c| inner.course_detail(c)))
    }

    async fn enroll(&self, student_id: i64, course_id: i64) -> Result<Enrollment, AppError> {
        let mut inner = self.inner.write().await;
        if !inner.courses.iter().any(|c| c.id == course_id) {
            return Err(QuizError::CourseNotFound { course_id }.into());
        }
        if let Some(existing) = inner
            .enrollments
            .iter_mut()
            .find(|e| e.student_id == student_id && e.course_id == course_id)
        {
            if existing.is_active() {
                return Err(AppError::Conflict("Already enrolled in this course".to_string()));
            }
            existing.status = ENROLLMENT_ACTIVE.to_string();
            return Ok(existing.clone());
        }
        let enrollment = Enrollment {
            id: inner.next_id(),
            student_id,
            course_id,
            status: ENROLLMENT_ACTIVE.to_string(),
            completion_percentage: 0,
            completed_lesson_ids: Vec::new(),
            hours_spent: 0.0,
            quiz_taken: false,
            quiz_marks: None,
            quiz_percentage: None,
            enrolled_at: Some(Utc::now()),
        };
        inner.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn drop_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Enrollment, AppError> {
        let mut inner = self.inner.write().await;
        let enrollment = inner
            .enrollments
            .iter_mut()
            .find(|e| e.student_id == student_id && e.course_id == course_id)
            .filter(|e| e.is_active())
            .ok_or(QuizError::NotEnrolled)?;
        enrollment.status = ENROLLMENT_DROPPED.to_string();
        Ok(enrollment.clone())
    }

    async fn find_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Option<Enrollment>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .enrollments
            .iter()
            .find(|e| e.student_id == student_id && e.course_id == course_id)
            .cloned())
    }

    async fn list_enrollments(&self, student_id: i64) -> Result<Vec<Enrollment>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn complete_lesson(
        &self,
        student_id: i64,
        course_id: i64,
        lesson_id: i64,
        hours_spent: f64,
    ) -> Result<LessonProgress, AppError> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let lesson_ids: Vec<i64> = inner
            .lessons
            .iter()
            .filter(|l| l.course_id == course_id)
            .map(|l| l.id)
            .collect();

        let enrollment = inner
            .enrollments
            .iter_mut()
            .find(|e| e.student_id == student_id && e.course_id == course_id)
            .ok_or(QuizError::NotEnrolled)?;

        progress::apply_completion(enrollment, &lesson_ids, lesson_id, hours_spent)?;
        let completion_percentage = enrollment.completion_percentage;
        let enrollment_hours = enrollment.hours_spent;

        let total_hours_learned = match inner.users.iter_mut().find(|u| u.id == student_id) {
            Some(user) => {
                user.total_hours_learned += hours_spent.max(0.0);
                user.total_hours_learned
            }
            None => enrollment_hours,
        };

        Ok(LessonProgress {
            message: "Lesson marked as completed".to_string(),
            completion_percentage,
            hours_spent: enrollment_hours,
            total_hours_learned,
        })
    }

    async fn create_quiz(&self, new: NewQuiz) -> Result<Quiz, AppError> {
        let mut inner = self.inner.write().await;
        if inner.quizzes.iter().any(|q| q.course_id == new.course_id) {
            return Err(AppError::Conflict(format!(
                "Course {} already has a quiz",
                new.course_id
            )));
        }
        let quiz = Quiz {
            id: inner.next_id(),
            course_id: new.course_id,
            lesson_id: new.lesson_id,
            title: new.title,
            questions: new.questions,
            total_marks: new.total_marks,
            passing_percentage: new.passing_percentage,
            duration_minutes: new.duration_minutes,
            created_at: Some(Utc::now()),
        };
        inner.quizzes.push(quiz.clone());
        Ok(quiz)
    }

    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.quizzes.iter().find(|q| q.id == id).cloned())
    }

    async fn find_quiz_for_course(&self, course_id: i64) -> Result<Option<Quiz>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.quizzes.iter().find(|q| q.course_id == course_id).cloned())
    }

    async fn record_attempt(&self, new: NewAttempt) -> Result<QuizAttempt, AppError> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let enrollment = inner
            .enrollments
            .iter_mut()
            .find(|e| e.student_id == new.student_id && e.course_id == new.course_id)
            .filter(|e| e.is_active())
            .ok_or(QuizError::NotEnrolled)?;

        if enrollment.quiz_taken {
            return Err(QuizError::AlreadySubmitted {
                quiz_id: new.quiz_id,
            }
            .into());
        }
        enrollment.quiz_taken = true;
        enrollment.quiz_marks = Some(new.marks);
        enrollment.quiz_percentage = Some(new.percentage);

        let attempt_number = inner
            .attempts
            .iter()
            .filter(|a| a.quiz_id == new.quiz_id && a.student_id == new.student_id)
            .count() as i32
            + 1;

        let attempt = QuizAttempt {
            id: inner.next_id(),
            quiz_id: new.quiz_id,
            course_id: new.course_id,
            student_id: new.student_id,
            attempt_number,
            marks: new.marks,
            percentage: new.percentage,
            status: new.status,
            submitted_at: Utc::now(),
        };
        inner.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn find_attempt(
        &self,
        quiz_id: i64,
        student_id: i64,
    ) -> Result<Option<QuizAttempt>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .attempts
            .iter()
            .filter(|a| a.quiz_id == quiz_id && a.student_id == student_id)
            .max_by_key(|a| a.attempt_number)
            .cloned())
    }

    async fn list_quiz_marks(&self, quiz_id: i64) -> Result<Vec<StudentMark>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .attempts
            .iter()
            .filter(|a| a.quiz_id == quiz_id)
            .map(|a| StudentMark {
                student_id: a.student_id,
                username: inner.username(a.student_id),
                marks: a.marks,
                percentage: a.percentage,
                status: a.status,
                submitted_at: a.submitted_at,
            })
            .collect())
    }

    async fn list_student_attempts(&self, student_id: i64) -> Result<Vec<QuizAttempt>, AppError> {
        let inner = self.inner.read().await;
        let mut attempts: Vec<QuizAttempt> = inner
            .attempts
            .iter()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(attempts)
    }

    async fn leaderboard(
        &self,
        quiz_id: i64,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let inner = self.inner.read().await;
        let mut attempts: Vec<&QuizAttempt> =
            inner.attempts.iter().filter(|a| a.quiz_id == quiz_id).collect();
        attempts.sort_by(|a, b| {
            b.marks
                .cmp(&a.marks)
                .then_with(|| a.submitted_at.cmp(&b.submitted_at))
        });
        Ok(attempts
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|a| LeaderboardEntry {
                username: inner.username(a.student_id),
                marks: a.marks,
                percentage: a.percentage,
                submitted_at: a.submitted_at,
            })
            .collect())
    }
}
