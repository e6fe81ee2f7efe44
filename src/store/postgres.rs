// src/store/postgres.rs

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
    types::Json,
};

use crate::{
    error::{AppError, QuizError},
    models::{
        course::{Course, CourseDetail, Lesson, NewCourse},
        enrollment::{ENROLLMENT_ACTIVE, ENROLLMENT_DROPPED, Enrollment, LessonProgress},
        quiz::{
            AttemptStatus, LeaderboardEntry, NewAttempt, NewQuiz, Question, Quiz, QuizAttempt,
            StudentMark,
        },
        user::{NewUser, User},
    },
    services::progress,
    store::Store,
};

const USER_COLUMNS: &str = "id, username, password, role, total_hours_learned, created_at";
const COURSE_COLUMNS: &str =
    "id, title, description, thumbnail_url, instructor_id, quiz_unlock_threshold, created_at";
const ENROLLMENT_COLUMNS: &str = "id, student_id, course_id, status, completion_percentage, \
     completed_lesson_ids, hours_spent, quiz_taken, quiz_marks, quiz_percentage, enrolled_at";
const QUIZ_COLUMNS: &str = "id, course_id, lesson_id, title, questions, total_marks, \
     passing_percentage, duration_minutes, created_at";
const ATTEMPT_COLUMNS: &str =
    "id, quiz_id, course_id, student_id, attempt_number, marks, percentage, passed, submitted_at";

const CONNECT_RETRIES: u32 = 5;

/// PostgreSQL-backed store. Read-modify-write paths lock the enrollment row
/// with `SELECT ... FOR UPDATE` inside a transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with retry (the database may still be starting) and applies
    /// pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let mut retry_count = 0;
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) => {
                    retry_count += 1;
                    if retry_count > CONNECT_RETRIES {
                        return Err(AppError::InternalServerError(format!(
                            "Failed to connect to database after {} retries: {}",
                            CONNECT_RETRIES, e
                        )));
                    }
                    tracing::warn!(
                        "Database not ready, retrying in 2s... (Attempt {})",
                        retry_count
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        };
        tracing::info!("Database connected...");

        tracing::info!("Running migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(format!("Migration failed: {}", e)))?;
        tracing::info!("Migrations applied successfully.");

        Ok(Self::new(pool))
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn quiz_from_row(row: &PgRow) -> Result<Quiz, sqlx::Error> {
    let questions: Json<Vec<Question>> = row.try_get("questions")?;
    Ok(Quiz {
        id: row.try_get("id")?,
        course_id: row.try_get("course_id")?,
        lesson_id: row.try_get("lesson_id")?,
        title: row.try_get("title")?,
        questions: questions.0,
        total_marks: row.try_get("total_marks")?,
        passing_percentage: row.try_get("passing_percentage")?,
        duration_minutes: row.try_get("duration_minutes")?,
        created_at: row.try_get("created_at")?,
    })
}

fn attempt_from_row(row: &PgRow) -> Result<QuizAttempt, sqlx::Error> {
    Ok(QuizAttempt {
        id: row.try_get("id")?,
        quiz_id: row.try_get("quiz_id")?,
        course_id: row.try_get("course_id")?,
        student_id: row.try_get("student_id")?,
        attempt_number: row.try_get("attempt_number")?,
        marks: row.try_get("marks")?,
        percentage: row.try_get("percentage")?,
        status: AttemptStatus::from_passed(row.try_get("passed")?),
        submitted_at: row.try_get("submitted_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password, role) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&new.username)
        .bind(&new.password)
        .bind(&new.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Username '{}' already exists", new.username))
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_course(&self, new: NewCourse) -> Result<CourseDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let course = sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses (title, description, thumbnail_url, instructor_id, quiz_unlock_threshold)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            COURSE_COLUMNS
        ))
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.thumbnail_url)
        .bind(new.instructor_id)
        .bind(new.quiz_unlock_threshold)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create course: {:?}", e);
            AppError::from(e)
        })?;

        let mut lessons = Vec::with_capacity(new.lessons.len());
        for (position, title) in new.lessons.iter().enumerate() {
            let lesson = sqlx::query_as::<_, Lesson>(
                r#"
                INSERT INTO lessons (course_id, title, position)
                VALUES ($1, $2, $3)
                RETURNING id, course_id, title, position
                "#,
            )
            .bind(course.id)
            .bind(title)
            .bind(position as i32 + 1)
            .fetch_one(&mut *tx)
            .await?;
            lessons.push(lesson);
        }

        tx.commit().await?;

        Ok(CourseDetail { course, lessons })
    }

    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT {} FROM courses ORDER BY id",
            COURSE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    async fn find_course(&self, id: i64) -> Result<Option<CourseDetail>, AppError> {
        let Some(course) = sqlx::query_as::<_, Course>(&format!(
            "SELECT {} FROM courses WHERE id = $1",
            COURSE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT id, course_id, title, position FROM lessons WHERE course_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(CourseDetail { course, lessons }))
    }

    async fn enroll(&self, student_id: i64, course_id: i64) -> Result<Enrollment, AppError> {
        let exists = sqlx::query("SELECT 1 FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(QuizError::CourseNotFound { course_id }.into());
        }

        // An active row makes the conflict update a no-op, so nothing is returned.
        sqlx::query_as::<_, Enrollment>(&format!(
            r#"
            INSERT INTO enrollments (student_id, course_id) VALUES ($1, $2)
            ON CONFLICT (student_id, course_id) DO UPDATE SET status = $3
            WHERE enrollments.status = $4
            RETURNING {}
            "#,
            ENROLLMENT_COLUMNS
        ))
        .bind(student_id)
        .bind(course_id)
        .bind(ENROLLMENT_ACTIVE)
        .bind(ENROLLMENT_DROPPED)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to enroll: {:?}", e);
            AppError::from(e)
        })?
        .ok_or_else(|| AppError::Conflict("Already enrolled in this course".to_string()))
    }

    async fn drop_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Enrollment, AppError> {
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            r#"
            UPDATE enrollments SET status = $3
            WHERE student_id = $1 AND course_id = $2 AND status = $4
            RETURNING {}
            "#,
            ENROLLMENT_COLUMNS
        ))
        .bind(student_id)
        .bind(course_id)
        .bind(ENROLLMENT_DROPPED)
        .bind(ENROLLMENT_ACTIVE)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(QuizError::NotEnrolled)?;
        Ok(enrollment)
    }

    async fn find_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Option<Enrollment>, AppError> {
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {} FROM enrollments WHERE student_id = $1 AND course_id = $2",
            ENROLLMENT_COLUMNS
        ))
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(enrollment)
    }

    async fn list_enrollments(&self, student_id: i64) -> Result<Vec<Enrollment>, AppError> {
        let enrollments = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {} FROM enrollments WHERE student_id = $1 ORDER BY enrolled_at DESC",
            ENROLLMENT_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(enrollments)
    }

    async fn complete_lesson(
        &self,
        student_id: i64,
        course_id: i64,
        lesson_id: i64,
        hours_spent: f64,
    ) -> Result<LessonProgress, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {} FROM enrollments WHERE student_id = $1 AND course_id = $2 FOR UPDATE",
            ENROLLMENT_COLUMNS
        ))
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(QuizError::NotEnrolled)?;

        let lesson_ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM lessons WHERE course_id = $1")
                .bind(course_id)
                .fetch_all(&mut *tx)
                .await?;

        progress::apply_completion(&mut enrollment, &lesson_ids, lesson_id, hours_spent)?;

        sqlx::query(
            r#"
            UPDATE enrollments
            SET completed_lesson_ids = $1, completion_percentage = $2, hours_spent = $3
            WHERE id = $4
            "#,
        )
        .bind(enrollment.completed_lesson_ids.clone())
        .bind(enrollment.completion_percentage)
        .bind(enrollment.hours_spent)
        .bind(enrollment.id)
        .execute(&mut *tx)
        .await?;

        let total_hours_learned: f64 = sqlx::query_scalar(
            r#"
            UPDATE users SET total_hours_learned = total_hours_learned + $1
            WHERE id = $2
            RETURNING total_hours_learned
            "#,
        )
        .bind(hours_spent.max(0.0))
        .bind(student_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit lesson completion: {:?}", e);
            AppError::from(e)
        })?;

        Ok(LessonProgress {
            message: "Lesson marked as completed".to_string(),
            completion_percentage: enrollment.completion_percentage,
            hours_spent: enrollment.hours_spent,
            total_hours_learned,
        })
    }

    async fn create_quiz(&self, new: NewQuiz) -> Result<Quiz, AppError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO quizzes
                (course_id, lesson_id, title, questions, total_marks, passing_percentage, duration_minutes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            QUIZ_COLUMNS
        ))
        .bind(new.course_id)
        .bind(new.lesson_id)
        .bind(&new.title)
        .bind(Json(&new.questions))
        .bind(new.total_marks)
        .bind(new.passing_percentage)
        .bind(new.duration_minutes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Course {} already has a quiz", new.course_id))
            } else {
                tracing::error!("Failed to create quiz: {:?}", e);
                AppError::from(e)
            }
        })?;

        Ok(quiz_from_row(&row)?)
    }

    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM quizzes WHERE id = $1", QUIZ_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(quiz_from_row).transpose()?)
    }

    async fn find_quiz_for_course(&self, course_id: i64) -> Result<Option<Quiz>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM quizzes WHERE course_id = $1",
            QUIZ_COLUMNS
        ))
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(quiz_from_row).transpose()?)
    }

    async fn record_attempt(&self, new: NewAttempt) -> Result<QuizAttempt, AppError> {
        let mut tx = self.pool.begin().await?;

        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            r#"
            SELECT {} FROM enrollments
            WHERE student_id = $1 AND course_id = $2 AND status = 'active'
            FOR UPDATE
            "#,
            ENROLLMENT_COLUMNS
        ))
        .bind(new.student_id)
        .bind(new.course_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(QuizError::NotEnrolled)?;

        // Checked under the row lock: a concurrent submission waits here and
        // then sees the first one's write.
        if enrollment.quiz_taken {
            return Err(QuizError::AlreadySubmitted {
                quiz_id: new.quiz_id,
            }
            .into());
        }

        let previous: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quiz_attempts WHERE quiz_id = $1 AND student_id = $2",
        )
        .bind(new.quiz_id)
        .bind(new.student_id)
        .fetch_one(&mut *tx)
        .await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO quiz_attempts
                (quiz_id, course_id, student_id, attempt_number, marks, percentage, passed)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(new.quiz_id)
        .bind(new.course_id)
        .bind(new.student_id)
        .bind(previous as i32 + 1)
        .bind(new.marks)
        .bind(new.percentage)
        .bind(new.status.is_passed())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::from(QuizError::AlreadySubmitted {
                    quiz_id: new.quiz_id,
                })
            } else {
                tracing::error!("Failed to insert quiz attempt: {:?}", e);
                AppError::from(e)
            }
        })?;
        let attempt = attempt_from_row(&row)?;

        sqlx::query(
            r#"
            UPDATE enrollments
            SET quiz_taken = TRUE, quiz_marks = $1, quiz_percentage = $2
            WHERE id = $3
            "#,
        )
        .bind(new.marks)
        .bind(new.percentage)
        .bind(enrollment.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit quiz attempt: {:?}", e);
            AppError::from(e)
        })?;

        Ok(attempt)
    }

    async fn find_attempt(
        &self,
        quiz_id: i64,
        student_id: i64,
    ) -> Result<Option<QuizAttempt>, AppError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM quiz_attempts
            WHERE quiz_id = $1 AND student_id = $2
            ORDER BY attempt_number DESC
            LIMIT 1
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(quiz_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(attempt_from_row).transpose()?)
    }

    async fn list_quiz_marks(&self, quiz_id: i64) -> Result<Vec<StudentMark>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT a.student_id, u.username, a.marks, a.percentage, a.passed, a.submitted_at
            FROM quiz_attempts a
            JOIN users u ON a.student_id = u.id
            WHERE a.quiz_id = $1
            ORDER BY a.submitted_at
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        let marks = rows
            .iter()
            .map(|row| -> Result<StudentMark, sqlx::Error> {
                Ok(StudentMark {
                    student_id: row.try_get("student_id")?,
                    username: row.try_get("username")?,
                    marks: row.try_get("marks")?,
                    percentage: row.try_get("percentage")?,
                    status: AttemptStatus::from_passed(row.try_get("passed")?),
                    submitted_at: row.try_get("submitted_at")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(marks)
    }

    async fn list_student_attempts(&self, student_id: i64) -> Result<Vec<QuizAttempt>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM quiz_attempts WHERE student_id = $1 ORDER BY submitted_at DESC",
            ATTEMPT_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(attempt_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn leaderboard(
        &self,
        quiz_id: i64,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT u.username, a.marks, a.percentage, a.submitted_at
            FROM quiz_attempts a
            JOIN users u ON a.student_id = u.id
            WHERE a.quiz_id = $1
            ORDER BY a.marks DESC, a.submitted_at ASC
            LIMIT $2
            "#,
        )
        .bind(quiz_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch leaderboard: {:?}", e);
            AppError::from(e)
        })?;

        let entries = rows
            .iter()
            .map(|row| -> Result<LeaderboardEntry, sqlx::Error> {
                Ok(LeaderboardEntry {
                    username: row.try_get("username")?,
                    marks: row.try_get("marks")?,
                    percentage: row.try_get("percentage")?,
                    submitted_at: row.try_get("submitted_at")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
