// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub instructor_id: i64,

    /// Completion percentage that unlocks this course's quiz.
    /// Falls back to the configured default when unset.
    pub quiz_unlock_threshold: Option<i32>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'lessons' table. Lessons are ordered by `position` within a course.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub position: i32,
}

/// A course together with its ordered lessons.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub lessons: Vec<Lesson>,
}

/// Insert payload for the store, already sanitized.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub instructor_id: i64,
    pub quiz_unlock_threshold: Option<i32>,
    /// Lesson titles in course order.
    pub lessons: Vec<String>,
}

/// DTO for creating a course with its lessons.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(custom(function = validate_thumbnail_url))]
    pub thumbnail_url: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub quiz_unlock_threshold: Option<i32>,
    #[validate(custom(function = validate_lessons))]
    pub lessons: Vec<String>,
}

fn validate_thumbnail_url(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_thumbnail_url"));
    }
    Ok(())
}

fn validate_lessons(lessons: &[String]) -> Result<(), validator::ValidationError> {
    if lessons.is_empty() {
        return Err(validator::ValidationError::new("lessons_cannot_be_empty"));
    }
    for title in lessons {
        if title.trim().is_empty() || title.len() > 200 {
            return Err(validator::ValidationError::new("invalid_lesson_title"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(lessons: Vec<&str>, thumbnail_url: Option<&str>) -> CreateCourseRequest {
        CreateCourseRequest {
            title: "Rust Basics".to_string(),
            description: None,
            thumbnail_url: thumbnail_url.map(str::to_string),
            quiz_unlock_threshold: None,
            lessons: lessons.into_iter().map(str::to_string).collect(),
        }
    }

    #[test]
    fn course_needs_lessons() {
        assert!(request(vec![], None).validate().is_err());
        assert!(request(vec!["Intro"], None).validate().is_ok());
        assert!(request(vec!["Intro", "  "], None).validate().is_err());
    }

    #[test]
    fn thumbnail_must_be_a_url() {
        assert!(request(vec!["Intro"], Some("not a url")).validate().is_err());
        assert!(
            request(vec!["Intro"], Some("https://cdn.example.com/a.png"))
                .validate()
                .is_ok()
        );
    }
}
