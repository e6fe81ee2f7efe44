// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One answer choice of a question, as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// A single-answer question. Stored as JSON inside the quiz row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: Vec<QuizOption>,
    /// Marks awarded for a correct answer; 1 when unset.
    pub marks: Option<i32>,
}

impl Question {
    pub fn marks(&self) -> i32 {
        self.marks.unwrap_or(1)
    }

    pub fn correct_option(&self) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.is_correct)
    }
}

/// Represents the 'quizzes' table. One quiz per course.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,
    pub lesson_id: Option<i64>,
    pub title: String,
    pub questions: Vec<Question>,
    /// Explicit override of the question marks sum.
    pub total_marks: Option<i32>,
    pub passing_percentage: i32,
    pub duration_minutes: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Quiz {
    /// The explicit override, otherwise the sum of question marks.
    pub fn total_marks(&self) -> i32 {
        self.total_marks
            .unwrap_or_else(|| self.questions.iter().map(Question::marks).sum())
    }
}

/// Insert payload for the store, already validated and sanitized.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub course_id: i64,
    pub lesson_id: Option<i64>,
    pub title: String,
    pub questions: Vec<Question>,
    pub total_marks: Option<i32>,
    pub passing_percentage: i32,
    pub duration_minutes: i32,
}

/// DTO for authoring a question.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<QuizOption>,
    #[validate(range(min = 1, max = 100))]
    pub marks: Option<i32>,
}

/// DTO for authoring a quiz for a course.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    pub course_id: i64,
    pub lesson_id: Option<i64>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: i32,
    #[validate(range(min = 0, max = 100))]
    pub passing_percentage: Option<i32>,
    #[validate(range(min = 1))]
    pub total_marks: Option<i32>,
    #[validate(length(min = 1, message = "A quiz needs at least one question."))]
    #[validate(nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

/// Exactly one correct option among at least two.
fn validate_options(options: &[QuizOption]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    for opt in options {
        if opt.text.trim().is_empty() || opt.text.len() > 500 {
            return Err(validator::ValidationError::new("invalid_option_text"));
        }
    }
    if options.iter().filter(|o| o.is_correct).count() != 1 {
        return Err(validator::ValidationError::new("exactly_one_correct_option"));
    }
    Ok(())
}

/// Option as sent to students: the correctness flag is not part of the type.
#[derive(Debug, Clone, Serialize)]
pub struct PublicOption {
    pub text: String,
}

/// DTO for sending a question to a student (excludes the answer key).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    /// Question index within the quiz.
    pub id: usize,
    pub question: String,
    pub options: Vec<PublicOption>,
    pub marks: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestionsResponse {
    pub quiz_id: i64,
    pub title: String,
    pub total_marks: i32,
    /// Minutes.
    pub duration: i32,
    pub passing_percentage: i32,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_index: usize,
    pub selected_option: usize,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    #[serde(default)]
    pub answers: Vec<AnswerSubmission>,
}

/// Per-question row of a graded submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_index: usize,
    pub question: String,
    /// `None` when the question was left unanswered.
    pub selected_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub is_correct: bool,
    pub marks_awarded: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizResponse {
    pub success: bool,
    pub score: i32,
    pub total_marks: i32,
    pub percentage: i32,
    pub passed: bool,
    pub passing_percentage: i32,
    pub results: Vec<QuestionResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Passed,
    Failed,
}

impl AttemptStatus {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            AttemptStatus::Passed
        } else {
            AttemptStatus::Failed
        }
    }

    pub fn is_passed(self) -> bool {
        self == AttemptStatus::Passed
    }
}

/// Represents the 'quiz_attempts' table, the single record of graded submissions.
/// Quiz-centric and student-centric listings are both views over it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: i64,
    pub quiz_id: i64,
    pub course_id: i64,
    pub student_id: i64,
    pub attempt_number: i32,
    pub marks: i32,
    pub percentage: i32,
    pub status: AttemptStatus,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// Insert payload for a graded attempt.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub quiz_id: i64,
    pub course_id: i64,
    pub student_id: i64,
    pub marks: i32,
    pub percentage: i32,
    pub status: AttemptStatus,
}

/// Quiz-centric view of an attempt, for instructors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMark {
    pub student_id: i64,
    pub username: String,
    pub marks: i32,
    pub percentage: i32,
    pub status: AttemptStatus,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// Aggregated struct for displaying the leaderboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub marks: i32,
    pub percentage: i32,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<i64>,
}

/// Lock Gate answer for one student and course.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStatus {
    pub quiz_id: i64,
    pub is_locked: bool,
    pub is_unlocked: bool,
    pub course_performance: i32,
    pub required_performance: i32,
    pub quiz_taken: bool,
    pub marks: Option<i32>,
    pub percentage: Option<i32>,
    pub status: Option<AttemptStatus>,
}
