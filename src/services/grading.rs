// src/services/grading.rs

//! Quiz Grading Engine: sanitized question delivery and scoring of submissions.

use std::collections::HashMap;

use crate::{
    error::{AppError, QuizError},
    models::quiz::{
        AnswerSubmission, AttemptStatus, NewAttempt, PublicOption, PublicQuestion,
        QuestionResult, Quiz, QuizQuestionsResponse, SubmitQuizResponse,
    },
    services::gate,
    store::Store,
};

/// Outcome of grading one answer set against a quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub score: i32,
    pub total_marks: i32,
    pub percentage: i32,
    pub passed: bool,
    pub results: Vec<QuestionResult>,
}

/// `round(100 * score / total)`, kept within 0..=100.
pub fn percentage(score: i32, total_marks: i32) -> i32 {
    if total_marks <= 0 {
        return 0;
    }
    let pct = (score as f64 * 100.0 / total_marks as f64).round() as i32;
    pct.clamp(0, 100)
}

/// Strips the answer key from every option.
pub fn public_questions(quiz: &Quiz) -> QuizQuestionsResponse {
    let questions = quiz
        .questions
        .iter()
        .enumerate()
        .map(|(index, q)| PublicQuestion {
            id: index,
            question: q.question.clone(),
            options: q
                .options
                .iter()
                .map(|o| PublicOption {
                    text: o.text.clone(),
                })
                .collect(),
            marks: q.marks(),
        })
        .collect();

    QuizQuestionsResponse {
        quiz_id: quiz.id,
        title: quiz.title.clone(),
        total_marks: quiz.total_marks(),
        duration: quiz.duration_minutes,
        passing_percentage: quiz.passing_percentage,
        questions,
    }
}

/// Scores `answers` against the answer key of `quiz`.
///
/// Pure: the same quiz and answers always produce the same grade.
/// Unanswered questions score zero; out-of-range or repeated question
/// indexes and out-of-range options are rejected.
pub fn grade(quiz: &Quiz, answers: &[AnswerSubmission]) -> Result<Grade, QuizError> {
    let mut selected: HashMap<usize, usize> = HashMap::with_capacity(answers.len());
    for answer in answers {
        let Some(question) = quiz.questions.get(answer.question_index) else {
            return Err(QuizError::InvalidAnswer(format!(
                "question {} does not exist",
                answer.question_index
            )));
        };
        if answer.selected_option >= question.options.len() {
            return Err(QuizError::InvalidAnswer(format!(
                "question {} has no option {}",
                answer.question_index, answer.selected_option
            )));
        }
        if selected
            .insert(answer.question_index, answer.selected_option)
            .is_some()
        {
            return Err(QuizError::InvalidAnswer(format!(
                "question {} answered more than once",
                answer.question_index
            )));
        }
    }

    let mut score = 0;
    let mut results = Vec::with_capacity(quiz.questions.len());

    for (index, question) in quiz.questions.iter().enumerate() {
        let chosen = selected.get(&index).and_then(|&i| question.options.get(i));
        let is_correct = chosen.is_some_and(|o| o.is_correct);
        let marks_awarded = if is_correct { question.marks() } else { 0 };
        score += marks_awarded;

        results.push(QuestionResult {
            question_index: index,
            question: question.question.clone(),
            selected_answer: chosen.map(|o| o.text.clone()),
            correct_answer: question.correct_option().map(|o| o.text.clone()),
            is_correct,
            marks_awarded,
        });
    }

    let total_marks = quiz.total_marks();
    let percentage = percentage(score, total_marks);

    Ok(Grade {
        score,
        total_marks,
        percentage,
        passed: percentage >= quiz.passing_percentage,
        results,
    })
}

/// `getQuestions`: the quiz without its answer key, for an eligible student.
pub async fn get_questions(
    store: &dyn Store,
    default_threshold: i32,
    student_id: i64,
    quiz_id: i64,
) -> Result<QuizQuestionsResponse, AppError> {
    let (quiz, _) = gate::authorize_quiz_access(store, default_threshold, student_id, quiz_id).await?;
    Ok(public_questions(&quiz))
}

/// `submit`: re-checks eligibility, grades, and records the attempt.
pub async fn submit(
    store: &dyn Store,
    default_threshold: i32,
    student_id: i64,
    quiz_id: i64,
    answers: &[AnswerSubmission],
) -> Result<SubmitQuizResponse, AppError> {
    let (quiz, enrollment) =
        gate::authorize_quiz_access(store, default_threshold, student_id, quiz_id).await?;

    // Fast path; the store re-checks under its lock before writing.
    if enrollment.quiz_taken {
        return Err(QuizError::AlreadySubmitted { quiz_id }.into());
    }

    let grade = grade(&quiz, answers)?;

    store
        .record_attempt(NewAttempt {
            quiz_id: quiz.id,
            course_id: quiz.course_id,
            student_id,
            marks: grade.score,
            percentage: grade.percentage,
            status: AttemptStatus::from_passed(grade.passed),
        })
        .await?;

    tracing::info!(
        student_id,
        quiz_id,
        score = grade.score,
        percentage = grade.percentage,
        passed = grade.passed,
        "Quiz graded"
    );

    Ok(SubmitQuizResponse {
        success: true,
        score: grade.score,
        total_marks: grade.total_marks,
        percentage: grade.percentage,
        passed: grade.passed,
        passing_percentage: quiz.passing_percentage,
        results: grade.results,
    })
}
