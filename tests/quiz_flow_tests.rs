// tests/quiz_flow_tests.rs

mod common;

use common::{course_with_quiz, finished_student, spawn_app};
use serde_json::{Value, json};

#[tokio::test]
async fn completion_percentage_grows_to_100() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, _) = course_with_quiz(&app, 3).await;
    let student = app.register_student("asha").await;
    app.enroll(&student, course_id).await;

    let mut expected = [33, 67, 100].into_iter();
    let mut total_hours = 0.0;
    for &lesson_id in &lesson_ids {
        let resp = app.complete_lesson(&student, course_id, lesson_id).await;
        assert_eq!(resp.status().as_u16(), 200);
        let body: Value = resp.json().await.unwrap();
        total_hours += 1.5;
        assert_eq!(body["completionPercentage"], expected.next().unwrap());
        assert_eq!(body["totalHoursLearned"].as_f64().unwrap(), total_hours);
        assert!(body["message"].is_string());
    }
}

#[tokio::test]
async fn completing_a_lesson_twice_is_rejected() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, _) = course_with_quiz(&app, 2).await;
    let student = app.register_student("asha").await;
    app.enroll(&student, course_id).await;

    let resp = app.complete_lesson(&student, course_id, lesson_ids[0]).await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app.complete_lesson(&student, course_id, lesson_ids[0]).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "ALREADY_COMPLETED");

    let enrollments: Vec<Value> = app
        .get(&student, "/api/me/enrollments")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(enrollments[0]["completionPercentage"], 50);
}

#[tokio::test]
async fn lesson_completion_requires_enrollment_and_course_lesson() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, _) = course_with_quiz(&app, 2).await;
    let student = app.register_student("asha").await;

    let resp = app.complete_lesson(&student, course_id, lesson_ids[0]).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "NOT_ENROLLED");

    app.enroll(&student, course_id).await;
    let resp = app.complete_lesson(&student, course_id, 424242).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "LESSON_NOT_IN_COURSE");
}

#[tokio::test]
async fn lock_status_tracks_completion() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, quiz_id) = course_with_quiz(&app, 2).await;
    let student = app.register_student("asha").await;
    app.enroll(&student, course_id).await;

    let path = format!("/api/quizzes/lock-status/{}", course_id);
    let status: Value = app.get(&student, &path).await.json().await.unwrap();
    assert_eq!(status["quizId"].as_i64().unwrap(), quiz_id);
    assert_eq!(status["isLocked"], true);
    assert_eq!(status["isUnlocked"], false);
    assert_eq!(status["coursePerformance"], 0);
    assert_eq!(status["requiredPerformance"], 100);
    assert_eq!(status["quizTaken"], false);
    assert!(status["marks"].is_null());

    app.complete_lesson(&student, course_id, lesson_ids[0]).await;
    let status: Value = app.get(&student, &path).await.json().await.unwrap();
    assert_eq!(status["isLocked"], true);
    assert_eq!(status["coursePerformance"], 50);

    app.complete_lesson(&student, course_id, lesson_ids[1]).await;
    let status: Value = app.get(&student, &path).await.json().await.unwrap();
    assert_eq!(status["isLocked"], false);
    assert_eq!(status["isUnlocked"], true);
    assert_eq!(status["coursePerformance"], 100);
}

#[tokio::test]
async fn lock_status_without_enrollment_is_404() {
    let app = spawn_app().await;
    let (course_id, _, _) = course_with_quiz(&app, 2).await;
    let student = app.register_student("asha").await;

    let resp = app
        .get(&student, &format!("/api/quizzes/lock-status/{}", course_id))
        .await;
    assert_eq!(resp.status().as_u16(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "NOT_ENROLLED");
}

#[tokio::test]
async fn lock_status_without_quiz_is_404() {
    let app = spawn_app().await;
    let instructor = app.seed_user("priya", "instructor").await;
    let (course_id, _) = app.create_course(&instructor, 1).await;
    let student = app.register_student("asha").await;
    app.enroll(&student, course_id).await;

    let resp = app
        .get(&student, &format!("/api/quizzes/lock-status/{}", course_id))
        .await;
    assert_eq!(resp.status().as_u16(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "NO_QUIZ_FOR_COURSE");
}

#[tokio::test]
async fn locked_quiz_hides_questions() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, quiz_id) = course_with_quiz(&app, 5).await;
    let student = app.register_student("asha").await;
    app.enroll(&student, course_id).await;
    app.complete_lesson(&student, course_id, lesson_ids[0]).await;
    app.complete_lesson(&student, course_id, lesson_ids[1]).await;

    let resp = app
        .get(&student, &format!("/api/quizzes/{}/questions", quiz_id))
        .await;
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "LOCKED");
    assert_eq!(body["currentPerformance"], 40);
    assert_eq!(body["requiredPerformance"], 100);

    // Submission is re-checked server-side, not trusted from the client.
    let resp = app
        .post(
            &student,
            &format!("/api/quizzes/{}/submit", quiz_id),
            json!({ "answers": [{ "questionIndex": 0, "selectedOption": 0 }] }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "LOCKED");
}

#[tokio::test]
async fn questions_require_enrollment() {
    let app = spawn_app().await;
    let (_, _, quiz_id) = course_with_quiz(&app, 1).await;
    let student = app.register_student("asha").await;

    let resp = app
        .get(&student, &format!("/api/quizzes/{}/questions", quiz_id))
        .await;
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "NOT_ENROLLED");

    let resp = app.get(&student, "/api/quizzes/9999/questions").await;
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn questions_never_leak_the_answer_key() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, quiz_id) = course_with_quiz(&app, 1).await;
    let student = finished_student(&app, "asha", course_id, &lesson_ids).await;

    let resp = app
        .get(&student, &format!("/api/quizzes/{}/questions", quiz_id))
        .await;
    assert_eq!(resp.status().as_u16(), 200);
    let text = resp.text().await.unwrap();
    assert!(!text.contains("isCorrect"));

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["quizId"].as_i64().unwrap(), quiz_id);
    assert_eq!(body["totalMarks"], 2);
    assert_eq!(body["passingPercentage"], 60);
    assert_eq!(body["duration"], 15);
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[1]["id"], 1);
    assert_eq!(questions[1]["options"][1]["text"], "String");
}

#[tokio::test]
async fn half_correct_submission_fails() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, quiz_id) = course_with_quiz(&app, 3).await;
    let student = finished_student(&app, "asha", course_id, &lesson_ids).await;

    let resp = app
        .post(
            &student,
            &format!("/api/quizzes/{}/submit", quiz_id),
            json!({ "answers": [
                { "questionIndex": 0, "selectedOption": 0 },
                { "questionIndex": 1, "selectedOption": 0 }
            ]}),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 200);
    let result: Value = resp.json().await.unwrap();
    assert_eq!(result["success"], true);
    assert_eq!(result["score"], 1);
    assert_eq!(result["totalMarks"], 2);
    assert_eq!(result["percentage"], 50);
    assert_eq!(result["passed"], false);
    assert_eq!(result["passingPercentage"], 60);

    let rows = result["results"].as_array().unwrap();
    assert_eq!(rows[0]["isCorrect"], true);
    assert_eq!(rows[0]["marksAwarded"], 1);
    assert_eq!(rows[1]["isCorrect"], false);
    assert_eq!(rows[1]["selectedAnswer"], "str");
    assert_eq!(rows[1]["correctAnswer"], "String");
}

#[tokio::test]
async fn full_marks_pass_and_show_in_lock_status() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, quiz_id) = course_with_quiz(&app, 3).await;
    let student = finished_student(&app, "asha", course_id, &lesson_ids).await;

    let resp = app
        .post(
            &student,
            &format!("/api/quizzes/{}/submit", quiz_id),
            json!({ "answers": [
                { "questionIndex": 0, "selectedOption": 0 },
                { "questionIndex": 1, "selectedOption": 1 }
            ]}),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 200);
    let result: Value = resp.json().await.unwrap();
    assert_eq!(result["score"], 2);
    assert_eq!(result["percentage"], 100);
    assert_eq!(result["passed"], true);

    let status: Value = app
        .get(&student, &format!("/api/quizzes/lock-status/{}", course_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(status["quizTaken"], true);
    assert_eq!(status["marks"], 2);
    assert_eq!(status["percentage"], 100);
    assert_eq!(status["status"], "passed");

    let attempts: Vec<Value> = app
        .get(&student, "/api/me/attempts")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["quizId"].as_i64().unwrap(), quiz_id);
    assert_eq!(attempts[0]["attemptNumber"], 1);
}

#[tokio::test]
async fn unanswered_questions_count_as_wrong() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, quiz_id) = course_with_quiz(&app, 1).await;
    let student = finished_student(&app, "asha", course_id, &lesson_ids).await;

    let result: Value = app
        .post(
            &student,
            &format!("/api/quizzes/{}/submit", quiz_id),
            json!({ "answers": [] }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(result["score"], 0);
    assert_eq!(result["percentage"], 0);
    assert!(result["results"][0]["selectedAnswer"].is_null());
}

#[tokio::test]
async fn invalid_answer_is_rejected_without_recording() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, quiz_id) = course_with_quiz(&app, 1).await;
    let student = finished_student(&app, "asha", course_id, &lesson_ids).await;

    let resp = app
        .post(
            &student,
            &format!("/api/quizzes/{}/submit", quiz_id),
            json!({ "answers": [{ "questionIndex": 5, "selectedOption": 0 }] }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_ANSWER");

    let status: Value = app
        .get(&student, &format!("/api/quizzes/lock-status/{}", course_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(status["quizTaken"], false);
}

#[tokio::test]
async fn second_submission_is_rejected() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, quiz_id) = course_with_quiz(&app, 1).await;
    let student = finished_student(&app, "asha", course_id, &lesson_ids).await;
    let path = format!("/api/quizzes/{}/submit", quiz_id);
    let answers = json!({ "answers": [{ "questionIndex": 0, "selectedOption": 0 }] });

    let resp = app.post(&student, &path, answers.clone()).await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app.post(&student, &path, answers).await;
    assert_eq!(resp.status().as_u16(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "ALREADY_SUBMITTED");

    let attempts: Vec<Value> = app
        .get(&student, "/api/me/attempts")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
}

#[tokio::test]
async fn concurrent_submissions_record_one_attempt() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, quiz_id) = course_with_quiz(&app, 1).await;
    let student = finished_student(&app, "asha", course_id, &lesson_ids).await;
    let url = app.url(&format!("/api/quizzes/{}/submit", quiz_id));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = app.client.clone();
        let url = url.clone();
        let token = student.clone();
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&json!({ "answers": [{ "questionIndex": 0, "selectedOption": 0 }] }))
                .send()
                .await
                .unwrap()
                .status()
                .as_u16()
        }));
    }

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }
    assert_eq!(statuses.iter().filter(|&&s| s == 200).count(), 1);
    assert_eq!(statuses.iter().filter(|&&s| s == 409).count(), 7);

    let instructor = app.login("priya").await;
    let marks: Vec<Value> = app
        .get(&instructor, &format!("/api/admin/quizzes/{}/marks", quiz_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(marks.len(), 1);
}

#[tokio::test]
async fn concurrent_completion_of_one_lesson_counts_once() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, _) = course_with_quiz(&app, 4).await;
    let student = app.register_student("asha").await;
    app.enroll(&student, course_id).await;
    let url = app.url("/api/lessons/complete");

    let mut handles = Vec::new();
    for _ in 0..6 {
        let client = app.client.clone();
        let url = url.clone();
        let token = student.clone();
        let lesson_id = lesson_ids[0];
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&json!({ "lessonId": lesson_id, "courseId": course_id, "hoursSpent": 1.0 }))
                .send()
                .await
                .unwrap()
                .status()
                .as_u16()
        }));
    }

    let mut ok = 0;
    for handle in handles {
        if handle.await.unwrap() == 200 {
            ok += 1;
        }
    }
    assert_eq!(ok, 1);

    let enrollments: Vec<Value> = app
        .get(&student, "/api/me/enrollments")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(enrollments[0]["completionPercentage"], 25);
    assert_eq!(enrollments[0]["hoursSpent"].as_f64().unwrap(), 1.0);
}

#[tokio::test]
async fn instructor_marks_and_leaderboard() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, quiz_id) = course_with_quiz(&app, 1).await;
    let path = format!("/api/quizzes/{}/submit", quiz_id);

    let asha = finished_student(&app, "asha", course_id, &lesson_ids).await;
    app.post(
        &asha,
        &path,
        json!({ "answers": [{ "questionIndex": 0, "selectedOption": 0 }] }),
    )
    .await;

    let ravi = finished_student(&app, "ravi", course_id, &lesson_ids).await;
    app.post(
        &ravi,
        &path,
        json!({ "answers": [
            { "questionIndex": 0, "selectedOption": 0 },
            { "questionIndex": 1, "selectedOption": 1 }
        ]}),
    )
    .await;

    let instructor = app.login("priya").await;
    let marks: Vec<Value> = app
        .get(&instructor, &format!("/api/admin/quizzes/{}/marks", quiz_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(marks.len(), 2);
    assert!(marks.iter().any(|m| m["username"] == "asha" && m["status"] == "failed"));
    assert!(marks.iter().any(|m| m["username"] == "ravi" && m["status"] == "passed"));

    // Students cannot read the instructor view.
    let resp = app
        .get(&asha, &format!("/api/admin/quizzes/{}/marks", quiz_id))
        .await;
    assert_eq!(resp.status().as_u16(), 403);

    let board: Vec<Value> = app
        .client
        .get(app.url(&format!("/api/quizzes/{}/leaderboard?limit=5", quiz_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0]["username"], "ravi");
    assert_eq!(board[0]["marks"], 2);
    assert_eq!(board[1]["username"], "asha");
}

#[tokio::test]
async fn course_threshold_unlocks_early() {
    let app = spawn_app().await;
    let instructor = app.seed_user("priya", "instructor").await;
    let resp = app
        .post(
            &instructor,
            "/api/admin/courses",
            json!({
                "title": "Async Rust",
                "quizUnlockThreshold": 50,
                "lessons": ["Futures", "Pinning"]
            }),
        )
        .await;
    let course: Value = resp.json().await.unwrap();
    let course_id = course["id"].as_i64().unwrap();
    let first_lesson = course["lessons"][0]["id"].as_i64().unwrap();
    let quiz_id = app.create_quiz(&instructor, course_id).await;

    let student = app.register_student("asha").await;
    app.enroll(&student, course_id).await;
    app.complete_lesson(&student, course_id, first_lesson).await;

    let status: Value = app
        .get(&student, &format!("/api/quizzes/lock-status/{}", course_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(status["requiredPerformance"], 50);
    assert_eq!(status["isUnlocked"], true);

    let resp = app
        .get(&student, &format!("/api/quizzes/{}/questions", quiz_id))
        .await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn marks_are_visible_only_to_the_course_owner() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, quiz_id) = course_with_quiz(&app, 1).await;
    let asha = finished_student(&app, "asha", course_id, &lesson_ids).await;
    app.post(
        &asha,
        &format!("/api/quizzes/{}/submit", quiz_id),
        json!({ "answers": [] }),
    )
    .await;
    let path = format!("/api/admin/quizzes/{}/marks", quiz_id);

    let other = app.seed_user("vikram", "instructor").await;
    let resp = app.get(&other, &path).await;
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "FORBIDDEN");
    assert!(body.get("username").is_none());

    let admin = app.seed_user("root", "admin").await;
    let marks: Vec<Value> = app.get(&admin, &path).await.json().await.unwrap();
    assert_eq!(marks.len(), 1);

    let owner = app.login("priya").await;
    let resp = app.get(&owner, &path).await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app.get(&owner, "/api/admin/quizzes/9999/marks").await;
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, quiz_id) = course_with_quiz(&app, 1).await;
    let student = finished_student(&app, "asha", course_id, &lesson_ids).await;

    // Missing courseId.
    let resp = app
        .post(&student, "/api/lessons/complete", json!({ "lessonId": lesson_ids[0] }))
        .await;
    assert_eq!(resp.status().as_u16(), 400);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("application/json"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["error"].as_str().unwrap().contains("courseId"));

    // Negative question index.
    let resp = app
        .post(
            &student,
            &format!("/api/quizzes/{}/submit", quiz_id),
            json!({ "answers": [{ "questionIndex": -1, "selectedOption": 0 }] }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");

    // Not JSON at all.
    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");

    // Nothing was recorded by the rejected submission.
    let status: Value = app
        .get(&student, &format!("/api/quizzes/lock-status/{}", course_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(status["quizTaken"], false);
}

#[tokio::test]
async fn dropped_enrollment_is_not_enrolled_until_rejoined() {
    let app = spawn_app().await;
    let (course_id, lesson_ids, quiz_id) = course_with_quiz(&app, 2).await;
    let student = app.register_student("asha").await;
    app.enroll(&student, course_id).await;
    app.complete_lesson(&student, course_id, lesson_ids[0]).await;

    let drop_path = format!("/api/courses/{}/drop", course_id);
    let resp = app.post(&student, &drop_path, json!({})).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "dropped");

    let resp = app
        .get(&student, &format!("/api/quizzes/lock-status/{}", course_id))
        .await;
    assert_eq!(resp.status().as_u16(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "NOT_ENROLLED");

    let resp = app.complete_lesson(&student, course_id, lesson_ids[1]).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "NOT_ENROLLED");

    let resp = app
        .get(&student, &format!("/api/quizzes/{}/questions", quiz_id))
        .await;
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app.post(&student, &drop_path, json!({})).await;
    assert_eq!(resp.status().as_u16(), 404);

    // Re-enrolling restores the earlier progress.
    app.enroll(&student, course_id).await;
    let enrollments: Vec<Value> = app
        .get(&student, "/api/me/enrollments")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(enrollments.len(), 1);
    assert_eq!(enrollments[0]["status"], "active");
    assert_eq!(enrollments[0]["completionPercentage"], 50);

    let resp = app.complete_lesson(&student, course_id, lesson_ids[1]).await;
    assert_eq!(resp.status().as_u16(), 200);
}
