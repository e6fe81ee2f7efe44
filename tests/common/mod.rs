// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use kavyalearn::{
    config::Config,
    models::user::NewUser,
    routes,
    state::{AppState, DynStore},
    store::{MemoryStore, PgStore, Store},
    utils::hash::hash_password,
};
use serde_json::{Value, json};

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub store: DynStore,
    /// Appended to every username; empty on the in-memory store.
    suffix: String,
}

fn test_config(database_url: Option<String>) -> Config {
    Config {
        database_url,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        admin_username: None,
        admin_password: None,
        quiz_unlock_threshold: 100,
        quiz_passing_percentage: 60,
    }
}

/// Spawns the app on a random port over a fresh in-memory store.
pub async fn spawn_app() -> TestApp {
    let store: DynStore = Arc::new(MemoryStore::new());
    serve(store, test_config(None), String::new()).await
}

/// Spawns the app over PostgreSQL from `DATABASE_URL`, or `None` when it is unset.
///
/// The database is shared between runs, so usernames get a random suffix.
pub async fn spawn_pg_app() -> Option<TestApp> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let store = PgStore::connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");
    let suffix = format!("_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    Some(serve(Arc::new(store), test_config(Some(database_url)), suffix).await)
}

async fn serve(store: DynStore, config: Config, suffix: String) -> TestApp {
    let app = routes::create_router(AppState {
        store: store.clone(),
        config,
    });

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        store,
        suffix,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// The stored username for `name`.
    pub fn username(&self, name: &str) -> String {
        format!("{}{}", name, self.suffix)
    }

    pub async fn login(&self, username: &str) -> String {
        let resp: Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": self.username(username), "password": PASSWORD }))
            .send()
            .await
            .expect("Login failed")
            .json()
            .await
            .expect("Failed to parse login json");
        resp["token"].as_str().expect("Token not found").to_string()
    }

    /// Inserts a user with `role` directly and returns a bearer token.
    pub async fn seed_user(&self, username: &str, role: &str) -> String {
        self.store
            .create_user(NewUser {
                username: self.username(username),
                password: hash_password(PASSWORD).unwrap(),
                role: role.to_string(),
            })
            .await
            .expect("Failed to seed user");
        self.login(username).await
    }

    /// Registers a student through the API and returns a bearer token.
    pub async fn register_student(&self, username: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": self.username(username), "password": PASSWORD }))
            .send()
            .await
            .expect("Register failed");
        assert_eq!(resp.status().as_u16(), 201);
        self.login(username).await
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Creates a course and returns (course id, lesson ids in order).
    pub async fn create_course(&self, token: &str, lessons: usize) -> (i64, Vec<i64>) {
        let titles: Vec<String> = (1..=lessons).map(|i| format!("Lesson {}", i)).collect();
        let resp = self
            .post(
                token,
                "/api/admin/courses",
                json!({ "title": "Rust Fundamentals", "lessons": titles }),
            )
            .await;
        assert_eq!(resp.status().as_u16(), 201);
        let course: Value = resp.json().await.unwrap();
        let lesson_ids = course["lessons"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["id"].as_i64().unwrap())
            .collect();
        (course["id"].as_i64().unwrap(), lesson_ids)
    }

    /// Two one-mark questions; the correct options are 0 and 1.
    pub async fn create_quiz(&self, token: &str, course_id: i64) -> i64 {
        let resp = self
            .post(
                token,
                "/api/admin/quizzes",
                json!({
                    "courseId": course_id,
                    "title": "Final Quiz",
                    "durationMinutes": 15,
                    "questions": [
                        {
                            "question": "Which keyword makes a binding mutable?",
                            "options": [
                                { "text": "mut", "isCorrect": true },
                                { "text": "var", "isCorrect": false }
                            ],
                            "marks": 1
                        },
                        {
                            "question": "Which type owns a heap string?",
                            "options": [
                                { "text": "str", "isCorrect": false },
                                { "text": "String", "isCorrect": true },
                                { "text": "char", "isCorrect": false }
                            ],
                            "marks": 1
                        }
                    ]
                }),
            )
            .await;
        assert_eq!(resp.status().as_u16(), 201);
        let quiz: Value = resp.json().await.unwrap();
        quiz["id"].as_i64().unwrap()
    }

    pub async fn enroll(&self, token: &str, course_id: i64) {
        let resp = self
            .post(token, &format!("/api/courses/{}/enroll", course_id), json!({}))
            .await;
        assert_eq!(resp.status().as_u16(), 201);
    }

    pub async fn complete_lesson(
        &self,
        token: &str,
        course_id: i64,
        lesson_id: i64,
    ) -> reqwest::Response {
        self.post(
            token,
            "/api/lessons/complete",
            json!({ "lessonId": lesson_id, "courseId": course_id, "hoursSpent": 1.5 }),
        )
        .await
    }
}

/// Course with `lessons` lessons and the standard two-question quiz.
pub async fn course_with_quiz(app: &TestApp, lessons: usize) -> (i64, Vec<i64>, i64) {
    let instructor = app.seed_user("priya", "instructor").await;
    let (course_id, lesson_ids) = app.create_course(&instructor, lessons).await;
    let quiz_id = app.create_quiz(&instructor, course_id).await;
    (course_id, lesson_ids, quiz_id)
}

/// Enrolls a new student and completes every lesson.
pub async fn finished_student(
    app: &TestApp,
    username: &str,
    course_id: i64,
    lesson_ids: &[i64],
) -> String {
    let token = app.register_student(username).await;
    app.enroll(&token, course_id).await;
    for &lesson_id in lesson_ids {
        let resp = app.complete_lesson(&token, course_id, lesson_id).await;
        assert_eq!(resp.status().as_u16(), 200);
    }
    token
}
