// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Course completion (in percent) required before a quiz unlocks.
pub const DEFAULT_UNLOCK_THRESHOLD: i32 = 100;

/// Passing percentage applied to quizzes authored without one.
pub const DEFAULT_PASSING_PERCENTAGE: i32 = 60;

/// Token lifetime when `JWT_EXPIRATION` is not set (one day).
pub const DEFAULT_JWT_EXPIRATION: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. `None` runs the server on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// Default course completion required to unlock a quiz, 0..=100.
    pub quiz_unlock_threshold: i32,
    /// Passing percentage for quizzes authored without one, 0..=100.
    pub quiz_passing_percentage: i32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_JWT_EXPIRATION);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let quiz_unlock_threshold = percent_var("QUIZ_UNLOCK_THRESHOLD", DEFAULT_UNLOCK_THRESHOLD);
        let quiz_passing_percentage =
            percent_var("QUIZ_PASSING_PERCENTAGE", DEFAULT_PASSING_PERCENTAGE);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            quiz_unlock_threshold,
            quiz_passing_percentage,
        }
    }
}

/// Reads a percentage variable, clamped to 0..=100.
fn percent_var(key: &str, default: i32) -> i32 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<i32>().ok())
        .map(|v| v.clamp(0, 100))
        .unwrap_or(default)
}
