// src/utils/json.rs

use axum::extract::{FromRequest, rejection::JsonRejection};

use crate::error::AppError;

/// `Json` extractor whose rejections go through `AppError`, so malformed
/// bodies get the same `{error, code}` shape as every other failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
