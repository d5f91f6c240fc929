//! Converts [`AppError`] into the JSON error envelope, matching the
//! reference service's FastAPI `{"detail": ...}` convention rather than the
//! teacher's `{"success": false, "error": {...}}` shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::AppError;

pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = json!({ "detail": self.0.detail() });
        (status, Json(body)).into_response()
    }
}
