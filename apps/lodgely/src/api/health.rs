//! Healthcheck and JSON fallbacks.

use axum::Json;
use axum::http::Method;
use serde_json::{Value, json};

use super::error::ApiError;

/// `GET /healthcheck`
pub async fn healthcheck() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}
