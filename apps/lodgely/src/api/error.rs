//! # API Errors
//!
//! Every handler returns `Result<_, ApiError>`. Each variant maps to a status
//! code and a JSON envelope `{"error": ...}`. Server errors are logged inside
//! the request span and answered with a generic message.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use lodgely_core::{CoreError, ValidationErrors};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::mailer::MailError;
use crate::oauth::OAuthError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body, path or query parameter.
    #[error("{0}")]
    BadRequest(String),

    /// Bad session token, credentials or one-time code.
    #[error("invalid or missing authentication token")]
    InvalidToken,

    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    #[error("your user account must be activated to access this resource")]
    InactiveAccount,

    #[error("you are already signed in")]
    AlreadySignedIn,

    #[error("the requested resource could not be found")]
    NotFound,

    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),

    #[error("{0}")]
    Conflict(String),

    #[error("the request body is too large")]
    PayloadTooLarge,

    #[error("failed validation")]
    Validation(ValidationErrors),

    #[error("rate limit exceeded")]
    RateLimited,

    /// Never shown to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// 422 with a single field error.
    pub fn invalid(field: &str, message: &str) -> Self {
        Self::Validation(ValidationErrors::single(field, message))
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidToken | Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::InactiveAccount | Self::AlreadySignedIn => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::Validation(errors) => json!({ "error": errors }),
            Self::Internal(message) => {
                error!(error = %message, "request failed");
                json!({
                    "error": "the server encountered a problem and could not process your request"
                })
            }
            other => json!({ "error": other.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, Self::InvalidToken) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound => Self::NotFound,
            CoreError::DuplicateEmail => {
                Self::invalid("email", "user with this email address already exists")
            }
            CoreError::BookingConflict => Self::Conflict(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        Self::internal(err)
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        Self::internal(err)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge;
        }
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge;
        }
        Self::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InactiveAccount.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::MethodNotAllowed(Method::PUT).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ApiError::invalid("email", "bad").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn core_errors_map() {
        assert!(matches!(
            ApiError::from(CoreError::NotFound),
            ApiError::NotFound
        ));
        assert!(matches!(
            ApiError::from(CoreError::BookingConflict),
            ApiError::Conflict(_)
        ));
        match ApiError::from(CoreError::DuplicateEmail) {
            ApiError::Validation(errors) => assert_eq!(
                errors.get("email"),
                Some("user with this email address already exists")
            ),
            other => panic!("unexpected {other:?}"),
        }
        // bcrypt refuses a cost above 31.
        match lodgely_core::Password::hash("pa55word", 99) {
            Err(err) => assert!(matches!(ApiError::from(err), ApiError::Internal(_))),
            Ok(_) => panic!("cost 99 should be rejected"),
        }
    }

    #[tokio::test]
    async fn validation_envelope_lists_fields() {
        let response = ApiError::invalid("title", "must be provided").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["title"], "must be provided");
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "the server encountered a problem and could not process your request"
        );
    }

    #[tokio::test]
    async fn invalid_token_sets_www_authenticate() {
        let response = ApiError::InvalidToken.into_response();
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid or missing authentication token");
    }

    #[tokio::test]
    async fn method_not_allowed_names_method() {
        let body = body_json(ApiError::MethodNotAllowed(Method::PUT).into_response()).await;
        assert_eq!(body["error"], "the PUT method is not supported for this resource");
    }
}
