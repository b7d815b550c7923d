//! # API Error Types
//!
//! One error type implementing `axum::response::IntoResponse`. Every error
//! response is the envelope `{"error": ...}` where the value is a plain
//! string, or a `field → message` map for validation failures. Internal
//! details are logged and never returned to clients.
//!
//! Storage outcomes are classified here exactly once; handlers that need a
//! different mapping for a specific `StoreError` (login's not-found becoming
//! invalid-credentials, say) match before converting.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use reel_core::StoreError;

/// Deadline for read-path store calls (auth lookup, permissions, fetches).
pub const READ_DEADLINE: Duration = Duration::from_secs(3);
/// Deadline for the credential lookup during login.
pub const LOGIN_DEADLINE: Duration = Duration::from_secs(5);
/// Deadline for registration/activation/mutation store calls, which are
/// allowed more slack than read paths.
pub const WRITE_DEADLINE: Duration = Duration::from_secs(7);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed request body or parameters (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Field-level validation failure (422).
    #[error("validation failed")]
    Validation(BTreeMap<String, String>),

    /// Wrong email/password at login (401).
    #[error("invalid authentication credentials")]
    InvalidCredentials,

    /// Missing, malformed, expired, or unknown bearer token (401 with a
    /// `WWW-Authenticate: Bearer` challenge).
    #[error("invalid or missing authentication token")]
    InvalidAuthToken,

    /// Anonymous caller on a protected resource (401).
    #[error("authentication required")]
    AuthenticationRequired,

    /// Authenticated but not activated (403).
    #[error("account not activated")]
    InactiveAccount,

    /// Activated but lacking the required permission (403).
    #[error("permission missing")]
    NotPermitted,

    /// Resource absent (404).
    #[error("not found")]
    NotFound,

    /// Optimistic-concurrency conflict (409).
    #[error("edit conflict")]
    EditConflict,

    /// Uniqueness violation on a user's email (409).
    #[error("duplicate email")]
    DuplicateEmail,

    /// Per-client admission control denied the request (429).
    #[error("rate limit exceeded")]
    RateLimited,

    /// A collaborator call exceeded its deadline (504). Distinct from
    /// cancellation, which produces no response at all.
    #[error("deadline exceeded")]
    Timeout,

    /// Everything else, including recovered panics (500). The message is
    /// logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidCredentials | Self::InvalidAuthToken | Self::AuthenticationRequired => {
                StatusCode::UNAUTHORIZED
            }
            Self::InactiveAccount | Self::NotPermitted => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::EditConflict | Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        let message = match self {
            Self::Validation(errors) => return json!({ "error": errors }),
            Self::BadRequest(msg) => return json!({ "error": msg }),
            Self::InvalidCredentials => "invalid authentication credentials",
            Self::InvalidAuthToken => "invalid or missing authentication token",
            Self::AuthenticationRequired => "you must be authenticated to access this resource",
            Self::InactiveAccount => "your user account must be activated to access this resource",
            Self::NotPermitted => {
                "your user account doesn't have the necessary permissions to access this resource"
            }
            Self::NotFound => "the requested resource could not be found",
            Self::EditConflict => {
                "unable to update the record due to an edit conflict, please try again"
            }
            Self::DuplicateEmail => "a user with this email address already exists",
            Self::RateLimited => "rate limit exceeded, please try again in a few seconds",
            Self::Timeout => "deadline exceeded, please try again in a few seconds",
            Self::Internal(_) => {
                "the server encountered a problem and could not process your request"
            }
        };
        json!({ "error": message })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "internal server error");
        }

        let mut response = (self.status(), Json(self.body())).into_response();
        if matches!(self, Self::InvalidAuthToken) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::EditConflict => Self::EditConflict,
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            StoreError::Backend(msg) => Self::Internal(msg),
        }
    }
}

/// Run a store call under `limit`. An elapsed deadline becomes
/// [`ApiError::Timeout`]; the store's own outcome is handed back for the
/// caller to classify (usually just `?` + `From<StoreError>`).
pub async fn deadline<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<Result<T, StoreError>, ApiError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ApiError::Timeout)
}

/// Wrap response payloads the way every success response is shaped:
/// a single-key JSON envelope.
pub fn envelope<T: Serialize>(key: &str, value: T) -> serde_json::Value {
    json!({ key: value })
}

#[cfg(test)]
mod tests {
    use std::future::pending;

    use http_body_util::BodyExt;

    use super::*;

    async fn response_parts(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_carries_field_map() {
        let mut errors = BTreeMap::new();
        errors.insert("title".to_string(), "must be provided".to_string());
        let (status, body) = response_parts(ApiError::Validation(errors)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["title"], "must be provided");
    }

    #[tokio::test]
    async fn invalid_token_sets_challenge_header() {
        let response = ApiError::InvalidAuthToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[tokio::test]
    async fn internal_error_hides_detail() {
        let (status, body) =
            response_parts(ApiError::Internal("pool exhausted".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(!message.contains("pool exhausted"), "leaked: {message}");
    }

    #[tokio::test]
    async fn status_codes_match_taxonomy() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ApiError::AuthenticationRequired, StatusCode::UNAUTHORIZED),
            (ApiError::InactiveAccount, StatusCode::FORBIDDEN),
            (ApiError::NotPermitted, StatusCode::FORBIDDEN),
            (ApiError::NotFound, StatusCode::NOT_FOUND),
            (ApiError::EditConflict, StatusCode::CONFLICT),
            (ApiError::DuplicateEmail, StatusCode::CONFLICT),
            (ApiError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (ApiError::Timeout, StatusCode::GATEWAY_TIMEOUT),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status(), expected);
        }
    }

    #[test]
    fn store_errors_classify_once() {
        assert!(matches!(
            ApiError::from(StoreError::NotFound),
            ApiError::NotFound
        ));
        assert!(matches!(
            ApiError::from(StoreError::EditConflict),
            ApiError::EditConflict
        ));
        assert!(matches!(
            ApiError::from(StoreError::DuplicateEmail),
            ApiError::DuplicateEmail
        ));
        assert!(matches!(
            ApiError::from(StoreError::Backend("x".into())),
            ApiError::Internal(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_elapsing_is_a_timeout() {
        let result = deadline::<()>(Duration::from_secs(3), pending()).await;
        assert!(matches!(result, Err(ApiError::Timeout)));
    }

    #[tokio::test]
    async fn deadline_passes_store_outcome_through() {
        let result = deadline(Duration::from_secs(3), async { Ok(7) }).await;
        assert_eq!(result.unwrap().unwrap(), 7);

        let result: Result<Result<(), _>, _> = deadline(Duration::from_secs(3), async {
            Err(StoreError::EditConflict)
        })
        .await;
        assert_eq!(result.unwrap().unwrap_err(), StoreError::EditConflict);
    }
}
