//! CORS handling against an explicit origin allow-list.
//!
//! `Vary: Origin` and `Vary: Access-Control-Request-Method` are appended to
//! every response, allowed origin or not, so shared caches never serve a
//! response negotiated for one origin to another.

use axum::extract::Request;
use axum::http::header::{HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ORIGIN, VARY};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const PREFLIGHT_METHODS: &str = "OPTIONS, PUT, PATCH, DELETE";
const PREFLIGHT_HEADERS: &str = "Authorization, Content-Type";
const PREFLIGHT_MAX_AGE: &str = "60";

/// Origins allowed to make cross-origin requests.
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    fn allows(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

/// Middleware applying the allow-list.
pub async fn apply(request: Request, next: Next) -> Response {
    let config = request.extensions().get::<CorsConfig>().cloned().unwrap_or_default();

    let origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let allowed = origin.as_deref().is_some_and(|o| config.allows(o));

    let preflight = request.method() == Method::OPTIONS
        && request.headers().contains_key("access-control-request-method");

    let mut response = if allowed && preflight {
        // Terminated here; the preflight never reaches a handler.
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.append(VARY, HeaderValue::from_static("Origin"));
    headers.append(VARY, HeaderValue::from_static("Access-Control-Request-Method"));

    if allowed {
        if let Some(origin) = origin {
            if let Ok(value) = HeaderValue::from_str(&origin) {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
            }
        }
        if preflight {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(PREFLIGHT_METHODS));
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(PREFLIGHT_HEADERS));
            headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(PREFLIGHT_MAX_AGE));
        }
    }

    response
}
