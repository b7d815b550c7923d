//! Bearer-token authentication.
//!
//! Every request passes through here and leaves with an [`Identity`] in its
//! extensions: anonymous when no `Authorization` header was sent, or the
//! resolved account when a valid bearer token was. Malformed or unknown
//! tokens fail closed with 401 rather than degrading to anonymous.

use axum::extract::{Request, State};
use axum::http::header::{HeaderValue, AUTHORIZATION, VARY};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use reel_core::{token, Identity, TokenScope, Validator};

use crate::error::{deadline, ApiError, READ_DEADLINE};
use crate::state::AppState;

/// Middleware resolving the request's identity from its bearer token.
pub async fn authenticate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut response = match resolve(&state, request).await {
        Ok((identity, mut request)) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    };

    // Authentication influences the response body, so caches must key on
    // the header.
    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static("Authorization"));
    response
}

async fn resolve(state: &AppState, request: Request) -> Result<(Identity, Request), ApiError> {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return Ok((Identity::Anonymous, request));
    };

    let header = header.to_str().map_err(|_| ApiError::InvalidAuthToken)?;
    let mut parts = header.splitn(2, ' ');
    let (scheme, plaintext) = (parts.next().unwrap_or(""), parts.next().unwrap_or(""));
    if scheme != "Bearer" || plaintext.is_empty() {
        return Err(ApiError::InvalidAuthToken);
    }

    let mut v = Validator::new();
    token::validate_plaintext(&mut v, plaintext);
    if !v.is_valid() {
        return Err(ApiError::InvalidAuthToken);
    }

    let hash = token::hash_plaintext(plaintext);
    let user = deadline(
        READ_DEADLINE,
        state.users.get_for_token(TokenScope::Authentication, hash),
    )
    .await?
    .map_err(|err| match err {
        reel_core::StoreError::NotFound => ApiError::InvalidAuthToken,
        other => ApiError::from(other),
    })?;

    Ok((Identity::Known(user), request))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::{Extension, Router};
    use chrono::Duration;
    use reel_core::Token;
    use tower::ServiceExt;

    use crate::state::test_support::{seeded_state, test_user};

    use super::*;

    fn test_app(state: AppState) -> Router {
        async fn whoami(Extension(identity): Extension<Identity>) -> String {
            match identity {
                Identity::Anonymous => "anonymous".to_string(),
                Identity::Known(user) => user.email,
            }
        }
        Router::new()
            .route("/whoami", get(whoami))
            .layer(from_fn_with_state(state, authenticate))
    }

    #[tokio::test]
    async fn missing_header_yields_anonymous() {
        let (state, _) = seeded_state().await;
        let response = test_app(state)
            .oneshot(HttpRequest::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"anonymous");
    }

    #[tokio::test]
    async fn valid_token_resolves_the_account() {
        let (state, user) = seeded_state().await;
        let token = Token::issue(user.id, Duration::days(1), TokenScope::Authentication).unwrap();
        state.tokens.insert_token(&token).await.unwrap();

        let response = test_app(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header("Authorization", format!("Bearer {}", token.plaintext))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], user.email.as_bytes());
    }

    #[tokio::test]
    async fn malformed_header_is_rejected_with_challenge() {
        let (state, _) = seeded_state().await;
        for header in ["Basic abc", "Bearer", "Bearertoken", "Bearer short"] {
            let response = test_app(state.clone())
                .oneshot(
                    HttpRequest::builder()
                        .uri("/whoami")
                        .header("Authorization", header)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "header {header:?}");
            assert_eq!(
                response.headers().get("WWW-Authenticate").unwrap(),
                "Bearer"
            );
        }
    }

    #[tokio::test]
    async fn well_formed_but_unknown_token_is_rejected() {
        let (state, _) = seeded_state().await;
        let token = Token::issue(test_user().id, Duration::days(1), TokenScope::Authentication).unwrap();
        // Never inserted into the store.

        let response = test_app(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header("Authorization", format!("Bearer {}", token.plaintext))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn vary_header_is_set_on_every_response() {
        let (state, _) = seeded_state().await;
        let response = test_app(state)
            .oneshot(HttpRequest::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let vary: Vec<_> = response
            .headers()
            .get_all(VARY)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert!(vary.contains(&"Authorization"));
    }
}
