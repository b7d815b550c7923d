//! Request extractors with API-shaped rejections.

use axum::extract::FromRequest;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body extractor whose rejection is the standard error envelope
/// instead of axum's plain-text default.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    use super::*;

    #[derive(Deserialize)]
    struct Input {
        title: String,
    }

    fn test_app() -> Router {
        Router::new().route(
            "/test",
            post(|ApiJson(input): ApiJson<Input>| async move { input.title }),
        )
    }

    #[tokio::test]
    async fn valid_json_deserializes() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/test")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title": "Dune"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_json_gets_the_error_envelope() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/test")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title": }"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].is_string());
    }
}
