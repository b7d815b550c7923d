//! Panic containment for handlers.
//!
//! A panicking handler must not tear down the connection mid-stream with no
//! response. The catch-panic layer converts the unwound panic into a plain
//! 500 with `Connection: close` so the client both gets an answer and knows
//! the connection is done.

use std::any::Any;

use axum::http::header::{HeaderValue, CONNECTION};
use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::ApiError;

/// The recovery layer for the application pipeline.
pub fn layer() -> CatchPanicLayer<fn(Box<dyn Any + Send + 'static>) -> Response> {
    CatchPanicLayer::custom(handle_panic)
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    let mut response = ApiError::Internal(detail).into_response();
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));
    response
}
