//! The request pipeline: authentication, metrics, rate limiting, CORS and
//! panic recovery. Each stage is an `axum::middleware` function wired in
//! [`crate::app`]; ordering matters and is documented there.

pub mod auth;
pub mod cors;
pub mod metrics;
pub mod rate_limit;
pub mod recovery;

pub use cors::CorsConfig;
pub use metrics::ApiMetrics;
pub use rate_limit::{RateLimitConfig, RateLimiter};
