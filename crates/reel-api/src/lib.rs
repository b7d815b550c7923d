//! # Reel API Service
//!
//! HTTP surface over the [`reel_core`] domain: catalogue CRUD behind
//! permission gates, account registration and activation, stateless bearer
//! token login, and the cross-cutting pipeline (tracing, panic recovery,
//! CORS, rate limiting, metrics, authentication) every request flows
//! through.

pub mod config;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod mailer;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod tasks;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::CorsConfig;
use crate::state::AppState;

/// Assemble the full router over `state`.
///
/// Pipeline, outermost first: trace → panic recovery → CORS → rate limiting
/// → metrics → authentication → routes. Recovery sits outside everything
/// except tracing so a panic anywhere still produces a JSON 500; metrics sit
/// inside the rate limiter so denied requests are not double-counted as
/// handled work; authentication is innermost so every later guard can rely
/// on an [`reel_core::Identity`] being present.
pub fn app(state: AppState) -> Router {
    let cors = CorsConfig {
        allowed_origins: state.config.cors_allowed_origins.clone(),
    };

    let catalog_read = Router::new()
        .route("/v1/movies", get(routes::movies::list))
        .route("/v1/movies/:id", get(routes::movies::show))
        .route_layer(from_fn_with_state(
            (state.clone(), "catalog:read"),
            guards::require_permission,
        ));

    let catalog_write = Router::new()
        .route("/v1/movies", post(routes::movies::create))
        .route(
            "/v1/movies/:id",
            axum::routing::patch(routes::movies::update).delete(routes::movies::delete),
        )
        .route_layer(from_fn_with_state(
            (state.clone(), "catalog:write"),
            guards::require_permission,
        ));

    Router::new()
        .route("/v1/healthcheck", get(routes::ops::healthcheck))
        .route("/debug/vars", get(routes::ops::debug_vars))
        .route("/v1/users", post(routes::users::register))
        .route("/v1/users/activated", put(routes::users::activate))
        .route("/v1/tokens/authentication", post(routes::tokens::login))
        .merge(catalog_read)
        .merge(catalog_write)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .layer(from_fn(middleware::metrics::record))
        .layer(Extension(state.metrics.clone()))
        .layer(from_fn(middleware::rate_limit::enforce))
        .layer(Extension(state.limiter.clone()))
        .layer(from_fn(middleware::cors::apply))
        .layer(Extension(cors))
        .layer(middleware::recovery::layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
