//! Catalogue CRUD.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use reel_core::{catalog, Filters, Movie, Runtime, Validator};
use serde::Deserialize;
use serde_json::json;

use crate::error::{deadline, envelope, ApiError, READ_DEADLINE, WRITE_DEADLINE};
use crate::extractors::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub title: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub sort: Option<String>,
}

/// `GET /v1/movies`
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let defaults = Filters::default();
    let filters = Filters {
        page: params.page.unwrap_or(defaults.page),
        page_size: params.page_size.unwrap_or(defaults.page_size),
        sort: params.sort.unwrap_or(defaults.sort),
    };

    let mut v = Validator::new();
    filters.validate(&mut v);
    if !v.is_valid() {
        return Err(ApiError::Validation(v.into_errors()));
    }

    let title = params.title.unwrap_or_default();
    let (movies, metadata) =
        deadline(READ_DEADLINE, state.catalog.list_movies(&title, &filters)).await??;

    Ok(Json(json!({ "movies": movies, "metadata": metadata })))
}

#[derive(Debug, Deserialize)]
pub struct CreateInput {
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Vec<String>,
}

/// `POST /v1/movies`
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateInput>,
) -> Result<impl IntoResponse, ApiError> {
    let mut movie = Movie {
        id: 0,
        created_at: Utc::now(),
        title: input.title,
        year: input.year,
        runtime: input.runtime,
        genres: input.genres,
        version: 0,
    };

    let mut v = Validator::new();
    catalog::validate_movie(&mut v, &movie);
    if !v.is_valid() {
        return Err(ApiError::Validation(v.into_errors()));
    }

    deadline(WRITE_DEADLINE, state.catalog.insert_movie(&mut movie)).await??;

    let location = format!("/v1/movies/{}", movie.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(envelope("movie", &movie)),
    ))
}

/// `GET /v1/movies/:id`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let movie = deadline(READ_DEADLINE, state.catalog.get_movie(id)).await??;
    Ok(Json(envelope("movie", &movie)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateInput {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub genres: Option<Vec<String>>,
}

/// `PATCH /v1/movies/:id`
///
/// Fetch-then-update under optimistic locking: the update presents the
/// version observed at fetch time, and a stale version comes back as 409.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<UpdateInput>,
) -> Result<impl IntoResponse, ApiError> {
    let mut movie = deadline(READ_DEADLINE, state.catalog.get_movie(id)).await??;
    let observed_version = movie.version;

    movie.apply_partial(input.title, input.year, input.runtime, input.genres);

    let mut v = Validator::new();
    catalog::validate_movie(&mut v, &movie);
    if !v.is_valid() {
        return Err(ApiError::Validation(v.into_errors()));
    }

    let updated = deadline(
        WRITE_DEADLINE,
        state.catalog.update_movie(&movie, observed_version),
    )
    .await??;

    Ok(Json(envelope("movie", &updated)))
}

/// `DELETE /v1/movies/:id`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    deadline(WRITE_DEADLINE, state.catalog.delete_movie(id)).await??;
    Ok(Json(json!({ "message": "movie successfully deleted" })))
}
