//! Authentication token issuance (login).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Duration;
use reel_core::{identity, password, StoreError, Token, TokenScope, Validator};
use serde::Deserialize;

use crate::error::{deadline, envelope, ApiError, LOGIN_DEADLINE, WRITE_DEADLINE};
use crate::extractors::ApiJson;
use crate::state::AppState;

const AUTHENTICATION_TTL_DAYS: i64 = 15;

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// `POST /v1/tokens/authentication`
///
/// Unknown account and wrong password are deliberately indistinguishable:
/// both come back as 401 invalid credentials.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::new();
    identity::validate_email(&mut v, &input.email);
    password::validate_plaintext(&mut v, &input.password);
    if !v.is_valid() {
        return Err(ApiError::Validation(v.into_errors()));
    }

    let user = deadline(LOGIN_DEADLINE, state.users.get_by_email(&input.email))
        .await?
        .map_err(|err| match err {
            StoreError::NotFound => ApiError::InvalidCredentials,
            other => ApiError::from(other),
        })?;

    let matches = password::verify(&input.password, &user.password_hash)
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    if !matches {
        return Err(ApiError::InvalidCredentials);
    }

    let token = Token::issue(
        user.id,
        Duration::days(AUTHENTICATION_TTL_DAYS),
        TokenScope::Authentication,
    )
    .map_err(|err| ApiError::Internal(err.to_string()))?;
    deadline(WRITE_DEADLINE, state.tokens.insert_token(&token)).await??;

    Ok((
        StatusCode::CREATED,
        Json(envelope("authentication_token", &token)),
    ))
}
