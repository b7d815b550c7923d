//! Account registration and activation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use reel_core::{identity, password, token, StoreError, Token, TokenScope, User, Validator};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{deadline, envelope, ApiError, READ_DEADLINE, WRITE_DEADLINE};
use crate::extractors::ApiJson;
use crate::mailer::Mail;
use crate::state::AppState;

/// Activation tokens outlive registration emails that sit unread for a bit.
const ACTIVATION_TTL_DAYS: i64 = 3;

/// Permissions every fresh account starts with.
const DEFAULT_PERMISSIONS: &[&str] = &["catalog:read"];

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// `POST /v1/users`
///
/// Returns 202: the account exists but activation happens out of band, via
/// the token mailed in the background.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let mut user = User {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        name: input.name,
        email: input.email,
        password_hash: String::new(),
        activated: false,
    };

    let mut v = Validator::new();
    identity::validate_user(&mut v, &user, &input.password);
    if !v.is_valid() {
        return Err(ApiError::Validation(v.into_errors()));
    }

    user.password_hash =
        password::hash(&input.password).map_err(|err| ApiError::Internal(err.to_string()))?;

    deadline(WRITE_DEADLINE, state.users.insert_user(&user)).await??;
    deadline(
        WRITE_DEADLINE,
        state.permissions.grant(user.id, DEFAULT_PERMISSIONS),
    )
    .await??;

    let token = Token::issue(
        user.id,
        Duration::days(ACTIVATION_TTL_DAYS),
        TokenScope::Activation,
    )
    .map_err(|err| ApiError::Internal(err.to_string()))?;
    deadline(WRITE_DEADLINE, state.tokens.insert_token(&token)).await??;

    // Delivery happens off the request path; a failure is logged, not
    // surfaced, and the client already holds its 202.
    let mailer = state.mailer.clone();
    let mail = Mail {
        recipient: user.email.clone(),
        template: "user_welcome",
        payload: json!({
            "activation_token": token.plaintext,
            "user_id": user.id,
        }),
    };
    state.tasks.spawn(async move {
        if let Err(err) = mailer.send(mail).await {
            tracing::error!(error = %err, "failed to send welcome email");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(envelope("user", &user))))
}

#[derive(Debug, Deserialize)]
pub struct ActivateInput {
    pub token: String,
}

/// `PUT /v1/users/activated`
pub async fn activate(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ActivateInput>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::new();
    token::validate_plaintext(&mut v, &input.token);
    if !v.is_valid() {
        return Err(ApiError::Validation(v.into_errors()));
    }

    let hash = token::hash_plaintext(&input.token);
    let mut user = deadline(
        READ_DEADLINE,
        state.users.get_for_token(TokenScope::Activation, hash),
    )
    .await?
    .map_err(|err| match err {
        StoreError::NotFound => {
            let mut v = Validator::new();
            v.add_error("token", "invalid or expired activation token");
            ApiError::Validation(v.into_errors())
        }
        other => ApiError::from(other),
    })?;

    user.activated = true;
    deadline(WRITE_DEADLINE, state.users.update_user(&user)).await??;

    // The token is single-use; sweep every activation token this account
    // still holds.
    deadline(
        WRITE_DEADLINE,
        state
            .tokens
            .delete_all_for_user(TokenScope::Activation, user.id),
    )
    .await??;

    Ok(Json(envelope("user", &user)))
}
