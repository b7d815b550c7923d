//! Authorization guards layered onto protected routes.
//!
//! The checks are strictly ordered: an anonymous caller is told to
//! authenticate before anything else, an unactivated account is told to
//! activate before permissions are consulted, and only then is the required
//! permission checked. Each guard therefore reveals no more than the caller
//! has already earned.

use axum::extract::{Request, State};
use axum::http::Extensions;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use reel_core::{Identity, User};

use crate::error::{deadline, ApiError, READ_DEADLINE};
use crate::state::AppState;

/// The authenticated user on this request, or 401 if anonymous.
pub fn resolved_user(extensions: &Extensions) -> Result<&User, ApiError> {
    let identity = extensions
        .get::<Identity>()
        .ok_or(ApiError::AuthenticationRequired)?;
    identity.user().ok_or(ApiError::AuthenticationRequired)
}

/// The authenticated, activated user on this request; 401 if anonymous,
/// 403 if not yet activated.
pub fn activated_user(extensions: &Extensions) -> Result<&User, ApiError> {
    let user = resolved_user(extensions)?;
    if !user.activated {
        return Err(ApiError::InactiveAccount);
    }
    Ok(user)
}

/// Guard: the caller must be authenticated, activated, and hold `permission`.
pub async fn require_permission(
    State((state, permission)): State<(AppState, &'static str)>,
    request: Request,
    next: Next,
) -> Response {
    match check_permission(&state, permission, request.extensions()).await {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

async fn check_permission(
    state: &AppState,
    permission: &str,
    extensions: &Extensions,
) -> Result<(), ApiError> {
    let user = activated_user(extensions)?;
    let permissions = deadline(READ_DEADLINE, state.permissions.permissions_for_user(user.id))
        .await??;
    if !permissions.includes(permission) {
        return Err(ApiError::NotPermitted);
    }
    Ok(())
}
