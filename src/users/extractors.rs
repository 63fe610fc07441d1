use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderValue},
};
use tracing::warn;

use super::{repo_types::User, services};
use crate::{error::ApiError, state::AppState};

const MSG_NOT_PROVIDED: &str = "Authentication credentials were not provided.";
const MSG_INVALID: &str = "Invalid token.";

/// The authenticated, active caller.
pub struct AuthUser(pub User);

/// An authenticated caller with `is_staff`.
pub struct StaffUser(pub User);

/// Pulls the key out of `Bearer <key>` or `Token <key>`.
fn token_from_header(value: Option<&HeaderValue>) -> Result<&str, ApiError> {
    let raw = value
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized(MSG_NOT_PROVIDED))?;

    let mut parts = raw.split_whitespace();
    let scheme = parts.next().unwrap_or_default();
    if !(scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token")) {
        return Err(ApiError::Unauthorized(MSG_NOT_PROVIDED));
    }
    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(key),
        _ => Err(ApiError::Unauthorized(MSG_INVALID)),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let key = token_from_header(parts.headers.get(AUTHORIZATION))?;
        let user = services::authenticate(state.store.as_ref(), key)
            .await
            .map_err(|e| {
                warn!(error = %e, "token rejected");
                e
            })?;
        Ok(AuthUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            warn!(user_id = %user.id, "staff route denied");
            return Err(ApiError::Forbidden(
                "You do not have permission to perform this action.",
            ));
        }
        Ok(StaffUser(user))
    }
}
