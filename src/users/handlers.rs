use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{CreateUserRequest, PublicUser, TokenRequest, TokenResponse, UpdateMeRequest},
    extractors::AuthUser,
    services::{self, AccountInput, ProfileInput},
};
use crate::{
    error::{ApiJson, ApiResult},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/create", post(create_user))
        .route("/user/token", post(create_token))
        .route("/user/logout", post(logout))
        .route("/user/me", get(get_me).patch(update_me))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<PublicUser>)> {
    let user = services::create_account(
        state.store.as_ref(),
        state.config.password_min_length,
        AccountInput {
            email: payload.email,
            password: payload.password,
            name: payload.name,
            is_staff: false,
        },
        true,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let token = services::obtain_token(
        state.store.as_ref(),
        payload.email.as_deref(),
        payload.password.as_deref(),
    )
    .await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<StatusCode> {
    state.store.delete_token(user.id).await?;
    info!("token revoked");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(user), fields(user_id = %user.id))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<UpdateMeRequest>,
) -> ApiResult<Json<PublicUser>> {
    let updated = services::update_profile(
        state.store.as_ref(),
        state.config.password_min_length,
        &user,
        ProfileInput {
            email: payload.email,
            name: payload.name,
            password: payload.password,
        },
    )
    .await?;
    Ok(Json(updated.into()))
}
