use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{AdminCreateUserRequest, AdminOwnedView, AdminUpdateUserRequest, AdminUserView};
use crate::{
    error::{ApiError, ApiJson, ApiResult, FieldErrors},
    recipe::handlers::{parse_id, Ingredients, OwnedResource, Tags},
    state::AppState,
    users::{
        extractors::StaffUser,
        repo_types::UserChanges,
        services::{self, check_email, check_name, email_conflict, required_text, AccountInput, MSG_EMAIL_TAKEN},
    },
};

const MSG_PASSWORD_MISMATCH: &str = "The two password fields didn't match.";

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", patch(update_user))
        .merge(owned_admin_routes::<Tags>())
        .merge(owned_admin_routes::<Ingredients>())
}

fn owned_admin_routes<R: OwnedResource>() -> Router<AppState> {
    Router::new()
        .route(&format!("/{}", R::PATH), get(list_owned::<R>))
        .route(&format!("/{}/:id", R::PATH), delete(delete_owned::<R>))
}

#[instrument(skip(state, staff), fields(staff_id = %staff.id))]
pub async fn list_users(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
) -> ApiResult<Json<Vec<AdminUserView>>> {
    let users = state.store.list_users().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, staff, payload), fields(staff_id = %staff.id))]
pub async fn create_user(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    ApiJson(payload): ApiJson<AdminCreateUserRequest>,
) -> ApiResult<(StatusCode, Json<AdminUserView>)> {
    let mut errors = FieldErrors::new();
    match (&payload.password1, &payload.password2) {
        (_, None) => errors.add("password2", services::MSG_REQUIRED),
        (Some(p1), Some(p2)) if p1 != p2 => errors.add("password2", MSG_PASSWORD_MISMATCH),
        _ => {}
    }

    let mut account_errors = FieldErrors::new();
    let account = services::check_account(
        state.store.as_ref(),
        state.config.password_min_length,
        AccountInput {
            email: payload.email,
            password: payload.password1,
            name: payload.name,
            is_staff: payload.is_staff,
        },
        false,
        &mut account_errors,
    )
    .await?;
    errors.merge(account_errors.rename("password", "password1"));

    let account = match account {
        Some(account) if errors.is_empty() => account,
        _ => {
            warn!(fields = ?errors, "admin account rejected");
            return Err(ApiError::Validation(errors));
        }
    };
    let user = services::insert_account(state.store.as_ref(), account)
        .await
        .map_err(|e| match e {
            ApiError::Validation(errors) => ApiError::Validation(errors.rename("password", "password1")),
            other => other,
        })?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, staff, payload), fields(staff_id = %staff.id))]
pub async fn update_user(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<AdminUpdateUserRequest>,
) -> ApiResult<Json<AdminUserView>> {
    let id = parse_id(&id)?;
    let current = state
        .store
        .find_user_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let mut errors = FieldErrors::new();
    let mut changes = UserChanges {
        is_active: payload.is_active,
        is_staff: payload.is_staff,
        ..Default::default()
    };
    if let Some(raw) = payload.email.as_deref() {
        if let Some(email) =
            required_text(&mut errors, "email", Some(raw)).and_then(|e| check_email(&mut errors, e))
        {
            if email != current.email && state.store.find_user_by_email(&email).await?.is_some() {
                errors.add("email", MSG_EMAIL_TAKEN);
            }
            changes.email = Some(email);
        }
    }
    if let Some(name) = payload.name.as_deref() {
        let name = name.trim();
        check_name(&mut errors, "name", name);
        changes.name = Some(name.to_string());
    }
    errors.into_result()?;

    let updated = state
        .store
        .update_user(id, changes)
        .await
        .map_err(email_conflict)?
        .ok_or(ApiError::NotFound)?;
    info!(user_id = %updated.id, is_active = updated.is_active, is_staff = updated.is_staff, "user edited");
    Ok(Json(updated.into()))
}

#[instrument(skip(state, staff), fields(kind = %R::KIND, staff_id = %staff.id))]
pub async fn list_owned<R: OwnedResource>(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
) -> ApiResult<Json<Vec<AdminOwnedView>>> {
    let items = state.store.admin_list_owned(R::KIND).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, staff), fields(kind = %R::KIND, staff_id = %staff.id))]
pub async fn delete_owned<R: OwnedResource>(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    if !state.store.admin_delete_owned(R::KIND, id).await? {
        return Err(ApiError::NotFound);
    }
    info!(%id, "deleted by staff");
    Ok(StatusCode::NO_CONTENT)
}
