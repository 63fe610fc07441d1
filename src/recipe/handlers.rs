use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{NameRequest, OwnedItemResponse},
    repo_types::OwnedKind,
};
use crate::{
    error::{ApiError, ApiJson, ApiResult, FieldErrors},
    state::AppState,
    users::{
        extractors::AuthUser,
        services::{check_name, required_text, MSG_NULL},
    },
};

/// A per-user resource served by the generic handlers below.
pub trait OwnedResource: Send + Sync + 'static {
    const KIND: OwnedKind;
    const PATH: &'static str;
}

pub struct Tags;
pub struct Ingredients;

impl OwnedResource for Tags {
    const KIND: OwnedKind = OwnedKind::Tag;
    const PATH: &'static str = "tags";
}

impl OwnedResource for Ingredients {
    const KIND: OwnedKind = OwnedKind::Ingredient;
    const PATH: &'static str = "ingredients";
}

pub fn owned_routes<R: OwnedResource>() -> Router<AppState> {
    Router::new()
        .route(&format!("/{}", R::PATH), get(list::<R>).post(create::<R>))
        .route(
            &format!("/{}/:id", R::PATH),
            get(retrieve::<R>)
                .put(update::<R>)
                .patch(partial_update::<R>)
                .delete(destroy::<R>),
        )
}

/// Ids that are not UUIDs cannot match any row.
pub(crate) fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

/// The submitted name, if the key was sent at all. `null` is never a valid name.
fn submitted_name(payload: &NameRequest) -> ApiResult<Option<&str>> {
    match &payload.name {
        None => Ok(None),
        Some(None) => Err(ApiError::Validation(FieldErrors::single("name", MSG_NULL))),
        Some(Some(name)) => Ok(Some(name.as_str())),
    }
}

fn required_name(name: Option<&str>) -> ApiResult<String> {
    let mut errors = FieldErrors::new();
    let name = required_text(&mut errors, "name", name).map(str::to_string);
    if let Some(n) = &name {
        check_name(&mut errors, "name", n);
    }
    match name {
        Some(n) if errors.is_empty() => Ok(n),
        _ => Err(ApiError::Validation(errors)),
    }
}

/// Absent means "leave unchanged"; present must still be a valid name.
fn optional_name(name: Option<&str>) -> ApiResult<Option<String>> {
    name.map(|n| required_name(Some(n))).transpose()
}

#[instrument(skip(state, user), fields(kind = %R::KIND, user_id = %user.id))]
pub async fn list<R: OwnedResource>(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<OwnedItemResponse>>> {
    let items = state.store.list_owned(R::KIND, user.id).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, user, payload), fields(kind = %R::KIND, user_id = %user.id))]
pub async fn create<R: OwnedResource>(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<NameRequest>,
) -> ApiResult<(StatusCode, Json<OwnedItemResponse>)> {
    let name = required_name(submitted_name(&payload)?)?;
    let item = state.store.insert_owned(R::KIND, user.id, &name).await?;
    info!(id = %item.id, "created");
    Ok((StatusCode::CREATED, Json(item.into())))
}

#[instrument(skip(state, user), fields(kind = %R::KIND, user_id = %user.id))]
pub async fn retrieve<R: OwnedResource>(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<OwnedItemResponse>> {
    let id = parse_id(&id)?;
    let item = state
        .store
        .find_owned(R::KIND, user.id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(item.into()))
}

async fn rename<R: OwnedResource>(
    state: &AppState,
    owner: Uuid,
    id: &str,
    name: Option<&str>,
    required: bool,
) -> ApiResult<OwnedItemResponse> {
    let id = parse_id(id)?;
    let name = if required {
        Some(required_name(name)?)
    } else {
        optional_name(name)?
    };
    let item = match name {
        Some(name) => state.store.rename_owned(R::KIND, owner, id, &name).await?,
        None => state.store.find_owned(R::KIND, owner, id).await?,
    };
    item.map(Into::into).ok_or(ApiError::NotFound)
}

#[instrument(skip(state, user, payload), fields(kind = %R::KIND, user_id = %user.id))]
pub async fn update<R: OwnedResource>(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<NameRequest>,
) -> ApiResult<Json<OwnedItemResponse>> {
    rename::<R>(&state, user.id, &id, submitted_name(&payload)?, true)
        .await
        .map(Json)
}

#[instrument(skip(state, user, payload), fields(kind = %R::KIND, user_id = %user.id))]
pub async fn partial_update<R: OwnedResource>(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<NameRequest>,
) -> ApiResult<Json<OwnedItemResponse>> {
    rename::<R>(&state, user.id, &id, submitted_name(&payload)?, false)
        .await
        .map(Json)
}

#[instrument(skip(state, user), fields(kind = %R::KIND, user_id = %user.id))]
pub async fn destroy<R: OwnedResource>(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    if !state.store.delete_owned(R::KIND, user.id, id).await? {
        return Err(ApiError::NotFound);
    }
    info!(%id, "deleted");
    Ok(StatusCode::NO_CONTENT)
}
