use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    recipe::repo_types::{OwnedItem, OwnedKind},
    users::repo_types::{NewUser, User, UserChanges},
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint on the named field rejected the write.
    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam shared by every handler.
///
/// Methods touching tags and ingredients take the owner explicitly; the only
/// unscoped variants are the `admin_*` ones.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, new: NewUser) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>>;
    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<()>;
    /// Ordered by creation time, then id.
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Returns the existing key for `user_id`, or stores `candidate` as the new one.
    async fn get_or_create_token(&self, user_id: Uuid, candidate: &str) -> StoreResult<String>;
    async fn find_user_by_token(&self, key: &str) -> StoreResult<Option<User>>;
    async fn delete_token(&self, user_id: Uuid) -> StoreResult<bool>;

    /// Ordered by name, descending.
    async fn list_owned(&self, kind: OwnedKind, owner: Uuid) -> StoreResult<Vec<OwnedItem>>;
    async fn insert_owned(&self, kind: OwnedKind, owner: Uuid, name: &str) -> StoreResult<OwnedItem>;
    async fn find_owned(&self, kind: OwnedKind, owner: Uuid, id: Uuid) -> StoreResult<Option<OwnedItem>>;
    async fn rename_owned(
        &self,
        kind: OwnedKind,
        owner: Uuid,
        id: Uuid,
        name: &str,
    ) -> StoreResult<Option<OwnedItem>>;
    async fn delete_owned(&self, kind: OwnedKind, owner: Uuid, id: Uuid) -> StoreResult<bool>;

    async fn admin_list_owned(&self, kind: OwnedKind) -> StoreResult<Vec<OwnedItem>>;
    async fn admin_delete_owned(&self, kind: OwnedKind, id: Uuid) -> StoreResult<bool>;
}
