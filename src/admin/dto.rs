use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{recipe::repo_types::OwnedItem, users::repo_types::User};

/// A user row as staff see it.
#[derive(Debug, Serialize)]
pub struct AdminUserView {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

impl From<User> for AdminUserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            is_active: u.is_active,
            is_staff: u.is_staff,
            last_login: u.last_login,
        }
    }
}

/// `password2` must repeat `password1`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminCreateUserRequest {
    pub email: Option<String>,
    pub password1: Option<String>,
    pub password2: Option<String>,
    pub name: Option<String>,
    pub is_staff: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminUpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AdminOwnedView {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
}

impl From<OwnedItem> for AdminOwnedView {
    fn from(item: OwnedItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            user_id: item.user_id,
        }
    }
}
