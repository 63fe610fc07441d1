use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::{
    recipe::repo_types::{OwnedItem, OwnedKind},
    users::repo_types::{NewUser, User, UserChanges},
};

/// In-process store backing handler tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    // user_id -> key
    tokens: HashMap<Uuid, String>,
    owned: HashMap<OwnedKind, Vec<OwnedItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Byte order, which is what `COLLATE "C"` gives in Postgres.
fn sorted_by_name_desc(mut items: Vec<OwnedItem>) -> Vec<OwnedItem> {
    items.sort_by(|a, b| b.name.cmp(&a.name));
    items
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let mut inner = self.lock();
        if inner.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::Conflict("email"));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            is_active: true,
            is_staff: new.is_staff,
            last_login: None,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut inner = self.lock();
        if let Some(email) = &changes.email {
            if inner.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Conflict("email"));
            }
        }
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(active) = changes.is_active {
            user.is_active = active;
        }
        if let Some(staff) = changes.is_staff {
            user.is_staff = staff;
        }
        Ok(Some(user.clone()))
    }

    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<()> {
        if let Some(user) = self.lock().users.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        // Insertion order is creation order.
        Ok(self.lock().users.clone())
    }

    async fn get_or_create_token(&self, user_id: Uuid, candidate: &str) -> StoreResult<String> {
        let mut inner = self.lock();
        Ok(inner
            .tokens
            .entry(user_id)
            .or_insert_with(|| candidate.to_string())
            .clone())
    }

    async fn find_user_by_token(&self, key: &str) -> StoreResult<Option<User>> {
        let inner = self.lock();
        let Some(user_id) = inner
            .tokens
            .iter()
            .find(|(_, k)| k.as_str() == key)
            .map(|(id, _)| *id)
        else {
            return Ok(None);
        };
        Ok(inner.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn delete_token(&self, user_id: Uuid) -> StoreResult<bool> {
        Ok(self.lock().tokens.remove(&user_id).is_some())
    }

    async fn list_owned(&self, kind: OwnedKind, owner: Uuid) -> StoreResult<Vec<OwnedItem>> {
        let inner = self.lock();
        let items = inner
            .owned
            .get(&kind)
            .map(|rows| rows.iter().filter(|r| r.user_id == owner).cloned().collect())
            .unwrap_or_default();
        Ok(sorted_by_name_desc(items))
    }

    async fn insert_owned(&self, kind: OwnedKind, owner: Uuid, name: &str) -> StoreResult<OwnedItem> {
        let mut inner = self.lock();
        if !inner.users.iter().any(|u| u.id == owner) {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }
        let item = OwnedItem {
            id: Uuid::new_v4(),
            user_id: owner,
            name: name.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        inner.owned.entry(kind).or_default().push(item.clone());
        Ok(item)
    }

    async fn find_owned(&self, kind: OwnedKind, owner: Uuid, id: Uuid) -> StoreResult<Option<OwnedItem>> {
        Ok(self
            .lock()
            .owned
            .get(&kind)
            .and_then(|rows| rows.iter().find(|r| r.id == id && r.user_id == owner))
            .cloned())
    }

    async fn rename_owned(
        &self,
        kind: OwnedKind,
        owner: Uuid,
        id: Uuid,
        name: &str,
    ) -> StoreResult<Option<OwnedItem>> {
        let mut inner = self.lock();
        let item = inner
            .owned
            .get_mut(&kind)
            .and_then(|rows| rows.iter_mut().find(|r| r.id == id && r.user_id == owner));
        Ok(item.map(|item| {
            item.name = name.to_string();
            item.clone()
        }))
    }

    async fn delete_owned(&self, kind: OwnedKind, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.lock();
        let Some(rows) = inner.owned.get_mut(&kind) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| !(r.id == id && r.user_id == owner));
        Ok(rows.len() < before)
    }

    async fn admin_list_owned(&self, kind: OwnedKind) -> StoreResult<Vec<OwnedItem>> {
        let items = self.lock().owned.get(&kind).cloned().unwrap_or_default();
        Ok(sorted_by_name_desc(items))
    }

    async fn admin_delete_owned(&self, kind: OwnedKind, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.lock();
        let Some(rows) = inner.owned.get_mut(&kind) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| r.id != id);
        Ok(rows.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: String::new(),
            password_hash: "hash".into(),
            is_staff: false,
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.insert_user(new_user("a@example.com")).await.unwrap();
        let err = store.insert_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("email")));
    }

    #[tokio::test]
    async fn token_is_stable_per_user() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("a@example.com")).await.unwrap();
        let first = store.get_or_create_token(user.id, "k1").await.unwrap();
        let second = store.get_or_create_token(user.id, "k2").await.unwrap();
        assert_eq!(first, "k1");
        assert_eq!(second, "k1");
        assert!(store.delete_token(user.id).await.unwrap());
        assert_eq!(store.get_or_create_token(user.id, "k3").await.unwrap(), "k3");
    }

    #[tokio::test]
    async fn owned_rows_never_cross_owners() {
        let store = MemoryStore::new();
        let a = store.insert_user(new_user("a@example.com")).await.unwrap();
        let b = store.insert_user(new_user("b@example.com")).await.unwrap();
        let tag = store.insert_owned(OwnedKind::Tag, a.id, "Vegan").await.unwrap();

        assert!(store.find_owned(OwnedKind::Tag, b.id, tag.id).await.unwrap().is_none());
        assert!(store.rename_owned(OwnedKind::Tag, b.id, tag.id, "x").await.unwrap().is_none());
        assert!(!store.delete_owned(OwnedKind::Tag, b.id, tag.id).await.unwrap());
        assert!(store.list_owned(OwnedKind::Ingredient, a.id).await.unwrap().is_empty());
        assert_eq!(store.list_owned(OwnedKind::Tag, a.id).await.unwrap().len(), 1);
    }
}
