use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::{
    config::AppConfig,
    recipe::repo_types::{OwnedItem, OwnedKind},
    users::repo_types::{NewUser, User, UserChanges},
};

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, last_login, created_at";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        Ok(())
    }
}

/// Unique violations on `users.email` become `Conflict("email")`.
fn map_user_write(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict("email"),
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, name, password_hash, is_staff)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .bind(new.is_staff)
        .fetch_one(&self.db)
        .await
        .map_err(map_user_write)?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email = COALESCE($2, email),
                   name = COALESCE($3, name),
                   password_hash = COALESCE($4, password_hash),
                   is_active = COALESCE($5, is_active),
                   is_staff = COALESCE($6, is_staff)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.email)
        .bind(changes.name)
        .bind(changes.password_hash)
        .bind(changes.is_active)
        .bind(changes.is_staff)
        .fetch_optional(&self.db)
        .await
        .map_err(map_user_write)?;
        Ok(user)
    }

    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn get_or_create_token(&self, user_id: Uuid, candidate: &str) -> StoreResult<String> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let (key,): (String,) = sqlx::query_as(
            r#"
            INSERT INTO auth_tokens (key, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING key
            "#,
        )
        .bind(candidate)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        debug!(%user_id, reused = key != candidate, "token resolved");
        Ok(key)
    }

    async fn find_user_by_token(&self, key: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.name, u.password_hash, u.is_active, u.is_staff,
                   u.last_login, u.created_at
              FROM auth_tokens t
              JOIN users u ON u.id = t.user_id
             WHERE t.key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn delete_token(&self, user_id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_owned(&self, kind: OwnedKind, owner: Uuid) -> StoreResult<Vec<OwnedItem>> {
        let rows = sqlx::query_as::<_, OwnedItem>(&format!(
            r#"
            SELECT id, user_id, name, created_at
              FROM {}
             WHERE user_id = $1
             ORDER BY name COLLATE "C" DESC
            "#,
            kind.table()
        ))
        .bind(owner)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn insert_owned(&self, kind: OwnedKind, owner: Uuid, name: &str) -> StoreResult<OwnedItem> {
        let row = sqlx::query_as::<_, OwnedItem>(&format!(
            r#"
            INSERT INTO {} (id, user_id, name)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, created_at
            "#,
            kind.table()
        ))
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(name)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_owned(&self, kind: OwnedKind, owner: Uuid, id: Uuid) -> StoreResult<Option<OwnedItem>> {
        let row = sqlx::query_as::<_, OwnedItem>(&format!(
            "SELECT id, user_id, name, created_at FROM {} WHERE id = $1 AND user_id = $2",
            kind.table()
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn rename_owned(
        &self,
        kind: OwnedKind,
        owner: Uuid,
        id: Uuid,
        name: &str,
    ) -> StoreResult<Option<OwnedItem>> {
        let row = sqlx::query_as::<_, OwnedItem>(&format!(
            r#"
            UPDATE {}
               SET name = $3
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name, created_at
            "#,
            kind.table()
        ))
        .bind(id)
        .bind(owner)
        .bind(name)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete_owned(&self, kind: OwnedKind, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = $1 AND user_id = $2",
            kind.table()
        ))
        .bind(id)
        .bind(owner)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn admin_list_owned(&self, kind: OwnedKind) -> StoreResult<Vec<OwnedItem>> {
        let rows = sqlx::query_as::<_, OwnedItem>(&format!(
            r#"SELECT id, user_id, name, created_at FROM {} ORDER BY name COLLATE "C" DESC"#,
            kind.table()
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn admin_delete_owned(&self, kind: OwnedKind, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
