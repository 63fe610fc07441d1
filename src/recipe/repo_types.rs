use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Which per-user table an owned record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnedKind {
    Tag,
    Ingredient,
}

impl OwnedKind {
    pub fn table(self) -> &'static str {
        match self {
            OwnedKind::Tag => "tags",
            OwnedKind::Ingredient => "ingredients",
        }
    }
}

impl std::fmt::Display for OwnedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnedKind::Tag => f.write_str("tag"),
            OwnedKind::Ingredient => f.write_str("ingredient"),
        }
    }
}

/// A Tag or Ingredient row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OwnedItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
}
