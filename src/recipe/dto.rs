use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::repo_types::OwnedItem;

/// Body for create, full update and partial update of a tag or ingredient.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NameRequest {
    /// Outer `None` when the key is absent, `Some(None)` for an explicit `null`.
    #[serde(deserialize_with = "present")]
    pub name: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct OwnedItemResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<OwnedItem> for OwnedItemResponse {
    fn from(item: OwnedItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
        }
    }
}
