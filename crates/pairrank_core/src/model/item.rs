//! List and item records.
//!
//! # Invariants
//! - An item belongs to exactly one list for its whole lifetime.
//! - `payload` is opaque to the engine; it is stored and returned verbatim.
//! - `active == false` is the soft-delete tombstone.

use super::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stable list identifier.
pub type ListId = Uuid;

/// Stable item identifier.
pub type ItemId = Uuid;

/// Named collection of items ranked independently of other lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankList {
    pub id: ListId,
    pub name: String,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
}

/// Rankable entity with an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub list_id: ListId,
    /// Free-form payload label supplied by the caller (`text`, `image`, ...).
    pub kind: String,
    pub payload: Value,
    pub active: bool,
}

impl Item {
    /// Creates a new active item with a generated id.
    pub fn new(list_id: ListId, kind: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            list_id,
            kind: kind.into(),
            payload,
            active: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.kind.trim().is_empty() {
            return Err(ValidationError::EmptyItemKind);
        }
        Ok(())
    }
}

/// Partial item update. `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub kind: Option<String>,
    pub payload: Option<Value>,
    pub active: Option<bool>,
}

impl ItemPatch {
    /// Applies this patch to `item` in place.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(kind) = &self.kind {
            item.kind = kind.trim().to_string();
        }
        if let Some(payload) = &self.payload {
            item.payload = payload.clone();
        }
        if let Some(active) = self.active {
            item.active = active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Item, ItemPatch};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn new_item_is_active() {
        let item = Item::new(Uuid::new_v4(), "text", json!("A"));
        assert!(item.active);
        assert!(item.validate().is_ok());
    }

    #[test]
    fn blank_kind_is_rejected() {
        let item = Item::new(Uuid::new_v4(), "  ", json!(1));
        assert!(item.validate().is_err());
    }

    #[test]
    fn patch_only_touches_provided_fields() {
        let mut item = Item::new(Uuid::new_v4(), "text", json!("A"));
        let patch = ItemPatch {
            payload: Some(json!({"label": "B"})),
            ..ItemPatch::default()
        };
        patch.apply_to(&mut item);
        assert_eq!(item.kind, "text");
        assert_eq!(item.payload, json!({"label": "B"}));
        assert!(item.active);
    }
}
