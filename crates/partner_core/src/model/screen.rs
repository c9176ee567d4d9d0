//! Screens (form pages) and fields (single inputs).
//!
//! # Invariants
//! - `configuration_version` equals the owning config version.
//! - `field_ids` is the single source of field order within a screen.
//! - Persisted `field_config` is always `{ "attributes": {..}, "rules": [..] }`.

use crate::model::config::empty_object;
use crate::model::partner::PartnerId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type ScreenId = Uuid;
pub type FieldId = Uuid;

/// Persisted screen row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub id: ScreenId,
    pub partner_id: PartnerId,
    pub category_name: String,
    pub screen_config: Value,
    pub field_ids: Vec<FieldId>,
    pub is_active: bool,
    pub configuration_version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Screen {
    /// Creates an active screen without fields.
    pub fn new(
        partner_id: PartnerId,
        category_name: impl Into<String>,
        screen_config: Value,
        configuration_version: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            partner_id,
            category_name: category_name.into(),
            screen_config,
            field_ids: Vec::new(),
            is_active: true,
            configuration_version,
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// Persisted field row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub screen_id: ScreenId,
    /// Input kind, e.g. `text`, `ssn`, `hidden`.
    #[serde(rename = "type")]
    pub kind: String,
    pub field_config: Value,
    pub is_active: bool,
    pub configuration_version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Field {
    /// Creates an active field; `field_config` is normalized.
    pub fn new(
        screen_id: ScreenId,
        kind: impl Into<String>,
        field_config: Option<&Value>,
        configuration_version: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            screen_id,
            kind: kind.into(),
            field_config: normalize_field_config(field_config),
            is_active: true,
            configuration_version,
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// Screen together with its resolved, ordered fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenWithFields {
    #[serde(flatten)]
    pub screen: Screen,
    pub fields: Vec<Field>,
}

/// Client-submitted screen for reconciliation.
///
/// `id = None` means "create"; otherwise the screen is updated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenInput {
    pub id: Option<ScreenId>,
    pub screen_config: Option<Value>,
    pub fields: Option<Vec<FieldInput>>,
}

/// Client-submitted field for reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldInput {
    pub id: Option<FieldId>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub field_config: Option<Value>,
}

/// Normalizes a field config to `{attributes: {..}, rules: [..]}`.
///
/// Non-object attributes become `{}`, non-array rules become `[]`. Other
/// top-level keys are dropped.
pub fn normalize_field_config(config: Option<&Value>) -> Value {
    let attributes = config
        .and_then(|value| value.get("attributes"))
        .filter(|value| value.is_object())
        .cloned()
        .unwrap_or_else(empty_object);
    let rules = config
        .and_then(|value| value.get("rules"))
        .filter(|value| value.is_array())
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));

    let mut normalized = Map::new();
    normalized.insert("attributes".to_string(), attributes);
    normalized.insert("rules".to_string(), rules);
    Value::Object(normalized)
}

/// Reorders `items` by `order`, dropping items whose id is not listed.
///
/// Ids listed in `order` without a matching item are skipped.
pub fn order_by_ids<T, K>(order: &[Uuid], items: Vec<T>, key: K) -> Vec<T>
where
    K: Fn(&T) -> Uuid,
{
    let mut slots: Vec<Option<T>> = order.iter().map(|_| None).collect();
    for item in items {
        if let Some(position) = order.iter().position(|id| *id == key(&item)) {
            slots[position] = Some(item);
        }
    }
    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::{normalize_field_config, order_by_ids};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn normalize_fills_missing_parts() {
        assert_eq!(
            normalize_field_config(None),
            json!({"attributes": {}, "rules": []})
        );
        assert_eq!(
            normalize_field_config(Some(&json!({"attributes": {"name": "zip"}, "rules": {}}))),
            json!({"attributes": {"name": "zip"}, "rules": []})
        );
    }

    #[test]
    fn order_by_ids_filters_and_reorders() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let ordered = order_by_ids(&[c, a], vec![a, b, c], |id| *id);
        assert_eq!(ordered, vec![c, a]);
    }
}
