//! Versioned partner configuration snapshot.
//!
//! # Invariants
//! - `(partner_id, version)` is unique and versions start at 1.
//! - `screen_ids` is the single source of screen order for this version.

use crate::model::partner::PartnerId;
use crate::model::screen::ScreenId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Stable identifier of one config version row.
pub type ConfigId = Uuid;

/// First version created together with a partner.
pub const INITIAL_CONFIG_VERSION: i64 = 1;

/// A versioned snapshot of a partner's branding/layout/screen composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerConfig {
    pub id: ConfigId,
    pub partner_id: PartnerId,
    pub version: i64,
    pub global_config: Value,
    pub header_config: Value,
    pub footer_config: Value,
    pub layout_config: Value,
    pub screen_ids: Vec<ScreenId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PartnerConfig {
    /// Creates an empty config (`{}` blobs, no screens) at `version`.
    pub fn empty(partner_id: PartnerId, version: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            partner_id,
            version,
            global_config: empty_object(),
            header_config: empty_object(),
            footer_config: empty_object(),
            layout_config: empty_object(),
            screen_ids: Vec::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Returns a copy of this config's blobs with `updates` applied.
    ///
    /// Provided blobs replace the current ones wholesale; absent blobs are kept.
    pub fn blobs_with(&self, updates: &ConfigUpdate) -> ConfigBlobs {
        ConfigBlobs {
            global_config: pick(&updates.global_config, &self.global_config),
            header_config: pick(&updates.header_config, &self.header_config),
            footer_config: pick(&updates.footer_config, &self.footer_config),
            layout_config: pick(&updates.layout_config, &self.layout_config),
        }
    }
}

/// The four JSON blobs of a config, as written together.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigBlobs {
    pub global_config: Value,
    pub header_config: Value,
    pub footer_config: Value,
    pub layout_config: Value,
}

/// Partial update of a config's blobs.
///
/// `null` and missing keys both mean "keep the current value".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub global_config: Option<Value>,
    pub header_config: Option<Value>,
    pub footer_config: Option<Value>,
    pub layout_config: Option<Value>,
}

/// Version listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigVersionSummary {
    pub version: i64,
    pub created_at: i64,
}

pub(crate) fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn pick(update: &Option<Value>, current: &Value) -> Value {
    match update {
        Some(value) if !value.is_null() => value.clone(),
        _ => current.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigUpdate, PartnerConfig};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn blobs_with_replaces_only_provided_values() {
        let mut config = PartnerConfig::empty(Uuid::new_v4(), 1);
        config.header_config = json!({"title": "old"});

        let updates = ConfigUpdate {
            global_config: Some(json!({"primary_text_color": "#111"})),
            header_config: None,
            footer_config: Some(serde_json::Value::Null),
            layout_config: None,
        };
        let blobs = config.blobs_with(&updates);

        assert_eq!(blobs.global_config, json!({"primary_text_color": "#111"}));
        assert_eq!(blobs.header_config, json!({"title": "old"}));
        assert_eq!(blobs.footer_config, json!({}));
    }

    #[test]
    fn update_deserializes_with_missing_keys() {
        let updates: ConfigUpdate =
            serde_json::from_value(json!({"layout_config": {"columns": 2}})).unwrap();
        assert!(updates.global_config.is_none());
        assert_eq!(updates.layout_config, Some(json!({"columns": 2})));
    }
}
