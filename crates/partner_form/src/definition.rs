//! Form definition built from a partner view.
//!
//! # Responsibility
//! - Decode persisted JSON blobs into typed screen/field definitions.
//! - Guarantee a form always has at least one screen.
//!
//! # Invariants
//! - Screens and fields keep the order resolved by the core read path.
//! - Every required field carries a `requiredValidation` rule.
//! - Decoding is lenient: wrongly-typed keys read as absent.

use crate::rules::{ensure_required_rule, parse_rules, Rule};
use partner_core::{Field, FieldId, PartnerView, ScreenId, ScreenWithFields};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Global styling/config map of a partner config version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalConfig(pub Map<String, Value>);

impl GlobalConfig {
    pub fn from_value(value: Option<&Value>) -> Self {
        Self(value.and_then(Value::as_object).cloned().unwrap_or_default())
    }

    /// Scalar value at `key` rendered as text.
    pub fn text(&self, key: &str) -> Option<String> {
        scalar_text(self.0.get(key))
    }
}

/// Presentation keys of `screen_config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenConfig {
    pub heading: Option<String>,
    pub heading_color: Option<String>,
    pub heading_font_size: Option<String>,
    pub heading_font_weight: Option<String>,
    pub description: Option<String>,
    pub description_color: Option<String>,
    pub description_font_size: Option<String>,
    pub continue_button_text: Option<String>,
}

impl ScreenConfig {
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| scalar_text(value.get(key)).filter(|text| !text.is_empty());
        Self {
            heading: text("heading"),
            heading_color: text("heading_color"),
            heading_font_size: text("heading_font_size"),
            heading_font_weight: text("heading_font_weight"),
            description: text("description"),
            description_color: text("description_color"),
            description_font_size: text("description_font_size"),
            continue_button_text: text("continue_button_text"),
        }
    }
}

/// Input kind; anything not text or SSN renders hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Ssn,
    Hidden,
}

impl FieldKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "text" => Self::Text,
            "ssn" => Self::Ssn,
            _ => Self::Hidden,
        }
    }
}

/// Style overrides from `attributes.style` (text fields) or from the
/// attributes themselves (SSN boxes).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStyle {
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub border_color: Option<String>,
    pub border_radius: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub font_size: Option<String>,
    pub font_weight: Option<String>,
    pub placeholder_position: Option<String>,
}

impl FieldStyle {
    fn from_value(kind: FieldKind, attributes: &Map<String, Value>) -> Self {
        let get = |source: Option<&Map<String, Value>>, key: &str| {
            scalar_text(source.and_then(|map| map.get(key))).filter(|text| !text.is_empty())
        };
        match kind {
            FieldKind::Ssn => Self {
                background_color: get(Some(attributes), "backgroundColor"),
                border_color: get(Some(attributes), "borderColor"),
                border_radius: get(Some(attributes), "borderRadius"),
                width: get(Some(attributes), "fieldWidth"),
                height: get(Some(attributes), "fieldHeight"),
                ..Self::default()
            },
            _ => {
                let style = attributes.get("style").and_then(Value::as_object);
                Self {
                    background_color: get(style, "backgroundColor"),
                    text_color: get(style, "textColor"),
                    border_color: get(style, "borderColor"),
                    border_radius: get(style, "borderRadius"),
                    width: get(style, "width"),
                    height: None,
                    font_size: get(style, "fontSize"),
                    font_weight: get(style, "fontWeight"),
                    placeholder_position: get(style, "placeholderPosition"),
                }
            }
        }
    }
}

/// Decoded `field_config.attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldAttributes {
    /// Key of the field in the session's value map.
    pub name: Option<String>,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub required: bool,
    pub error_message: Option<String>,
    pub style: FieldStyle,
}

/// One input of a screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: Option<FieldId>,
    pub kind: FieldKind,
    pub attributes: FieldAttributes,
    pub rules: Vec<Rule>,
}

impl FieldDef {
    pub fn from_field(field: &Field) -> Self {
        let kind = FieldKind::parse(&field.kind);
        let attributes_map = field
            .field_config
            .get("attributes")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let text = |key: &str| {
            scalar_text(attributes_map.get(key)).filter(|text| !text.is_empty())
        };
        let attributes = FieldAttributes {
            name: text("name"),
            label: text("label"),
            placeholder: text("placeholder"),
            required: attributes_map
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            error_message: text("errorMessage"),
            style: FieldStyle::from_value(kind, &attributes_map),
        };

        let mut rules = parse_rules(field.field_config.get("rules"));
        ensure_required_rule(attributes.required, &mut rules);

        Self {
            id: Some(field.id),
            kind,
            attributes,
            rules,
        }
    }

    /// Key under which this field's value is stored.
    ///
    /// Falls back to the DOM id when the field has no `name`.
    pub fn value_key(&self, dom_id: &str) -> String {
        self.attributes
            .name
            .clone()
            .unwrap_or_else(|| dom_id.to_string())
    }
}

/// One page of the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenDef {
    /// `None` only for the synthesized default screen.
    pub id: Option<ScreenId>,
    pub category_name: Option<String>,
    pub config: ScreenConfig,
    pub fields: Vec<FieldDef>,
}

impl ScreenDef {
    pub fn from_screen(item: &ScreenWithFields) -> Self {
        Self {
            id: Some(item.screen.id),
            category_name: Some(item.screen.category_name.clone()),
            config: ScreenConfig::from_value(&item.screen.screen_config),
            fields: item.fields.iter().map(FieldDef::from_field).collect(),
        }
    }

    /// Draft screen shown when a partner has no screens yet.
    pub fn default_screen() -> Self {
        Self {
            id: None,
            category_name: None,
            config: ScreenConfig::default(),
            fields: Vec::new(),
        }
    }
}

/// Complete renderer input for one partner config version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    pub partner_name: String,
    pub logo: Option<String>,
    /// `None` when the partner has no config for the requested version.
    pub version: Option<i64>,
    pub global: GlobalConfig,
    pub header_config: Value,
    pub footer_config: Value,
    pub layout_config: Value,
    pub screens: Vec<ScreenDef>,
}

impl FormDefinition {
    pub fn from_partner(view: &PartnerView) -> Self {
        let config = view.config.as_ref();
        let mut screens: Vec<ScreenDef> = view.screens.iter().map(ScreenDef::from_screen).collect();
        if screens.is_empty() {
            screens.push(ScreenDef::default_screen());
        }

        Self {
            partner_name: view.name.clone(),
            logo: view.logo.clone(),
            version: config.map(|config| config.version),
            global: GlobalConfig::from_value(config.map(|config| &config.global_config)),
            header_config: blob_or_empty(config.map(|config| &config.header_config)),
            footer_config: blob_or_empty(config.map(|config| &config.footer_config)),
            layout_config: blob_or_empty(config.map(|config| &config.layout_config)),
            screens,
        }
    }
}

fn blob_or_empty(blob: Option<&Value>) -> Value {
    blob.cloned().unwrap_or_else(|| Value::Object(Map::new()))
}

/// Renders a JSON scalar as text; objects, arrays and `null` read as absent.
pub(crate) fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
