//! Resolved presentation model of a form.
//!
//! Every default the renderer applies lives here, so clients can draw a
//! screen without knowing the config conventions.

use crate::definition::{FieldDef, FieldKind, FormDefinition, GlobalConfig, ScreenDef};
use crate::rules::Rule;
use partner_core::{FieldId, ScreenId};
use serde::Serialize;
use serde_json::Value;

const HEADING_COLOR: &str = "text.primary";
const DESCRIPTION_COLOR: &str = "text.secondary";
const HEADING_FONT_SIZE: &str = "2xl";
const DESCRIPTION_FONT_SIZE: &str = "md";
const HEADING_FONT_WEIGHT: &str = "bold";
const CONTINUE_TEXT: &str = "Continue";
const SUBMIT_TEXT: &str = "Submit";
const TEXT_LABEL: &str = "Text";
const SSN_LABEL: &str = "Social Security Number";
const PLACEHOLDER: &str = "Enter value";
const FIELD_WIDTH: &str = "100%";

/// Maps a config font size name to a theme size token.
pub fn map_font_size(size: Option<&str>) -> Option<&'static str> {
    match size? {
        "small" => Some("lg"),
        "medium" => Some("2xl"),
        "large" => Some("4xl"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormLayout {
    pub partner_name: String,
    pub logo: Option<String>,
    pub version: Option<i64>,
    pub global_config: GlobalConfig,
    pub header_config: Value,
    pub footer_config: Value,
    pub layout_config: Value,
    pub screens: Vec<ScreenLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenLayout {
    pub index: usize,
    pub id: Option<ScreenId>,
    pub heading: Option<String>,
    pub heading_color: String,
    pub heading_font_size: String,
    pub heading_font_weight: String,
    pub description: Option<String>,
    pub description_color: String,
    pub description_font_size: String,
    pub primary_button_text: String,
    pub show_back_button: bool,
    pub fields: Vec<FieldLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldLayout {
    pub id: Option<FieldId>,
    pub dom_id: String,
    pub kind: FieldKind,
    /// Session value key.
    pub name: String,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub required: bool,
    pub error_message: String,
    pub style: ResolvedFieldStyle,
    pub rules: Vec<Rule>,
}

/// Field style after falling back to the global config.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedFieldStyle {
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

impl FormLayout {
    pub fn resolve(definition: &FormDefinition) -> Self {
        let count = definition.screens.len();
        Self {
            partner_name: definition.partner_name.clone(),
            logo: definition.logo.clone(),
            version: definition.version,
            global_config: definition.global.clone(),
            header_config: definition.header_config.clone(),
            footer_config: definition.footer_config.clone(),
            layout_config: definition.layout_config.clone(),
            screens: definition
                .screens
                .iter()
                .enumerate()
                .map(|(index, screen)| {
                    ScreenLayout::resolve(screen, index, count, &definition.global)
                })
                .collect(),
        }
    }
}

impl ScreenLayout {
    pub fn resolve(screen: &ScreenDef, index: usize, count: usize, global: &GlobalConfig) -> Self {
        let config = &screen.config;
        let is_last = index + 1 >= count;
        let primary_button_text = if is_last {
            SUBMIT_TEXT.to_string()
        } else {
            config
                .continue_button_text
                .clone()
                .unwrap_or_else(|| CONTINUE_TEXT.to_string())
        };

        Self {
            index,
            id: screen.id,
            heading: config.heading.clone(),
            heading_color: or_default(&config.heading_color, HEADING_COLOR),
            heading_font_size: map_font_size(config.heading_font_size.as_deref())
                .unwrap_or(HEADING_FONT_SIZE)
                .to_string(),
            heading_font_weight: or_default(&config.heading_font_weight, HEADING_FONT_WEIGHT),
            description: config.description.clone(),
            description_color: or_default(&config.description_color, DESCRIPTION_COLOR),
            description_font_size: map_font_size(config.description_font_size.as_deref())
                .unwrap_or(DESCRIPTION_FONT_SIZE)
                .to_string(),
            primary_button_text,
            show_back_button: index > 0,
            fields: screen
                .fields
                .iter()
                .enumerate()
                .map(|(field_index, field)| FieldLayout::resolve(field, index, field_index, global))
                .collect(),
        }
    }
}

impl FieldLayout {
    pub fn resolve(
        field: &FieldDef,
        screen_index: usize,
        field_index: usize,
        global: &GlobalConfig,
    ) -> Self {
        let dom_id = dom_id(field, screen_index, field_index);
        let attributes = &field.attributes;
        let (label, placeholder) = match field.kind {
            FieldKind::Text => (
                Some(or_default(&attributes.label, TEXT_LABEL)),
                Some(or_default(&attributes.placeholder, PLACEHOLDER)),
            ),
            FieldKind::Ssn => (Some(or_default(&attributes.label, SSN_LABEL)), None),
            FieldKind::Hidden => (None, None),
        };

        Self {
            id: field.id,
            name: field.value_key(&dom_id),
            dom_id,
            kind: field.kind,
            label,
            placeholder,
            required: attributes.required,
            error_message: attributes.error_message.clone().unwrap_or_default(),
            style: resolve_style(field, global),
            rules: field.rules.clone(),
        }
    }
}

/// DOM id of a field; unsaved fields are addressed by position.
pub fn dom_id(field: &FieldDef, screen_index: usize, field_index: usize) -> String {
    match field.id {
        Some(id) => format!("field-{id}"),
        None => format!("field-{screen_index}-{field_index}"),
    }
}

fn resolve_style(field: &FieldDef, global: &GlobalConfig) -> ResolvedFieldStyle {
    let style = &field.attributes.style;
    match field.kind {
        FieldKind::Text => ResolvedFieldStyle {
            background_color: style
                .background_color
                .clone()
                .or_else(|| global.text("primary_background_color")),
            text_color: style
                .text_color
                .clone()
                .or_else(|| global.text("primary_text_color")),
            border_color: style
                .border_color
                .clone()
                .or_else(|| global.text("border_color")),
            border_radius: style
                .border_radius
                .clone()
                .or_else(|| global.text("default_border_radius")),
            width: Some(or_default(&style.width, FIELD_WIDTH)),
            height: None,
            font_size: map_font_size(style.font_size.as_deref())
                .map(str::to_string)
                .or_else(|| global.text("default_font_size")),
            font_weight: style
                .font_weight
                .clone()
                .or_else(|| global.text("default_font_weight")),
            placeholder_position: style.placeholder_position.clone(),
        },
        FieldKind::Ssn => ResolvedFieldStyle {
            background_color: style.background_color.clone(),
            border_color: style.border_color.clone(),
            border_radius: style.border_radius.clone(),
            width: style.width.clone(),
            height: style.height.clone(),
            ..ResolvedFieldStyle::default()
        },
        FieldKind::Hidden => ResolvedFieldStyle::default(),
    }
}

fn or_default(value: &Option<String>, default: &str) -> String {
    value.clone().unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::{map_font_size, FormLayout};
    use crate::definition::{FieldKind, FormDefinition};
    use partner_core::{
        Field, PartnerConfig, PartnerView, Screen, ScreenWithFields,
    };
    use serde_json::json;
    use uuid::Uuid;

    fn view() -> PartnerView {
        let partner_id = Uuid::new_v4();
        let mut config = PartnerConfig::empty(partner_id, 3);
        config.global_config = json!({
            "primary_text_color": "#222",
            "default_font_size": "md",
            "default_border_radius": 6
        });
        let first = Screen::new(
            partner_id,
            "loans",
            json!({"heading": "Hi", "heading_font_size": "large",
                   "continue_button_text": "Next", "description_font_size": "huge"}),
            3,
        );
        let second = Screen::new(partner_id, "loans", json!({"continue_button_text": "Next"}), 3);
        let text = Field::new(
            first.id,
            "text",
            Some(&json!({"attributes": {"name": "first_name",
                                        "style": {"fontSize": "small", "textColor": "#f00"}}})),
            3,
        );
        let ssn = Field::new(first.id, "ssn", Some(&json!({"attributes": {"fieldWidth": 40}})), 3);
        let hidden = Field::new(second.id, "hidden", None, 3);

        PartnerView {
            id: partner_id,
            name: "acme".to_string(),
            logo: None,
            is_active: true,
            created_at: 0,
            updated_at: 0,
            config: Some(config),
            screens: vec![
                ScreenWithFields { screen: first, fields: vec![text, ssn] },
                ScreenWithFields { screen: second, fields: vec![hidden] },
            ],
            categories: Vec::new(),
        }
    }

    #[test]
    fn font_sizes_map_to_theme_tokens() {
        assert_eq!(map_font_size(Some("small")), Some("lg"));
        assert_eq!(map_font_size(Some("medium")), Some("2xl"));
        assert_eq!(map_font_size(Some("large")), Some("4xl"));
        assert_eq!(map_font_size(Some("huge")), None);
        assert_eq!(map_font_size(None), None);
    }

    #[test]
    fn screen_defaults_and_buttons_are_resolved() {
        let layout = FormLayout::resolve(&FormDefinition::from_partner(&view()));
        let (first, last) = (&layout.screens[0], &layout.screens[1]);

        assert_eq!(layout.version, Some(3));
        assert_eq!(first.heading_font_size, "4xl");
        assert_eq!(first.heading_font_weight, "bold");
        assert_eq!(first.heading_color, "text.primary");
        assert_eq!(first.description_font_size, "md");
        assert_eq!(first.description_color, "text.secondary");
        assert_eq!(first.primary_button_text, "Next");
        assert!(!first.show_back_button);
        assert_eq!(last.primary_button_text, "Submit");
        assert!(last.show_back_button);
    }

    #[test]
    fn field_defaults_fall_back_to_global_config() {
        let layout = FormLayout::resolve(&FormDefinition::from_partner(&view()));
        let fields = &layout.screens[0].fields;
        let (text, ssn) = (&fields[0], &fields[1]);

        assert_eq!(text.dom_id, format!("field-{}", text.id.unwrap()));
        assert_eq!(text.name, "first_name");
        assert_eq!(text.label.as_deref(), Some("Text"));
        assert_eq!(text.placeholder.as_deref(), Some("Enter value"));
        assert_eq!(text.style.font_size.as_deref(), Some("lg"));
        assert_eq!(text.style.text_color.as_deref(), Some("#f00"));
        assert_eq!(text.style.border_radius.as_deref(), Some("6"));
        assert_eq!(text.style.width.as_deref(), Some("100%"));

        assert_eq!(ssn.label.as_deref(), Some("Social Security Number"));
        assert_eq!(ssn.placeholder, None);
        assert_eq!(ssn.style.width.as_deref(), Some("40"));
        assert_eq!(ssn.name, ssn.dom_id);

        let hidden = &layout.screens[1].fields[0];
        assert_eq!(hidden.kind, FieldKind::Hidden);
        assert_eq!(hidden.label, None);
    }

    #[test]
    fn default_screen_has_submit_button() {
        let mut empty = view();
        empty.screens.clear();
        let layout = FormLayout::resolve(&FormDefinition::from_partner(&empty));

        assert_eq!(layout.screens.len(), 1);
        assert_eq!(layout.screens[0].primary_button_text, "Submit");
        assert!(layout.screens[0].fields.is_empty());
    }
}
