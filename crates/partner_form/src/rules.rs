//! Declarative field rules and their synchronous evaluation.
//!
//! # Responsibility
//! - Decode the `rules` array of a field config.
//! - Inject the implicit `requiredValidation` rule for required fields.
//! - Evaluate `beforeSubmit` validation rules against one field value.
//!
//! # Invariants
//! - A rule's settings live in the config of its first action.
//! - Undecodable rule entries are skipped, never fatal.
//! - Regex and length rules skip empty values; emptiness is the concern of
//!   `requiredValidation`.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const REQUIRED_MESSAGE: &str = "This field is required.";
const PATTERN_MESSAGE: &str = "Invalid format.";
const LENGTH_MESSAGE: &str = "Invalid length.";

static EMPTY_CONFIG: Lazy<Map<String, Value>> = Lazy::new(Map::new);

/// When a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    BeforeSubmit,
    OnSubmit,
    #[serde(other)]
    Other,
}

/// Known rule kinds; unknown kinds are carried but never evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    RequiredValidation,
    RegexValidation,
    LengthValidation,
    ApiCall,
    SetGlobalVariable,
    Other(String),
}

impl RuleKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "requiredValidation" => Self::RequiredValidation,
            "regexValidation" => Self::RegexValidation,
            "lengthValidation" => Self::LengthValidation,
            "apiCall" => Self::ApiCall,
            "setGlobalVariable" => Self::SetGlobalVariable,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One rule entry of a field config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub trigger: Trigger,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub actions: Vec<RuleAction>,
}

/// Action attached to a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Rule {
    pub fn rule_kind(&self) -> RuleKind {
        RuleKind::parse(&self.kind)
    }

    /// Config of the first action, or an empty map.
    pub fn config(&self) -> &Map<String, Value> {
        self.actions
            .first()
            .map_or(&*EMPTY_CONFIG, |action| &action.config)
    }

    fn error_message_or(&self, default: &str) -> String {
        self.config()
            .get("errorMessage")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    fn required() -> Self {
        let mut config = Map::new();
        config.insert(
            "errorMessage".to_string(),
            Value::String(REQUIRED_MESSAGE.to_string()),
        );
        Self {
            trigger: Trigger::BeforeSubmit,
            kind: "requiredValidation".to_string(),
            actions: vec![RuleAction { kind: None, config }],
        }
    }
}

/// Decodes a `rules` JSON array, skipping malformed entries.
pub fn parse_rules(raw: Option<&Value>) -> Vec<Rule> {
    let Some(Value::Array(entries)) = raw else {
        return Vec::new();
    };
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            serde_json::from_value::<Rule>(entry.clone())
                .map_err(|err| {
                    warn!("event=rule_parse module=form status=error index={index} error={err}");
                })
                .ok()
        })
        .collect()
}

/// Prepends a `requiredValidation` rule when `required` is set and none exists.
pub fn ensure_required_rule(required: bool, rules: &mut Vec<Rule>) {
    if required
        && !rules
            .iter()
            .any(|rule| rule.rule_kind() == RuleKind::RequiredValidation)
    {
        rules.insert(0, Rule::required());
    }
}

/// Runs the `beforeSubmit` rules in order; returns the first error message.
pub fn validate_before_submit(rules: &[Rule], value: Option<&Value>) -> Option<String> {
    let text = value_text(value);
    rules
        .iter()
        .filter(|rule| rule.trigger == Trigger::BeforeSubmit)
        .find_map(|rule| check_rule(rule, &text))
}

fn check_rule(rule: &Rule, text: &str) -> Option<String> {
    match rule.rule_kind() {
        RuleKind::RequiredValidation => text
            .trim()
            .is_empty()
            .then(|| rule.error_message_or(REQUIRED_MESSAGE)),
        RuleKind::RegexValidation if !text.is_empty() => {
            let pattern = rule
                .config()
                .get("pattern")
                .and_then(Value::as_str)
                .unwrap_or_default();
            match Regex::new(pattern) {
                Ok(regex) => (!regex.is_match(text))
                    .then(|| rule.error_message_or(PATTERN_MESSAGE)),
                Err(err) => {
                    warn!("event=rule_eval module=form status=error rule=regexValidation error={err}");
                    Some(rule.error_message_or(PATTERN_MESSAGE))
                }
            }
        }
        RuleKind::LengthValidation if !text.is_empty() => {
            let length = text.chars().count() as u64;
            let bound = |key: &str| rule.config().get(key).and_then(as_length);
            let too_short = bound("minLength").is_some_and(|min| length < min);
            let too_long = bound("maxLength").is_some_and(|max| length > max);
            (too_short || too_long).then(|| rule.error_message_or(LENGTH_MESSAGE))
        }
        _ => None,
    }
}

/// Text form of a submitted value; `null` and missing values are empty.
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn as_length(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
