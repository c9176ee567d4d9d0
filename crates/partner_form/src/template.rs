//! `{{path}}` placeholder substitution.
//!
//! # Invariants
//! - String values are inserted JSON-escaped without surrounding quotes, so
//!   a placeholder inside a JSON string literal stays valid JSON.
//! - Other scalars are inserted in JSON form; missing paths and `null`
//!   become empty text.

use crate::error::FormResult;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("valid placeholder regex"));

/// Builds the substitution context `{field_values, global}`.
pub fn template_context(field_values: &Map<String, Value>, global: &Map<String, Value>) -> Value {
    let mut context = Map::new();
    context.insert("field_values".to_string(), Value::Object(field_values.clone()));
    context.insert("global".to_string(), Value::Object(global.clone()));
    Value::Object(context)
}

/// Replaces every `{{dotted.path}}` in `template` with its value in `context`.
pub fn replace_placeholders(template: &str, context: &Value) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| {
            lookup_path(context, &caps[1])
                .map(render_scalar)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Renders a JSON template after substitution.
///
/// String templates are substituted and parsed; structured templates are
/// serialized first. Missing, `null` and blank templates yield `{}`.
pub fn render_json_template(template: Option<&Value>, context: &Value) -> FormResult<Value> {
    let text = match template {
        None | Some(Value::Null) => return Ok(Value::Object(Map::new())),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    };
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    Ok(serde_json::from_str(&replace_placeholders(&text, context))?)
}

/// Walks a dotted path through objects and arrays.
///
/// Numeric segments index into arrays. An empty path is a single empty key,
/// so it never resolves to `value` itself.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => {
            let quoted = Value::String(text.clone()).to_string();
            quoted[1..quoted.len() - 1].to_string()
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{lookup_path, render_json_template, replace_placeholders, template_context};
    use serde_json::{json, Map};

    fn context() -> serde_json::Value {
        let fields = json!({"first_name": "Ann \"Jo\"", "age": 41, "zip": null});
        let global = json!({"token": "abc", "user": {"ids": [7, 8]}});
        template_context(
            fields.as_object().unwrap(),
            global.as_object().unwrap(),
        )
    }

    #[test]
    fn replaces_strings_escaped_and_scalars_as_json() {
        let out = replace_placeholders(
            r#"{"name": "{{ field_values.first_name }}", "age": {{field_values.age}}}"#,
            &context(),
        );
        assert_eq!(out, r#"{"name": "Ann \"Jo\"", "age": 41}"#);
    }

    #[test]
    fn missing_and_null_paths_become_empty() {
        let out = replace_placeholders("[{{field_values.zip}}|{{global.nope.deeper}}]", &context());
        assert_eq!(out, "[|]");
    }

    #[test]
    fn lookup_walks_arrays() {
        assert_eq!(lookup_path(&context(), "global.user.ids.1"), Some(&json!(8)));
        assert_eq!(lookup_path(&context(), "global.user.ids.x"), None);
    }

    #[test]
    fn empty_path_resolves_nothing() {
        assert_eq!(lookup_path(&json!(true), ""), None);
        assert_eq!(lookup_path(&context(), ""), None);
        assert_eq!(lookup_path(&json!({"": 1}), ""), Some(&json!(1)));
    }

    #[test]
    fn json_template_accepts_objects_and_blank_strings() {
        let rendered = render_json_template(
            Some(&json!({"Authorization": "Bearer {{global.token}}"})),
            &context(),
        )
        .unwrap();
        assert_eq!(rendered, json!({"Authorization": "Bearer abc"}));
        assert_eq!(
            render_json_template(Some(&json!("  ")), &context()).unwrap(),
            serde_json::Value::Object(Map::new())
        );
        assert!(render_json_template(Some(&json!("{oops")), &context()).is_err());
    }
}
