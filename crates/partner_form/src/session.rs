//! Multi-screen form session.
//!
//! # Responsibility
//! - Hold field values, global variables and the current screen.
//! - Submit the current screen: validation rules, then remote checks, then
//!   `onSubmit` actions, then navigation.
//!
//! # Invariants
//! - Field values are keyed by `attributes.name` (DOM id when unnamed).
//! - State is only mutated after every check of the screen has passed.
//! - Once completed, the session rejects further submissions.

use crate::api_check::{ApiCallConfig, ApiCheckOutcome, ApiChecker, CALL_FAILED_MESSAGE};
use crate::definition::{FieldDef, FormDefinition, ScreenDef};
use crate::error::{FormError, FormResult};
use crate::layout::dom_id;
use crate::rules::{validate_before_submit, RuleKind, Trigger};
use crate::template::{replace_placeholders, template_context};
use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const SET_GLOBAL_ACTION: &str = "setGlobalVariable";

/// Result of submitting the current screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// `beforeSubmit` rules failed; keyed by field value key.
    Invalid { field_errors: BTreeMap<String, String> },
    /// A remote check failed; the message is shown as a form error.
    Rejected { message: String },
    /// Moved to the screen at `index`.
    Advanced { index: usize },
    /// The last screen was accepted.
    Completed,
}

#[derive(Debug, Clone)]
pub struct FormSession {
    definition: FormDefinition,
    current: usize,
    field_values: Map<String, Value>,
    global: Map<String, Value>,
    completed: bool,
}

impl FormSession {
    pub fn new(mut definition: FormDefinition) -> Self {
        if definition.screens.is_empty() {
            definition.screens.push(ScreenDef::default_screen());
        }
        Self {
            definition,
            current: 0,
            field_values: Map::new(),
            global: Map::new(),
            completed: false,
        }
    }

    /// Restores a session positioned on `current` with existing state.
    pub fn resume(
        definition: FormDefinition,
        current: usize,
        field_values: Map<String, Value>,
        global: Map<String, Value>,
    ) -> FormResult<Self> {
        let count = definition.screens.len();
        if current >= count {
            return Err(FormError::ScreenOutOfRange {
                index: current,
                count,
            });
        }
        Ok(Self {
            definition,
            current,
            field_values,
            global,
            completed: false,
        })
    }

    pub fn definition(&self) -> &FormDefinition {
        &self.definition
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_screen(&self) -> &ScreenDef {
        &self.definition.screens[self.current]
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn field_values(&self) -> &Map<String, Value> {
        &self.field_values
    }

    pub fn global_variables(&self) -> &Map<String, Value> {
        &self.global
    }

    pub fn set_field_value(&mut self, name: impl Into<String>, value: Value) {
        self.field_values.insert(name.into(), value);
    }

    /// Moves to the previous screen; returns `false` on the first screen.
    pub fn back(&mut self) -> bool {
        if self.completed || self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Runs `beforeSubmit` rules for every field of the current screen.
    pub fn validate_current(&self) -> BTreeMap<String, String> {
        self.screen_fields()
            .filter_map(|(key, field)| {
                validate_before_submit(&field.rules, self.field_values.get(&key))
                    .map(|message| (key, message))
            })
            .collect()
    }

    /// Submits the current screen.
    ///
    /// Remote check failures are reported as [`SubmitOutcome::Rejected`],
    /// not as errors.
    pub async fn submit(&mut self, checker: &ApiChecker) -> FormResult<SubmitOutcome> {
        if self.completed {
            return Err(FormError::AlreadyCompleted);
        }

        let field_errors = self.validate_current();
        if !field_errors.is_empty() {
            info!(
                "event=form_submit module=form status=invalid screen={} errors={}",
                self.current,
                field_errors.len()
            );
            return Ok(SubmitOutcome::Invalid { field_errors });
        }

        if let Some(message) = self.run_api_checks(checker).await {
            info!(
                "event=form_submit module=form status=rejected screen={}",
                self.current
            );
            return Ok(SubmitOutcome::Rejected { message });
        }

        self.run_submit_actions();

        let outcome = if self.current + 1 < self.definition.screens.len() {
            self.current += 1;
            SubmitOutcome::Advanced {
                index: self.current,
            }
        } else {
            self.completed = true;
            SubmitOutcome::Completed
        };
        info!(
            "event=form_submit module=form status=ok screen={} completed={}",
            self.current, self.completed
        );
        Ok(outcome)
    }

    /// Consumes the session into `(field_values, global_variables)`.
    pub fn into_state(self) -> (Map<String, Value>, Map<String, Value>) {
        (self.field_values, self.global)
    }

    fn screen_fields(&self) -> impl Iterator<Item = (String, &FieldDef)> + '_ {
        let screen_index = self.current;
        self.current_screen()
            .fields
            .iter()
            .enumerate()
            .map(move |(field_index, field)| {
                (field.value_key(&dom_id(field, screen_index, field_index)), field)
            })
    }

    async fn run_api_checks(&self, checker: &ApiChecker) -> Option<String> {
        let context = template_context(&self.field_values, &self.global);
        for field in &self.current_screen().fields {
            let api_rules = field.rules.iter().filter(|rule| {
                rule.trigger == Trigger::OnSubmit && rule.rule_kind() == RuleKind::ApiCall
            });
            for rule in api_rules {
                let config = match ApiCallConfig::from_rule(rule) {
                    Ok(config) => config,
                    Err(err) => {
                        warn!("event=api_check module=form status=error error={err}");
                        return Some(CALL_FAILED_MESSAGE.to_string());
                    }
                };
                match checker.check(&config, &context).await {
                    Ok(ApiCheckOutcome::Passed) => {}
                    Ok(ApiCheckOutcome::Mismatch(message)) => return Some(message),
                    Err(_) => return Some(CALL_FAILED_MESSAGE.to_string()),
                }
            }
        }
        None
    }

    fn run_submit_actions(&mut self) {
        let mut assignments = Vec::new();
        for field in &self.current_screen().fields {
            for rule in field
                .rules
                .iter()
                .filter(|rule| rule.trigger == Trigger::OnSubmit)
            {
                let rule_kind = rule.rule_kind();
                if rule_kind == RuleKind::ApiCall {
                    continue;
                }
                for action in &rule.actions {
                    let is_assignment = match action.kind.as_deref() {
                        Some(kind) => kind == SET_GLOBAL_ACTION,
                        None => rule_kind == RuleKind::SetGlobalVariable,
                    };
                    if is_assignment {
                        assignments.push(action.config.clone());
                    }
                }
            }
        }

        for config in assignments {
            let Some(name) = config
                .get("variableName")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
            else {
                warn!("event=form_action module=form status=error reason=missing_variable_name");
                continue;
            };
            let value = match config.get("value") {
                Some(Value::String(template)) => Value::String(replace_placeholders(
                    template,
                    &template_context(&self.field_values, &self.global),
                )),
                Some(other) => other.clone(),
                None => Value::Null,
            };
            self.global.insert(name.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FormSession, SubmitOutcome};
    use crate::api_check::ApiChecker;
    use crate::definition::{FieldDef, FieldKind, FormDefinition, GlobalConfig, ScreenDef};
    use crate::rules::parse_rules;
    use serde_json::{json, Map, Value};
    use std::time::Duration;

    fn field(name: &str, rules: Value) -> FieldDef {
        FieldDef {
            id: None,
            kind: FieldKind::Text,
            attributes: crate::definition::FieldAttributes {
                name: Some(name.to_string()),
                ..Default::default()
            },
            rules: parse_rules(Some(&rules)),
        }
    }

    fn definition(screens: Vec<Vec<FieldDef>>) -> FormDefinition {
        FormDefinition {
            partner_name: "acme".to_string(),
            logo: None,
            version: Some(1),
            global: GlobalConfig::default(),
            header_config: json!({}),
            footer_config: json!({}),
            layout_config: json!({}),
            screens: screens
                .into_iter()
                .map(|fields| ScreenDef {
                    fields,
                    ..ScreenDef::default_screen()
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn submit_walks_screens_and_sets_globals() {
        let mut session = FormSession::new(definition(vec![
            vec![field(
                "first_name",
                json!([
                    {"trigger": "beforeSubmit", "type": "requiredValidation"},
                    {"trigger": "onSubmit", "type": "setGlobalVariable",
                     "actions": [{"config": {"variableName": "greeting",
                                             "value": "Hi {{field_values.first_name}}"}}]}
                ]),
            )],
            vec![],
        ]));
        let checker = ApiChecker::new(Duration::from_secs(1)).unwrap();

        let outcome = session.submit(&checker).await.unwrap();
        let SubmitOutcome::Invalid { field_errors } = outcome else {
            panic!("expected invalid outcome, got {outcome:?}");
        };
        assert_eq!(field_errors["first_name"], "This field is required.");
        assert_eq!(session.current_index(), 0);

        session.set_field_value("first_name", json!("Ann"));
        assert_eq!(
            session.submit(&checker).await.unwrap(),
            SubmitOutcome::Advanced { index: 1 }
        );
        assert_eq!(session.global_variables()["greeting"], json!("Hi Ann"));

        assert!(session.back());
        assert!(!session.back());
        session.submit(&checker).await.unwrap();
        assert_eq!(session.submit(&checker).await.unwrap(), SubmitOutcome::Completed);
        assert!(session.is_completed());
        assert!(session.submit(&checker).await.is_err());
    }

    #[test]
    fn resume_rejects_out_of_range_screen() {
        let err = FormSession::resume(definition(vec![vec![]]), 1, Map::new(), Map::new());
        assert!(err.is_err());
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let value = serde_json::to_value(SubmitOutcome::Advanced { index: 2 }).unwrap();
        assert_eq!(value, json!({"outcome": "advanced", "index": 2}));
    }
}
