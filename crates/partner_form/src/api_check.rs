//! Remote `apiCall` validation.
//!
//! # Responsibility
//! - Render the request from a rule config and the current form values.
//! - Compare one value of the JSON response with the configured expectation.
//!
//! # Invariants
//! - `Content-Type: application/json` is always sent; configured headers
//!   may override it.
//! - A body is only sent for `POST` and `PUT`.
//! - Comparison is strict: a number never equals a numeric string.

use crate::error::{FormError, FormResult};
use crate::rules::Rule;
use crate::template::{lookup_path, render_json_template};
use log::{info, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Message shown when the call itself fails.
pub const CALL_FAILED_MESSAGE: &str = "An error occurred during validation.";
const MISMATCH_MESSAGE: &str = "Validation failed.";

/// Settings of an `apiCall` rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiCallConfig {
    pub api_url: String,
    pub request_method: Option<String>,
    pub request_headers: Option<Value>,
    pub request_body: Option<Value>,
    pub response_data_path: String,
    pub expected_value: Option<Value>,
    pub expected_value_type: Option<String>,
    pub error_message: Option<String>,
}

/// Expected response value after applying `expectedValueType`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl ExpectedValue {
    pub fn matches(&self, actual: &Value) -> bool {
        match self {
            Self::Boolean(expected) => actual.as_bool() == Some(*expected),
            Self::Number(expected) => actual.as_f64().is_some_and(|actual| actual == *expected),
            Self::Text(expected) => actual.as_str() == Some(expected.as_str()),
        }
    }
}

impl ApiCallConfig {
    pub fn from_rule(rule: &Rule) -> FormResult<Self> {
        serde_json::from_value(Value::Object(rule.config().clone())).map_err(|err| {
            FormError::InvalidRuleConfig {
                rule: "apiCall",
                message: err.to_string(),
            }
        })
    }

    pub fn method(&self) -> FormResult<Method> {
        let raw = self
            .request_method
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .unwrap_or("POST")
            .to_ascii_uppercase();
        Method::from_bytes(raw.as_bytes()).map_err(|_| FormError::InvalidMethod(raw))
    }

    /// `expectedValue` typed by `expectedValueType`.
    ///
    /// An unparsable number yields NaN, which matches nothing.
    pub fn expected(&self) -> ExpectedValue {
        let text = match &self.expected_value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        };
        match self.expected_value_type.as_deref() {
            Some("boolean") => ExpectedValue::Boolean(text == "true"),
            Some("number") => ExpectedValue::Number(text.trim().parse().unwrap_or(f64::NAN)),
            _ => ExpectedValue::Text(text),
        }
    }

    pub fn mismatch_message(&self) -> String {
        self.error_message
            .clone()
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| MISMATCH_MESSAGE.to_string())
    }
}

/// Result of one remote check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCheckOutcome {
    Passed,
    /// The call succeeded but the value did not match; carries the message.
    Mismatch(String),
}

/// HTTP client used for `apiCall` rules.
#[derive(Debug, Clone)]
pub struct ApiChecker {
    client: reqwest::Client,
}

impl ApiChecker {
    pub fn new(timeout: Duration) -> FormResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Performs the call described by `config`.
    ///
    /// `context` is the placeholder context built by
    /// [`crate::template::template_context`].
    pub async fn check(&self, config: &ApiCallConfig, context: &Value) -> FormResult<ApiCheckOutcome> {
        let started_at = Instant::now();
        let result = self.check_inner(config, context).await;
        match &result {
            Ok(outcome) => info!(
                "event=api_check module=form status=ok passed={} duration_ms={}",
                *outcome == ApiCheckOutcome::Passed,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=api_check module=form status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    async fn check_inner(&self, config: &ApiCallConfig, context: &Value) -> FormResult<ApiCheckOutcome> {
        let method = config.method()?;
        let headers = build_headers(&render_json_template(config.request_headers.as_ref(), context)?)?;

        let mut request = self
            .client
            .request(method.clone(), config.api_url.as_str())
            .headers(headers);
        if method == Method::POST || method == Method::PUT {
            let body = render_json_template(config.request_body.as_ref(), context)?;
            request = request.body(body.to_string());
        }

        let response: Value = request.send().await?.json().await?;
        let matched = lookup_path(&response, &config.response_data_path)
            .is_some_and(|actual| config.expected().matches(actual));

        Ok(if matched {
            ApiCheckOutcome::Passed
        } else {
            ApiCheckOutcome::Mismatch(config.mismatch_message())
        })
    }
}

fn build_headers(rendered: &Value) -> FormResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let Some(entries) = rendered.as_object() else {
        return Ok(headers);
    };
    for (name, value) in entries {
        let text = match value {
            Value::String(text) => text.clone(),
            Value::Null => continue,
            other => other.to_string(),
        };
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| FormError::InvalidHeader(name.clone()))?;
        let value =
            HeaderValue::from_str(&text).map_err(|_| FormError::InvalidHeader(name.as_str().to_string()))?;
        headers.insert(name, value);
    }
    Ok(headers)
}
