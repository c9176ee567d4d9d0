//! Error type for the form renderer.

use thiserror::Error;

pub type FormResult<T> = Result<T, FormError>;

/// Errors raised while building or driving a form.
#[derive(Debug, Error)]
pub enum FormError {
    /// The form has no screen at `index`.
    #[error("screen index {index} is out of range for {count} screens")]
    ScreenOutOfRange { index: usize, count: usize },

    /// Submission attempted after the last screen was accepted.
    #[error("form is already completed")]
    AlreadyCompleted,

    /// A rule's config could not be decoded.
    #[error("invalid {rule} rule config: {message}")]
    InvalidRuleConfig { rule: &'static str, message: String },

    /// A template did not produce valid JSON after substitution.
    #[error("template is not valid JSON after substitution: {0}")]
    Template(#[from] serde_json::Error),

    /// The configured request method is not an HTTP method.
    #[error("unsupported request method: {0}")]
    InvalidMethod(String),

    /// A configured header name or value is not valid HTTP.
    #[error("invalid request header: {0}")]
    InvalidHeader(String),

    /// Transport failure or undecodable response body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
