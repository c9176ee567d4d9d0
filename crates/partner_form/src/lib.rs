//! Renderer engine for partner forms.
//!
//! Turns a partner's persisted configuration into a multi-screen form model
//! and evaluates the declarative field rules attached to it.

pub mod api_check;
pub mod definition;
pub mod error;
pub mod layout;
pub mod rules;
pub mod session;
pub mod template;

pub use api_check::{ApiCallConfig, ApiCheckOutcome, ApiChecker, ExpectedValue};
pub use definition::{
    FieldAttributes, FieldDef, FieldKind, FieldStyle, FormDefinition, GlobalConfig, ScreenConfig,
    ScreenDef,
};
pub use error::{FormError, FormResult};
pub use layout::{FieldLayout, FormLayout, ScreenLayout};
pub use rules::{Rule, RuleAction, RuleKind, Trigger};
pub use session::{FormSession, SubmitOutcome};
