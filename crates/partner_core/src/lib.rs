//! Core domain logic for the partner portal.
//! This crate is the single source of truth for partner/config/screen
//! invariants and owns all SQL.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{
    default_log_level, init_logging, logging_status, LogSettings, LogTarget, LoggingError,
};
pub use model::config::{ConfigId, ConfigUpdate, ConfigVersionSummary, PartnerConfig};
pub use model::partner::{Category, Partner, PartnerId, PartnerValidationError};
pub use model::screen::{
    Field, FieldId, FieldInput, Screen, ScreenId, ScreenInput, ScreenWithFields,
};
pub use repo::{RepoError, RepoResult};
pub use service::config_service::ConfigService;
pub use service::partner_service::{validate_pincode, NewPartner, PartnerService, PartnerView};
pub use service::screen_service::{SavedScreens, ScreenService};
pub use service::{ServiceError, ServiceErrorKind, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
