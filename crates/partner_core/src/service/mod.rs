//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own transaction boundaries for multi-row writes.
//! - Keep the HTTP layer decoupled from storage details.

use crate::model::config::ConfigId;
use crate::model::partner::PartnerId;
use crate::model::screen::{FieldId, ScreenId};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod config_service;
pub mod partner_service;
pub mod screen_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Coarse classification used by outer layers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    NotFound,
    Validation,
    Conflict,
    Internal,
}

/// Errors from partner/config/screen use cases.
#[derive(Debug)]
pub enum ServiceError {
    /// No partner with this name (or it is inactive).
    PartnerNotFound(String),
    PartnerIdNotFound(PartnerId),
    /// No config with `version` exists for the partner.
    ConfigNotFound { partner_id: PartnerId, version: i64 },
    /// Config id unknown or owned by another partner.
    ConfigIdNotFound(ConfigId),
    /// New-version copy requested for a partner without any config.
    NoExistingConfig(PartnerId),
    /// In-place update requested without naming the config.
    MissingConfigId,
    /// Submitted screen id unknown or outside the partner/category/version.
    ScreenNotFound(ScreenId),
    /// Submitted field id unknown or outside the partner/version.
    FieldNotFound(FieldId),
    /// New field submitted without a `type`.
    MissingFieldType {
        screen_index: usize,
        field_index: usize,
    },
    DuplicateScreen(ScreenId),
    DuplicateField(FieldId),
    Repo(RepoError),
}

impl ServiceError {
    pub fn kind(&self) -> ServiceErrorKind {
        match self {
            Self::PartnerNotFound(_)
            | Self::PartnerIdNotFound(_)
            | Self::ConfigNotFound { .. }
            | Self::ConfigIdNotFound(_)
            | Self::NoExistingConfig(_)
            | Self::ScreenNotFound(_)
            | Self::FieldNotFound(_) => ServiceErrorKind::NotFound,
            Self::MissingConfigId
            | Self::MissingFieldType { .. }
            | Self::DuplicateScreen(_)
            | Self::DuplicateField(_) => ServiceErrorKind::Validation,
            Self::Repo(RepoError::Validation(_)) => ServiceErrorKind::Validation,
            Self::Repo(RepoError::NotFound { .. }) => ServiceErrorKind::NotFound,
            Self::Repo(RepoError::Conflict(_)) => ServiceErrorKind::Conflict,
            Self::Repo(_) => ServiceErrorKind::Internal,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PartnerNotFound(name) => write!(f, "partner with name {name} not found"),
            Self::PartnerIdNotFound(id) => write!(f, "partner with id {id} does not exist"),
            Self::ConfigNotFound {
                partner_id,
                version,
            } => write!(
                f,
                "partner config for partner {partner_id} and version {version} not found"
            ),
            Self::ConfigIdNotFound(id) => write!(f, "configuration not found: {id}"),
            Self::NoExistingConfig(id) => {
                write!(f, "no existing configuration found for partner {id}")
            }
            Self::MissingConfigId => {
                write!(f, "configId is required when not creating a new version")
            }
            Self::ScreenNotFound(id) => write!(f, "screen not found: {id}"),
            Self::FieldNotFound(id) => write!(f, "field not found: {id}"),
            Self::MissingFieldType {
                screen_index,
                field_index,
            } => write!(
                f,
                "new field {field_index} on screen {screen_index} requires a type"
            ),
            Self::DuplicateScreen(id) => write!(f, "screen submitted more than once: {id}"),
            Self::DuplicateField(id) => write!(f, "field submitted more than once: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}
