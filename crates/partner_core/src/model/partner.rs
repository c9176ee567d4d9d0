//! Partner and category records.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a partner.
pub type PartnerId = Uuid;
/// Stable identifier of a category row.
pub type CategoryId = Uuid;

/// A partner whose portal is configured through versioned configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    /// Unique, URL-addressable partner name.
    pub name: String,
    pub logo: Option<String>,
    /// Inactive partners are invisible to name lookups.
    pub is_active: bool,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Partner {
    /// Creates an active partner with a generated id.
    ///
    /// Timestamps are assigned by storage on insert.
    pub fn new(name: impl Into<String>, logo: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            logo,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Validates write-time invariants.
    pub fn validate(&self) -> Result<(), PartnerValidationError> {
        validate_name(&self.name)
    }
}

/// Named group of screens (one product flow) within a partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub partner_id: PartnerId,
    pub name: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Category {
    /// Creates an active category for `partner_id`.
    pub fn new(partner_id: PartnerId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            partner_id,
            name: name.into(),
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), PartnerValidationError> {
        if self.name.trim().is_empty() {
            return Err(PartnerValidationError::BlankCategoryName);
        }
        Ok(())
    }
}

/// Write-time validation failures for partners and categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartnerValidationError {
    BlankName,
    /// Names are used as path segments and must not contain `/`.
    NameContainsSlash(String),
    BlankCategoryName,
}

impl Display for PartnerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "partner name must not be blank"),
            Self::NameContainsSlash(name) => {
                write!(f, "partner name must not contain `/`: {name}")
            }
            Self::BlankCategoryName => write!(f, "category name must not be blank"),
        }
    }
}

impl Error for PartnerValidationError {}

fn validate_name(name: &str) -> Result<(), PartnerValidationError> {
    if name.trim().is_empty() {
        return Err(PartnerValidationError::BlankName);
    }
    if name.contains('/') {
        return Err(PartnerValidationError::NameContainsSlash(name.to_string()));
    }
    Ok(())
}
