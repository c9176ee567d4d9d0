//! Partner-level use cases: lookup, creation, deletion, categories, versions.
//!
//! # Invariants
//! - Name lookups only see active partners; [`PartnerService::name_taken`]
//!   is the exception and sees every row.
//! - The partner view lists exactly the active screens named by the selected
//!   config's `screen_ids`, in that order.

use crate::model::config::{ConfigVersionSummary, PartnerConfig, INITIAL_CONFIG_VERSION};
use crate::model::partner::{Category, Partner, PartnerId};
use crate::model::screen::ScreenWithFields;
use crate::repo::config_repo::{ConfigRepository, SqliteConfigRepository};
use crate::repo::partner_repo::{PartnerRepository, SqlitePartnerRepository};
use crate::repo::screen_repo::SqliteScreenRepository;
use crate::repo::RepoError;
use crate::service::screen_service::resolve_screens;
use crate::service::{ServiceError, ServiceResult};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

/// Number of versions returned by [`PartnerService::list_configurations`].
pub const VERSION_LISTING_LIMIT: u32 = 10;

const VALID_PINCODE_PREFIX: &str = "1000";

/// Request model for creating a partner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPartner {
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
    /// Category names created active together with the partner.
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Read model returned by partner lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerView {
    pub id: PartnerId,
    pub name: String,
    pub logo: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    /// Selected config version; `None` when the requested version is missing.
    pub config: Option<PartnerConfig>,
    pub screens: Vec<ScreenWithFields>,
    pub categories: Vec<Category>,
}

/// Use-case service for partners.
pub struct PartnerService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> PartnerService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Creates a partner, its categories and an empty version-1 config.
    ///
    /// # Errors
    /// - Validation error for blank names.
    /// - Conflict when the name (or a category name) is already taken.
    pub fn create_partner(&self, request: &NewPartner) -> ServiceResult<PartnerView> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let partners = SqlitePartnerRepository::new(&tx);
        let configs = SqliteConfigRepository::new(&tx);

        let partner = partners.create_partner(&Partner::new(
            request.name.trim(),
            request.logo.clone(),
        ))?;
        for name in &request.categories {
            partners.create_category(&Category::new(partner.id, name.trim()))?;
        }
        configs.create_config(&PartnerConfig::empty(partner.id, INITIAL_CONFIG_VERSION))?;
        tx.commit()?;

        info!(
            "event=partner_create module=service status=ok partner_id={} categories={}",
            partner.id,
            request.categories.len()
        );
        self.build_view(partner, None)
    }

    /// Finds an active partner by name with one config version resolved.
    ///
    /// `version = None` selects the latest version. Returns `Ok(None)` when
    /// the partner does not exist or is inactive.
    pub fn get_partner_by_name(
        &self,
        name: &str,
        version: Option<i64>,
    ) -> ServiceResult<Option<PartnerView>> {
        let partner = SqlitePartnerRepository::new(self.conn).find_partner_by_name(name, true)?;
        match partner {
            Some(partner) => Ok(Some(self.build_view(partner, version)?)),
            None => Ok(None),
        }
    }

    /// Finds an active partner by name or fails with `PartnerNotFound`.
    pub fn require_partner(&self, name: &str) -> ServiceResult<Partner> {
        SqlitePartnerRepository::new(self.conn)
            .find_partner_by_name(name, true)?
            .ok_or_else(|| ServiceError::PartnerNotFound(name.to_string()))
    }

    /// Whether any partner, active or not, already uses `name`.
    pub fn name_taken(&self, name: &str) -> ServiceResult<bool> {
        Ok(SqlitePartnerRepository::new(self.conn)
            .find_partner_by_name(name.trim(), false)?
            .is_some())
    }

    /// Hard-deletes a partner and everything it owns.
    pub fn delete_partner(&self, id: PartnerId) -> ServiceResult<()> {
        match SqlitePartnerRepository::new(self.conn).delete_partner(id) {
            Ok(()) => {
                info!("event=partner_delete module=service status=ok partner_id={id}");
                Ok(())
            }
            Err(RepoError::NotFound { .. }) => Err(ServiceError::PartnerIdNotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Activates or deactivates a partner's category by name.
    ///
    /// Returns the number of categories updated (zero when none match).
    pub fn update_category_status(
        &self,
        partner_id: PartnerId,
        category_name: &str,
        is_active: bool,
    ) -> ServiceResult<usize> {
        let changed = SqlitePartnerRepository::new(self.conn).set_category_status(
            partner_id,
            category_name,
            is_active,
        )?;
        info!(
            "event=category_status module=service status=ok partner_id={} category={} is_active={} changed={}",
            partner_id, category_name, is_active, changed
        );
        Ok(changed)
    }

    /// Lists the newest config versions of a partner, highest first.
    pub fn list_configurations(&self, partner_name: &str) -> ServiceResult<Vec<ConfigVersionSummary>> {
        let partner = SqlitePartnerRepository::new(self.conn)
            .find_partner_by_name(partner_name, false)?
            .ok_or_else(|| ServiceError::PartnerNotFound(partner_name.to_string()))?;
        Ok(SqliteConfigRepository::new(self.conn)
            .list_versions(partner.id, VERSION_LISTING_LIMIT)?)
    }

    fn build_view(&self, partner: Partner, version: Option<i64>) -> ServiceResult<PartnerView> {
        let configs = SqliteConfigRepository::new(self.conn);
        let config = match version {
            Some(version) => configs.find_config_by_version(partner.id, version)?,
            None => configs.latest_config(partner.id)?,
        };

        let screens = match &config {
            Some(config) => {
                resolve_screens(&SqliteScreenRepository::new(self.conn), &config.screen_ids)?
            }
            None => Vec::new(),
        };
        let categories = SqlitePartnerRepository::new(self.conn).list_categories(partner.id)?;

        Ok(PartnerView {
            id: partner.id,
            name: partner.name,
            logo: partner.logo,
            is_active: partner.is_active,
            created_at: partner.created_at,
            updated_at: partner.updated_at,
            config,
            screens,
            categories,
        })
    }
}

/// Returns whether a pincode is serviceable.
pub fn validate_pincode(pincode: &str) -> bool {
    pincode.starts_with(VALID_PINCODE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::validate_pincode;

    #[test]
    fn pincode_prefix_decides_validity() {
        assert!(validate_pincode("100045"));
        assert!(!validate_pincode("200045"));
        assert!(!validate_pincode(""));
    }

    #[test]
    fn pincode_is_checked_as_given() {
        assert!(!validate_pincode(" 100045"));
        assert!(validate_pincode("1000 45"));
    }
}
