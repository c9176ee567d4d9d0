//! Config versioning use cases.
//!
//! # Responsibility
//! - Update a config version in place.
//! - Create the next version as a deep copy of the latest one.
//!
//! # Invariants
//! - A new version is always `latest.version + 1`.
//! - Copied screens/fields are new rows owned by the new version; the source
//!   version's rows are never modified.
//! - Copies preserve `screen_ids` / `field_ids` order.

use crate::model::config::{ConfigId, ConfigUpdate, PartnerConfig};
use crate::model::partner::PartnerId;
use crate::model::screen::{order_by_ids, Field, Screen, ScreenId};
use crate::repo::config_repo::{ConfigRepository, SqliteConfigRepository};
use crate::repo::partner_repo::{PartnerRepository, SqlitePartnerRepository};
use crate::repo::screen_repo::{ScreenRepository, SqliteScreenRepository};
use crate::service::{ServiceError, ServiceResult};
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;
use uuid::Uuid;

/// Use-case service for versioned partner configs.
pub struct ConfigService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ConfigService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Applies `updates` either in place or as a new copied version.
    ///
    /// # Contract
    /// - `create_new_version = true`: copies the latest version; `config_id`
    ///   is ignored.
    /// - `create_new_version = false`: `config_id` is required and must belong
    ///   to `partner_id`.
    pub fn update_or_create_config(
        &self,
        partner_id: PartnerId,
        config_id: Option<ConfigId>,
        updates: &ConfigUpdate,
        create_new_version: bool,
    ) -> ServiceResult<PartnerConfig> {
        let started_at = Instant::now();
        let result = if create_new_version {
            self.create_next_version(partner_id, updates)
        } else {
            config_id
                .ok_or(ServiceError::MissingConfigId)
                .and_then(|id| self.update_in_place(partner_id, id, updates))
        };

        match &result {
            Ok(config) => info!(
                "event=config_save module=service status=ok partner_id={} version={} new_version={} duration_ms={}",
                partner_id,
                config.version,
                create_new_version,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=config_save module=service status=error partner_id={} new_version={} duration_ms={} error={}",
                partner_id,
                create_new_version,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn update_in_place(
        &self,
        partner_id: PartnerId,
        config_id: ConfigId,
        updates: &ConfigUpdate,
    ) -> ServiceResult<PartnerConfig> {
        let configs = SqliteConfigRepository::new(self.conn);
        let existing = configs
            .get_config(config_id)?
            .filter(|config| config.partner_id == partner_id)
            .ok_or(ServiceError::ConfigIdNotFound(config_id))?;

        Ok(configs.update_blobs(config_id, &existing.blobs_with(updates))?)
    }

    fn create_next_version(
        &self,
        partner_id: PartnerId,
        updates: &ConfigUpdate,
    ) -> ServiceResult<PartnerConfig> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let configs = SqliteConfigRepository::new(&tx);
        let screens = SqliteScreenRepository::new(&tx);

        if SqlitePartnerRepository::new(&tx)
            .get_partner(partner_id)?
            .is_none()
        {
            return Err(ServiceError::PartnerIdNotFound(partner_id));
        }
        let latest = configs
            .latest_config(partner_id)?
            .ok_or(ServiceError::NoExistingConfig(partner_id))?;
        let next_version = latest.version + 1;

        let source_screens: Vec<Screen> = order_by_ids(
            &latest.screen_ids,
            screens.list_screens_by_ids(&latest.screen_ids, true)?,
            |screen| screen.id,
        )
        .into_iter()
        .filter(|screen| screen.configuration_version == latest.version)
        .collect();
        let source_ids: Vec<ScreenId> = source_screens.iter().map(|screen| screen.id).collect();
        let source_fields = screens.list_fields_for_screens(&source_ids, true)?;

        let mut copied_ids = Vec::with_capacity(source_screens.len());
        for source in &source_screens {
            let mut copy = Screen::new(
                partner_id,
                source.category_name.as_str(),
                source.screen_config.clone(),
                next_version,
            );
            copy.is_active = source.is_active;

            let own_fields: Vec<Field> = source_fields
                .iter()
                .filter(|field| field.screen_id == source.id)
                .cloned()
                .collect();
            let field_copies: Vec<Field> = order_by_ids(&source.field_ids, own_fields, |field| {
                field.id
            })
            .into_iter()
            .map(|field| Field {
                id: Uuid::new_v4(),
                screen_id: copy.id,
                configuration_version: next_version,
                ..field
            })
            .collect();

            copy.field_ids = field_copies.iter().map(|field| field.id).collect();
            screens.create_screen(&copy)?;
            for field in &field_copies {
                screens.create_field(field)?;
            }
            copied_ids.push(copy.id);
        }

        let blobs = latest.blobs_with(updates);
        let created = configs.create_config(&PartnerConfig {
            id: Uuid::new_v4(),
            partner_id,
            version: next_version,
            global_config: blobs.global_config,
            header_config: blobs.header_config,
            footer_config: blobs.footer_config,
            layout_config: blobs.layout_config,
            screen_ids: copied_ids,
            created_at: 0,
            updated_at: 0,
        })?;
        tx.commit()?;

        Ok(created)
    }
}
