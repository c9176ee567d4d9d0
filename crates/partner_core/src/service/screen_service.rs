//! Screen/field reconciliation use cases.
//!
//! # Responsibility
//! - Reconcile a client-submitted screen list against persisted rows.
//! - Resolve screens and fields in id-array order for readers.
//!
//! # Invariants
//! - `save_screens` is atomic: any failure rolls back every row it touched.
//! - Screens/fields not resubmitted are soft-deleted, never hard-deleted.
//! - After a save, `screens.field_ids` and the category's slice of
//!   `partner_configs.screen_ids` match the submitted order exactly.

use crate::model::config::empty_object;
use crate::model::partner::{PartnerId, PartnerValidationError};
use crate::model::screen::{
    normalize_field_config, order_by_ids, Field, FieldId, Screen, ScreenId, ScreenInput,
    ScreenWithFields,
};
use crate::repo::config_repo::{ConfigRepository, SqliteConfigRepository};
use crate::repo::partner_repo::{PartnerRepository, SqlitePartnerRepository};
use crate::repo::screen_repo::{ScreenRepository, SqliteScreenRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::{ServiceError, ServiceResult};
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

/// Result of one reconciliation: the category's screens in submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedScreens {
    pub screens: Vec<ScreenWithFields>,
    pub screen_ids: Vec<ScreenId>,
}

/// Use-case service for screens and fields.
pub struct ScreenService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ScreenService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Reconciles `inputs` with the persisted screens of one category.
    ///
    /// # Contract
    /// - Partner and config version must exist.
    /// - Submitted ids must belong to this partner/version (screens also to
    ///   this category).
    /// - Returns the saved screens with active fields, in submitted order.
    pub fn save_screens(
        &self,
        partner_id: PartnerId,
        version: i64,
        category_name: &str,
        inputs: &[ScreenInput],
    ) -> ServiceResult<SavedScreens> {
        let started_at = Instant::now();
        let result = self.save_screens_inner(partner_id, version, category_name, inputs);
        match &result {
            Ok(saved) => info!(
                "event=screens_save module=service status=ok partner_id={} version={} category={} screens={} duration_ms={}",
                partner_id,
                version,
                category_name,
                saved.screen_ids.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=screens_save module=service status=error partner_id={} version={} category={} duration_ms={} error={}",
                partner_id,
                version,
                category_name,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn save_screens_inner(
        &self,
        partner_id: PartnerId,
        version: i64,
        category_name: &str,
        inputs: &[ScreenInput],
    ) -> ServiceResult<SavedScreens> {
        let category_name = category_name.trim();
        if category_name.is_empty() {
            return Err(RepoError::from(PartnerValidationError::BlankCategoryName).into());
        }

        if SqlitePartnerRepository::new(self.conn)
            .get_partner(partner_id)?
            .is_none()
        {
            return Err(ServiceError::PartnerIdNotFound(partner_id));
        }
        let not_found = || ServiceError::ConfigNotFound {
            partner_id,
            version,
        };
        SqliteConfigRepository::new(self.conn)
            .find_config_by_version(partner_id, version)?
            .ok_or_else(not_found)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let screens = SqliteScreenRepository::new(&tx);
        let configs = SqliteConfigRepository::new(&tx);

        let previous_ids = screens.list_active_screen_ids(partner_id, category_name, version)?;
        let mut saved_ids: Vec<ScreenId> = Vec::with_capacity(inputs.len());
        let mut kept_fields: HashSet<FieldId> = HashSet::new();

        for (screen_index, input) in inputs.iter().enumerate() {
            let screen_config = input
                .screen_config
                .clone()
                .filter(|value| !value.is_null())
                .unwrap_or_else(empty_object);

            let screen_id = match input.id {
                Some(id) => {
                    let owned = screens.get_screen(id)?.is_some_and(|screen| {
                        screen.partner_id == partner_id
                            && screen.category_name == category_name
                            && screen.configuration_version == version
                    });
                    if !owned {
                        return Err(ServiceError::ScreenNotFound(id));
                    }
                    screens.update_screen_config(id, &screen_config)?;
                    id
                }
                None => {
                    let screen = Screen::new(partner_id, category_name, screen_config, version);
                    screens.create_screen(&screen)?;
                    screen.id
                }
            };
            if saved_ids.contains(&screen_id) {
                return Err(ServiceError::DuplicateScreen(screen_id));
            }
            saved_ids.push(screen_id);

            let mut field_ids = Vec::new();
            for (field_index, field_input) in input.fields.iter().flatten().enumerate() {
                let field_config = normalize_field_config(field_input.field_config.as_ref());
                let kind = field_input
                    .kind
                    .as_deref()
                    .map(str::trim)
                    .filter(|kind| !kind.is_empty());

                let field_id = match field_input.id {
                    Some(id) => {
                        let owner = owning_screen(&screens, id, partner_id, version)?;
                        if owner.id != screen_id {
                            let remaining: Vec<FieldId> = owner
                                .field_ids
                                .iter()
                                .copied()
                                .filter(|other| *other != id)
                                .collect();
                            screens.set_field_ids(owner.id, &remaining)?;
                        }
                        screens.update_field(id, screen_id, kind, &field_config)?;
                        id
                    }
                    None => {
                        let kind = kind.ok_or(ServiceError::MissingFieldType {
                            screen_index,
                            field_index,
                        })?;
                        let field = Field::new(screen_id, kind, Some(&field_config), version);
                        screens.create_field(&field)?;
                        field.id
                    }
                };
                if !kept_fields.insert(field_id) {
                    return Err(ServiceError::DuplicateField(field_id));
                }
                field_ids.push(field_id);
            }
            screens.set_field_ids(screen_id, &field_ids)?;
        }

        let removed_screens: Vec<ScreenId> = previous_ids
            .iter()
            .copied()
            .filter(|id| !saved_ids.contains(id))
            .collect();
        let touched: Vec<ScreenId> = previous_ids
            .iter()
            .chain(saved_ids.iter())
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let stale_fields: Vec<FieldId> = screens
            .list_fields_for_screens(&touched, true)?
            .into_iter()
            .map(|field| field.id)
            .filter(|id| !kept_fields.contains(id))
            .collect();
        screens.soft_delete_fields(&stale_fields)?;
        screens.soft_delete_screens(&removed_screens)?;

        let config = configs
            .find_config_by_version(partner_id, version)?
            .ok_or_else(not_found)?;
        let category_members: HashSet<ScreenId> = screens
            .list_screens_by_ids(&config.screen_ids, false)?
            .into_iter()
            .filter(|screen| screen.category_name == category_name)
            .map(|screen| screen.id)
            .chain(previous_ids.iter().copied())
            .collect();
        let screen_order = splice_category_screens(&config.screen_ids, &saved_ids, |id| {
            category_members.contains(id)
        });
        configs.set_screen_ids(config.id, &screen_order)?;

        let resolved = resolve_screens(&screens, &saved_ids)?;
        tx.commit()?;

        Ok(SavedScreens {
            screens: resolved,
            screen_ids: saved_ids,
        })
    }

    /// Lists all active screens of a partner with their ordered fields.
    pub fn get_screens(&self, partner_id: PartnerId) -> ServiceResult<Vec<ScreenWithFields>> {
        let repo = SqliteScreenRepository::new(self.conn);
        let screens = repo.list_active_screens(partner_id)?;
        Ok(attach_fields(&repo, screens)?)
    }

    /// Soft-deletes one screen. Deleting an inactive screen is a no-op.
    pub fn delete_screen(&self, id: ScreenId) -> ServiceResult<()> {
        let repo = SqliteScreenRepository::new(self.conn);
        if repo.get_screen(id)?.is_none() {
            return Err(ServiceError::ScreenNotFound(id));
        }
        repo.soft_delete_screens(&[id])?;
        info!("event=screen_delete module=service status=ok screen_id={id}");
        Ok(())
    }
}

/// Loads active screens listed in `screen_ids`, in that order, with fields.
pub(crate) fn resolve_screens(
    repo: &impl ScreenRepository,
    screen_ids: &[ScreenId],
) -> RepoResult<Vec<ScreenWithFields>> {
    let screens = order_by_ids(
        screen_ids,
        repo.list_screens_by_ids(screen_ids, true)?,
        |screen| screen.id,
    );
    attach_fields(repo, screens)
}

fn attach_fields(
    repo: &impl ScreenRepository,
    screens: Vec<Screen>,
) -> RepoResult<Vec<ScreenWithFields>> {
    let ids: Vec<ScreenId> = screens.iter().map(|screen| screen.id).collect();
    let fields = repo.list_fields_for_screens(&ids, true)?;

    Ok(screens
        .into_iter()
        .map(|screen| {
            let own: Vec<Field> = fields
                .iter()
                .filter(|field| field.screen_id == screen.id)
                .cloned()
                .collect();
            let fields = order_by_ids(&screen.field_ids, own, |field| field.id);
            ScreenWithFields { screen, fields }
        })
        .collect())
}

/// Screen currently holding field `id`, when it belongs to this partner and version.
fn owning_screen(
    screens: &impl ScreenRepository,
    id: FieldId,
    partner_id: PartnerId,
    version: i64,
) -> ServiceResult<Screen> {
    let field = screens
        .get_field(id)?
        .filter(|field| field.configuration_version == version)
        .ok_or(ServiceError::FieldNotFound(id))?;
    screens
        .get_screen(field.screen_id)?
        .filter(|screen| screen.partner_id == partner_id)
        .ok_or(ServiceError::FieldNotFound(id))
}

/// Replaces a category's slice of `previous` with `submitted`.
///
/// The submitted ids take the position of the first entry that belongs to the
/// category; entries of other categories keep their relative order. When the
/// category had no entries, the submitted ids are appended.
pub(crate) fn splice_category_screens(
    previous: &[ScreenId],
    submitted: &[ScreenId],
    belongs_to_category: impl Fn(&ScreenId) -> bool,
) -> Vec<ScreenId> {
    let mut order = Vec::with_capacity(previous.len() + submitted.len());
    let mut inserted = false;
    for id in previous {
        if belongs_to_category(id) || submitted.contains(id) {
            if !inserted {
                order.extend_from_slice(submitted);
                inserted = true;
            }
        } else {
            order.push(*id);
        }
    }
    if !inserted {
        order.extend_from_slice(submitted);
    }
    order
}
