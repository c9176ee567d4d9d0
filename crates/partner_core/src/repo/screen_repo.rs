//! Screen and field repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist screens/fields of one config version.
//! - Provide the row-level primitives the screen reconciliation composes.
//!
//! # Invariants
//! - Deletes are soft (`is_active = 0`); rows stay addressable by id.
//! - List APIs return rows in storage order; callers reorder by id arrays.

use super::{
    bool_to_int, decode_json, encode_json, parse_bool, parse_uuid, placeholders, uuid_binds,
    RepoError, RepoResult, NOW_MS_SQL,
};
use crate::model::partner::PartnerId;
use crate::model::screen::{Field, FieldId, Screen, ScreenId};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::Value;

const SCREEN_SELECT_SQL: &str = "SELECT
    id,
    partner_id,
    category_name,
    screen_config,
    field_ids,
    is_active,
    configuration_version,
    created_at,
    updated_at
FROM screens";

const FIELD_SELECT_SQL: &str = "SELECT
    id,
    screen_id,
    type,
    field_config,
    is_active,
    configuration_version,
    created_at,
    updated_at
FROM fields";

/// Repository interface for screens and their fields.
pub trait ScreenRepository {
    fn create_screen(&self, screen: &Screen) -> RepoResult<()>;
    fn get_screen(&self, id: ScreenId) -> RepoResult<Option<Screen>>;
    /// Replaces `screen_config` and re-activates the screen.
    fn update_screen_config(&self, id: ScreenId, screen_config: &Value) -> RepoResult<()>;
    fn set_field_ids(&self, id: ScreenId, field_ids: &[FieldId]) -> RepoResult<()>;
    /// Ids of active screens in one category of one config version.
    fn list_active_screen_ids(
        &self,
        partner_id: PartnerId,
        category_name: &str,
        version: i64,
    ) -> RepoResult<Vec<ScreenId>>;
    fn list_screens_by_ids(&self, ids: &[ScreenId], active_only: bool) -> RepoResult<Vec<Screen>>;
    /// All active screens of a partner, across versions.
    fn list_active_screens(&self, partner_id: PartnerId) -> RepoResult<Vec<Screen>>;
    fn soft_delete_screens(&self, ids: &[ScreenId]) -> RepoResult<usize>;
    fn create_field(&self, field: &Field) -> RepoResult<()>;
    fn get_field(&self, id: FieldId) -> RepoResult<Option<Field>>;
    /// Rewrites one field and re-activates it under `screen_id`.
    ///
    /// `kind = None` keeps the persisted type.
    fn update_field(
        &self,
        id: FieldId,
        screen_id: ScreenId,
        kind: Option<&str>,
        field_config: &Value,
    ) -> RepoResult<()>;
    fn list_fields_for_screens(
        &self,
        screen_ids: &[ScreenId],
        active_only: bool,
    ) -> RepoResult<Vec<Field>>;
    fn soft_delete_fields(&self, ids: &[FieldId]) -> RepoResult<usize>;
}

/// SQLite-backed screen/field repository.
pub struct SqliteScreenRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteScreenRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ScreenRepository for SqliteScreenRepository<'_> {
    fn create_screen(&self, screen: &Screen) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO screens (
                id,
                partner_id,
                category_name,
                screen_config,
                field_ids,
                is_active,
                configuration_version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                screen.id.to_string(),
                screen.partner_id.to_string(),
                screen.category_name.as_str(),
                encode_json(&screen.screen_config, "screens.screen_config")?,
                encode_json(&screen.field_ids, "screens.field_ids")?,
                bool_to_int(screen.is_active),
                screen.configuration_version,
            ],
        )?;
        Ok(())
    }

    fn get_screen(&self, id: ScreenId) -> RepoResult<Option<Screen>> {
        self.conn
            .query_row(
                &format!("{SCREEN_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_screen_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn update_screen_config(&self, id: ScreenId, screen_config: &Value) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE screens
                 SET screen_config = ?2,
                     is_active = 1,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![
                id.to_string(),
                encode_json(screen_config, "screens.screen_config")?
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("screen", id));
        }
        Ok(())
    }

    fn set_field_ids(&self, id: ScreenId, field_ids: &[FieldId]) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE screens
                 SET field_ids = ?2,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![id.to_string(), encode_json(&field_ids, "screens.field_ids")?],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("screen", id));
        }
        Ok(())
    }

    fn list_active_screen_ids(
        &self,
        partner_id: PartnerId,
        category_name: &str,
        version: i64,
    ) -> RepoResult<Vec<ScreenId>> {
        let mut stmt = self.conn.prepare(
            "SELECT id
             FROM screens
             WHERE partner_id = ?1
               AND category_name = ?2
               AND configuration_version = ?3
               AND is_active = 1
             ORDER BY created_at ASC, id ASC;",
        )?;
        let mut rows = stmt.query(params![partner_id.to_string(), category_name, version])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(parse_uuid(&value, "screens.id")?);
        }
        Ok(ids)
    }

    fn list_screens_by_ids(&self, ids: &[ScreenId], active_only: bool) -> RepoResult<Vec<Screen>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut sql = format!(
            "{SCREEN_SELECT_SQL} WHERE id IN ({})",
            placeholders(ids.len())
        );
        if active_only {
            sql.push_str(" AND is_active = 1");
        }
        self.collect_screens(&sql, uuid_binds(ids))
    }

    fn list_active_screens(&self, partner_id: PartnerId) -> RepoResult<Vec<Screen>> {
        self.collect_screens(
            &format!(
                "{SCREEN_SELECT_SQL}
                 WHERE partner_id = ?
                   AND is_active = 1
                 ORDER BY configuration_version ASC, created_at ASC, id ASC"
            ),
            uuid_binds(&[partner_id]),
        )
    }

    fn soft_delete_screens(&self, ids: &[ScreenId]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let changed = self.conn.execute(
            &format!(
                "UPDATE screens
                 SET is_active = 0,
                     updated_at = {NOW_MS_SQL}
                 WHERE id IN ({})
                   AND is_active = 1;",
                placeholders(ids.len())
            ),
            params_from_iter(uuid_binds(ids)),
        )?;
        Ok(changed)
    }

    fn create_field(&self, field: &Field) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO fields (
                id,
                screen_id,
                type,
                field_config,
                is_active,
                configuration_version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                field.id.to_string(),
                field.screen_id.to_string(),
                field.kind.as_str(),
                encode_json(&field.field_config, "fields.field_config")?,
                bool_to_int(field.is_active),
                field.configuration_version,
            ],
        )?;
        Ok(())
    }

    fn get_field(&self, id: FieldId) -> RepoResult<Option<Field>> {
        self.conn
            .query_row(
                &format!("{FIELD_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_field_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn update_field(
        &self,
        id: FieldId,
        screen_id: ScreenId,
        kind: Option<&str>,
        field_config: &Value,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE fields
                 SET screen_id = ?2,
                     type = COALESCE(?3, type),
                     field_config = ?4,
                     is_active = 1,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![
                id.to_string(),
                screen_id.to_string(),
                kind,
                encode_json(field_config, "fields.field_config")?,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("field", id));
        }
        Ok(())
    }

    fn list_fields_for_screens(
        &self,
        screen_ids: &[ScreenId],
        active_only: bool,
    ) -> RepoResult<Vec<Field>> {
        if screen_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut sql = format!(
            "{FIELD_SELECT_SQL} WHERE screen_id IN ({})",
            placeholders(screen_ids.len())
        );
        if active_only {
            sql.push_str(" AND is_active = 1");
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(uuid_binds(screen_ids)))?;
        let mut fields = Vec::new();
        while let Some(row) = rows.next()? {
            fields.push(parse_field_row(row)?);
        }
        Ok(fields)
    }

    fn soft_delete_fields(&self, ids: &[FieldId]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let changed = self.conn.execute(
            &format!(
                "UPDATE fields
                 SET is_active = 0,
                     updated_at = {NOW_MS_SQL}
                 WHERE id IN ({})
                   AND is_active = 1;",
                placeholders(ids.len())
            ),
            params_from_iter(uuid_binds(ids)),
        )?;
        Ok(changed)
    }
}

impl SqliteScreenRepository<'_> {
    fn collect_screens(
        &self,
        sql: &str,
        binds: Vec<rusqlite::types::Value>,
    ) -> RepoResult<Vec<Screen>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut screens = Vec::new();
        while let Some(row) = rows.next()? {
            screens.push(parse_screen_row(row)?);
        }
        Ok(screens)
    }
}

fn parse_screen_row(row: &Row<'_>) -> RepoResult<Screen> {
    let id_text: String = row.get("id")?;
    let partner_text: String = row.get("partner_id")?;
    let config_text: String = row.get("screen_config")?;
    let field_ids_text: String = row.get("field_ids")?;

    Ok(Screen {
        id: parse_uuid(&id_text, "screens.id")?,
        partner_id: parse_uuid(&partner_text, "screens.partner_id")?,
        category_name: row.get("category_name")?,
        screen_config: decode_json(&config_text, "screens.screen_config")?,
        field_ids: decode_json(&field_ids_text, "screens.field_ids")?,
        is_active: parse_bool(row.get("is_active")?, "screens.is_active")?,
        configuration_version: row.get("configuration_version")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_field_row(row: &Row<'_>) -> RepoResult<Field> {
    let id_text: String = row.get("id")?;
    let screen_text: String = row.get("screen_id")?;
    let config_text: String = row.get("field_config")?;

    Ok(Field {
        id: parse_uuid(&id_text, "fields.id")?,
        screen_id: parse_uuid(&screen_text, "fields.screen_id")?,
        kind: row.get("type")?,
        field_config: decode_json(&config_text, "fields.field_config")?,
        is_active: parse_bool(row.get("is_active")?, "fields.is_active")?,
        configuration_version: row.get("configuration_version")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
