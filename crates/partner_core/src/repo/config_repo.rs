//! Partner config repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `(partner_id, version)` uniqueness is enforced by storage.
//! - "Latest" always means the highest `version`, never the newest row.

use super::{decode_json, encode_json, parse_uuid, RepoError, RepoResult, NOW_MS_SQL};
use crate::model::config::{ConfigBlobs, ConfigId, ConfigVersionSummary, PartnerConfig};
use crate::model::partner::PartnerId;
use crate::model::screen::ScreenId;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

const CONFIG_SELECT_SQL: &str = "SELECT
    id,
    partner_id,
    version,
    global_config,
    header_config,
    footer_config,
    layout_config,
    screen_ids,
    created_at,
    updated_at
FROM partner_configs";

/// Repository interface for versioned partner configs.
pub trait ConfigRepository {
    fn create_config(&self, config: &PartnerConfig) -> RepoResult<PartnerConfig>;
    fn get_config(&self, id: ConfigId) -> RepoResult<Option<PartnerConfig>>;
    fn find_config_by_version(
        &self,
        partner_id: PartnerId,
        version: i64,
    ) -> RepoResult<Option<PartnerConfig>>;
    fn latest_config(&self, partner_id: PartnerId) -> RepoResult<Option<PartnerConfig>>;
    /// Replaces the four JSON blobs and bumps `updated_at`.
    fn update_blobs(&self, id: ConfigId, blobs: &ConfigBlobs) -> RepoResult<PartnerConfig>;
    fn set_screen_ids(&self, id: ConfigId, screen_ids: &[ScreenId]) -> RepoResult<()>;
    /// Lists the newest `limit` versions, highest first.
    fn list_versions(
        &self,
        partner_id: PartnerId,
        limit: u32,
    ) -> RepoResult<Vec<ConfigVersionSummary>>;
}

/// SQLite-backed config repository.
pub struct SqliteConfigRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteConfigRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_one(&self, sql: &str, binds: impl rusqlite::Params) -> RepoResult<Option<PartnerConfig>> {
        self.conn
            .query_row(sql, binds, |row| Ok(parse_config_row(row)))
            .optional()?
            .transpose()
    }
}

impl ConfigRepository for SqliteConfigRepository<'_> {
    fn create_config(&self, config: &PartnerConfig) -> RepoResult<PartnerConfig> {
        self.conn.execute(
            "INSERT INTO partner_configs (
                id,
                partner_id,
                version,
                global_config,
                header_config,
                footer_config,
                layout_config,
                screen_ids
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                config.id.to_string(),
                config.partner_id.to_string(),
                config.version,
                encode_json(&config.global_config, "partner_configs.global_config")?,
                encode_json(&config.header_config, "partner_configs.header_config")?,
                encode_json(&config.footer_config, "partner_configs.footer_config")?,
                encode_json(&config.layout_config, "partner_configs.layout_config")?,
                encode_json(&config.screen_ids, "partner_configs.screen_ids")?,
            ],
        )?;

        self.get_config(config.id)?
            .ok_or_else(|| RepoError::not_found("partner config", config.id))
    }

    fn get_config(&self, id: ConfigId) -> RepoResult<Option<PartnerConfig>> {
        self.query_one(
            &format!("{CONFIG_SELECT_SQL} WHERE id = ?1;"),
            [id.to_string()],
        )
    }

    fn find_config_by_version(
        &self,
        partner_id: PartnerId,
        version: i64,
    ) -> RepoResult<Option<PartnerConfig>> {
        self.query_one(
            &format!("{CONFIG_SELECT_SQL} WHERE partner_id = ?1 AND version = ?2;"),
            params![partner_id.to_string(), version],
        )
    }

    fn latest_config(&self, partner_id: PartnerId) -> RepoResult<Option<PartnerConfig>> {
        self.query_one(
            &format!(
                "{CONFIG_SELECT_SQL}
                 WHERE partner_id = ?1
                 ORDER BY version DESC
                 LIMIT 1;"
            ),
            [partner_id.to_string()],
        )
    }

    fn update_blobs(&self, id: ConfigId, blobs: &ConfigBlobs) -> RepoResult<PartnerConfig> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE partner_configs
                 SET global_config = ?2,
                     header_config = ?3,
                     footer_config = ?4,
                     layout_config = ?5,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![
                id.to_string(),
                encode_json(&blobs.global_config, "partner_configs.global_config")?,
                encode_json(&blobs.header_config, "partner_configs.header_config")?,
                encode_json(&blobs.footer_config, "partner_configs.footer_config")?,
                encode_json(&blobs.layout_config, "partner_configs.layout_config")?,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("partner config", id));
        }

        self.get_config(id)?
            .ok_or_else(|| RepoError::not_found("partner config", id))
    }

    fn set_screen_ids(&self, id: ConfigId, screen_ids: &[ScreenId]) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE partner_configs
                 SET screen_ids = ?2,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![
                id.to_string(),
                encode_json(&screen_ids, "partner_configs.screen_ids")?
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("partner config", id));
        }
        Ok(())
    }

    fn list_versions(
        &self,
        partner_id: PartnerId,
        limit: u32,
    ) -> RepoResult<Vec<ConfigVersionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT version, created_at
             FROM partner_configs
             WHERE partner_id = ?1
             ORDER BY version DESC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![partner_id.to_string(), i64::from(limit)])?;
        let mut versions = Vec::new();
        while let Some(row) = rows.next()? {
            versions.push(ConfigVersionSummary {
                version: row.get(0)?,
                created_at: row.get(1)?,
            });
        }
        Ok(versions)
    }
}

fn parse_config_row(row: &Row<'_>) -> RepoResult<PartnerConfig> {
    let id_text: String = row.get("id")?;
    let partner_text: String = row.get("partner_id")?;
    let screen_ids_text: String = row.get("screen_ids")?;

    Ok(PartnerConfig {
        id: parse_uuid(&id_text, "partner_configs.id")?,
        partner_id: parse_uuid(&partner_text, "partner_configs.partner_id")?,
        version: row.get("version")?,
        global_config: decode_blob(row, "global_config")?,
        header_config: decode_blob(row, "header_config")?,
        footer_config: decode_blob(row, "footer_config")?,
        layout_config: decode_blob(row, "layout_config")?,
        screen_ids: decode_json(&screen_ids_text, "partner_configs.screen_ids")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn decode_blob(row: &Row<'_>, column: &'static str) -> RepoResult<Value> {
    let text: String = row.get(column)?;
    decode_json(&text, column)
}
