//! Partner and category repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Partner names are unique; duplicates surface as `RepoError::Conflict`.
//! - Deleting a partner cascades to categories, configs, screens and fields.

use super::{bool_to_int, parse_bool, parse_uuid, RepoError, RepoResult, NOW_MS_SQL};
use crate::model::partner::{Category, Partner, PartnerId};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PARTNER_SELECT_SQL: &str = "SELECT
    id,
    name,
    logo,
    is_active,
    created_at,
    updated_at
FROM partners";

const CATEGORY_SELECT_SQL: &str = "SELECT
    id,
    partner_id,
    name,
    is_active,
    created_at,
    updated_at
FROM categories";

/// Repository interface for partners and their categories.
pub trait PartnerRepository {
    fn create_partner(&self, partner: &Partner) -> RepoResult<Partner>;
    fn get_partner(&self, id: PartnerId) -> RepoResult<Option<Partner>>;
    /// Looks a partner up by its unique name.
    fn find_partner_by_name(&self, name: &str, active_only: bool) -> RepoResult<Option<Partner>>;
    /// Hard-deletes one partner and everything it owns.
    fn delete_partner(&self, id: PartnerId) -> RepoResult<()>;
    fn create_category(&self, category: &Category) -> RepoResult<()>;
    fn list_categories(&self, partner_id: PartnerId) -> RepoResult<Vec<Category>>;
    /// Sets `is_active` on every category named `name`; returns affected rows.
    fn set_category_status(
        &self,
        partner_id: PartnerId,
        name: &str,
        is_active: bool,
    ) -> RepoResult<usize>;
}

/// SQLite-backed partner repository.
pub struct SqlitePartnerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePartnerRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PartnerRepository for SqlitePartnerRepository<'_> {
    fn create_partner(&self, partner: &Partner) -> RepoResult<Partner> {
        partner.validate()?;

        self.conn.execute(
            "INSERT INTO partners (id, name, logo, is_active)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                partner.id.to_string(),
                partner.name.trim(),
                partner.logo.as_deref(),
                bool_to_int(partner.is_active),
            ],
        )?;

        self.get_partner(partner.id)?
            .ok_or_else(|| RepoError::not_found("partner", partner.id))
    }

    fn get_partner(&self, id: PartnerId) -> RepoResult<Option<Partner>> {
        self.conn
            .query_row(
                &format!("{PARTNER_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_partner_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn find_partner_by_name(&self, name: &str, active_only: bool) -> RepoResult<Option<Partner>> {
        self.conn
            .query_row(
                &format!(
                    "{PARTNER_SELECT_SQL}
                     WHERE name = ?1
                       AND (?2 = 0 OR is_active = 1);"
                ),
                params![name, bool_to_int(active_only)],
                |row| Ok(parse_partner_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn delete_partner(&self, id: PartnerId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM partners WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("partner", id));
        }
        Ok(())
    }

    fn create_category(&self, category: &Category) -> RepoResult<()> {
        category.validate()?;

        self.conn.execute(
            "INSERT INTO categories (id, partner_id, name, is_active)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                category.id.to_string(),
                category.partner_id.to_string(),
                category.name.trim(),
                bool_to_int(category.is_active),
            ],
        )?;
        Ok(())
    }

    fn list_categories(&self, partner_id: PartnerId) -> RepoResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CATEGORY_SELECT_SQL}
             WHERE partner_id = ?1
             ORDER BY created_at ASC, name ASC;"
        ))?;
        let mut rows = stmt.query([partner_id.to_string()])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }

    fn set_category_status(
        &self,
        partner_id: PartnerId,
        name: &str,
        is_active: bool,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE categories
                 SET is_active = ?3,
                     updated_at = {NOW_MS_SQL}
                 WHERE partner_id = ?1
                   AND name = ?2;"
            ),
            params![partner_id.to_string(), name, bool_to_int(is_active)],
        )?;
        Ok(changed)
    }
}

fn parse_partner_row(row: &Row<'_>) -> RepoResult<Partner> {
    let id_text: String = row.get("id")?;
    Ok(Partner {
        id: parse_uuid(&id_text, "partners.id")?,
        name: row.get("name")?,
        logo: row.get("logo")?,
        is_active: parse_bool(row.get("is_active")?, "partners.is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    let id_text: String = row.get("id")?;
    let partner_text: String = row.get("partner_id")?;
    Ok(Category {
        id: parse_uuid(&id_text, "categories.id")?,
        partner_id: parse_uuid(&partner_text, "categories.partner_id")?,
        name: row.get("name")?,
        is_active: parse_bool(row.get("is_active")?, "categories.is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
