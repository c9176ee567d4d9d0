//! Seed documents: bulk partner setup through the core services.
//!
//! A seed document looks like:
//!
//! ```json
//! {"partners": [{"name": "acme", "categories": ["loans"],
//!                "config": {"global_config": {"primary_text_color": "#222"}},
//!                "screens": {"loans": [{"screen_config": {"heading": "Hi"}}]}}]}
//! ```
//!
//! Partners whose name is already taken (active or not) are skipped, so a
//! document can be applied more than once.

use crate::error::ServerError;
use log::{info, warn};
use partner_core::model::config::INITIAL_CONFIG_VERSION;
use partner_core::{
    ConfigService, ConfigUpdate, NewPartner, PartnerService, PartnerView, ScreenInput,
    ScreenService, ServiceResult,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SeedDocument {
    #[serde(default)]
    pub partners: Vec<SeedPartner>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SeedPartner {
    #[serde(flatten)]
    pub partner: NewPartner,
    /// Applied in place to the initial config version.
    #[serde(default)]
    pub config: Option<ConfigUpdate>,
    /// Screens per category name, in display order.
    #[serde(default)]
    pub screens: BTreeMap<String, Vec<ScreenInput>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
}

/// Reads and applies a seed document from disk.
pub fn apply_seed_file(conn: &Connection, path: &Path) -> Result<SeedReport, ServerError> {
    let text = std::fs::read_to_string(path)?;
    let document: SeedDocument = serde_json::from_str(&text)?;
    apply_seed(conn, &document)
}

/// Creates every partner of `document` whose name is not taken yet.
///
/// A partner whose setup fails part way is deleted again before the error
/// is returned, so a corrected document can be re-applied.
pub fn apply_seed(conn: &Connection, document: &SeedDocument) -> Result<SeedReport, ServerError> {
    let partners = PartnerService::new(conn);
    let mut report = SeedReport::default();

    for seed in &document.partners {
        let name = seed.partner.name.trim();
        if partners.name_taken(name)? {
            info!("event=seed_partner module=server status=skipped name={name}");
            report.skipped.push(name.to_string());
            continue;
        }

        let view = partners.create_partner(&seed.partner)?;
        if let Err(err) = populate(conn, seed, &view) {
            warn!("event=seed_partner module=server status=error name={name} error={err}");
            if let Err(cleanup) = partners.delete_partner(view.id) {
                warn!(
                    "event=seed_rollback module=server status=error partner_id={} error={cleanup}",
                    view.id
                );
            }
            return Err(err.into());
        }

        info!(
            "event=seed_partner module=server status=ok name={} categories={}",
            name,
            seed.screens.len()
        );
        report.created.push(name.to_string());
    }
    Ok(report)
}

fn populate(conn: &Connection, seed: &SeedPartner, view: &PartnerView) -> ServiceResult<()> {
    if let (Some(updates), Some(config)) = (&seed.config, &view.config) {
        ConfigService::new(conn).update_or_create_config(view.id, Some(config.id), updates, false)?;
    }
    for (category, screens) in &seed.screens {
        ScreenService::new(conn).save_screens(view.id, INITIAL_CONFIG_VERSION, category, screens)?;
    }
    Ok(())
}
