use partner_core::db::open_db_in_memory;
use partner_core::{
    validate_pincode, NewPartner, PartnerService, PartnerValidationError, RepoError,
    ScreenInput, ScreenService, ServiceError, ServiceErrorKind,
};
use rusqlite::Connection;
use serde_json::json;

fn new_partner(name: &str, categories: &[&str]) -> NewPartner {
    NewPartner {
        name: name.to_string(),
        logo: Some(format!("https://cdn.example.com/{name}.png")),
        categories: categories.iter().map(|name| name.to_string()).collect(),
    }
}

#[test]
fn create_partner_seeds_version_one_and_categories() {
    let conn = open_db_in_memory().unwrap();
    let service = PartnerService::new(&conn);

    let view = service
        .create_partner(&new_partner("acme", &["loans", "cards"]))
        .unwrap();

    assert_eq!(view.name, "acme");
    assert!(view.is_active);
    let config = view.config.unwrap();
    assert_eq!(config.version, 1);
    assert!(config.screen_ids.is_empty());
    assert_eq!(config.global_config, json!({}));
    assert!(view.screens.is_empty());
    let names: Vec<_> = view.categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"loans") && names.contains(&"cards"));
}

#[test]
fn duplicate_partner_name_is_a_conflict() {
    let conn = open_db_in_memory().unwrap();
    let service = PartnerService::new(&conn);
    service.create_partner(&new_partner("acme", &[])).unwrap();

    let err = service.create_partner(&new_partner("acme", &[])).unwrap_err();
    assert_eq!(err.kind(), ServiceErrorKind::Conflict);
}

#[test]
fn blank_partner_name_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let err = PartnerService::new(&conn)
        .create_partner(&new_partner("   ", &[]))
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::Validation(PartnerValidationError::BlankName))
    ));
    assert_eq!(err.kind(), ServiceErrorKind::Validation);
}

#[test]
fn get_partner_by_name_hides_inactive_and_unknown_partners() {
    let conn = open_db_in_memory().unwrap();
    let service = PartnerService::new(&conn);
    let view = service.create_partner(&new_partner("acme", &[])).unwrap();

    assert!(service.get_partner_by_name("nobody", None).unwrap().is_none());
    assert!(service.get_partner_by_name("acme", None).unwrap().is_some());

    deactivate_partner(&conn, &view.id.to_string());
    assert!(service.get_partner_by_name("acme", None).unwrap().is_none());
}

#[test]
fn name_taken_sees_inactive_partners() {
    let conn = open_db_in_memory().unwrap();
    let service = PartnerService::new(&conn);
    let view = service.create_partner(&new_partner("acme", &[])).unwrap();
    deactivate_partner(&conn, &view.id.to_string());

    assert!(service.name_taken("acme").unwrap());
    assert!(service.name_taken(" acme ").unwrap());
    assert!(!service.name_taken("globex").unwrap());
}

#[test]
fn get_partner_by_unknown_version_has_no_config() {
    let conn = open_db_in_memory().unwrap();
    let service = PartnerService::new(&conn);
    service.create_partner(&new_partner("acme", &[])).unwrap();

    let view = service.get_partner_by_name("acme", Some(7)).unwrap().unwrap();
    assert!(view.config.is_none());
    assert!(view.screens.is_empty());
}

#[test]
fn delete_partner_cascades_to_owned_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = PartnerService::new(&conn);
    let view = service.create_partner(&new_partner("acme", &["loans"])).unwrap();
    ScreenService::new(&conn)
        .save_screens(
            view.id,
            1,
            "loans",
            &[ScreenInput {
                screen_config: Some(json!({"heading": "Welcome"})),
                ..ScreenInput::default()
            }],
        )
        .unwrap();

    service.delete_partner(view.id).unwrap();

    for table in ["partners", "categories", "partner_configs", "screens"] {
        assert_eq!(row_count(&conn, table), 0, "{table} should be empty");
    }
    let err = service.delete_partner(view.id).unwrap_err();
    assert!(matches!(err, ServiceError::PartnerIdNotFound(id) if id == view.id));
}

#[test]
fn update_category_status_reports_affected_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = PartnerService::new(&conn);
    let view = service.create_partner(&new_partner("acme", &["loans", "cards"])).unwrap();

    assert_eq!(service.update_category_status(view.id, "loans", false).unwrap(), 1);
    assert_eq!(service.update_category_status(view.id, "unknown", false).unwrap(), 0);

    let view = service.get_partner_by_name("acme", None).unwrap().unwrap();
    let loans = view.categories.iter().find(|c| c.name == "loans").unwrap();
    let cards = view.categories.iter().find(|c| c.name == "cards").unwrap();
    assert!(!loans.is_active);
    assert!(cards.is_active);
}

#[test]
fn list_configurations_requires_known_partner() {
    let conn = open_db_in_memory().unwrap();
    let service = PartnerService::new(&conn);
    service.create_partner(&new_partner("acme", &[])).unwrap();

    let versions = service.list_configurations("acme").unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version, 1);

    let err = service.list_configurations("nobody").unwrap_err();
    assert!(matches!(err, ServiceError::PartnerNotFound(name) if name == "nobody"));
}

#[test]
fn pincode_validation_checks_prefix() {
    assert!(validate_pincode("1000123"));
    assert!(!validate_pincode("0100012"));
}

fn deactivate_partner(conn: &Connection, id: &str) {
    conn.execute("UPDATE partners SET is_active = 0 WHERE id = ?1;", [id])
        .unwrap();
}

fn row_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .unwrap()
}
