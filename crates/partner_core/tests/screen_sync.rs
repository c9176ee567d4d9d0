use partner_core::db::open_db_in_memory;
use partner_core::{
    ConfigService, ConfigUpdate, FieldInput, NewPartner, PartnerId, PartnerService,
    ScreenInput, ScreenService, ScreenWithFields, ServiceError,
};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn partner(conn: &Connection) -> PartnerId {
    PartnerService::new(conn)
        .create_partner(&NewPartner {
            name: "acme".to_string(),
            logo: None,
            categories: vec!["loans".to_string(), "cards".to_string()],
        })
        .unwrap()
        .id
}

fn screen(heading: &str, fields: Vec<FieldInput>) -> ScreenInput {
    ScreenInput {
        id: None,
        screen_config: Some(json!({"heading": heading})),
        fields: Some(fields),
    }
}

fn field(kind: &str, name: &str) -> FieldInput {
    FieldInput {
        id: None,
        kind: Some(kind.to_string()),
        field_config: Some(json!({"attributes": {"name": name}})),
    }
}

/// Turns saved screens back into inputs that reference the persisted ids.
fn resubmit(saved: &[ScreenWithFields]) -> Vec<ScreenInput> {
    saved
        .iter()
        .map(|item| ScreenInput {
            id: Some(item.screen.id),
            screen_config: Some(item.screen.screen_config.clone()),
            fields: Some(
                item.fields
                    .iter()
                    .map(|field| FieldInput {
                        id: Some(field.id),
                        kind: None,
                        field_config: Some(field.field_config.clone()),
                    })
                    .collect(),
            ),
        })
        .collect()
}

fn config_screen_ids(conn: &Connection) -> Vec<Uuid> {
    PartnerService::new(conn)
        .get_partner_by_name("acme", Some(1))
        .unwrap()
        .unwrap()
        .config
        .unwrap()
        .screen_ids
}

#[test]
fn save_creates_screens_and_fields_in_submitted_order() {
    let conn = open_db_in_memory().unwrap();
    let partner_id = partner(&conn);

    let saved = ScreenService::new(&conn)
        .save_screens(
            partner_id,
            1,
            "loans",
            &[
                screen("Identity", vec![field("text", "name"), field("ssn", "ssn")]),
                screen("Address", vec![field("text", "zip")]),
            ],
        )
        .unwrap();

    assert_eq!(saved.screens.len(), 2);
    assert_eq!(config_screen_ids(&conn), saved.screen_ids);
    let identity = &saved.screens[0];
    assert_eq!(identity.screen.category_name, "loans");
    assert_eq!(identity.fields.len(), 2);
    assert_eq!(identity.fields[1].kind, "ssn");
    assert_eq!(
        identity.fields[0].field_config,
        json!({"attributes": {"name": "name"}, "rules": []})
    );
    let field_ids: Vec<Uuid> = identity.fields.iter().map(|f| f.id).collect();
    assert_eq!(identity.screen.field_ids, field_ids);
}

#[test]
fn resave_updates_reorders_and_soft_deletes() {
    let conn = open_db_in_memory().unwrap();
    let partner_id = partner(&conn);
    let service = ScreenService::new(&conn);
    let first = service
        .save_screens(
            partner_id,
            1,
            "loans",
            &[
                screen("Identity", vec![field("text", "name"), field("text", "email")]),
                screen("Address", vec![field("text", "zip")]),
                screen("Income", vec![]),
            ],
        )
        .unwrap();

    let mut inputs = resubmit(&first.screens);
    let income = inputs.pop().unwrap();
    let address = inputs.pop().unwrap();
    let mut identity = inputs.pop().unwrap();
    identity.screen_config = Some(json!({"heading": "About you"}));
    let identity_fields = identity.fields.as_mut().unwrap();
    identity_fields.truncate(1);
    identity_fields.push(field("checkbox", "consent"));

    let second = service
        .save_screens(partner_id, 1, "loans", &[identity, income.clone()])
        .unwrap();

    assert_eq!(second.screen_ids[0], first.screen_ids[0]);
    assert_eq!(second.screen_ids[1], income.id.unwrap());
    assert_eq!(config_screen_ids(&conn), second.screen_ids);
    let about = &second.screens[0];
    assert_eq!(about.screen.screen_config, json!({"heading": "About you"}));
    let kinds: Vec<&str> = about.fields.iter().map(|f| f.kind.as_str()).collect();
    assert_eq!(kinds, vec!["text", "checkbox"]);

    let removed_screen = address.id.unwrap().to_string();
    assert_eq!(active_flag(&conn, "screens", &removed_screen), 0);
    let removed_field = first.screens[0].fields[1].id.to_string();
    assert_eq!(active_flag(&conn, "fields", &removed_field), 0);

    let listed = service.get_screens(partner_id).unwrap();
    assert_eq!(listed.len(), 2);
}

#[test]
fn save_preserves_other_categories_in_config_order() {
    let conn = open_db_in_memory().unwrap();
    let partner_id = partner(&conn);
    let service = ScreenService::new(&conn);

    let loans = service
        .save_screens(partner_id, 1, "loans", &[screen("Loan 1", vec![])])
        .unwrap();
    let cards = service
        .save_screens(partner_id, 1, "cards", &[screen("Card 1", vec![])])
        .unwrap();
    let loans_again = service
        .save_screens(
            partner_id,
            1,
            "loans",
            &[screen("Loan 0", vec![]), resubmit(&loans.screens).remove(0)],
        )
        .unwrap();

    let mut expected = loans_again.screen_ids.clone();
    expected.extend(cards.screen_ids);
    assert_eq!(config_screen_ids(&conn), expected);
}

#[test]
fn moving_a_field_between_screens_reparents_it() {
    let conn = open_db_in_memory().unwrap();
    let partner_id = partner(&conn);
    let service = ScreenService::new(&conn);
    let first = service
        .save_screens(
            partner_id,
            1,
            "loans",
            &[
                screen("One", vec![field("text", "name")]),
                screen("Two", vec![]),
            ],
        )
        .unwrap();

    let mut inputs = resubmit(&first.screens);
    let moved = inputs[0].fields.take().unwrap();
    inputs[1].fields = Some(moved);
    let second = service.save_screens(partner_id, 1, "loans", &inputs).unwrap();

    assert!(second.screens[0].fields.is_empty());
    assert_eq!(second.screens[1].fields.len(), 1);
    assert_eq!(second.screens[1].fields[0].id, first.screens[0].fields[0].id);
    assert_eq!(second.screens[1].fields[0].screen_id, second.screen_ids[1]);
}

#[test]
fn field_moved_from_another_category_leaves_its_old_screen() {
    let conn = open_db_in_memory().unwrap();
    let partner_id = partner(&conn);
    let service = ScreenService::new(&conn);
    let cards = service
        .save_screens(partner_id, 1, "cards", &[screen("Card", vec![field("text", "pan")])])
        .unwrap();
    let moved_id = cards.screens[0].fields[0].id;

    let loans = service
        .save_screens(
            partner_id,
            1,
            "loans",
            &[ScreenInput {
                fields: Some(vec![FieldInput {
                    id: Some(moved_id),
                    ..FieldInput::default()
                }]),
                ..screen("Loan", vec![])
            }],
        )
        .unwrap();
    assert_eq!(loans.screens[0].screen.field_ids, vec![moved_id]);

    let all = service.get_screens(partner_id).unwrap();
    let card = all
        .iter()
        .find(|item| item.screen.id == cards.screen_ids[0])
        .unwrap();
    assert!(card.screen.field_ids.is_empty());
    assert!(card.fields.is_empty());
}

#[test]
fn unknown_screen_id_rolls_back_the_whole_save() {
    let conn = open_db_in_memory().unwrap();
    let partner_id = partner(&conn);
    let service = ScreenService::new(&conn);
    let first = service
        .save_screens(partner_id, 1, "loans", &[screen("One", vec![])])
        .unwrap();

    let unknown = Uuid::new_v4();
    let err = service
        .save_screens(
            partner_id,
            1,
            "loans",
            &[
                screen("Fresh", vec![]),
                ScreenInput {
                    id: Some(unknown),
                    ..ScreenInput::default()
                },
            ],
        )
        .unwrap_err();

    assert!(matches!(err, ServiceError::ScreenNotFound(id) if id == unknown));
    assert_eq!(config_screen_ids(&conn), first.screen_ids);
    let screens: i64 = conn
        .query_row("SELECT COUNT(*) FROM screens;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(screens, 1);
}

#[test]
fn screen_of_another_category_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let partner_id = partner(&conn);
    let service = ScreenService::new(&conn);
    let cards = service
        .save_screens(partner_id, 1, "cards", &[screen("Card", vec![])])
        .unwrap();

    let err = service
        .save_screens(partner_id, 1, "loans", &resubmit(&cards.screens))
        .unwrap_err();
    assert!(matches!(err, ServiceError::ScreenNotFound(_)));
}

#[test]
fn new_field_without_type_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let partner_id = partner(&conn);

    let err = ScreenService::new(&conn)
        .save_screens(
            partner_id,
            1,
            "loans",
            &[screen("One", vec![FieldInput::default()])],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::MissingFieldType {
            screen_index: 0,
            field_index: 0
        }
    ));
}

#[test]
fn duplicate_screen_in_submission_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let partner_id = partner(&conn);
    let service = ScreenService::new(&conn);
    let first = service
        .save_screens(partner_id, 1, "loans", &[screen("One", vec![])])
        .unwrap();

    let mut inputs = resubmit(&first.screens);
    inputs.push(inputs[0].clone());
    let err = service.save_screens(partner_id, 1, "loans", &inputs).unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateScreen(_)));
}

#[test]
fn save_against_missing_version_fails() {
    let conn = open_db_in_memory().unwrap();
    let partner_id = partner(&conn);

    let err = ScreenService::new(&conn)
        .save_screens(partner_id, 4, "loans", &[])
        .unwrap_err();
    assert!(matches!(err, ServiceError::ConfigNotFound { version: 4, .. }));
}

#[test]
fn saving_into_old_version_leaves_new_version_untouched() {
    let conn = open_db_in_memory().unwrap();
    let partner_id = partner(&conn);
    let service = ScreenService::new(&conn);
    service
        .save_screens(partner_id, 1, "loans", &[screen("One", vec![])])
        .unwrap();
    ConfigService::new(&conn)
        .update_or_create_config(partner_id, None, &ConfigUpdate::default(), true)
        .unwrap();

    service.save_screens(partner_id, 1, "loans", &[]).unwrap();

    let latest = PartnerService::new(&conn)
        .get_partner_by_name("acme", None)
        .unwrap()
        .unwrap();
    assert_eq!(latest.config.unwrap().version, 2);
    assert_eq!(latest.screens.len(), 1);
    assert!(config_screen_ids(&conn).is_empty());
}

#[test]
fn delete_screen_hides_it_from_readers() {
    let conn = open_db_in_memory().unwrap();
    let partner_id = partner(&conn);
    let service = ScreenService::new(&conn);
    let saved = service
        .save_screens(
            partner_id,
            1,
            "loans",
            &[screen("One", vec![]), screen("Two", vec![])],
        )
        .unwrap();

    service.delete_screen(saved.screen_ids[0]).unwrap();
    service.delete_screen(saved.screen_ids[0]).unwrap();

    let view = PartnerService::new(&conn)
        .get_partner_by_name("acme", None)
        .unwrap()
        .unwrap();
    assert_eq!(view.screens.len(), 1);
    assert_eq!(view.screens[0].screen.id, saved.screen_ids[1]);
    let err = service.delete_screen(Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, ServiceError::ScreenNotFound(_)));
}

fn active_flag(conn: &Connection, table: &str, id: &str) -> i64 {
    conn.query_row(
        &format!("SELECT is_active FROM {table} WHERE id = ?1;"),
        [id],
        |row| row.get(0),
    )
    .unwrap()
}
