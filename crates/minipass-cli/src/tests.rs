//! CLI command tests
//!
//! Commands print to stdout; these tests assert on database effects.

use tempfile::TempDir;

use minipass_core::models::{NewActivity, NewSignup};
use minipass_core::{Database, PassportFilter};

use crate::commands;

fn temp_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let db = Database::new_unencrypted(path.to_str().unwrap()).unwrap();
    (dir, db)
}

fn make_activity(db: &Database) -> i64 {
    db.create_activity(
        &NewActivity {
            name: "Tuesday Hockey".to_string(),
            activity_type: None,
            description: None,
            start_date: None,
            end_date: None,
            status: None,
        },
        Some("cli"),
    )
    .unwrap()
}

#[test]
fn test_cmd_init_creates_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fresh.db");
    let path_str = path.to_str().unwrap();

    commands::cmd_init(path_str, true).unwrap();
    assert!(path.exists());

    // Re-opening works and the schema is in place
    let db = Database::new_unencrypted(path_str).unwrap();
    assert_eq!(db.count_admins().unwrap(), 0);
}

#[test]
fn test_cmd_admin_add_and_list() {
    let (_dir, db) = temp_db();

    commands::cmd_admin_add(&db, "admin@example.com", Some("Admin"), Some("hunter2hunter2"))
        .unwrap();
    assert_eq!(db.count_admins().unwrap(), 1);

    // Wrong duplicate fails
    assert!(
        commands::cmd_admin_add(&db, "admin@example.com", None, Some("hunter2hunter2")).is_err()
    );

    // Listing doesn't error
    commands::cmd_admin_list(&db).unwrap();

    // The created account can log in
    assert!(db
        .verify_admin_login("admin@example.com", "hunter2hunter2")
        .unwrap()
        .is_some());
}

#[test]
fn test_cmd_passports_create_and_mark_paid() {
    let (_dir, db) = temp_db();
    let activity_id = make_activity(&db);

    commands::cmd_passports_create(
        &db,
        "Remi Methot",
        "remi@example.com",
        activity_id,
        50.0,
        4,
        false,
    )
    .unwrap();

    let passports = db.list_passports(&PassportFilter::default()).unwrap();
    assert_eq!(passports.len(), 1);
    assert!(!passports[0].passport.paid);

    commands::cmd_passports_mark_paid(&db, passports[0].passport.id).unwrap();
    let passport = db.get_passport(passports[0].passport.id).unwrap();
    assert!(passport.paid);

    // Already-paid pass errors
    assert!(commands::cmd_passports_mark_paid(&db, passport.id).is_err());
}

#[test]
fn test_cmd_passports_redeem_and_show() {
    let (_dir, db) = temp_db();
    let activity_id = make_activity(&db);
    commands::cmd_passports_create(
        &db,
        "Remi Methot",
        "remi@example.com",
        activity_id,
        50.0,
        4,
        true,
    )
    .unwrap();

    let passports = db.list_passports(&PassportFilter::default()).unwrap();
    let code = passports[0].passport.pass_code.clone();

    commands::cmd_passports_redeem(&db, &code).unwrap();
    assert_eq!(db.get_passport_by_code(&code).unwrap().uses_remaining, 3);

    commands::cmd_passports_show(&db, &code).unwrap();
    assert!(commands::cmd_passports_show(&db, "MISSINGCODE00000").is_err());
}

#[test]
fn test_cmd_signups_approve() {
    let (_dir, db) = temp_db();
    let activity_id = make_activity(&db);
    let signup = db
        .create_signup(
            activity_id,
            &NewSignup {
                name: "Marie Tremblay".to_string(),
                email: "marie@example.com".to_string(),
                phone: None,
                passport_type_id: None,
                notes: None,
            },
        )
        .unwrap();

    commands::cmd_signups_list(&db, Some("pending"), 50).unwrap();
    commands::cmd_signups_approve(&db, signup.id).unwrap();

    let signup = db.get_signup(signup.id).unwrap();
    assert!(signup.passport_id.is_some());

    // Invalid status filter errors
    assert!(commands::cmd_signups_list(&db, Some("bogus"), 50).is_err());
}

#[test]
fn test_cmd_report_summary_runs() {
    let (_dir, db) = temp_db();
    let activity_id = make_activity(&db);
    commands::cmd_passports_create(
        &db,
        "Remi Methot",
        "remi@example.com",
        activity_id,
        50.0,
        4,
        true,
    )
    .unwrap();

    commands::cmd_report_summary(&db, None, None).unwrap();
    commands::cmd_report_summary(&db, Some(activity_id), Some(2026)).unwrap();
    commands::cmd_report_kpis(&db, activity_id, 7).unwrap();
    assert!(commands::cmd_report_kpis(&db, 999, 7).is_err());
}

#[test]
fn test_cmd_export_and_restore_roundtrip() {
    let (dir, db) = temp_db();
    let activity_id = make_activity(&db);
    commands::cmd_passports_create(
        &db,
        "Remi Methot",
        "remi@example.com",
        activity_id,
        50.0,
        4,
        false,
    )
    .unwrap();

    // CSV to file
    let csv_path = dir.path().join("passports.csv");
    commands::cmd_export_passports(&db, csv_path.to_str()).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv.contains("Remi Methot"));

    // Full backup then restore into a fresh database
    let backup_path = dir.path().join("backup.json.gz");
    commands::cmd_export_full(&db, backup_path.to_str().unwrap()).unwrap();

    let restored_path = dir.path().join("restored.db");
    commands::cmd_restore(
        restored_path.to_str().unwrap(),
        backup_path.to_str().unwrap(),
        false,
        true,
        true,
    )
    .unwrap();

    let restored = Database::new_unencrypted(restored_path.to_str().unwrap()).unwrap();
    let passports = restored.list_passports(&PassportFilter::default()).unwrap();
    assert_eq!(passports.len(), 1);
    assert_eq!(passports[0].member_name, "Remi Methot");
}

#[test]
fn test_cmd_restore_missing_file_errors() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("db.db");
    let result = commands::cmd_restore(
        db_path.to_str().unwrap(),
        "/nonexistent/backup.json.gz",
        false,
        true,
        true,
    );
    assert!(result.is_err());
}

#[test]
fn test_cmd_match_payments_without_mail_config_errors() {
    let (_dir, db) = temp_db();
    // Guard against ambient mail configuration leaking into the test
    if std::env::var("MAIL_USERNAME").is_ok() || std::env::var("MAIL_PASSWORD").is_ok() {
        return;
    }
    assert!(commands::cmd_match_payments(&db).is_err());
    assert!(commands::cmd_remind(&db).is_err());
}

#[test]
fn test_truncate_helper() {
    assert_eq!(commands::truncate("short", 10), "short");
    assert_eq!(commands::truncate("a very long activity name", 10), "a very ...");
}
