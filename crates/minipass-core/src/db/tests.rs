//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn test_db() -> Database {
        Database::in_memory().unwrap()
    }

    fn make_activity(db: &Database, name: &str) -> i64 {
        db.create_activity(
            &NewActivity {
                name: name.to_string(),
                activity_type: Some("hockey".to_string()),
                description: None,
                start_date: None,
                end_date: None,
                status: None,
            },
            Some("admin@example.com"),
        )
        .unwrap()
    }

    fn make_passport(db: &Database, activity_id: i64, name: &str, amount: f64) -> Passport {
        db.create_passport(
            &NewPassport {
                member_name: name.to_string(),
                member_email: format!(
                    "{}@example.com",
                    name.to_lowercase().replace(' ', ".")
                ),
                member_phone: None,
                activity_id,
                passport_type_id: None,
                sold_amt: amount,
                uses_remaining: 4,
                paid: false,
                notes: None,
            },
            Some("admin@example.com"),
        )
        .unwrap()
    }

    #[test]
    fn test_in_memory_db() {
        let db = test_db();
        let activities = db.list_activities(None).unwrap();
        assert!(activities.is_empty());
    }

    #[test]
    fn test_schema_tables_exist() {
        let db = test_db();
        let conn = db.conn().unwrap();

        for table in [
            "admins",
            "admin_sessions",
            "members",
            "activities",
            "passport_types",
            "passports",
            "redemptions",
            "signups",
            "incomes",
            "expenses",
            "ebank_payments",
            "reminder_logs",
            "email_logs",
            "settings",
            "audit_log",
            "survey_templates",
            "surveys",
            "survey_responses",
            "chat_queries",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table: {}", table);
        }

        let views: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'view' AND name = 'monthly_financial_summary'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(views, 1);
    }

    // ========== Activities & passport types ==========

    #[test]
    fn test_activity_crud() {
        let db = test_db();
        let id = make_activity(&db, "Tuesday Hockey");

        let activity = db.get_activity(id).unwrap();
        assert_eq!(activity.name, "Tuesday Hockey");
        assert_eq!(activity.status, ActivityStatus::Active);

        db.update_activity(
            id,
            &NewActivity {
                name: "Wednesday Hockey".to_string(),
                activity_type: None,
                description: Some("midweek".to_string()),
                start_date: None,
                end_date: None,
                status: Some(ActivityStatus::Archived),
            },
        )
        .unwrap();
        let activity = db.get_activity(id).unwrap();
        assert_eq!(activity.name, "Wednesday Hockey");
        assert_eq!(activity.status, ActivityStatus::Archived);

        db.delete_activity(id).unwrap();
        assert!(db.get_activity(id).is_err());
    }

    #[test]
    fn test_activity_delete_refused_with_passports() {
        let db = test_db();
        let id = make_activity(&db, "Tuesday Hockey");
        make_passport(&db, id, "Remi Methot", 50.0);

        let result = db.delete_activity(id);
        assert!(matches!(result, Err(crate::error::Error::Conflict(_))));
    }

    #[test]
    fn test_passport_type_set_null_on_delete() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        let type_id = db
            .create_passport_type(
                activity_id,
                &NewPassportType {
                    name: "4-pack".to_string(),
                    kind: PassportTypeKind::Permanent,
                    price_per_user: 50.0,
                    sessions_included: 4,
                    target_revenue: 1000.0,
                    payment_instructions: None,
                },
            )
            .unwrap();

        let passport = db
            .create_passport(
                &NewPassport {
                    member_name: "Remi Methot".to_string(),
                    member_email: "remi@example.com".to_string(),
                    member_phone: None,
                    activity_id,
                    passport_type_id: Some(type_id),
                    sold_amt: 50.0,
                    uses_remaining: 4,
                    paid: false,
                    notes: None,
                },
                None,
            )
            .unwrap();
        assert_eq!(passport.passport_type_id, Some(type_id));
        assert_eq!(passport.passport_type_name.as_deref(), Some("4-pack"));

        // Deleting the type must not orphan the passport
        db.delete_passport_type(type_id).unwrap();
        let passport = db.get_passport(passport.id).unwrap();
        assert_eq!(passport.passport_type_id, None);
        assert_eq!(passport.passport_type_name.as_deref(), Some("4-pack"));
    }

    #[test]
    fn test_passport_type_dependencies() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        let type_id = db
            .create_passport_type(
                activity_id,
                &NewPassportType {
                    name: "4-pack".to_string(),
                    kind: PassportTypeKind::Permanent,
                    price_per_user: 50.0,
                    sessions_included: 4,
                    target_revenue: 0.0,
                    payment_instructions: None,
                },
            )
            .unwrap();

        let deps = db.passport_type_dependencies(type_id).unwrap();
        assert_eq!(deps.passport_count, 0);
        assert_eq!(deps.signup_count, 0);

        db.create_passport(
            &NewPassport {
                member_name: "Remi Methot".to_string(),
                member_email: "remi@example.com".to_string(),
                member_phone: None,
                activity_id,
                passport_type_id: Some(type_id),
                sold_amt: 50.0,
                uses_remaining: 4,
                paid: false,
                notes: None,
            },
            None,
        )
        .unwrap();

        let deps = db.passport_type_dependencies(type_id).unwrap();
        assert_eq!(deps.passport_count, 1);
    }

    // ========== Passports ==========

    #[test]
    fn test_passport_lifecycle() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        let passport = make_passport(&db, activity_id, "Remi Methot", 50.0);

        assert_eq!(passport.pass_code.len(), 16);
        assert!(!passport.paid);
        assert_eq!(passport.uses_remaining, 4);

        // Mark paid
        let paid = db.mark_passport_paid(passport.id, "admin@example.com").unwrap();
        assert!(paid.paid);
        assert!(paid.paid_date.is_some());
        assert_eq!(paid.marked_paid_by.as_deref(), Some("admin@example.com"));

        // Second mark is a conflict
        assert!(matches!(
            db.mark_passport_paid(passport.id, "admin@example.com"),
            Err(crate::error::Error::Conflict(_))
        ));

        // Redeem decrements and records
        let redeemed = db.redeem_passport(&passport.pass_code, Some("door")).unwrap();
        assert_eq!(redeemed.uses_remaining, 3);
        let redemptions = db.list_redemptions(passport.id).unwrap();
        assert_eq!(redemptions.len(), 1);
        assert_eq!(redemptions[0].redeemed_by.as_deref(), Some("door"));
    }

    #[test]
    fn test_redeem_duplicate_scan_guard() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        let passport = make_passport(&db, activity_id, "Remi Methot", 50.0);

        db.redeem_passport(&passport.pass_code, None).unwrap();
        // Immediate second scan is rejected without decrementing
        let result = db.redeem_passport(&passport.pass_code, None);
        assert!(matches!(result, Err(crate::error::Error::Conflict(_))));
        assert_eq!(db.get_passport(passport.id).unwrap().uses_remaining, 3);
    }

    #[test]
    fn test_redeem_exhausted_pass() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        let passport = make_passport(&db, activity_id, "Remi Methot", 50.0);

        let conn = db.conn().unwrap();
        conn.execute(
            "UPDATE passports SET uses_remaining = 0 WHERE id = ?1",
            params![passport.id],
        )
        .unwrap();
        drop(conn);

        let result = db.redeem_passport(&passport.pass_code, None);
        assert!(matches!(result, Err(crate::error::Error::Conflict(_))));
    }

    #[test]
    fn test_passport_filters() {
        let db = test_db();
        let hockey = make_activity(&db, "Tuesday Hockey");
        let soccer = make_activity(&db, "Sunday Soccer");
        let p1 = make_passport(&db, hockey, "Remi Methot", 50.0);
        make_passport(&db, soccer, "Marie Tremblay", 60.0);
        db.mark_passport_paid(p1.id, "admin").unwrap();

        let all = db.list_passports(&PassportFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let hockey_only = db
            .list_passports(&PassportFilter {
                activity_id: Some(hockey),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(hockey_only.len(), 1);

        let unpaid = db
            .list_passports(&PassportFilter {
                paid: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(unpaid.len(), 1);
        assert_eq!(unpaid[0].member_name, "Marie Tremblay");

        let searched = db
            .list_passports(&PassportFilter {
                search: Some("remi".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(searched.len(), 1);
    }

    #[test]
    fn test_pass_history() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        let passport = make_passport(&db, activity_id, "Remi Methot", 50.0);
        db.redeem_passport(&passport.pass_code, Some("door")).unwrap();
        db.log_reminder(passport.id).unwrap();
        db.log_email(
            "remi@example.com",
            "Your pass",
            Some(&passport.pass_code),
            Some("pass_created"),
            None,
            EmailResult::Sent,
            None,
        )
        .unwrap();

        let history = db.get_pass_history(&passport.pass_code).unwrap();
        assert_eq!(history.member.name, "Remi Methot");
        assert_eq!(history.activity_name, "Tuesday Hockey");
        assert_eq!(history.redemptions.len(), 1);
        assert_eq!(history.reminders_sent, 1);
        assert_eq!(history.emails.len(), 1);
    }

    // ========== Signups ==========

    #[test]
    fn test_signup_approve_issues_passport() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        let type_id = db
            .create_passport_type(
                activity_id,
                &NewPassportType {
                    name: "4-pack".to_string(),
                    kind: PassportTypeKind::Permanent,
                    price_per_user: 80.0,
                    sessions_included: 8,
                    target_revenue: 0.0,
                    payment_instructions: None,
                },
            )
            .unwrap();

        let signup = db
            .create_signup(
                activity_id,
                &NewSignup {
                    name: "Remi Methot".to_string(),
                    email: "remi@example.com".to_string(),
                    phone: Some("514-555-1234".to_string()),
                    passport_type_id: Some(type_id),
                    notes: None,
                },
            )
            .unwrap();
        assert_eq!(signup.status, SignupStatus::Pending);
        assert!(signup.subject.contains("Tuesday Hockey"));
        assert!(signup.subject.contains("4-pack"));

        let passport = db.approve_signup(signup.id, Some("admin@example.com")).unwrap();
        // Defaults come from the passport type
        assert_eq!(passport.sold_amt, 80.0);
        assert_eq!(passport.uses_remaining, 8);

        let signup = db.get_signup(signup.id).unwrap();
        assert_eq!(signup.status, SignupStatus::Approved);
        assert_eq!(signup.passport_id, Some(passport.id));

        // A second approval is a conflict
        assert!(matches!(
            db.approve_signup(signup.id, None),
            Err(crate::error::Error::Conflict(_))
        ));
    }

    #[test]
    fn test_signup_filters() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        let s1 = db
            .create_signup(
                activity_id,
                &NewSignup {
                    name: "Remi Methot".to_string(),
                    email: "remi@example.com".to_string(),
                    phone: None,
                    passport_type_id: None,
                    notes: None,
                },
            )
            .unwrap();
        db.create_signup(
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
        db.update_signup_status(s1.id, SignupStatus::Rejected).unwrap();

        let pending = db
            .list_signups(&SignupFilter {
                status: Some(SignupStatus::Pending),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].member_name, "Marie Tremblay");
    }

    // ========== Admins & sessions ==========

    #[test]
    fn test_admin_login_flow() {
        let db = test_db();
        db.create_admin("admin@example.com", "hunter2hunter2", Some("Admin"))
            .unwrap();

        // Duplicate email conflicts
        assert!(matches!(
            db.create_admin("admin@example.com", "hunter2hunter2", None),
            Err(crate::error::Error::Conflict(_))
        ));

        // Wrong password
        assert!(db
            .verify_admin_login("admin@example.com", "wrong-password")
            .unwrap()
            .is_none());

        // Right password
        let admin = db
            .verify_admin_login("admin@example.com", "hunter2hunter2")
            .unwrap()
            .unwrap();
        assert_eq!(admin.email, "admin@example.com");

        // Session round trip
        let token = db.create_session(admin.id).unwrap();
        let resolved = db.session_admin(&token).unwrap().unwrap();
        assert_eq!(resolved.email, "admin@example.com");

        db.delete_session(&token).unwrap();
        assert!(db.session_admin(&token).unwrap().is_none());
    }

    #[test]
    fn test_admin_password_rules() {
        let db = test_db();
        assert!(db.create_admin("admin@example.com", "short", None).is_err());
        assert!(db.create_admin("not-an-email", "hunter2hunter2", None).is_err());
    }

    // ========== Settings ==========

    #[test]
    fn test_settings_roundtrip() {
        let db = test_db();
        assert_eq!(db.get_setting("MAIL_SERVER_X", "fallback").unwrap(), "fallback");

        db.save_setting("MAIL_SERVER_X", "smtp.example.com").unwrap();
        assert_eq!(
            db.get_setting("MAIL_SERVER_X", "fallback").unwrap(),
            "smtp.example.com"
        );

        db.save_setting("MAIL_SERVER_X", "").unwrap();
        assert_eq!(db.get_setting("MAIL_SERVER_X", "fallback").unwrap(), "fallback");

        db.save_setting("THRESHOLD_X", "90").unwrap();
        assert_eq!(db.get_setting_i64("THRESHOLD_X", 85).unwrap(), 90);
        assert_eq!(db.get_setting_i64("MISSING_X", 85).unwrap(), 85);
    }

    // ========== Finance & the monthly financial summary view ==========

    fn insert_paid_passport(db: &Database, activity_id: i64, amount: f64, paid_date: &str) {
        let member_id = db.insert_member("Payer", "payer@example.com", None).unwrap();
        let conn = db.conn().unwrap();
        conn.execute(
            "INSERT INTO passports (pass_code, member_id, activity_id, sold_amt, uses_remaining, paid, paid_date, created_at)
             VALUES (?1, ?2, ?3, ?4, 4, 1, ?5, ?5)",
            params![generate_pass_code(), member_id, activity_id, amount, paid_date],
        )
        .unwrap();
    }

    fn insert_unpaid_passport(db: &Database, activity_id: i64, amount: f64, created_at: &str) {
        let member_id = db.insert_member("Owing", "owing@example.com", None).unwrap();
        let conn = db.conn().unwrap();
        conn.execute(
            "INSERT INTO passports (pass_code, member_id, activity_id, sold_amt, uses_remaining, paid, created_at)
             VALUES (?1, ?2, ?3, ?4, 4, 0, ?5)",
            params![generate_pass_code(), member_id, activity_id, amount, created_at],
        )
        .unwrap();
    }

    #[test]
    fn test_summary_cash_and_ar_buckets() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");

        insert_paid_passport(&db, activity_id, 50.0, "2026-01-15 12:00:00");
        insert_paid_passport(&db, activity_id, 50.0, "2026-01-20 12:00:00");
        insert_unpaid_passport(&db, activity_id, 60.0, "2026-02-03 09:00:00");

        let rows = db.financial_summary(Some(activity_id), None).unwrap();
        assert_eq!(rows.len(), 2);

        // Ordered month DESC
        assert_eq!(rows[0].month, "2026-02");
        assert_eq!(rows[0].passport_ar, 60.0);
        assert_eq!(rows[0].accounts_receivable, 60.0);
        assert_eq!(rows[0].passport_sales, 0.0);

        assert_eq!(rows[1].month, "2026-01");
        assert_eq!(rows[1].passport_sales, 100.0);
        assert_eq!(rows[1].cash_received, 100.0);
        assert_eq!(rows[1].net_cash_flow, 100.0);
        assert_eq!(rows[1].accounts_receivable, 0.0);
    }

    #[test]
    fn test_summary_income_buckets() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");

        db.create_income(
            activity_id,
            &NewIncome {
                date: "2026-03-10".parse().unwrap(),
                amount: 200.0,
                description: Some("Sponsorship".to_string()),
                category: None,
                payment_status: IncomeStatus::Received,
            },
        )
        .unwrap();
        db.create_income(
            activity_id,
            &NewIncome {
                date: "2026-03-20".parse().unwrap(),
                amount: 75.0,
                description: None,
                category: None,
                payment_status: IncomeStatus::Pending,
            },
        )
        .unwrap();

        let rows = db.financial_summary(Some(activity_id), None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].month, "2026-03");
        assert_eq!(rows[0].other_income, 200.0);
        assert_eq!(rows[0].other_income_ar, 75.0);
        assert_eq!(rows[0].total_revenue, 275.0);
    }

    #[test]
    fn test_summary_unpaid_expense_effective_date_fallback() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");

        // Billed in December 2025, payment scheduled February 2026:
        // must appear in 2026-02 AP, not 2025-12
        db.create_expense(
            activity_id,
            &NewExpense {
                date: "2025-12-15".parse().unwrap(),
                amount: 300.0,
                description: Some("Ice rental".to_string()),
                category: None,
                payment_status: ExpenseStatus::Unpaid,
                due_date: Some("2026-01-31".parse().unwrap()),
                payment_date: Some("2026-02-15".parse().unwrap()),
            },
        )
        .unwrap();

        let rows = db.financial_summary(Some(activity_id), None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].month, "2026-02");
        assert_eq!(rows[0].accounts_payable, 300.0);
        assert_eq!(rows[0].net_income, -300.0);
    }

    #[test]
    fn test_summary_unpaid_expense_due_date_fallback() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");

        // No payment_date: due_date decides the month
        db.create_expense(
            activity_id,
            &NewExpense {
                date: "2025-12-15".parse().unwrap(),
                amount: 120.0,
                description: None,
                category: None,
                payment_status: ExpenseStatus::Unpaid,
                due_date: Some("2026-01-31".parse().unwrap()),
                payment_date: None,
            },
        )
        .unwrap();

        let rows = db.financial_summary(Some(activity_id), None).unwrap();
        assert_eq!(rows[0].month, "2026-01");
        assert_eq!(rows[0].accounts_payable, 120.0);
    }

    #[test]
    fn test_summary_unpaid_expense_bill_date_fallback() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");

        db.create_expense(
            activity_id,
            &NewExpense {
                date: "2025-12-15".parse().unwrap(),
                amount: 80.0,
                description: None,
                category: None,
                payment_status: ExpenseStatus::Unpaid,
                due_date: None,
                payment_date: None,
            },
        )
        .unwrap();

        let rows = db.financial_summary(Some(activity_id), None).unwrap();
        assert_eq!(rows[0].month, "2025-12");
        assert_eq!(rows[0].accounts_payable, 80.0);
    }

    #[test]
    fn test_summary_paid_expense_uses_bill_date() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");

        db.create_expense(
            activity_id,
            &NewExpense {
                date: "2026-01-10".parse().unwrap(),
                amount: 40.0,
                description: None,
                category: None,
                payment_status: ExpenseStatus::Paid,
                due_date: None,
                // payment_date is ignored for paid expenses
                payment_date: Some("2026-03-01".parse().unwrap()),
            },
        )
        .unwrap();

        let rows = db.financial_summary(Some(activity_id), None).unwrap();
        assert_eq!(rows[0].month, "2026-01");
        assert_eq!(rows[0].cash_paid, 40.0);
        assert_eq!(rows[0].net_cash_flow, -40.0);
    }

    #[test]
    fn test_summary_combines_sources_per_month() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");

        insert_paid_passport(&db, activity_id, 50.0, "2026-01-15 12:00:00");
        db.create_income(
            activity_id,
            &NewIncome {
                date: "2026-01-05".parse().unwrap(),
                amount: 100.0,
                description: None,
                category: None,
                payment_status: IncomeStatus::Received,
            },
        )
        .unwrap();
        db.create_expense(
            activity_id,
            &NewExpense {
                date: "2026-01-20".parse().unwrap(),
                amount: 30.0,
                description: None,
                category: None,
                payment_status: ExpenseStatus::Paid,
                due_date: None,
                payment_date: None,
            },
        )
        .unwrap();

        let rows = db.financial_summary(Some(activity_id), None).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.cash_received, 150.0);
        assert_eq!(row.cash_paid, 30.0);
        assert_eq!(row.net_cash_flow, 120.0);
        assert_eq!(row.total_revenue, 150.0);
        assert_eq!(row.total_expenses, 30.0);
        assert_eq!(row.net_income, 120.0);
    }

    #[test]
    fn test_summary_fiscal_year_filter() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");

        insert_paid_passport(&db, activity_id, 50.0, "2025-11-15 12:00:00");
        insert_paid_passport(&db, activity_id, 60.0, "2026-01-15 12:00:00");

        let rows = db.financial_summary(None, Some(2026)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].month, "2026-01");
    }

    #[test]
    fn test_summary_separates_activities() {
        let db = test_db();
        let hockey = make_activity(&db, "Tuesday Hockey");
        let soccer = make_activity(&db, "Sunday Soccer");

        insert_paid_passport(&db, hockey, 50.0, "2026-01-15 12:00:00");
        insert_paid_passport(&db, soccer, 70.0, "2026-01-16 12:00:00");

        let rows = db.financial_summary(None, None).unwrap();
        assert_eq!(rows.len(), 2);
        // Same month, ordered by activity name
        assert_eq!(rows[0].activity_name, "Sunday Soccer");
        assert_eq!(rows[0].passport_sales, 70.0);
        assert_eq!(rows[1].activity_name, "Tuesday Hockey");
        assert_eq!(rows[1].passport_sales, 50.0);
    }

    // ========== KPIs ==========

    #[test]
    fn test_activity_kpis_shape() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        let p = make_passport(&db, activity_id, "Remi Methot", 50.0);
        db.mark_passport_paid(p.id, "admin").unwrap();
        make_passport(&db, activity_id, "Marie Tremblay", 60.0);

        let kpis = db.activity_kpis(activity_id, 7).unwrap();
        assert_eq!(kpis.period_days, 7);
        assert_eq!(kpis.revenue.total, 50.0);
        assert_eq!(kpis.revenue.period_value, 50.0);
        assert_eq!(kpis.revenue.trend_data.len(), 7);
        // Paid today lands in the last trend bucket
        assert_eq!(*kpis.revenue.trend_data.last().unwrap(), 50.0);

        assert_eq!(kpis.active_passports.total, 1);
        assert_eq!(kpis.unpaid_passports.total, 1);
        assert_eq!(kpis.unpaid_passports.overdue, 0);
        assert_eq!(kpis.unpaid_passports.trend_data.len(), 7);

        // No income/expense rows: margin is pure passport profit
        assert_eq!(kpis.profit.total, 50.0);
        assert_eq!(kpis.profit.margin, 100.0);
    }

    #[test]
    fn test_activity_kpis_clamps_period() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        let kpis = db.activity_kpis(activity_id, 13).unwrap();
        assert_eq!(kpis.period_days, 7);
        let kpis = db.activity_kpis(activity_id, 90).unwrap();
        assert_eq!(kpis.period_days, 90);
        assert_eq!(kpis.revenue.trend_data.len(), 90);
    }

    #[test]
    fn test_activity_kpis_overdue_counts() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        insert_unpaid_passport(&db, activity_id, 50.0, "2026-01-01 12:00:00");

        let kpis = db.activity_kpis(activity_id, 7).unwrap();
        assert_eq!(kpis.unpaid_passports.total, 1);
        assert_eq!(kpis.unpaid_passports.overdue, 1);
    }

    #[test]
    fn test_activity_kpis_profit_margin() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        let p = make_passport(&db, activity_id, "Remi Methot", 100.0);
        db.mark_passport_paid(p.id, "admin").unwrap();
        db.create_expense(
            activity_id,
            &NewExpense {
                date: chrono::Utc::now().date_naive(),
                amount: 25.0,
                description: None,
                category: None,
                payment_status: ExpenseStatus::Paid,
                due_date: None,
                payment_date: None,
            },
        )
        .unwrap();

        let kpis = db.activity_kpis(activity_id, 7).unwrap();
        assert_eq!(kpis.profit.total, 75.0);
        assert_eq!(kpis.profit.margin, 75.0);
    }

    #[test]
    fn test_global_kpis() {
        let db = test_db();
        let hockey = make_activity(&db, "Tuesday Hockey");
        let p = make_passport(&db, hockey, "Remi Methot", 50.0);
        db.mark_passport_paid(p.id, "admin").unwrap();
        make_passport(&db, hockey, "Marie Tremblay", 60.0);

        let kpis = db.global_kpis().unwrap();
        assert_eq!(kpis.total_revenue, 50.0);
        assert_eq!(kpis.active_passport_count, 1);
        assert_eq!(kpis.unpaid_count, 1);
        assert_eq!(kpis.unpaid_amount, 60.0);
        assert_eq!(kpis.member_count, 2);
        assert_eq!(kpis.activity_count, 1);

        let summaries = db.activity_summaries().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].passport_count, 2);
        assert_eq!(summaries[0].unpaid_count, 1);
        assert_eq!(summaries[0].revenue, 50.0);
    }

    // ========== Payments log ==========

    #[test]
    fn test_ebank_payment_log() {
        let db = test_db();
        db.record_ebank_payment(&NewEbankPayment {
            from_email: Some("notify@payments.interac.ca"),
            subject: "Virement Interac : Remi Methot vous a envoyé 50,00 $",
            bank_name: "Remi Methot",
            bank_amount: 50.0,
            matched_passport_id: None,
            matched_name: None,
            matched_amount: None,
            name_score: 0,
            result: MatchResult::NoMatch,
            marked_paid: false,
            note: None,
        })
        .unwrap();

        let payments = db.list_ebank_payments(10).unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].result, MatchResult::NoMatch);

        assert!(!db
            .ebank_payment_seen("Virement Interac : Remi Methot vous a envoyé 50,00 $")
            .unwrap());

        db.record_ebank_payment(&NewEbankPayment {
            from_email: Some("notify@payments.interac.ca"),
            subject: "Virement Interac : Remi Methot vous a envoyé 50,00 $",
            bank_name: "Remi Methot",
            bank_amount: 50.0,
            matched_passport_id: None,
            matched_name: Some("Remi Methot"),
            matched_amount: Some(50.0),
            name_score: 100,
            result: MatchResult::Matched,
            marked_paid: true,
            note: None,
        })
        .unwrap();
        assert!(db
            .ebank_payment_seen("Virement Interac : Remi Methot vous a envoyé 50,00 $")
            .unwrap());
    }

    // ========== Surveys ==========

    fn sample_questions() -> Vec<SurveyQuestion> {
        vec![
            SurveyQuestion {
                id: "overall".to_string(),
                text: "How was the season?".to_string(),
                kind: "rating".to_string(),
                options: vec![],
            },
            SurveyQuestion {
                id: "comments".to_string(),
                text: "Anything else?".to_string(),
                kind: "text".to_string(),
                options: vec![],
            },
        ]
    }

    #[test]
    fn test_survey_flow() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        let template_id = db
            .create_survey_template("Season wrap-up", None, &sample_questions())
            .unwrap();
        let survey = db
            .create_survey(activity_id, template_id, "Winter 2026 wrap-up")
            .unwrap();
        assert_eq!(survey.status, SurveyStatus::Open);

        let mut answers = serde_json::Map::new();
        answers.insert("overall".to_string(), serde_json::json!(5));
        answers.insert("comments".to_string(), serde_json::json!("great season"));
        let response = db
            .submit_survey_response(&survey.survey_token, None, &answers)
            .unwrap();
        assert_eq!(response.survey_id, survey.id);

        // Unknown question ids are rejected
        let mut bad = serde_json::Map::new();
        bad.insert("bogus".to_string(), serde_json::json!(1));
        assert!(db
            .submit_survey_response(&survey.survey_token, None, &bad)
            .is_err());

        let results = db.get_survey_results(survey.id).unwrap();
        assert_eq!(results.response_count, 1);
        assert_eq!(results.template.questions.len(), 2);

        // Closed surveys reject responses
        db.close_survey(survey.id).unwrap();
        assert!(db
            .submit_survey_response(&survey.survey_token, None, &answers)
            .is_err());

        db.reopen_survey(survey.id).unwrap();
        assert!(db
            .submit_survey_response(&survey.survey_token, None, &answers)
            .is_ok());
    }

    #[test]
    fn test_survey_template_delete_guard() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        let template_id = db
            .create_survey_template("Season wrap-up", None, &sample_questions())
            .unwrap();
        db.create_survey(activity_id, template_id, "Wrap-up").unwrap();

        assert!(matches!(
            db.delete_survey_template(template_id),
            Err(crate::error::Error::Conflict(_))
        ));
    }

    // ========== Email log & reminders ==========

    #[test]
    fn test_failed_email_listing() {
        let db = test_db();
        db.log_email(
            "a@example.com",
            "s1",
            None,
            None,
            None,
            EmailResult::Sent,
            None,
        )
        .unwrap();
        db.log_email(
            "b@example.com",
            "s2",
            None,
            Some("pass_created"),
            None,
            EmailResult::Failed,
            Some("connection refused"),
        )
        .unwrap();

        let failed = db.list_failed_emails(10).unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].to_email, "b@example.com");
        assert_eq!(failed[0].error_message.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_overdue_and_reminder_log() {
        let db = test_db();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        insert_unpaid_passport(&db, activity_id, 50.0, "2026-01-01 12:00:00");

        let overdue = db.list_overdue_passports(3).unwrap();
        assert_eq!(overdue.len(), 1);

        let passport_id = overdue[0].passport.id;
        assert!(db.last_reminder_at(passport_id).unwrap().is_none());
        db.log_reminder(passport_id).unwrap();
        assert!(db.last_reminder_at(passport_id).unwrap().is_some());
    }

    // ========== Audit & erase ==========

    #[test]
    fn test_audit_log() {
        let db = test_db();
        db.log_audit("admin@example.com", "Passport created for Remi Methot")
            .unwrap();
        let entries = db.list_audit_log(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].admin_email, "admin@example.com");
    }

    #[test]
    fn test_erase_app_data_preserves_admins_and_settings() {
        let db = test_db();
        db.create_admin("admin@example.com", "hunter2hunter2", None).unwrap();
        db.save_setting("MAIL_SERVER", "smtp.example.com").unwrap();
        let activity_id = make_activity(&db, "Tuesday Hockey");
        make_passport(&db, activity_id, "Remi Methot", 50.0);

        db.erase_app_data().unwrap();

        assert_eq!(db.count_admins().unwrap(), 1);
        assert_eq!(
            db.get_setting("MAIL_SERVER", "").unwrap(),
            "smtp.example.com"
        );
        assert!(db.list_activities(None).unwrap().is_empty());
        assert!(db.list_passports(&PassportFilter::default()).unwrap().is_empty());
        assert_eq!(db.count_members().unwrap(), 0);
    }
}
