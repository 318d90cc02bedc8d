//! API request handlers, organized by domain

mod activities;
mod auth;
mod chat;
mod dashboard;
mod finance;
mod passports;
mod payments;
mod settings;
mod signups;
mod surveys;

pub use activities::*;
pub use auth::*;
pub use chat::*;
pub use dashboard::*;
pub use finance::*;
pub use passports::*;
pub use payments::*;
pub use settings::*;
pub use signups::*;
pub use surveys::*;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::AppState;

/// The admin API surface (everything behind the auth middleware)
pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Auth
        .route("/logout", post(logout))
        .route("/me", get(me))
        // Dashboard
        .route("/dashboard", get(get_dashboard))
        .route("/kpis", get(get_global_kpis))
        // Activities
        .route("/activities", get(list_activities).post(create_activity))
        .route(
            "/activities/:id",
            get(get_activity).put(update_activity).delete(delete_activity),
        )
        .route("/activities/:id/kpis", get(get_activity_kpis))
        // Passport types
        .route(
            "/activities/:id/passport-types",
            get(list_passport_types).post(create_passport_type),
        )
        .route(
            "/passport-types/:id",
            get(get_passport_type)
                .put(update_passport_type)
                .delete(delete_passport_type),
        )
        .route(
            "/passport-types/:id/dependencies",
            get(get_passport_type_dependencies),
        )
        .route("/passport-types/:id/archive", post(archive_passport_type))
        // Passports
        .route("/passports", get(list_passports).post(create_passport))
        .route("/passports/export", get(export_passports))
        .route("/passports/:id", get(get_passport).put(update_passport))
        .route("/passports/:id/mark-paid", post(mark_passport_paid))
        .route("/pass/:code/redeem", post(redeem_pass))
        .route("/pass/:code/history", get(get_pass_history))
        // Signups
        .route("/signups", get(list_signups))
        .route("/signups/export", get(export_signups))
        .route("/signups/:id", get(get_signup))
        .route("/signups/:id/status", post(update_signup_status))
        .route("/signups/:id/mark-paid", post(mark_signup_paid))
        .route("/signups/:id/approve", post(approve_signup))
        // Income / expenses
        .route(
            "/activities/:id/incomes",
            get(list_incomes).post(create_income),
        )
        .route("/incomes/:id", put(update_income).delete(delete_income))
        .route(
            "/activities/:id/expenses",
            get(list_expenses).post(create_expense),
        )
        .route("/expenses/:id", put(update_expense).delete(delete_expense))
        // Reports
        .route("/reports/financial-summary", get(get_financial_summary))
        // Payment bot & email
        .route("/payment-bot/run", post(run_payment_bot))
        .route("/payment-bot/logs", get(get_payment_bot_logs))
        .route(
            "/payment-bot/settings",
            get(get_payment_bot_settings).put(update_payment_bot_settings),
        )
        .route("/email/test", post(send_test_email))
        .route("/email/retry-failed", post(retry_failed_emails))
        .route("/email/log", get(get_email_log))
        .route("/reminders/run", post(run_reminders))
        // Surveys
        .route(
            "/survey-templates",
            get(list_survey_templates).post(create_survey_template),
        )
        .route(
            "/survey-templates/:id",
            get(get_survey_template)
                .put(update_survey_template)
                .delete(delete_survey_template),
        )
        .route("/surveys", get(list_surveys).post(create_survey))
        .route("/surveys/:id", delete(delete_survey))
        .route("/surveys/:id/results", get(get_survey_results))
        .route("/surveys/:id/close", post(close_survey))
        .route("/surveys/:id/reopen", post(reopen_survey))
        .route("/surveys/:id/invite", post(send_survey_invitations))
        // Chat
        .route("/chat/ask", post(chat_ask))
        .route("/chat/history", get(get_chat_history))
        // Settings, audit, backup
        .route("/settings", get(list_settings).put(save_settings))
        .route("/audit", get(get_audit_log))
        .route("/backup", get(download_backup))
        .route("/erase-app-data", post(erase_app_data))
}
