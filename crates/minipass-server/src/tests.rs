//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use minipass_core::db::Database;
use tower::ServiceExt;

fn open_test_app() -> (Database, Router) {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = create_router(db.clone(), None, config);
    (db, app)
}

fn setup_test_app() -> Router {
    open_test_app().1
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn create_test_activity(app: &Router) -> i64 {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/activities",
            serde_json::json!({"name": "Tuesday Hockey", "activity_type": "hockey"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    get_body_json(response).await["id"].as_i64().unwrap()
}

async fn create_test_passport(app: &Router, activity_id: i64) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/passports",
            serde_json::json!({
                "member_name": "Remi Methot",
                "member_email": "remi@example.com",
                "activity_id": activity_id,
                "sold_amt": 50.0,
                "uses_remaining": 4
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    get_body_json(response).await
}

// ========== Activity API ==========

#[tokio::test]
async fn test_activity_crud() {
    let app = setup_test_app();
    let id = create_test_activity(&app).await;

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/activities/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["name"], "Tuesday Hockey");
    assert_eq!(json["status"], "active");

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/activities/{}", id),
            serde_json::json!({"name": "Wednesday Hockey", "status": "archived"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/api/activities?status=archived"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_activity_not_found() {
    let app = setup_test_app();
    let response = app
        .oneshot(get_request("/api/activities/999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_activity_delete_with_passports_conflicts() {
    let app = setup_test_app();
    let activity_id = create_test_activity(&app).await;
    create_test_passport(&app, activity_id).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/activities/{}", activity_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ========== Passport API ==========

#[tokio::test]
async fn test_passport_create_and_mark_paid() {
    let app = setup_test_app();
    let activity_id = create_test_activity(&app).await;
    let passport = create_test_passport(&app, activity_id).await;

    assert_eq!(passport["paid"], false);
    assert_eq!(passport["uses_remaining"], 4);
    let pass_code = passport["pass_code"].as_str().unwrap();
    assert_eq!(pass_code.len(), 16);

    let id = passport["id"].as_i64().unwrap();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/passports/{}/mark-paid", id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["paid"], true);
    assert!(json["paid_date"].is_string());

    // Second mark-paid conflicts
    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/passports/{}/mark-paid", id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_pass_redeem_and_public_view() {
    let app = setup_test_app();
    let activity_id = create_test_activity(&app).await;
    let passport = create_test_passport(&app, activity_id).await;
    let pass_code = passport["pass_code"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/pass/{}/redeem", pass_code),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["uses_remaining"], 3);

    // Public view carries the QR
    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/pass/{}", pass_code)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["holder_name"], "Remi Methot");
    assert_eq!(json["uses_remaining"], 3);
    assert!(json["qr_svg"].as_str().unwrap().contains("svg"));

    // History shows the redemption
    let response = app
        .oneshot(get_request(&format!("/api/pass/{}/history", pass_code)))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["redemptions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_passport_list_filters() {
    let app = setup_test_app();
    let activity_id = create_test_activity(&app).await;
    create_test_passport(&app, activity_id).await;

    let response = app
        .clone()
        .oneshot(get_request("/api/passports?paid=false"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["member_name"], "Remi Methot");

    let response = app
        .oneshot(get_request("/api/passports?paid=true"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_passport_export_csv() {
    let app = setup_test_app();
    let activity_id = create_test_activity(&app).await;
    create_test_passport(&app, activity_id).await;

    let response = app
        .oneshot(get_request("/api/passports/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/csv"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.contains("Remi Methot"));
}

// ========== Signup API ==========

#[tokio::test]
async fn test_public_signup_and_approval() {
    let app = setup_test_app();
    let activity_id = create_test_activity(&app).await;

    // Public form data
    let response = app
        .clone()
        .oneshot(get_request(&format!(
            "/api/activities/{}/signup-info",
            activity_id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Public submission
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/activities/{}/signup", activity_id),
            serde_json::json!({
                "name": "Marie Tremblay",
                "email": "marie@example.com",
                "phone": "514-555-9999"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let signup = get_body_json(response).await;
    assert_eq!(signup["status"], "pending");
    let signup_id = signup["id"].as_i64().unwrap();

    // Approve issues a passport
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/signups/{}/approve", signup_id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let passport = get_body_json(response).await;
    assert!(passport["pass_code"].is_string());

    let response = app
        .oneshot(get_request(&format!("/api/signups/{}", signup_id)))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "approved");
    assert_eq!(json["passport_id"], passport["id"]);
}

#[tokio::test]
async fn test_signup_invalid_status_rejected() {
    let app = setup_test_app();
    let activity_id = create_test_activity(&app).await;
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/activities/{}/signup", activity_id),
            serde_json::json!({"name": "X Y", "email": "x@example.com"}),
        ))
        .await
        .unwrap();
    let signup_id = get_body_json(response).await["id"].as_i64().unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/signups/{}/status", signup_id),
            serde_json::json!({"status": "bogus"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Finance & reports ==========

#[tokio::test]
async fn test_income_expense_and_summary() {
    let app = setup_test_app();
    let activity_id = create_test_activity(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/activities/{}/incomes", activity_id),
            serde_json::json!({
                "date": "2026-01-05",
                "amount": 200.0,
                "description": "Sponsorship",
                "payment_status": "received"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/activities/{}/expenses", activity_id),
            serde_json::json!({
                "date": "2025-12-15",
                "amount": 300.0,
                "payment_status": "unpaid",
                "payment_date": "2026-02-15"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/api/reports/financial-summary"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rows = get_body_json(response).await;
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);

    // Unpaid expense lands in its payment month (month DESC ordering)
    assert_eq!(rows[0]["month"], "2026-02");
    assert_eq!(rows[0]["accounts_payable"], 300.0);
    assert_eq!(rows[1]["month"], "2026-01");
    assert_eq!(rows[1]["other_income"], 200.0);

    // Fiscal year filter
    let response = app
        .oneshot(get_request(
            "/api/reports/financial-summary?fiscal_year=2026",
        ))
        .await
        .unwrap();
    let rows = get_body_json(response).await;
    assert_eq!(rows.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_activity_kpis_endpoint() {
    let app = setup_test_app();
    let activity_id = create_test_activity(&app).await;
    let passport = create_test_passport(&app, activity_id).await;
    let id = passport["id"].as_i64().unwrap();
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/passports/{}/mark-paid", id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get_request(&format!(
            "/api/activities/{}/kpis?period=30",
            activity_id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["period_days"], 30);
    assert_eq!(json["revenue"]["total"], 50.0);
    assert_eq!(json["revenue"]["trend_data"].as_array().unwrap().len(), 30);

    // Unsupported period falls back to 7
    let response = app
        .oneshot(get_request(&format!(
            "/api/activities/{}/kpis?period=13",
            activity_id
        )))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["period_days"], 7);
}

#[tokio::test]
async fn test_dashboard() {
    let app = setup_test_app();
    let activity_id = create_test_activity(&app).await;
    create_test_passport(&app, activity_id).await;

    let response = app.oneshot(get_request("/api/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["totals"]["unpaid_count"], 1);
    assert_eq!(json["activities"].as_array().unwrap().len(), 1);
}

// ========== Surveys ==========

#[tokio::test]
async fn test_survey_flow() {
    let app = setup_test_app();
    let activity_id = create_test_activity(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/survey-templates",
            serde_json::json!({
                "name": "Season wrap-up",
                "questions": [
                    {"id": "overall", "text": "How was it?", "kind": "rating"}
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let template_id = get_body_json(response).await["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/surveys",
            serde_json::json!({
                "activity_id": activity_id,
                "template_id": template_id,
                "name": "Winter 2026"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let survey = get_body_json(response).await;
    let token = survey["survey_token"].as_str().unwrap().to_string();
    let survey_id = survey["id"].as_i64().unwrap();

    // Public view and submission
    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/survey/{}", token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/survey/{}/submit", token),
            serde_json::json!({"answers": {"overall": 5}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/surveys/{}/results", survey_id)))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["response_count"], 1);

    // Close, then submissions conflict
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/surveys/{}/close", survey_id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/survey/{}/submit", token),
            serde_json::json!({"answers": {"overall": 4}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ========== Settings & audit ==========

#[tokio::test]
async fn test_settings_secret_redaction() {
    let (db, app) = open_test_app();
    db.save_setting("MAIL_PASSWORD", "super-secret").unwrap();
    db.save_setting("MAIL_SERVER", "smtp.example.com").unwrap();

    let response = app
        .clone()
        .oneshot(get_request("/api/settings"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["MAIL_PASSWORD"], "********");
    assert_eq!(json["MAIL_SERVER"], "smtp.example.com");

    // Saving the redaction placeholder back must not clobber the secret
    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/settings",
            serde_json::json!({"MAIL_PASSWORD": "********", "MAIL_SERVER": "smtp2.example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(db.get_setting("MAIL_PASSWORD", "").unwrap(), "super-secret");
    assert_eq!(db.get_setting("MAIL_SERVER", "").unwrap(), "smtp2.example.com");
}

#[tokio::test]
async fn test_audit_log_records_mutations() {
    let app = setup_test_app();
    create_test_activity(&app).await;

    let response = app.oneshot(get_request("/api/audit")).await.unwrap();
    let json = get_body_json(response).await;
    let entries = json.as_array().unwrap();
    assert!(entries
        .iter()
        .any(|e| e["action"].as_str().unwrap().contains("Activity created")));
}

#[tokio::test]
async fn test_erase_requires_confirmation() {
    let app = setup_test_app();
    create_test_activity(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/erase-app-data",
            serde_json::json!({"confirm": "nope"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/erase-app-data",
            serde_json::json!({"confirm": "ERASE"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("/api/activities")).await.unwrap();
    let json = get_body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_backup_download() {
    let app = setup_test_app();
    create_test_activity(&app).await;

    let response = app.oneshot(get_request("/api/backup")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/gzip"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    // Gzip magic bytes
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
}

// ========== Auth ==========

#[tokio::test]
async fn test_auth_required_when_enabled() {
    let db = Database::in_memory().unwrap();
    let app = create_router(db, None, ServerConfig::default());

    let response = app
        .clone()
        .oneshot(get_request("/api/activities"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_flow() {
    let db = Database::in_memory().unwrap();
    db.create_admin("admin@example.com", "hunter2hunter2", Some("Admin"))
        .unwrap();
    let app = create_router(db, None, ServerConfig::default());

    // Bad credentials
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/login",
            serde_json::json!({"email": "admin@example.com", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Good credentials
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/login",
            serde_json::json!({"email": "admin@example.com", "password": "hunter2hunter2"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let token = json["token"].as_str().unwrap().to_string();
    assert_eq!(json["admin"]["email"], "admin@example.com");

    // The token opens the admin surface
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/activities")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Logout invalidates it
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/logout")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/activities")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_key_auth() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true,
        api_keys: vec!["test-api-key-123".to_string()],
        ..Default::default()
    };
    let app = create_router(db, None, config);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/activities")
                .header("authorization", "Bearer test-api-key-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/activities")
                .header("authorization", "Bearer wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_routes_skip_auth() {
    let db = Database::in_memory().unwrap();
    let app = create_router(db, None, ServerConfig::default());

    // Unknown pass code: 404, not 401 - the route itself is public
    let response = app
        .clone()
        .oneshot(get_request("/api/pass/UNKNOWNCODE12345"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(get_request("/api/survey/unknown-token"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
