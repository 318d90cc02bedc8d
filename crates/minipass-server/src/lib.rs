//! Minipass Web Server
//!
//! Axum-based REST API for the Minipass activity pass manager.
//!
//! Security features:
//! - Admin login with Argon2id-hashed passwords and bearer session tokens
//! - API keys for internal service authentication (constant-time compared)
//! - Restrictive CORS policy and security headers
//! - Full audit logging for admin mutations
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{info, warn};

use minipass_core::ai::AiClient;
use minipass_core::db::Database;
use minipass_core::mailer::Mailer;

mod handlers;
mod scheduler;

pub use scheduler::{start_payment_bot_scheduler, start_reminder_scheduler, SchedulerConfig};

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Authorization header for bearer tokens
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
    /// API keys for internal service authentication (alternative to admin login)
    /// Format: "Bearer <key>" in Authorization header
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// AI backend for the analytics chatbot
    pub ai: Option<AiClient>,
}

impl AppState {
    /// Build a mailer on demand so settings edits take effect without restart
    pub fn mailer(&self) -> Option<Mailer> {
        match Mailer::from_settings(&self.db) {
            Ok(mailer) => mailer,
            Err(e) => {
                warn!("Mailer configuration error: {}", e);
                None
            }
        }
    }
}

/// Extract the bearer token from request headers
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validate an API key against the configured keys using constant-time
/// comparison to prevent timing attacks.
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    for key in valid_keys {
        let key_bytes = key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        if provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes)) {
            return true;
        }
    }
    false
}

/// Authentication middleware - validates admin session tokens or API keys
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    if let Some(token) = bearer_token(request.headers()) {
        // API keys first (constant-time), then session lookup
        if validate_api_key(token, &state.config.api_keys) {
            info!(user = "api-key", path = %request.uri().path(), "Authenticated via API key");
            return next.run(request).await;
        }

        match state.db.session_admin(token) {
            Ok(Some(admin)) => {
                info!(user = %admin.email, path = %request.uri().path(), "Authenticated via session");
                return next.run(request).await;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Session lookup failed: {}", e);
            }
        }
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Resolve the acting admin's email for audit logging
///
/// Returns the session admin's email, "api-key" for API key auth, or
/// "local-dev" when authentication is disabled.
pub fn get_admin_email(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(token) = bearer_token(headers) {
        if validate_api_key(token, &state.config.api_keys) {
            return "api-key".to_string();
        }
        if let Ok(Some(admin)) = state.db.session_admin(token) {
            return admin.email;
        }
    }
    "local-dev".to_string()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let ai = AiClient::from_env();
    match &ai {
        Some(client) => {
            info!(
                "AI backend configured: {} (model: {})",
                client.host(),
                client.model()
            );
        }
        None => {
            info!("AI backend not configured (set OLLAMA_HOST to enable the chatbot)");
        }
    }

    match Mailer::from_settings(&db) {
        Ok(Some(_)) => {}
        Ok(None) => {
            info!("Mail not configured (set MAIL_USERNAME/MAIL_PASSWORD to enable email)");
        }
        Err(e) => {
            warn!("Mailer configuration error: {}", e);
        }
    }

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        ai,
    });

    // Public surface: login, pass view, signup form, survey forms
    let public_routes = Router::new()
        .route("/login", axum::routing::post(handlers::login))
        .route("/pass/:code", axum::routing::get(handlers::get_pass_public))
        .route(
            "/activities/:id/signup",
            axum::routing::post(handlers::create_signup),
        )
        .route(
            "/activities/:id/signup-info",
            axum::routing::get(handlers::get_signup_info),
        )
        .route("/survey/:token", axum::routing::get(handlers::get_survey_public))
        .route(
            "/survey/:token/submit",
            axum::routing::post(handlers::submit_survey_response),
        );

    // Admin surface, gated by the auth middleware
    let admin_routes = handlers::admin_router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    let api_routes = public_routes.merge(admin_routes);

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    // Security headers
    // CSP: restrict scripts to same-origin, allow inline styles, allow data: for QR images
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    serve_with_config(db, host, port, static_dir, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }

    if db.count_admins()? == 0 {
        warn!("⚠️  No admin accounts exist; create one with `minipass admin add`");
    }

    // Check AI backend connection
    check_ai_connection().await;

    // Start background schedulers if configured
    if let Some(scheduler_config) = SchedulerConfig::from_env() {
        start_payment_bot_scheduler(db.clone(), scheduler_config.clone());
        start_reminder_scheduler(db.clone(), scheduler_config);
    }

    let app = create_router(db, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection() {
    use minipass_core::ai::AiBackend;

    match AiClient::from_env() {
        Some(client) => {
            if client.health_check().await {
                info!(
                    "✅ AI backend connected: {} (model: {})",
                    client.host(),
                    client.model()
                );
            } else {
                warn!(
                    "⚠️  AI backend configured but not responding: {} (model: {})",
                    client.host(),
                    client.model()
                );
            }
        }
        None => {
            info!("ℹ️  AI backend not configured (set OLLAMA_HOST to enable the chatbot)");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
        }
    }

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
        }
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.message, "Request failed");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<minipass_core::Error> for AppError {
    fn from(err: minipass_core::Error) -> Self {
        use minipass_core::Error;
        match &err {
            Error::NotFound(msg) => Self::not_found(msg),
            Error::Conflict(msg) => Self::conflict(msg),
            Error::InvalidData(msg) | Error::BlockedQuery(msg) => Self::bad_request(msg),
            Error::Chat(msg) => Self {
                status: StatusCode::BAD_GATEWAY,
                message: msg.clone(),
            },
            Error::Email(_) | Error::Inbox(_) => Self::service_unavailable(&err.to_string()),
            // Internal details are logged, not returned to the client
            _ => {
                tracing::error!(error = %err, "Internal error");
                Self::internal("An internal error occurred")
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!(error = %err, "JSON error");
        Self::internal("An internal error occurred")
    }
}

#[cfg(test)]
mod tests;
