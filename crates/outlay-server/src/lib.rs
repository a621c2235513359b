//! Outlay Web Server
//!
//! Axum-based REST API for the Outlay purchase tracker.
//!
//! Security posture:
//! - Identity comes from the Cloudflare Access proxy in front of the server
//!   (JWT validated when a team and audience are configured, header
//!   fallback otherwise); `--no-auth` short-circuits to a local identity
//! - Restrictive CORS policy
//! - Upload validation (size and content-type limits)
//! - Audit logging for reads and writes
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use outlay_core::db::Database;
use outlay_core::import::ReceiptParser;

pub mod auth;
mod handlers;

pub use auth::{Identity, JwksCache};

/// Maximum multipart body for the import endpoint: a batch of
/// maximum-size receipt files plus form overhead
pub const MAX_IMPORT_BODY: usize = 32 * 1024 * 1024;

/// Maximum JSON request body (manual entry and save-all snapshots)
pub const MAX_JSON_BODY: usize = 1024 * 1024;

/// Cloudflare Access identity configuration
///
/// When both fields are set, the `Cf-Access-Jwt-Assertion` header is
/// validated against the team's public keys. Otherwise the
/// `Cf-Access-Authenticated-User-Email` header is trusted as-is, which is
/// safe only behind a Cloudflare Tunnel that strips inbound CF headers.
#[derive(Clone, Default)]
pub struct CfAccessConfig {
    /// Cloudflare team name (e.g. "myteam" for myteam.cloudflareaccess.com)
    pub team_name: Option<String>,
    /// Application audience tag (aud claim) from the Access application
    pub audience: Option<String>,
}

impl CfAccessConfig {
    /// Whether JWT validation is fully configured
    pub fn jwt_enabled(&self) -> bool {
        self.team_name.is_some() && self.audience.is_some()
    }
}

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether an identity is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Cloudflare Access identity configuration
    pub cf_access: CfAccessConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            cf_access: CfAccessConfig::default(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// Receipt parser collaborator; import returns 503 when absent
    pub parser: Option<Arc<dyn ReceiptParser>>,
    /// Cached Cloudflare Access public keys
    pub jwks: JwksCache,
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(
    db: Database,
    parser: Option<Arc<dyn ReceiptParser>>,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> Router {
    if parser.is_some() {
        info!("Receipt parser configured");
    } else {
        info!("ℹ️  Receipt parser not configured (import endpoint disabled)");
    }

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        parser,
        jwks: JwksCache::default(),
    });

    // Everything except the liveness probe requires an identity
    let identified = Router::new()
        .route("/me", get(handlers::get_me))
        .route(
            "/purchases",
            get(handlers::list_purchases)
                .post(handlers::create_purchase)
                .put(handlers::save_purchases),
        )
        .route("/purchases/:id", delete(handlers::delete_purchase))
        .route(
            "/import",
            post(handlers::import_files).layer(DefaultBodyLimit::max(MAX_IMPORT_BODY)),
        )
        .route("/dashboard", get(handlers::get_dashboard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::identity_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .merge(identified);

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
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
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
    };

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ));

    // Serve the bundled frontend if a directory is provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    db: Database,
    parser: Option<Arc<dyn ReceiptParser>>,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    serve_with_config(db, parser, host, port, static_dir, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    parser: Option<Arc<dyn ReceiptParser>>,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }

    let app = create_router(db, parser, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
