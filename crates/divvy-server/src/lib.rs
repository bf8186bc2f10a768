//! Divvy Web Server
//!
//! Axum-based REST API for the divvy household budget planner.
//!
//! The server is a thin translation layer: handlers decode wire requests,
//! call into the workflow orchestrator or the store, and map core errors
//! onto HTTP status codes. Every apply and finalize lands in the audit log
//! attributed to the requesting user.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info};

use divvy_core::db::Database;
use divvy_core::workflow::Orchestrator;

mod handlers;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Identity header set by a fronting proxy; used for audit attribution only
const FORWARDED_USER_HEADER: &str = "x-forwarded-user";

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    /// Workflow orchestrator holding the per-month stage caches
    pub orchestrator: Orchestrator,
}

/// Extract the user identity from request headers (for audit logging)
///
/// Authentication itself is delegated to whatever sits in front of the
/// server; the proxy-supplied identity header is trusted for attribution
/// and nothing else. Falls back to "local-dev" when absent.
pub fn get_user_email(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(FORWARDED_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "local-dev".to_string())
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let orchestrator = Orchestrator::new(db.clone());

    let state = Arc::new(AppState { db, orchestrator });

    let api_routes = Router::new()
        // Health
        .route("/health", get(handlers::health))
        // Planning months and committed version history
        .route(
            "/months",
            get(handlers::list_months).post(handlers::create_month),
        )
        .route("/months/:id", get(handlers::get_month))
        .route("/months/:id/versions", get(handlers::list_month_versions))
        .route(
            "/months/:id/versions/latest",
            get(handlers::latest_month_version),
        )
        // Entity listings consumed by planning UIs
        .route("/goals", get(handlers::list_goals))
        .route("/debts", get(handlers::list_debts))
        .route("/categories", get(handlers::list_categories))
        .route("/constraints", get(handlers::list_constraints))
        // Decision-support workflow
        .route("/dss/:month_id/stages", get(handlers::get_stages))
        .route("/dss/:month_id/state", get(handlers::get_workflow_state))
        .route("/dss/score", post(handlers::auto_score))
        .route("/dss/prioritize", post(handlers::prioritize_goals))
        .route(
            "/dss/debt-strategy/preview",
            post(handlers::preview_debt_strategy),
        )
        .route(
            "/dss/debt-strategy/apply",
            post(handlers::apply_debt_strategy),
        )
        .route("/dss/tradeoff/preview", post(handlers::preview_tradeoff))
        .route("/dss/tradeoff/apply", post(handlers::apply_tradeoff))
        .route(
            "/dss/allocation/preview",
            post(handlers::preview_allocation),
        )
        .route("/dss/finalize", post(handlers::finalize_month))
        // Audit log
        .route("/audit", get(handlers::list_audit_log));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        // Allow specified origins
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16) -> anyhow::Result<()> {
    serve_with_config(db, host, port, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let app = create_router(db, config);
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

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
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

    /// Map a core error onto its HTTP status code
    ///
    /// NotFound, InvalidData, and Conflict carry messages that are safe to
    /// show to clients; everything else is logged and sanitized.
    pub fn from_core(err: divvy_core::Error) -> Self {
        match err {
            divvy_core::Error::NotFound(msg) => Self::not_found(&msg),
            divvy_core::Error::InvalidData(msg) => Self::bad_request(&msg),
            divvy_core::Error::Conflict(msg) => Self::conflict(&msg),
            other => other.into(),
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
