//! fisc Web Server
//!
//! Axum-based REST API for the fisc budget transparency service.
//!
//! Every route lives under `/api`. Apart from signup and login, all of
//! them require a session token (the `token` cookie set at login, or an
//! `Authorization: Bearer` header). Handlers resolve the ownership chain
//! of whatever node they touch before acting, so one user can never read
//! or mutate another user's hierarchy.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use fisc_core::ai::AiGateway;
use fisc_core::db::Database;

pub mod events;
mod handlers;

use events::EventHub;

/// Maximum file upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Name of the session cookie set at signup/login
pub const TOKEN_COOKIE: &str = "token";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Secret used to sign and verify session tokens
    pub jwt_secret: String,
    /// Whether session cookies carry the `Secure` flag (production)
    pub secure_cookies: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Read configuration from the environment.
    ///
    /// `FISC_JWT_SECRET` is required; `FISC_ENV=production` turns on the
    /// `Secure` cookie flag; `FISC_ALLOWED_ORIGINS` is a comma-separated
    /// list of origins allowed to make credentialed cross-origin requests.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("FISC_JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("FISC_JWT_SECRET is not set"))?;
        let secure_cookies =
            std::env::var("FISC_ENV").is_ok_and(|env| env.eq_ignore_ascii_case("production"));
        let allowed_origins = std::env::var("FISC_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            jwt_secret,
            secure_cookies,
            allowed_origins,
        })
    }

    /// Fixed-secret configuration for local development and tests.
    pub fn with_dev_secret() -> Self {
        Self {
            jwt_secret: "fisc-dev-secret".to_string(),
            secure_cookies: false,
            allowed_origins: vec![],
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// AI gateway, `None` when `FISC_AI_URL` is unset. Handlers fall back
    /// to the gateway's documented substitutes either way.
    pub ai: Option<AiGateway>,
    /// Live-event registry for WebSocket subscribers
    pub events: EventHub,
}

/// Authenticated user id, attached to request extensions by the auth
/// middleware and read by handlers.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

/// Authentication middleware for everything under `/api` except
/// signup/login. Accepts the session token from the `token` cookie or an
/// `Authorization: Bearer` header; missing or invalid tokens get a 401.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let cookie_token = jar.get(TOKEN_COOKIE).map(|c| c.value().to_string());
    let bearer_token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|t| t.to_string());

    let Some(token) = cookie_token.or(bearer_token) else {
        warn!(path = %request.uri().path(), "Unauthorized request - no session token");
        return unauthorized_response();
    };

    match fisc_core::auth::verify_token(&token, &state.config.jwt_secret) {
        Ok(user_id) => {
            request.extensions_mut().insert(AuthUser(user_id));
            next.run(request).await
        }
        Err(e) => {
            warn!(path = %request.uri().path(), error = %e, "Rejected session token");
            unauthorized_response()
        }
    }
}

fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Create the application router, composing state from the environment
/// where it is not passed explicitly.
pub fn create_router(db: Database, ai: Option<AiGateway>, config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        db,
        config,
        ai,
        events: EventHub::new(),
    });
    create_router_with_state(state)
}

/// Create the application router over pre-built state (used by tests to
/// keep a handle on the event hub).
pub fn create_router_with_state(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login));

    let protected_routes = Router::new()
        // Budgets
        .route(
            "/budgets",
            get(handlers::list_budgets).post(handlers::create_budget),
        )
        .route(
            "/budgets/:id",
            get(handlers::get_budget)
                .put(handlers::update_budget)
                .delete(handlers::delete_budget),
        )
        .route(
            "/budgets/:id/feedback",
            get(handlers::list_feedback).post(handlers::create_feedback),
        )
        // Departments
        .route(
            "/departments",
            get(handlers::list_departments).post(handlers::create_department),
        )
        .route(
            "/departments/:id",
            get(handlers::get_department)
                .put(handlers::update_department)
                .delete(handlers::delete_department),
        )
        // Projects
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/projects/:id",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
        // Vendors
        .route(
            "/vendors",
            get(handlers::list_vendors).post(handlers::create_vendor),
        )
        .route(
            "/vendors/:id",
            get(handlers::get_vendor)
                .put(handlers::update_vendor)
                .delete(handlers::delete_vendor),
        )
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(handlers::get_transaction)
                .put(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        // Bulk upload
        .route(
            "/uploads/budget-data",
            post(handlers::upload_budget_data).layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE)),
        )
        // AI gateway
        .route("/ai/budget-query", post(handlers::ai_budget_query))
        .route("/ai/analyze-transaction", post(handlers::ai_analyze_transaction))
        .route("/ai/health", get(handlers::ai_health))
        // Live events
        .route("/events", get(handlers::events_ws))
        // Dashboard aggregate
        .route("/dashboard", get(handlers::get_dashboard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let cors = build_cors(&state.config.allowed_origins);

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
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
}

fn build_cors(allowed_origins: &[String]) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    if allowed_origins.is_empty() {
        // Restrictive default: same-origin only
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true)
    }
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    let ai = AiGateway::from_env();
    match &ai {
        Some(gateway) => info!("AI gateway configured: {}", gateway.host()),
        None => info!("AI gateway not configured (set FISC_AI_URL to enable AI features)"),
    }

    let app = create_router(db, ai, config);
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

    pub fn forbidden(msg: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
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
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<fisc_core::Error> for AppError {
    fn from(err: fisc_core::Error) -> Self {
        use fisc_core::Error;
        match err {
            Error::Validation(msg) => Self::bad_request(&msg),
            Error::Auth(msg) => Self::unauthorized(&msg),
            Error::Forbidden(msg) => Self::forbidden(&msg),
            Error::NotFound(msg) => Self::not_found(&msg),
            // Import failures carry the cause so the uploader can fix the file.
            Error::Import(msg) => Self::internal(&msg),
            Error::Csv(e) => Self::bad_request(&format!("Malformed CSV file: {}", e)),
            Error::Spreadsheet(e) => Self::bad_request(&format!("Malformed workbook: {}", e)),
            other => {
                // Keep the detail in the log, return a generic message.
                error!(error = %other, "Internal error");
                Self::internal("An internal error occurred")
            }
        }
    }
}
