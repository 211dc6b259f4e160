//! Axum-based HTTP gateway with body limits and timeouts.
//!
//! Routes:
//! - `POST /register`, `POST /login` — credential flow, returns the userId
//! - `POST /save`, `GET /load/{user_id}` — per-user calculator document
//! - `GET /` — static landing page, `GET /health` — liveness probe
//!
//! CORS is wide open: the calculator client is a static page that may be
//! served from a different host entirely.

use crate::auth::AuthStore;
use crate::config::Config;
use crate::data::DataStore;
use crate::error::ApiError;
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB) — a calculator document is tiny
const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s) — prevents slow-loris abuse
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthStore>,
    pub data: Arc<DataStore>,
}

/// Run the HTTP gateway.
///
/// Opens both stores on the configured database (credential store first so
/// the `users` table exists before `student_data` declares its foreign key),
/// then serves until ctrl-c.
pub async fn run_gateway(host: &str, port: u16, config: &Config) -> Result<()> {
    if config.secret_key == crate::config::DEFAULT_SECRET_KEY {
        tracing::warn!("SECRET_KEY is the insecure default — override it in production");
    }

    let auth = Arc::new(AuthStore::open(&config.database_path)?);
    let data = Arc::new(DataStore::open(&config.database_path)?);
    tracing::info!("stores initialized at {}", config.database_path.display());

    let state = AppState { auth, data };

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/register", post(handle_register))
        .route("/login", post(handle_login))
        .route("/save", post(handle_save))
        .route("/load/{user_id}", get(handle_load))
        .with_state(state)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install ctrl-c handler: {e}");
        return;
    }
    tracing::info!("shutdown signal received");
}

// ══════════════════════════════════════════════════════════════════════════════
// AXUM HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// Fallback landing page. The real calculator client is a static bundle
/// deployed separately; this just confirms the backend is up.
const INDEX_HTML: &str = "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>CGPA Calculator</title></head>\n<body>\n<h1>CGPA Calculator backend</h1>\n<p>API endpoints: POST /register, POST /login, POST /save, GET /load/{userId}</p>\n</body>\n</html>\n";

/// GET / — static landing page.
async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /health — always public (no secrets leaked)
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let users = state.auth.user_count().unwrap_or(0);
    Json(serde_json::json!({
        "status": "ok",
        "users": users,
    }))
}

/// Request body for registration.
#[derive(Debug, Deserialize)]
struct RegisterBody {
    register_number: String,
    name: String,
    pin: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
struct LoginBody {
    register_number: String,
    pin: String,
}

/// Request body for saving calculator state. `data` is opaque JSON.
#[derive(Debug, Deserialize)]
struct SaveBody {
    #[serde(rename = "userId")]
    user_id: i64,
    data: serde_json::Value,
}

fn account_response(account: &crate::auth::Account) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "userId": account.id,
        "name": account.name,
        "register_number": account.register_number,
    }))
}

/// POST /register — create a new student account.
async fn handle_register(
    State(state): State<AppState>,
    body: Result<Json<RegisterBody>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::Validation(format!("Invalid request: {e}")))?;

    let account = state.auth.register(&body.register_number, &body.name, &body.pin)?;
    tracing::info!(
        user_id = account.id,
        register_number = %account.register_number,
        "new registration"
    );
    Ok(account_response(&account))
}

/// POST /login — verify credentials and return the userId.
async fn handle_login(
    State(state): State<AppState>,
    body: Result<Json<LoginBody>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::Validation(format!("Invalid request: {e}")))?;

    let account = state.auth.login(&body.register_number, &body.pin)?;
    tracing::debug!(user_id = account.id, "login ok");
    Ok(account_response(&account))
}

/// POST /save — upsert the caller's calculator document.
///
/// Known security gap: the userId is caller-supplied and nothing verifies
/// the caller actually authenticated as that user. Closing it requires
/// session-bound authorization, which is out of scope here.
async fn handle_save(
    State(state): State<AppState>,
    body: Result<Json<SaveBody>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::Validation(format!("Invalid request: {e}")))?;

    state.data.save(body.user_id, &body.data)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// GET /load/{user_id} — fetch the saved calculator document.
///
/// Same caller-supplied-userId gap as `/save`. An absent document is a
/// normal `success: false` response, not an error.
async fn handle_load(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let body = match state.data.load(user_id)? {
        Some(data) => serde_json::json!({ "success": true, "data": data }),
        None => serde_json::json!({ "success": false, "message": "No data found" }),
    };
    Ok((StatusCode::OK, Json(body)))
}

// ── Tests ───────────────────────────────────────────────────────────
