//! Health and status endpoints for Kubernetes-style probes.
//!
//! - `/` - Service info and endpoint list
//! - `/livez` - Basic liveness probe (immediate 200, no checks)
//! - `/healthz` - Pings the document store and the cache
//! - `/status` - Service name, version and uptime
//! - `/metrics` - User counts, request counters and uptime

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use coderoot_core::cache::CacheError;
use coderoot_core::user::UserStats;

use super::AppError;
use crate::state::AppState;

const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overall health derived from the two backend probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// The cache is down; requests are still served from the store.
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// The store decides availability; the cache only degrades it.
    pub fn from_probes(store_ok: bool, cache_ok: bool) -> Self {
        match (store_ok, cache_ok) {
            (true, true) => HealthStatus::Healthy,
            (true, false) => HealthStatus::Degraded,
            (false, _) => HealthStatus::Unhealthy,
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub store: ProbeResult,
    pub cache: ProbeResult,
}

#[derive(Debug, Serialize)]
pub struct ProbeResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<E: std::fmt::Display> From<Result<(), E>> for ProbeResult {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                ok: true,
                error: None,
            },
            Err(err) => Self {
                ok: false,
                error: Some(err.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct Metrics {
    pub uptime_seconds: u64,
    /// Requests served since startup, this one included.
    pub requests: u64,
    /// Responses with a 5xx status since startup.
    pub errors: u64,
    pub users: UserStats,
}

/// GET / - Service info.
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "endpoints": ["/livez", "/healthz", "/status", "/metrics", "/api/users"],
    }))
}

/// GET /livez - Basic liveness probe.
///
/// Returns 200 immediately. Used to check if the server is accepting connections.
#[axum::debug_handler]
pub async fn livez() -> StatusCode {
    StatusCode::OK
}

/// GET /healthz - Backend probes.
///
/// 200 `healthy` when both backends answer, 200 `degraded` when only the cache
/// fails, 503 `unhealthy` when the store fails.
#[axum::debug_handler]
pub async fn healthz(State(state): State<AppState>) -> Response {
    let store: ProbeResult = state.scoped(state.store.ping()).await.into();

    let cache_timeout = state.config.cache_timeout();
    let cache: ProbeResult = tokio::time::timeout(cache_timeout, state.cache.ping())
        .await
        .unwrap_or(Err(CacheError::Timeout(cache_timeout)))
        .into();

    let status = HealthStatus::from_probes(store.ok, cache.ok);
    if status != HealthStatus::Healthy {
        tracing::warn!(
            ?status,
            store_error = store.error.as_deref(),
            cache_error = cache.error.as_deref(),
            "Health check failed"
        );
    }

    (
        status.status_code(),
        Json(HealthReport {
            status,
            store,
            cache,
        }),
    )
        .into_response()
}

/// GET /status - Service name, version and uptime.
#[axum::debug_handler]
pub async fn status(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(ServiceStatus {
        service: SERVICE_NAME,
        version: SERVICE_VERSION,
        status: "running",
        uptime_seconds: state.uptime().as_secs(),
    })
}

/// GET /metrics - User counts, request counters and uptime.
#[axum::debug_handler]
pub async fn metrics(State(state): State<AppState>) -> Result<Json<Metrics>, AppError> {
    let users = state.scoped(state.user_repo.get_user_stats()).await?;

    Ok(Json(Metrics {
        uptime_seconds: state.uptime().as_secs(),
        requests: state.counters.requests(),
        errors: state.counters.errors(),
        users,
    }))
}
