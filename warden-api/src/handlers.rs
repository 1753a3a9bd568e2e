//! API route handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::info;

use warden_cache::CacheStats;

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

// ═══════════════════════════════════════════════════════════════════════════
// Allowlist admin
// ═══════════════════════════════════════════════════════════════════════════

/// GET /api/v1/trusted_ips
pub async fn list_trusted_ips(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListTrustedIpsResponse>> {
    let entries = state.admin.list().await?;
    let total = entries.len() as u64;

    Ok(Json(ListTrustedIpsResponse {
        items: entries.into_iter().map(TrustedIpDto::from).collect(),
        total,
    }))
}

/// POST /api/v1/trusted_ips
pub async fn create_trusted_ip(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTrustedIpRequest>,
) -> Result<(StatusCode, Json<TrustedIpDto>)> {
    let entry = state.admin.create(&req.ip, req.description).await?;
    Ok((StatusCode::CREATED, Json(TrustedIpDto::from(entry))))
}

/// GET /api/v1/trusted_ips/:ip
pub async fn get_trusted_ip(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
) -> Result<Json<TrustedIpDto>> {
    let entry = state.admin.get(&ip).await?;
    Ok(Json(TrustedIpDto::from(entry)))
}

/// PUT /api/v1/trusted_ips/:ip
pub async fn update_trusted_ip(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
    Json(req): Json<UpdateTrustedIpRequest>,
) -> Result<Json<TrustedIpDto>> {
    let entry = state.admin.update(&ip, req.description).await?;
    Ok(Json(TrustedIpDto::from(entry)))
}

/// DELETE /api/v1/trusted_ips/:ip
pub async fn delete_trusted_ip(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
) -> Result<Json<DeleteTrustedIpResponse>> {
    let ip = state.admin.delete(&ip).await?;
    Ok(Json(DeleteTrustedIpResponse { ip, deleted: true }))
}

// ═══════════════════════════════════════════════════════════════════════════
// Cache
// ═══════════════════════════════════════════════════════════════════════════

/// GET /api/v1/cache
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.admin.cache().stats())
}

/// POST /api/v1/cache/invalidate
pub async fn invalidate_cache(State(state): State<Arc<AppState>>) -> Json<InvalidateResponse> {
    let cache = state.admin.cache();
    cache.invalidate();
    info!("Trusted IP cache invalidated by admin");

    Json(InvalidateResponse {
        invalidated: true,
        state: cache.state(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Webhook ingress
// ═══════════════════════════════════════════════════════════════════════════

/// POST /webhook/:source
///
/// Only reached once the source IP passed the trusted-IP gate.
pub async fn receive_webhook(
    Path(source): Path<String>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<WebhookAck>) {
    let fields = payload.as_object().map(|o| o.len()).unwrap_or(0);
    info!(source = %source, fields, "Webhook accepted");

    (
        StatusCode::ACCEPTED,
        Json(WebhookAck {
            accepted: true,
            source,
        }),
    )
}

static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let start = START_TIME.get_or_init(Instant::now);
    let stats = state.admin.cache().stats();

    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: start.elapsed().as_secs(),
        cache_state: stats.state,
        trusted_ips: stats.entries,
    })
}
