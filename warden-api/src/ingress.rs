//! Source-IP gate for webhook routes.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use warden_core::types::canonical_ip;

use crate::error::ApiError;
use crate::state::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Rejects requests whose source address is not in the trusted set.
pub async fn require_trusted_ip(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let Some(source) = client_ip(peer, req.headers(), state.config.forwarded_hops()) else {
        warn!("Webhook request without a resolvable source address");
        return Err(ApiError::forbidden("Source address unknown"));
    };

    let trusted = state.admin.trusted_ips().await;
    if !trusted.contains_addr(source) {
        warn!(ip = %source, "Rejected webhook from untrusted IP");
        return Err(ApiError::forbidden("Source IP is not trusted"));
    }

    debug!(ip = %source, "Webhook source trusted");
    Ok(next.run(req).await)
}

/// Resolves the caller address.
///
/// With `proxy_hops` trusted proxies in front, the caller is the
/// `proxy_hops`-th `X-Forwarded-For` entry counted from the right; entries
/// left of it are client-supplied. Falls back to the TCP peer when
/// `proxy_hops` is zero, the header is short, or that entry does not parse.
pub fn client_ip(peer: Option<IpAddr>, headers: &HeaderMap, proxy_hops: usize) -> Option<IpAddr> {
    let forwarded = (proxy_hops > 0)
        .then(|| headers.get(FORWARDED_FOR))
        .flatten()
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit(',').nth(proxy_hops - 1))
        .and_then(|hop| hop.trim().parse::<IpAddr>().ok());

    forwarded.or(peer).map(canonical_ip)
}
