//! API route configuration.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers;
use crate::ingress::require_trusted_ip;
use crate::state::AppState;

/// Maximum accepted webhook body.
const WEBHOOK_BODY_LIMIT: usize = 1024 * 1024;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let webhooks = Router::new()
        .route("/webhook/:source", post(handlers::receive_webhook))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_trusted_ip))
        .layer(RequestBodyLimitLayer::new(WEBHOOK_BODY_LIMIT));

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Allowlist admin
        .route(
            "/api/v1/trusted_ips",
            get(handlers::list_trusted_ips).post(handlers::create_trusted_ip),
        )
        .route(
            "/api/v1/trusted_ips/:ip",
            get(handlers::get_trusted_ip)
                .put(handlers::update_trusted_ip)
                .delete(handlers::delete_trusted_ip),
        )

        // Cache
        .route("/api/v1/cache", get(handlers::cache_stats))
        .route("/api/v1/cache/invalidate", post(handlers::invalidate_cache))

        .merge(webhooks)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use warden_store::MemoryStore;

    use crate::state::ApiConfig;

    fn test_state(ips: &[&str]) -> (Arc<AppState>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_ips(ips.iter().copied()).unwrap());
        let state = Arc::new(AppState::new(ApiConfig::default(), store.clone()));
        (state, store)
    }

    fn proxied_app(ips: &[&str]) -> Router {
        let store = Arc::new(MemoryStore::with_ips(ips.iter().copied()).unwrap());
        let config = ApiConfig {
            trust_forwarded_for: true,
            ..ApiConfig::default()
        };
        create_router(Arc::new(AppState::new(config, store)))
    }

    fn webhook_via_proxy(proxy: &str, forwarded_for: &str) -> Request<Body> {
        let mut req = webhook_from(proxy);
        req.headers_mut()
            .insert("x-forwarded-for", forwarded_for.parse().unwrap());
        req
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn webhook_from(ip: &str) -> Request<Body> {
        let addr: SocketAddr = format!("{}:44321", ip).parse().unwrap();
        Request::builder()
            .method("POST")
            .uri("/webhook/trakteer")
            .header("content-type", "application/json")
            .extension(ConnectInfo(addr))
            .body(Body::from(r#"{"supporter_name":"anon","quantity":1}"#))
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (state, _) = test_state(&["1.2.3.4"]);
        let app = create_router(state);

        let response = send(&app, empty_request("GET", "/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["cache_state"], "cold");
    }

    #[tokio::test]
    async fn test_webhook_from_trusted_ip() {
        let (state, _) = test_state(&["1.2.3.4"]);
        let app = create_router(state);

        let response = send(&app, webhook_from("1.2.3.4")).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert_eq!(body["accepted"], true);
        assert_eq!(body["source"], "trakteer");
    }

    #[tokio::test]
    async fn test_webhook_from_untrusted_ip() {
        let (state, _) = test_state(&["1.2.3.4"]);
        let app = create_router(state);

        let response = send(&app, webhook_from("5.6.7.8")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_webhook_without_peer_is_rejected() {
        let (state, _) = test_state(&["1.2.3.4"]);
        let app = create_router(state);

        let req = json_request("POST", "/webhook/trakteer", json!({}));
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_forwarded_caller_behind_proxy_is_trusted() {
        let app = proxied_app(&["1.2.3.4"]);

        let response = send(&app, webhook_via_proxy("10.0.0.1", "1.2.3.4")).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_spoofed_leftmost_forwarded_hop_is_rejected() {
        let app = proxied_app(&["1.2.3.4"]);

        let response = send(&app, webhook_via_proxy("10.0.0.1", "1.2.3.4, 6.6.6.6")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_garbage_forwarded_for_from_untrusted_peer_is_rejected() {
        let app = proxied_app(&["1.2.3.4"]);

        let response = send(&app, webhook_via_proxy("10.0.0.1", "unknown")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_forwarded_for_ignored_unless_enabled() {
        let (state, _) = test_state(&["1.2.3.4"]);
        let app = create_router(state);

        let response = send(&app, webhook_via_proxy("10.0.0.1", "1.2.3.4")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_writes_take_effect_immediately() {
        let (state, _) = test_state(&["1.2.3.4"]);
        let app = create_router(state);

        // Warm the cache so a missing invalidation would serve stale data.
        assert_eq!(send(&app, webhook_from("5.6.7.8")).await.status(), StatusCode::FORBIDDEN);

        let create = json_request("POST", "/api/v1/trusted_ips", json!({"ip": "5.6.7.8", "description": "gateway"}));
        let response = send(&app, create).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["ip"], "5.6.7.8");

        assert_eq!(send(&app, webhook_from("5.6.7.8")).await.status(), StatusCode::ACCEPTED);

        let response = send(&app, empty_request("DELETE", "/api/v1/trusted_ips/5.6.7.8")).await;
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(send(&app, webhook_from("5.6.7.8")).await.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let (state, _) = test_state(&["1.2.3.4", "5.6.7.8"]);
        let app = create_router(state);

        let response = send(&app, empty_request("GET", "/api/v1/trusted_ips")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["total"], 2);

        let response = send(&app, empty_request("GET", "/api/v1/trusted_ips/1.2.3.4")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, empty_request("GET", "/api/v1/trusted_ips/9.9.9.9")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_description() {
        let (state, _) = test_state(&["1.2.3.4"]);
        let app = create_router(state);

        let req = json_request("PUT", "/api/v1/trusted_ips/1.2.3.4", json!({"description": "edited"}));
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["description"], "edited");

        let req = json_request("PUT", "/api/v1/trusted_ips/9.9.9.9", json!({"description": "x"}));
        assert_eq!(send(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_ip_is_bad_request() {
        let (state, _) = test_state(&[]);
        let app = create_router(state);

        let req = json_request("POST", "/api/v1/trusted_ips", json!({"ip": "not-an-ip"}));
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (state, _) = test_state(&[]);
        let app = create_router(state);

        let response = send(&app, empty_request("DELETE", "/api/v1/trusted_ips/1.2.3.4")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_outage_keeps_serving_previous_snapshot() {
        let (state, store) = test_state(&["1.2.3.4"]);
        let app = create_router(state);

        assert_eq!(send(&app, webhook_from("1.2.3.4")).await.status(), StatusCode::ACCEPTED);

        store.set_fail_reads(true);
        let response = send(&app, empty_request("POST", "/api/v1/cache/invalidate")).await;
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(send(&app, webhook_from("1.2.3.4")).await.status(), StatusCode::ACCEPTED);

        let response = send(&app, empty_request("GET", "/api/v1/cache")).await;
        let stats = body_json(response).await;
        assert_eq!(stats["state"], "degraded");
        assert_eq!(stats["reload_failures"], 1);
    }

    #[tokio::test]
    async fn test_cold_outage_uses_fallback() {
        let (state, store) = test_state(&["1.2.3.4"]);
        store.set_fail_reads(true);
        let app = create_router(state);

        assert_eq!(send(&app, webhook_from("100.64.0.9")).await.status(), StatusCode::ACCEPTED);
        assert_eq!(send(&app, webhook_from("1.2.3.4")).await.status(), StatusCode::FORBIDDEN);
    }
}
