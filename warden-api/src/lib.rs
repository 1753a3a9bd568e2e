//! # WARDEN API Server
//!
//! Admin API for the trusted-IP allowlist and the webhook ingress it guards.
//!
//! ## Endpoints
//!
//! - `GET /api/v1/trusted_ips` - List trusted IPs, newest first
//! - `POST /api/v1/trusted_ips` - Add or re-describe a trusted IP
//! - `GET|PUT|DELETE /api/v1/trusted_ips/:ip` - Read, edit, or remove one entry
//! - `GET /api/v1/cache` - Trusted-IP cache statistics
//! - `POST /api/v1/cache/invalidate` - Force the next webhook check to reload
//! - `POST /webhook/:source` - Webhook ingress, trusted source IPs only
//!
//! ## Example
//!
//! ```rust,ignore
//! use warden_api::{ApiConfig, AppState, WardenServer};
//!
//! let state = AppState::connect(ApiConfig::from_env()).await?;
//! WardenServer::new(state).run(([0, 0, 0, 0], 3001)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

mod admin;
mod dto;
mod error;
mod handlers;
mod ingress;
mod routes;
mod state;

pub use admin::AllowlistAdmin;
pub use error::ApiError;
pub use ingress::client_ip;
pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server for WARDEN.
pub struct WardenServer {
    state: Arc<AppState>,
}

impl WardenServer {
    /// Creates a new API server around prepared state.
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address.
    ///
    /// Peer addresses are recorded per connection for the webhook IP gate.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("WARDEN API server listening on {}", addr);

        axum::serve(
            listener,
            self.router().into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }
}
