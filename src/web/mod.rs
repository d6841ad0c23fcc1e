//! Web server module.

mod handlers;

pub use handlers::*;

use crate::health::HealthEngine;

use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<HealthEngine>,
}

/// JSON API server.
pub struct Server {
    port: u16,
    state: AppState,
}

impl Server {
    pub fn new(engine: Arc<HealthEngine>) -> Self {
        Self {
            port: engine.config().http_port,
            state: AppState { engine },
        }
    }

    /// Build the router with all routes.
    pub fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            .route("/api/connectivity", get(handlers::handle_connectivity))
            .route("/api/health", get(handlers::handle_health_score))
            .route("/api/health/report", get(handlers::handle_health_report))
            .route("/api/stability", get(handlers::handle_stability))
            .route("/api/diagnosis", get(handlers::handle_diagnosis))
            .route("/api/history", get(handlers::handle_history))
            .route("/api/statistics", get(handlers::handle_statistics))
            .route("/api/samples", post(handlers::handle_log_sample))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` completes.
    pub async fn start<F>(
        &self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
