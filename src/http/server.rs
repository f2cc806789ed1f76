//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared application state (store, authorization, peer clients)
//! - Create the Axum router with public, authenticated and admin routes
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Run the propagation worker alongside the listener
//! - Stop both on the shutdown broadcast

use axum::{
    middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::auth::{authenticate, default_policy, AuthorizationService, TokenVerifier};
use crate::client::{GatewayError, PeerClients, PeerGateway, PeerPropagation, PropagationQueue, PropagationWorker};
use crate::config::ServiceConfig;
use crate::data::RecordStore;
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, request_span, set_request_id_layer};
use crate::lifecycle::Shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub authorization: AuthorizationService,
    pub gateway: Arc<PeerGateway>,
    pub peers: PeerClients,
    pub propagation: PropagationQueue,
    pub verifier: TokenVerifier,
    pub started_at: Instant,
}

/// HTTP server for the patient-records service.
pub struct HttpServer {
    router: Router,
    state: AppState,
    worker: PropagationWorker,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig, store: Arc<dyn RecordStore>) -> Result<Self, GatewayError> {
        let gateway = Arc::new(PeerGateway::from_config(&config.peers)?);
        let peers = PeerClients::new(gateway.clone());
        let (propagation, worker) = PropagationQueue::bounded(config.propagation.queue_capacity);

        let state = AppState {
            authorization: AuthorizationService::new(default_policy(), store.clone()),
            store,
            gateway,
            peers,
            propagation,
            verifier: TokenVerifier::new(&config.auth.jwt_secret, config.auth.leeway_secs),
            started_at: Instant::now(),
        };

        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            state,
            worker,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let api = Router::new()
            .route(
                "/api/v1/patients/{id}",
                get(handlers::get_patient).delete(handlers::delete_patient),
            )
            .route("/api/v1/patients/{id}/addresses", get(handlers::list_addresses))
            .route("/api/v1/patients/{id}/appointments", get(handlers::list_appointments))
            .route_layer(middleware::from_fn_with_state(state.verifier.clone(), authenticate))
            .with_state(state.clone());

        Router::new()
            .route("/health", get(handlers::health))
            .merge(api)
            .merge(admin::setup_admin_router(state))
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(propagate_request_id_layer())
                    .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs))),
            )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            peers = self.config.peers.len(),
            "HTTP server starting"
        );

        let handler: PeerPropagation = self.state.peers.propagation();
        let worker = tokio::spawn(self.worker.run(handler, shutdown.subscribe()));

        let mut stop = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        if let Err(e) = worker.await {
            tracing::error!(error = %e, "Propagation worker panicked");
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
