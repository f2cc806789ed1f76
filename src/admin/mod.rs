//! Admin API.
//!
//! Read-only views of the running service for operators. Every route needs a
//! valid token carrying the global ADMIN role.

pub mod handlers;

use axum::{middleware, routing::get, Router};

use crate::auth::{authenticate, require_admin};
use crate::http::server::AppState;
use self::handlers::*;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/circuits", get(get_circuits))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.verifier.clone(), authenticate))
        .with_state(state)
}
