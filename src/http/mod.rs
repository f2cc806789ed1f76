//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, per-request span)
//!     → auth::authenticate (bearer token → subject)
//!     → handlers.rs (authorize, load, call peers)
//!     → response.rs ({status, code, message, data, errors} envelope)
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ApiEnvelope;
pub use server::{AppState, HttpServer};
