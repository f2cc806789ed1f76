//! Patient records service library.
//!
//! Resilient calls to peer services (circuit breaker, retry, timeout,
//! fallback) and role/ownership/branch authorization over JWT claims.

pub mod admin;
pub mod auth;
pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
