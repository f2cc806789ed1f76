//! Peer service clients.
//!
//! # Data Flow
//! ```text
//! typed client (user.rs, address.rs, schedule.rs, auth_service.rs)
//!     → gateway.rs (endpoint lookup, breaker + retry via resilience)
//!         → executor.rs (one HTTP request, deadline, envelope decoding)
//!     → resilience::with_fallback (operation-specific degraded result)
//!
//! local delete → propagation.rs (bounded queue) → worker → typed client writes
//! ```
//!
//! # Design Decisions
//! - Reads degrade (sentinel or empty list); writes fail loudly
//! - The caller's bearer token is forwarded to the peer
//! - Cross-service side effects go through an explicit queue, never detached futures

pub mod address;
pub mod auth_service;
pub mod endpoint;
pub mod executor;
pub mod gateway;
pub mod propagation;
pub mod schedule;
pub mod user;

use std::sync::Arc;

pub use address::{AddressServiceClient, AddressSummary, ADDRESS_SERVICE};
pub use auth_service::{AuthServiceClient, AUTH_SERVICE};
pub use endpoint::PeerServiceEndpoint;
pub use executor::{OutboundCallExecutor, PeerRequest};
pub use gateway::{GatewayError, PeerGateway};
pub use propagation::{PeerPropagation, PropagationHandler, PropagationJob, PropagationQueue, PropagationWorker};
pub use schedule::{AppointmentSummary, ScheduleServiceClient, SCHEDULE_SERVICE};
pub use user::{UserServiceClient, UserSummary, USER_SERVICE};

/// All typed peer clients, sharing one gateway.
#[derive(Clone)]
pub struct PeerClients {
    pub users: UserServiceClient,
    pub addresses: AddressServiceClient,
    pub schedule: ScheduleServiceClient,
    pub accounts: AuthServiceClient,
}

impl PeerClients {
    pub fn new(gateway: Arc<PeerGateway>) -> Self {
        Self {
            users: UserServiceClient::new(gateway.clone()),
            addresses: AddressServiceClient::new(gateway.clone()),
            schedule: ScheduleServiceClient::new(gateway.clone()),
            accounts: AuthServiceClient::new(gateway),
        }
    }

    /// Handler for the propagation worker.
    pub fn propagation(&self) -> PeerPropagation {
        PeerPropagation {
            addresses: self.addresses.clone(),
            schedule: self.schedule.clone(),
            accounts: self.accounts.clone(),
        }
    }
}
