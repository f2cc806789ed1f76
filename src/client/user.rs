//! user-service client.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::client::executor::PeerRequest;
use crate::client::gateway::PeerGateway;
use crate::error::ServiceResult;
use crate::resilience::{with_fallback, Sentinel};

pub const USER_SERVICE: &str = "user-service";

/// Account details owned by user-service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub active: bool,
    /// Set on placeholders produced while user-service is unreachable.
    #[serde(default)]
    pub degraded: bool,
}

impl UserSummary {
    /// Placeholder for a user whose details could not be fetched.
    pub fn unknown(id: Uuid) -> Self {
        Self {
            id,
            username: "unknown".to_string(),
            email: None,
            active: false,
            degraded: true,
        }
    }
}

#[derive(Clone)]
pub struct UserServiceClient {
    gateway: Arc<PeerGateway>,
}

impl UserServiceClient {
    pub fn new(gateway: Arc<PeerGateway>) -> Self {
        Self { gateway }
    }

    /// Never fails on peer trouble: falls back to [`UserSummary::unknown`].
    pub async fn get_user(&self, user_id: Uuid, token: Option<&str>) -> ServiceResult<UserSummary> {
        let request = PeerRequest::get(format!("users/{}", user_id)).with_bearer(token);
        let result = self.gateway.call(USER_SERVICE, "get_user", request).await;
        with_fallback(
            USER_SERVICE,
            "get_user",
            result,
            &Sentinel(|| UserSummary::unknown(user_id)),
        )
    }
}
