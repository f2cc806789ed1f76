//! auth-service client.

use std::sync::Arc;
use uuid::Uuid;

use crate::client::executor::PeerRequest;
use crate::client::gateway::PeerGateway;
use crate::error::ServiceResult;
use crate::resilience::{with_fallback, FailLoudly};

pub const AUTH_SERVICE: &str = "auth-service";

#[derive(Clone)]
pub struct AuthServiceClient {
    gateway: Arc<PeerGateway>,
}

impl AuthServiceClient {
    pub fn new(gateway: Arc<PeerGateway>) -> Self {
        Self { gateway }
    }

    /// Disable the login of `user_id`. Fails with `UpstreamUnavailable` rather
    /// than pretending the account was deactivated.
    pub async fn deactivate_account(&self, user_id: Uuid, token: Option<&str>) -> ServiceResult<()> {
        let request = PeerRequest::post(
            format!("accounts/{}/deactivate", user_id),
            serde_json::json!({ "reason": "patient_deleted" }),
        )
        .with_bearer(token);
        let result = self.gateway.call(AUTH_SERVICE, "deactivate_account", request).await;
        with_fallback(AUTH_SERVICE, "deactivate_account", result, &FailLoudly)
    }
}
