//! address-service client.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::client::executor::PeerRequest;
use crate::client::gateway::PeerGateway;
use crate::error::ServiceResult;
use crate::resilience::{with_fallback, EmptyCollection, FailLoudly};

pub const ADDRESS_SERVICE: &str = "address-service";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Clone)]
pub struct AddressServiceClient {
    gateway: Arc<PeerGateway>,
}

impl AddressServiceClient {
    pub fn new(gateway: Arc<PeerGateway>) -> Self {
        Self { gateway }
    }

    /// Addresses of `owner_id`; empty while address-service is unreachable.
    pub async fn list_addresses(&self, owner_id: Uuid, token: Option<&str>) -> ServiceResult<Vec<AddressSummary>> {
        let request = PeerRequest::get(format!("addresses/owner/{}", owner_id)).with_bearer(token);
        let result = self.gateway.call(ADDRESS_SERVICE, "list_addresses", request).await;
        with_fallback(ADDRESS_SERVICE, "list_addresses", result, &EmptyCollection)
    }

    pub async fn delete_addresses_of(&self, owner_id: Uuid, token: Option<&str>) -> ServiceResult<()> {
        let request = PeerRequest::delete(format!("addresses/owner/{}", owner_id)).with_bearer(token);
        let result = self.gateway.call(ADDRESS_SERVICE, "delete_addresses_of", request).await;
        with_fallback(ADDRESS_SERVICE, "delete_addresses_of", result, &FailLoudly)
    }
}
