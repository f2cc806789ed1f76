//! schedule-service client.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::client::executor::PeerRequest;
use crate::client::gateway::PeerGateway;
use crate::error::ServiceResult;
use crate::resilience::{with_fallback, EmptyCollection, FailLoudly};

pub const SCHEDULE_SERVICE: &str = "schedule-service";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSummary {
    pub id: Uuid,
    pub patient_id: Uuid,
    #[serde(default)]
    pub doctor_id: Option<Uuid>,
    /// ISO-8601 timestamp.
    #[serde(default)]
    pub starts_at: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Clone)]
pub struct ScheduleServiceClient {
    gateway: Arc<PeerGateway>,
}

impl ScheduleServiceClient {
    pub fn new(gateway: Arc<PeerGateway>) -> Self {
        Self { gateway }
    }

    pub async fn list_appointments(
        &self,
        patient_id: Uuid,
        token: Option<&str>,
    ) -> ServiceResult<Vec<AppointmentSummary>> {
        let request = PeerRequest::get(format!("appointments/patient/{}", patient_id)).with_bearer(token);
        let result = self.gateway.call(SCHEDULE_SERVICE, "list_appointments", request).await;
        with_fallback(SCHEDULE_SERVICE, "list_appointments", result, &EmptyCollection)
    }

    pub async fn cancel_appointments_of(&self, patient_id: Uuid, token: Option<&str>) -> ServiceResult<()> {
        let request = PeerRequest::delete(format!("appointments/patient/{}", patient_id)).with_bearer(token);
        let result = self.gateway.call(SCHEDULE_SERVICE, "cancel_appointments_of", request).await;
        with_fallback(SCHEDULE_SERVICE, "cancel_appointments_of", result, &FailLoudly)
    }
}
