//! Data-access contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Kinds of records held by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Patient,
    PatientAllergy,
    PatientMedication,
    EmergencyContact,
    PatientInsurance,
    MedicalHistory,
    PatientAddress,
    Appointment,
}

impl ResourceType {
    pub const ALL: [ResourceType; 8] = [
        ResourceType::Patient,
        ResourceType::PatientAllergy,
        ResourceType::PatientMedication,
        ResourceType::EmergencyContact,
        ResourceType::PatientInsurance,
        ResourceType::MedicalHistory,
        ResourceType::PatientAddress,
        ResourceType::Appointment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Patient => "patient",
            ResourceType::PatientAllergy => "patient_allergy",
            ResourceType::PatientMedication => "patient_medication",
            ResourceType::EmergencyContact => "emergency_contact",
            ResourceType::PatientInsurance => "patient_insurance",
            ResourceType::MedicalHistory => "medical_history",
            ResourceType::PatientAddress => "patient_address",
            ResourceType::Appointment => "appointment",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who owns a record, resolved through its patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceOwnership {
    pub resource_type: ResourceType,
    pub resource_id: Uuid,
    pub patient_id: Uuid,
    pub owner_user_id: Uuid,
    pub branch_id: Option<Uuid>,
}

/// A stored patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: Uuid,
    /// Account in user-service this patient belongs to.
    pub user_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    /// ISO-8601 date.
    pub date_of_birth: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("{resource_type} {id} references unknown patient {patient_id}")]
    DanglingReference {
        resource_type: ResourceType,
        id: Uuid,
        patient_id: Uuid,
    },
}

/// Data access used by the authorization service and handlers.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Resolve the owner of a record. `Ok(None)` when the record does not exist.
    async fn find_owner_of(
        &self,
        resource_type: ResourceType,
        resource_id: Uuid,
    ) -> Result<Option<ResourceOwnership>, StoreError>;

    async fn find_patient(&self, id: Uuid) -> Result<Option<PatientRecord>, StoreError>;

    async fn save_patient(&self, record: PatientRecord) -> Result<(), StoreError>;

    /// Delete a patient and its child records. Returns whether it existed.
    async fn delete_patient(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Register a child record under a patient.
    async fn attach(
        &self,
        resource_type: ResourceType,
        resource_id: Uuid,
        patient_id: Uuid,
    ) -> Result<(), StoreError>;
}
