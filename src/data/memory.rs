//! In-memory record store.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::data::store::{PatientRecord, RecordStore, ResourceOwnership, ResourceType, StoreError};

/// Thread-safe record store backed by `DashMap`.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    patients: DashMap<Uuid, PatientRecord>,
    /// (type, child id) → patient id
    children: DashMap<(ResourceType, Uuid), Uuid>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patient_count(&self) -> usize {
        self.patients.len()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_owner_of(
        &self,
        resource_type: ResourceType,
        resource_id: Uuid,
    ) -> Result<Option<ResourceOwnership>, StoreError> {
        let patient_id = if resource_type == ResourceType::Patient {
            resource_id
        } else {
            match self.children.get(&(resource_type, resource_id)) {
                Some(entry) => *entry.value(),
                None => return Ok(None),
            }
        };

        Ok(self.patients.get(&patient_id).map(|patient| ResourceOwnership {
            resource_type,
            resource_id,
            patient_id,
            owner_user_id: patient.user_id,
            branch_id: patient.branch_id,
        }))
    }

    async fn find_patient(&self, id: Uuid) -> Result<Option<PatientRecord>, StoreError> {
        Ok(self.patients.get(&id).map(|p| p.value().clone()))
    }

    async fn save_patient(&self, record: PatientRecord) -> Result<(), StoreError> {
        self.patients.insert(record.id, record);
        Ok(())
    }

    async fn delete_patient(&self, id: Uuid) -> Result<bool, StoreError> {
        let existed = self.patients.remove(&id).is_some();
        if existed {
            self.children.retain(|_, patient_id| *patient_id != id);
        }
        Ok(existed)
    }

    async fn attach(
        &self,
        resource_type: ResourceType,
        resource_id: Uuid,
        patient_id: Uuid,
    ) -> Result<(), StoreError> {
        if !self.patients.contains_key(&patient_id) {
            return Err(StoreError::DanglingReference {
                resource_type,
                id: resource_id,
                patient_id,
            });
        }
        self.children.insert((resource_type, resource_id), patient_id);
        Ok(())
    }
}
