//! Patient endpoints.
//!
//! Authorization always runs before the record is loaded, so a caller who may
//! not see a patient gets 403 whether or not it exists.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    Extension,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{bearer_token, Action, AuthorizationSubject, ResourceRef, Verb};
use crate::client::{AddressSummary, AppointmentSummary, PropagationJob, UserSummary};
use crate::data::{PatientRecord, ResourceType};
use crate::error::{ServiceError, ServiceResult};
use crate::http::request::request_id;
use crate::http::response::ApiEnvelope;
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct PatientView {
    #[serde(flatten)]
    pub patient: PatientRecord,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct DeletedPatient {
    pub id: Uuid,
    /// Follow-up jobs accepted by the propagation queue.
    pub propagation_queued: usize,
}

pub async fn health() -> ApiEnvelope<serde_json::Value> {
    ApiEnvelope::success(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Extension(subject): Extension<AuthorizationSubject>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ServiceResult<ApiEnvelope<PatientView>> {
    require(&state, &subject, Action::new(ResourceType::Patient, Verb::Read), ResourceRef::patient(id)).await?;

    let patient = state.store.find_patient(id).await?.ok_or(ServiceError::NotFound)?;
    let user = state
        .peers
        .users
        .get_user(patient.user_id, forwarded_token(&headers))
        .await?;

    if user.degraded {
        tracing::info!(request_id = %request_id(&headers), patient = %id, "Serving patient with degraded user details");
    }
    Ok(ApiEnvelope::success(PatientView { patient, user }))
}

pub async fn list_addresses(
    State(state): State<AppState>,
    Extension(subject): Extension<AuthorizationSubject>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ServiceResult<ApiEnvelope<Vec<AddressSummary>>> {
    require(
        &state,
        &subject,
        Action::new(ResourceType::PatientAddress, Verb::Read),
        ResourceRef::patient(id),
    )
    .await?;

    let addresses = state
        .peers
        .addresses
        .list_addresses(id, forwarded_token(&headers))
        .await?;
    Ok(ApiEnvelope::success(addresses))
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(subject): Extension<AuthorizationSubject>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ServiceResult<ApiEnvelope<Vec<AppointmentSummary>>> {
    require(
        &state,
        &subject,
        Action::new(ResourceType::Appointment, Verb::Read),
        ResourceRef::patient(id),
    )
    .await?;

    let appointments = state
        .peers
        .schedule
        .list_appointments(id, forwarded_token(&headers))
        .await?;
    Ok(ApiEnvelope::success(appointments))
}

/// Deletes locally, then queues the peer clean-up. Peer failures never undo
/// the local delete; they are logged by the propagation worker.
pub async fn delete_patient(
    State(state): State<AppState>,
    Extension(subject): Extension<AuthorizationSubject>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ServiceResult<ApiEnvelope<DeletedPatient>> {
    require(&state, &subject, Action::new(ResourceType::Patient, Verb::Delete), ResourceRef::patient(id)).await?;

    let patient = state.store.find_patient(id).await?.ok_or(ServiceError::NotFound)?;
    if !state.store.delete_patient(id).await? {
        return Err(ServiceError::NotFound);
    }

    let token = forwarded_token(&headers);
    let propagation_queued = PropagationJob::for_deleted_patient(&patient)
        .into_iter()
        .map(|job| state.propagation.enqueue(job, token))
        .filter(|queued| *queued)
        .count();

    tracing::info!(
        request_id = %request_id(&headers),
        patient = %id,
        deleted_by = %subject.id,
        propagation_queued,
        "Patient deleted"
    );
    Ok(ApiEnvelope::success(DeletedPatient { id, propagation_queued }))
}

async fn require(
    state: &AppState,
    subject: &AuthorizationSubject,
    action: Action,
    target: ResourceRef,
) -> ServiceResult<()> {
    if state.authorization.decide_on(subject, action, target).await.allowed {
        Ok(())
    } else {
        Err(ServiceError::AuthorizationDenied)
    }
}

fn forwarded_token(headers: &HeaderMap) -> Option<&str> {
    bearer_token(headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok())).ok()
}
