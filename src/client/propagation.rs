//! Best-effort propagation of local changes to peer services.
//!
//! # Design Decisions
//! - Bounded queue; `enqueue` never blocks the request that produced the job
//! - One worker drains jobs in order and stops on the shutdown broadcast
//! - A failed job is logged and counted, then the worker moves on
//! - Jobs still queued at shutdown are dropped

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::client::address::AddressServiceClient;
use crate::client::auth_service::AuthServiceClient;
use crate::client::schedule::ScheduleServiceClient;
use crate::data::PatientRecord;
use crate::error::ServiceResult;
use crate::observability::metrics;

/// Follow-up work owed to a peer after a local change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagationJob {
    DeleteAddresses { owner_id: Uuid },
    CancelAppointments { patient_id: Uuid },
    DeactivateAccount { user_id: Uuid },
}

impl PropagationJob {
    pub fn name(&self) -> &'static str {
        match self {
            PropagationJob::DeleteAddresses { .. } => "delete_addresses",
            PropagationJob::CancelAppointments { .. } => "cancel_appointments",
            PropagationJob::DeactivateAccount { .. } => "deactivate_account",
        }
    }

    /// Jobs owed after `patient` was deleted locally.
    pub fn for_deleted_patient(patient: &PatientRecord) -> [PropagationJob; 3] {
        [
            PropagationJob::DeleteAddresses { owner_id: patient.id },
            PropagationJob::CancelAppointments { patient_id: patient.id },
            PropagationJob::DeactivateAccount { user_id: patient.user_id },
        ]
    }
}

/// Executes a job against the owning peer.
#[async_trait]
pub trait PropagationHandler: Send + Sync {
    async fn handle(&self, job: &PropagationJob, token: Option<&str>) -> ServiceResult<()>;
}

/// Routes each job to its peer client.
#[derive(Clone)]
pub struct PeerPropagation {
    pub addresses: AddressServiceClient,
    pub schedule: ScheduleServiceClient,
    pub accounts: AuthServiceClient,
}

#[async_trait]
impl PropagationHandler for PeerPropagation {
    async fn handle(&self, job: &PropagationJob, token: Option<&str>) -> ServiceResult<()> {
        match job {
            PropagationJob::DeleteAddresses { owner_id } => {
                self.addresses.delete_addresses_of(*owner_id, token).await
            }
            PropagationJob::CancelAppointments { patient_id } => {
                self.schedule.cancel_appointments_of(*patient_id, token).await
            }
            PropagationJob::DeactivateAccount { user_id } => {
                self.accounts.deactivate_account(*user_id, token).await
            }
        }
    }
}

#[derive(Debug)]
struct QueuedJob {
    job: PropagationJob,
    token: Option<String>,
}

/// Producer side of the propagation queue.
#[derive(Debug, Clone)]
pub struct PropagationQueue {
    tx: mpsc::Sender<QueuedJob>,
}

/// Consumer side; run it with [`PropagationWorker::run`].
#[derive(Debug)]
pub struct PropagationWorker {
    rx: mpsc::Receiver<QueuedJob>,
}

impl PropagationQueue {
    pub fn bounded(capacity: usize) -> (Self, PropagationWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, PropagationWorker { rx })
    }

    /// Queue `job` without waiting. Returns `false` when the job was dropped.
    pub fn enqueue(&self, job: PropagationJob, token: Option<&str>) -> bool {
        let name = job.name();
        let queued = QueuedJob {
            job,
            token: token.map(str::to_string),
        };
        match self.tx.try_send(queued) {
            Ok(()) => {
                metrics::record_propagation(name, "queued");
                true
            }
            Err(mpsc::error::TrySendError::Full(rejected)) => {
                tracing::warn!(job = name, ?rejected.job, "Propagation queue full, dropping job");
                metrics::record_propagation(name, "dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(rejected)) => {
                tracing::warn!(job = name, ?rejected.job, "Propagation worker stopped, dropping job");
                metrics::record_propagation(name, "dropped");
                false
            }
        }
    }
}

impl PropagationWorker {
    pub async fn run<H>(mut self, handler: H, mut shutdown: broadcast::Receiver<()>)
    where
        H: PropagationHandler,
    {
        tracing::info!("Propagation worker started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Propagation worker shutting down");
                    break;
                }
                next = self.rx.recv() => {
                    let Some(queued) = next else { break };
                    run_job(&handler, queued).await;
                }
            }
        }
        tracing::info!("Propagation worker stopped");
    }
}

async fn run_job<H: PropagationHandler>(handler: &H, queued: QueuedJob) {
    let name = queued.job.name();
    match handler.handle(&queued.job, queued.token.as_deref()).await {
        Ok(()) => {
            tracing::debug!(job = name, ?queued.job, "Propagation job completed");
            metrics::record_propagation(name, "succeeded");
        }
        Err(e) => {
            tracing::warn!(job = name, ?queued.job, error = %e, "Propagation job failed, continuing");
            metrics::record_propagation(name, "failed");
        }
    }
}
