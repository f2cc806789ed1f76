//! Authorization decision service.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::policy::{Action, AuthorizationPolicy};
use crate::auth::subject::{AuthorizationSubject, Role, TokenClaims};
use crate::data::{RecordStore, ResourceType};
use crate::observability::metrics;

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    AdminBypass,
    RoleGranted,
    Owner,
    NoRule,
    RoleNotPermitted,
    NotOwner,
    BranchMismatch,
    ResourceNotFound,
    LookupFailed,
    InvalidSubject,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::AdminBypass => "admin_bypass",
            DecisionReason::RoleGranted => "role_granted",
            DecisionReason::Owner => "owner",
            DecisionReason::NoRule => "no_rule",
            DecisionReason::RoleNotPermitted => "role_not_permitted",
            DecisionReason::NotOwner => "not_owner",
            DecisionReason::BranchMismatch => "branch_mismatch",
            DecisionReason::ResourceNotFound => "resource_not_found",
            DecisionReason::LookupFailed => "lookup_failed",
            DecisionReason::InvalidSubject => "invalid_subject",
        }
    }
}

/// The record whose owner and branch decide the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRef {
    pub resource_type: ResourceType,
    pub id: Uuid,
}

impl ResourceRef {
    pub fn new(resource_type: ResourceType, id: Uuid) -> Self {
        Self { resource_type, id }
    }

    pub fn patient(id: Uuid) -> Self {
        Self::new(ResourceType::Patient, id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl AuthorizationDecision {
    fn allow(reason: DecisionReason) -> Self {
        Self { allowed: true, reason }
    }

    fn deny(reason: DecisionReason) -> Self {
        Self { allowed: false, reason }
    }
}

/// Evaluates the policy table against a subject and a target record.
///
/// Every error path denies. At most one ownership lookup is made per decision
/// and nothing is cached between decisions.
#[derive(Clone)]
pub struct AuthorizationService {
    policy: Arc<AuthorizationPolicy>,
    store: Arc<dyn RecordStore>,
}

impl AuthorizationService {
    pub fn new(policy: AuthorizationPolicy, store: Arc<dyn RecordStore>) -> Self {
        Self {
            policy: Arc::new(policy),
            store,
        }
    }

    /// Decide `action` on the record `resource_id` of the action's own resource type.
    pub async fn decide(
        &self,
        subject: &AuthorizationSubject,
        action: Action,
        resource_id: Uuid,
    ) -> AuthorizationDecision {
        self.decide_on(subject, action, ResourceRef::new(action.resource, resource_id))
            .await
    }

    /// Decide `action` with ownership resolved through `target`, e.g. a
    /// patient's address list checked against the patient.
    pub async fn decide_on(
        &self,
        subject: &AuthorizationSubject,
        action: Action,
        target: ResourceRef,
    ) -> AuthorizationDecision {
        let decision = self.evaluate(subject, action, target).await;

        tracing::debug!(
            subject = %subject.id,
            action = %action,
            target_type = %target.resource_type,
            target = %target.id,
            allowed = decision.allowed,
            reason = decision.reason.as_str(),
            "Authorization decision"
        );
        metrics::record_authorization(action.to_string(), decision.allowed);
        decision
    }

    pub async fn authorize(&self, subject: &AuthorizationSubject, action: Action, resource_id: Uuid) -> bool {
        self.decide(subject, action, resource_id).await.allowed
    }

    /// Same as [`authorize`](Self::authorize) from raw claims; a missing or
    /// malformed subject denies.
    pub async fn authorize_claims(&self, claims: &TokenClaims, action: Action, resource_id: Uuid) -> bool {
        match AuthorizationSubject::from_claims(claims) {
            Ok(subject) => self.authorize(&subject, action, resource_id).await,
            Err(e) => {
                tracing::debug!(
                    action = %action,
                    reason = DecisionReason::InvalidSubject.as_str(),
                    error = %e,
                    "Authorization decision"
                );
                metrics::record_authorization(action.to_string(), false);
                false
            }
        }
    }

    async fn evaluate(
        &self,
        subject: &AuthorizationSubject,
        action: Action,
        target: ResourceRef,
    ) -> AuthorizationDecision {
        let Some(rule) = self.policy.rule(&action) else {
            return AuthorizationDecision::deny(DecisionReason::NoRule);
        };

        if subject.is_admin() && rule.allowed_roles.contains(&Role::Admin) {
            return AuthorizationDecision::allow(DecisionReason::AdminBypass);
        }

        let role_granted = subject.roles.iter().any(|r| rule.allowed_roles.contains(r));
        if !role_granted && !rule.ownership_scoped {
            return AuthorizationDecision::deny(DecisionReason::RoleNotPermitted);
        }

        // one lookup serves both the branch and the owner check
        let ownership = match self.store.find_owner_of(target.resource_type, target.id).await {
            Ok(Some(ownership)) => ownership,
            Ok(None) => return AuthorizationDecision::deny(DecisionReason::ResourceNotFound),
            Err(e) => {
                tracing::warn!(action = %action, target = %target.id, error = %e, "Ownership lookup failed");
                return AuthorizationDecision::deny(DecisionReason::LookupFailed);
            }
        };

        if let Some(branch) = ownership.branch_id {
            if !subject.can_access_branch(&branch) {
                return AuthorizationDecision::deny(DecisionReason::BranchMismatch);
            }
        }

        if role_granted {
            AuthorizationDecision::allow(DecisionReason::RoleGranted)
        } else if ownership.owner_user_id == subject.id {
            AuthorizationDecision::allow(DecisionReason::Owner)
        } else {
            AuthorizationDecision::deny(DecisionReason::NotOwner)
        }
    }
}
