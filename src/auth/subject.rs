//! Caller identity derived from token claims.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Role carried in the `roles` claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Admin,
    Doctor,
    Patient,
    Other(String),
}

impl Role {
    /// Parse a role string. Case-insensitive, `ROLE_` prefix optional.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let name = trimmed
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("ROLE_"))
            .map_or(trimmed, |_| &trimmed[5..]);

        match name.to_ascii_uppercase().as_str() {
            "ADMIN" => Role::Admin,
            "DOCTOR" => Role::Doctor,
            "PATIENT" => Role::Patient,
            other => Role::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("ADMIN"),
            Role::Doctor => f.write_str("DOCTOR"),
            Role::Patient => f.write_str("PATIENT"),
            Role::Other(name) => f.write_str(name),
        }
    }
}

/// Claims this service reads from a verified token.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub context_ids: Option<Vec<String>>,
    #[serde(default)]
    pub primary_context_id: Option<String>,
    /// Legacy name for `context_ids`.
    #[serde(default)]
    pub branch_ids: Option<Vec<String>>,
    /// Legacy name for `primary_context_id`.
    #[serde(default)]
    pub primary_branch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectError {
    #[error("token has no subject")]
    MissingSubject,
    #[error("subject '{0}' is not a UUID")]
    MalformedSubject(String),
}

/// The caller, as identified by a verified token. Immutable and request-local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationSubject {
    pub id: Uuid,
    pub roles: HashSet<Role>,
    /// Branches (tenants) the caller may act in.
    pub branches: HashSet<Uuid>,
    pub primary_branch: Option<Uuid>,
}

impl AuthorizationSubject {
    pub fn from_claims(claims: &TokenClaims) -> Result<Self, SubjectError> {
        let raw = claims
            .sub
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SubjectError::MissingSubject)?;
        let id = Uuid::parse_str(raw).map_err(|_| SubjectError::MalformedSubject(raw.to_string()))?;

        let roles = claims.roles.iter().map(|r| Role::parse(r)).collect();

        // new claim names win; legacy names only when neither is present
        let (ids, primary) = if claims.context_ids.is_some() || claims.primary_context_id.is_some() {
            (&claims.context_ids, &claims.primary_context_id)
        } else {
            (&claims.branch_ids, &claims.primary_branch_id)
        };

        let primary_branch = primary.as_deref().and_then(parse_branch);
        let mut branches: HashSet<Uuid> = ids
            .iter()
            .flatten()
            .filter_map(|raw| parse_branch(raw))
            .collect();
        branches.extend(primary_branch);

        Ok(Self {
            id,
            roles,
            branches,
            primary_branch,
        })
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(&Role::Admin)
    }

    pub fn can_access_branch(&self, branch: &Uuid) -> bool {
        self.branches.contains(branch)
    }
}

fn parse_branch(raw: &str) -> Option<Uuid> {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::debug!(branch = %raw, "Ignoring malformed branch id in token");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: Option<&str>) -> TokenClaims {
        TokenClaims {
            sub: sub.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::parse("ROLE_ADMIN"), Role::Admin);
        assert_eq!(Role::parse("doctor"), Role::Doctor);
        assert_eq!(Role::parse(" role_patient "), Role::Patient);
        assert_eq!(Role::parse("nurse"), Role::Other("NURSE".into()));
        assert_eq!(Role::parse("ROLE"), Role::Other("ROLE".into()));
    }

    #[test]
    fn test_missing_or_malformed_subject() {
        assert_eq!(
            AuthorizationSubject::from_claims(&claims(None)).unwrap_err(),
            SubjectError::MissingSubject
        );
        assert_eq!(
            AuthorizationSubject::from_claims(&claims(Some("  "))).unwrap_err(),
            SubjectError::MissingSubject
        );
        assert!(matches!(
            AuthorizationSubject::from_claims(&claims(Some("user-42"))),
            Err(SubjectError::MalformedSubject(_))
        ));
    }

    #[test]
    fn test_context_claims_take_precedence_over_legacy() {
        let ctx = Uuid::new_v4();
        let primary = Uuid::new_v4();
        let legacy = Uuid::new_v4();
        let subject = AuthorizationSubject::from_claims(&TokenClaims {
            sub: Some(Uuid::new_v4().to_string()),
            roles: vec!["ROLE_DOCTOR".into()],
            context_ids: Some(vec![ctx.to_string(), "garbage".into()]),
            primary_context_id: Some(primary.to_string()),
            branch_ids: Some(vec![legacy.to_string()]),
            primary_branch_id: None,
            exp: None,
        })
        .unwrap();

        assert!(subject.has_role(&Role::Doctor));
        assert!(subject.can_access_branch(&ctx));
        assert!(subject.can_access_branch(&primary));
        assert!(!subject.can_access_branch(&legacy));
        assert_eq!(subject.branches.len(), 2);
        assert_eq!(subject.primary_branch, Some(primary));
    }

    #[test]
    fn test_legacy_branch_claims() {
        let legacy = Uuid::new_v4();
        let subject = AuthorizationSubject::from_claims(&TokenClaims {
            sub: Some(Uuid::new_v4().to_string()),
            primary_branch_id: Some(legacy.to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(subject.can_access_branch(&legacy));
        assert!(!subject.is_admin());
    }
}
