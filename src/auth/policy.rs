//! Declarative authorization table.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::auth::subject::Role;
use crate::data::ResourceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Read,
    Create,
    Update,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 4] = [Verb::Read, Verb::Create, Verb::Update, Verb::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Read => "read",
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Delete => "delete",
        }
    }
}

/// A verb applied to a kind of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Action {
    pub resource: ResourceType,
    pub verb: Verb,
}

impl Action {
    pub const fn new(resource: ResourceType, verb: Verb) -> Self {
        Self { resource, verb }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.verb.as_str(), self.resource.as_str())
    }
}

/// Who may perform an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub allowed_roles: HashSet<Role>,
    /// The record's owner may act even without an allowed role.
    pub ownership_scoped: bool,
}

impl Rule {
    pub fn roles(roles: &[Role]) -> Self {
        Self {
            allowed_roles: roles.iter().cloned().collect(),
            ownership_scoped: false,
        }
    }

    pub fn or_owner(mut self) -> Self {
        self.ownership_scoped = true;
        self
    }
}

/// Maps every known action to its rule. Actions missing from the table are denied.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationPolicy {
    rules: HashMap<Action, Rule>,
}

impl AuthorizationPolicy {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, action: Action, rule: Rule) -> Self {
        self.rules.insert(action, rule);
        self
    }

    pub fn rule(&self, action: &Action) -> Option<&Rule> {
        self.rules.get(action)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Clinical staff read and edit anything, patients their own records.
/// Deleting is for admins, except contacts and addresses the owner manages.
/// Medical history is written by staff only.
pub fn default_policy() -> AuthorizationPolicy {
    let staff = [Role::Admin, Role::Doctor];
    let mut policy = AuthorizationPolicy::empty();

    for resource in ResourceType::ALL {
        for verb in Verb::ALL {
            let rule = match (resource, verb) {
                (ResourceType::MedicalHistory, Verb::Create | Verb::Update) => Rule::roles(&staff),
                (ResourceType::EmergencyContact | ResourceType::PatientAddress, Verb::Delete) => {
                    Rule::roles(&[Role::Admin]).or_owner()
                }
                (_, Verb::Delete) => Rule::roles(&[Role::Admin]),
                _ => Rule::roles(&staff).or_owner(),
            };
            policy = policy.with_rule(Action::new(resource, verb), rule);
        }
    }
    policy
}
