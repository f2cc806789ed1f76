//! Authentication and authorization subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <jwt>
//!     → token.rs (HS256 signature, expiry)
//!     → subject.rs (claims → AuthorizationSubject)
//!     → middleware.rs (subject stored in request extensions, 401 on failure)
//!     → decision.rs (policy.rs table + one ownership lookup → allow/deny)
//! ```
//!
//! # Design Decisions
//! - One evaluation path driven by a (resource, verb) table
//! - Fail closed on every error path
//! - Global ADMIN bypasses ownership and branch scoping
//! - Denials never reveal whether the target exists

pub mod decision;
pub mod middleware;
pub mod policy;
pub mod subject;
pub mod token;

pub use decision::{AuthorizationDecision, AuthorizationService, DecisionReason, ResourceRef};
pub use middleware::{authenticate, require_admin};
pub use policy::{default_policy, Action, AuthorizationPolicy, Rule, Verb};
pub use subject::{AuthorizationSubject, Role, SubjectError, TokenClaims};
pub use token::{bearer_token, TokenError, TokenVerifier};
