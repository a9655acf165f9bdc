//! `warden-authz` — pure multi-tenant RBAC authorization core.
//!
//! This crate is intentionally decoupled from HTTP and storage: it consumes
//! role/permission data through the read-only [`PolicyStore`] port and
//! produces allow/deny decisions. Enforcement at the request boundary lives
//! in `warden-api`.

pub mod actor;
pub mod cache;
pub mod evaluator;
pub mod grant;
pub mod resolver;
pub mod role;
pub mod store;

pub use actor::Actor;
pub use cache::{CacheConfig, DecisionCache, SubjectKey};
pub use evaluator::{
    AccessError, Decision, DenyReason, EffectiveGrant, EvaluatorConfig, PermissionEvaluator,
};
pub use grant::{Effect, Grant, PermissionCode, Resource, ResourceKey};
pub use resolver::RoleResolver;
pub use role::{Role, RoleAssignment, RoleCode, RoleSubject};
pub use store::{InMemoryPolicyStore, PolicyStore, StoreError};
