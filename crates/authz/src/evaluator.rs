//! Permission evaluation: DENY-overrides-ALLOW over the merged role set.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use warden_core::{TenantId, UserId};

use crate::actor::Actor;
use crate::cache::{DecisionCache, GrantSet, SubjectKey};
use crate::grant::{Effect, PermissionCode, ResourceKey};
use crate::resolver::RoleResolver;
use crate::role::RoleCode;
use crate::store::{PolicyStore, StoreError};

// ─────────────────────────────────────────────────────────────────────────────
// Decision model
// ─────────────────────────────────────────────────────────────────────────────

/// Why an evaluation denied.
///
/// `UnknownResource` and `UnknownPermission` are internal-only: the
/// enforcement boundary collapses every deny into FORBIDDEN so callers cannot
/// probe which resources exist.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    UnknownResource,
    UnknownPermission,
    NoRoles,
    DeniedByGrant,
    NoMatchingGrant,
}

/// Outcome of one evaluation.
///
/// The administrative bypass is a distinct variant rather than a folded
/// boolean: it is an implicit allow-all super-role and audit trails need to
/// record *why* a request was allowed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum Decision {
    Allow,
    AllowViaBypass,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow | Decision::AllowViaBypass)
    }
}

/// Failure of a strict enforcement point.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("forbidden: missing permission '{permission}' on '{resource}'")]
    Forbidden {
        resource: ResourceKey,
        permission: PermissionCode,
    },

    /// The store substrate failed; must never be treated as a denial.
    #[error(transparent)]
    Internal(#[from] StoreError),
}

/// A materialized ALLOW entry (display/introspection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveGrant {
    pub resource_key: ResourceKey,
    pub permission_code: PermissionCode,
}

/// Evaluator configuration.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Role code designated as the administrative bypass ("super-role").
    pub bypass_role_code: RoleCode,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            bypass_role_code: RoleCode::new("ADMIN"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Evaluator
// ─────────────────────────────────────────────────────────────────────────────

/// Combines role resolution and grant lookup into a single allow/deny
/// decision, memoized through the [`DecisionCache`].
pub struct PermissionEvaluator {
    store: Arc<dyn PolicyStore>,
    resolver: RoleResolver,
    cache: DecisionCache,
    config: EvaluatorConfig,
}

impl PermissionEvaluator {
    pub fn new(store: Arc<dyn PolicyStore>, cache: DecisionCache, config: EvaluatorConfig) -> Self {
        let resolver = RoleResolver::new(Arc::clone(&store));
        Self {
            store,
            resolver,
            cache,
            config,
        }
    }

    /// Evaluate whether `actor` may exercise `permission` on `resource`.
    ///
    /// Short-circuits on the first DENY found; iteration order among ALLOW
    /// grants is irrelevant. Store faults propagate unchanged.
    pub fn decide(
        &self,
        actor: &Actor,
        resource: &ResourceKey,
        permission: &PermissionCode,
    ) -> Result<Decision, StoreError> {
        let resource_id = match self.store.resource_id(actor.tenant_id, resource)? {
            Some(id) => id,
            None => return Ok(Decision::Deny(DenyReason::UnknownResource)),
        };
        let permission_id = match self.store.permission_id(permission)? {
            Some(id) => id,
            None => return Ok(Decision::Deny(DenyReason::UnknownPermission)),
        };

        if self.is_admin(actor)? {
            tracing::debug!(%resource, %permission, "allowed via administrative bypass");
            return Ok(Decision::AllowViaBypass);
        }

        let grants = self.grant_set(actor)?;
        if grants.role_count == 0 {
            return Ok(Decision::Deny(DenyReason::NoRoles));
        }

        let pair = (resource_id, permission_id);
        if grants.denies.contains(&pair) {
            return Ok(Decision::Deny(DenyReason::DeniedByGrant));
        }
        if grants.allows.contains(&pair) {
            Ok(Decision::Allow)
        } else {
            Ok(Decision::Deny(DenyReason::NoMatchingGrant))
        }
    }

    /// [`Self::decide`] collapsed to a boolean.
    pub fn can_access(
        &self,
        actor: &Actor,
        resource: &ResourceKey,
        permission: &PermissionCode,
    ) -> Result<bool, StoreError> {
        Ok(self.decide(actor, resource, permission)?.is_allowed())
    }

    /// Identical computation to [`Self::decide`], signalling FORBIDDEN on
    /// deny, for strict enforcement points.
    pub fn require(
        &self,
        actor: &Actor,
        resource: &ResourceKey,
        permission: &PermissionCode,
    ) -> Result<Decision, AccessError> {
        let decision = self.decide(actor, resource, permission)?;
        if decision.is_allowed() {
            Ok(decision)
        } else {
            Err(AccessError::Forbidden {
                resource: resource.clone(),
                permission: permission.clone(),
            })
        }
    }

    /// Whether the actor holds the administrative bypass role.
    ///
    /// Cached independently of grant material so fallback-mode checks stay
    /// cheap even for actors that never hit a policy match.
    pub fn is_admin(&self, actor: &Actor) -> Result<bool, StoreError> {
        self.cache.admin_or_compute(SubjectKey::from(actor), || {
            let bypass_role =
                match self.store.role_id_by_code(actor.tenant_id, &self.config.bypass_role_code)? {
                    Some(id) => id,
                    None => return Ok(false),
                };
            Ok(self.resolver.effective_role_ids(actor)?.contains(&bypass_role))
        })
    }

    /// The actor's materialized ALLOW list: every (resource, permission) pair
    /// some held role allows and no held role denies, resolved to symbolic
    /// names. Pairs whose names no longer resolve are omitted.
    pub fn effective_allows(
        &self,
        actor: &Actor,
    ) -> Result<Arc<Vec<EffectiveGrant>>, StoreError> {
        let key = SubjectKey::from(actor);
        let grants = self.grant_set(actor)?;
        self.cache.allow_list_or_compute(key, || {
            let mut list = Vec::new();
            for pair in grants.allows.difference(&grants.denies) {
                let (resource_id, permission_id) = *pair;
                let resource_key = self.store.resource_key(actor.tenant_id, resource_id)?;
                let permission_code = self.store.permission_code(permission_id)?;
                if let (Some(resource_key), Some(permission_code)) = (resource_key, permission_code)
                {
                    list.push(EffectiveGrant {
                        resource_key,
                        permission_code,
                    });
                }
            }
            list.sort_by(|a, b| {
                (a.resource_key.as_str(), a.permission_code.as_str())
                    .cmp(&(b.resource_key.as_str(), b.permission_code.as_str()))
            });
            Ok(list)
        })
    }

    /// Drop cached state for a (tenant, user), forcing recomputation on the
    /// next evaluation. Call after mutating that user's role assignments or
    /// any grant affecting them directly.
    pub fn invalidate(&self, tenant_id: TenantId, user_id: UserId) {
        self.cache.invalidate(tenant_id, user_id);
    }

    fn grant_set(&self, actor: &Actor) -> Result<Arc<GrantSet>, StoreError> {
        self.cache.grant_set_or_compute(SubjectKey::from(actor), || {
            let roles: Vec<_> = self.resolver.effective_role_ids(actor)?.into_iter().collect();
            let mut set = GrantSet {
                role_count: roles.len(),
                ..GrantSet::default()
            };
            if roles.is_empty() {
                return Ok(set);
            }
            for grant in self.store.grants(actor.tenant_id, &roles)? {
                let pair = (grant.resource_id, grant.permission_id);
                match grant.effect {
                    Effect::Allow => {
                        set.allows.insert(pair);
                    }
                    Effect::Deny => {
                        set.denies.insert(pair);
                    }
                }
            }
            Ok(set)
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
