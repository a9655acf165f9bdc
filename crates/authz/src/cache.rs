//! Bounded, invalidatable decision cache.
//!
//! Three independent stores keyed by (tenant, user): the administrative
//! bypass flag, the materialized ALLOW list for display/introspection, and
//! the raw grant set decisions are derived from. Each store carries its own
//! capacity and TTL. There is no single-flight guarantee: concurrent misses
//! for the same key may recompute redundantly, so compute closures must be
//! pure and side-effect-free.
//!
//! A change to a grant affecting a *role* does not fan out to every actor
//! holding that role; staleness is bounded by the TTLs, and direct
//! role-membership changes are expected to call [`DecisionCache::invalidate`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use warden_core::{PermissionId, ResourceId, TenantId, UserId};

use crate::actor::Actor;
use crate::evaluator::EffectiveGrant;
use crate::store::StoreError;

/// Composite cache key: one entry per (tenant, user).
///
/// A structured key rather than string concatenation: collisions between
/// tenants are impossible by construction and targeted invalidation stays a
/// single map operation per store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubjectKey {
    pub tenant_id: TenantId,
    pub user_id: UserId,
}

impl From<&Actor> for SubjectKey {
    fn from(actor: &Actor) -> Self {
        Self {
            tenant_id: actor.tenant_id,
            user_id: actor.user_id,
        }
    }
}

/// Raw per-subject grant material, cached as one unit.
///
/// `role_count` distinguishes "no roles at all" from "roles without grants"
/// so a cached entry reproduces exactly the deny reason a fresh computation
/// would yield.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GrantSet {
    pub role_count: usize,
    pub allows: HashSet<(ResourceId, PermissionId)>,
    pub denies: HashSet<(ResourceId, PermissionId)>,
}

/// Per-store bounds. TTLs default short: the cache is a local optimization
/// with a safe recompute fallback, and short windows bound the staleness left
/// by the missing role→actor invalidation fan-out.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub admin_capacity: u64,
    pub admin_ttl: Duration,
    pub allow_list_capacity: u64,
    pub allow_list_ttl: Duration,
    pub grant_set_capacity: u64,
    pub grant_set_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            admin_capacity: 10_000,
            admin_ttl: Duration::from_secs(60),
            allow_list_capacity: 10_000,
            allow_list_ttl: Duration::from_secs(30),
            grant_set_capacity: 10_000,
            grant_set_ttl: Duration::from_secs(30),
        }
    }
}

/// Memoizes evaluator inputs/outputs per (tenant, user).
///
/// Safe for concurrent read/write from arbitrary request-handling threads;
/// last-writer-wins per key.
pub struct DecisionCache {
    admin: Cache<SubjectKey, bool>,
    allow_lists: Cache<SubjectKey, Arc<Vec<EffectiveGrant>>>,
    grant_sets: Cache<SubjectKey, Arc<GrantSet>>,
}

impl DecisionCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            admin: Cache::builder()
                .max_capacity(config.admin_capacity)
                .time_to_live(config.admin_ttl)
                .build(),
            allow_lists: Cache::builder()
                .max_capacity(config.allow_list_capacity)
                .time_to_live(config.allow_list_ttl)
                .build(),
            grant_sets: Cache::builder()
                .max_capacity(config.grant_set_capacity)
                .time_to_live(config.grant_set_ttl)
                .build(),
        }
    }

    /// Cached administrative-bypass flag, computing on miss.
    pub fn admin_or_compute<F>(&self, key: SubjectKey, compute: F) -> Result<bool, StoreError>
    where
        F: FnOnce() -> Result<bool, StoreError>,
    {
        if let Some(flag) = self.admin.get(&key) {
            return Ok(flag);
        }
        let flag = compute()?;
        self.admin.insert(key, flag);
        Ok(flag)
    }

    /// Cached materialized ALLOW list, computing on miss.
    pub fn allow_list_or_compute<F>(
        &self,
        key: SubjectKey,
        compute: F,
    ) -> Result<Arc<Vec<EffectiveGrant>>, StoreError>
    where
        F: FnOnce() -> Result<Vec<EffectiveGrant>, StoreError>,
    {
        if let Some(list) = self.allow_lists.get(&key) {
            return Ok(list);
        }
        let list = Arc::new(compute()?);
        self.allow_lists.insert(key, Arc::clone(&list));
        Ok(list)
    }

    /// Cached raw grant set, computing on miss.
    pub fn grant_set_or_compute<F>(
        &self,
        key: SubjectKey,
        compute: F,
    ) -> Result<Arc<GrantSet>, StoreError>
    where
        F: FnOnce() -> Result<GrantSet, StoreError>,
    {
        if let Some(set) = self.grant_sets.get(&key) {
            return Ok(set);
        }
        let set = Arc::new(compute()?);
        self.grant_sets.insert(key, Arc::clone(&set));
        Ok(set)
    }

    /// Drop all three entries for a (tenant, user).
    ///
    /// Atomic with respect to subsequent reads (they will miss and
    /// recompute); in-flight reads may still complete against the old value.
    pub fn invalidate(&self, tenant_id: TenantId, user_id: UserId) {
        let key = SubjectKey { tenant_id, user_id };
        self.admin.invalidate(&key);
        self.allow_lists.invalidate(&key);
        self.grant_sets.invalidate(&key);
        tracing::debug!(%tenant_id, %user_id, "decision cache invalidated");
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
