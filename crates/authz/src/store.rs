//! Read-only persistence port for role/permission data.
//!
//! The external administration surface owns the writes; this core only ever
//! reads, either on an uncached evaluation or after an explicit invalidation
//! signal. All lookups are tenant-scoped; cross-tenant reads must never
//! succeed.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use warden_core::{DepartmentId, PermissionId, ResourceId, RoleId, TenantId, UserId};

use crate::grant::{Grant, PermissionCode, Resource, ResourceKey};
use crate::role::{Role, RoleAssignment, RoleCode, RoleSubject};

/// Failure of the policy-store substrate itself.
///
/// These are faults, not denials: the evaluator propagates them unchanged and
/// the enforcement boundary maps them to INTERNAL, never to FORBIDDEN.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("policy store unavailable: {0}")]
    Unavailable(String),

    #[error("policy store read timed out")]
    Timeout,
}

/// Read interface over role/permission data (fast, indexed reads assumed).
pub trait PolicyStore: Send + Sync {
    /// Role ids directly assigned to a user.
    fn user_role_ids(&self, tenant_id: TenantId, user_id: UserId) -> Result<Vec<RoleId>, StoreError>;

    /// Role ids assigned to a department.
    fn department_role_ids(
        &self,
        tenant_id: TenantId,
        department_id: DepartmentId,
    ) -> Result<Vec<RoleId>, StoreError>;

    /// Resolve a resource key within a tenant.
    ///
    /// A tenant-specific entry takes precedence over a shared entry with the
    /// same key; `None` means the key resolves nowhere visible to the tenant.
    fn resource_id(
        &self,
        tenant_id: TenantId,
        key: &ResourceKey,
    ) -> Result<Option<ResourceId>, StoreError>;

    /// Reverse lookup of a resource key (for introspection output).
    fn resource_key(
        &self,
        tenant_id: TenantId,
        resource_id: ResourceId,
    ) -> Result<Option<ResourceKey>, StoreError>;

    /// Resolve a permission code. The permission vocabulary is shared across
    /// tenants.
    fn permission_id(&self, code: &PermissionCode) -> Result<Option<PermissionId>, StoreError>;

    /// Reverse lookup of a permission code (for introspection output).
    fn permission_code(
        &self,
        permission_id: PermissionId,
    ) -> Result<Option<PermissionCode>, StoreError>;

    /// All grants held by the given roles within a tenant.
    fn grants(&self, tenant_id: TenantId, role_ids: &[RoleId]) -> Result<Vec<Grant>, StoreError>;

    /// The role carrying the given code within a tenant, if any.
    fn role_id_by_code(
        &self,
        tenant_id: TenantId,
        code: &RoleCode,
    ) -> Result<Option<RoleId>, StoreError>;
}

impl<S> PolicyStore for Arc<S>
where
    S: PolicyStore + ?Sized,
{
    fn user_role_ids(&self, tenant_id: TenantId, user_id: UserId) -> Result<Vec<RoleId>, StoreError> {
        (**self).user_role_ids(tenant_id, user_id)
    }

    fn department_role_ids(
        &self,
        tenant_id: TenantId,
        department_id: DepartmentId,
    ) -> Result<Vec<RoleId>, StoreError> {
        (**self).department_role_ids(tenant_id, department_id)
    }

    fn resource_id(
        &self,
        tenant_id: TenantId,
        key: &ResourceKey,
    ) -> Result<Option<ResourceId>, StoreError> {
        (**self).resource_id(tenant_id, key)
    }

    fn resource_key(
        &self,
        tenant_id: TenantId,
        resource_id: ResourceId,
    ) -> Result<Option<ResourceKey>, StoreError> {
        (**self).resource_key(tenant_id, resource_id)
    }

    fn permission_id(&self, code: &PermissionCode) -> Result<Option<PermissionId>, StoreError> {
        (**self).permission_id(code)
    }

    fn permission_code(
        &self,
        permission_id: PermissionId,
    ) -> Result<Option<PermissionCode>, StoreError> {
        (**self).permission_code(permission_id)
    }

    fn grants(&self, tenant_id: TenantId, role_ids: &[RoleId]) -> Result<Vec<Grant>, StoreError> {
        (**self).grants(tenant_id, role_ids)
    }

    fn role_id_by_code(
        &self,
        tenant_id: TenantId,
        code: &RoleCode,
    ) -> Result<Option<RoleId>, StoreError> {
        (**self).role_id_by_code(tenant_id, code)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory implementation (tests/dev)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct StoreInner {
    roles: Vec<Role>,
    assignments: HashMap<TenantId, Vec<RoleAssignment>>,
    resources: Vec<Resource>,
    permissions: HashMap<PermissionCode, PermissionId>,
    grants: HashMap<TenantId, Vec<Grant>>,
}

/// In-memory policy store for tests and the demo wiring.
///
/// Seeding happens through the `add_*` methods; reads go through the
/// [`PolicyStore`] port exactly like a DB-backed implementation would.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a role and return its id.
    pub fn add_role(&self, tenant_id: TenantId, code: RoleCode, name: impl Into<String>) -> RoleId {
        let id = RoleId::new();
        if let Ok(mut inner) = self.inner.write() {
            inner.roles.push(Role {
                id,
                tenant_id,
                code,
                name: name.into(),
            });
        }
        id
    }

    pub fn add_assignment(&self, tenant_id: TenantId, assignment: RoleAssignment) {
        if let Ok(mut inner) = self.inner.write() {
            inner.assignments.entry(tenant_id).or_default().push(assignment);
        }
    }

    pub fn remove_assignment(&self, tenant_id: TenantId, assignment: RoleAssignment) {
        if let Ok(mut inner) = self.inner.write() {
            if let Some(rows) = inner.assignments.get_mut(&tenant_id) {
                rows.retain(|a| a != &assignment);
            }
        }
    }

    /// Register a tenant-scoped resource (`tenant_id: Some`) or a shared one
    /// (`tenant_id: None`) and return its id.
    pub fn add_resource(&self, tenant_id: Option<TenantId>, key: ResourceKey) -> ResourceId {
        let id = ResourceId::new();
        if let Ok(mut inner) = self.inner.write() {
            inner.resources.push(Resource {
                id,
                tenant_id,
                key,
            });
        }
        id
    }

    /// Register a permission code and return its id (idempotent per code).
    pub fn add_permission(&self, code: PermissionCode) -> PermissionId {
        let mut inner = match self.inner.write() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        *inner.permissions.entry(code).or_insert_with(PermissionId::new)
    }

    pub fn add_grant(&self, tenant_id: TenantId, grant: Grant) {
        if let Ok(mut inner) = self.inner.write() {
            inner.grants.entry(tenant_id).or_default().push(grant);
        }
    }

    pub fn remove_grants_for_role(&self, tenant_id: TenantId, role_id: RoleId) {
        if let Ok(mut inner) = self.inner.write() {
            if let Some(rows) = inner.grants.get_mut(&tenant_id) {
                rows.retain(|g| g.role_id != role_id);
            }
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreInner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn user_role_ids(&self, tenant_id: TenantId, user_id: UserId) -> Result<Vec<RoleId>, StoreError> {
        let inner = self.read()?;
        let rows = match inner.assignments.get(&tenant_id) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };
        Ok(rows
            .iter()
            .filter(|a| a.subject == RoleSubject::User(user_id))
            .map(|a| a.role_id)
            .collect())
    }

    fn department_role_ids(
        &self,
        tenant_id: TenantId,
        department_id: DepartmentId,
    ) -> Result<Vec<RoleId>, StoreError> {
        let inner = self.read()?;
        let rows = match inner.assignments.get(&tenant_id) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };
        Ok(rows
            .iter()
            .filter(|a| a.subject == RoleSubject::Department(department_id))
            .map(|a| a.role_id)
            .collect())
    }

    fn resource_id(
        &self,
        tenant_id: TenantId,
        key: &ResourceKey,
    ) -> Result<Option<ResourceId>, StoreError> {
        let inner = self.read()?;
        let tenant_specific = inner
            .resources
            .iter()
            .find(|r| r.tenant_id == Some(tenant_id) && &r.key == key);
        if let Some(resource) = tenant_specific {
            return Ok(Some(resource.id));
        }
        Ok(inner
            .resources
            .iter()
            .find(|r| r.tenant_id.is_none() && &r.key == key)
            .map(|r| r.id))
    }

    fn resource_key(
        &self,
        tenant_id: TenantId,
        resource_id: ResourceId,
    ) -> Result<Option<ResourceKey>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .resources
            .iter()
            .find(|r| r.id == resource_id && (r.tenant_id == Some(tenant_id) || r.tenant_id.is_none()))
            .map(|r| r.key.clone()))
    }

    fn permission_id(&self, code: &PermissionCode) -> Result<Option<PermissionId>, StoreError> {
        let inner = self.read()?;
        Ok(inner.permissions.get(code).copied())
    }

    fn permission_code(
        &self,
        permission_id: PermissionId,
    ) -> Result<Option<PermissionCode>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .permissions
            .iter()
            .find(|(_, id)| **id == permission_id)
            .map(|(code, _)| code.clone()))
    }

    fn grants(&self, tenant_id: TenantId, role_ids: &[RoleId]) -> Result<Vec<Grant>, StoreError> {
        let inner = self.read()?;
        let rows = match inner.grants.get(&tenant_id) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };
        Ok(rows
            .iter()
            .filter(|g| role_ids.contains(&g.role_id))
            .copied()
            .collect())
    }

    fn role_id_by_code(
        &self,
        tenant_id: TenantId,
        code: &RoleCode,
    ) -> Result<Option<RoleId>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .roles
            .iter()
            .find(|r| r.tenant_id == tenant_id && &r.code == code)
            .map(|r| r.id))
    }
}
