use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use warden_core::{PermissionId, ResourceId, RoleId, TenantId};

/// Dotted symbolic name identifying a protected object (e.g. `menu.admin.users`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(Cow<'static, str>);

impl ResourceKey {
    pub fn new(key: impl Into<Cow<'static, str>>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Symbolic action name (VIEW, USE, EDIT, EXECUTE).
///
/// The vocabulary is fixed by convention, not by type: deployments may add
/// codes without a core change, and unresolvable codes fail closed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionCode(Cow<'static, str>);

impl PermissionCode {
    pub const VIEW: PermissionCode = PermissionCode(Cow::Borrowed("VIEW"));
    pub const USE: PermissionCode = PermissionCode(Cow::Borrowed("USE"));
    pub const EDIT: PermissionCode = PermissionCode(Cow::Borrowed("EDIT"));
    pub const EXECUTE: PermissionCode = PermissionCode(Cow::Borrowed("EXECUTE"));

    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A protected resource entry.
///
/// `tenant_id: None` marks a shared/common entry visible to every tenant;
/// a tenant-specific entry with the same key takes precedence on lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub tenant_id: Option<TenantId>,
    pub key: ResourceKey,
}

/// Effect attached to a grant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

/// A role's grant on a (resource, permission) pair.
///
/// At most one effect should exist per (role, resource, permission); if both
/// somehow exist, DENY wins during evaluation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub role_id: RoleId,
    pub resource_id: ResourceId,
    pub permission_id: PermissionId,
    pub effect: Effect,
}
