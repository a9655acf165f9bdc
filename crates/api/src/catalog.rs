//! Default endpoint-to-permission table.
//!
//! Loaded once at process start by repeated [`EndpointPolicyRegistry::register`]
//! calls. The downstream CRUD handlers themselves are an external
//! collaborator; this table is the authorization contract in front of them.
//!
//! Note the audit-log export row registers twice on purpose: exporting
//! requires both VIEW and EXECUTE on the audit area (matched policies are
//! conjunctive).

use crate::registry::{EndpointPolicyRegistry, RegistryError};
use warden_authz::{PermissionCode, ResourceKey};

/// (method, anchored path pattern, resource key, permission code)
const DEFAULT_POLICIES: &[(&str, &str, &str, &str)] = &[
    // Common codes
    ("GET", "/api/admin/codes", "menu.admin.codes", "VIEW"),
    ("POST", "/api/admin/codes", "menu.admin.codes", "EDIT"),
    ("GET", "/api/admin/codes/[^/]+", "menu.admin.codes", "VIEW"),
    ("PUT", "/api/admin/codes/[^/]+", "menu.admin.codes", "EDIT"),
    ("DELETE", "/api/admin/codes/[^/]+", "menu.admin.codes", "EDIT"),
    // Code usages
    ("GET", "/api/admin/code-usages", "menu.admin.codes.usage", "VIEW"),
    ("POST", "/api/admin/code-usages", "menu.admin.codes.usage", "EDIT"),
    ("DELETE", "/api/admin/code-usages/[^/]+", "menu.admin.codes.usage", "EDIT"),
    // Users
    ("GET", "/api/admin/users", "menu.admin.users", "VIEW"),
    ("POST", "/api/admin/users", "menu.admin.users", "EDIT"),
    ("GET", "/api/admin/users/[^/]+", "menu.admin.users", "VIEW"),
    ("PUT", "/api/admin/users/[^/]+", "menu.admin.users", "EDIT"),
    ("DELETE", "/api/admin/users/[^/]+", "menu.admin.users", "EDIT"),
    // Roles
    ("GET", "/api/admin/roles", "menu.admin.roles", "VIEW"),
    ("POST", "/api/admin/roles", "menu.admin.roles", "EDIT"),
    ("GET", "/api/admin/roles/[^/]+", "menu.admin.roles", "VIEW"),
    ("PUT", "/api/admin/roles/[^/]+", "menu.admin.roles", "EDIT"),
    ("DELETE", "/api/admin/roles/[^/]+", "menu.admin.roles", "EDIT"),
    // Role members
    ("GET", "/api/admin/roles/[^/]+/members", "menu.admin.roles.members", "VIEW"),
    ("POST", "/api/admin/roles/[^/]+/members", "menu.admin.roles.members", "EDIT"),
    ("DELETE", "/api/admin/roles/[^/]+/members/[^/]+", "menu.admin.roles.members", "EDIT"),
    // Role permissions (grants)
    ("GET", "/api/admin/roles/[^/]+/permissions", "menu.admin.roles.permissions", "VIEW"),
    ("POST", "/api/admin/roles/[^/]+/permissions", "menu.admin.roles.permissions", "EDIT"),
    ("DELETE", "/api/admin/roles/[^/]+/permissions/[^/]+", "menu.admin.roles.permissions", "EDIT"),
    // Protected resources
    ("GET", "/api/admin/resources", "menu.admin.resources", "VIEW"),
    ("POST", "/api/admin/resources", "menu.admin.resources", "EDIT"),
    ("PUT", "/api/admin/resources/[^/]+", "menu.admin.resources", "EDIT"),
    ("DELETE", "/api/admin/resources/[^/]+", "menu.admin.resources", "EDIT"),
    // Menus
    ("GET", "/api/admin/menus", "menu.admin.menus", "VIEW"),
    ("POST", "/api/admin/menus", "menu.admin.menus", "EDIT"),
    ("PUT", "/api/admin/menus/[^/]+", "menu.admin.menus", "EDIT"),
    ("DELETE", "/api/admin/menus/[^/]+", "menu.admin.menus", "EDIT"),
    ("POST", "/api/admin/menus/reorder", "menu.admin.menus", "EXECUTE"),
    // Tenant selector
    ("GET", "/api/admin/tenants", "menu.admin.tenants", "VIEW"),
    ("POST", "/api/admin/tenants/[^/]+/select", "menu.admin.tenants", "USE"),
    // Audit logs
    ("GET", "/api/admin/audit-logs", "menu.admin.audit", "VIEW"),
    ("POST", "/api/admin/audit-logs/export", "menu.admin.audit", "VIEW"),
    ("POST", "/api/admin/audit-logs/export", "menu.admin.audit", "EXECUTE"),
    // Authorization introspection (self-protected)
    ("GET", "/api/authz/permissions", "menu.authz.inspect", "USE"),
    ("GET", "/api/authz/decisions", "menu.authz.inspect", "USE"),
];

/// Register the default table. Fails fast on the first invalid pattern;
/// a broken table must not boot.
pub fn register_default_policies(
    registry: &EndpointPolicyRegistry,
) -> Result<(), RegistryError> {
    for (method, pattern, resource, permission) in DEFAULT_POLICIES {
        registry.register(
            method,
            pattern,
            ResourceKey::new(*resource),
            PermissionCode::new(*permission),
        )?;
    }
    tracing::info!(policies = DEFAULT_POLICIES.len(), "endpoint policy table loaded");
    Ok(())
}
