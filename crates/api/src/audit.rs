use chrono::{DateTime, Utc};
use serde::Serialize;

use warden_authz::{PermissionCode, ResourceKey};
use warden_core::{TenantId, UserId};

/// Structured record of a policy-match denial.
///
/// Emitted only when the gateway denies a request that matched at least one
/// endpoint policy; authentication-layer failures (AUTH_REQUIRED,
/// TENANT_MISSING, TENANT_MISMATCH, TOKEN_INVALID) are that layer's concern
/// and are never audited here. Allow paths emit nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenialRecord {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub resource_key: ResourceKey,
    pub permission_code: PermissionCode,
    pub http_method: String,
    pub path: String,
    pub occurred_at: DateTime<Utc>,
}

/// External audit collaborator. Storage format is out of scope; this core
/// only pushes records.
pub trait AuditSink: Send + Sync {
    fn record_denial(&self, record: DenialRecord);
}

/// Ships denials as structured tracing events.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record_denial(&self, record: DenialRecord) {
        tracing::warn!(
            tenant_id = %record.tenant_id,
            user_id = %record.user_id,
            resource = %record.resource_key,
            permission = %record.permission_code,
            method = %record.http_method,
            path = %record.path,
            occurred_at = %record.occurred_at,
            "request denied by endpoint policy"
        );
    }
}
