//! Request-boundary enforcement gateway.
//!
//! One pass per request, states in order, each terminal on failure:
//! AuthCheck → TenantCheck → PolicyLookup → Decision → Allow. Failures are
//! final; there is no retry inside the gateway.

use std::sync::Arc;

use axum::extract::State;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

use warden_authz::{Actor, PermissionEvaluator, StoreError};
use warden_core::{DepartmentId, TenantId, UserId};

use crate::audit::{AuditSink, DenialRecord};
use crate::context::{IdentityClaims, TENANT_HEADER};
use crate::errors::{EnforceError, enforce_error_to_response};
use crate::registry::{EndpointPolicyRegistry, FallbackMode};

/// Shared gateway wiring.
#[derive(Clone)]
pub struct EnforceState {
    pub registry: Arc<EndpointPolicyRegistry>,
    pub evaluator: Arc<PermissionEvaluator>,
    pub audit: Arc<dyn AuditSink>,
}

pub async fn enforce_middleware(
    State(state): State<EnforceState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let actor = resolve_actor(&req).map_err(|e| enforce_error_to_response(&e))?;

    // Downstream handlers (and the introspection routes) get the validated
    // actor regardless of which decision branch allowed the request.
    req.extensions_mut().insert(actor);

    let method = req.method().as_str().to_string();
    let path = normalize_path(req.uri().path());

    let required = state.registry.find_policies(&method, &path);

    if required.is_empty() {
        match state.registry.mode() {
            FallbackMode::Strict => {
                tracing::warn!(%method, %path, "no endpoint policy matched; strict mode denies");
                return Err(enforce_error_to_response(&EnforceError::Forbidden));
            }
            FallbackMode::Relax => {
                let admin = state.evaluator.is_admin(&actor).map_err(internal)?;
                if !admin {
                    tracing::warn!(
                        %method,
                        %path,
                        user_id = %actor.user_id,
                        "no endpoint policy matched; non-administrator denied"
                    );
                    return Err(enforce_error_to_response(&EnforceError::Forbidden));
                }
            }
        }
    } else {
        // Conjunctive: every matched policy must pass; the first failing
        // pair short-circuits and is the one named in the denial record.
        for requirement in &required {
            let decision = state
                .evaluator
                .decide(&actor, &requirement.resource_key, &requirement.permission_code)
                .map_err(internal)?;
            if !decision.is_allowed() {
                state.audit.record_denial(DenialRecord {
                    tenant_id: actor.tenant_id,
                    user_id: actor.user_id,
                    resource_key: requirement.resource_key.clone(),
                    permission_code: requirement.permission_code.clone(),
                    http_method: method,
                    path,
                    occurred_at: Utc::now(),
                });
                return Err(enforce_error_to_response(&EnforceError::Forbidden));
            }
        }
    }

    Ok(next.run(req).await)
}

/// AuthCheck + TenantCheck + actor shaping.
///
/// The cross-channel tenant equality check runs on the raw values, before
/// any parsing or permission logic.
fn resolve_actor(req: &axum::http::Request<axum::body::Body>) -> Result<Actor, EnforceError> {
    let claims = req
        .extensions()
        .get::<IdentityClaims>()
        .cloned()
        .ok_or(EnforceError::AuthRequired)?;

    let header_tenant = req
        .headers()
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let claim_tenant = claims.tenant.as_deref().map(str::trim).filter(|v| !v.is_empty());

    if let (Some(from_claim), Some(from_header)) = (claim_tenant, header_tenant) {
        if from_claim != from_header {
            return Err(EnforceError::TenantMismatch);
        }
    }

    let tenant_raw = claim_tenant.or(header_tenant).ok_or(EnforceError::TenantMissing)?;

    let tenant_id: TenantId = tenant_raw.parse().map_err(|_| EnforceError::TokenInvalid)?;
    let user_id: UserId = claims.subject.trim().parse().map_err(|_| EnforceError::TokenInvalid)?;

    let mut actor = Actor::new(tenant_id, user_id);
    if let Some(department) = claims.department.as_deref().map(str::trim).filter(|v| !v.is_empty())
    {
        let department_id: DepartmentId =
            department.parse().map_err(|_| EnforceError::TokenInvalid)?;
        actor = actor.with_department(department_id);
    }

    Ok(actor)
}

fn normalize_path(path: &str) -> String {
    if path.len() > 1 {
        path.trim_end_matches('/').to_string()
    } else {
        path.to_string()
    }
}

fn internal(err: StoreError) -> Response {
    tracing::error!(error = %err, "policy store failure during enforcement");
    enforce_error_to_response(&EnforceError::Internal)
}
