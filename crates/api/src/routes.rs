//! Authorization introspection endpoints.
//!
//! These answer "what can I do?" and "why was this denied?" for the current
//! actor. They sit behind the enforcement gateway like everything else (see
//! the catalog's `menu.authz.inspect` rows), so inspecting authorization is
//! itself a grantable capability.

use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use warden_authz::{Actor, PermissionCode, ResourceKey};

use crate::enforce::EnforceState;
use crate::errors;

#[derive(Debug, Deserialize)]
pub struct DecisionQuery {
    pub resource: String,
    pub permission: String,
}

pub fn authz_router(state: EnforceState) -> Router {
    Router::new()
        .route("/api/authz/permissions", get(effective_permissions))
        .route("/api/authz/decisions", get(explain_decision))
        .with_state(state)
}

/// GET /api/authz/permissions - the actor's materialized ALLOW list.
pub async fn effective_permissions(
    State(state): State<EnforceState>,
    Extension(actor): Extension<Actor>,
) -> axum::response::Response {
    match state.evaluator.effective_allows(&actor) {
        Ok(allows) => (
            StatusCode::OK,
            Json(serde_json::json!({ "permissions": &*allows })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to materialize permission list");
            errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "authorization backend failure",
            )
        }
    }
}

/// GET /api/authz/decisions?resource=X&permission=Y - explain the current
/// actor's decision for one pair, including *why* it was allowed (a plain
/// grant vs the administrative bypass).
pub async fn explain_decision(
    State(state): State<EnforceState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<DecisionQuery>,
) -> axum::response::Response {
    let resource = ResourceKey::new(query.resource);
    let permission = PermissionCode::new(query.permission);

    match state.evaluator.decide(&actor, &resource, &permission) {
        Ok(decision) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "resource": resource,
                "permission": permission,
                "allowed": decision.is_allowed(),
                "decision": decision,
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "decision explain failed");
            errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "authorization backend failure",
            )
        }
    }
}

/// GET /health - liveness, outside the enforcement gateway.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Stand-in for the downstream administrative CRUD surface (an external
/// collaborator). Any request that clears the gateway lands here.
pub async fn admin_stub() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}
